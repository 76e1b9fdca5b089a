use serde::Deserialize;

// json format

#[derive(Debug, Default, Deserialize)]
pub struct ObtainRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    pub token: Option<String>,
}
