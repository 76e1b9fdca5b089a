use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::Config;
use crate::jobs::scheduler::SchedulerStatus;
use crate::mailer::Mailer;
use crate::store::Store;

/// Shared handles passed to every handler through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
    pub scheduler: Arc<SchedulerStatus>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        let scheduler = Arc::new(SchedulerStatus::new(config.jobs.scheduler_enabled));
        Self {
            store,
            tokens: TokenService::new(&config.auth),
            mailer,
            config: Arc::new(config),
            scheduler,
        }
    }
}
