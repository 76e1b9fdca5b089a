use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

use taskhub::mailer::LogMailer;
use taskhub::store::MySqlStore;
use taskhub::{configure_app, jobs, AppState, Config};

fn io_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        io_error(e)
    })?;

    let store = MySqlStore::connect(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| {
            error!("Failed to create pool: {}", e);
            io_error(e)
        })?;
    store.migrate().await.map_err(io_error)?;

    let server = config.server.clone();
    let state = AppState::new(config, Arc::new(store), Arc::new(LogMailer));
    jobs::scheduler::spawn(state.clone());

    info!("Server running at http://{}", server.bind_address);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(configure_app)
    })
    .workers(server.workers)
    .keep_alive(Duration::from_secs(server.keep_alive_secs))
    .client_request_timeout(Duration::from_secs(server.client_timeout_secs))
    .bind(&server.bind_address)?
    .run()
    .await
}
