use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wikidiscover::app_state::AppState;
use wikidiscover::command_line::{command_line_usage, get_wikidiscover_config};
use wikidiscover::webserver::WebServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = get_wikidiscover_config()?;
    let app_state = Arc::new(AppState::new_from_config(&config));

    let args = std::env::args();
    let result = if args.len() > 1 {
        command_line_usage(&app_state, args).await
    } else {
        let webserver = WebServer::new(app_state.clone(), config);
        webserver.run().await
    };
    app_state.shut_down().await;
    Ok(result?)
}
