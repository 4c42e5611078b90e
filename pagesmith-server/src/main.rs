use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs in production (PAGESMITH_LOG_JSON=1), human-readable otherwise
    let json_logs = std::env::var("PAGESMITH_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::from_default_env().add_directive("pagesmith_server=info".parse()?);
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = pagesmith_server::config::Config::parse();
    tracing::info!(
        owner = %config.github_username,
        model = %config.model,
        ai = %config.ai_base_url,
        "Starting pagesmith on {}",
        config.listen_addr()
    );
    if config.webhook_secret.is_some() {
        tracing::debug!("WEBHOOK_SECRET is set but not used yet");
    }

    pagesmith_server::web::serve(config).await
}
