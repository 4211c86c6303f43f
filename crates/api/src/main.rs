use anyhow::Context;

use profilehub_api::app::{self, AppServices};
use profilehub_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may be set directly.
    let _ = dotenvy::dotenv();
    profilehub_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;

    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialise stores")?;

    if let Some(admin) = &config.admin {
        services
            .ensure_superuser(&admin.to_input())
            .await
            .context("failed to bootstrap superuser")?;
    }

    let app = app::build_app(services).context("invalid route table")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
