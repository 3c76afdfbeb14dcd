use permitseal_core::AppConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = AppConfig::from_env()?;

    permitseal_api::telemetry::init_telemetry();

    // Initialize the application (backend, pipeline, routes)
    let (_state, router) = permitseal_api::initialize_app(config.clone()).await?;

    // Start the server
    permitseal_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
