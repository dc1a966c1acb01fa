use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use agenthost::db::store::{InstanceStore, MemoryStore, UserStore};
use agenthost::instance_api::InstanceApiClient;
use agenthost::orchestrator::Orchestrator;
use agenthost::paas::RailwayClient;
use agenthost::server::config::ServerConfig;
use agenthost::version::VERSION;
use agenthost::web::{AppState, create_axum_router};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging() {
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` level if RUST_LOG is not set.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    init_logging();
    info!("Starting server, version: {}", VERSION);
    dotenv().ok();

    let server_config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load server configuration: {}", e);
            return Err(e.into());
        }
    };
    if server_config.railway_project_token.is_empty() {
        // Deploy requests will fail with an auth error until this is set.
        error!("RAILWAY_PROJECT_TOKEN is not configured; provisioning is disabled");
    }

    let request_timeout = Duration::from_secs(server_config.request_timeout_secs);
    let railway_client = Arc::new(RailwayClient::new(
        server_config.railway_api_url.clone(),
        server_config.railway_project_token.clone(),
        request_timeout,
    )?);
    let orchestrator = Arc::new(Orchestrator::new(railway_client, server_config.clone()));
    let instance_api = Arc::new(InstanceApiClient::new(request_timeout)?);

    let store = Arc::new(MemoryStore::new());
    let app_state = Arc::new(AppState {
        instances: store.clone() as Arc<dyn InstanceStore>,
        users: store as Arc<dyn UserStore>,
        orchestrator,
        instance_api,
        config: server_config.clone(),
    });

    let app = create_axum_router(app_state);

    let addr: SocketAddr = ([0, 0, 0, 0], server_config.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
