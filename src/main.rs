use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use workflow_gateway::adapters::{serve, CorsPolicy, EnvCredentialProvider, HyperGatewayAdapter, ReqwestHttpClient};
use workflow_gateway::config::GatewayConfig;
use workflow_gateway::domain::{ProxyService, RouteTable};
use workflow_gateway::ports::CredentialsPort;

#[derive(Parser, Debug)]
#[clap(version = env!("WORKFLOW_GATEWAY_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
pub struct Opts {
    /// Configuration file (defaults to the platform config directory)
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// listen on this network address, overrides the configuration file
    #[clap(long, short = 'b')]
    bind: Option<String>,

    /// Upstream API base URL, overrides the configuration file
    #[clap(long, short = 'u')]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Remembered so the credential provider can re-read it later.
    let dotenv_path = match dotenvy::dotenv() {
        Ok(path) => {
            info!("Loaded .env from {}", path.display());
            path
        }
        Err(e) => {
            warn!("Could not load .env file: {}", e);
            PathBuf::from(".env")
        }
    };

    let opts = Opts::parse();

    let mut config = GatewayConfig::load(opts.config.as_deref())?;
    if let Some(bind) = opts.bind {
        config.bind = bind;
    }
    if let Some(upstream) = opts.upstream {
        config.upstream_base_url = upstream;
    }
    config.validate()?;

    let routes = RouteTable::new(config.upstream_base()?)?;
    let credentials: Arc<dyn CredentialsPort> =
        Arc::new(EnvCredentialProvider::new(config.api_key_env.clone()).with_dotenv(dotenv_path));

    // Missing keys are reported per request, the provider logs the warning.
    let _ = credentials.get_credential().await;

    let client = reqwest::Client::builder()
        .user_agent(concat!("workflow-gateway/", env!("WORKFLOW_GATEWAY_VERSION")))
        .build()?;
    let service = Arc::new(
        ProxyService::new(credentials, Arc::new(ReqwestHttpClient::with_client(client)))
            .with_timeout(config.timeout()),
    );
    let adapter = Arc::new(
        HyperGatewayAdapter::new(service, routes)
            .with_cors(CorsPolicy::new(config.cors_origin.as_deref()))
            .with_body_limit(config.max_body_bytes),
    );

    info!(
        "workflow-gateway {} forwarding to {}",
        env!("WORKFLOW_GATEWAY_VERSION"),
        config.upstream_base_url
    );

    let listener = TcpListener::bind(config.bind_addr()?).await?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    serve(listener, adapter, shutdown).await?;
    Ok(())
}
