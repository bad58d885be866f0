#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use workflow_gateway::adapters::{serve, CorsPolicy, HyperGatewayAdapter, ReqwestHttpClient, StaticCredentialProvider};
use workflow_gateway::domain::{ProxyService, RouteTable};
use workflow_gateway::ports::CredentialsPort;

pub struct TestGatewayServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    _server_handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Start the gateway on an ephemeral port, forwarding to `upstream`
    pub async fn start(upstream: &str, api_key: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        Self::start_with_timeout(upstream, api_key, Duration::from_secs(60)).await
    }

    pub async fn start_with_timeout(
        upstream: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let credentials: Arc<dyn CredentialsPort> =
            Arc::new(StaticCredentialProvider::new("MU_API_KEY", api_key.map(str::to_string)));
        let service = Arc::new(
            ProxyService::new(credentials, Arc::new(ReqwestHttpClient::new())).with_timeout(timeout),
        );
        let routes = RouteTable::new(upstream.parse()?)?;
        let adapter = Arc::new(
            HyperGatewayAdapter::new(service, routes).with_cors(CorsPolicy::new(Some("http://localhost:3000"))),
        );

        let (tx, rx) = oneshot::channel::<()>();
        let server_handle = tokio::spawn(async move {
            let _ = serve(listener, adapter, async {
                let _ = rx.await;
            })
            .await;
        });

        Ok(Self {
            addr,
            shutdown: Some(tx),
            _server_handle: server_handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
