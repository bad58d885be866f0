use std::time::Duration;

use crate::domain::{OutboundRequest, TransportError, UpstreamResponse};
use async_trait::async_trait;

/// Port for performing exactly one call against the upstream
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn execute(
        &self,
        request: &OutboundRequest,
        timeout: Duration,
    ) -> Result<UpstreamResponse, TransportError>;
}
