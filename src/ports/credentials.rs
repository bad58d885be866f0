use crate::domain::{Credential, Result};
use async_trait::async_trait;

/// Port for resolving the upstream API key
#[async_trait]
pub trait CredentialsPort: Send + Sync {
    /// Resolve the credential for the next upstream call
    ///
    /// Called once per forwarded request, so implementations must not cache a
    /// missing value. Fails with a configuration error when nothing is set.
    async fn get_credential(&self) -> Result<Credential>;
}
