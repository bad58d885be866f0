use crate::domain::{Credential, ProxyError, Result};
use crate::ports::CredentialsPort;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads the API key on every call.
///
/// The process environment wins. When the variable is unset or empty there,
/// the dotenv file (if any) is parsed again, so adding the key to `.env`
/// takes effect on the next request. The process environment is never
/// modified.
pub struct EnvCredentialProvider {
    var: String,
    lookup: Lookup,
    dotenv: Option<PathBuf>,
}

impl EnvCredentialProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self::with_lookup(var, |name| std::env::var(name).ok())
    }

    /// Use a custom variable source instead of the process environment
    pub fn with_lookup<F>(var: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            var: var.into(),
            lookup: Box::new(lookup),
            dotenv: None,
        }
    }

    /// Fall back to this dotenv file when the variable is not set
    pub fn with_dotenv(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv = Some(path.into());
        self
    }

    fn read_dotenv(&self, path: &Path) -> Option<String> {
        let entries = match dotenvy::from_path_iter(path) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Could not read {}: {}", path.display(), e);
                return None;
            }
        };

        // First definition wins, like dotenvy::from_path.
        entries
            .filter_map(|entry| match entry {
                Ok(pair) => Some(pair),
                Err(e) => {
                    log::debug!("Skipping malformed line in {}: {}", path.display(), e);
                    None
                }
            })
            .find(|(name, _)| *name == self.var)
            .map(|(_, value)| value)
    }
}

#[async_trait]
impl CredentialsPort for EnvCredentialProvider {
    async fn get_credential(&self) -> Result<Credential> {
        let key = (self.lookup)(&self.var)
            .filter(|key| !key.is_empty())
            .or_else(|| {
                let path = self.dotenv.as_deref()?;
                self.read_dotenv(path).filter(|key| !key.is_empty())
            });

        match key {
            Some(key) => Ok(Credential::new(key)),
            None => {
                log::warn!("{} is not set, refusing to forward", self.var);
                Err(ProxyError::missing_credential(&self.var))
            }
        }
    }
}

/// Fixed credential, handed in explicitly by the caller
pub struct StaticCredentialProvider {
    var: String,
    credential: Option<Credential>,
}

impl StaticCredentialProvider {
    pub fn new(var: impl Into<String>, key: Option<String>) -> Self {
        Self {
            var: var.into(),
            credential: key.filter(|k| !k.is_empty()).map(Credential::new),
        }
    }
}

#[async_trait]
impl CredentialsPort for StaticCredentialProvider {
    async fn get_credential(&self) -> Result<Credential> {
        self.credential
            .clone()
            .ok_or_else(|| ProxyError::missing_credential(&self.var))
    }
}
