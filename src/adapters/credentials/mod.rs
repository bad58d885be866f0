mod provider;

pub use provider::{EnvCredentialProvider, StaticCredentialProvider};
