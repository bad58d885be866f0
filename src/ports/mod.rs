pub mod credentials;
pub mod http_client;

pub use credentials::CredentialsPort;
pub use http_client::HttpClientPort;
