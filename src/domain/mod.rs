pub mod errors;
pub mod models;
pub mod routes;
pub mod service;

pub use errors::*;
pub use models::*;
pub use routes::{Endpoint, ResolvedRoute, RouteTable};
pub use service::ProxyService;
