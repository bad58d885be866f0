mod adapter;
mod cors;
mod server;

pub use adapter::{error_response, json_response, Body, HyperGatewayAdapter};
pub use cors::CorsPolicy;
pub use server::serve;
