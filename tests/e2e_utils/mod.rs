#![cfg(test)]
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod gateway_server;

pub use gateway_server::TestGatewayServer;
