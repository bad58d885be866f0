//! Backend gateway that forwards a fixed REST surface to the upstream workflow
//! API, attaching the server-held API key on the way out.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
