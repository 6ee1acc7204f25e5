//! Launch module for networks.
//!
//! Provides the high-level API for contracting a described network.

mod config;
mod executor;

pub use config::NetworkConfig;
pub use executor::{Network, contract_network};
