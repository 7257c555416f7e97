//! overlaytrader: momentum allocation with volatility, crowding and
//! liquidity overlays, evaluated against a buy-and-hold benchmark.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod logging;
pub mod ports;
