//! Core domain types and logic.
//!
//! Data flows frame -> signals -> overlay/allocation -> evaluation; the
//! pipeline module wires the stages together.

pub mod allocation;
pub mod config_validation;
pub mod error;
pub mod evaluation;
pub mod frame;
pub mod market_data;
pub mod metrics;
pub mod overlay;
pub mod pipeline;
pub mod rolling;
pub mod signals;
pub mod universe;
