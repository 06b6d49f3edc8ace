//! Qim Player developer harness
//!
//! Drives the playback engine through its tokio runtime against a simulated
//! resource, so queue sequencing, retries and address resolution can be
//! watched in the logs without a real media element.

pub mod config;
pub mod error;
pub mod simulate;

pub use config::CliConfig;
pub use error::{CliError, Result};
pub use simulate::{run_simulation, SimulatedResource, SimulationPlan, SimulationReport};
