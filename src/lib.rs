//! Relaxation control loop for external electronic-structure engines.
//!
//! A [`relax::controller::RelaxationController`] drives an
//! [`engine::adapter::EngineAdapter`] through repeated geometry optimisations,
//! scores the progress reported by an [`engine::readers::OutputReader`] and
//! finishes with a confirmatory static calculation.

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod relax;

pub use config::RelaxSettings;
pub use error::{RelaxError, Result};
pub use relax::controller::{RelaxOutcome, RelaxationController};
pub use relax::job::{Phase, RelaxationJob};
