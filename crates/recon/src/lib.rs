//! `nomina-recon` — payroll/pension roster reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded records, returns classified results.
//! No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod index;
pub mod model;
pub mod normalize;
pub mod schema;
pub mod split;

pub use config::MergeConfig;
pub use engine::{run, MergeInput, MergeOutput};
pub use error::MergeError;
pub use model::{Record, Value};
