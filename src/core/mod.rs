/*!
 * Core Module
 * Fundamental types, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::{
    ConditionThresholds, EngineConfig, OverloadThresholds, RuntimeConfig, SchedulerConfig,
};
pub use errors::*;
pub use types::*;
