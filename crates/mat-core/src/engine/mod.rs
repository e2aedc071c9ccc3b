//! Orquestador de builds incrementales.

pub mod builder;
pub mod config;
pub mod core;
pub mod processor;
pub mod report;
pub mod retry;

pub use builder::OrchestratorBuilder;
pub use config::BuildConfig;
pub use self::core::BuildOrchestrator;
pub use processor::UnitProcessor;
pub use report::BuildReport;
pub use retry::{with_retry, RetryPolicy};
