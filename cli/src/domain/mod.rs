//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod agent;
pub mod confirm;
pub mod error;
pub mod instance;
pub mod job;
pub mod retry;
pub mod secret;
pub mod settings;

pub use error::{AgentError, CloudError, RunError, SettingsError};
pub use instance::{Firewall, Instance, InstancePage, InstanceSpec, InstanceStatus};
pub use job::{JobBatch, is_batch_complete};
pub use retry::{BudgetState, RetryBudget, RetryPolicy, SETTLE_DELAY};
pub use settings::{AuthFailurePolicy, Settings, SettingsOverrides};
