//! Shared polling machinery for every fixed-interval wait.
//!
//! Instance activation, agent liveness and status monitoring all run on
//! [`RetryPolicy`] values instead of hand-rolled loops.

use std::future::Future;

use crate::domain::{BudgetState, RetryPolicy};

/// Result of one probe.
#[derive(Debug)]
pub enum Probe<T> {
    /// Stop polling with this value.
    Ready(T),
    /// Try again; keep `Some` as the latest observation.
    Pending(Option<T>),
}

/// Returned when the attempt budget runs out before the probe was ready.
#[derive(Debug)]
pub struct Exhausted<T> {
    /// Latest observation reported by a pending probe.
    pub last: Option<T>,
    pub attempts: u32,
}

/// Run `probe` until it is ready or `policy.max_attempts` probes have been
/// pending. Sleeps `policy.interval` between attempts, never after the last.
///
/// The closure receives the 1-based attempt number.
///
/// # Errors
///
/// Returns [`Exhausted`] with the latest pending observation once the budget
/// is spent.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut probe: F) -> Result<T, Exhausted<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Probe<T>>,
{
    let mut budget = policy.budget();
    let mut last = None;
    loop {
        match probe(budget.failures() + 1).await {
            Probe::Ready(value) => return Ok(value),
            Probe::Pending(observed) => {
                if observed.is_some() {
                    last = observed;
                }
            }
        }
        if budget.fail() == BudgetState::Exhausted {
            return Err(Exhausted {
                last,
                attempts: budget.failures(),
            });
        }
        tokio::time::sleep(policy.interval).await;
    }
}
