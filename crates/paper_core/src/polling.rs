use crate::JobSnapshot;

/// Delay between status checks while a job is still pending or processing.
pub const POLL_INTERVAL_MS: u64 = 3000;

/// Delay before the next poll, derived only from the last published snapshot.
///
/// Returns `0` ("stop polling") once the job is terminal.
pub fn poll_delay_ms(snapshot: &JobSnapshot) -> u64 {
    if snapshot.status.is_terminal() {
        0
    } else {
        POLL_INTERVAL_MS
    }
}

/// How the scheduler spaces polls after transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Keep the regular cadence.
    #[default]
    Fixed,
    /// Double the interval per consecutive failure, capped at `max_ms`.
    Backoff { max_ms: u64 },
}

/// Delay before the next poll after `consecutive_failures` sync errors in a row.
///
/// Pure in its inputs: callers reset the failure count on every successful fetch.
pub fn retry_delay_ms(
    policy: RetryPolicy,
    consecutive_failures: u32,
    last: Option<&JobSnapshot>,
) -> u64 {
    if last.is_some_and(|snapshot| snapshot.status.is_terminal()) {
        return 0;
    }
    match policy {
        RetryPolicy::Fixed => POLL_INTERVAL_MS,
        RetryPolicy::Backoff { max_ms } => {
            let exponent = consecutive_failures.saturating_sub(1).min(16);
            POLL_INTERVAL_MS
                .saturating_mul(1u64 << exponent)
                .min(max_ms.max(1))
        }
    }
}
