/// Classification for retry policy.
///
/// Used by the retrying fetcher to decide whether a failed upstream call
/// is worth another attempt.
///
/// # Behavior Summary
///
/// | Class | Retried? | Consumes retry budget? |
/// |-------|----------|------------------------|
/// | `Never` | No | No |
/// | `WithBackoff` | Yes, after the policy delay | Yes |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - bad request, malformed payload, business not-found, or
    /// a caller-side rejection. Retrying won't change the outcome.
    Never,

    /// Transient upstream failure (connection, timeout, 5xx).
    /// Retried after the configured backoff until attempts are exhausted.
    WithBackoff,
}
