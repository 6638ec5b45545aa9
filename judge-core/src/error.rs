//! Error types for the judging engine.
//!
//! # Error Classification
//!
//! Every error a strategy evaluation can raise is represented by
//! [`JudgeError`] and classified by [`JudgeError::disposition`] into three
//! buckets the caller (the scheduler's per-group worker) uses to decide
//! what to do next:
//!
//! - **LogAndSkip** — log at error level, skip this strategy for this turn.
//! - **SilentSkip** — normal steady-state behavior, no log line.
//! - **LogAndDrop** — the state machine already updated the Last-Event
//!   Store; only the downstream publish failed, so log and drop just this
//!   emission (the next turn may re-emit if conditions still hold).
//!
//! No variant here is fatal to the scheduling loop — a turn always
//! completes and the loop resumes.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// The function descriptor's argument list could not be parsed.
    #[error("malformed function descriptor: {0}")]
    MalformedFunction(String),

    /// The function descriptor names a function this engine doesn't know.
    #[error("unsupported function: {0}")]
    UnsupportedFunction(String),

    /// The comparison operator string isn't one of `=,==,!=,<,<=,>,>=`.
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// The graph/RRD backend query failed (network, decode, or timeout).
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// The function's "enough data" predicate was false; evaluation aborts
    /// silently.
    #[error("insufficient data for window")]
    InsufficientData,

    /// `MaxStep == 0` and this would otherwise be a fresh PROBLEM emission.
    #[error("strategy is muted (MaxStep = 0)")]
    MutedStrategy,

    /// `last.CurrentStep >= MaxStep` — repeat-notification quota exhausted.
    #[error("suppressed: repeat quota exhausted")]
    SuppressedByQuota,

    /// `now - last.EventTime < MinInterval` — too soon since the last alert.
    #[error("suppressed: minimum inter-alert interval not elapsed")]
    SuppressedByInterval,

    /// The newest sample is not newer than the point the last alert judged.
    #[error("suppressed: newest sample already judged")]
    SuppressedByStaleSample,

    /// The candidate event could not be serialized. Indicates a programming
    /// error (e.g. non-finite `f64` that the wire format can't carry).
    #[error("event serialization failed: {0}")]
    EmitSerializationError(String),

    /// The event queue backend rejected or failed to accept the publish.
    #[error("event queue backend error: {0}")]
    QueueBackendError(String),
}

/// What the caller should do in response to a [`JudgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    LogAndSkip,
    SilentSkip,
    LogAndDrop,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::LogAndSkip => write!(f, "log-and-skip"),
            Disposition::SilentSkip => write!(f, "silent-skip"),
            Disposition::LogAndDrop => write!(f, "log-and-drop"),
        }
    }
}

impl JudgeError {
    pub fn disposition(&self) -> Disposition {
        match self {
            JudgeError::MalformedFunction(_)
            | JudgeError::UnsupportedFunction(_)
            | JudgeError::UnsupportedOperator(_)
            | JudgeError::QueryFailed(_) => Disposition::LogAndSkip,

            JudgeError::InsufficientData
            | JudgeError::MutedStrategy
            | JudgeError::SuppressedByQuota
            | JudgeError::SuppressedByInterval
            | JudgeError::SuppressedByStaleSample => Disposition::SilentSkip,

            JudgeError::EmitSerializationError(_) | JudgeError::QueueBackendError(_) => {
                Disposition::LogAndDrop
            }
        }
    }

    /// Whether this error represents a suppression decided by the state
    /// machine (as opposed to an upstream failure). Suppressions are normal
    /// steady-state outcomes, never logged.
    pub fn is_suppression(&self) -> bool {
        matches!(
            self,
            JudgeError::SuppressedByQuota
                | JudgeError::SuppressedByInterval
                | JudgeError::SuppressedByStaleSample
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_log_and_skip() {
        assert_eq!(
            JudgeError::MalformedFunction("x".into()).disposition(),
            Disposition::LogAndSkip
        );
        assert_eq!(
            JudgeError::UnsupportedFunction("x".into()).disposition(),
            Disposition::LogAndSkip
        );
    }

    #[test]
    fn steady_state_suppressions_are_silent() {
        assert_eq!(
            JudgeError::InsufficientData.disposition(),
            Disposition::SilentSkip
        );
        assert_eq!(
            JudgeError::MutedStrategy.disposition(),
            Disposition::SilentSkip
        );
        assert_eq!(
            JudgeError::SuppressedByQuota.disposition(),
            Disposition::SilentSkip
        );
        assert_eq!(
            JudgeError::SuppressedByInterval.disposition(),
            Disposition::SilentSkip
        );
        assert_eq!(
            JudgeError::SuppressedByStaleSample.disposition(),
            Disposition::SilentSkip
        );
    }

    #[test]
    fn emission_failures_log_and_drop() {
        assert_eq!(
            JudgeError::EmitSerializationError("x".into()).disposition(),
            Disposition::LogAndDrop
        );
        assert_eq!(
            JudgeError::QueueBackendError("x".into()).disposition(),
            Disposition::LogAndDrop
        );
    }

    #[test]
    fn is_suppression_matches_only_state_machine_suppressions() {
        assert!(JudgeError::SuppressedByQuota.is_suppression());
        assert!(!JudgeError::InsufficientData.is_suppression());
        assert!(!JudgeError::QueryFailed("x".into()).is_suppression());
    }
}
