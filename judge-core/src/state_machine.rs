//! The alert state machine: given a function outcome and the prior event
//! for this identity, decides whether to emit a PROBLEM, emit an OK
//! (recovery), or suppress.
//!
//! Implicit initial state (no prior event in the store) behaves like "last
//! was OK" for the triggering branch (a fresh incident can always fire,
//! muting aside) and like a no-op for the non-triggering branch (nothing
//! to recover from).

use crate::error::JudgeError;
use crate::last_event_store::LastEventStore;
use crate::model::{Event, Status};

/// Evaluate one strategy's outcome against its last event and, if emission
/// is warranted, atomically update `store` and return the event to publish.
///
/// `candidate` must already carry `left_value`, `event_time`, and identity
/// fields (see [`Event::candidate`]); this function fills in `status` and
/// `current_step`.
///
/// Returns `Ok(None)` for the legitimate "nothing to do" case (not
/// triggered, no open incident). Suppression and muting are represented as
/// `Err(JudgeError)` so callers route them through the same
/// disposition-based logging as every other judging error (spec.md §7
/// classifies them `SilentSkip`).
pub fn judge(
    store: &LastEventStore,
    min_interval_secs: i64,
    newest_sample_timestamp: i64,
    mut candidate: Event,
    is_triggered: bool,
    max_step: u32,
    now: i64,
) -> Result<Option<Event>, JudgeError> {
    let last = store.get(&candidate.id);

    if is_triggered {
        candidate.status = Status::Problem;

        let fresh_incident = match &last {
            None => true,
            Some(last) => last.status == Status::Ok,
        };

        if fresh_incident {
            if max_step == 0 {
                return Err(JudgeError::MutedStrategy);
            }
            candidate.current_step = 1;
            store.set(candidate.clone());
            return Ok(Some(candidate));
        }

        // last.status == Problem
        let last = last.expect("fresh_incident is false only when last is Some");

        if last.current_step >= max_step {
            return Err(JudgeError::SuppressedByQuota);
        }
        if newest_sample_timestamp <= last.event_time {
            return Err(JudgeError::SuppressedByStaleSample);
        }
        if now - last.event_time < min_interval_secs {
            return Err(JudgeError::SuppressedByInterval);
        }

        candidate.current_step = last.current_step + 1;
        store.set(candidate.clone());
        Ok(Some(candidate))
    } else {
        match last {
            Some(last) if last.status == Status::Problem => {
                candidate.status = Status::Ok;
                candidate.current_step = 1;
                store.set(candidate.clone());
                Ok(Some(candidate))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Strategy, Tags};
    use crate::model::Operator;

    const MIN_INTERVAL: i64 = 300;

    fn strategy() -> Strategy {
        Strategy {
            id: 1,
            endpoint_pattern: "host1".to_string(),
            metric: "cpu.idle".to_string(),
            tags: Tags::new(),
            func: "avg(#3)".to_string(),
            operator: Operator::Gt,
            right_value: 10.0,
            max_step: 3,
            priority: 0,
        }
    }

    fn candidate(left_value: f64, event_time: i64) -> Event {
        Event::candidate(
            "s_1_fp".to_string(),
            &strategy(),
            "host1".to_string(),
            left_value,
            event_time,
        )
    }

    #[test]
    fn scenario_1_fresh_incident_emits_problem_step_one() {
        let store = LastEventStore::new();
        let result = judge(&store, MIN_INTERVAL, 300, candidate(11.0, 300), true, 3, 300)
            .unwrap()
            .unwrap();
        assert_eq!(result.status, Status::Problem);
        assert_eq!(result.current_step, 1);
        assert_eq!(result.left_value, 11.0);
    }

    #[test]
    fn scenario_2_too_soon_suppresses_by_interval() {
        let store = LastEventStore::new();
        judge(&store, MIN_INTERVAL, 300, candidate(11.0, 300), true, 3, 300).unwrap();

        let err = judge(&store, MIN_INTERVAL, 360, candidate(13.0, 360), true, 3, 360).unwrap_err();
        assert!(matches!(err, JudgeError::SuppressedByInterval));
        assert_eq!(store.get("s_1_fp").unwrap().current_step, 1);
    }

    #[test]
    fn scenario_3_after_interval_elapses_emits_step_two() {
        let store = LastEventStore::new();
        judge(&store, MIN_INTERVAL, 300, candidate(11.0, 300), true, 3, 300).unwrap();

        let result = judge(&store, MIN_INTERVAL, 600, candidate(13.0, 610), true, 3, 610)
            .unwrap()
            .unwrap();
        assert_eq!(result.current_step, 2);
    }

    #[test]
    fn scenario_4_quota_exhausted_after_max_step_emissions() {
        let store = LastEventStore::new();
        judge(&store, MIN_INTERVAL, 100, candidate(11.0, 100), true, 3, 100).unwrap();
        judge(&store, MIN_INTERVAL, 500, candidate(11.0, 500), true, 3, 500).unwrap();
        judge(&store, MIN_INTERVAL, 900, candidate(11.0, 900), true, 3, 900).unwrap();

        let err = judge(&store, MIN_INTERVAL, 1300, candidate(11.0, 1300), true, 3, 1300).unwrap_err();
        assert!(matches!(err, JudgeError::SuppressedByQuota));
    }

    #[test]
    fn scenario_5_recovery_emits_ok_step_one() {
        let store = LastEventStore::new();
        judge(&store, MIN_INTERVAL, 300, candidate(11.0, 300), true, 3, 300).unwrap();

        let result = judge(&store, MIN_INTERVAL, 600, candidate(5.0, 610), false, 3, 610)
            .unwrap()
            .unwrap();
        assert_eq!(result.status, Status::Ok);
        assert_eq!(result.current_step, 1);
    }

    #[test]
    fn not_triggered_with_no_prior_incident_is_a_silent_no_op() {
        let store = LastEventStore::new();
        let result = judge(&store, MIN_INTERVAL, 300, candidate(5.0, 300), false, 3, 300).unwrap();
        assert!(result.is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn muted_strategy_suppresses_fresh_incident() {
        let store = LastEventStore::new();
        let err = judge(&store, MIN_INTERVAL, 300, candidate(11.0, 300), true, 0, 300).unwrap_err();
        assert!(matches!(err, JudgeError::MutedStrategy));
        assert!(store.is_empty());
    }

    #[test]
    fn stale_sample_is_suppressed_even_after_interval_elapses() {
        let store = LastEventStore::new();
        judge(&store, MIN_INTERVAL, 1000, candidate(11.0, 1000), true, 3, 1000).unwrap();

        // Newest sample timestamp (1000) is not newer than last.event_time (1000).
        let err = judge(&store, MIN_INTERVAL, 1000, candidate(12.0, 2000), true, 3, 2000).unwrap_err();
        assert!(matches!(err, JudgeError::SuppressedByStaleSample));
    }

    #[test]
    fn recovery_only_fires_when_last_was_problem() {
        let store = LastEventStore::new();
        // No prior event at all.
        let result = judge(&store, MIN_INTERVAL, 300, candidate(5.0, 300), false, 3, 300).unwrap();
        assert!(result.is_none());
    }
}
