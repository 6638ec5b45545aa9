//! Core data model: strategies, sample points, events, and the few small
//! value types (`Operator`, `Status`, `Priority`) that tie them together.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tag set, keyed by tag name. `BTreeMap` keeps iteration in sorted key
/// order for free, which is exactly the order the canonical tag string
/// (`k1=v1,k2=v2,...`) needs — see [`crate::fingerprint`].
pub type Tags = BTreeMap<String, String>;

/// One point in a metric's history: a Unix timestamp in seconds and a
/// (possibly `NaN`) value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub timestamp: i64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A history sequence, **newest first**. Every function in
/// [`crate::function`] indexes position 0 as the most recent point — this
/// ordering is load-bearing throughout the judging pipeline.
pub type History = Vec<SamplePoint>;

/// Comparison operator a strategy's threshold check is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

impl FromStr for Operator {
    type Err = crate::error::JudgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            other => Err(crate::error::JudgeError::UnsupportedOperator(other.to_string())),
        }
    }
}

/// Alert lifecycle status. Problem means "triggered and not yet recovered";
/// Ok means "recovered" (or, implicitly, never triggered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Problem,
    Ok,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Problem => "PROBLEM",
            Status::Ok => "OK",
        }
    }
}

/// The queue priority a strategy's events are routed to. Wraps the raw
/// integer from the strategy; translated to a concrete queue key only at
/// emission time via [`Priority::queue_key`], against the configured
/// `%d`-templated pattern (`Alarm.QueuePattern`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority(pub i64);

impl Priority {
    /// Substitute this priority into a single-`%d` queue key template.
    ///
    /// Only the first `%d` is substituted — a pattern with more than one
    /// placeholder is a configuration error caught at startup
    /// (`Settings::validate`), not here.
    pub fn queue_key(&self, pattern: &str) -> String {
        pattern.replacen("%d", &self.0.to_string(), 1)
    }
}

/// A strategy: a rule mapping one metric series to an alerting predicate.
///
/// `func` is kept as its raw descriptor string (e.g. `"avg(#3)"`) rather
/// than a pre-parsed [`crate::function::Function`] because strategies are
/// refreshed wholesale from an external source — parsing happens once per
/// evaluation, not once per refresh, so a malformed descriptor in one
/// strategy never poisons the whole snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: i64,
    pub endpoint_pattern: String,
    pub metric: String,
    pub tags: Tags,
    pub func: String,
    pub operator: Operator,
    pub right_value: f64,
    /// Maximum number of consecutive PROBLEM notifications. 0 means muted.
    pub max_step: u32,
    pub priority: i64,
}

/// A concrete alert occurrence: one emission (PROBLEM or OK) for one alert
/// identity. Field names are chosen to serialize exactly to the wire shape
/// spec.md §6 documents (`Id, Strategy, Endpoint, LeftValue, EventTime,
/// Status, CurrentStep, PushedTags`) via `rename_all = "PascalCase"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    pub id: String,
    /// Renamed to `Strategy` on the wire — the strategy's id, not the
    /// strategy object itself (the original judge embeds a pointer to the
    /// whole strategy here; this core keeps only the identity it needs).
    #[serde(rename = "Strategy")]
    pub strategy_id: i64,
    pub endpoint: String,
    pub left_value: f64,
    pub event_time: i64,
    pub status: Status,
    pub current_step: u32,
    pub pushed_tags: Tags,
    /// Derived from the owning strategy at emission time; not part of the
    /// wire shape (the queue key already encodes it).
    #[serde(skip)]
    pub priority: i64,
}

impl Event {
    /// Build a fresh candidate event for a strategy evaluation. Status and
    /// `current_step` are filled in by [`crate::state_machine`] once the
    /// triggered/not-triggered decision is known.
    pub fn candidate(
        id: String,
        strategy: &Strategy,
        endpoint: String,
        left_value: f64,
        event_time: i64,
    ) -> Self {
        Self {
            id,
            strategy_id: strategy.id,
            endpoint,
            left_value,
            event_time,
            status: Status::Ok,
            current_step: 0,
            pushed_tags: strategy.tags.clone(),
            priority: strategy.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_parses_both_equality_spellings() {
        assert_eq!(Operator::from_str("=").unwrap(), Operator::Eq);
        assert_eq!(Operator::from_str("==").unwrap(), Operator::Eq);
    }

    #[test]
    fn operator_rejects_unknown_spelling() {
        assert!(Operator::from_str("~=").is_err());
    }

    #[test]
    fn priority_substitutes_first_placeholder_only() {
        let p = Priority(2);
        assert_eq!(p.queue_key("event:p%d"), "event:p2");
    }

    #[test]
    fn event_wire_shape_matches_spec_field_names() {
        let strategy = Strategy {
            id: 7,
            endpoint_pattern: "host.example.com".into(),
            metric: "cpu.idle".into(),
            tags: Tags::new(),
            func: "avg(#3)".into(),
            operator: Operator::Lt,
            right_value: 10.0,
            max_step: 3,
            priority: 1,
        };
        let mut event = Event::candidate(
            "s_7_abc".into(),
            &strategy,
            "host.example.com".into(),
            5.0,
            1000,
        );
        event.status = Status::Problem;
        event.current_step = 1;
        let json = serde_json::to_value(&event).unwrap();
        for key in [
            "Id",
            "Strategy",
            "Endpoint",
            "LeftValue",
            "EventTime",
            "Status",
            "CurrentStep",
            "PushedTags",
        ] {
            assert!(json.get(key).is_some(), "missing field {key}");
        }
        assert!(json.get("priority").is_none());
    }
}
