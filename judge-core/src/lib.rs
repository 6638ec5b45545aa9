//! Pure judging logic: data model, function library, fingerprinting, and
//! the alert state machine.
//!
//! This crate has no network, clock, or config dependency. Anything that
//! talks to the outside world (graph queries, the event queue, scheduling,
//! configuration) lives in `judge-cli` and calls into this core.

pub mod error;
pub mod fingerprint;
pub mod function;
pub mod last_event_store;
pub mod model;
pub mod parser;
pub mod recent_item_cache;
pub mod state_machine;

pub use error::{Disposition, JudgeError};
pub use fingerprint::{alert_key_fingerprint, canonical_tags, event_id};
pub use function::{compare, Function, LookupParams, Outcome, Params, RelativeFunction};
pub use last_event_store::LastEventStore;
pub use model::{Event, History, Operator, Priority, SamplePoint, Status, Strategy, Tags};
pub use parser::{parse_func, FunctionVariant, ParsedFunc};
pub use recent_item_cache::{CachedItem, RecentItemCache};
