//! Alert identity fingerprinting.
//!
//! An alert identity is the triple `(endpoint, metric, tag set)`. It is
//! collapsed to a stable fingerprint so it can key the Last-Event Store and
//! name the emitted event: `md5(endpoint/metric/sortedTags)`.

use md5::{Digest, Md5};

use crate::model::Tags;

/// Render a tag set in canonical sorted form: `k1=v1,k2=v2,...`.
///
/// `Tags` is a `BTreeMap`, so iteration is already key-sorted — no
/// separate sort step is needed here.
pub fn canonical_tags(tags: &Tags) -> String {
    tags.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Compute the stable fingerprint for an alert identity.
pub fn alert_key_fingerprint(endpoint: &str, metric: &str, tags: &Tags) -> String {
    let pk = format!("{endpoint}/{metric}/{}", canonical_tags(tags));
    let digest = Md5::digest(pk.as_bytes());
    format!("{digest:x}")
}

/// Build the event identifier `s_<strategyId>_<fingerprint>`.
pub fn event_id(strategy_id: i64, fingerprint: &str) -> String {
    format!("s_{strategy_id}_{fingerprint}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_tags_sorts_by_key() {
        let mut tags = Tags::new();
        tags.insert("zone".to_string(), "a".to_string());
        tags.insert("idc".to_string(), "bj".to_string());
        assert_eq!(canonical_tags(&tags), "idc=bj,zone=a");
    }

    #[test]
    fn empty_tags_render_as_empty_string() {
        assert_eq!(canonical_tags(&Tags::new()), "");
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let tags = Tags::new();
        let a = alert_key_fingerprint("host1", "cpu.idle", &tags);
        let b = alert_key_fingerprint("host1", "cpu.idle", &tags);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn fingerprint_differs_on_tag_order_insensitivity() {
        // Insertion order shouldn't matter — only the sorted form does.
        let mut t1 = Tags::new();
        t1.insert("b".to_string(), "2".to_string());
        t1.insert("a".to_string(), "1".to_string());
        let mut t2 = Tags::new();
        t2.insert("a".to_string(), "1".to_string());
        t2.insert("b".to_string(), "2".to_string());
        assert_eq!(
            alert_key_fingerprint("h", "m", &t1),
            alert_key_fingerprint("h", "m", &t2)
        );
    }

    #[test]
    fn fingerprint_differs_on_distinct_identities() {
        let tags = Tags::new();
        assert_ne!(
            alert_key_fingerprint("host1", "cpu.idle", &tags),
            alert_key_fingerprint("host2", "cpu.idle", &tags)
        );
    }

    #[test]
    fn event_id_has_expected_shape() {
        let id = event_id(42, "deadbeef");
        assert_eq!(id, "s_42_deadbeef");
    }
}
