//! Canonical schema constants for structured logging and events
//!
//! These constants keep log lines emitted by registry, table and binding
//! code greppable with a single vocabulary.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Entity identifiers
pub const FIELD_MODEL: &str = "model";
pub const FIELD_REGION: &str = "region";
pub const FIELD_FIELD: &str = "field";
pub const FIELD_METHOD: &str = "method";

// Collection sizes
pub const FIELD_ROW_COUNT: &str = "row_count";
pub const FIELD_RELATED_LEN: &str = "related_len";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Diagnostic events emitted below the operation boundary
pub const EVENT_ROW_REJECTED: &str = "row_rejected";
pub const EVENT_COERCION_SKIPPED: &str = "coercion_skipped";
pub const EVENT_RELATION_CYCLE: &str = "relation_cycle";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!FIELD_MODEL.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        let events = [
            EVENT_START,
            EVENT_END,
            EVENT_END_ERROR,
            EVENT_ROW_REJECTED,
            EVENT_COERCION_SKIPPED,
            EVENT_RELATION_CYCLE,
        ];
        for (i, a) in events.iter().enumerate() {
            for b in &events[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
