//! Field keys and event names shared by every structured log line
//!
//! The logging macros write these keys; tests and log consumers read them.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

/// Correlates the start, end and error lines of one cascade
pub const FIELD_REQUEST_ID: &str = "request_id";

// cascade sizes
pub const FIELD_ROOT_COUNT: &str = "root_count";
pub const FIELD_ROWS_WRITTEN: &str = "rows_written";

pub const FIELD_ERR_CODE: &str = "err.code";
pub const FIELD_ERR_MESSAGE: &str = "err.message";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
