//! Metric names and point-update helpers.
//!
//! Only the `metrics` facade is used here; installing a recorder/exporter is
//! left to the embedding process. Without one every call is a no-op.

use metrics::{counter, gauge};

pub const RECORDS_STORED: &str = "snaplink_records_stored";
pub const RECORDS_CREATED_TOTAL: &str = "snaplink_records_created_total";
pub const RECORDS_DELETED_TOTAL: &str = "snaplink_records_deleted_total";
pub const REDIRECTS_TOTAL: &str = "snaplink_redirects_total";
pub const REDIRECT_FAILURES_TOTAL: &str = "snaplink_redirect_failures_total";
pub const FLUSH_BATCHES_DROPPED_TOTAL: &str = "snaplink_flush_batches_dropped_total";
pub const FLUSH_FAILURES_TOTAL: &str = "snaplink_flush_failures_total";
pub const ACCESS_EVENTS_DROPPED_TOTAL: &str = "snaplink_access_events_dropped_total";

pub fn set_records_stored(count: usize) {
    gauge!(RECORDS_STORED).set(count as f64);
}

pub fn record_created() {
    counter!(RECORDS_CREATED_TOTAL).increment(1);
}

pub fn record_deleted() {
    counter!(RECORDS_DELETED_TOTAL).increment(1);
}

pub fn redirect_succeeded() {
    counter!(REDIRECTS_TOTAL).increment(1);
}

pub fn redirect_failed() {
    counter!(REDIRECT_FAILURES_TOTAL).increment(1);
}

pub fn flush_batch_dropped() {
    counter!(FLUSH_BATCHES_DROPPED_TOTAL).increment(1);
}

pub fn flush_failed() {
    counter!(FLUSH_FAILURES_TOTAL).increment(1);
}

pub fn access_event_dropped() {
    counter!(ACCESS_EVENTS_DROPPED_TOTAL).increment(1);
}
