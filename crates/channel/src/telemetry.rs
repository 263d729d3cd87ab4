//! Channel creation counters.

use corelib::Stage;
use metrics::counter;

// ============================================================================
// Metric Names
// ============================================================================

/// Total number of channels created, by stack.
pub const CHANNELS_CREATED_TOTAL: &str = "stack_channels_created_total";
/// Total number of failed channel creations, by stack and stage.
pub const CHANNEL_FAILURES_TOTAL: &str = "stack_channel_failures_total";

// ============================================================================
// Metric Recording Functions
// ============================================================================

pub fn record_channel_created(stack: &str) {
    counter!(CHANNELS_CREATED_TOTAL, "stack" => stack.to_owned()).increment(1);
}

/// Record a failed creation. Failures without a stage are labelled `unknown`.
pub fn record_channel_failure(stack: &str, stage: Option<Stage>) {
    let stage = stage.map_or("unknown", |s| s.as_str());
    counter!(CHANNEL_FAILURES_TOTAL, "stack" => stack.to_owned(), "stage" => stage).increment(1);
}
