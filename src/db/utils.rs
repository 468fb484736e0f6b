//! Identifier and timestamp helpers.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};

static ID_COUNTER: AtomicU32 = AtomicU32::new(0);
static LAST_STAMP_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Generate a 16-character hex id for relational records.
///
/// The high half comes from the clock, the low half from a process-wide
/// counter, so ids generated in the same instant still differ.
pub fn generate_entity_id() -> String {
    let now = Utc::now();
    let time_part = (now.timestamp() as u32) ^ now.timestamp_subsec_nanos();
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:08x}{:08x}", time_part, seq)
}

/// Current timestamp as an RFC 3339 UTC string with millisecond precision.
///
/// Timestamps issued by this process are strictly increasing, so a write
/// always advances `updatedAt` even within the same millisecond.
pub fn current_timestamp() -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_STAMP_MILLIS.load(Ordering::Relaxed);
    let stamp = loop {
        let next = now.max(last + 1);
        match LAST_STAMP_MILLIS.compare_exchange_weak(
            last,
            next,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => break next,
            Err(actual) => last = actual,
        }
    };
    DateTime::<Utc>::from_timestamp_millis(stamp)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
