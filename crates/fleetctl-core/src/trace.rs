use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Generates a trace/request identifier: `"t_" + hex(16 random bytes)`,
/// falling back to a Unix-nanosecond timestamp if randomness is ever
/// unavailable.
pub fn generate_id() -> String {
    let bytes = *Uuid::new_v4().as_bytes();
    format!("t_{}", hex::encode(bytes))
}

/// Fallback identifier used only if the primary generator path is ever
/// unreachable (kept as a named function so call sites can be explicit about
/// which path produced an ID, and so it is independently testable).
pub fn generate_fallback_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("trace_{nanos}")
}
