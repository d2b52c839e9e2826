//! Hand-rolled 5-field cron expression validator.
//!
//! Fields: minute hour day-of-month month day-of-week. Each field is a
//! comma-separated list of items, where an item is `*`, a plain integer, a
//! range `n-m`, or a step `base/s` (`base` is `*`, a range, or a plain
//! integer; `s >= 1`). Day-of-week accepts `7` as an alias for `0` (Sunday),
//! matching the common crontab convention.
//!
//! A dedicated validator (rather than a general-purpose cron parsing crate)
//! exists because these exact bounds and aliasing rules are the contract
//! callers depend on; a generic parser's edge-case behavior is not
//! guaranteed to match.

#[derive(Debug, Clone, Copy)]
struct FieldBounds {
    min: u32,
    max: u32,
}

const MINUTE: FieldBounds = FieldBounds { min: 0, max: 59 };
const HOUR: FieldBounds = FieldBounds { min: 0, max: 23 };
const DAY_OF_MONTH: FieldBounds = FieldBounds { min: 1, max: 31 };
const MONTH: FieldBounds = FieldBounds { min: 1, max: 12 };
const DAY_OF_WEEK: FieldBounds = FieldBounds { min: 0, max: 7 };

fn normalize_dow(value: u32, is_dow: bool) -> u32 {
    if is_dow && value == 7 {
        0
    } else {
        value
    }
}

fn parse_bound_value(raw: &str, bounds: FieldBounds, is_dow: bool) -> Result<u32, String> {
    let value: u32 = raw.parse().map_err(|_| format!("invalid integer: {raw}"))?;
    let effective = normalize_dow(value, is_dow);
    if effective < bounds.min || effective > bounds.max {
        return Err(format!("value {value} out of range {}-{}", bounds.min, bounds.max));
    }
    Ok(effective)
}

/// Validates a base expression: `*`, a plain integer, or a range `n-m`.
fn validate_base(raw: &str, bounds: FieldBounds, is_dow: bool) -> Result<(), String> {
    if raw == "*" {
        return Ok(());
    }
    if let Some((lo, hi)) = raw.split_once('-') {
        let lo_val = parse_bound_value(lo, bounds, is_dow)?;
        let hi_val = parse_bound_value(hi, bounds, is_dow)?;
        if lo_val > hi_val {
            return Err(format!("inverted range: {raw}"));
        }
        return Ok(());
    }
    parse_bound_value(raw, bounds, is_dow)?;
    Ok(())
}

/// Validates a single comma-separated item: a base, optionally followed by
/// `/s` with `s >= 1`.
fn validate_item(raw: &str, bounds: FieldBounds, is_dow: bool) -> Result<(), String> {
    if raw.is_empty() {
        return Err("empty item".to_string());
    }
    match raw.split_once('/') {
        Some((base, step_str)) => {
            validate_base(base, bounds, is_dow)?;
            let step: u32 = step_str
                .parse()
                .map_err(|_| format!("invalid step value: {raw}"))?;
            if step < 1 {
                return Err(format!("step must be >= 1: {raw}"));
            }
            Ok(())
        }
        None => validate_base(raw, bounds, is_dow),
    }
}

fn validate_field(raw: &str, bounds: FieldBounds, is_dow: bool) -> Result<(), String> {
    if raw.is_empty() {
        return Err("empty field".to_string());
    }
    for item in raw.split(',') {
        validate_item(item, bounds, is_dow)?;
    }
    Ok(())
}

/// The cron flag names the classifier recognises as carrying a cron
/// expression. Kept in sync with the command catalogue's schedule-related
/// flag names — see `crate::catalog`. A cron flag name is never treated as
/// a target action key.
pub const CRON_FLAG_KEYS: &[&str] = &["cron", "schedule", "cron-expr"];

pub fn is_cron_flag_key(key: &str) -> bool {
    CRON_FLAG_KEYS.contains(&key)
}

/// Validates a 5-field cron expression. Returns `Err` with a human-readable
/// reason on the first invalid field encountered.
pub fn validate_cron(expr: &str) -> Result<(), String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(format!("expected 5 fields, got {}", fields.len()));
    }

    validate_field(fields[0], MINUTE, false)?;
    validate_field(fields[1], HOUR, false)?;
    validate_field(fields[2], DAY_OF_MONTH, false)?;
    validate_field(fields[3], MONTH, false)?;
    validate_field(fields[4], DAY_OF_WEEK, true)?;

    Ok(())
}
