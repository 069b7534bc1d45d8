use chrono::{SecondsFormat, Utc};

/// Lower-case `name` and collapse every whitespace run into a single `_`.
///
/// `"Create a  Query"` becomes `"create_a_query"`.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut in_space = false;
    for c in lowered.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Upper-case base-36 rendering, used for generated ids.
pub fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

/// Parses the leading integer of `raw` (optional sign, then digits).
/// Trailing garbage is ignored, no digits at all yields `None`.
pub fn coerce_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end]
        .parse::<i64>()
        .ok()
        .map(|v| v * sign)
}

/// Same as [`coerce_int`] but accepts any JSON scalar.
pub fn coerce_json_int(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => coerce_int(s),
        _ => None,
    }
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn unix_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_whitespace() {
        assert_eq!(slugify("Create a Query"), "create_a_query");
        assert_eq!(slugify("Set  Up\tAlerts"), "set_up_alerts");
        assert_eq!(slugify("already_slugged"), "already_slugged");
    }

    #[test]
    fn base36_matches_known_values() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "Z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(1_700_000_000_000), "LOYW3V28");
    }

    #[test]
    fn coerce_int_behaves_like_parse_int() {
        assert_eq!(coerce_int("42"), Some(42));
        assert_eq!(coerce_int("  -3"), Some(-3));
        assert_eq!(coerce_int("10abc"), Some(10));
        assert_eq!(coerce_int("abc"), None);
        assert_eq!(coerce_int(""), None);
    }

    #[test]
    fn timestamps_are_rfc3339() {
        let ts = now_rfc3339();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert!(ts.ends_with('Z'));
    }
}
