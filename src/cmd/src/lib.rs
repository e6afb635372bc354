use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;

pub mod command;
pub mod config;
pub mod error;

/// Parses `key=value`. The value is taken as JSON when it parses, as a plain
/// string otherwise.
pub fn parse_property(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {s:?}"))?;
    if key.is_empty() {
        return Err(format!("empty property name in {s:?}"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    Ok((key.to_string(), value))
}

/// Accepts RFC 3339 or Unix seconds.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(secs) = s.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).ok_or_else(|| format!("timestamp {secs} out of range"));
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| format!("invalid time {s:?}: {err}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_property() {
        assert_eq!(
            parse_property("Referred By=Friend").unwrap(),
            ("Referred By".to_string(), json!("Friend"))
        );
        assert_eq!(parse_property("n=3").unwrap(), ("n".to_string(), json!(3)));
        assert_eq!(
            parse_property("tags=[\"a\",\"b\"]").unwrap(),
            ("tags".to_string(), json!(["a", "b"]))
        );
        assert_eq!(
            parse_property("url=a=b").unwrap(),
            ("url".to_string(), json!("a=b"))
        );
        assert!(parse_property("novalue").is_err());
        assert!(parse_property("=1").is_err());
    }

    #[test]
    fn test_parse_time() {
        let t = parse_time("1500000000").unwrap();
        assert_eq!(t.timestamp(), 1_500_000_000);

        let t = parse_time("2017-07-14T02:40:00Z").unwrap();
        assert_eq!(t.timestamp(), 1_500_000_000);

        assert!(parse_time("yesterday").is_err());
    }
}
