//! Re-validation of persisted check records before they are probed.
//!
//! Records are validated by the API layer when they are created, but the
//! worker reads them back from storage that anything could have touched. Every
//! field the probe depends on is checked again here before a request is made.

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use super::types::{CheckSpec, CheckState, Method, Protocol};

pub const CHECK_ID_LEN: usize = 20;
pub const OWNER_REF_LEN: usize = 10;
pub const MIN_TIMEOUT_SECONDS: u64 = 1;
pub const MAX_TIMEOUT_SECONDS: u64 = 5;

const KNOWN_FIELDS: [&str; 9] = [
    "id",
    "userPhone",
    "protocol",
    "url",
    "method",
    "successCodes",
    "timeoutSeconds",
    "state",
    "lastChecked",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("check record is not a JSON object")]
    NotAnObject,
    #[error("field `{0}` is missing")]
    Missing(&'static str),
    #[error("field `{field}` is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("record stored under {listed} carries the id {stored}")]
    IdMismatch { listed: String, stored: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::Invalid { field, reason: reason.into() }
}

/// Validate a raw record and normalize its optional fields.
///
/// An unrecognized `state` is treated as never observed; a `lastChecked`
/// that is not a positive number is dropped.
pub fn validate_check(raw: &Value) -> Result<CheckSpec, ValidationError> {
    let record = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let id = validate_fixed_length(record, "id", CHECK_ID_LEN)?;
    let owner_ref = validate_fixed_length(record, "userPhone", OWNER_REF_LEN)?;
    let protocol = validate_protocol(record)?;
    let target = validate_target(record, protocol)?;
    let method = validate_method(record)?;
    let success_codes = validate_success_codes(record)?;
    let timeout_budget = validate_timeout(record)?;

    let state = record.get("state").and_then(Value::as_str).and_then(CheckState::parse);
    let last_checked = record.get("lastChecked").and_then(as_whole_number).filter(|ts| *ts > 0);

    let extra = record
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(CheckSpec {
        id,
        owner_ref,
        protocol,
        target,
        method,
        success_codes,
        timeout_budget,
        state,
        last_checked,
        extra,
    })
}

/// Validate a record read under `listed_id`.
///
/// The record's own `id` must be the one it is stored under, since outcomes
/// are written back under that id.
pub fn validate_stored_check(listed_id: &str, raw: &Value) -> Result<CheckSpec, ValidationError> {
    let check = validate_check(raw)?;
    if check.id != listed_id {
        return Err(ValidationError::IdMismatch {
            listed: listed_id.to_string(),
            stored: check.id,
        });
    }
    Ok(check)
}

fn required<'a>(
    record: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, ValidationError> {
    match record.get(field) {
        None | Some(Value::Null) => Err(ValidationError::Missing(field)),
        Some(value) => Ok(value),
    }
}

fn required_str<'a>(
    record: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    required(record, field)?.as_str().ok_or_else(|| invalid(field, "expected a string"))
}

/// Accepts `3` as well as `3.0`, rejects `2.5`
fn as_whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn validate_fixed_length(
    record: &Map<String, Value>,
    field: &'static str,
    len: usize,
) -> Result<String, ValidationError> {
    let raw = required_str(record, field)?;
    let trimmed_len = raw.trim().chars().count();
    if trimmed_len != len {
        return Err(invalid(field, format!("expected {len} characters, got {trimmed_len}")));
    }
    Ok(raw.to_string())
}

fn validate_protocol(record: &Map<String, Value>) -> Result<Protocol, ValidationError> {
    let raw = required_str(record, "protocol")?;
    Protocol::parse(raw).ok_or_else(|| invalid("protocol", format!("unsupported protocol '{raw}'")))
}

fn validate_target(
    record: &Map<String, Value>,
    protocol: Protocol,
) -> Result<String, ValidationError> {
    let raw = required_str(record, "url")?;
    if raw.trim().is_empty() {
        return Err(invalid("url", "target cannot be empty"));
    }

    let url = Url::parse(&format!("{protocol}://{raw}"))
        .map_err(|e| invalid("url", format!("not a valid URL: {e}")))?;
    if url.host_str().is_none() {
        return Err(invalid("url", "target must include a host"));
    }

    Ok(raw.to_string())
}

fn validate_method(record: &Map<String, Value>) -> Result<Method, ValidationError> {
    let raw = required_str(record, "method")?;
    Method::parse(raw).ok_or_else(|| invalid("method", format!("unsupported method '{raw}'")))
}

fn validate_success_codes(record: &Map<String, Value>) -> Result<Vec<u16>, ValidationError> {
    let codes = required(record, "successCodes")?
        .as_array()
        .ok_or_else(|| invalid("successCodes", "expected an array"))?;

    if codes.is_empty() {
        return Err(invalid("successCodes", "at least one status code is required"));
    }

    codes
        .iter()
        .map(|code| {
            as_whole_number(code)
                .filter(|c| (100..=599).contains(c))
                .map(|c| c as u16)
                .ok_or_else(|| invalid("successCodes", format!("{code} is not an HTTP status code")))
        })
        .collect()
}

fn validate_timeout(record: &Map<String, Value>) -> Result<u64, ValidationError> {
    let value = required(record, "timeoutSeconds")?;
    let seconds = as_whole_number(value)
        .ok_or_else(|| invalid("timeoutSeconds", "expected a whole number of seconds"))?;

    if seconds < MIN_TIMEOUT_SECONDS as i64 || seconds > MAX_TIMEOUT_SECONDS as i64 {
        return Err(invalid(
            "timeoutSeconds",
            format!(
                "{seconds} is outside {MIN_TIMEOUT_SECONDS}..={MAX_TIMEOUT_SECONDS} seconds"
            ),
        ));
    }

    Ok(seconds as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_record() -> Value {
        json!({
            "id": "abcdefghij0123456789",
            "userPhone": "5551234567",
            "protocol": "https",
            "url": "example.com/health?full=1",
            "method": "get",
            "successCodes": [200, 204],
            "timeoutSeconds": 3,
        })
    }

    fn with(field: &str, value: Value) -> Value {
        let mut record = valid_record();
        record[field] = value;
        record
    }

    fn without(field: &str) -> Value {
        let mut record = valid_record();
        record.as_object_mut().unwrap().remove(field);
        record
    }

    #[test]
    fn test_valid_record() {
        let check = validate_check(&valid_record()).unwrap();
        assert_eq!(check.id, "abcdefghij0123456789");
        assert_eq!(check.owner_ref, "5551234567");
        assert_eq!(check.protocol, Protocol::Https);
        assert_eq!(check.target, "example.com/health?full=1");
        assert_eq!(check.method, Method::Get);
        assert_eq!(check.success_codes, vec![200, 204]);
        assert_eq!(check.timeout_budget, 3);
        assert_eq!(check.state, None);
        assert_eq!(check.last_checked, None);
        assert!(check.extra.is_empty());
    }

    #[test]
    fn test_missing_fields() {
        for field in ["id", "userPhone", "protocol", "url", "method", "successCodes", "timeoutSeconds"] {
            assert!(
                matches!(validate_check(&without(field)), Err(ValidationError::Missing(f)) if f == field),
                "missing {field} should be rejected"
            );
        }
        assert_eq!(validate_check(&with("url", Value::Null)), Err(ValidationError::Missing("url")));
    }

    #[test]
    fn test_not_an_object() {
        assert_eq!(validate_check(&json!([1, 2, 3])), Err(ValidationError::NotAnObject));
        assert_eq!(validate_check(&json!("check")), Err(ValidationError::NotAnObject));
    }

    #[test]
    fn test_fixed_length_identifiers() {
        assert!(validate_check(&with("id", json!("short"))).is_err());
        assert!(validate_check(&with("id", json!(12345678901234567890u64))).is_err());
        assert!(validate_check(&with("userPhone", json!("555123456"))).is_err());
        assert!(validate_check(&with("userPhone", json!(5551234567u64))).is_err());
    }

    #[test]
    fn test_protocol_and_method() {
        assert!(validate_check(&with("protocol", json!("ftp"))).is_err());
        assert!(validate_check(&with("protocol", json!("HTTPS"))).is_err());
        assert!(validate_check(&with("method", json!("patch"))).is_err());
        assert!(validate_check(&with("method", json!("GET"))).is_err());

        let check = validate_check(&with("method", json!("delete"))).unwrap();
        assert_eq!(check.method, Method::Delete);
    }

    #[test]
    fn test_target() {
        assert!(validate_check(&with("url", json!("   "))).is_err());
        assert!(validate_check(&with("url", json!(42))).is_err());
        assert!(validate_check(&with("url", json!("exa mple.com"))).is_err());
        assert!(validate_check(&with("url", json!("127.0.0.1:8080/status"))).is_ok());
    }

    #[test]
    fn test_success_codes() {
        assert!(validate_check(&with("successCodes", json!([]))).is_err());
        assert!(validate_check(&with("successCodes", json!(200))).is_err());
        assert!(validate_check(&with("successCodes", json!(["200"]))).is_err());
        assert!(validate_check(&with("successCodes", json!([200, 99]))).is_err());
        assert!(validate_check(&with("successCodes", json!([600]))).is_err());

        let check = validate_check(&with("successCodes", json!([301.0]))).unwrap();
        assert_eq!(check.success_codes, vec![301]);
    }

    #[test]
    fn test_timeout_range() {
        assert!(validate_check(&with("timeoutSeconds", json!(0))).is_err());
        assert!(validate_check(&with("timeoutSeconds", json!(6))).is_err());
        assert!(validate_check(&with("timeoutSeconds", json!(-1))).is_err());
        assert!(validate_check(&with("timeoutSeconds", json!(2.5))).is_err());
        assert!(validate_check(&with("timeoutSeconds", json!("3"))).is_err());

        assert_eq!(validate_check(&with("timeoutSeconds", json!(1))).unwrap().timeout_budget, 1);
        assert_eq!(validate_check(&with("timeoutSeconds", json!(5.0))).unwrap().timeout_budget, 5);
    }

    #[test]
    fn test_state_normalization() {
        let check = validate_check(&with("state", json!("up"))).unwrap();
        assert_eq!(check.state, Some(CheckState::Up));

        let check = validate_check(&with("state", json!("sideways"))).unwrap();
        assert_eq!(check.state, None);

        let check = validate_check(&with("state", json!(1))).unwrap();
        assert_eq!(check.state, None);
    }

    #[test]
    fn test_last_checked_normalization() {
        let check = validate_check(&with("lastChecked", json!(1_700_000_000_000i64))).unwrap();
        assert_eq!(check.last_checked, Some(1_700_000_000_000));

        assert_eq!(validate_check(&with("lastChecked", json!(0))).unwrap().last_checked, None);
        assert_eq!(validate_check(&with("lastChecked", json!(-5))).unwrap().last_checked, None);
        assert_eq!(validate_check(&with("lastChecked", json!(false))).unwrap().last_checked, None);
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let check = validate_check(&with("createdBy", json!({"name": "api"}))).unwrap();
        assert_eq!(check.extra.get("createdBy"), Some(&json!({"name": "api"})));

        let written = serde_json::to_value(&check).unwrap();
        assert_eq!(written["createdBy"], json!({"name": "api"}));
    }

    #[test]
    fn test_stored_check_must_carry_its_own_id() {
        let record = valid_record();
        assert!(validate_stored_check("abcdefghij0123456789", &record).is_ok());
        assert_eq!(
            validate_stored_check("zyxwvutsrq9876543210", &record),
            Err(ValidationError::IdMismatch {
                listed: "zyxwvutsrq9876543210".to_string(),
                stored: "abcdefghij0123456789".to_string(),
            })
        );
    }

    #[test]
    fn test_error_names_field() {
        let err = validate_check(&with("timeoutSeconds", json!(9))).unwrap_err();
        assert_eq!(err.to_string(), "field `timeoutSeconds` is invalid: 9 is outside 1..=5 seconds");
    }
}
