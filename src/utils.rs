//! Argument helpers
//!
//! Parsing of `key=value` command arguments and local validation of access
//! rules. All failures are [`Error::Command`].

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Special characters allowed in user and group names besides alphanumerics
const USERNAME_SPECIAL_CHARS: &str = "_.-`;'{}[]\\";

/// Collect option pairs into a map, rejecting duplicated keys
///
/// All duplicated keys are reported in a single error.
pub fn extract_key_value_options(pairs: &[(String, String)]) -> Result<BTreeMap<String, String>> {
    let mut result = BTreeMap::new();
    let mut duplicates: Vec<&str> = Vec::new();

    for (key, value) in pairs {
        if result.contains_key(key) {
            duplicates.push(key);
        } else {
            result.insert(key.clone(), value.clone());
        }
    }

    if !duplicates.is_empty() {
        return Err(Error::command(format!(
            "Following options were duplicated: {}",
            duplicates.join(", ")
        )));
    }

    Ok(result)
}

/// Parse `key=value` items into a map
///
/// Values may themselves contain `=`; only the first one splits.
pub fn extract_properties<S: AsRef<str>>(items: &[S]) -> Result<BTreeMap<String, String>> {
    let mut result = BTreeMap::new();

    for item in items {
        let item = item.as_ref();
        let Some((key, value)) = item.split_once('=') else {
            return Err(Error::command(format!(
                "Parsing error, expected format 'key=value' for {}",
                item
            )));
        };
        if result.contains_key(key) {
            return Err(Error::command(format!(
                "Argument '{}' is specified twice.",
                key
            )));
        }
        result.insert(key.to_string(), value.to_string());
    }

    Ok(result)
}

/// Render properties one per line as `key : value`
pub fn format_properties(properties: &BTreeMap<String, String>) -> String {
    properties
        .iter()
        .map(|(key, value)| format!("{} : {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validate an access rule before it is sent to the service
pub fn validate_access(access_type: &str, access: &str) -> Result<()> {
    match access_type {
        "ip" => validate_ip_range(access),
        "user" => validate_username(access),
        // The certificate's CN; any string the backend understands, up to 64 chars
        "cert" => validate_common_name(access.trim()),
        _ => Err(Error::command("Only ip, user, and cert types are supported")),
    }
}

/// Accept `A.B.C.D` or `A.B.C.D/P` with octets 0-255 and prefix 0-32
pub fn validate_ip_range(ip_range: &str) -> Result<()> {
    let format_error = || Error::command("Supported ip format examples:\n\t10.0.0.2, 10.0.0.0/24");

    let parts: Vec<&str> = ip_range.split('/').collect();
    if parts.len() > 2 {
        return Err(format_error());
    }
    if let Some(prefix) = parts.get(1) {
        match prefix.parse::<u8>() {
            Ok(p) if p <= 32 => {}
            _ => return Err(Error::command("IP prefix should be in range from 0 to 32")),
        }
    }

    let octets: Vec<&str> = parts[0].split('.').collect();
    if octets.len() != 4 {
        return Err(format_error());
    }
    for octet in octets {
        if octet.parse::<u8>().is_err() {
            return Err(format_error());
        }
    }

    Ok(())
}

/// Accept 4-32 characters of alphanumerics and `_.-`;'{}[]\`
pub fn validate_username(username: &str) -> Result<()> {
    let length = username.chars().count();
    let valid_chars = username
        .chars()
        .all(|c| c.is_alphanumeric() || USERNAME_SPECIAL_CHARS.contains(c));

    if !(4..=32).contains(&length) || !valid_chars {
        return Err(Error::command(
            "Invalid user or group name. Must be 4-32 characters and consist of \
             alphanumeric characters and special characters ]{.-_'`;}[\\",
        ));
    }
    Ok(())
}

pub fn validate_common_name(common_name: &str) -> Result<()> {
    let length = common_name.chars().count();
    if length == 0 || length > 64 {
        return Err(Error::command(
            "Invalid CN (common name). Must be 1-64 chars long.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_command_error<T: std::fmt::Debug>(result: Result<T>) -> bool {
        matches!(result, Err(Error::Command(_)))
    }

    #[test]
    fn test_extract_properties() {
        let parsed = extract_properties(&["a=1", "b=2"]).unwrap();
        assert_eq!(parsed.get("a").map(String::as_str), Some("1"));
        assert_eq!(parsed.get("b").map(String::as_str), Some("2"));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_extract_properties_rejects_duplicates_and_bad_items() {
        assert!(is_command_error(extract_properties(&["a=1", "a=2"])));
        assert!(is_command_error(extract_properties(&["bogus"])));
    }

    #[test]
    fn test_extract_properties_splits_on_first_equals() {
        let parsed = extract_properties(&["opts=rw=1", "empty="]).unwrap();
        assert_eq!(parsed["opts"], "rw=1");
        assert_eq!(parsed["empty"], "");
    }

    #[test]
    fn test_extract_key_value_options_reports_all_duplicates() {
        let pairs: Vec<(String, String)> = [("a", "1"), ("b", "2"), ("a", "3"), ("b", "4")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        match extract_key_value_options(&pairs) {
            Err(Error::Command(msg)) => assert!(msg.ends_with("a, b"), "{}", msg),
            other => panic!("expected command error, got {:?}", other),
        }

        let unique = extract_key_value_options(&pairs[..2]).unwrap();
        assert_eq!(unique.len(), 2);
        assert!(extract_key_value_options(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_format_properties() {
        let props = extract_properties(&["b=2", "a=1"]).unwrap();
        assert_eq!(format_properties(&props), "a : 1\nb : 2");
    }

    #[test]
    fn test_ip_range_validation() {
        assert!(validate_ip_range("10.0.0.2").is_ok());
        assert!(validate_ip_range("10.0.0.0/24").is_ok());
        assert!(validate_ip_range("0.0.0.0/0").is_ok());
        assert!(is_command_error(validate_ip_range("10.0.0.0/33")));
        assert!(is_command_error(validate_ip_range("10.0.0")));
        assert!(is_command_error(validate_ip_range("999.0.0.1")));
        assert!(is_command_error(validate_ip_range("10.0.0.0/24/8")));
        assert!(is_command_error(validate_ip_range("10.0.0.0/x")));
        assert!(is_command_error(validate_ip_range("a.b.c.d")));
    }

    #[test]
    fn test_username_validation() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("dom\\user_01").is_ok());
        assert!(validate_username(&"u".repeat(32)).is_ok());
        assert!(is_command_error(validate_username("bob")));
        assert!(is_command_error(validate_username(&"u".repeat(33))));
        assert!(is_command_error(validate_username("alice smith")));
        assert!(is_command_error(validate_username("alice@corp")));
    }

    #[test]
    fn test_common_name_validation() {
        assert!(validate_access("cert", "  client.example.com  ").is_ok());
        assert!(is_command_error(validate_access("cert", "   ")));
        assert!(is_command_error(validate_access("cert", &"c".repeat(65))));
    }

    #[test]
    fn test_unknown_access_type() {
        match validate_access("domain", "example.com") {
            Err(Error::Command(msg)) => {
                assert_eq!(msg, "Only ip, user, and cert types are supported")
            }
            other => panic!("expected command error, got {:?}", other),
        }
    }
}
