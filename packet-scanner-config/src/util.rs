use std::{path::PathBuf, str::FromStr};

use crate::loader::error::ConfigLoadError;

/// Parse a boolean value from a raw string, accepting common env-style forms.
///
/// Accepted truthy values (case-insensitive): `"1"`, `"true"`, `"yes"`, `"on"`.
/// Accepted falsy values: `"0"`, `"false"`, `"no"`, `"off"`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Boolean environment variable; a value that is set but not a recognised
/// boolean form is an error.
pub fn parse_bool_var(
    name: &'static str,
) -> Result<Option<bool>, ConfigLoadError> {
    bool_value(name, string_var(name))
}

fn bool_value(
    name: &'static str,
    raw: Option<String>,
) -> Result<Option<bool>, ConfigLoadError> {
    raw.map(|value| {
        parse_bool(&value).ok_or(ConfigLoadError::InvalidEnvValue {
            name,
            value,
            expected: "a boolean (true/false, yes/no, on/off, 1/0)",
        })
    })
    .transpose()
}

/// Non-blank value of an environment variable.
pub fn string_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Non-blank environment variable as a path.
pub fn path_var(name: &str) -> Option<PathBuf> {
    string_var(name).map(PathBuf::from)
}

/// Numeric (or other `FromStr`) environment variable; a value that does not
/// parse is an error rather than a silent fallback to the default.
pub fn parsed_var<T: FromStr>(
    name: &'static str,
) -> Result<Option<T>, ConfigLoadError> {
    parsed_value(name, string_var(name))
}

fn parsed_value<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigLoadError> {
    raw.map(|value| {
        value.parse().map_err(|_| ConfigLoadError::InvalidEnvValue {
            name,
            value,
            expected: std::any::type_name::<T>(),
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_forms() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn unparsable_numbers_are_rejected() {
        let err = parsed_value::<u16>("CLAMD_PORT", Some("33l0".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidEnvValue { name: "CLAMD_PORT", ref value, .. }
                if value == "33l0"
        ));

        assert!(
            parsed_value::<usize>("SCAN_MAX_CONCURRENCY", Some("-1".into()))
                .is_err()
        );
        assert_eq!(
            parsed_value::<usize>("SCAN_MAX_CONCURRENCY", Some("6".into()))
                .unwrap(),
            Some(6)
        );
        assert_eq!(parsed_value::<u16>("CLAMD_PORT", None).unwrap(), None);
    }

    #[test]
    fn unrecognised_booleans_are_rejected() {
        assert!(matches!(
            bool_value("SCAN_FAIL_ON_FETCH_ERROR", Some("maybe".into())),
            Err(ConfigLoadError::InvalidEnvValue {
                name: "SCAN_FAIL_ON_FETCH_ERROR",
                ..
            })
        ));
        assert_eq!(
            bool_value("SCAN_FAIL_ON_FETCH_ERROR", Some("on".into())).unwrap(),
            Some(true)
        );
    }
}
