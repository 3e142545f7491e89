//! Environment variable parsing utilities.
//!
//! Loaders read variables through an [`Env`] so tests can supply values
//! without touching the process environment.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use super::ConfigError;

/// Source of configuration variables.
#[derive(Debug, Clone)]
pub struct Env {
    overrides: Option<HashMap<String, String>>,
}

impl Env {
    /// Read from the process environment.
    pub fn process() -> Self {
        Self { overrides: None }
    }

    /// No variables set; every key falls back to its default.
    pub fn empty() -> Self {
        Self {
            overrides: Some(HashMap::new()),
        }
    }

    /// Read only from the given pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            overrides: Some(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }

    pub fn var(&self, key: &str) -> Option<String> {
        match &self.overrides {
            Some(map) => map.get(key).cloned(),
            None => std::env::var(key).ok(),
        }
    }
}

/// Get environment variable with default value.
pub fn env_or(env: &Env, key: &str, default: &str) -> String {
    env.var(key).unwrap_or_else(|| default.to_string())
}

/// Get optional environment variable (None if empty or missing).
pub fn env_opt(env: &Env, key: &str) -> Option<String> {
    env.var(key).filter(|s| !s.is_empty())
}

/// Parse environment variable as boolean.
/// Treats "1", "true" (case-insensitive) as true.
pub fn env_bool(env: &Env, key: &str, default: bool) -> bool {
    env.var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

/// Parse environment variable with type conversion.
pub fn env_parse<T: FromStr>(env: &Env, key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env.var(key) {
        Some(v) if !v.is_empty() => v.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
            key: key.into(),
            value: v,
            error: e.to_string(),
        }),
        _ => Ok(default),
    }
}

/// Parse duration string (e.g., "500ms", "30s", "2m", "1h").
/// Bare numbers are seconds. Returns None for "off" or "0".
pub fn parse_duration(s: &str) -> Result<Option<Duration>, String> {
    let s = s.trim().to_lowercase();

    if s == "off" || s == "0" || s.is_empty() {
        return Ok(None);
    }

    let (num_str, unit) = if let Some(n) = s.strip_suffix("ms") {
        (n, "ms")
    } else if let Some(n) = s.strip_suffix('s') {
        (n, "s")
    } else if let Some(n) = s.strip_suffix('m') {
        (n, "m")
    } else if let Some(n) = s.strip_suffix('h') {
        (n, "h")
    } else {
        return s
            .parse::<u64>()
            .map(|secs| non_zero(Duration::from_secs(secs)))
            .map_err(|_| format!("invalid duration: {}", s));
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    let secs_per_unit = match unit {
        "ms" => return Ok(non_zero(Duration::from_millis(num))),
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => return Err(format!("invalid unit: {}", unit)),
    };
    let secs = num
        .checked_mul(secs_per_unit)
        .ok_or_else(|| format!("duration too large: {}", s))?;

    Ok(non_zero(Duration::from_secs(secs)))
}

fn non_zero(duration: Duration) -> Option<Duration> {
    if duration.is_zero() {
        None
    } else {
        Some(duration)
    }
}

/// Parse environment variable as a non-zero duration.
pub fn env_duration(env: &Env, key: &str, default: &str) -> Result<Duration, ConfigError> {
    let value = env_or(env, key, default);
    match parse_duration(&value) {
        Ok(Some(d)) => Ok(d),
        Ok(None) => Err(ConfigError::Invalid {
            key: key.into(),
            message: "must be greater than 0".into(),
        }),
        Err(e) => Err(ConfigError::Parse {
            key: key.into(),
            value,
            error: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("off").unwrap(), None);
        assert_eq!(parse_duration("0").unwrap(), None);
        assert_eq!(parse_duration("0ms").unwrap(), None);
        assert_eq!(parse_duration("").unwrap(), None);

        assert_eq!(
            parse_duration("250ms").unwrap(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(
            parse_duration("30s").unwrap(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_duration("2m").unwrap(),
            Some(Duration::from_secs(120))
        );
        assert_eq!(
            parse_duration("1h").unwrap(),
            Some(Duration::from_secs(3600))
        );

        // Plain seconds
        assert_eq!(
            parse_duration("120").unwrap(),
            Some(Duration::from_secs(120))
        );

        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("1.5s").is_err());
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert!(parse_duration(&format!("{}h", u64::MAX)).is_err());
        assert!(parse_duration(&format!("{}m", u64::MAX / 30)).is_err());
        assert_eq!(
            parse_duration(&format!("{}m", u64::MAX / 60)).unwrap(),
            Some(Duration::from_secs(u64::MAX / 60 * 60))
        );
    }

    #[test]
    fn test_env_helpers() {
        let env = Env::from_pairs([("A", "x"), ("EMPTY", ""), ("FLAG", "TRUE"), ("N", "42")]);

        assert_eq!(env_or(&env, "A", "d"), "x");
        assert_eq!(env_or(&env, "MISSING", "d"), "d");
        assert_eq!(env_opt(&env, "EMPTY"), None);
        assert!(env_bool(&env, "FLAG", false));
        assert!(env_bool(&env, "MISSING", true));
        assert_eq!(env_parse::<usize>(&env, "N", 1).unwrap(), 42);
        assert_eq!(env_parse::<usize>(&env, "MISSING", 1).unwrap(), 1);
        assert!(matches!(
            env_parse::<usize>(&env, "A", 1),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_duration() {
        let env = Env::from_pairs([("D", "500ms"), ("Z", "off"), ("BAD", "soon")]);

        assert_eq!(
            env_duration(&env, "D", "5s").unwrap(),
            Duration::from_millis(500)
        );
        assert_eq!(
            env_duration(&env, "MISSING", "5s").unwrap(),
            Duration::from_secs(5)
        );
        assert!(matches!(
            env_duration(&env, "Z", "5s"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            env_duration(&env, "BAD", "5s"),
            Err(ConfigError::Parse { .. })
        ));
    }
}
