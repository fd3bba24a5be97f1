//! Parsing of relative-time expressions accepted by [`crate::workflow::WorkflowContext::wait`].
//!
//! The grammar is deliberately small and closed: an integer count followed by
//! a unit name, e.g. `"7 days"`, `"30 minutes"`, `"1 hour"`. Units may be
//! singular or plural and matching is case-insensitive.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// A `wait()` argument did not match the supported grammar.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid duration expression {0:?}, expected e.g. \"7 days\" or \"30 minutes\"")]
pub struct DurationParseError(pub String);

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(\d+)\s+(second|seconds|minute|minutes|hour|hours|day|days|week|weeks)\s*$")
            .expect("duration pattern is valid")
    })
}

/// Parses a relative-time expression into a [`Duration`].
///
/// Zero is a valid count (`"0 seconds"`), matching the boundary behaviour
/// that a zero-duration timer wakes on the very next poll.
pub fn parse_duration(expr: &str) -> Result<Duration, DurationParseError> {
    let caps = pattern()
        .captures(expr)
        .ok_or_else(|| DurationParseError(expr.to_string()))?;

    let count: u64 = caps[1]
        .parse()
        .map_err(|_| DurationParseError(expr.to_string()))?;

    let seconds = match caps[2].to_ascii_lowercase().as_str() {
        "second" | "seconds" => count,
        "minute" | "minutes" => count * 60,
        "hour" | "hours" => count * 3_600,
        "day" | "days" => count * 86_400,
        "week" | "weeks" => count * 604_800,
        _ => unreachable!("pattern only matches known units"),
    };

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_known_units() {
        assert_eq!(parse_duration("7 days").unwrap(), Duration::from_secs(7 * 86_400));
        assert_eq!(parse_duration("30 minutes").unwrap(), Duration::from_secs(30 * 60));
        assert_eq!(parse_duration("1 hour").unwrap(), Duration::from_secs(3_600));
        assert_eq!(parse_duration("1 week").unwrap(), Duration::from_secs(604_800));
    }

    #[test]
    fn test_is_case_insensitive() {
        assert_eq!(parse_duration("2 DAYS").unwrap(), Duration::from_secs(2 * 86_400));
        assert_eq!(parse_duration("2 Days").unwrap(), parse_duration("2 days").unwrap());
    }

    #[test]
    fn test_zero_duration_is_valid() {
        assert_eq!(parse_duration("0 seconds").unwrap(), Duration::from_secs(0));
    }

    #[test]
    fn test_rejects_unknown_unit() {
        assert!(parse_duration("5 fortnights").is_err());
    }

    #[test]
    fn test_rejects_malformed_expression() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("seven days").is_err());
    }
}
