//! Browser configuration.

use std::env;

use crate::paginator::DEFAULT_MAX_CALLS;

/// Items per page unless configured.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Settings that shape page assembly. Built once at startup and shared
/// read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    /// Items per browse page.
    pub page_size: usize,
    /// Store calls allowed while assembling one page.
    pub max_calls: usize,
}

impl AdminConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads `DYNADMIN_PAGE_SIZE` and `DYNADMIN_MAX_CALLS`; unset, unparsable
    /// or zero values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            page_size: env_usize("DYNADMIN_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            max_calls: env_usize("DYNADMIN_MAX_CALLS", DEFAULT_MAX_CALLS),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_calls: DEFAULT_MAX_CALLS,
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    parse_positive(env::var(key).ok().as_deref()).unwrap_or(default)
}

fn parse_positive(value: Option<&str>) -> Option<usize> {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_default_to_25_items_and_10_calls() {
        let config = AdminConfig::default();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_calls, 10);
    }

    #[test]
    fn test_should_ignore_invalid_numbers() {
        assert_eq!(parse_positive(Some("40")), Some(40));
        assert_eq!(parse_positive(Some(" 7 ")), Some(7));
        assert_eq!(parse_positive(Some("0")), None);
        assert_eq!(parse_positive(Some("-3")), None);
        assert_eq!(parse_positive(Some("lots")), None);
        assert_eq!(parse_positive(None), None);
    }
}
