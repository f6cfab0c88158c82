//! Accept rules for response status codes.
//!
//! A rule is either a single integer literal (`"404"`) or a half-open range
//! (`"200-300"`, inclusive of 200, exclusive of 300). A status is accepted
//! when any rule matches it.

use crate::error::FetchError;

/// Accept rules used when none are configured.
pub const DEFAULT_ACCEPT_STATUS_CODES: &[&str] = &["200-300"];

/// A single parsed accept rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRule {
    /// Matches exactly one status code.
    Literal(i64),
    /// Matches `start <= code < end`.
    Range {
        /// Inclusive lower bound.
        start: i64,
        /// Exclusive upper bound.
        end: i64,
    },
}

impl StatusRule {
    /// Parses a rule string.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidStatusCodeRange`] if the literal or either
    /// range bound is not an integer. Integers outside the status code space
    /// are valid and simply never match.
    pub fn parse(rule: &str) -> Result<Self, FetchError> {
        let invalid = || FetchError::invalid_status_code_range(rule);

        if let Some((start, end)) = rule.split_once('-') {
            let start = start.trim().parse::<i64>().map_err(|_| invalid())?;
            let end = end.trim().parse::<i64>().map_err(|_| invalid())?;
            return Ok(Self::Range { start, end });
        }

        rule.trim()
            .parse::<i64>()
            .map(Self::Literal)
            .map_err(|_| invalid())
    }

    /// Returns true if `code` satisfies this rule.
    #[must_use]
    pub fn matches(self, code: u16) -> bool {
        let code = i64::from(code);
        match self {
            Self::Literal(status) => code == status,
            Self::Range { start, end } => start <= code && code < end,
        }
    }
}

/// A validated set of accept rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptRules {
    rules: Vec<StatusRule>,
}

impl AcceptRules {
    /// Parses every rule up front, so malformed configuration fails before any request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidStatusCodeRange`] for the first malformed rule.
    pub fn parse<S: AsRef<str>>(rules: &[S]) -> Result<Self, FetchError> {
        let rules = rules
            .iter()
            .map(|rule| StatusRule::parse(rule.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Returns true if any rule matches `code`. An empty set accepts nothing.
    #[must_use]
    pub fn accepts(&self, code: u16) -> bool {
        self.rules.iter().any(|rule| rule.matches(code))
    }

    /// Returns the parsed rules in configuration order.
    #[must_use]
    pub fn rules(&self) -> &[StatusRule] {
        &self.rules
    }
}

/// Checks whether `code` is accepted by `rules`.
///
/// Every rule is validated even when an earlier one already matched.
///
/// # Errors
///
/// Returns [`FetchError::InvalidStatusCodeRange`] if any rule is malformed.
pub fn accepts<S: AsRef<str>>(code: u16, rules: &[S]) -> Result<bool, FetchError> {
    Ok(AcceptRules::parse(rules)?.accepts(code))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const VALID: &[&str] = &["100", "200-300", "400"];

    #[test]
    fn test_accepts_literal() {
        assert!(accepts(100, VALID).unwrap());
        assert!(accepts(400, VALID).unwrap());
    }

    #[test]
    fn test_accepts_inside_range() {
        assert!(accepts(200, VALID).unwrap());
        assert!(accepts(299, VALID).unwrap());
    }

    #[test]
    fn test_rejects_outside_rules() {
        assert!(!accepts(150, VALID).unwrap());
        assert!(!accepts(401, VALID).unwrap());
    }

    #[test]
    fn test_range_end_is_exclusive() {
        assert!(!accepts(300, VALID).unwrap());
    }

    #[test]
    fn test_empty_rules_accept_nothing() {
        let empty: &[&str] = &[];
        assert!(!accepts(200, empty).unwrap());
        assert!(!accepts(0, empty).unwrap());
    }

    #[test]
    fn test_invalid_literal_raises_even_after_match() {
        let result = accepts(200, &["200-300", "a"]);
        assert!(matches!(
            result,
            Err(FetchError::InvalidStatusCodeRange { rule }) if rule == "a"
        ));
    }

    #[test]
    fn test_wrong_delimiter_raises() {
        assert!(matches!(
            accepts(0, &["200_300"]),
            Err(FetchError::InvalidStatusCodeRange { .. })
        ));
    }

    #[test]
    fn test_non_numeric_range_raises() {
        assert!(matches!(
            accepts(0, &["a-b"]),
            Err(FetchError::InvalidStatusCodeRange { .. })
        ));
        assert!(matches!(
            accepts(0, &["2oo-3oo"]),
            Err(FetchError::InvalidStatusCodeRange { .. })
        ));
    }

    #[test]
    fn test_half_open_range_bound_raises() {
        assert!(accepts(0, &["200-"]).is_err());
        assert!(accepts(0, &["-300"]).is_err());
    }

    #[test]
    fn test_whitespace_around_bounds_is_trimmed() {
        assert!(accepts(250, &[" 200 - 300 "]).unwrap());
        assert!(accepts(404, &[" 404"]).unwrap());
    }

    #[test]
    fn test_out_of_range_integers_are_valid_rules() {
        assert!(accepts(200, &["200-300", "70000"]).unwrap());
        assert!(accepts(250, &["200-70000"]).unwrap());
        assert!(!accepts(404, &["70000"]).unwrap());
        assert_eq!(
            StatusRule::parse("0-99999").unwrap(),
            StatusRule::Range {
                start: 0,
                end: 99_999
            }
        );
    }

    #[test]
    fn test_parse_keeps_rule_order() {
        let rules = AcceptRules::parse(&["404", "500-502"]).unwrap();
        assert_eq!(
            rules.rules(),
            &[
                StatusRule::Literal(404),
                StatusRule::Range {
                    start: 500,
                    end: 502
                }
            ]
        );
    }

    #[test]
    fn test_default_rules_accept_success_range() {
        let rules = AcceptRules::parse(DEFAULT_ACCEPT_STATUS_CODES).unwrap();
        assert!(rules.accepts(200));
        assert!(rules.accepts(204));
        assert!(!rules.accepts(300));
        assert!(!rules.accepts(500));
    }
}
