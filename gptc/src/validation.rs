//! Grammar checks for oracle responses.
//!
//! A response is split on `'\n'` exactly as received (no trimming), so an
//! empty response is a single empty line and a trailing newline yields a
//! trailing empty line. Every active check runs over every line and the
//! verdict collects all violations; the response is accepted only when there
//! are none.

use std::fmt;

use crate::mode::ValidationPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    MissingPrefix { line: usize, expected: String },
    LineTooLong { line: usize, length: usize, max: usize },
    LineCount { expected: usize, actual: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingPrefix { line, expected } => {
                write!(f, "line {} does not start with {}", line, expected)
            }
            Violation::LineTooLong { line, length, max } => {
                write!(f, "line {} is {} characters long (max {})", line, length, max)
            }
            Violation::LineCount { expected, actual } => {
                write!(f, "expected {} lines, got {}", expected, actual)
            }
        }
    }
}

/// Accept/reject outcome plus the reasons behind a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub violations: Vec<Violation>,
}

impl ValidationVerdict {
    pub fn is_accepted(&self) -> bool {
        self.violations.is_empty()
    }

    /// Human-readable summary for logs.
    pub fn reason(&self) -> String {
        if self.violations.is_empty() {
            return "ok".to_string();
        }
        self.violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone)]
pub struct ResponseValidator {
    policy: ValidationPolicy,
}

impl ResponseValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn validate(&self, response: &str) -> ValidationVerdict {
        let lines: Vec<&str> = response.split('\n').collect();
        let mut violations = Vec::new();

        if let Some(prefix) = &self.policy.prefix {
            for (idx, line) in lines.iter().enumerate() {
                if !line.starts_with(prefix.as_str()) {
                    violations.push(Violation::MissingPrefix {
                        line: idx + 1,
                        expected: prefix.clone(),
                    });
                }
            }
        }

        if let Some(expected) = self.policy.exact_line_count {
            if lines.len() != expected {
                violations.push(Violation::LineCount {
                    expected,
                    actual: lines.len(),
                });
            }
        }

        // Runs even when the count is already wrong.
        if let Some(max) = self.policy.max_line_length {
            for (idx, line) in lines.iter().enumerate() {
                let length = line.chars().count();
                if length > max {
                    violations.push(Violation::LineTooLong {
                        line: idx + 1,
                        length,
                        max,
                    });
                }
            }
        }

        ValidationVerdict { violations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;

    fn validator(mode: Mode) -> ResponseValidator {
        ResponseValidator::new(mode.policy())
    }

    #[test]
    fn test_heading_response_accepted() {
        let verdict = validator(Mode::Heading).validate("HDG AB1 090\nHDG AB2 270");
        assert!(verdict.is_accepted(), "{}", verdict.reason());
        assert_eq!(verdict.reason(), "ok");
    }

    #[test]
    fn test_bad_prefix_rejected() {
        let verdict = validator(Mode::Heading).validate("HDG AB1 090\nTURN AB2 270");
        assert!(!verdict.is_accepted());
        assert_eq!(
            verdict.violations,
            vec![Violation::MissingPrefix {
                line: 2,
                expected: "HDG".to_string()
            }]
        );
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert!(!validator(Mode::Altitude).validate("alt AB1 27000").is_accepted());
    }

    #[test]
    fn test_line_too_long_rejected() {
        let verdict = validator(Mode::Altitude).validate("ALT AB1 27000\nALT AB2 23000 PLEASE NOW");
        assert!(!verdict.is_accepted());
        assert!(matches!(
            verdict.violations[0],
            Violation::LineTooLong { line: 2, max: 20, .. }
        ));
    }

    #[test]
    fn test_line_of_exactly_max_length_accepted() {
        let line = "SPD AB1 2500000000000";
        assert_eq!(line.len(), 21);
        assert!(!validator(Mode::Speed).validate(line).is_accepted());
        assert!(validator(Mode::Speed).validate(&line[..20]).is_accepted());
    }

    #[test]
    fn test_empty_response_rejected() {
        assert!(!validator(Mode::Heading).validate("").is_accepted());
        let verdict = validator(Mode::Approach).validate("");
        assert_eq!(
            verdict.violations,
            vec![Violation::LineCount {
                expected: 3,
                actual: 1
            }]
        );
    }

    #[test]
    fn test_trailing_newline_counts_as_empty_line() {
        assert!(!validator(Mode::Heading).validate("HDG AB1 090\n").is_accepted());
    }

    #[test]
    fn test_approach_requires_exact_count() {
        let ok = "DL1: 220 0 130.0 65.0\nDL2: 220 10 130.1 65.1\nDL3: 180 20 129.0 64.0";
        assert!(validator(Mode::Approach).validate(ok).is_accepted());
        let two = "DL1: 220 0 130.0 65.0\nDL2: 220 10 130.1 65.1";
        assert!(!validator(Mode::Approach).validate(two).is_accepted());
    }

    #[test]
    fn test_length_checked_after_count_mismatch() {
        let response = "DL1: 220 0 130.0 65.0 and then some more words";
        let verdict = validator(Mode::Approach).validate(response);
        assert_eq!(verdict.violations.len(), 2);
        assert!(verdict
            .violations
            .iter()
            .any(|v| matches!(v, Violation::LineCount { expected: 3, actual: 1 })));
        assert!(verdict
            .violations
            .iter()
            .any(|v| matches!(v, Violation::LineTooLong { line: 1, .. })));
    }

    #[test]
    fn test_prefix_and_count_compose() {
        let policy = ValidationPolicy {
            prefix: Some("HDG".to_string()),
            max_line_length: Some(20),
            exact_line_count: Some(2),
        };
        let v = ResponseValidator::new(policy);
        assert!(v.validate("HDG A 090\nHDG B 270").is_accepted());
        assert!(!v.validate("HDG A 090").is_accepted());
        assert!(!v.validate("HDG A 090\nALT B 270").is_accepted());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let policy = ValidationPolicy {
            prefix: None,
            max_line_length: Some(5),
            exact_line_count: None,
        };
        assert!(ResponseValidator::new(policy).validate("ééééé").is_accepted());
    }
}
