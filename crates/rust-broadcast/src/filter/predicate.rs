//! Filter model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BroadcastError;

/// What part of a session a filter inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Any of the session's tags.
    Tag,
    /// The session name.
    Name,
    /// The session type name (`local`, `remote`, `container`, `vm`).
    Type,
    /// An environment variable, written `KEY` or `KEY=VALUE`.
    Environment,
    /// A regex tested against the name and every tag.
    Regex,
}

impl FilterType {
    /// Get the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Name => "name",
            Self::Type => "type",
            Self::Environment => "environment",
            Self::Regex => "regex",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterType {
    type Err = BroadcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tag" => Ok(Self::Tag),
            "name" => Ok(Self::Name),
            "type" => Ok(Self::Type),
            "environment" => Ok(Self::Environment),
            "regex" => Ok(Self::Regex),
            other => Err(BroadcastError::invalid_filter(format!(
                "unknown filter type '{other}'"
            ))),
        }
    }
}

/// How a filter value is compared against the subject string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Exact match.
    #[default]
    Equals,
    /// Substring match.
    Contains,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
    /// The value is a regex; an invalid regex never matches.
    Matches,
}

impl FilterOperator {
    /// Get the canonical snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Matches => "matches",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = BroadcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(Self::Equals),
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            "matches" => Ok(Self::Matches),
            other => Err(BroadcastError::invalid_filter(format!(
                "unknown filter operator '{other}'"
            ))),
        }
    }
}

/// A predicate over a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    /// What the filter inspects.
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    /// How the value is compared.
    #[serde(default)]
    pub operator: FilterOperator,
    /// The comparison value.
    pub value: String,
    /// Invert the outcome.
    #[serde(default)]
    pub negate: bool,
}

impl Filter {
    /// Create a filter.
    pub fn new(filter_type: FilterType, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            filter_type,
            operator,
            value: value.into(),
            negate: false,
        }
    }

    /// Parse a filter from its textual type and operator.
    ///
    /// Unknown type or operator names are rejected.
    pub fn parse(
        filter_type: &str,
        operator: &str,
        value: impl Into<String>,
        negate: bool,
    ) -> crate::Result<Self> {
        Ok(Self {
            filter_type: filter_type.parse()?,
            operator: operator.parse()?,
            value: value.into(),
            negate,
        })
    }

    /// Match against session tags.
    pub fn tag(operator: FilterOperator, value: impl Into<String>) -> Self {
        Self::new(FilterType::Tag, operator, value)
    }

    /// Match against the session name.
    pub fn name(operator: FilterOperator, value: impl Into<String>) -> Self {
        Self::new(FilterType::Name, operator, value)
    }

    /// Match against the session type name.
    pub fn session_type(operator: FilterOperator, value: impl Into<String>) -> Self {
        Self::new(FilterType::Type, operator, value)
    }

    /// Match on an environment variable (`KEY` or `KEY=VALUE`).
    pub fn environment(spec: impl Into<String>) -> Self {
        Self::new(FilterType::Environment, FilterOperator::Equals, spec)
    }

    /// Match a regex against the session name or any tag.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::new(FilterType::Regex, FilterOperator::Matches, pattern)
    }

    /// Return this filter with its negation flipped.
    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// Set the negation flag.
    #[must_use]
    pub const fn negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negate {
            f.write_str("not ")?;
        }
        write!(f, "{} {} {:?}", self.filter_type, self.operator, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_names() {
        let filter = Filter::parse("tag", "starts_with", "prod", true).unwrap();
        assert_eq!(filter.filter_type, FilterType::Tag);
        assert_eq!(filter.operator, FilterOperator::StartsWith);
        assert!(filter.negate);
    }

    #[test]
    fn parse_rejects_unknown_names() {
        let err = Filter::parse("hostname", "equals", "x", false).unwrap_err();
        assert!(err.to_string().contains("unknown filter type"));

        let err = Filter::parse("tag", "like", "x", false).unwrap_err();
        assert!(err.to_string().contains("unknown filter operator"));
    }

    #[test]
    fn serde_uses_type_key_and_rejects_unknown() {
        let filter: Filter =
            serde_json::from_str(r#"{"type":"name","operator":"ends_with","value":"-db"}"#)
                .unwrap();
        assert_eq!(filter, Filter::name(FilterOperator::EndsWith, "-db"));

        assert!(
            serde_json::from_str::<Filter>(r#"{"type":"host","operator":"equals","value":"x"}"#)
                .is_err()
        );
    }

    #[test]
    fn negated_flips() {
        let filter = Filter::regex("^web");
        assert!(!filter.negate);
        assert!(filter.clone().negated().negate);
        assert!(!filter.negated().negated().negate);
    }

    #[test]
    fn display() {
        let filter = Filter::tag(FilterOperator::Contains, "dev").negated();
        assert_eq!(filter.to_string(), "not tag contains \"dev\"");
    }
}
