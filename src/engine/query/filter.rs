use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 9] = [
        Self::Equals,
        Self::NotEquals,
        Self::Contains,
        Self::GreaterThan,
        Self::LessThan,
        Self::GreaterThanOrEqual,
        Self::LessThanOrEqual,
        Self::IsNull,
        Self::IsNotNull,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
        }
    }

    /// Null checks never consult the filter value.
    pub fn is_null_check(self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl fmt::Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let allowed = FilterOperator::ALL
            .iter()
            .map(|op| op.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "unknown operator '{}' (expected one of: {allowed})", self.0)
    }
}

impl FromStr for FilterOperator {
    type Err = UnknownOperator;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == raw)
            .ok_or_else(|| UnknownOperator(raw.to_string()))
    }
}

/// One conjunctive predicate. `value` is always `None` for null checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDescriptor {
    pub column: String,
    pub operator: FilterOperator,
    pub value: Option<String>,
}

impl FilterDescriptor {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: Option<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: if operator.is_null_check() { None } else { value },
        }
    }
}
