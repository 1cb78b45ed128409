//! Parsing of the `page`/`limit`/`sort`/`filter[..]` query-string grammar.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{
    filter::{FilterDescriptor, FilterOperator},
    pagination::checked_offset,
};
use crate::engine::{
    error::{EngineError, FieldError},
    identifier::check_identifier,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_limit: u64,
    pub max_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataQueryRequest {
    pub table: String,
    pub filters: Vec<FilterDescriptor>,
    pub page: u64,
    pub limit: u64,
    pub sort: Option<String>,
    pub order: SortOrder,
}

#[derive(Default)]
struct FilterParts<'a> {
    value: Option<&'a str>,
    operator: Option<&'a str>,
}

impl DataQueryRequest {
    pub fn new(table: impl Into<String>, limit: u64) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            page: 1,
            limit,
            sort: None,
            order: SortOrder::Asc,
        }
    }

    /// Validates every parameter before returning, reporting all offending
    /// fields at once. Parameters outside the grammar are ignored.
    pub fn from_params(
        table: &str,
        params: &HashMap<String, String>,
        limits: PageLimits,
    ) -> Result<Self, EngineError> {
        let mut errors = Vec::new();
        let mut request = Self::new(table, limits.default_limit);

        if let Err(err) = check_identifier("table", table) {
            errors.push(err);
        }

        if let Some(raw) = params.get("page") {
            match raw.trim().parse::<u64>() {
                Ok(0) => errors.push(FieldError::new("page", "page must be at least 1")),
                Ok(page) => request.page = page,
                Err(_) => errors.push(FieldError::new("page", format!("'{raw}' is not a page number"))),
            }
        }

        if let Some(raw) = params.get("limit") {
            match raw.trim().parse::<u64>() {
                Ok(limit) => request.limit = limit.min(limits.max_limit),
                Err(_) => errors.push(FieldError::new("limit", format!("'{raw}' is not a row limit"))),
            }
        }

        if checked_offset(request.page, request.limit).is_none() {
            errors.push(FieldError::new("page", "page out of range"));
        }

        if let Some(sort) = params.get("sort").filter(|sort| !sort.is_empty()) {
            match check_identifier("sort", sort) {
                Ok(()) => request.sort = Some(sort.clone()),
                Err(err) => errors.push(err),
            }
        }

        if let Some(raw) = params.get("order") {
            match raw.to_ascii_lowercase().as_str() {
                "asc" => request.order = SortOrder::Asc,
                "desc" => request.order = SortOrder::Desc,
                _ => errors.push(FieldError::new("order", "order must be 'asc' or 'desc'")),
            }
        }

        // BTreeMap keeps predicate order stable across identical requests.
        let mut filters: BTreeMap<&str, FilterParts<'_>> = BTreeMap::new();
        for (key, value) in params {
            if let Some(column) = bracketed(key, "filter") {
                filters.entry(column).or_default().value = Some(value.as_str());
            } else if let Some(column) = bracketed(key, "filter_op") {
                filters.entry(column).or_default().operator = Some(value.as_str());
            }
        }

        for (column, parts) in filters {
            match parse_filter(column, parts) {
                Ok(filter) => request.filters.push(filter),
                Err(mut field_errors) => errors.append(&mut field_errors),
            }
        }

        if errors.is_empty() {
            Ok(request)
        } else {
            Err(EngineError::Validation { fields: errors })
        }
    }
}

fn bracketed<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')
}

fn parse_filter(column: &str, parts: FilterParts<'_>) -> Result<FilterDescriptor, Vec<FieldError>> {
    let mut errors = Vec::new();
    let value_field = format!("filter[{column}]");
    let op_field = format!("filter_op[{column}]");

    if let Err(err) = check_identifier(&value_field, column) {
        errors.push(err);
    }

    let operator = match parts.operator {
        None => Some(FilterOperator::Equals),
        Some(raw) => match raw.parse::<FilterOperator>() {
            Ok(op) => Some(op),
            Err(err) => {
                errors.push(FieldError::new(&op_field, err.to_string()));
                None
            }
        },
    };

    if let Some(op) = operator
        && !op.is_null_check()
        && parts.value.is_none()
    {
        errors.push(FieldError::new(
            &value_field,
            format!("operator '{op}' requires a value"),
        ));
    }

    match operator {
        Some(op) if errors.is_empty() => Ok(FilterDescriptor::new(
            column,
            op,
            parts.value.map(str::to_string),
        )),
        _ => Err(errors),
    }
}
