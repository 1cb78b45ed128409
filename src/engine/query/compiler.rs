//! Statement generation for data queries.
//!
//! Identifiers are re-checked against the identifier grammar here so that no
//! statement is ever built from an unchecked name, whatever the caller did.
//! Every value is a bound parameter.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use sea_orm::{
    DbBackend, Statement, Value,
    sea_query::{
        Alias, Asterisk, Expr, ExprTrait, Func, JoinType, LikeExpr, Order, Query,
        SelectStatement, extension::postgres::PgExpr,
    },
};
use uuid::Uuid;

use super::{
    filter::{FilterDescriptor, FilterOperator},
    pagination::offset,
    request::{DataQueryRequest, SortOrder},
};
use crate::engine::{
    error::{EngineError, FieldError},
    identifier::check_identifier,
    metadata::TableConfig,
};

pub const COUNT_ALIAS: &str = "total";

/// A `LEFT JOIN` that labels a foreign-key column with the referenced row's
/// label column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentJoin {
    pub fk_column: String,
    pub target_table: String,
    pub target_column: String,
    pub label_column: String,
}

impl EnrichmentJoin {
    pub fn output_column(&self) -> String {
        format!("{}__label", self.fk_column)
    }
}

/// Plans one join per forward relationship whose target is synced and has a
/// label column. Targets missing from `targets` are skipped.
pub fn plan_enrichment(
    config: &TableConfig,
    targets: &HashMap<String, std::sync::Arc<TableConfig>>,
) -> Vec<EnrichmentJoin> {
    config
        .forward_relationships()
        .filter_map(|rel| {
            let target = targets.get(&rel.target_table)?;
            let label = target.label_column()?;
            Some(EnrichmentJoin {
                fk_column: rel.source_column.clone(),
                target_table: rel.target_table.clone(),
                target_column: rel.target_column.clone(),
                label_column: label.to_string(),
            })
        })
        .collect()
}

pub struct QueryCompiler<'a> {
    schema: &'a str,
    request: &'a DataQueryRequest,
    config: Option<&'a TableConfig>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(
        schema: &'a str,
        request: &'a DataQueryRequest,
        config: Option<&'a TableConfig>,
    ) -> Self {
        Self {
            schema,
            request,
            config,
        }
    }

    /// `SELECT COUNT(*) AS total FROM .. WHERE ..`
    pub fn count(&self) -> Result<Statement, EngineError> {
        let mut query = Query::select();
        query
            .expr_as(Func::count(Expr::col(Asterisk)), Alias::new(COUNT_ALIAS))
            .from((ident(self.schema), ident(&self.request.table)));
        self.apply_filters(&mut query)?;
        Ok(DbBackend::Postgres.build(&query))
    }

    /// The bounded page query. An empty `joins` slice yields the unenriched
    /// form. Returns `None` for a count-only request (`limit = 0`).
    pub fn select(&self, joins: &[EnrichmentJoin]) -> Result<Option<Statement>, EngineError> {
        let table = &self.request.table;
        self.check_base()?;
        if self.request.limit == 0 {
            return Ok(None);
        }

        let mut query = Query::select();
        query.from((ident(self.schema), ident(table)));

        if joins.is_empty() {
            query.column(Asterisk);
        } else {
            query.column((ident(table), Asterisk));
            for (index, join) in joins.iter().enumerate() {
                require_all(&[
                    ("relationship.source_column", join.fk_column.as_str()),
                    ("relationship.target_table", join.target_table.as_str()),
                    ("relationship.target_column", join.target_column.as_str()),
                    ("label_column", join.label_column.as_str()),
                ])?;
                let alias = format!("rel_{index}");
                query
                    .join_as(
                        JoinType::LeftJoin,
                        (ident(self.schema), ident(&join.target_table)),
                        ident(&alias),
                        Expr::col((ident(table), ident(&join.fk_column)))
                            .equals((ident(&alias), ident(&join.target_column))),
                    )
                    .expr_as(
                        Expr::col((ident(&alias), ident(&join.label_column))),
                        Alias::new(join.output_column()),
                    );
            }
        }

        self.apply_filters(&mut query)?;

        let order = match self.request.order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };
        let sort = self
            .request
            .sort
            .as_deref()
            .or_else(|| self.config.and_then(|config| config.primary_key_column.as_deref()));
        if let Some(sort) = sort {
            require_all(&[("sort", sort)])?;
            query.order_by((ident(table), ident(sort)), order);
        }

        query
            .limit(self.request.limit)
            .offset(offset(self.request.page, self.request.limit));
        Ok(Some(DbBackend::Postgres.build(&query)))
    }

    fn check_base(&self) -> Result<(), EngineError> {
        require_all(&[("schema", self.schema), ("table", &self.request.table)])
    }

    fn apply_filters(&self, query: &mut SelectStatement) -> Result<(), EngineError> {
        self.check_base()?;

        let mut errors = Vec::new();
        for filter in &self.request.filters {
            match predicate(&self.request.table, filter, self.config) {
                Ok(condition) => {
                    query.and_where(condition);
                }
                Err(err) => errors.push(err),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation { fields: errors })
        }
    }
}

/// `SELECT * FROM .. WHERE <id_column> = $1 LIMIT 1`
pub fn record_lookup(
    schema: &str,
    table: &str,
    id_column: &str,
    id: &str,
    config: Option<&TableConfig>,
) -> Result<Statement, EngineError> {
    require_all(&[("schema", schema), ("table", table), ("idColumn", id_column)])?;

    let filter = FilterDescriptor::new(id_column, FilterOperator::Equals, Some(id.to_string()));
    let condition = predicate(table, &filter, config).map_err(|mut err| {
        err.field = "id".to_string();
        EngineError::Validation { fields: vec![err] }
    })?;

    let mut query = Query::select();
    query
        .column(Asterisk)
        .from((ident(schema), ident(table)))
        .and_where(condition)
        .limit(1);
    Ok(DbBackend::Postgres.build(&query))
}

fn require_all(names: &[(&str, &str)]) -> Result<(), EngineError> {
    let fields: Vec<FieldError> = names
        .iter()
        .filter_map(|(field, name)| check_identifier(field, name).err())
        .collect();
    if fields.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation { fields })
    }
}

fn predicate(
    table: &str,
    filter: &FilterDescriptor,
    config: Option<&TableConfig>,
) -> Result<Expr, FieldError> {
    let field = format!("filter[{}]", filter.column);
    check_identifier(&field, &filter.column)?;

    let column = || Expr::col((ident(table), ident(&filter.column)));
    let value = || {
        filter.value.as_deref().ok_or_else(|| {
            FieldError::new(
                &field,
                format!("operator '{}' requires a value", filter.operator),
            )
        })
    };
    let operands = || -> Result<(Expr, Value), FieldError> {
        let raw = value()?;
        let data_type = config
            .and_then(|config| config.field(&filter.column))
            .map(|field| field.data_type.as_str());
        match coerce(data_type, raw) {
            Coerced::Typed(bound) => Ok((column(), bound)),
            Coerced::Text => Ok((text_of(column()), Value::from(raw))),
            Coerced::Invalid(expected) => Err(FieldError::new(
                &field,
                format!("'{raw}' is not a valid {expected}"),
            )),
        }
    };

    match filter.operator {
        FilterOperator::IsNull => Ok(column().is_null()),
        FilterOperator::IsNotNull => Ok(column().is_not_null()),
        FilterOperator::Contains => {
            let pattern = format!("%{}%", escape_like(value()?));
            Ok(text_of(column()).ilike(LikeExpr::new(pattern).escape('\\')))
        }
        FilterOperator::Equals => operands().map(|(lhs, rhs)| lhs.eq(rhs)),
        FilterOperator::NotEquals => operands().map(|(lhs, rhs)| lhs.ne(rhs)),
        FilterOperator::GreaterThan => operands().map(|(lhs, rhs)| lhs.gt(rhs)),
        FilterOperator::LessThan => operands().map(|(lhs, rhs)| lhs.lt(rhs)),
        FilterOperator::GreaterThanOrEqual => operands().map(|(lhs, rhs)| lhs.gte(rhs)),
        FilterOperator::LessThanOrEqual => operands().map(|(lhs, rhs)| lhs.lte(rhs)),
    }
}

fn ident(name: &str) -> Alias {
    Alias::new(name.to_string())
}

fn text_of(expr: Expr) -> Expr {
    expr.cast_as(Alias::new("text"))
}

enum Coerced {
    Typed(Value),
    /// Unknown type: compare the column's text form.
    Text,
    Invalid(&'static str),
}

fn coerce(data_type: Option<&str>, raw: &str) -> Coerced {
    let Some(data_type) = data_type else {
        return Coerced::Text;
    };

    match data_type {
        "smallint" | "integer" | "bigint" => raw
            .trim()
            .parse::<i64>()
            .map(|v| Coerced::Typed(v.into()))
            .unwrap_or(Coerced::Invalid("integer")),
        "real" | "double precision" | "numeric" => raw
            .trim()
            .parse::<f64>()
            .map(|v| Coerced::Typed(v.into()))
            .unwrap_or(Coerced::Invalid("number")),
        "boolean" => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Coerced::Typed(true.into()),
            "false" | "f" | "0" | "no" => Coerced::Typed(false.into()),
            _ => Coerced::Invalid("boolean"),
        },
        "uuid" => Uuid::parse_str(raw.trim())
            .map(|v| Coerced::Typed(v.into()))
            .unwrap_or(Coerced::Invalid("uuid")),
        "date" => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(|v| Coerced::Typed(v.into()))
            .unwrap_or(Coerced::Invalid("date (YYYY-MM-DD)")),
        "timestamp with time zone" => DateTime::parse_from_rfc3339(raw.trim())
            .map(|v| Coerced::Typed(v.into()))
            .unwrap_or(Coerced::Invalid("RFC 3339 timestamp")),
        "timestamp without time zone" => ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw.trim(), format).ok())
            .map(|v| Coerced::Typed(v.into()))
            .unwrap_or(Coerced::Invalid("timestamp")),
        "text" | "character varying" | "character" | "citext" => {
            Coerced::Typed(raw.to_string().into())
        }
        _ => Coerced::Text,
    }
}

/// Escapes `\`, `%` and `_` so the value matches literally under `ESCAPE '\'`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use sea_orm::Value;
    use serde_json::json;

    use super::{EnrichmentJoin, QueryCompiler, escape_like, plan_enrichment, record_lookup};
    use crate::engine::{
        error::EngineError,
        metadata::TableConfig,
        query::{
            filter::{FilterDescriptor, FilterOperator},
            request::{DataQueryRequest, SortOrder},
        },
    };

    fn orders_config() -> TableConfig {
        serde_json::from_value(json!({
            "table_type": "base_table",
            "primary_key_column": "id",
            "field_metadata": [
                { "field_name": "id", "display_name": "Id", "data_type": "integer", "is_required": true, "is_unique": false },
                { "field_name": "customer_id", "display_name": "Customer Id", "data_type": "integer", "is_required": false, "is_unique": false },
                { "field_name": "status", "display_name": "Status", "data_type": "text", "is_required": true, "is_unique": false },
                { "field_name": "paid", "display_name": "Paid", "data_type": "boolean", "is_required": true, "is_unique": false }
            ],
            "relationships": [{
                "name": "orders_customer_id_fkey",
                "kind": "belongs_to",
                "source_table": "orders",
                "source_column": "customer_id",
                "target_table": "customers",
                "target_column": "id"
            }]
        }))
        .expect("config should decode")
    }

    fn customers_config() -> TableConfig {
        serde_json::from_value(json!({
            "table_type": "base_table",
            "primary_key_column": "id",
            "field_metadata": [
                { "field_name": "id", "display_name": "Id", "data_type": "integer", "is_required": true, "is_unique": false },
                { "field_name": "email", "display_name": "Email", "data_type": "text", "is_required": true, "is_unique": true }
            ],
            "relationships": []
        }))
        .expect("config should decode")
    }

    fn request(filters: Vec<FilterDescriptor>) -> DataQueryRequest {
        DataQueryRequest {
            table: "orders".to_string(),
            filters,
            page: 3,
            limit: 20,
            sort: None,
            order: SortOrder::Asc,
        }
    }

    #[test]
    fn count_binds_every_value() {
        let config = orders_config();
        let request = request(vec![
            FilterDescriptor::new("status", FilterOperator::Equals, Some("open'; --".into())),
            FilterDescriptor::new("customer_id", FilterOperator::GreaterThan, Some("7".into())),
        ]);

        let statement = QueryCompiler::new("public", &request, Some(&config))
            .count()
            .expect("count should compile");

        assert_eq!(
            statement.sql,
            r#"SELECT COUNT(*) AS "total" FROM "public"."orders" WHERE "orders"."status" = $1 AND "orders"."customer_id" > $2"#
        );
        let values = statement.values.expect("values should be bound").0;
        assert_eq!(values[0], Value::from("open'; --"));
        assert_eq!(values[1], Value::from(7i64));
    }

    #[test]
    fn select_paginates_and_defaults_to_primary_key_order() {
        let config = orders_config();
        let request = request(Vec::new());

        let statement = QueryCompiler::new("public", &request, Some(&config))
            .select(&[])
            .expect("select should compile")
            .expect("limit > 0 yields a statement");

        assert!(statement.sql.starts_with(r#"SELECT * FROM "public"."orders""#));
        assert!(statement.sql.contains(r#"ORDER BY "orders"."id" ASC"#), "{}", statement.sql);
        let values = statement.values.expect("values should be bound").0;
        assert!(values.contains(&Value::from(20u64)));
        assert!(values.contains(&Value::from(40u64)));
    }

    #[test]
    fn zero_limit_compiles_count_only() {
        let mut request = request(Vec::new());
        request.limit = 0;

        let compiler = QueryCompiler::new("public", &request, None);
        assert!(compiler.count().is_ok());
        assert!(compiler.select(&[]).expect("compiles").is_none());
    }

    #[test]
    fn contains_is_case_insensitive_and_literal() {
        let request = request(vec![FilterDescriptor::new(
            "status",
            FilterOperator::Contains,
            Some("50%_off".into()),
        )]);

        let statement = QueryCompiler::new("public", &request, None)
            .count()
            .expect("count should compile");

        assert!(
            statement.sql.contains(r#"CAST("orders"."status" AS text) ILIKE"#),
            "{}",
            statement.sql
        );
        assert!(statement.sql.contains("$1 ESCAPE"), "{}", statement.sql);
        let values = statement.values.expect("values should be bound").0;
        assert_eq!(values[0], Value::from(r"%50\%\_off%"));
    }

    #[test]
    fn null_checks_bind_nothing() {
        let request = request(vec![FilterDescriptor::new(
            "customer_id",
            FilterOperator::IsNull,
            Some("ignored".into()),
        )]);

        let statement = QueryCompiler::new("public", &request, None)
            .count()
            .expect("count should compile");

        assert!(statement.sql.ends_with(r#"WHERE "orders"."customer_id" IS NULL"#));
        assert!(statement.values.map(|v| v.0.is_empty()).unwrap_or(true));
    }

    #[test]
    fn unsynced_tables_compare_text() {
        let request = request(vec![FilterDescriptor::new(
            "customer_id",
            FilterOperator::NotEquals,
            Some("7".into()),
        )]);

        let statement = QueryCompiler::new("public", &request, None)
            .count()
            .expect("count should compile");

        assert!(
            statement.sql.contains(r#"CAST("orders"."customer_id" AS text) <> $1"#),
            "{}",
            statement.sql
        );
    }

    #[test]
    fn uncoercible_values_are_validation_errors() {
        let config = orders_config();
        let request = request(vec![
            FilterDescriptor::new("customer_id", FilterOperator::Equals, Some("seven".into())),
            FilterDescriptor::new("paid", FilterOperator::Equals, Some("maybe".into())),
        ]);

        let err = QueryCompiler::new("public", &request, Some(&config))
            .count()
            .expect_err("should reject");
        match err {
            EngineError::Validation { fields } => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["filter[customer_id]", "filter[paid]"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn compilation_fails_closed_on_bad_identifiers() {
        let mut bad = request(vec![FilterDescriptor::new(
            "status\"; DROP TABLE x; --",
            FilterOperator::Equals,
            Some("open".into()),
        )]);
        assert!(matches!(
            QueryCompiler::new("public", &bad, None).count(),
            Err(EngineError::Validation { .. })
        ));

        bad.filters.clear();
        bad.table = "orders x".to_string();
        assert!(matches!(
            QueryCompiler::new("public", &bad, None).select(&[]),
            Err(EngineError::Validation { .. })
        ));

        let good = request(Vec::new());
        let join = EnrichmentJoin {
            fk_column: "customer_id".to_string(),
            target_table: "customers".to_string(),
            target_column: "id".to_string(),
            label_column: "email) --".to_string(),
        };
        assert!(matches!(
            QueryCompiler::new("public", &good, None).select(&[join]),
            Err(EngineError::Validation { .. })
        ));
    }

    #[test]
    fn enrichment_left_joins_the_label_column() {
        let config = orders_config();
        let mut targets = HashMap::new();
        targets.insert("customers".to_string(), Arc::new(customers_config()));

        let joins = plan_enrichment(&config, &targets);
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].label_column, "email");
        assert_eq!(joins[0].output_column(), "customer_id__label");

        let request = request(Vec::new());
        let statement = QueryCompiler::new("public", &request, Some(&config))
            .select(&joins)
            .expect("select should compile")
            .expect("limit > 0 yields a statement");

        assert!(statement.sql.starts_with(
            r#"SELECT "orders".*, "rel_0"."email" AS "customer_id__label" FROM "public"."orders" LEFT JOIN "public"."customers" AS "rel_0" ON "orders"."customer_id" = "rel_0"."id""#
        ), "{}", statement.sql);
    }

    #[test]
    fn enrichment_skips_unsynced_targets() {
        let joins = plan_enrichment(&orders_config(), &HashMap::new());
        assert!(joins.is_empty());
    }

    #[test]
    fn record_lookup_binds_the_id() {
        let config = orders_config();
        let statement =
            record_lookup("public", "orders", "id", "42", Some(&config)).expect("compiles");
        assert_eq!(
            statement.sql,
            r#"SELECT * FROM "public"."orders" WHERE "orders"."id" = $1 LIMIT $2"#
        );

        let err = record_lookup("public", "orders", "id", "forty-two", Some(&config))
            .expect_err("should reject");
        assert!(matches!(err, EngineError::Validation { ref fields } if fields[0].field == "id"));

        assert!(record_lookup("public", "orders", "id;", "1", None).is_err());
    }

    #[test]
    fn like_escaping_covers_wildcards_and_backslash() {
        assert_eq!(escape_like(r"a\b%c_d"), r"a\\b\%c\_d");
        assert_eq!(escape_like("plain"), "plain");
    }
}
