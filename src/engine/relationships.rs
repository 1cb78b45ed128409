//! Foreign-key edge detection in both directions.

use sea_orm::DbErr;

use super::metadata::{RelationshipConfig, RelationshipKind};
use crate::db::catalog::{CatalogReader, ForeignKeyRow, ForeignKeySide};

pub struct RelationshipDetector<'a> {
    catalog: &'a dyn CatalogReader,
}

impl<'a> RelationshipDetector<'a> {
    pub fn new(catalog: &'a dyn CatalogReader) -> Self {
        Self { catalog }
    }

    /// Edges where `table` holds the FK column.
    pub async fn detect_forward(&self, table: &str) -> Result<Vec<RelationshipConfig>, DbErr> {
        let rows = self
            .catalog
            .foreign_keys(table, ForeignKeySide::Referencing)
            .await?;
        Ok(normalize(rows, RelationshipKind::BelongsTo))
    }

    /// Edges where another table (possibly `table` itself) points at `table`.
    pub async fn detect_reverse(&self, table: &str) -> Result<Vec<RelationshipConfig>, DbErr> {
        let rows = self
            .catalog
            .foreign_keys(table, ForeignKeySide::Referenced)
            .await?;
        Ok(normalize(rows, RelationshipKind::HasMany))
    }
}

fn normalize(mut rows: Vec<ForeignKeyRow>, kind: RelationshipKind) -> Vec<RelationshipConfig> {
    rows.sort_by(|a, b| {
        (&a.source_table, &a.source_column, &a.constraint_name).cmp(&(
            &b.source_table,
            &b.source_column,
            &b.constraint_name,
        ))
    });
    rows.dedup();

    rows.into_iter()
        .map(|row| RelationshipConfig {
            name: row.constraint_name,
            kind,
            source_table: row.source_table,
            source_column: row.source_column,
            target_table: row.target_table,
            target_column: row.target_column,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use sea_orm::DbErr;

    use super::RelationshipDetector;
    use crate::db::catalog::{CatalogReader, ColumnInfo, ForeignKeyRow, ForeignKeySide};
    use crate::engine::metadata::RelationshipKind;

    /// In-memory catalog for engine tests.
    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        pub tables: Vec<String>,
        pub columns: HashMap<String, Vec<ColumnInfo>>,
        pub primary_keys: HashMap<String, String>,
        pub foreign_keys: Vec<ForeignKeyRow>,
        pub broken_tables: Vec<String>,
    }

    impl FakeCatalog {
        fn check(&self, table: &str) -> Result<(), DbErr> {
            if self.broken_tables.iter().any(|broken| broken == table) {
                return Err(DbErr::Custom(format!("catalog read failed for {table}")));
            }
            Ok(())
        }
    }

    pub(crate) fn fk(name: &str, source: (&str, &str), target: (&str, &str)) -> ForeignKeyRow {
        ForeignKeyRow {
            constraint_name: name.to_string(),
            source_table: source.0.to_string(),
            source_column: source.1.to_string(),
            target_table: target.0.to_string(),
            target_column: target.1.to_string(),
        }
    }

    #[async_trait]
    impl CatalogReader for FakeCatalog {
        async fn list_tables(&self) -> Result<Vec<String>, DbErr> {
            Ok(self.tables.clone())
        }

        async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbErr> {
            self.check(table)?;
            Ok(self.columns.get(table).cloned().unwrap_or_default())
        }

        async fn primary_key(&self, table: &str) -> Result<Option<String>, DbErr> {
            self.check(table)?;
            Ok(self.primary_keys.get(table).cloned())
        }

        async fn comments(
            &self,
            tables: &[String],
        ) -> Result<HashMap<String, Option<String>>, DbErr> {
            Ok(tables.iter().map(|table| (table.clone(), None)).collect())
        }

        async fn foreign_keys(
            &self,
            table: &str,
            side: ForeignKeySide,
        ) -> Result<Vec<ForeignKeyRow>, DbErr> {
            self.check(table)?;
            Ok(self
                .foreign_keys
                .iter()
                .filter(|row| match side {
                    ForeignKeySide::Referencing => row.source_table == table,
                    ForeignKeySide::Referenced => row.target_table == table,
                })
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn forward_and_reverse_edges_are_mirror_images() {
        let catalog = FakeCatalog {
            foreign_keys: vec![
                fk("order_items_order_id_fkey", ("order_items", "order_id"), ("orders", "id")),
                fk("orders_customer_id_fkey", ("orders", "customer_id"), ("customers", "id")),
            ],
            ..Default::default()
        };
        let detector = RelationshipDetector::new(&catalog);

        let forward = detector.detect_forward("orders").await.expect("forward");
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].kind, RelationshipKind::BelongsTo);
        assert_eq!(forward[0].source_column, "customer_id");
        assert_eq!(forward[0].target_table, "customers");

        let reverse = detector.detect_reverse("orders").await.expect("reverse");
        assert_eq!(reverse.len(), 1);
        assert_eq!(reverse[0].kind, RelationshipKind::HasMany);
        assert_eq!(reverse[0].source_table, "order_items");
        assert_eq!(reverse[0].target_table, "orders");
    }

    #[tokio::test]
    async fn self_reference_yields_one_edge_each_way() {
        let catalog = FakeCatalog {
            foreign_keys: vec![
                fk("employees_manager_id_fkey", ("employees", "manager_id"), ("employees", "id")),
                fk("employees_manager_id_fkey", ("employees", "manager_id"), ("employees", "id")),
            ],
            ..Default::default()
        };
        let detector = RelationshipDetector::new(&catalog);

        let forward = detector.detect_forward("employees").await.expect("forward");
        let reverse = detector.detect_reverse("employees").await.expect("reverse");
        assert_eq!(forward.len(), 1);
        assert_eq!(reverse.len(), 1);
        assert_eq!(forward[0].source_column, reverse[0].source_column);
    }

    #[tokio::test]
    async fn edges_are_sorted_deterministically() {
        let catalog = FakeCatalog {
            foreign_keys: vec![
                fk("shipments_order_id_fkey", ("shipments", "order_id"), ("orders", "id")),
                fk("invoices_order_id_fkey", ("invoices", "order_id"), ("orders", "id")),
                fk("invoices_alt_order_fkey", ("invoices", "alt_order_id"), ("orders", "id")),
            ],
            ..Default::default()
        };
        let detector = RelationshipDetector::new(&catalog);

        let reverse = detector.detect_reverse("orders").await.expect("reverse");
        let names: Vec<_> = reverse.iter().map(|rel| rel.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "invoices_alt_order_fkey",
                "invoices_order_id_fkey",
                "shipments_order_id_fkey"
            ]
        );
    }
}
