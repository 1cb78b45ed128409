use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use super::mining::{MinedPermissions, PolicyReference};
use crate::db::catalog::{SeededPermission, TableSecurity};

pub const CRUD_VERBS: [&str; 4] = ["view", "create", "edit", "delete"];
const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingPermission {
    pub permission: String,
    pub referenced_by: Vec<PolicyReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncompleteCrud {
    pub resource: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapAnalysis {
    pub missing_permissions: Vec<MissingPermission>,
    pub tables_without_policies: Vec<String>,
    pub tables_without_rls: Vec<String>,
    pub incomplete_crud: Vec<IncompleteCrud>,
}

pub fn analyze(
    security: &[TableSecurity],
    seeded: &[SeededPermission],
    referenced: &MinedPermissions,
    rls_exempt: &[String],
) -> GapAnalysis {
    let catalog: HashSet<&str> = seeded.iter().map(|row| row.permission.as_str()).collect();

    let missing_permissions = referenced
        .iter()
        .filter(|(permission, _)| !catalog.contains(permission.as_str()))
        .map(|(permission, references)| MissingPermission {
            permission: permission.clone(),
            referenced_by: references.clone(),
        })
        .collect();

    let mut tables_without_policies: Vec<String> = security
        .iter()
        .filter(|table| table.rls_enabled && table.policy_count == 0)
        .map(|table| table.table.clone())
        .collect();
    tables_without_policies.sort();

    let mut tables_without_rls: Vec<String> = security
        .iter()
        .filter(|table| !table.rls_enabled)
        .filter(|table| !rls_exempt.iter().any(|exempt| exempt == &table.table))
        .map(|table| table.table.clone())
        .collect();
    tables_without_rls.sort();

    GapAnalysis {
        missing_permissions,
        tables_without_policies,
        tables_without_rls,
        incomplete_crud: incomplete_crud(seeded),
    }
}

/// Actions are pooled across roles per resource. A global `*` or a
/// `resource.*` grant covers every verb.
fn incomplete_crud(seeded: &[SeededPermission]) -> Vec<IncompleteCrud> {
    if seeded.iter().any(|row| row.permission == WILDCARD) {
        return Vec::new();
    }

    let mut actions: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for row in seeded {
        if let Some((resource, action)) = row.permission.split_once('.') {
            actions.entry(resource).or_default().insert(action);
        }
    }

    actions
        .into_iter()
        .filter(|(_, granted)| !granted.contains(WILDCARD))
        .filter_map(|(resource, granted)| {
            let missing: Vec<String> = CRUD_VERBS
                .iter()
                .filter(|verb| !granted.contains(*verb))
                .map(|verb| verb.to_string())
                .collect();
            (!missing.is_empty()).then(|| IncompleteCrud {
                resource: resource.to_string(),
                missing,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::analyze;
    use crate::db::catalog::{SeededPermission, TableSecurity};
    use crate::engine::gaps::mining::PolicyReference;

    fn seeded(pairs: &[(&str, &str)]) -> Vec<SeededPermission> {
        pairs
            .iter()
            .map(|(role, permission)| SeededPermission {
                role_id: role.to_string(),
                permission: permission.to_string(),
            })
            .collect()
    }

    fn security(table: &str, rls_enabled: bool, policy_count: i64) -> TableSecurity {
        TableSecurity {
            table: table.to_string(),
            rls_enabled,
            policy_count,
        }
    }

    fn referenced(permission: &str) -> BTreeMap<String, Vec<PolicyReference>> {
        BTreeMap::from([(
            permission.to_string(),
            vec![PolicyReference {
                table: "pages".to_string(),
                policy: "pages_update".to_string(),
            }],
        )])
    }

    #[test]
    fn reports_unseeded_reference_and_incomplete_resource() {
        let analysis = analyze(
            &[security("pages", true, 1)],
            &seeded(&[("admin", "pages.view")]),
            &referenced("pages.edit"),
            &[],
        );

        assert_eq!(analysis.missing_permissions.len(), 1);
        assert_eq!(analysis.missing_permissions[0].permission, "pages.edit");
        assert_eq!(analysis.missing_permissions[0].referenced_by[0].policy, "pages_update");
        assert_eq!(analysis.incomplete_crud.len(), 1);
        assert_eq!(analysis.incomplete_crud[0].resource, "pages");
        assert_eq!(analysis.incomplete_crud[0].missing, vec!["create", "edit", "delete"]);
    }

    #[test]
    fn admin_wildcard_clears_incomplete_crud() {
        let analysis = analyze(
            &[],
            &seeded(&[("admin", "pages.view"), ("admin", "*")]),
            &referenced("pages.edit"),
            &[],
        );

        assert!(analysis.incomplete_crud.is_empty());
        assert_eq!(analysis.missing_permissions.len(), 1);
    }

    #[test]
    fn resource_wildcard_and_pooled_roles_cover_verbs() {
        let analysis = analyze(
            &[],
            &seeded(&[
                ("editor", "pages.view"),
                ("editor", "pages.edit"),
                ("admin", "pages.create"),
                ("admin", "pages.delete"),
                ("admin", "billing.*"),
                ("viewer", "tables.view"),
            ]),
            &BTreeMap::new(),
            &[],
        );

        assert_eq!(analysis.incomplete_crud.len(), 1);
        assert_eq!(analysis.incomplete_crud[0].resource, "tables");
        assert_eq!(analysis.incomplete_crud[0].missing, vec!["create", "edit", "delete"]);
    }

    #[test]
    fn classifies_tables_by_rls_state() {
        let analysis = analyze(
            &[
                security("pages", true, 2),
                security("invoices", true, 0),
                security("audit_log", false, 0),
                security("seaql_migrations", false, 0),
            ],
            &[],
            &BTreeMap::new(),
            &["seaql_migrations".to_string()],
        );

        assert_eq!(analysis.tables_without_policies, vec!["invoices"]);
        assert_eq!(analysis.tables_without_rls, vec!["audit_log"]);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let analysis = analyze(&[], &[], &referenced("pages.edit"), &[]);
        let value = serde_json::to_value(&analysis).expect("serialize");
        assert!(value.get("missingPermissions").is_some());
        assert!(value.get("tablesWithoutPolicies").is_some());
        assert!(value.get("tablesWithoutRls").is_some());
        assert!(value.get("incompleteCrud").is_some());
        assert_eq!(value["missingPermissions"][0]["referencedBy"][0]["table"], "pages");
    }
}
