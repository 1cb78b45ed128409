//! Permission-string extraction from policy predicate text.
//!
//! This is a pattern match over one call shape, `<function>( ... '<resource>.<action>' ... )`,
//! not a SQL parser. References that do not go through a recognised
//! function are not seen.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use crate::db::catalog::PolicyRecord;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct PolicyReference {
    pub table: String,
    pub policy: String,
}

/// Permission string -> every policy referencing it, both sorted.
pub type MinedPermissions = BTreeMap<String, Vec<PolicyReference>>;

pub struct PermissionMiner {
    call: Regex,
    literal: Regex,
}

impl PermissionMiner {
    pub fn new(functions: &[String]) -> Result<Self, regex::Error> {
        let names = functions
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        Ok(Self {
            call: Regex::new(&format!(r"(?i)\b(?:{names})\s*\("))?,
            literal: Regex::new(r"'([A-Za-z0-9_]+\.[A-Za-z0-9_*]+)'")?,
        })
    }

    /// Permission strings referenced by one predicate, in order of appearance.
    pub fn extract(&self, predicate: &str) -> Vec<String> {
        let mut found = Vec::new();
        for call in self.call.find_iter(predicate) {
            let arguments = call_arguments(&predicate[call.end()..]);
            for capture in self.literal.captures_iter(arguments) {
                let permission = capture[1].to_string();
                if !found.contains(&permission) {
                    found.push(permission);
                }
            }
        }
        found
    }

    pub fn mine(&self, policies: &[PolicyRecord]) -> MinedPermissions {
        let mut mined = MinedPermissions::new();
        for policy in policies {
            let predicates = [policy.using_expr.as_deref(), policy.with_check_expr.as_deref()];
            for predicate in predicates.into_iter().flatten() {
                for permission in self.extract(predicate) {
                    let reference = PolicyReference {
                        table: policy.table.clone(),
                        policy: policy.name.clone(),
                    };
                    let references = mined.entry(permission).or_default();
                    if !references.contains(&reference) {
                        references.push(reference);
                    }
                }
            }
        }
        for references in mined.values_mut() {
            references.sort();
        }
        mined
    }
}

/// Text up to the parenthesis closing an already-opened call. Quoted text
/// is skipped when counting.
fn call_arguments(rest: &str) -> &str {
    let mut depth = 1usize;
    let mut quoted = false;
    for (index, ch) in rest.char_indices() {
        match ch {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth -= 1;
                if depth == 0 {
                    return &rest[..index];
                }
            }
            _ => {}
        }
    }
    rest
}
