//! Parent/child table relationships and insertion order
//!
//! Relationships form a directed graph over table names. The engine inserts
//! into tables in an order where every parent precedes its children, so a
//! generated parent key is always available before a child row needs it.

use crate::error::{FlattenError, Result};
use crate::types::{TableDefinition, TableRelationship};
use std::collections::{HashMap, VecDeque};

const FOREIGN_KEY_SUFFIX: &str = "_id";

/// Infer relationships from `_id` column naming.
///
/// A non primary-key column `<parent>_id` in table T produces a
/// `<parent> -> T` relationship when a table named exactly `<parent>` is in
/// the input set. Failing that, a table named `<parent>s` is accepted, so
/// `user_id` links to `users`.
pub fn auto_detect(tables: &[TableDefinition]) -> Vec<TableRelationship> {
    let mut relationships = Vec::new();

    for table in tables {
        for column in &table.columns {
            if column.is_primary_key {
                continue;
            }
            let Some(parent_name) = column.name.strip_suffix(FOREIGN_KEY_SUFFIX) else {
                continue;
            };
            let plural = format!("{}s", parent_name);
            let parent = tables
                .iter()
                .find(|t| t.name == parent_name)
                .or_else(|| tables.iter().find(|t| t.name == plural));
            if let Some(parent) = parent {
                relationships.push(TableRelationship {
                    parent_table: parent.name.clone(),
                    child_table: table.name.clone(),
                    foreign_key_column: column.name.clone(),
                    parent_key_column: "id".to_string(),
                });
            }
        }
    }

    relationships
}

/// Topologically sort `table_names` so that parents come before children.
///
/// Kahn's algorithm with a FIFO queue seeded in input order, so the result is
/// reproducible for a fixed input. Relationships naming a table outside
/// `table_names` are dropped before the graph is built and can neither add
/// nodes nor hide a cycle among the named tables. Duplicate names are
/// collapsed to their first occurrence.
pub fn insert_order(
    table_names: &[String],
    relationships: &[TableRelationship],
) -> Result<Vec<String>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut nodes: Vec<&str> = Vec::new();
    for name in table_names {
        if !index.contains_key(name.as_str()) {
            index.insert(name.as_str(), nodes.len());
            nodes.push(name.as_str());
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree: Vec<usize> = vec![0; nodes.len()];

    for rel in relationships {
        let (Some(&parent), Some(&child)) = (
            index.get(rel.parent_table.as_str()),
            index.get(rel.child_table.as_str()),
        ) else {
            continue;
        };
        children[parent].push(child);
        in_degree[child] += 1;
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(current) = queue.pop_front() {
        order.push(current);
        for &child in &children[current] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    if order.len() < nodes.len() {
        let remaining = (0..nodes.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| nodes[i].to_string())
            .collect();
        return Err(FlattenError::CircularDependency { remaining });
    }

    Ok(order.into_iter().map(|i| nodes[i].to_string()).collect())
}
