use crate::data::{cell, Value};
use crate::transform::to_number;
use std::collections::HashMap;

/// Separator joining path segments into a node id
pub const PATH_SEPARATOR: &str = " / ";

/// One node of a path-built hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct SunburstNode {
    pub id: String,
    pub label: String,
    /// Parent id, empty for top-level nodes
    pub parent: String,
    pub value: f64,
}

/// Parallel node sequences handed to the renderer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SunburstTree {
    pub ids: Vec<String>,
    pub labels: Vec<String>,
    pub parents: Vec<String>,
    pub values: Option<Vec<f64>>,
}

/// Build a hierarchy from an ordered list of path columns.
///
/// Every distinct path prefix becomes one node, identified by its segments
/// joined with " / ". Only the deepest node of each row accumulates value
/// (the value column, or 1 per row without one); ancestors stay at 0 and
/// are expected to be sized as the total of their descendants.
pub fn build_from_path(
    rows: &[Vec<Value>],
    path_cols: &[Option<usize>],
    value_col: Option<Option<usize>>,
) -> Vec<SunburstNode> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut nodes: Vec<SunburstNode> = Vec::new();

    for row in rows {
        let parts: Vec<String> = path_cols.iter().map(|&c| cell(row, c).to_string()).collect();
        for depth in 0..parts.len() {
            let id = parts[..=depth].join(PATH_SEPARATOR);
            let slot = match index.get(&id) {
                Some(&slot) => slot,
                None => {
                    nodes.push(SunburstNode {
                        id: id.clone(),
                        label: parts[depth].clone(),
                        parent: parts[..depth].join(PATH_SEPARATOR),
                        value: 0.0,
                    });
                    index.insert(id, nodes.len() - 1);
                    nodes.len() - 1
                }
            };
            if depth == parts.len() - 1 {
                nodes[slot].value += match value_col {
                    Some(col) => to_number(cell(row, col)),
                    None => 1.0,
                };
            }
        }
    }

    nodes
}

impl From<Vec<SunburstNode>> for SunburstTree {
    fn from(nodes: Vec<SunburstNode>) -> Self {
        let mut tree = SunburstTree {
            values: Some(Vec::with_capacity(nodes.len())),
            ..Default::default()
        };
        for node in nodes {
            tree.ids.push(node.id);
            tree.labels.push(node.label);
            tree.parents.push(node.parent);
            if let Some(values) = tree.values.as_mut() {
                values.push(node.value);
            }
        }
        tree
    }
}

/// Take labels and parents straight from two columns.
///
/// Values are only produced when a value column is mapped. Parents are not
/// checked against labels.
pub fn build_from_labels(
    rows: &[Vec<Value>],
    labels_col: Option<usize>,
    parents_col: Option<usize>,
    value_col: Option<Option<usize>>,
) -> SunburstTree {
    let labels: Vec<String> = rows.iter().map(|r| cell(r, labels_col).to_string()).collect();
    SunburstTree {
        ids: labels.clone(),
        labels,
        parents: rows.iter().map(|r| cell(r, parents_col).to_string()).collect(),
        values: value_col.map(|col| rows.iter().map(|r| to_number(cell(r, col))).collect()),
    }
}

/// Size every node as the total of its subtree.
///
/// A leaf keeps its own value (1 when the tree carries no values). A branch
/// gets the larger of its own value and the sum of its children, so an
/// ancestor is never smaller than what it contains. Returned in node order.
pub fn branch_totals(tree: &SunburstTree) -> Vec<f64> {
    let n = tree.ids.len();
    let own = |i: usize| -> f64 {
        match &tree.values {
            Some(values) => values.get(i).copied().unwrap_or(0.0),
            None => 1.0,
        }
    };

    let position: HashMap<&str, usize> = tree
        .ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, parent) in tree.parents.iter().enumerate() {
        if let Some(&p) = position.get(parent.as_str()) {
            if p != i {
                children[p].push(i);
            }
        }
    }

    let mut totals: Vec<Option<f64>> = vec![None; n];
    for start in 0..n {
        // iterative post-order so deep trees cannot overflow the stack
        let mut stack = vec![(start, false)];
        let mut on_path = vec![false; n];
        while let Some((node, expanded)) = stack.pop() {
            if totals[node].is_some() {
                continue;
            }
            if expanded {
                on_path[node] = false;
                let kids = &children[node];
                let total = if kids.is_empty() {
                    own(node)
                } else {
                    let sum: f64 = kids.iter().map(|&k| totals[k].unwrap_or(0.0)).sum();
                    let own_value = if tree.values.is_some() { own(node) } else { 0.0 };
                    own_value.max(sum)
                };
                totals[node] = Some(total);
            } else {
                on_path[node] = true;
                stack.push((node, true));
                for &k in &children[node] {
                    // a cycle is treated as a leaf edge
                    if totals[k].is_none() && !on_path[k] {
                        stack.push((k, false));
                    }
                }
            }
        }
    }

    totals.into_iter().map(|t| t.unwrap_or(0.0)).collect()
}
