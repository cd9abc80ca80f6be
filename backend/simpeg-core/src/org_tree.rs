// src/org_tree.rs
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::models::{Employee, Position, Unit, VACANT_POSITION};

// --- Arena ---

#[derive(Debug, Clone)]
struct ArenaNode {
    position: Position,
    employee: Option<Employee>,
    unit: Option<Unit>,
    children: Vec<usize>,
}

/// Position forest stored as an arena. Every input position appears exactly
/// once, and the parent links accepted into the arena never form a loop.
#[derive(Debug, Clone, Default)]
pub struct OrgChart {
    nodes: Vec<ArenaNode>,
    roots: Vec<usize>,
    cycle_breaks: Vec<String>,
}

/// Nested view of one position, as handed to API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgNode {
    #[serde(flatten)]
    pub position: Position,
    pub employee: Option<Employee>,
    pub unit: Option<Unit>,
    pub children: Vec<OrgNode>,
}

/// Builds the organization chart from flat parent-pointer records.
///
/// The occupant of a position is the first employee whose `position_id`
/// matches. A parent reference that does not resolve makes the position a
/// root. A parent reference that would close a loop is dropped as well, so the
/// position that closes the loop becomes a root.
pub fn build_org_chart(positions: &[Position], employees: &[Employee], units: &[Unit]) -> OrgChart {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, position) in positions.iter().enumerate() {
        index.entry(position.id.as_str()).or_insert(i);
    }

    let mut nodes: Vec<ArenaNode> = positions
        .iter()
        .map(|position| ArenaNode {
            position: position.clone(),
            employee: employees
                .iter()
                .find(|e| e.position_id == position.id)
                .cloned(),
            unit: units.iter().find(|u| u.id == position.unit_id).cloned(),
            children: Vec::new(),
        })
        .collect();

    let mut parent_of: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut roots = Vec::new();
    let mut cycle_breaks = Vec::new();

    for (i, position) in positions.iter().enumerate() {
        let parent = position
            .parent_position_id
            .as_deref()
            .and_then(|pid| index.get(pid).copied());

        match parent {
            Some(p) if !chain_reaches(&parent_of, p, i) => parent_of[i] = Some(p),
            Some(_) => {
                warn!(
                    "Position {} closes a parent loop via {:?}; showing it as a root",
                    position.id, position.parent_position_id
                );
                cycle_breaks.push(position.id.clone());
                roots.push(i);
            }
            None => {
                if let Some(pid) = &position.parent_position_id {
                    debug!("Position {} has unknown parent {}; showing it as a root", position.id, pid);
                }
                roots.push(i);
            }
        }
    }

    for (child, parent) in parent_of.iter().enumerate() {
        if let Some(p) = parent {
            nodes[*p].children.push(child);
        }
    }

    // Sort children by name; sort is stable so equal names keep input order
    let names: Vec<String> = nodes.iter().map(|n| n.position.name.clone()).collect();
    for node in nodes.iter_mut() {
        node.children.sort_by(|a, b| names[*a].cmp(&names[*b]));
    }

    OrgChart {
        nodes,
        roots,
        cycle_breaks,
    }
}

/// Walks accepted parent links upwards from `start` and reports whether
/// `target` is on the way.
fn chain_reaches(parent_of: &[Option<usize>], start: usize, target: usize) -> bool {
    let mut visited = HashSet::new();
    let mut current = Some(start);
    while let Some(idx) = current {
        if idx == target || !visited.insert(idx) {
            return true;
        }
        current = parent_of[idx];
    }
    false
}

impl OrgChart {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_ids(&self) -> Vec<&str> {
        self.roots
            .iter()
            .map(|i| self.nodes[*i].position.id.as_str())
            .collect()
    }

    /// IDs of positions whose parent link was dropped to break a loop.
    pub fn cycle_breaks(&self) -> &[String] {
        &self.cycle_breaks
    }

    pub fn children_of(&self, position_id: &str) -> Option<Vec<&str>> {
        let node = self.nodes.iter().find(|n| n.position.id == position_id)?;
        Some(
            node.children
                .iter()
                .map(|c| self.nodes[*c].position.id.as_str())
                .collect(),
        )
    }

    pub fn occupant_of(&self, position_id: &str) -> Option<&Employee> {
        self.nodes
            .iter()
            .find(|n| n.position.id == position_id)
            .and_then(|n| n.employee.as_ref())
    }

    /// Nested forest, built bottom-up with an explicit stack.
    pub fn to_forest(&self) -> Vec<OrgNode> {
        let mut built: Vec<Option<OrgNode>> = (0..self.nodes.len()).map(|_| None).collect();

        for &root in &self.roots {
            let mut stack = vec![(root, false)];
            while let Some((idx, expanded)) = stack.pop() {
                let node = &self.nodes[idx];
                if expanded {
                    let children = node
                        .children
                        .iter()
                        .filter_map(|c| built[*c].take())
                        .collect();
                    built[idx] = Some(OrgNode {
                        position: node.position.clone(),
                        employee: node.employee.clone(),
                        unit: node.unit.clone(),
                        children,
                    });
                } else {
                    stack.push((idx, true));
                    for &child in node.children.iter().rev() {
                        stack.push((child, false));
                    }
                }
            }
        }

        self.roots
            .iter()
            .filter_map(|r| built[*r].take())
            .collect()
    }

    /// Indented text outline, one position per line.
    pub fn render_outline(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|r| (*r, 0)).collect();

        while let Some((idx, depth)) = stack.pop() {
            let node = &self.nodes[idx];
            let holder = node
                .employee
                .as_ref()
                .map(|e| e.name.as_str())
                .unwrap_or(VACANT_POSITION);
            out.push_str(&"  ".repeat(depth));
            out.push_str(&format!("{} | {}", node.position.name, holder));
            if let Some(unit) = &node.unit {
                out.push_str(&format!(" [{}]", unit.name));
            }
            out.push('\n');

            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}
