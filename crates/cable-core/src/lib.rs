//! Cable configuration sizing and validation
//!
//! Sizing rules for PON cable builds: which strand counts exist for each
//! cable type, how big a terminal needs to be for its assigned lots, how
//! many strands a cable must carry once teather splicers divert strands
//! between cables, and a cycle check over the teather graph.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Strand counts available as either BAU or FNAP cable.
pub const CABLE_SIZES_BOTH: [u32; 6] = [24, 48, 72, 144, 288, 432];
/// Strand counts available as BAU only.
pub const CABLE_SIZES_BAU_ONLY: [u32; 2] = [216, 864];
/// Terminal sizes, in fibers.
pub const TERMINAL_SIZES: [u32; 4] = [4, 6, 8, 12];
/// Teather divert counts (ribbon increments).
pub const TEATHER_OPTIONS: [u32; 4] = [12, 24, 36, 48];

/// Fibers provisioned per assigned lot.
const FIBERS_PER_LOT: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CableType {
    Bau,
    Fnap,
}

/// One terminal's configuration on a cable. The engineer may override the
/// suggested size, in which case `actual_size` wins.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalConfig {
    pub actual_size: Option<u32>,
    pub suggested_size: Option<u32>,
}

impl TerminalConfig {
    /// The size that counts against the cable: actual when set, suggested
    /// otherwise, zero when neither is known yet.
    pub fn effective_size(&self) -> u32 {
        self.actual_size.or(self.suggested_size).unwrap_or(0)
    }
}

/// A teather splicer diverting strands from one cable into another.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeatherSplice {
    pub cable_id: i64,
    pub target_cable_id: i64,
    pub divert_count: u32,
}

/// Suggested terminal size for a lot count, provisioning 1.5 fibers per
/// lot: the smallest size that fits, capped at 12.
pub fn terminal_size_suggestion(assignment_count: u32) -> u32 {
    if assignment_count == 0 {
        return TERMINAL_SIZES[0];
    }

    let required_fibers = (assignment_count as f64 * FIBERS_PER_LOT).ceil() as u32;
    TERMINAL_SIZES
        .iter()
        .copied()
        .find(|&size| size >= required_fibers)
        .unwrap_or(TERMINAL_SIZES[3])
}

/// Whether a cable type/size combination exists in the catalog.
pub fn validate_cable_type_size(cable_type: CableType, cable_size: u32) -> bool {
    match cable_type {
        CableType::Fnap => CABLE_SIZES_BOTH.contains(&cable_size),
        CableType::Bau => {
            CABLE_SIZES_BOTH.contains(&cable_size) || CABLE_SIZES_BAU_ONLY.contains(&cable_size)
        }
    }
}

/// Valid strand counts for a cable type, ascending.
pub fn valid_cable_sizes(cable_type: CableType) -> Vec<u32> {
    let mut sizes: Vec<u32> = match cable_type {
        CableType::Fnap => CABLE_SIZES_BOTH.to_vec(),
        CableType::Bau => CABLE_SIZES_BOTH
            .iter()
            .chain(CABLE_SIZES_BAU_ONLY.iter())
            .copied()
            .collect(),
    };
    sizes.sort_unstable();
    sizes
}

/// Total strand count a cable must carry: its terminals plus strands
/// diverted out through teathers plus strands received from other cables.
pub fn cable_total_count(
    terminals: &[TerminalConfig],
    teathers_from: &[TeatherSplice],
    teathers_to: &[TeatherSplice],
) -> u32 {
    let terminal_count: u32 = terminals.iter().map(|t| t.effective_size()).sum();
    let diverted_out: u32 = teathers_from.iter().map(|t| t.divert_count).sum();
    let diverted_in: u32 = teathers_to.iter().map(|t| t.divert_count).sum();
    terminal_count + diverted_out + diverted_in
}

/// Smallest valid size that carries `total_count`, or the largest valid
/// size when nothing fits.
pub fn suggest_cable_size(total_count: u32, cable_type: CableType) -> u32 {
    let sizes = valid_cable_sizes(cable_type);
    sizes
        .iter()
        .copied()
        .find(|&size| size >= total_count)
        .unwrap_or(*sizes.last().expect("size catalog is never empty"))
}

/// True when the teather graph has no cycles. A cable teathered into
/// itself counts as a cycle.
pub fn validate_no_circular_teathers(teathers: &[TeatherSplice]) -> bool {
    let mut graph: HashMap<i64, Vec<i64>> = HashMap::new();
    for teather in teathers {
        if teather.cable_id == teather.target_cable_id {
            return false;
        }
        graph
            .entry(teather.cable_id)
            .or_default()
            .push(teather.target_cable_id);
    }

    let mut visited = HashSet::new();
    for &node in graph.keys() {
        if !visited.contains(&node) && has_cycle(&graph, node, &mut visited, &mut HashSet::new()) {
            return false;
        }
    }
    true
}

fn has_cycle(
    graph: &HashMap<i64, Vec<i64>>,
    node: i64,
    visited: &mut HashSet<i64>,
    stack: &mut HashSet<i64>,
) -> bool {
    visited.insert(node);
    stack.insert(node);

    for &neighbor in graph.get(&node).map(Vec::as_slice).unwrap_or_default() {
        if !visited.contains(&neighbor) {
            if has_cycle(graph, neighbor, visited, stack) {
                return true;
            }
        } else if stack.contains(&neighbor) {
            return true;
        }
    }

    stack.remove(&node);
    false
}
