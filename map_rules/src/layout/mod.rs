// Nested circle layout for the map forest.
//
// Every node is drawn as a circle that encloses all of its descendants:
// - Deepest-first: children are packed before their parent is sized
// - Local positions are relative to the parent's center
// - A second pass turns local offsets into absolute positions
//
// Edges play no part in the layout. Output is deterministic and rounded to
// two decimals so repeated runs diff cleanly.

mod packing;

pub use packing::{pack_children, PackedRing, RADIUS_STEP};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::entities::{MapNode, NodeId, Point};
use crate::world_state::MapData;

const PRECISION: f64 = 100.0;

/// Tunables for the nested circle layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Radius of a node without children.
    pub base_radius: f64,
    /// Clearance between a parent's rim and its children, and between siblings.
    pub padding: f64,
    /// Extra arc between neighbours, spread as `angle_padding / sqrt(n)` per gap.
    pub angle_padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            base_radius: 10.0,
            padding: 4.0,
            angle_padding: 0.3,
        }
    }
}

/// Where a node ends up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePlacement {
    pub position: Point,
    pub radius: f64,
}

pub(crate) fn round_to_precision(value: f64) -> f64 {
    (value * PRECISION).round() / PRECISION
}

/// Round up, ignoring float noise below the precision.
pub(crate) fn ceil_to_precision(value: f64) -> f64 {
    ((value * PRECISION) - 1e-9).ceil() / PRECISION
}

/// Compute absolute positions and radii for every node.
///
/// Nodes whose parent is missing are top-level. Nodes caught in a parent
/// cycle are detached to the top level, lowest ID first. A node carrying the
/// root sentinel's ID is ignored.
pub fn compute_layout(nodes: &[MapNode], config: &LayoutConfig) -> BTreeMap<NodeId, NodePlacement> {
    let root = NodeId::root();
    let padding = config.padding.max(0.0);

    let known: HashSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();
    let mut parent_of: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    for node in nodes.iter().filter(|n| !n.id.is_root()) {
        let parent = node
            .parent()
            .filter(|p| known.contains(p) && **p != node.id)
            .cloned()
            .unwrap_or_else(|| root.clone());
        parent_of.insert(node.id.clone(), parent);
    }
    break_cycles(&mut parent_of);

    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for (child, parent) in &parent_of {
        // BTreeMap iteration keeps each child list sorted by ID.
        children.entry(parent.clone()).or_default().push(child.clone());
    }

    let mut locals: HashMap<NodeId, Point> = HashMap::new();
    let mut radii: HashMap<NodeId, f64> = HashMap::new();
    layout_subtree(&root, &children, config, padding, &mut locals, &mut radii);

    // Top-down: absolute = parent's absolute + local offset.
    let mut placements = BTreeMap::new();
    let mut stack: Vec<(NodeId, Point)> = vec![(root.clone(), Point::ORIGIN)];
    while let Some((id, origin)) = stack.pop() {
        for child in children.get(&id).map(|c| c.as_slice()).unwrap_or(&[]) {
            let local = locals.get(child).copied().unwrap_or(Point::ORIGIN);
            let position = Point::new(
                round_to_precision(origin.x + local.x),
                round_to_precision(origin.y + local.y),
            );
            let radius = radii.get(child).copied().unwrap_or(config.base_radius);
            placements.insert(child.clone(), NodePlacement { position, radius });
            stack.push((child.clone(), position));
        }
    }

    placements
}

/// Lay out the map's nodes and write positions and radii back onto them.
pub fn apply_layout(map: &mut MapData, config: &LayoutConfig) {
    let nodes: Vec<MapNode> = map.nodes().cloned().collect();
    let placements = compute_layout(&nodes, config);
    for (id, placement) in placements {
        if let Some(node) = map.get_node_mut(&id) {
            node.position = placement.position;
            node.visual_radius = placement.radius;
        }
    }
    tracing::debug!(nodes = nodes.len(), "map layout recomputed");
}

/// Post-order: size every child, then pack them. Returns this node's radius.
fn layout_subtree(
    id: &NodeId,
    children: &HashMap<NodeId, Vec<NodeId>>,
    config: &LayoutConfig,
    padding: f64,
    locals: &mut HashMap<NodeId, Point>,
    radii: &mut HashMap<NodeId, f64>,
) -> f64 {
    let kids = match children.get(id) {
        Some(kids) if !kids.is_empty() => kids,
        _ => {
            let radius = ceil_to_precision(config.base_radius.max(0.0));
            radii.insert(id.clone(), radius);
            return radius;
        }
    };

    let mut sized: Vec<(NodeId, f64)> = kids
        .iter()
        .map(|kid| {
            let r = layout_subtree(kid, children, config, padding, locals, radii);
            (kid.clone(), r)
        })
        .collect();

    // Largest first; equal radii keep ID order.
    sized.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let child_radii: Vec<f64> = sized.iter().map(|(_, r)| *r).collect();
    let ring = pack_children(&child_radii, padding, config.angle_padding);
    for ((kid, _), center) in sized.into_iter().zip(ring.centers) {
        locals.insert(kid, center);
    }

    radii.insert(id.clone(), ring.parent_radius);
    ring.parent_radius
}

/// Detach one node of every parent cycle to the top level.
fn break_cycles(parent_of: &mut BTreeMap<NodeId, NodeId>) {
    let root = NodeId::root();
    let ids: Vec<NodeId> = parent_of.keys().cloned().collect();

    for start in ids {
        let mut path: Vec<NodeId> = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut cursor = start;

        while !cursor.is_root() {
            if !seen.insert(cursor.clone()) {
                let cycle_start = path.iter().position(|p| *p == cursor).unwrap_or(0);
                if let Some(cut) = path[cycle_start..].iter().min().cloned() {
                    tracing::warn!(node = %cut, "parent cycle detected, treating node as top-level");
                    parent_of.insert(cut, root.clone());
                }
                break;
            }
            path.push(cursor.clone());
            match parent_of.get(&cursor) {
                Some(parent) => cursor = parent.clone(),
                None => break,
            }
        }
    }
}
