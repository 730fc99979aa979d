//! Edge curation - drops rumored/removed edges that an open route already
//! covers, and confirms the ones that are the only way through.

use map_rules::{EdgeId, EdgeStatus, MapData, MapEdge, NodeId};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Edges deleted or confirmed by one curation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CurationOutcome {
    pub pruned: Vec<EdgeId>,
    pub promoted: Vec<EdgeId>,
}

impl CurationOutcome {
    pub fn is_empty(&self) -> bool {
        self.pruned.is_empty() && self.promoted.is_empty()
    }
}

/// Undirected adjacency over confirmed edges.
#[derive(Debug, Default)]
struct Adjacency {
    links: BTreeMap<NodeId, BTreeSet<(NodeId, EdgeId)>>,
}

impl Adjacency {
    fn from_map(map: &MapData) -> Self {
        let mut adjacency = Self::default();
        for edge in map.edges().filter(|e| e.status.is_confirmed()) {
            adjacency.link(edge);
        }
        adjacency
    }

    fn link(&mut self, edge: &MapEdge) {
        let (a, b) = (&edge.source_node_id, &edge.target_node_id);
        self.links
            .entry(a.clone())
            .or_default()
            .insert((b.clone(), edge.id.clone()));
        self.links
            .entry(b.clone())
            .or_default()
            .insert((a.clone(), edge.id.clone()));
    }

    /// Breadth-first search for a route of at most `max_depth` hops that
    /// does not use `skip`.
    fn has_path(&self, from: &NodeId, to: &NodeId, skip: &EdgeId, max_depth: usize) -> bool {
        let mut seen: HashSet<&NodeId> = HashSet::from([from]);
        let mut queue: VecDeque<(&NodeId, usize)> = VecDeque::from([(from, 0)]);

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(neighbours) = self.links.get(node) else {
                continue;
            };
            for (next, via) in neighbours {
                if via == skip {
                    continue;
                }
                if next == to {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        false
    }
}

/// Prune or promote every eligible rumored/removed edge, in ID order.
///
/// An edge is eligible when both endpoints are visited and it is not in
/// `exempt` (edges created this turn). Edges whose endpoints are missing
/// are left alone.
pub fn curate_edges(map: &mut MapData, exempt: &HashSet<EdgeId>, max_depth: usize) -> CurationOutcome {
    let mut adjacency = Adjacency::from_map(map);
    let mut outcome = CurationOutcome::default();

    let candidates: Vec<MapEdge> = map
        .edges()
        .filter(|e| !e.status.is_confirmed() && !exempt.contains(&e.id))
        .filter(|e| both_visited(map, e))
        .cloned()
        .collect();

    for edge in candidates {
        let redundant = adjacency.has_path(
            &edge.source_node_id,
            &edge.target_node_id,
            &edge.id,
            max_depth,
        );
        if redundant {
            map.remove_edge(&edge.id);
            tracing::debug!(edge = %edge.id, "pruned redundant {:?} edge", edge.status);
            outcome.pruned.push(edge.id);
        } else if let Some(stored) = map.get_edge_mut(&edge.id) {
            stored.status = EdgeStatus::Open;
            adjacency.link(stored);
            tracing::debug!(edge = %edge.id, "promoted sole link to open");
            outcome.promoted.push(edge.id);
        }
    }

    if !outcome.is_empty() {
        tracing::info!(
            pruned = outcome.pruned.len(),
            promoted = outcome.promoted.len(),
            "edge curation"
        );
    }
    outcome
}

/// Whether an open route between `a` and `b` exists within `max_depth` hops.
pub fn is_reachable(map: &MapData, a: &NodeId, b: &NodeId, max_depth: usize) -> bool {
    a == b || Adjacency::from_map(map).has_path(a, b, &EdgeId(String::new()), max_depth)
}

fn both_visited(map: &MapData, edge: &MapEdge) -> bool {
    [&edge.source_node_id, &edge.target_node_id]
        .into_iter()
        .all(|id| map.get_node(id).is_some_and(|n| n.visited))
}
