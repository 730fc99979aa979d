//! Node resolver - turns a caller's identifier into a node ID.
//!
//! Priority: exact ID > place name > alias > fuzzy match. Name and alias
//! comparisons ignore case.

mod rename;

pub use rename::*;

use map_rules::{MapData, MapNode, NodeId};

/// Minimum Jaro-Winkler similarity for a fuzzy match.
pub const FUZZY_THRESHOLD: f64 = 0.88;

const LEADING_ARTICLES: [&str; 3] = ["the ", "a ", "an "];

/// Resolve an ID, place name or alias to a node. `None` means unresolved.
pub fn resolve_node(identifier: &str, map: &MapData) -> Option<NodeId> {
    resolve_exact(identifier, map).or_else(|| fuzzy_match(identifier, map))
}

/// Like [`resolve_node`] but without the fuzzy fallback.
pub fn resolve_exact(identifier: &str, map: &MapData) -> Option<NodeId> {
    let wanted = identifier.trim();
    if wanted.is_empty() {
        return None;
    }

    let id = NodeId::from(wanted);
    if map.contains_node(&id) {
        return Some(id);
    }

    let lowered = wanted.to_lowercase();
    let by_id = map.nodes().find(|n| n.id.as_str().to_lowercase() == lowered);
    let by_name = || map.nodes().find(|n| n.place_name.to_lowercase() == lowered);
    let by_alias = || {
        map.nodes()
            .find(|n| n.aliases.iter().any(|a| a.to_lowercase() == lowered))
    };

    by_id.or_else(by_name).or_else(by_alias).map(|n| n.id.clone())
}

/// Resolve `identifier`, also returning the node.
pub fn resolve_node_ref<'a>(identifier: &str, map: &'a MapData) -> Option<&'a MapNode> {
    resolve_node(identifier, map).and_then(|id| map.get_node(&id))
}

/// Lower-case, drop punctuation and a leading article, collapse whitespace.
pub fn normalize_place_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    LEADING_ARTICLES
        .iter()
        .find_map(|article| collapsed.strip_prefix(article))
        .map(str::to_string)
        .unwrap_or(collapsed)
}

/// Best-effort match on normalized names and aliases.
fn fuzzy_match(identifier: &str, map: &MapData) -> Option<NodeId> {
    let wanted = normalize_place_name(identifier);
    if wanted.is_empty() {
        return None;
    }

    let names_of = |n: &MapNode| -> Vec<String> {
        std::iter::once(&n.place_name)
            .chain(n.aliases.iter())
            .map(|s| normalize_place_name(s))
            .collect()
    };

    if let Some(node) = map.nodes().find(|n| names_of(n).contains(&wanted)) {
        return Some(node.id.clone());
    }

    // Highest score wins; nodes iterate in ID order so ties keep the lowest ID.
    let mut best: Option<(f64, &NodeId)> = None;
    for node in map.nodes() {
        let score = names_of(node)
            .iter()
            .map(|name| strsim::jaro_winkler(&wanted, name))
            .fold(0.0, f64::max);
        if score >= FUZZY_THRESHOLD && best.map_or(true, |(s, _)| score > s) {
            best = Some((score, &node.id));
        }
    }
    if let Some((score, id)) = best {
        tracing::debug!(identifier, node = %id, score, "fuzzy node match");
    }
    best.map(|(_, id)| id.clone())
}
