//! Rename cascade: a new place name means a new node ID, and every
//! collection that points at the old ID is rewritten in the same pass.

use map_rules::{random_suffix, MapData, NodeId, NodeReferences, WorldState};
use serde::Serialize;

use crate::error::TurnError;
use crate::knowledge_base::LoreBook;

/// Result of renaming one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutcome {
    pub old_id: NodeId,
    pub new_id: NodeId,
    pub old_name: String,
    pub new_name: String,
    pub references_rewritten: usize,
}

/// The ID node `id` should carry once it is called `new_name`.
///
/// The old suffix is reused. If another node already owns the candidate,
/// `-2`, `-3`, ... is appended until it is free.
pub fn regenerate_node_id(map: &MapData, id: &NodeId, new_name: &str) -> NodeId {
    let suffix = id.suffix().map(str::to_string).unwrap_or_else(random_suffix);
    let base = NodeId::derive(new_name, &suffix);
    let is_free = |candidate: &NodeId| candidate == id || !map.contains_node(candidate);
    if is_free(&base) {
        return base;
    }
    let mut counter = 2;
    loop {
        let candidate = NodeId(format!("{}-{}", base, counter));
        if is_free(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Rename a node and rewrite every reference to it.
///
/// Covers parent links, edge endpoints, item holders, the location pointers
/// and the lore book. The previous place name stays on as an alias.
pub fn rename_node(
    world: &mut WorldState,
    lore: &mut LoreBook,
    id: &NodeId,
    new_name: &str,
) -> Result<RenameOutcome, TurnError> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(TurnError::MalformedPayload(format!(
            "empty new place name for `{}`",
            id
        )));
    }

    let new_id = regenerate_node_id(&world.map, id, new_name);
    let node = world
        .map
        .get_node_mut(id)
        .ok_or_else(|| TurnError::UnknownNode(id.to_string()))?;

    let old_name = std::mem::replace(&mut node.place_name, new_name.to_string());
    node.aliases.retain(|a| !a.eq_ignore_ascii_case(new_name));
    node.add_alias(&old_name);

    let mut rewritten = 0;
    if &new_id != id {
        world.map.rekey_node(id, new_id.clone())?;
        for holder in world.reference_holders_mut() {
            rewritten += holder.rewrite_node_id(id, &new_id);
        }
        rewritten += lore.rewrite_node_id(id, &new_id);
    }

    tracing::info!(
        old_id = %id,
        new_id = %new_id,
        references = rewritten,
        "renamed '{}' to '{}'",
        old_name,
        new_name
    );

    Ok(RenameOutcome {
        old_id: id.clone(),
        new_id,
        old_name,
        new_name: new_name.to_string(),
        references_rewritten: rewritten,
    })
}
