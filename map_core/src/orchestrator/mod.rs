//! Turn orchestrator - applies one update payload to the map per turn.
//!
//! ## Pipeline
//!
//! 1. Resolve where the player is
//! 2. Apply node and edge additions/updates (renames cascade here)
//! 3. Enrich new places through the optional [`PlaceEnricher`]
//! 4. Repair the hierarchy
//! 5. Propagate visited/discovered status up from the current node
//! 6. Curate redundant edges
//! 7. Lay the map out and report
//!
//! Every stage works on a copy of the state. The copy replaces the live
//! state only when the whole pipeline succeeds.

mod payload;

pub use payload::*;

use async_trait::async_trait;
use map_rules::{
    apply_layout, EdgeId, MapData, MapEdge, MapNode, MapSnapshot, NodeId, NodeStatus, NodeType,
    WorldState,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::MapConfig;
use crate::curation::curate_edges;
use crate::error::{EnrichError, TurnError};
use crate::events::{EventSink, MapEvent, TurnDiagnostics, TurnStage};
use crate::hierarchy::{HierarchyArbiter, HierarchyEngine};
use crate::knowledge_base::LoreBook;
use crate::resolver::{rename_node, resolve_exact, resolve_node, RenameOutcome};

/// Details an enricher fills in for a freshly added place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetails {
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// External collaborator that writes descriptions for new places.
#[async_trait]
pub trait PlaceEnricher: Send + Sync {
    async fn enrich(&self, node: &MapNode, parent: Option<&MapNode>) -> Result<PlaceDetails, EnrichError>;
}

/// Owns the world state and runs the per-turn pipeline over it.
pub struct MapOrchestrator {
    state: WorldState,
    lore: LoreBook,
    config: MapConfig,
    arbiter: Option<Arc<dyn HierarchyArbiter>>,
    enricher: Option<Arc<dyn PlaceEnricher>>,
    events: EventSink,
}

impl MapOrchestrator {
    pub fn new(state: WorldState) -> Self {
        Self {
            state,
            lore: LoreBook::new(),
            config: MapConfig::default(),
            arbiter: None,
            enricher: None,
            events: EventSink::none(),
        }
    }

    pub fn with_config(mut self, config: MapConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_lore(mut self, lore: LoreBook) -> Self {
        self.lore = lore;
        self
    }

    pub fn with_arbiter(mut self, arbiter: Arc<dyn HierarchyArbiter>) -> Self {
        self.arbiter = Some(arbiter);
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn PlaceEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Report status, map changes and diagnostics on `sender`.
    pub fn with_events(mut self, sender: UnboundedSender<MapEvent>) -> Self {
        self.events = EventSink::new(sender);
        self
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn map(&self) -> &MapData {
        &self.state.map
    }

    pub fn lore(&self) -> &LoreBook {
        &self.lore
    }

    pub fn lore_mut(&mut self) -> &mut LoreBook {
        &mut self.lore
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Rendering/persistence view of the map.
    pub fn snapshot(&self) -> MapSnapshot {
        self.state.map.snapshot()
    }

    pub fn into_state(self) -> WorldState {
        self.state
    }

    /// Parse a JSON payload and process it. Parse failures abort the turn.
    pub async fn process_turn_json(&mut self, json: &str) -> Result<TurnDiagnostics, TurnError> {
        match MapUpdatePayload::from_json(json) {
            Ok(payload) => self.process_turn(&payload).await,
            Err(err) => Err(self.abort(err)),
        }
    }

    /// Run the whole pipeline. On error the state is left as it was.
    pub async fn process_turn(&mut self, payload: &MapUpdatePayload) -> Result<TurnDiagnostics, TurnError> {
        let (state, lore, diagnostics) = match self.run_turn(payload).await {
            Ok(output) => output,
            Err(err) => return Err(self.abort(err)),
        };

        self.state = state;
        self.lore = lore;

        tracing::info!(
            turn = diagnostics.turn,
            added_nodes = diagnostics.added_nodes.len(),
            added_edges = diagnostics.added_edges.len(),
            repairs = diagnostics.hierarchy_repairs.len(),
            pruned = diagnostics.pruned_edges.len(),
            current = ?diagnostics.current_node_id,
            "turn applied"
        );
        self.events.emit(MapEvent::MapDataChanged {
            turn: self.state.turn,
            node_count: self.state.map.node_count(),
            edge_count: self.state.map.edge_count(),
        });
        self.events.emit(MapEvent::Diagnostics(diagnostics.clone()));
        Ok(diagnostics)
    }

    fn abort(&self, err: TurnError) -> TurnError {
        tracing::warn!(turn = self.state.turn + 1, %err, "turn aborted, map unchanged");
        self.events.emit(MapEvent::TurnAborted {
            reason: err.to_string(),
        });
        err
    }

    async fn run_turn(
        &self,
        payload: &MapUpdatePayload,
    ) -> Result<(WorldState, LoreBook, TurnDiagnostics), TurnError> {
        payload.validate()?;

        let mut world = self.state.clone();
        let mut lore = self.lore.clone();
        let mut diag = TurnDiagnostics {
            turn: world.turn + 1,
            previous_node_id: world.pointers.current_node_id.clone(),
            ..TurnDiagnostics::default()
        };
        let mut created_edges: HashSet<EdgeId> = HashSet::new();

        self.events.status(TurnStage::ResolvingLocation);
        let location = payload.location_identifier();
        // Only exact matches count before additions; a new place may be the
        // better fuzzy candidate.
        let mut resolved = location.and_then(|text| resolve_exact(text, &world.map));

        self.events.status(TurnStage::ApplyingUpdates);
        apply_node_additions(&mut world.map, &payload.nodes_to_add, &mut diag)?;
        for update in &payload.nodes_to_update {
            apply_node_update(&mut world, &mut lore, update, &mut diag)?;
        }
        for change in &payload.edges_to_add {
            add_or_update_edge(&mut world.map, change, &mut diag, &mut created_edges)?;
        }
        for change in &payload.edges_to_update {
            update_edge(&mut world.map, change, &mut diag)?;
        }

        diag.added_nodes = diag
            .added_nodes
            .iter()
            .map(|id| follow_renames(id, &diag.renamed))
            .collect();
        resolved = match resolved {
            Some(id) => Some(follow_renames(&id, &diag.renamed)),
            None => location.and_then(|text| resolve_node(text, &world.map)),
        };

        if let Some(enricher) = &self.enricher {
            self.events.status(TurnStage::EnrichingPlaces);
            enrich_new_places(enricher.as_ref(), &mut world.map, &diag.added_nodes, &mut diag.warnings).await;
        }

        self.events.status(TurnStage::RepairingHierarchy);
        let engine = HierarchyEngine::new(&self.config.hierarchy).with_arbiter(self.arbiter.as_deref());
        let repairs = engine.repair(&mut world.map).await?;
        created_edges.extend(repairs.iter().flat_map(|r| r.created_edges().iter().cloned()));
        diag.hierarchy_repairs = repairs;

        let before = world.pointers.current_node_id.clone();
        match resolved {
            Some(id) => {
                diag.location_resolved = true;
                world.pointers.current_node_id = Some(id);
            }
            None => {
                if let Some(text) = location {
                    tracing::warn!(location = text, "current location unresolved, keeping previous");
                    diag.warnings
                        .push(format!("current location `{}` did not match any place", text));
                }
            }
        }
        diag.current_node_id = world.pointers.current_node_id.clone();

        self.events.status(TurnStage::PropagatingVisits);
        if let Some(current) = &diag.current_node_id {
            if before.as_ref() != Some(current) || !is_visited(&world.map, current) {
                diag.newly_visited = visit_node(&mut world.map, current);
            }
        }

        self.events.status(TurnStage::CuratingEdges);
        let outcome = curate_edges(&mut world.map, &created_edges, self.config.curation.max_search_depth);
        diag.pruned_edges = outcome.pruned;
        diag.promoted_edges = outcome.promoted;

        self.events.status(TurnStage::LayingOut);
        apply_layout(&mut world.map, &self.config.layout);

        world.turn += 1;
        Ok((world, lore, diag))
    }
}

/// Mark `id` and every ancestor visited. Returns the nodes that changed,
/// nearest first.
pub fn visit_node(map: &mut MapData, id: &NodeId) -> Vec<NodeId> {
    let chain = std::iter::once(id.clone()).chain(map.ancestors(id));
    let mut changed = Vec::new();
    for node_id in chain.collect::<Vec<_>>() {
        if let Some(node) = map.get_node_mut(&node_id) {
            if node.mark_visited() {
                changed.push(node_id);
            }
        }
    }
    changed
}

fn is_visited(map: &MapData, id: &NodeId) -> bool {
    map.get_node(id).is_some_and(|n| n.visited)
}

fn follow_renames(id: &NodeId, renames: &[RenameOutcome]) -> NodeId {
    renames
        .iter()
        .fold(id.clone(), |current, r| if current == r.old_id { r.new_id.clone() } else { current })
}

/// `None` for a missing, blank or root parent reference.
fn parent_ref(reference: Option<&str>) -> Option<&str> {
    reference
        .map(str::trim)
        .filter(|r| !r.is_empty() && !NodeId::from(*r).is_root())
}

fn apply_node_additions(
    map: &mut MapData,
    additions: &[NodeAddition],
    diag: &mut TurnDiagnostics,
) -> Result<(), TurnError> {
    // Parents are linked after every node exists so order within the
    // payload does not matter.
    let mut pending: Vec<(NodeId, &NodeAddition, bool)> = Vec::new();

    for addition in additions {
        let name = addition.place_name.trim();
        if let Some(existing) = resolve_exact(name, map) {
            if let Some(node) = map.get_node_mut(&existing) {
                merge_details(node, addition.description.as_deref(), &addition.aliases);
                if let Some(status) = addition.status {
                    set_status(node, status);
                }
                if let Some(node_type) = addition.node_type {
                    node.node_type = node_type;
                }
            }
            tracing::debug!(node = %existing, "addition matched an existing place");
            diag.updated_nodes.push(existing.clone());
            pending.push((existing, addition, false));
            continue;
        }

        let mut id = NodeId::generate(name);
        while map.contains_node(&id) {
            id = NodeId::generate(name);
        }
        let mut node = MapNode::with_id(id.clone(), name, addition.node_type.unwrap_or(NodeType::Location));
        merge_details(&mut node, addition.description.as_deref(), &addition.aliases);
        if let Some(status) = addition.status {
            node.status = status;
        }
        map.insert_node(node);
        tracing::debug!(node = %id, "added place '{}'", name);
        diag.added_nodes.push(id.clone());
        pending.push((id, addition, addition.node_type.is_none()));
    }

    for (id, addition, infer_type) in pending {
        let Some(reference) = parent_ref(addition.parent_node_id.as_deref()) else {
            continue;
        };
        // A fuzzy hit on the place itself means the parent is unknown.
        match resolve_node(reference, map).filter(|parent| parent != &id) {
            Some(parent) => {
                let parent_level = map.get_node(&parent).map(|p| p.level());
                map.set_parent(&id, Some(parent))?;
                if infer_type {
                    if let (Some(level), Some(node)) = (parent_level, map.get_node_mut(&id)) {
                        node.node_type = NodeType::for_level(level + 1);
                    }
                }
            }
            None => {
                tracing::warn!(node = %id, parent = reference, "parent not found, placing at top level");
                diag.warnings.push(format!(
                    "parent `{}` of `{}` not found; placed at top level",
                    reference, id
                ));
            }
        }
    }
    Ok(())
}

fn apply_node_update(
    world: &mut WorldState,
    lore: &mut LoreBook,
    update: &NodeUpdate,
    diag: &mut TurnDiagnostics,
) -> Result<(), TurnError> {
    let id = resolve_node(&update.place_name, &world.map)
        .ok_or_else(|| TurnError::UnknownNode(update.place_name.clone()))?;

    if let Some(node) = world.map.get_node_mut(&id) {
        merge_details(node, update.description.as_deref(), &update.aliases);
        if let Some(status) = update.status {
            set_status(node, status);
        }
        if let Some(node_type) = update.node_type {
            node.node_type = node_type;
        }
    }

    if let Some(reference) = update.parent_node_id.as_deref() {
        let parent = match parent_ref(Some(reference)) {
            None => None,
            Some(r) => Some(resolve_node(r, &world.map).ok_or_else(|| TurnError::UnknownNode(r.to_string()))?),
        };
        world.map.set_parent(&id, parent)?;
    }

    let final_id = match &update.new_place_name {
        Some(new_name) => {
            let outcome = rename_node(world, lore, &id, new_name)?;
            let new_id = outcome.new_id.clone();
            diag.renamed.push(outcome);
            new_id
        }
        None => id,
    };
    diag.updated_nodes.push(final_id);
    Ok(())
}

/// A visited place cannot fall back to hearsay.
fn set_status(node: &mut MapNode, status: NodeStatus) {
    node.status = if node.visited && status.is_unconfirmed() {
        NodeStatus::Discovered
    } else {
        status
    };
}

fn merge_details(node: &mut MapNode, description: Option<&str>, aliases: &[String]) {
    if let Some(text) = description.map(str::trim).filter(|t| !t.is_empty()) {
        node.description = text.to_string();
    }
    for alias in aliases {
        node.add_alias(alias);
    }
}

fn resolve_endpoints(map: &MapData, change: &EdgeChange) -> Result<(NodeId, NodeId), TurnError> {
    let invalid = |reason: &str| TurnError::InvalidEdge {
        source_ref: change.source_place_name.clone(),
        target_ref: change.target_place_name.clone(),
        reason: reason.to_string(),
    };
    let source = resolve_node(&change.source_place_name, map).ok_or_else(|| invalid("unknown source"))?;
    let target = resolve_node(&change.target_place_name, map).ok_or_else(|| invalid("unknown target"))?;
    if source == target {
        return Err(invalid("both ends are the same place"));
    }
    Ok((source, target))
}

fn apply_edge_change(edge: &mut MapEdge, change: &EdgeChange) {
    if let Some(status) = change.status {
        edge.status = status;
    }
    if let Some(edge_type) = change.edge_type {
        edge.edge_type = edge_type;
    }
    if let Some(text) = change.description.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        edge.description = text.to_string();
    }
}

fn add_or_update_edge(
    map: &mut MapData,
    change: &EdgeChange,
    diag: &mut TurnDiagnostics,
    created: &mut HashSet<EdgeId>,
) -> Result<(), TurnError> {
    let (source, target) = resolve_endpoints(map, change)?;

    if let Some(existing) = map.find_edge_between(&source, &target).map(|e| e.id.clone()) {
        if let Some(edge) = map.get_edge_mut(&existing) {
            apply_edge_change(edge, change);
        }
        diag.updated_edges.push(existing);
        return Ok(());
    }

    let mut edge = MapEdge::new(source, target);
    apply_edge_change(&mut edge, change);
    let id = map.add_edge(edge)?;
    created.insert(id.clone());
    diag.added_edges.push(id);
    Ok(())
}

fn update_edge(map: &mut MapData, change: &EdgeChange, diag: &mut TurnDiagnostics) -> Result<(), TurnError> {
    let (source, target) = resolve_endpoints(map, change)?;
    let id = map
        .find_edge_between(&source, &target)
        .map(|e| e.id.clone())
        .ok_or_else(|| TurnError::InvalidEdge {
            source_ref: change.source_place_name.clone(),
            target_ref: change.target_place_name.clone(),
            reason: "no edge between these places".to_string(),
        })?;
    if let Some(edge) = map.get_edge_mut(&id) {
        apply_edge_change(edge, change);
    }
    diag.updated_edges.push(id);
    Ok(())
}

async fn enrich_new_places(
    enricher: &dyn PlaceEnricher,
    map: &mut MapData,
    added: &[NodeId],
    warnings: &mut Vec<String>,
) {
    for id in added {
        let Some(node) = map.get_node(id).filter(|n| n.description.is_empty()) else {
            continue;
        };
        let parent = map.parent_of(id);
        match enricher.enrich(node, parent).await {
            Ok(details) => {
                if let Some(node) = map.get_node_mut(id) {
                    merge_details(node, Some(&details.description), &details.aliases);
                }
            }
            Err(err) => {
                tracing::warn!(node = %id, %err, "place enrichment failed");
                warnings.push(err.to_string());
            }
        }
    }
}
