//! End-to-end turns through the orchestrator.

use std::sync::Arc;

use async_trait::async_trait;
use map_core::{
    has_hierarchy_conflict, EdgeChange, EnrichError, Fact, FixedArbiter, HierarchyDecision,
    HierarchyRepair, LoreBook, MapEvent, MapOrchestrator, MapUpdatePayload, NodeAddition,
    NodeUpdate, PlaceDetails, PlaceEnricher, TurnError, TurnStage,
};
use map_rules::{
    EdgeStatus, Item, MapData, MapEdge, MapNode, NodeId, NodeReferences, NodeStatus, NodeType,
    WorldState,
};
use tokio::sync::mpsc;

const RIM: &str = "node_rim_0001";
const COAST: &str = "node_coast_0002";
const OUTPOST: &str = "node_outpost_0003";
const UTILITY: &str = "node_utility_entrance_0004";
const MAIN: &str = "node_main_entrance_0005";

fn id(raw: &str) -> NodeId {
    NodeId::from(raw)
}

fn rim_world() -> WorldState {
    let mut map = MapData::new();
    map.insert_node(MapNode::with_id(id(RIM), "Rim", NodeType::Region));
    map.insert_node(MapNode::with_id(id(COAST), "Coast", NodeType::Location).with_parent(id(RIM)));
    map.insert_node(MapNode::with_id(id(OUTPOST), "Outpost", NodeType::Exterior).with_parent(id(COAST)));
    map.insert_node(
        MapNode::with_id(id(UTILITY), "Utility Entrance", NodeType::Feature).with_parent(id(OUTPOST)),
    );
    map.insert_node(
        MapNode::with_id(id(MAIN), "Main Entrance", NodeType::Feature)
            .with_parent(id(OUTPOST))
            .with_alias("Yellow Door"),
    );
    map.add_edge(
        MapEdge::new(id(UTILITY), id(RIM))
            .with_id("edge_utility_rim".into())
            .with_status(EdgeStatus::Rumored),
    )
    .unwrap();
    WorldState::with_map(map)
}

fn go_to(place: &str) -> MapUpdatePayload {
    MapUpdatePayload {
        suggested_current_node_identifier: Some(place.to_string()),
        ..Default::default()
    }
}

fn assert_visited(map: &MapData, raw: &str) {
    let node = map.get_node(&id(raw)).unwrap();
    assert!(node.visited, "{} should be visited", raw);
    assert!(!node.status.is_unconfirmed(), "{} should be discovered", raw);
}

fn assert_contained(map: &MapData) {
    for node in map.nodes() {
        if let Some(parent) = map.parent_of(&node.id) {
            let reach = parent.position.distance(&node.position) + node.visual_radius;
            assert!(
                reach <= parent.visual_radius + 1e-6,
                "{} escapes {}",
                node.id,
                parent.id
            );
        }
    }
}

#[tokio::test]
async fn test_yellow_door_scenario() {
    let mut orchestrator = MapOrchestrator::new(rim_world());

    let diag = orchestrator.process_turn(&go_to("Yellow Door")).await.unwrap();
    assert!(diag.location_resolved);
    assert_eq!(diag.current_node_id, Some(id(MAIN)));
    assert_eq!(diag.newly_visited, vec![id(MAIN), id(OUTPOST), id(COAST), id(RIM)]);
    for raw in [MAIN, OUTPOST, COAST, RIM] {
        assert_visited(orchestrator.map(), raw);
    }
    // The utility entrance is still unvisited, so its rumor stands.
    let rumor = orchestrator.map().get_edge(&"edge_utility_rim".into()).unwrap();
    assert_eq!(rumor.status, EdgeStatus::Rumored);

    let diag = orchestrator.process_turn(&go_to("Utility Entrance")).await.unwrap();
    assert_eq!(diag.promoted_edges, vec!["edge_utility_rim".into()]);
    let rumor = orchestrator.map().get_edge(&"edge_utility_rim".into()).unwrap();
    assert_eq!(rumor.status, EdgeStatus::Open);
    assert_eq!(orchestrator.state().turn, 2);
    assert_contained(orchestrator.map());
}

#[tokio::test]
async fn test_redundant_rumor_is_pruned_once_both_ends_visited() {
    let mut orchestrator = MapOrchestrator::new(rim_world());
    let setup = MapUpdatePayload {
        nodes_to_add: vec![
            NodeAddition::new("Alder Farm", NodeType::Exterior).under("Coast"),
            NodeAddition::new("Birch Mill", NodeType::Exterior).under("Coast"),
            NodeAddition::new("Cedar Dock", NodeType::Exterior).under("Coast"),
        ],
        edges_to_add: vec![
            EdgeChange::new("Alder Farm", "Birch Mill"),
            EdgeChange::new("Birch Mill", "Cedar Dock"),
            EdgeChange::new("Alder Farm", "Cedar Dock").with_status(EdgeStatus::Rumored),
        ],
        ..Default::default()
    };
    let diag = orchestrator.process_turn(&setup).await.unwrap();
    assert_eq!(diag.added_edges.len(), 3);
    let rumor = diag.added_edges[2].clone();

    orchestrator.process_turn(&go_to("Alder Farm")).await.unwrap();
    assert!(orchestrator.map().get_edge(&rumor).is_some());

    let diag = orchestrator.process_turn(&go_to("Cedar Dock")).await.unwrap();
    assert_eq!(diag.pruned_edges, vec![rumor.clone()]);
    assert!(orchestrator.map().get_edge(&rumor).is_none());
    assert_eq!(orchestrator.map().edge_count(), 3);
}

#[tokio::test]
async fn test_rumor_added_this_turn_survives_until_next_turn() {
    let mut orchestrator = MapOrchestrator::new(rim_world());
    let setup = MapUpdatePayload {
        nodes_to_add: vec![
            NodeAddition::new("Alder Farm", NodeType::Exterior).under("Coast"),
            NodeAddition::new("Birch Mill", NodeType::Exterior).under("Coast"),
            NodeAddition::new("Cedar Dock", NodeType::Exterior).under("Coast"),
        ],
        edges_to_add: vec![
            EdgeChange::new("Coast", "Alder Farm"),
            EdgeChange::new("Alder Farm", "Birch Mill"),
            EdgeChange::new("Birch Mill", "Cedar Dock"),
        ],
        ..Default::default()
    };
    orchestrator.process_turn(&setup).await.unwrap();

    // Visiting the dock also visits the coast, so both ends are visited.
    let payload = MapUpdatePayload {
        edges_to_add: vec![EdgeChange::new("Cedar Dock", "Coast").with_status(EdgeStatus::Rumored)],
        ..go_to("Cedar Dock")
    };
    let diag = orchestrator.process_turn(&payload).await.unwrap();
    let rumor = diag.added_edges[0].clone();
    assert!(diag.newly_visited.contains(&id(COAST)));
    assert!(diag.pruned_edges.is_empty());
    assert_eq!(orchestrator.map().get_edge(&rumor).unwrap().status, EdgeStatus::Rumored);

    let diag = orchestrator.process_turn(&MapUpdatePayload::default()).await.unwrap();
    assert_eq!(diag.pruned_edges, vec![rumor.clone()]);
    assert!(orchestrator.map().get_edge(&rumor).is_none());
}

#[tokio::test]
async fn test_new_place_beats_fuzzy_match_on_old_one() {
    let mut world = rim_world();
    world.map.insert_node(
        MapNode::with_id(id("node_harbor_gates_0006"), "Harbor Gates", NodeType::Exterior)
            .with_parent(id(COAST)),
    );
    let mut orchestrator = MapOrchestrator::new(world);

    let payload = MapUpdatePayload {
        nodes_to_add: vec![NodeAddition::new("Harbor Gate", NodeType::Exterior).under("Coast")],
        ..go_to("Harbor Gate")
    };
    let diag = orchestrator.process_turn(&payload).await.unwrap();

    assert_eq!(diag.current_node_id.as_ref(), diag.added_nodes.first());
    assert!(!orchestrator.map().get_node(&id("node_harbor_gates_0006")).unwrap().visited);
}

#[tokio::test]
async fn test_rename_keeps_every_reference_intact() {
    let mut world = rim_world();
    world.inventory.add(Item::new("Brass Key", MAIN));
    world.pointers.destination_node_id = Some(id(MAIN));
    let mut lore = LoreBook::new();
    lore.add_fact(Fact::new("The entrance is painted yellow").about(MAIN).about(OUTPOST));

    let mut orchestrator = MapOrchestrator::new(world).with_lore(lore);
    orchestrator.process_turn(&go_to("Main Entrance")).await.unwrap();

    let payload = MapUpdatePayload {
        nodes_to_update: vec![NodeUpdate {
            new_place_name: Some("Yellow Door".into()),
            ..NodeUpdate::new("Main Entrance")
        }],
        edges_to_add: vec![EdgeChange::new("Yellow Door", "Coast")],
        ..Default::default()
    };
    let diag = orchestrator.process_turn(&payload).await.unwrap();

    let renamed = &diag.renamed[0];
    let old = id(MAIN);
    let new = renamed.new_id.clone();
    assert_eq!(new, id("node_yellow_door_0005"));

    let state = orchestrator.state();
    assert!(state.reference_holders().iter().all(|h| !h.references_node(&old)));
    assert!(!orchestrator.lore().references_node(&old));
    assert_eq!(state.pointers.current_node_id, Some(new.clone()));
    assert_eq!(state.pointers.destination_node_id, Some(new.clone()));
    assert_eq!(state.inventory.held_by(new.as_str()).len(), 1);
    assert_eq!(orchestrator.lore().facts_about(new.as_str()).len(), 1);
    assert!(state.map.edges().any(|e| e.connects(&new, &id(COAST))));

    let door = state.map.get_node(&new).unwrap();
    assert_eq!(door.place_name, "Yellow Door");
    assert!(door.aliases.iter().any(|a| a == "Main Entrance"));
}

#[tokio::test]
async fn test_malformed_payload_leaves_state_untouched() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut orchestrator = MapOrchestrator::new(rim_world()).with_events(tx);
    let before = orchestrator.state().clone();

    let err = orchestrator.process_turn_json("{\"nodesToAdd\": [{}]}").await.unwrap_err();
    assert!(matches!(err, TurnError::Json(_)));

    let bad_edge = MapUpdatePayload {
        nodes_to_add: vec![NodeAddition::new("Lost Shed", NodeType::Exterior).under("Coast")],
        edges_to_add: vec![EdgeChange::new("Lost Shed", "Atlantis")],
        ..Default::default()
    };
    let err = orchestrator.process_turn(&bad_edge).await.unwrap_err();
    assert!(matches!(err, TurnError::InvalidEdge { .. }));

    assert_eq!(orchestrator.state(), &before);
    let mut aborted = 0;
    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, MapEvent::MapDataChanged { .. }));
        if matches!(event, MapEvent::TurnAborted { .. }) {
            aborted += 1;
        }
    }
    assert_eq!(aborted, 2);
}

#[tokio::test]
async fn test_unresolved_location_keeps_pointer() {
    let mut orchestrator = MapOrchestrator::new(rim_world());
    orchestrator.process_turn(&go_to("Outpost")).await.unwrap();

    let diag = orchestrator.process_turn(&go_to("Volcano Summit")).await.unwrap();
    assert!(!diag.location_resolved);
    assert_eq!(diag.current_node_id, Some(id(OUTPOST)));
    assert_eq!(diag.warnings.len(), 1);
    assert!(diag.newly_visited.is_empty());
}

#[tokio::test]
async fn test_location_can_be_a_place_added_this_turn() {
    let mut orchestrator = MapOrchestrator::new(rim_world());
    let payload = MapUpdatePayload {
        nodes_to_add: vec![NodeAddition::new("Signal Hut", NodeType::Exterior).under("Coast")],
        current_place_hint: Some("the signal hut".into()),
        ..Default::default()
    };
    let diag = orchestrator.process_turn(&payload).await.unwrap();
    assert!(diag.location_resolved);
    assert_eq!(diag.current_node_id.as_ref(), diag.added_nodes.first());
    assert_eq!(diag.newly_visited.len(), 3);
}

#[tokio::test]
async fn test_feature_with_new_child_is_promoted() {
    let mut orchestrator = MapOrchestrator::new(rim_world());
    let payload = MapUpdatePayload {
        nodes_to_add: vec![NodeAddition::new("Boiler Room", NodeType::Room).under("Utility Entrance")],
        ..Default::default()
    };
    let diag = orchestrator.process_turn(&payload).await.unwrap();

    let map = orchestrator.map();
    assert!(!has_hierarchy_conflict(map.nodes()));
    assert!(diag
        .hierarchy_repairs
        .iter()
        .any(|r| matches!(r, HierarchyRepair::Promoted { node, .. } if node == &id(UTILITY))));
    assert!(map.nodes().any(|n| n.place_name == "Entrance to Utility Entrance"));
    assert!(map.get_node(&id(UTILITY)).unwrap().level() < NodeType::Room.level());
    assert_contained(map);
}

#[tokio::test]
async fn test_feature_with_new_child_is_converted_when_arbiter_says_so() {
    let mut orchestrator = MapOrchestrator::new(rim_world())
        .with_arbiter(Arc::new(FixedArbiter(HierarchyDecision::ConvertChild)));
    let payload = MapUpdatePayload {
        nodes_to_add: vec![NodeAddition::new("Boiler Room", NodeType::Room).under("Utility Entrance")],
        ..Default::default()
    };
    let diag = orchestrator.process_turn(&payload).await.unwrap();

    let map = orchestrator.map();
    let boiler = map.get_node(&diag.added_nodes[0]).unwrap();
    assert_eq!(boiler.parent(), Some(&id(OUTPOST)));
    assert_eq!(map.get_node(&id(UTILITY)).unwrap().node_type, NodeType::Feature);
    assert!(!has_hierarchy_conflict(map.nodes()));
}

#[tokio::test]
async fn test_events_follow_the_pipeline() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut orchestrator = MapOrchestrator::new(rim_world()).with_events(tx);
    orchestrator.process_turn(&go_to("Coast")).await.unwrap();

    let mut stages = Vec::new();
    let mut tail = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            MapEvent::Status(stage) => stages.push(stage),
            other => tail.push(other),
        }
    }
    assert_eq!(
        stages,
        vec![
            TurnStage::ResolvingLocation,
            TurnStage::ApplyingUpdates,
            TurnStage::RepairingHierarchy,
            TurnStage::PropagatingVisits,
            TurnStage::CuratingEdges,
            TurnStage::LayingOut,
        ]
    );
    assert!(matches!(tail[0], MapEvent::MapDataChanged { turn: 1, node_count: 5, edge_count: 1 }));
    assert!(matches!(&tail[1], MapEvent::Diagnostics(d) if d.current_node_id == Some(id(COAST))));
}

struct Describer;

#[async_trait]
impl PlaceEnricher for Describer {
    async fn enrich(&self, node: &MapNode, parent: Option<&MapNode>) -> Result<PlaceDetails, EnrichError> {
        if node.place_name.contains("Fog") {
            return Err(EnrichError {
                node: node.id.clone(),
                reason: "too foggy to see".into(),
            });
        }
        let parent = parent.map(|p| p.place_name.as_str()).unwrap_or("nowhere");
        Ok(PlaceDetails {
            description: format!("{} lies within {}.", node.place_name, parent),
            aliases: vec![],
        })
    }
}

#[tokio::test]
async fn test_enricher_fills_descriptions_and_failures_are_warnings() {
    let mut orchestrator = MapOrchestrator::new(rim_world()).with_enricher(Arc::new(Describer));
    let payload = MapUpdatePayload {
        nodes_to_add: vec![
            NodeAddition::new("Salt Flats", NodeType::Settlement).under("Coast"),
            NodeAddition::new("Fog Bank", NodeType::Settlement).under("Coast"),
            NodeAddition::new("Lookout", NodeType::Settlement)
                .under("Coast")
                .with_description("A rickety tower."),
        ],
        ..Default::default()
    };
    let diag = orchestrator.process_turn(&payload).await.unwrap();
    assert_eq!(diag.warnings.len(), 1);

    let map = orchestrator.map();
    let describe = |raw: &NodeId| map.get_node(raw).unwrap().description.clone();
    assert_eq!(describe(&diag.added_nodes[0]), "Salt Flats lies within Coast.");
    assert_eq!(describe(&diag.added_nodes[1]), "");
    assert_eq!(describe(&diag.added_nodes[2]), "A rickety tower.");
    assert_eq!(
        map.get_node(&diag.added_nodes[0]).unwrap().status,
        NodeStatus::Undiscovered
    );
}
