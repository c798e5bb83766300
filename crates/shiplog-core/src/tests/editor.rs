use crate::*;
use rustc_hash::FxHashSet;

fn editor() -> Editor {
    Editor::new(EditorConfig::default().with_seed(7))
}

fn add(editor: &mut Editor, x: f64, y: f64) -> String {
    match editor
        .dispatch(Command::AddNode {
            position: Some(Position::new(x, y)),
            data: NodeDataPatch::default(),
        })
        .unwrap()
    {
        Effect::NodeAdded { id } => id,
        other => panic!("unexpected effect: {other:?}"),
    }
}

fn connect(editor: &mut Editor, source: &str, target: &str) -> String {
    editor.dispatch(Command::ToggleConnectMode).unwrap();
    editor
        .dispatch(Command::ClickNode {
            id: source.to_string(),
        })
        .unwrap();
    match editor
        .dispatch(Command::ClickNode {
            id: target.to_string(),
        })
        .unwrap()
    {
        Effect::EdgeCreated { id } => id,
        other => panic!("unexpected effect: {other:?}"),
    }
}

#[test]
fn fresh_editor_holds_the_landing_site() {
    let editor = editor();
    assert_eq!(editor.nodes().len(), 1);
    let start = &editor.nodes()[0];
    assert_eq!(start.id, "start");
    assert_eq!(start.label(), Some("Landing Site"));
    assert_eq!(start.position, Position::new(250.0, 100.0));
    assert!(editor.edges().is_empty());
    assert!(!editor.can_undo());
    assert_eq!(editor.mode(), &ConnectMode::Idle);
}

#[test]
fn added_nodes_get_distinct_ids_and_default_data() {
    let mut editor = editor();
    let mut ids = FxHashSet::default();
    for _ in 0..200 {
        editor
            .dispatch(Command::AddNode {
                position: None,
                data: NodeDataPatch::default(),
            })
            .unwrap();
    }
    for node in editor.nodes() {
        assert!(ids.insert(node.id.clone()), "duplicate id {}", node.id);
    }
    assert_eq!(ids.len(), 201);

    let last = editor.nodes().last().unwrap();
    let data = last.signal_data().unwrap();
    assert_eq!(data.label, "New Signal");
    assert_eq!(data.color.as_deref(), Some("#c2410c"));
    assert_eq!(data.content.as_deref(), Some(""));
    assert_eq!(last.id.len(), 9);
}

#[test]
fn add_node_is_undoable_and_selects_the_new_node() {
    let mut editor = editor();
    let id = add(&mut editor, 10.0, 20.0);
    assert_eq!(editor.selection(), &Selection::Node(id.clone()));
    assert_eq!(editor.inspected_node().map(|n| n.id.as_str()), Some(id.as_str()));

    assert_eq!(editor.dispatch(Command::Undo).unwrap(), Effect::Restored);
    assert_eq!(editor.nodes().len(), 1);
    assert!(editor.selection().is_empty());
}

#[test]
fn spawned_nodes_follow_the_viewport() {
    let mut editor = editor();
    editor
        .dispatch(Command::SetViewport {
            viewport: Viewport {
                x: -1000.0,
                y: -400.0,
                zoom: 2.0,
            },
        })
        .unwrap();
    editor
        .dispatch(Command::AddNode {
            position: None,
            data: NodeDataPatch::label("Beacon"),
        })
        .unwrap();
    let node = editor.nodes().last().unwrap();
    assert_eq!(node.label(), Some("Beacon"));
    assert!((650.0..=700.0).contains(&node.position.x), "{:?}", node.position);
    assert!((350.0..=400.0).contains(&node.position.y), "{:?}", node.position);
}

#[test]
fn connecting_two_nodes_creates_one_undirected_edge() {
    let mut editor = editor();
    let b = add(&mut editor, 0.0, 0.0);
    let edge_id = time::with_fixed_now(
        chrono::DateTime::from_timestamp_millis(1_700_000_000_000),
        || connect(&mut editor, "start", &b),
    );

    assert_eq!(edge_id, format!("estart-{b}-1700000000000"));
    assert_eq!(editor.edges().len(), 1);
    let edge = &editor.edges()[0];
    assert_eq!(edge.source, "start");
    assert_eq!(edge.target, b);
    assert_eq!(edge.link_data().unwrap().direction, Some(EdgeDirection::None));
    assert_eq!(editor.mode(), &ConnectMode::Idle);
}

#[test]
fn same_node_twice_cancels_without_an_edge() {
    let mut editor = editor();
    editor.dispatch(Command::ToggleConnectMode).unwrap();
    for _ in 0..2 {
        editor
            .dispatch(Command::ClickNode {
                id: "start".to_string(),
            })
            .unwrap();
    }
    assert_eq!(editor.mode(), &ConnectMode::AwaitingSource);
    assert!(editor.edges().is_empty());
    assert!(!editor.can_undo());
}

#[test]
fn edge_ids_stay_unique_within_one_millisecond() {
    let mut editor = editor();
    let b = add(&mut editor, 0.0, 0.0);
    let (first, second) = time::with_fixed_now(chrono::DateTime::from_timestamp_millis(5), || {
        (
            connect(&mut editor, "start", &b),
            connect(&mut editor, "start", &b),
        )
    });
    assert_ne!(first, second);
    assert_eq!(second, format!("{first}-1"));
}

#[test]
fn connect_mode_suspends_selection_and_panels() {
    let mut editor = editor();
    editor
        .dispatch(Command::ClickNode {
            id: "start".to_string(),
        })
        .unwrap();
    assert!(editor.inspected_node().is_some());

    editor.dispatch(Command::ToggleConnectMode).unwrap();
    assert!(editor.selection().is_empty());
    assert!(editor.inspected_node().is_none());

    editor
        .dispatch(Command::ClickNode {
            id: "start".to_string(),
        })
        .unwrap();
    assert!(editor.selection().is_empty());
    assert_eq!(editor.mode().pending_source(), Some("start"));

    editor.dispatch(Command::Escape).unwrap();
    assert_eq!(editor.mode(), &ConnectMode::Idle);
}

#[test]
fn pane_click_clears_selection_and_connect_mode() {
    let mut editor = editor();
    let b = add(&mut editor, 0.0, 0.0);
    let e = connect(&mut editor, "start", &b);
    editor.dispatch(Command::ClickEdge { id: e.clone() }).unwrap();
    assert_eq!(editor.inspected_edge().map(|e| e.id.as_str()), Some(e.as_str()));

    editor.dispatch(Command::ToggleConnectMode).unwrap();
    editor.dispatch(Command::ClickPane).unwrap();
    assert!(editor.selection().is_empty());
    assert_eq!(editor.mode(), &ConnectMode::Idle);
}

#[test]
fn patch_node_changes_only_named_fields() {
    let mut editor = editor();
    let effect = editor
        .dispatch(Command::PatchNode {
            id: "start".to_string(),
            patch: NodeDataPatch::color("#000"),
        })
        .unwrap();
    assert_eq!(effect, Effect::Changed);
    let data = editor.nodes()[0].signal_data().unwrap();
    assert_eq!(data.color.as_deref(), Some("#000"));
    assert_eq!(data.label, "Landing Site");
    assert_eq!(data.content.as_deref(), Some("The ship is intact."));
    assert_eq!(data.image, None);
    assert!(!editor.can_undo());
}

#[test]
fn patches_on_unknown_ids_are_no_ops() {
    let mut editor = editor();
    let before = editor.export();
    assert_eq!(
        editor
            .dispatch(Command::PatchNode {
                id: "ghost".to_string(),
                patch: NodeDataPatch::label("x"),
            })
            .unwrap(),
        Effect::None
    );
    assert_eq!(
        editor
            .dispatch(Command::PatchEdge {
                id: "ghost".to_string(),
                patch: EdgeDataPatch::direction(EdgeDirection::Forward),
            })
            .unwrap(),
        Effect::None
    );
    assert_eq!(editor.export(), before);
}

#[test]
fn deleting_a_node_cascades_to_its_edges() {
    let mut editor = editor();
    let b = add(&mut editor, 0.0, 0.0);
    let c = add(&mut editor, 0.0, 0.0);
    connect(&mut editor, "start", &b);
    let kept = connect(&mut editor, &c, "start");
    connect(&mut editor, &b, &c);

    editor.dispatch(Command::ClickNode { id: b.clone() }).unwrap();
    let effect = editor.dispatch(Command::DeleteSelection).unwrap();
    assert_eq!(effect, Effect::Removed { nodes: 1, edges: 2 });
    assert_eq!(editor.edges().len(), 1);
    assert_eq!(editor.edges()[0].id, kept);
    assert!(editor.store().dangling_edges().is_empty());
    assert!(editor.selection().is_empty());

    editor.dispatch(Command::Undo).unwrap();
    assert_eq!(editor.nodes().len(), 3);
    assert_eq!(editor.edges().len(), 3);
}

#[test]
fn delete_is_ignored_while_connecting() {
    let mut editor = editor();
    editor
        .dispatch(Command::ClickNode {
            id: "start".to_string(),
        })
        .unwrap();
    editor.dispatch(Command::ToggleConnectMode).unwrap();
    assert_eq!(editor.dispatch(Command::DeleteSelection).unwrap(), Effect::None);
    assert_eq!(editor.nodes().len(), 1);
}

#[test]
fn drag_is_one_undo_step() {
    let mut editor = editor();
    editor
        .dispatch(Command::DragStart {
            id: "start".to_string(),
        })
        .unwrap();
    for step in 1..=5 {
        editor
            .dispatch(Command::Drag {
                id: "start".to_string(),
                position: Position::new(250.0 + step as f64 * 10.0, 100.0),
            })
            .unwrap();
    }
    editor
        .dispatch(Command::DragEnd {
            id: "start".to_string(),
            position: Position::new(400.0, 120.0),
        })
        .unwrap();
    assert_eq!(editor.nodes()[0].position, Position::new(400.0, 120.0));
    assert_eq!(editor.history().undo_depth(), 1);

    editor.dispatch(Command::Undo).unwrap();
    assert_eq!(editor.nodes()[0].position, Position::new(250.0, 100.0));
    editor.dispatch(Command::Redo).unwrap();
    assert_eq!(editor.nodes()[0].position, Position::new(400.0, 120.0));
}

#[test]
fn drag_start_on_unknown_node_takes_no_snapshot() {
    let mut editor = editor();
    assert_eq!(
        editor
            .dispatch(Command::DragStart {
                id: "ghost".to_string()
            })
            .unwrap(),
        Effect::None
    );
    assert!(!editor.can_undo());
}

#[test]
fn batched_changes_snapshot_only_for_removals() {
    let mut editor = editor();
    let b = add(&mut editor, 0.0, 0.0);
    connect(&mut editor, "start", &b);
    let depth = editor.history().undo_depth();

    editor
        .dispatch(Command::NodesChanged {
            changes: vec![
                NodeChange::Select {
                    id: "start".to_string(),
                    selected: true,
                },
                NodeChange::Position {
                    id: b.clone(),
                    position: Some(Position::new(5.0, 5.0)),
                    dragging: None,
                },
            ],
        })
        .unwrap();
    assert_eq!(editor.history().undo_depth(), depth);
    assert!(editor.nodes()[0].is_selected());

    let effect = editor
        .dispatch(Command::NodesChanged {
            changes: vec![
                NodeChange::Remove { id: b.clone() },
                NodeChange::Select {
                    id: "start".to_string(),
                    selected: false,
                },
            ],
        })
        .unwrap();
    assert_eq!(effect, Effect::Removed { nodes: 1, edges: 1 });
    assert_eq!(editor.history().undo_depth(), depth + 1);
    assert!(editor.edges().is_empty());
}

#[test]
fn edge_batch_removal_is_undoable() {
    let mut editor = editor();
    let b = add(&mut editor, 0.0, 0.0);
    let e = connect(&mut editor, "start", &b);
    editor.dispatch(Command::ClickEdge { id: e.clone() }).unwrap();

    let effect = editor
        .dispatch(Command::EdgesChanged {
            changes: vec![EdgeChange::Remove { id: e.clone() }],
        })
        .unwrap();
    assert_eq!(effect, Effect::Removed { nodes: 0, edges: 1 });
    assert!(editor.selection().is_empty());

    editor.dispatch(Command::Undo).unwrap();
    assert_eq!(editor.edges()[0].id, e);
}

#[test]
fn undo_that_removes_the_pending_source_resets_connect_mode() {
    let mut editor = editor();
    let b = add(&mut editor, 0.0, 0.0);
    editor.dispatch(Command::ToggleConnectMode).unwrap();
    editor.dispatch(Command::ClickNode { id: b.clone() }).unwrap();
    assert_eq!(editor.mode().pending_source(), Some(b.as_str()));

    editor.dispatch(Command::Undo).unwrap();
    assert_eq!(editor.mode(), &ConnectMode::AwaitingSource);
}

#[test]
fn empty_history_is_a_no_op() {
    let mut editor = editor();
    assert_eq!(editor.dispatch(Command::Undo).unwrap(), Effect::None);
    assert_eq!(editor.dispatch(Command::Redo).unwrap(), Effect::None);
    assert_eq!(editor.nodes().len(), 1);
}

#[test]
fn commands_replay_from_json_lines() {
    let script = [
        r#"{"op":"addNode","position":{"x":1.0,"y":2.0},"data":{"label":"Beacon"}}"#,
        r#"{"op":"toggleConnectMode"}"#,
        r#"{"op":"clickNode","id":"start"}"#,
        r#"{"op":"patchNode","id":"start","patch":{"content":"Updated"}}"#,
        concat!(
            r#"{"op":"nodesChanged","changes":"#,
            r#"[{"type":"position","id":"start","position":{"x":0.0,"y":0.0}}]}"#,
        ),
    ];
    let mut editor = editor();
    for line in script {
        let command: Command = serde_json::from_str(line).unwrap();
        editor.dispatch(command).unwrap();
    }
    assert_eq!(editor.nodes()[1].label(), Some("Beacon"));
    assert_eq!(editor.mode().pending_source(), Some("start"));
    let start = editor.nodes()[0].signal_data().unwrap();
    assert_eq!(start.content.as_deref(), Some("Updated"));
    assert_eq!(editor.nodes()[0].position, Position::new(0.0, 0.0));
}

#[test]
fn backup_file_name_uses_prefix_and_date() {
    let editor = editor();
    let name = time::with_fixed_now(
        chrono::DateTime::from_timestamp_millis(1_709_942_400_000),
        || editor.backup_file_name(),
    );
    assert_eq!(name, "ship-log-backup-2024-03-09.json");
}
