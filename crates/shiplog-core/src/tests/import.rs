use crate::*;
use serde_json::json;

fn editor() -> Editor {
    Editor::new(EditorConfig::default().with_seed(11))
}

#[test]
fn export_then_import_reproduces_the_graph() {
    let mut source = editor();
    source
        .dispatch(Command::AddNode {
            position: Some(Position::new(-40.5, 12.25)),
            data: NodeDataPatch {
                label: Some("Quantum Moon".to_string()),
                image: Some("https://example.invalid/moon.png".to_string()),
                ..NodeDataPatch::default()
            },
        })
        .unwrap();
    let second = source.nodes()[1].id.clone();
    source.dispatch(Command::ToggleConnectMode).unwrap();
    source
        .dispatch(Command::ClickNode {
            id: "start".to_string(),
        })
        .unwrap();
    source.dispatch(Command::ClickNode { id: second }).unwrap();
    let edge_id = source.edges()[0].id.clone();
    source
        .dispatch(Command::PatchEdge {
            id: edge_id,
            patch: EdgeDataPatch::direction(EdgeDirection::Bidirectional),
        })
        .unwrap();
    source
        .dispatch(Command::SetViewport {
            viewport: Viewport {
                x: 12.0,
                y: -8.0,
                zoom: 1.5,
            },
        })
        .unwrap();

    let text = source.export().to_json_pretty().unwrap();
    let mut target = editor();
    let effect = target.import(&text).unwrap();
    assert_eq!(effect, Effect::Imported { nodes: 2, edges: 1 });
    assert_eq!(target.nodes(), source.nodes());
    assert_eq!(target.edges(), source.edges());
    assert_eq!(target.viewport(), source.viewport());
}

#[test]
fn malformed_import_leaves_the_graph_unchanged() {
    let mut editor = editor();
    let before = editor.export();
    let err = editor
        .dispatch(Command::Import {
            text: r#"{"foo":1}"#.to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, Error::MissingCollection { .. }));
    assert_eq!(editor.export(), before);
    assert!(!editor.can_undo());
}

#[test]
fn import_is_undoable_and_keeps_viewport_when_absent() {
    let mut editor = editor();
    let viewport = Viewport {
        x: 3.0,
        y: 4.0,
        zoom: 0.5,
    };
    editor.dispatch(Command::SetViewport { viewport }).unwrap();
    editor
        .dispatch(Command::ClickNode {
            id: "start".to_string(),
        })
        .unwrap();

    let text = json!({
        "nodes": [
            {
                "id": "a",
                "type": "universal",
                "position": { "x": 0.0, "y": 0.0 },
                "data": { "label": "A" }
            }
        ],
        "edges": []
    })
    .to_string();
    editor.import(&text).unwrap();
    assert_eq!(editor.nodes()[0].id, "a");
    assert_eq!(editor.viewport(), viewport);
    assert!(editor.selection().is_empty());

    editor.dispatch(Command::Undo).unwrap();
    assert_eq!(editor.nodes()[0].id, "start");
}

#[test]
fn imported_dangling_edges_and_self_loops_are_kept() {
    let mut editor = editor();
    let text = json!({
        "nodes": [
            {
                "id": "a",
                "type": "universal",
                "position": { "x": 0.0, "y": 0.0 },
                "data": { "label": "A" }
            }
        ],
        "edges": [
            {
                "id": "loop",
                "source": "a",
                "target": "a",
                "type": "universal-edge",
                "data": { "direction": "forward" }
            },
            { "id": "lost", "source": "a", "target": "gone" }
        ]
    })
    .to_string();
    editor.import(&text).unwrap();

    let store = editor.store();
    assert_eq!(store.self_loops().len(), 1);
    let dangling: Vec<_> = store.dangling_edges().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(dangling, ["lost"]);
    assert_eq!(
        store.edge("loop").unwrap().link_data().unwrap().direction(),
        EdgeDirection::Forward
    );
}

#[test]
fn editor_can_start_from_a_backup() {
    let text = json!({
        "nodes": [],
        "edges": [],
        "viewport": { "x": 1.0, "y": 2.0, "zoom": 3.0 },
        "version": "1.0.0"
    })
    .to_string();
    let editor = Editor::from_backup(EditorConfig::default(), &text).unwrap();
    assert!(editor.nodes().is_empty());
    assert_eq!(editor.viewport().zoom, 3.0);
    assert!(!editor.can_undo());
}
