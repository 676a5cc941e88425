//! Integration tests for segmentation, orientation and compositing.

use fieldpdf::compose::{CompositorSettings, PageFormat};
use fieldpdf::model::NodeKind;
use fieldpdf::{
    build_segments, has_table_segments, infer_orientation, Compositor, DraftRasterizer, Node,
    Orientation, Page, Segment,
};

fn table(columns: usize, rows: usize) -> Node {
    let header: Vec<String> = (0..columns).map(|c| format!("Col {}", c)).collect();
    let body: Vec<Vec<String>> = (0..rows)
        .map(|r| (0..columns).map(|c| format!("{}-{}", r, c)).collect())
        .collect();
    Node::table_from_rows(header, body)
}

fn texts(segment: &Segment<'_>) -> Vec<String> {
    match segment {
        Segment::Image { nodes } => nodes.iter().map(|n| n.text_content()).collect(),
        Segment::Table { .. } => vec!["<table>".to_string()],
    }
}

#[test]
fn test_order_preserved() {
    let root = Node::block()
        .with_child(Node::text("a"))
        .with_child(table(2, 1))
        .with_child(Node::text("b"))
        .with_child(Node::text("c"))
        .with_child(table(2, 1))
        .with_child(Node::text("d"));

    let flattened: Vec<String> = build_segments(&root, "no-print").iter().flat_map(texts).collect();
    assert_eq!(flattened, vec!["a", "<table>", "b", "c", "<table>", "d"]);
}

#[test]
fn test_consecutive_siblings_coalesce() {
    let root = Node::block()
        .with_child(Node::text("uno"))
        .with_child(Node::text("dos"))
        .with_child(table(2, 1));
    let segments = build_segments(&root, "no-print");
    assert_eq!(segments.len(), 2);
    assert_eq!(texts(&segments[0]), vec!["uno", "dos"]);
}

#[test]
fn test_paragraph_table_paragraph() {
    let root = Node::block()
        .with_child(Node::text("Resumen"))
        .with_child(table(3, 2))
        .with_child(Node::text("Observaciones finales"));

    let segments = build_segments(&root, "no-print");
    assert_eq!(segments.len(), 3);
    assert!(matches!(segments[0], Segment::Image { .. }));
    match &segments[1] {
        Segment::Table { caption, .. } => assert_eq!(caption.as_deref(), Some("Resumen")),
        other => panic!("expected table, got {}", other),
    }
    assert!(matches!(segments[2], Segment::Image { .. }));
    assert_eq!(infer_orientation(&root, "no-print", 10), Orientation::Portrait);
}

#[test]
fn test_orientation_scans_nested_tables() {
    let root = Node::block().with_child(Node::block().with_child(table(12, 1)));
    assert_eq!(infer_orientation(&root, "no-print", 10), Orientation::Landscape);
    assert_eq!(infer_orientation(&root, "no-print", 13), Orientation::Portrait);
}

#[test]
fn test_page_snapshot_from_json() {
    let json = r#"{
        "title": "Parte diario",
        "body": {
            "kind": "block",
            "children": [
                { "kind": "block", "id": "report", "children": [
                    { "kind": "heading", "text": "Resumen" },
                    { "kind": "table", "children": [
                        { "kind": "thead", "children": [
                            { "kind": "tr", "children": [
                                { "kind": "th", "text": "A" },
                                { "kind": "th", "text": "B" },
                                { "kind": "th", "text": "Acciones", "classes": ["no-print"] }
                            ]}
                        ]},
                        { "kind": "tbody", "children": [
                            { "kind": "tr", "children": [
                                { "kind": "td", "text": "1" },
                                { "kind": "td", "text": "2" }
                            ]}
                        ]}
                    ]}
                ]}
            ]
        }
    }"#;
    let page = Page::from_json(json).unwrap();
    let root = page.find_by_id("report").unwrap();
    let segments = build_segments(root, "no-print");
    assert!(has_table_segments(&segments));
    assert_eq!(segments.len(), 2);

    match &segments[1] {
        Segment::Table { source, caption } => {
            assert_eq!(source.kind, NodeKind::Table);
            assert_eq!(caption.as_deref(), Some("Resumen"));
            let grid = fieldpdf::model::extract_table_grid(source, "no-print");
            assert_eq!(grid.head, vec![vec!["A".to_string(), "B".to_string()]]);
        }
        other => panic!("expected table, got {}", other),
    }
}

#[tokio::test]
async fn test_long_table_spans_pages() {
    let root = Node::block()
        .with_child(Node::text("Registro horario"))
        .with_child(table(4, 150));
    let segments = build_segments(&root, "no-print");

    let rasterizer = DraftRasterizer::new();
    let format = PageFormat::a4(Orientation::Portrait, 10.0);
    let mut compositor = Compositor::new(format, &rasterizer, CompositorSettings::default());
    for segment in segments {
        compositor.composite(segment).await.unwrap();
        assert!(compositor.cursor() <= format.bottom());
    }
    assert!(compositor.page_count() > 1);

    let pdf = lopdf::Document::load_mem(&compositor.finish().unwrap()).unwrap();
    assert!(pdf.get_pages().len() > 1);
}
