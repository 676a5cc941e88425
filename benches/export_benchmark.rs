//! Benchmarks for fieldpdf export performance.
//!
//! Run with: cargo bench
//!
//! These benchmarks use synthetic form pages and documents.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fieldpdf::compose::{plan_slices, CompositorSettings};
use fieldpdf::{
    build_segments, render_document, Compositor, DeclarativeDocument, DocBlock, DraftRasterizer, Node,
    Orientation, PageFormat, TableGrid,
};

/// Creates a report root with `tables` tables of `rows` rows, each preceded
/// by a caption paragraph.
fn create_report(tables: usize, rows: usize) -> Node {
    let mut root = Node::block().with_child(Node::heading("Parte diario"));
    for t in 0..tables {
        let body: Vec<Vec<String>> = (0..rows)
            .map(|r| vec![format!("{:02}:00", r % 24), format!("Actividad {}", r), "Ana".to_string()])
            .collect();
        root = root
            .with_child(Node::text(format!("Tabla {}", t + 1)))
            .with_child(Node::table_from_rows(
                ["Hora".to_string(), "Actividad".to_string(), "Responsable".to_string()],
                body,
            ));
    }
    root.with_child(Node::text("Observaciones finales"))
}

fn bench_segmentation(c: &mut Criterion) {
    let root = create_report(20, 10);
    c.bench_function("build_segments_20_tables", |b| {
        b.iter(|| build_segments(black_box(&root), "no-print"));
    });
}

fn bench_slice_planning(c: &mut Criterion) {
    let format = PageFormat::a4(Orientation::Portrait, 10.0);
    c.bench_function("plan_slices_tall_capture", |b| {
        b.iter(|| plan_slices(black_box(2400.0), 20_000, format.top(), &format));
    });
}

/// Benchmark compositing at various table lengths.
fn bench_compositing(c: &mut Criterion) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(_) => return,
    };
    let rasterizer = DraftRasterizer::new();
    let mut group = c.benchmark_group("compositing");

    for rows in [10, 100, 500].iter() {
        let root = create_report(1, *rows);
        group.bench_function(format!("{}_rows", rows), |b| {
            b.iter(|| {
                runtime.block_on(async {
                    let format = PageFormat::a4(Orientation::Portrait, 10.0);
                    let mut compositor = Compositor::new(format, &rasterizer, CompositorSettings::default());
                    for segment in build_segments(&root, "no-print") {
                        let _ = compositor.composite(segment).await;
                    }
                    compositor.finish()
                })
            });
        });
    }

    group.finish();
}

fn bench_declarative(c: &mut Criterion) {
    let body: Vec<Vec<String>> = (0..200)
        .map(|r| vec![format!("Riesgo {}", r), "Control".to_string()])
        .collect();
    let doc = DeclarativeDocument::new()
        .with_title("Permiso de trabajo")
        .push(DocBlock::Paragraph {
            text: "Trabajo en altura sobre plataforma de perforación.".repeat(10),
        })
        .push(DocBlock::Table {
            caption: Some("Riesgos".into()),
            grid: TableGrid::new(vec![vec!["Riesgo".into(), "Control".into()]], body),
        });

    c.bench_function("render_declarative_200_rows", |b| {
        b.iter(|| render_document(black_box(&doc), None, 10.0));
    });
}

criterion_group!(
    benches,
    bench_segmentation,
    bench_slice_planning,
    bench_compositing,
    bench_declarative,
);
criterion_main!(benches);
