use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tandem_editor::{diff, diff_source, VisualComponent};
use tandem_parser::{serialize, SourceMapper};

fn grid(rows: usize, cols: usize, label: &str) -> VisualComponent {
    let rows = (0..rows)
        .map(|r| {
            let cells = (0..cols)
                .map(|c| {
                    VisualComponent::new(format!("cell-{}-{}", r, c), "td")
                        .with_prop("children", format!("{} {}:{}", label, r, c))
                })
                .collect();
            VisualComponent::new(format!("row-{}", r), "tr").with_children(cells)
        })
        .collect();

    VisualComponent::new("table", "table").with_children(rows)
}

fn diff_identical_trees(c: &mut Criterion) {
    let tree = grid(100, 10, "cell");

    c.bench_function("diff_identical_trees", |b| {
        b.iter(|| diff(black_box(&tree), black_box(&tree)))
    });
}

fn diff_changed_trees(c: &mut Criterion) {
    let baseline = grid(100, 10, "cell");
    let mut current = grid(100, 10, "edited");
    current.children.reverse();

    c.bench_function("diff_changed_trees", |b| {
        b.iter(|| diff(black_box(&baseline), black_box(&current)))
    });
}

fn diff_sources(c: &mut Criterion) {
    let mapper = SourceMapper::default();
    let baseline = serialize(&grid(50, 10, "cell")).markup;
    let current = serialize(&grid(50, 10, "edited")).markup;

    c.bench_function("diff_sources", |b| {
        b.iter(|| diff_source(&mapper, "bench.html", black_box(&baseline), black_box(&current)))
    });
}

criterion_group!(benches, diff_identical_trees, diff_changed_trees, diff_sources);
criterion_main!(benches);
