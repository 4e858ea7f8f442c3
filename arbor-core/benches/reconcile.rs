use arbor_core::{HostSpec, Kind, Node, Reconciler, RecordingBackend};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn kinds() -> (Kind, Kind) {
    (Kind::host("Box", HostSpec::container()), Kind::host("Label", HostSpec::leaf()))
}

fn list(column: &Kind, label: &Kind, keys: impl Iterator<Item = usize>, tag: &str) -> Node {
    Node::new(column).children(keys.map(|k| {
        Node::new(label)
            .key(k.to_string())
            .prop("text", format!("{tag} {k}"))
    }))
}

fn identical_rerender(c: &mut Criterion) {
    let reconciler = Reconciler::new(RecordingBackend::new());
    let (column, label) = kinds();

    reconciler
        .render(list(&column, &label, 0..200, "row"))
        .expect("initial render");

    c.bench_function("identical_rerender_200", |b| {
        b.iter(|| {
            reconciler
                .render(black_box(list(&column, &label, 0..200, "row")))
                .expect("render");
        });
    });
}

fn keyed_reverse(c: &mut Criterion) {
    let reconciler = Reconciler::new(RecordingBackend::new());
    let (column, label) = kinds();
    let mut forward = true;

    c.bench_function("keyed_reverse_200", |b| {
        b.iter(|| {
            let node = if forward {
                list(&column, &label, 0..200, "row")
            } else {
                list(&column, &label, (0..200).rev(), "row")
            };
            forward = !forward;
            reconciler.render(black_box(node)).expect("render");
        });
    });
}

fn prop_churn(c: &mut Criterion) {
    let reconciler = Reconciler::new(RecordingBackend::new());
    let (column, label) = kinds();
    let mut tick = 0_u64;

    c.bench_function("prop_churn_200", |b| {
        b.iter(|| {
            tick += 1;
            let tag = if tick % 2 == 0 { "even" } else { "odd" };
            reconciler
                .render(black_box(list(&column, &label, 0..200, tag)))
                .expect("render");
        });
    });
}

criterion_group!(benches, identical_rerender, keyed_reverse, prop_churn);
criterion_main!(benches);
