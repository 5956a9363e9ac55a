use criterion::{Criterion, criterion_group, criterion_main};
use docmark_engine::transform::{Assoc, Transform};
use docmark_engine::selection::{Dir, Selection};
use docmark_engine::{markdoc_schema, parse, serialize};

fn generate_markup(sections: usize) -> String {
    let base = "# Title {% id=\"title\" %}\n\nParagraph with *some* **content** and a [link](https://example.com).\n\n- Bullet point\n  - Nested item\n- Another item\n\n```rust {% data-file=\"main.rs\" %}\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n> Quoted {% class=\"aside\" %}\n\n";
    base.repeat(sections)
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("markup");
    group.sample_size(10);

    let schema = markdoc_schema().unwrap();
    let content = generate_markup(100);
    group.bench_function("parse", |b| {
        b.iter(|| {
            let parsed = parse(&schema, std::hint::black_box(&content)).unwrap();
            std::hint::black_box(parsed);
        });
    });

    let doc = parse(&schema, &content).unwrap().doc;
    group.bench_function("serialize", |b| {
        b.iter(|| {
            let out = serialize(std::hint::black_box(&doc)).unwrap();
            std::hint::black_box(out);
        });
    });

    group.finish();
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    group.sample_size(10);

    let schema = markdoc_schema().unwrap();
    let doc = parse(&schema, &generate_markup(100)).unwrap().doc;
    // first text position, inside the title's attribute value
    let start = Selection::find_from(&doc.resolve(0).unwrap(), Dir::Forward, true)
        .unwrap()
        .from();
    group.bench_function("insert_and_map", |b| {
        b.iter(|| {
            let mut tr = Transform::new(schema.clone(), doc.clone());
            for i in 0..50 {
                tr.insert_text("x", start + i, start + i, None).unwrap();
            }
            std::hint::black_box(tr.mapping().map(doc.content_size(), Assoc::Right));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_transform);
criterion_main!(benches);
