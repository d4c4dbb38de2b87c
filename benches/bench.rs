//! Criterion benchmarks for the indexing engine.
//!
//! Covers the two hot paths:
//! - Mapping compilation (startup cost per configuration change)
//! - Index entry derivation, with and without link traversal

use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use tern::mapping::compile;
use tern::record::{FieldValue, Link, MemoryRecordStore, RecordId, RecordReader, VTag};
use tern::walker::build_index_entry;

const CONFIG: &str = r#"{
    "field_types": [
        { "name": "string", "class": "tern.StringIndexFieldType" }
    ],
    "global_fields": [
        { "name": "manager", "type": "string" }
    ],
    "versioned_mappings": [{
        "record_type": "Book",
        "version_tags": "live",
        "fields": [
            { "name": "title", "type": "string", "value": { "field": "title" } },
            { "name": "author_name", "type": "string", "multi_value": true,
              "value": { "deref": { "follow": ["author"], "field": "name" } } }
        ]
    }],
    "non_versioned_mappings": [{
        "record_type": "Book",
        "fields": [
            { "ref": "manager", "value": { "field": "manager" } }
        ]
    }]
}"#;

/// Build a store with one book linking to `author_count` authors.
fn populate_store(author_count: usize) -> (MemoryRecordStore, RecordId) {
    let store = MemoryRecordStore::new();
    let mut links = Vec::with_capacity(author_count);
    for i in 0..author_count {
        let author = RecordId::new(format!("author{i}"));
        store.create(author.clone(), "Author").unwrap();
        store
            .set_field(&author, "name", FieldValue::Text(format!("Author {i}")))
            .unwrap();
        links.push(FieldValue::Link(Link::to(author)));
    }

    let book = RecordId::new("book1");
    store.create(book.clone(), "Book").unwrap();
    store
        .set_field(&book, "manager", FieldValue::Text("Alice".to_string()))
        .unwrap();
    let version = store
        .add_version(
            &book,
            [
                (
                    "title".to_string(),
                    FieldValue::Text("Moby Dick".to_string()),
                ),
                ("author".to_string(), FieldValue::List(links)),
            ]
            .into(),
        )
        .unwrap();
    store.set_vtag(&book, "live", version).unwrap();
    (store, book)
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_mapping", |b| {
        b.iter(|| compile(black_box(CONFIG)).unwrap())
    });
}

fn bench_build_index_entry(c: &mut Criterion) {
    let model = compile(CONFIG).unwrap();
    let live = VTag::new("live");

    let mut group = c.benchmark_group("build_index_entry");
    for author_count in [1usize, 10, 100] {
        let (store, book) = populate_store(author_count);
        let record = store.read(&book, &live).unwrap();
        group.throughput(Throughput::Elements(author_count as u64));
        group.bench_function(format!("fan_out_{author_count}"), |b| {
            b.iter(|| {
                build_index_entry(black_box(&record), &live, &model, &store).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_build_index_entry);
criterion_main!(benches);
