use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mongo_bridge::codec::{
    convert_string_to_iso_date, convert_string_to_uuid, convert_uuid_to_string, generate_uuid,
};
use mongo_bridge::{Document, Value};
use mongodb::bson;

fn benchmark_uuid_codec(c: &mut Criterion) {
    c.bench_function("uuid_generate", |b| b.iter(|| generate_uuid().unwrap()));

    c.bench_function("uuid_string_to_binary", |b| {
        b.iter(|| convert_string_to_uuid(black_box("3f2504e0-4f89-11d3-9a0c-0305e82c3301")).unwrap())
    });

    let id = generate_uuid().unwrap();
    c.bench_function("uuid_binary_to_string", |b| {
        b.iter(|| convert_uuid_to_string(black_box(&id)).unwrap())
    });
}

fn benchmark_iso_date(c: &mut Criterion) {
    c.bench_function("iso_date_parse", |b| {
        b.iter(|| convert_string_to_iso_date(black_box("2024-05-11T11:11:11.250+02:00")).unwrap())
    });
}

fn benchmark_document_conversion(c: &mut Criterion) {
    let doc = Document::new()
        .with_field("correlationId", generate_uuid().unwrap())
        .with_field("title", "load test")
        .with_field("count", 42)
        .with_field(
            "tags",
            Value::Array(vec![Value::from("a"), Value::from("b"), Value::from("c")]),
        )
        .with_field("meta", Document::new().with_field("ok", true));

    c.bench_function("document_to_bson", |b| {
        b.iter(|| bson::Document::from(black_box(doc.clone())))
    });

    let raw = bson::Document::from(doc.clone());
    c.bench_function("bson_to_document", |b| {
        b.iter(|| Document::from(black_box(raw.clone())))
    });
}

criterion_group!(
    benches,
    benchmark_uuid_codec,
    benchmark_iso_date,
    benchmark_document_conversion
);
criterion_main!(benches);
