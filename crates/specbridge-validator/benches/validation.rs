//! Rule throughput over synthetic documents.
//!
//! Run with: cargo bench -p specbridge-validator

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;

use specbridge_model::{Api, MediaType, Method, Operation, Response, Schema};
use specbridge_validator::{RefResolution, Rule, SchemaType, Validator};

/// A document with `paths` resources, each returning a list of `Item`.
fn create_api(paths: usize) -> Api {
    let mut api = Api::new("Bench", "1.0.0");

    let mut item = Schema::typed("object");
    item.insert_property("id", Schema::typed("integer"), true);
    item.insert_property("name", Schema::typed("string"), true);
    item.insert_property("tags", Schema::array_of(Schema::typed("string")), false);
    item.insert_property("owner", Schema::reference("Owner"), false);
    api.add_schema("Item", item);
    api.add_schema("Owner", Schema::typed("object"));

    for i in 0..paths {
        let mut content = BTreeMap::new();
        content.insert(
            "application/json".to_string(),
            MediaType::with_schema(Schema::array_of(Schema::reference("Item"))),
        );
        let mut op = Operation {
            operation_id: Some(format!("listItems{}", i)),
            ..Operation::default()
        };
        op.responses.insert(
            "200".to_string(),
            Response {
                description: "OK".to_string(),
                content,
            },
        );
        api.path_entry(&format!("/items{}", i))
            .set_operation(Method::Get, op);
    }
    api
}

fn bench_full_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_validation");
    for paths in [10, 100, 1000] {
        let api = create_api(paths);
        let validator = Validator::default();
        group.bench_with_input(BenchmarkId::new("paths", paths), &api, |b, api| {
            b.iter(|| black_box(validator.validate(api)));
        });
    }
    group.finish();
}

fn bench_single_rules(c: &mut Criterion) {
    let api = create_api(100);
    let mut group = c.benchmark_group("single_rule");

    group.bench_function("schema_type", |b| {
        b.iter(|| black_box(SchemaType.validate(&api)));
    });

    group.bench_function("ref_resolution", |b| {
        b.iter(|| black_box(RefResolution.validate(&api)));
    });

    group.finish();
}

criterion_group!(benches, bench_full_validation, bench_single_rules);
criterion_main!(benches);
