//! End-to-end conversion throughput over synthetic documents.
//!
//! Run with: cargo bench -p specbridge-converter

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;

use specbridge_converter::{Context, ConvertOptions, Converter, Format};

/// An OpenAPI 3.0 document with `paths` CRUD resources sharing one schema.
fn create_openapi(paths: usize) -> Vec<u8> {
    let mut doc = String::from(
        "openapi: 3.0.3\ninfo:\n  title: Bench\n  version: 1.0.0\npaths:\n",
    );
    for i in 0..paths {
        doc.push_str(&format!(
            "  /items{i}/{{id}}:\n    parameters:\n      - name: id\n        in: path\n        required: true\n        schema:\n          type: string\n    get:\n      operationId: getItem{i}\n      responses:\n        \"200\":\n          description: OK\n          content:\n            application/json:\n              schema:\n                $ref: \"#/components/schemas/Item\"\n    put:\n      operationId: putItem{i}\n      requestBody:\n        content:\n          application/json:\n            schema:\n              $ref: \"#/components/schemas/Item\"\n      responses:\n        \"204\":\n          description: Updated\n",
            i = i
        ));
    }
    doc.push_str(
        "components:\n  schemas:\n    Item:\n      type: object\n      required: [id]\n      properties:\n        id:\n          type: string\n        count:\n          type: integer\n",
    );
    doc.into_bytes()
}

fn bench_convert(c: &mut Criterion) {
    let converter = Converter::default();
    let ctx = Context::new();
    let options = ConvertOptions::new().with_validate(true);

    for to in [Format::OpenApi, Format::AsyncApi, Format::Blueprint] {
        let mut group = c.benchmark_group(format!("openapi_to_{}", to));
        for paths in [10, 100, 1000] {
            let input = create_openapi(paths);
            group.throughput(Throughput::Bytes(input.len() as u64));
            group.bench_with_input(BenchmarkId::new("paths", paths), &input, |b, input| {
                b.iter(|| {
                    let mut out = Vec::with_capacity(input.len());
                    let report = converter
                        .convert(
                            &ctx,
                            &mut Cursor::new(input),
                            &mut out,
                            Some(Format::OpenApi),
                            to,
                            &options,
                        )
                        .unwrap();
                    black_box((report, out))
                });
            });
        }
        group.finish();
    }
}

fn bench_detect(c: &mut Criterion) {
    let input = create_openapi(100);
    c.bench_function("detect_format", |b| {
        b.iter(|| black_box(specbridge_converter::detect_format(&input)))
    });
}

criterion_group!(benches, bench_convert, bench_detect);
criterion_main!(benches);
