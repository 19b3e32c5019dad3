/// Benchmarks for chunk extraction and in-memory ingestion
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use java_rag::embedding::HashingEmbedder;
use java_rag::indexer::{JavaParser, extract_unit, extract_units};
use java_rag::vector_db::MemoryStore;
use java_rag::{Config, JavaRagClient, SourceUnit};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// One class with a field, a constructor-free body and `methods` methods
fn java_source(i: usize, methods: usize) -> String {
    let mut body = format!(
        "package bench.p{i};\n\nimport java.util.List;\n\n@Deprecated\npublic class Service{i} extends Base implements Runnable {{\n    private final List<String> items{i};\n\n"
    );
    for m in 0..methods {
        body.push_str(&format!(
            "    @Override\n    public synchronized int method{m}(int a, String b) {{\n        return a + b.length() + {m};\n    }}\n\n"
        ));
    }
    body.push_str("}\n");
    body
}

fn create_units(count: usize) -> Vec<SourceUnit> {
    (0..count)
        .map(|i| {
            SourceUnit::new(format!("bench/p{i}/Service{i}.java"), java_source(i, 8))
                .with_archive("bench-sources.jar")
        })
        .collect()
}

fn benchmark_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");

    for unit_count in [10, 50, 100].iter() {
        let units = create_units(*unit_count);
        group.bench_with_input(
            BenchmarkId::new("sequential", format!("{}_units", unit_count)),
            &units,
            |b, units| {
                let mut parser = JavaParser::new().unwrap();
                b.iter(|| {
                    for unit in units {
                        let _ = extract_unit(&mut parser, black_box(unit));
                    }
                });
            },
        );
        group.bench_with_input(
            BenchmarkId::new("parallel", format!("{}_units", unit_count)),
            &units,
            |b, units| b.iter(|| extract_units(black_box(units))),
        );
    }

    group.finish();
}

fn benchmark_ingestion(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("ingestion");

    for unit_count in [10, 50].iter() {
        let units = create_units(*unit_count);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_units", unit_count)),
            &units,
            |b, units| {
                b.iter(|| {
                    rt.block_on(async {
                        let client = JavaRagClient::with_components(
                            Config::default(),
                            Arc::new(MemoryStore::new("bench")),
                            Arc::new(HashingEmbedder::new(128)),
                        );
                        client.ingest_units(black_box(units.clone())).await.unwrap()
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_extraction, benchmark_ingestion);
criterion_main!(benches);
