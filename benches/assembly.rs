use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use s3_exchange_stack::config::ConfigFormat;
use s3_exchange_stack::iam::{Action, Partner};
use s3_exchange_stack::{App, DeployEnv, DeploymentConfig, Partition, PolicyEngine, TagDocument};

fn create_app() -> App {
    let doc = TagDocument::parse(
        "project: B2B Marketplace\nenvironment: prod\nowner: data-platform\n",
        ConfigFormat::Yaml,
    )
    .unwrap();
    App::new(DeploymentConfig::new(&doc, DeployEnv::default(), Partition::AwsCn).unwrap())
}

/// Benchmark building the resource graph and rendering both templates
fn bench_build_and_synth(c: &mut Criterion) {
    let app = create_app();
    let mut group = c.benchmark_group("assembly");

    group.bench_function("build", |b| {
        b.iter(|| black_box(app.build().unwrap()));
    });

    let assembly = app.build().unwrap();
    group.bench_function("synth", |b| {
        b.iter(|| black_box(assembly.synth().unwrap()));
    });

    group.bench_function("access_report", |b| {
        b.iter(|| black_box(assembly.access_report()));
    });

    group.finish();
}

/// Benchmark evaluating partner policies against many object keys
fn bench_policy_eval(c: &mut Criterion) {
    let assembly = create_app().build().unwrap();
    let policy = &assembly.identity().partner(Partner::ThermoFisher).policy.document;
    let bucket = assembly.identity().buckets().to_casmart.arn(Partition::AwsCn);
    let engine = PolicyEngine::new();

    let mut group = c.benchmark_group("policy_eval");

    for count in [100, 1_000, 10_000] {
        let keys: Vec<String> = (0..count)
            .map(|i| format!("{}/batch/{}/part-{:05}.csv", bucket, i % 17, i))
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    black_box(engine.evaluate(policy, &Action::PutObject, key));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_and_synth, bench_policy_eval);
criterion_main!(benches);
