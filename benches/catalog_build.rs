use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use pgrel::catalog::raw::{RawColumn, RawFunction, RawRelation, RawType};
use pgrel::catalog::{ArgMode, Catalog, RawSnapshot};
use pgrel::SqlIdentifier;

const SCALARS: [(u32, &str, u32); 6] = [
    (16, "bool", 1000),
    (20, "int8", 1016),
    (23, "int4", 1007),
    (25, "text", 1009),
    (701, "float8", 1022),
    (1184, "timestamptz", 1185),
];

// `n` tables, each with a row type, an array of it, a handful of columns and
// two functions over it. Records come out shuffled.
fn gen_snapshot(n: usize, seed: u64) -> RawSnapshot {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut snap = RawSnapshot::default();
    for &(oid, name, arr) in &SCALARS {
        snap.types.push(RawType::new(oid, "pg_catalog", name).with_array(arr));
        snap.types.push(RawType::new(arr, "pg_catalog", &format!("_{name}")).with_element(oid));
    }
    let mut next_oid = 20_000u32;
    for i in 0..n {
        let (relid, row, arr) = (next_oid, next_oid + 1, next_oid + 2);
        next_oid += 3;
        let name = format!("t{i}");
        snap.types.push(RawType::new(row, "bench", &name).with_relation(relid).with_array(arr));
        snap.types.push(RawType::new(arr, "bench", &format!("_{name}")).with_element(row));

        let mut rel = RawRelation::new(relid, "bench", &name);
        let ncols = rng.gen_range(2..12u32);
        for c in 1..=ncols {
            let (scalar, _, scalar_arr) = SCALARS[rng.gen_range(0..SCALARS.len())];
            let ty = if rng.gen_bool(0.1) { scalar_arr } else { scalar };
            rel.columns.push(RawColumn::new(&format!("c{c}"), c, ty));
        }
        rel.primary_key = vec!["c1".into()];
        rel.columns.shuffle(&mut rng);
        snap.relations.push(rel);

        snap.functions.push(RawFunction::new("bench", &format!("get_{name}"), row).with_argument(Some("id"), ArgMode::In, 20));
        snap.functions.push(
            RawFunction::new("bench", &format!("list_{name}"), row)
                .with_argument(Some("ids"), ArgMode::Variadic, 1016)
                .returning_set(),
        );
    }
    snap.types.shuffle(&mut rng);
    snap.functions.shuffle(&mut rng);
    snap.relations.shuffle(&mut rng);
    snap
}

fn bench_catalog(c: &mut Criterion) {
    let ns = [1_000usize, 10_000usize];
    let mut group = c.benchmark_group("catalog");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(20);

    for &n in &ns {
        let snap = gen_snapshot(n, 0xC0FF_EE00 ^ n as u64);
        let records = (snap.types.len() + snap.functions.len() + snap.relations.len()) as u64;

        group.throughput(Throughput::Elements(records));
        group.bench_with_input(BenchmarkId::new("build", n.to_string()), &snap, |b, snap| {
            b.iter(|| {
                let catalog = Catalog::build(snap.clone()).expect("synthetic snapshot resolves");
                criterion::black_box(catalog);
            });
        });

        let catalog = Catalog::build(snap).expect("synthetic snapshot resolves");
        let mut rng = StdRng::seed_from_u64(0xFACE_FEED);
        let probes: Vec<u32> = (0..n).map(|_| 20_001 + 3 * rng.gen_range(0..n as u32)).collect();
        let names: Vec<SqlIdentifier> = (0..n).map(|_| SqlIdentifier::new("bench", format!("get_t{}", rng.gen_range(0..n)))).collect();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("relation_by_type", n.to_string()), &n, |b, _| {
            b.iter(|| {
                let mut cols = 0usize;
                for &oid in &probes {
                    if let Some(r) = catalog.get_relation_by_type(oid) { cols += r.columns.len(); }
                }
                criterion::black_box(cols);
            });
        });

        group.bench_with_input(BenchmarkId::new("functions_by_name", n.to_string()), &n, |b, _| {
            b.iter(|| {
                let mut hits = 0usize;
                for ident in &names { hits += catalog.get_functions(ident).count(); }
                criterion::black_box(hits);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_catalog);
criterion_main!(benches);
