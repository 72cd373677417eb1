use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use pvz_directory::{City, OverviewRow, Pvz, group_rows};
use pvz_receptions::{Product, ProductType, Reception};

/// A listing page: `pvzs` PVZs, each with 3 receptions of `products` products.
fn page_rows(pvzs: usize, products: usize) -> Vec<OverviewRow> {
    let now = Utc::now();
    let mut rows = Vec::with_capacity(pvzs * 3 * products);
    for _ in 0..pvzs {
        let pvz = Pvz::register(City::Moscow, now);
        for _ in 0..3 {
            let reception = Reception::open(pvz.id, now);
            for _ in 0..products {
                let product = Product::new(reception.id, ProductType::Shoes, now);
                rows.push(OverviewRow {
                    pvz: pvz.clone(),
                    reception: Some(reception.clone()),
                    product: Some(product),
                });
            }
        }
    }
    rows
}

fn bench_group_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_rows");
    for products in [1usize, 10, 100] {
        let rows = page_rows(30, products);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(products), &rows, |b, rows| {
            b.iter(|| group_rows(black_box(rows.clone())))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_group_rows);
criterion_main!(benches);
