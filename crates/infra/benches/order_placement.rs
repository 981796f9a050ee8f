use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use groupbuy_core::{Money, ProductId, UserId};
use groupbuy_infra::store::{Role, StorefrontStore, User};
use groupbuy_infra::{InMemoryServices, PlaceOrder, ServiceSettings, build_in_memory_services};
use groupbuy_inventory::{Product, StockChange, StockRequest};

const DEEP_STOCK: i64 = 1_000_000_000;

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

/// Services with one customer and `products` well-stocked products.
fn setup(rt: &Runtime, products: usize) -> (InMemoryServices, UserId, Vec<ProductId>) {
    let (services, _trigger) = build_in_memory_services(ServiceSettings::default());
    let buyer = UserId::new();

    let ids = rt.block_on(async {
        services
            .store
            .save_user(&User {
                id: buyer,
                name: "bench buyer".into(),
                email: "bench@example.com".into(),
                role: Role::Customer,
            })
            .await
            .unwrap();

        let mut ids = Vec::with_capacity(products);
        for n in 0..products {
            let product = Product::new(
                ProductId::new(),
                format!("bench product {n}"),
                Money::from_minor(1_500).unwrap(),
                DEEP_STOCK,
                10,
            )
            .unwrap();
            services.store.save_product(&product).await.unwrap();
            ids.push(product.id_typed());
        }
        ids
    });

    (services, buyer, ids)
}

fn bench_adjust_stock(c: &mut Criterion) {
    let rt = runtime();
    let (services, _, ids) = setup(&rt, 1);
    let product = ids[0];

    let mut group = c.benchmark_group("ledger");
    group.bench_function("adjust_stock", |b| {
        b.to_async(&rt).iter(|| async {
            let applied = services
                .ledger
                .adjust_stock(
                    product,
                    -1,
                    StockChange::AdminAdjust {
                        reason: "bench".into(),
                    },
                    None,
                )
                .await
                .unwrap();
            black_box(applied);
        });
    });
    group.finish();
}

fn bench_place_order(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("place_order");

    for lines in [1usize, 5, 20] {
        let (services, buyer, ids) = setup(&rt, lines);
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &ids, |b, ids| {
            b.to_async(&rt).iter(|| async {
                let order = services
                    .orders
                    .place_order(PlaceOrder {
                        user_id: buyer,
                        customer_phone: "010-0000-0000".into(),
                        customer_note: None,
                        admin_note: None,
                        items: ids.iter().map(|id| StockRequest::new(*id, 1)).collect(),
                    })
                    .await
                    .unwrap();
                black_box(order);
            });
        });
    }
    group.finish();
}

fn bench_check_availability(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("check_availability");

    for items in [1usize, 10, 100] {
        let (services, _, ids) = setup(&rt, items);
        let requests: Vec<StockRequest> = ids.iter().map(|id| StockRequest::new(*id, 2)).collect();
        group.throughput(Throughput::Elements(items as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &requests, |b, requests| {
            b.to_async(&rt).iter(|| async {
                let report = services.checker.check_availability(requests).await.unwrap();
                black_box(report);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_adjust_stock,
    bench_place_order,
    bench_check_availability
);
criterion_main!(benches);
