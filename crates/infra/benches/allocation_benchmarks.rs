use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use chrono::{Days, Utc};
use std::sync::Arc;

use shelfpulse_core::{Aggregate, AggregateId};
use shelfpulse_infra::command_dispatcher::CommandDispatcher;
use shelfpulse_infra::event_store::InMemoryEventStore;
use shelfpulse_ledger::{
    AllocateSale, BatchId, LedgerCommand, OpenLedger, ReceiveBatch, StockLedger,
};
use shelfpulse_products::ProductId;

const LEDGER: &str = "ledger.stock";

/// Build an in-memory ledger with `batches` batches of 10 units each,
/// expiring on staggered dates.
fn ledger_with_batches(batches: u64) -> (ProductId, StockLedger) {
    let product_id = ProductId::new(AggregateId::new());
    let mut ledger = StockLedger::empty(product_id);
    let today = Utc::now().date_naive();

    let events = ledger
        .handle(&LedgerCommand::OpenLedger(OpenLedger {
            product_id,
            item_id: "BENCH".to_string(),
            occurred_at: Utc::now(),
        }))
        .unwrap();
    ledger.apply(&events[0]);

    for i in 0..batches {
        let events = ledger
            .handle(&LedgerCommand::ReceiveBatch(ReceiveBatch {
                product_id,
                batch_id: BatchId::new(),
                quantity: 10,
                cost_price: 5.0,
                manufacture_date: None,
                expiry_date: today + Days::new(1 + (i * 7) % 365),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        ledger.apply(&events[0]);
    }

    (product_id, ledger)
}

/// Pure FIFO planning: `handle` sorts the batches and builds the deduction
/// plan without mutating anything.
fn bench_fifo_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("fifo_allocation_planning");

    for batches in [10u64, 100, 1000] {
        let (product_id, ledger) = ledger_with_batches(batches);
        // Allocate half the available stock, forcing a multi-batch plan.
        let command = LedgerCommand::AllocateSale(AllocateSale {
            product_id,
            quantity: (batches as i64 * 10) / 2,
            unit_price: 9.99,
            occurred_at: Utc::now(),
        });

        group.bench_with_input(
            BenchmarkId::from_parameter(batches),
            &batches,
            |b, _| {
                b.iter(|| {
                    let events = ledger.handle(black_box(&command)).unwrap();
                    black_box(events)
                })
            },
        );
    }
    group.finish();
}

/// Full pipeline: load the stream, rehydrate, handle, append with the
/// optimistic concurrency check.
fn bench_dispatch_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("sale_dispatch_pipeline");
    group.sample_size(50);

    for batches in [10u64, 100] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batches),
            &batches,
            |b, &batches| {
                b.iter_batched(
                    || {
                        let store = Arc::new(InMemoryEventStore::new());
                        let dispatcher = CommandDispatcher::new(store);
                        let product_id = ProductId::new(AggregateId::new());
                        let today = Utc::now().date_naive();

                        dispatcher
                            .execute(
                                LEDGER,
                                product_id.0,
                                || StockLedger::empty(product_id),
                                &LedgerCommand::OpenLedger(OpenLedger {
                                    product_id,
                                    item_id: "BENCH".to_string(),
                                    occurred_at: Utc::now(),
                                }),
                            )
                            .unwrap();
                        for i in 0..batches {
                            dispatcher
                                .execute(
                                    LEDGER,
                                    product_id.0,
                                    || StockLedger::empty(product_id),
                                    &LedgerCommand::ReceiveBatch(ReceiveBatch {
                                        product_id,
                                        batch_id: BatchId::new(),
                                        quantity: 10,
                                        cost_price: 5.0,
                                        manufacture_date: None,
                                        expiry_date: today + Days::new(1 + (i * 7) % 365),
                                        occurred_at: Utc::now(),
                                    }),
                                )
                                .unwrap();
                        }
                        (dispatcher, product_id)
                    },
                    |(dispatcher, product_id)| {
                        let result = dispatcher
                            .execute(
                                LEDGER,
                                product_id.0,
                                || StockLedger::empty(product_id),
                                &LedgerCommand::AllocateSale(AllocateSale {
                                    product_id,
                                    quantity: 25,
                                    unit_price: 9.99,
                                    occurred_at: Utc::now(),
                                }),
                            )
                            .unwrap();
                        black_box(result)
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_fifo_planning, bench_dispatch_pipeline);
criterion_main!(benches);
