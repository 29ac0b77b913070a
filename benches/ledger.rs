// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Benchmarks for the crowdfunding ledger.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded pledges into one order
//! - A full invest, loan and refund settlement
//! - Order listing as the number of orders grows
//! - Multi-threaded pledges, contended and disjoint

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use crowdfund_ledger::{Engine, Invocation, NewOrder, Order, OrderId, SequentialIds, User, UserId};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn make_engine() -> Engine {
    Engine::with_ids(Arc::new(SequentialIds::new("b")))
}

fn make_user(engine: &Engine, name: &str, balance: i64) -> UserId {
    let user: User = serde_json::from_slice(
        &engine
            .invoke(
                engine.next_tx_id(),
                &Invocation::CreateUser {
                    name: name.to_owned(),
                    mobile: "0".to_owned(),
                },
            )
            .unwrap(),
    )
    .unwrap();
    engine
        .invoke(
            engine.next_tx_id(),
            &Invocation::Recharge {
                user_id: user.id.clone(),
                amount: Decimal::new(balance, 0),
            },
        )
        .unwrap();
    user.id
}

fn make_order(engine: &Engine, creator: &UserId, target: i64) -> OrderId {
    let order: Order = serde_json::from_slice(
        &engine
            .invoke(
                engine.next_tx_id(),
                &Invocation::CreateOrder(NewOrder {
                    title: "Bench".to_owned(),
                    target: Decimal::new(target, 0),
                    rate: Decimal::new(5, 2),
                    creator_id: creator.clone(),
                    create_time: "t0".to_owned(),
                    end_time: "t1".to_owned(),
                }),
            )
            .unwrap(),
    )
    .unwrap();
    engine
        .invoke(
            engine.next_tx_id(),
            &Invocation::Publish {
                order_id: order.id.clone(),
            },
        )
        .unwrap();
    order.id
}

fn make_invest(order: &OrderId, investor: &UserId, amount: i64) -> Invocation {
    Invocation::Invest {
        order_id: order.clone(),
        investor_id: investor.clone(),
        amount: Decimal::new(amount, 0),
    }
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_single_invest(c: &mut Criterion) {
    c.bench_function("single_invest", |b| {
        b.iter(|| {
            let engine = make_engine();
            let creator = make_user(&engine, "creator", 1);
            let investor = make_user(&engine, "investor", 100);
            let order = make_order(&engine, &creator, 100);
            engine
                .invoke(engine.next_tx_id(), black_box(&make_invest(&order, &investor, 10)))
                .unwrap();
        })
    });
}

fn bench_invest_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("invest_throughput");

    // Each pledge rewrites the whole order, so cost grows with its history.
    for count in [10, 100, 500].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = make_engine();
                let creator = make_user(&engine, "creator", 1);
                let investor = make_user(&engine, "investor", count);
                let order = make_order(&engine, &creator, count);
                let invest = make_invest(&order, &investor, 1);
                for _ in 0..count {
                    engine.invoke(engine.next_tx_id(), &invest).unwrap();
                }
                black_box(&engine);
            })
        });
    }
    group.finish();
}

fn bench_settlement(c: &mut Criterion) {
    let mut group = c.benchmark_group("settlement");

    for investors in [1usize, 10, 100].iter() {
        group.throughput(Throughput::Elements(*investors as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(investors),
            investors,
            |b, &investors| {
                b.iter(|| {
                    let engine = make_engine();
                    let creator = make_user(&engine, "creator", 1000);
                    let order = make_order(&engine, &creator, investors as i64 * 10);
                    for i in 0..investors {
                        let investor = make_user(&engine, &format!("investor{i}"), 10);
                        engine
                            .invoke(engine.next_tx_id(), &make_invest(&order, &investor, 10))
                            .unwrap();
                    }
                    engine
                        .invoke(engine.next_tx_id(), &Invocation::Loan { order_id: order.clone() })
                        .unwrap();
                    engine
                        .invoke(
                            engine.next_tx_id(),
                            black_box(&Invocation::Refund { order_id: order }),
                        )
                        .unwrap();
                })
            },
        );
    }
    group.finish();
}

// =============================================================================
// Query Benchmarks
// =============================================================================

fn bench_order_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_list");

    for count in [10, 100, 1_000].iter() {
        let engine = make_engine();
        let creator = make_user(&engine, "creator", 1);
        for _ in 0..*count {
            make_order(&engine, &creator, 100);
        }
        let query = Invocation::parse(&["query", "orderList", creator.as_str()]).unwrap();

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| black_box(engine.invoke(engine.next_tx_id(), &query).unwrap()))
        });
    }
    group.finish();
}

// =============================================================================
// Concurrent Benchmarks (using rayon)
// =============================================================================

fn bench_concurrent_pledges(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_pledges");
    const PLEDGES: usize = 400;
    group.throughput(Throughput::Elements(PLEDGES as u64));

    // Every pledge targets the same order and conflicts with its neighbors.
    group.bench_function("contended", |b| {
        b.iter(|| {
            let engine = make_engine();
            let creator = make_user(&engine, "creator", 1);
            let investors: Vec<UserId> = (0..8)
                .map(|i| make_user(&engine, &format!("investor{i}"), 1000))
                .collect();
            let order = make_order(&engine, &creator, 1_000_000);

            (0..PLEDGES).into_par_iter().for_each(|i| {
                let invest = make_invest(&order, &investors[i % investors.len()], 1);
                engine.invoke_with_retry(&invest, 100_000).unwrap();
            });
            black_box(&engine);
        })
    });

    // One order per investor: no shared keys.
    group.bench_function("disjoint", |b| {
        b.iter(|| {
            let engine = make_engine();
            let creator = make_user(&engine, "creator", 1);
            let pairs: Vec<(UserId, OrderId)> = (0..8)
                .map(|i| {
                    (
                        make_user(&engine, &format!("investor{i}"), 1000),
                        make_order(&engine, &creator, 1_000_000),
                    )
                })
                .collect();

            (0..PLEDGES).into_par_iter().for_each(|i| {
                let (investor, order) = &pairs[i % pairs.len()];
                engine
                    .invoke_with_retry(&make_invest(order, investor, 1), 100_000)
                    .unwrap();
            });
            black_box(&engine);
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_invest,
    bench_invest_throughput,
    bench_settlement,
    bench_order_list,
    bench_concurrent_pledges,
);
criterion_main!(benches);
