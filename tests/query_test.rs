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

//! Query projections and secondary index consistency.

use crowdfund_ledger::{
    BootstrapConfig, Engine, IndexIssue, InvestRecord, LedgerError, Order, OrderId, OrderStatus,
    RecordId, RefundRecord, SequentialIds, StateAccess, User, UserId, keys,
};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

/// Engine seeded with the default accounts, keyed by name.
fn make_seeded_engine() -> (Engine, HashMap<String, UserId>) {
    let engine = Engine::with_ids(Arc::new(SequentialIds::new("id")));
    let users = engine
        .bootstrap(&BootstrapConfig::default())
        .unwrap()
        .into_iter()
        .map(|user| (user.name, user.id))
        .collect();
    (engine, users)
}

fn query<T: serde::de::DeserializeOwned>(engine: &Engine, sub: &str, param: &str) -> T {
    serde_json::from_slice(&engine.invoke_args(&["query", sub, param]).unwrap()).unwrap()
}

fn make_order(engine: &Engine, creator: &UserId, target: &str) -> OrderId {
    let order: Order = serde_json::from_slice(
        &engine
            .invoke_args(&[
                "createOrder",
                "Tea farm",
                target,
                "0.2",
                creator.as_str(),
                "2025-04-01",
                "2025-10-01",
            ])
            .unwrap(),
    )
    .unwrap();
    order.id
}

/// Runs one order through invest, loan and refund with two investors.
fn make_settled_order(engine: &Engine, users: &HashMap<String, UserId>) -> OrderId {
    let order = make_order(engine, &users["tom"], "300");
    engine.invoke_args(&["publish", order.as_str()]).unwrap();
    engine
        .invoke_args(&["invest", order.as_str(), users["apple"].as_str(), "100"])
        .unwrap();
    engine
        .invoke_args(&["invest", order.as_str(), users["jack"].as_str(), "200"])
        .unwrap();
    engine.invoke_args(&["loan", order.as_str()]).unwrap();
    engine.invoke_args(&["refund", order.as_str()]).unwrap();
    order
}

#[test]
fn user_list_returns_every_user() {
    let (engine, _) = make_seeded_engine();
    let users: Vec<User> = query(&engine, "userList", "");
    let mut names: Vec<_> = users.iter().map(|user| user.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["admin", "apple", "jack", "tom"]);
}

#[test]
fn order_list_hides_created_orders_from_regular_users() {
    let (engine, users) = make_seeded_engine();
    let draft = make_order(&engine, &users["tom"], "100");
    let live = make_order(&engine, &users["tom"], "100");
    engine.invoke_args(&["publish", live.as_str()]).unwrap();

    let for_admin: Vec<Order> = query(&engine, "orderList", users["admin"].as_str());
    assert_eq!(for_admin.len(), 2);

    let for_apple: Vec<Order> = query(&engine, "orderList", users["apple"].as_str());
    assert_eq!(for_apple.len(), 1);
    assert_eq!(for_apple[0].id, live);
    assert_eq!(for_apple[0].status, OrderStatus::Investable);
    assert!(for_apple.iter().all(|order| order.id != draft));

    let for_stranger: Vec<Order> = query(&engine, "orderList", "nobody");
    assert_eq!(for_stranger.len(), 1);
}

#[test]
fn user_order_list_is_scoped_to_creator() {
    let (engine, users) = make_seeded_engine();
    let first = make_order(&engine, &users["tom"], "10");
    let second = make_order(&engine, &users["tom"], "20");
    make_order(&engine, &users["jack"], "30");

    let toms: Vec<Order> = query(&engine, "userOrderList", users["tom"].as_str());
    let ids: Vec<_> = toms.iter().map(|order| order.id.clone()).collect();
    assert_eq!(ids, vec![first, second]);

    let nobodys: Vec<Order> = query(&engine, "userOrderList", users["apple"].as_str());
    assert!(nobodys.is_empty());
}

#[test]
fn record_indexes_hold_exact_copies() {
    let (engine, users) = make_seeded_engine();
    let order_id = make_settled_order(&engine, &users);
    let order: Order = query(&engine, "order", order_id.as_str());

    let jack_invests: Vec<InvestRecord> = query(&engine, "investRecord", users["jack"].as_str());
    assert_eq!(jack_invests.len(), 1);
    let embedded = order
        .invest_records
        .iter()
        .find(|record| record.investor_id == users["jack"])
        .unwrap();
    assert_eq!(&jack_invests[0], embedded);
    assert_eq!(jack_invests[0].amount, dec!(200));

    let apple_refunds: Vec<RefundRecord> = query(&engine, "refundRecord", users["apple"].as_str());
    assert_eq!(apple_refunds.len(), 1);
    assert_eq!(apple_refunds[0].amount, dec!(120));
    assert!(order.refund_records.contains(&apple_refunds[0]));

    // Byte-for-byte identical to the embedded copy.
    let record = &order.refund_records[0];
    let index_key = keys::refund_by_user(&record.recipient_id, &record.id);
    assert_eq!(
        engine.ledger().get(&index_key).unwrap(),
        serde_json::to_vec(record).unwrap()
    );
}

#[test]
fn record_queries_for_idle_user_are_empty() {
    let (engine, users) = make_seeded_engine();
    make_settled_order(&engine, &users);

    let invests: Vec<InvestRecord> = query(&engine, "investRecord", users["admin"].as_str());
    let refunds: Vec<RefundRecord> = query(&engine, "refundRecord", users["admin"].as_str());
    assert!(invests.is_empty());
    assert!(refunds.is_empty());
}

#[test]
fn unknown_user_or_order_is_not_found() {
    let (engine, _) = make_seeded_engine();
    assert_eq!(
        engine.invoke_args(&["query", "user", "ghost"]),
        Err(LedgerError::UserNotFound(UserId::from("ghost")))
    );
    assert_eq!(
        engine.invoke_args(&["query", "order", "ghost"]),
        Err(LedgerError::OrderNotFound(OrderId::from("ghost")))
    );
    assert_eq!(
        engine.invoke_args(&["query", "accounts", ""]),
        Err(LedgerError::UnknownQuery("accounts".into()))
    );
}

#[test]
fn queries_do_not_commit() {
    let (engine, users) = make_seeded_engine();
    let before = engine.ledger().last_sequence();
    let _: User = query(&engine, "user", users["tom"].as_str());
    let _: Vec<Order> = query(&engine, "orderList", "");
    assert_eq!(engine.ledger().last_sequence(), before);
}

#[test]
fn indexes_are_consistent_after_lifecycle() {
    let (engine, users) = make_seeded_engine();
    make_settled_order(&engine, &users);
    make_order(&engine, &users["apple"], "50");

    assert!(engine.verify_indexes().unwrap().is_empty());
    assert_eq!(engine.rebuild_indexes().unwrap(), 0);
}

#[test]
fn rebuild_repairs_corrupted_indexes() {
    let (engine, users) = make_seeded_engine();
    let order_id = make_settled_order(&engine, &users);
    let order: Order = query(&engine, "order", order_id.as_str());

    let missing = keys::order_by_creator(&users["tom"], &order_id);
    let record = &order.invest_records[0];
    let stale = keys::invest_by_user(&record.investor_id, &record.id);
    let orphan = keys::refund_by_user(&users["admin"], &RecordId::from("forged"));

    let mut tx = engine.begin(engine.next_tx_id());
    tx.del_state(&missing).unwrap();
    tx.put_state(&stale, b"{}".to_vec()).unwrap();
    tx.put_state(&orphan, b"{}".to_vec()).unwrap();
    tx.commit().unwrap();

    let issues = engine.verify_indexes().unwrap();
    assert_eq!(issues.len(), 3);
    assert!(issues.contains(&IndexIssue::Missing(missing.clone())));
    assert!(issues.contains(&IndexIssue::Stale(stale.clone())));
    assert!(issues.contains(&IndexIssue::Orphan(orphan.clone())));

    assert_eq!(engine.rebuild_indexes().unwrap(), 3);
    assert!(engine.verify_indexes().unwrap().is_empty());
    assert!(engine.ledger().get(&orphan).is_none());

    let toms: Vec<Order> = query(&engine, "userOrderList", users["tom"].as_str());
    assert_eq!(toms.len(), 1);
}
