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

//! User account integration tests.

use crowdfund_ledger::{
    AccountLedger, BootstrapConfig, Engine, ErrorKind, LedgerError, MemoryLedger, Role,
    SequentialIds, TxId, User, UserId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn make_engine() -> Engine {
    Engine::with_ids(Arc::new(SequentialIds::new("id")))
}

fn make_user(engine: &Engine, name: &str) -> User {
    serde_json::from_slice(&engine.invoke_args(&["createUser", name, "555-0100"]).unwrap()).unwrap()
}

#[test]
fn new_user_starts_with_zero_balance() {
    let engine = make_engine();
    let user = make_user(&engine, "alice");
    assert_eq!(user.name, "alice");
    assert_eq!(user.mobile, "555-0100");
    assert_eq!(user.balance(), dec!(0));
    assert_eq!(user.role, Role::Regular);
}

#[test]
fn duplicate_name_is_rejected() {
    let engine = make_engine();
    make_user(&engine, "alice");
    assert_eq!(
        engine.invoke_args(&["createUser", "alice", "555-0199"]),
        Err(LedgerError::DuplicateUserName("alice".into()))
    );
}

#[test]
fn recharge_accumulates() {
    let engine = make_engine();
    let user = make_user(&engine, "alice");
    engine.invoke_args(&["recharge", user.id.as_str(), "100.25"]).unwrap();
    let updated: User = serde_json::from_slice(
        &engine.invoke_args(&["recharge", user.id.as_str(), "0.75"]).unwrap(),
    )
    .unwrap();
    assert_eq!(updated.balance(), dec!(101.00));
}

#[test]
fn recharge_rejects_bad_amounts() {
    let engine = make_engine();
    let user = make_user(&engine, "alice");
    for amount in ["-3", "abc", ""] {
        let err = engine
            .invoke_args(&["recharge", user.id.as_str(), amount])
            .unwrap_err();
        assert!(
            matches!(err, LedgerError::InvalidAmount(_)),
            "amount {amount:?} gave {err:?}"
        );
    }
}

#[test]
fn zero_recharge_leaves_balance_unchanged() {
    let engine = make_engine();
    let user = make_user(&engine, "alice");
    engine.invoke_args(&["recharge", user.id.as_str(), "12.5"]).unwrap();
    let updated: User =
        serde_json::from_slice(&engine.invoke_args(&["recharge", user.id.as_str(), "0"]).unwrap())
            .unwrap();
    assert_eq!(updated.balance(), dec!(12.5));
}

#[test]
fn recharge_past_decimal_range_is_rejected() {
    let engine = make_engine();
    let user = make_user(&engine, "alice");
    let max = Decimal::MAX.to_string();
    engine.invoke_args(&["recharge", user.id.as_str(), max.as_str()]).unwrap();

    let err = engine
        .invoke_args(&["recharge", user.id.as_str(), max.as_str()])
        .unwrap_err();
    assert_eq!(err, LedgerError::AmountOverflow("balance"));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let stored: User = serde_json::from_slice(
        &engine.invoke_args(&["query", "user", user.id.as_str()]).unwrap(),
    )
    .unwrap();
    assert_eq!(stored.balance(), Decimal::MAX);
}

#[test]
fn recharge_unknown_user_is_not_found() {
    let engine = make_engine();
    assert_eq!(
        engine.invoke_args(&["recharge", "ghost", "10"]),
        Err(LedgerError::UserNotFound(UserId::from("ghost")))
    );
}

#[test]
fn debit_and_credit_through_state() {
    let ledger = MemoryLedger::new();
    let mut tx = ledger.begin(TxId::from("t1"));
    let id = UserId::from("u1");
    AccountLedger::create(&mut tx, id.clone(), "alice", "1", dec!(50), Role::Regular).unwrap();

    AccountLedger::debit(&mut tx, &id, dec!(20)).unwrap();
    AccountLedger::credit(&mut tx, &id, dec!(5)).unwrap();
    assert_eq!(
        AccountLedger::debit(&mut tx, &id, dec!(36)),
        Err(LedgerError::InsufficientBalance {
            user: id.clone(),
            required: dec!(36),
            available: dec!(35),
        })
    );
    tx.commit().unwrap();

    let mut read = ledger.begin(TxId::from("t2"));
    assert_eq!(AccountLedger::load(&mut read, &id).unwrap().balance(), dec!(35));
}

#[test]
fn find_by_name_resolves_through_name_index() {
    let ledger = MemoryLedger::new();
    let mut tx = ledger.begin(TxId::from("t1"));
    AccountLedger::create(&mut tx, UserId::from("u7"), "dora", "1", dec!(0), Role::Admin).unwrap();

    let found = AccountLedger::find_by_name(&mut tx, "dora").unwrap().unwrap();
    assert_eq!(found.id, UserId::from("u7"));
    assert!(found.is_admin());
    assert!(AccountLedger::find_by_name(&mut tx, "nobody").unwrap().is_none());
}

#[test]
fn default_bootstrap_seeds_one_admin() {
    let engine = make_engine();
    let seeded = engine.bootstrap(&BootstrapConfig::default()).unwrap();
    assert_eq!(seeded.len(), 4);

    let admins: Vec<_> = seeded.iter().filter(|user| user.is_admin()).collect();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].name, "admin");
    assert_eq!(admins[0].balance(), dec!(200000));

    // Running it again creates nothing new.
    assert!(engine.bootstrap(&BootstrapConfig::default()).unwrap().is_empty());
}

#[test]
fn user_json_uses_amount_for_balance() {
    let engine = make_engine();
    let user = make_user(&engine, "alice");
    let json: serde_json::Value =
        serde_json::from_slice(&engine.invoke_args(&["query", "user", user.id.as_str()]).unwrap())
            .unwrap();
    assert_eq!(json["name"], "alice");
    assert_eq!(json["amount"], "0");
    assert_eq!(json["role"], "Regular");
    assert!(json.get("balance").is_none());
}
