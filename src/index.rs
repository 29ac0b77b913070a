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

//! Secondary indexes derived from authoritative records.
//!
//! Index entries are never edited on their own. They are recomputed from a
//! `User` or `Order` value at the moment that value is written, inside the
//! same ledger transaction, so a committed index can only ever reflect a
//! committed authoritative record. [`verify`] and [`rebuild`] recompute the
//! full projection from scratch.

use crate::account::{AccountLedger, User};
use crate::ledger::StateAccess;
use crate::order::Order;
use crate::store::OrderStore;
use crate::{LedgerError, codec, keys};
use std::collections::BTreeMap;
use tracing::info;

/// A difference between the stored indexes and the authoritative records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexIssue {
    /// Entry expected from an authoritative record is absent.
    Missing(String),
    /// Entry exists but its bytes differ from the authoritative copy.
    Stale(String),
    /// Entry has no authoritative record behind it.
    Orphan(String),
}

/// Writes every index entry derived from `order`.
///
/// Idempotent: rewriting an unchanged order rewrites identical bytes.
pub fn sync_order<S: StateAccess + ?Sized>(state: &mut S, order: &Order) -> Result<(), LedgerError> {
    for (key, bytes) in order_entries(order)? {
        state.put_state(&key, bytes)?;
    }
    Ok(())
}

fn order_entries(order: &Order) -> Result<Vec<(String, Vec<u8>)>, LedgerError> {
    let mut entries = Vec::with_capacity(1 + order.invest_records.len() + order.refund_records.len());
    entries.push((
        keys::order_by_creator(&order.creator_id, &order.id),
        codec::encode(&order.id)?,
    ));
    for record in &order.invest_records {
        entries.push((
            keys::invest_by_user(&record.investor_id, &record.id),
            codec::encode(record)?,
        ));
    }
    for record in &order.refund_records {
        entries.push((
            keys::refund_by_user(&record.recipient_id, &record.id),
            codec::encode(record)?,
        ));
    }
    Ok(entries)
}

fn user_entry(user: &User) -> Result<(String, Vec<u8>), LedgerError> {
    Ok((keys::user_name(&user.name), codec::encode(&user.id)?))
}

/// Full projection of every index, computed from authoritative records only.
fn expected<S: StateAccess + ?Sized>(
    state: &mut S,
) -> Result<BTreeMap<String, Vec<u8>>, LedgerError> {
    let mut expected = BTreeMap::new();
    for user in AccountLedger::list(state)? {
        let (key, bytes) = user_entry(&user)?;
        expected.insert(key, bytes);
    }
    for order in OrderStore::list(state)? {
        expected.extend(order_entries(&order)?);
    }
    Ok(expected)
}

fn actual<S: StateAccess + ?Sized>(state: &mut S) -> Result<BTreeMap<String, Vec<u8>>, LedgerError> {
    let mut actual = BTreeMap::new();
    for prefix in keys::INDEXES {
        actual.extend(state.state_by_prefix(prefix)?);
    }
    Ok(actual)
}

/// Lists every index entry that disagrees with the authoritative records.
///
/// An empty result means the indexes are consistent.
pub fn verify<S: StateAccess + ?Sized>(state: &mut S) -> Result<Vec<IndexIssue>, LedgerError> {
    let expected = expected(state)?;
    let actual = actual(state)?;

    let mut issues = Vec::new();
    for (key, bytes) in &expected {
        match actual.get(key) {
            None => issues.push(IndexIssue::Missing(key.clone())),
            Some(stored) if stored != bytes => issues.push(IndexIssue::Stale(key.clone())),
            Some(_) => {}
        }
    }
    issues.extend(
        actual
            .keys()
            .filter(|key| !expected.contains_key(*key))
            .map(|key| IndexIssue::Orphan(key.clone())),
    );
    Ok(issues)
}

/// Recomputes every index from authoritative records.
///
/// Returns the number of entries written or removed.
pub fn rebuild<S: StateAccess + ?Sized>(state: &mut S) -> Result<usize, LedgerError> {
    let issues = verify(state)?;
    if issues.is_empty() {
        return Ok(0);
    }
    let expected = expected(state)?;
    for issue in &issues {
        match issue {
            IndexIssue::Missing(key) | IndexIssue::Stale(key) => {
                if let Some(bytes) = expected.get(key) {
                    state.put_state(key, bytes.clone())?;
                }
            }
            IndexIssue::Orphan(key) => state.del_state(key)?,
        }
    }
    info!(repaired = issues.len(), "indexes rebuilt");
    Ok(issues.len())
}
