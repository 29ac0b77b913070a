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

//! Authoritative order storage.
//!
//! Every order mutation ends in exactly one [`OrderStore::save`], which writes
//! the order at its own key and then refreshes the derived index entries from
//! that same value.

use crate::base::{OrderId, UserId};
use crate::ledger::StateAccess;
use crate::order::Order;
use crate::{LedgerError, codec, index, keys};

pub struct OrderStore;

impl OrderStore {
    pub fn find<S: StateAccess + ?Sized>(
        state: &mut S,
        id: &OrderId,
    ) -> Result<Option<Order>, LedgerError> {
        codec::load(state, &keys::order(id))
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::OrderNotFound`] if no order has this id.
    pub fn load<S: StateAccess + ?Sized>(state: &mut S, id: &OrderId) -> Result<Order, LedgerError> {
        Self::find(state, id)?.ok_or_else(|| LedgerError::OrderNotFound(id.clone()))
    }

    /// Writes `order` and its index entries. Returns the stored bytes.
    pub fn save<S: StateAccess + ?Sized>(
        state: &mut S,
        order: &Order,
    ) -> Result<Vec<u8>, LedgerError> {
        let bytes = codec::store(state, &keys::order(&order.id), order)?;
        index::sync_order(state, order)?;
        Ok(bytes)
    }

    /// All orders in key order.
    pub fn list<S: StateAccess + ?Sized>(state: &mut S) -> Result<Vec<Order>, LedgerError> {
        codec::load_prefix(state, keys::ORDER)
    }

    /// Orders created by `creator`, resolved through the creator index.
    pub fn list_by_creator<S: StateAccess + ?Sized>(
        state: &mut S,
        creator: &UserId,
    ) -> Result<Vec<Order>, LedgerError> {
        let ids: Vec<OrderId> = codec::load_prefix(state, &keys::orders_by_creator(creator))?;
        ids.iter().map(|id| Self::load(state, id)).collect()
    }
}
