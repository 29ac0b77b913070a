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

//! Read-only projections. Nothing here writes to the ledger.

use crate::account::{AccountLedger, User};
use crate::base::{OrderId, UserId};
use crate::ledger::StateAccess;
use crate::order::{InvestRecord, Order, RefundRecord};
use crate::store::OrderStore;
use crate::{LedgerError, codec, keys};
use std::fmt;
use std::str::FromStr;

/// Query sub-methods accepted by the `query` verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    UserList,
    User,
    OrderList,
    UserOrderList,
    Order,
    InvestRecord,
    RefundRecord,
}

impl QueryKind {
    pub const ALL: [QueryKind; 7] = [
        QueryKind::UserList,
        QueryKind::User,
        QueryKind::OrderList,
        QueryKind::UserOrderList,
        QueryKind::Order,
        QueryKind::InvestRecord,
        QueryKind::RefundRecord,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::UserList => "userList",
            QueryKind::User => "user",
            QueryKind::OrderList => "orderList",
            QueryKind::UserOrderList => "userOrderList",
            QueryKind::Order => "order",
            QueryKind::InvestRecord => "investRecord",
            QueryKind::RefundRecord => "refundRecord",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| LedgerError::UnknownQuery(s.to_owned()))
    }
}

pub fn users<S: StateAccess + ?Sized>(state: &mut S) -> Result<Vec<User>, LedgerError> {
    AccountLedger::list(state)
}

pub fn user<S: StateAccess + ?Sized>(state: &mut S, id: &UserId) -> Result<User, LedgerError> {
    AccountLedger::load(state, id)
}

/// All orders `caller` may see: `Created` orders are shown to admins only.
///
/// An unknown caller is treated as a regular user.
pub fn orders_visible_to<S: StateAccess + ?Sized>(
    state: &mut S,
    caller: &UserId,
) -> Result<Vec<Order>, LedgerError> {
    let role = AccountLedger::find(state, caller)?.map(|user| user.role);
    Ok(OrderStore::list(state)?
        .into_iter()
        .filter(|order| order.status.is_visible_to(role))
        .collect())
}

pub fn orders_by_creator<S: StateAccess + ?Sized>(
    state: &mut S,
    creator: &UserId,
) -> Result<Vec<Order>, LedgerError> {
    OrderStore::list_by_creator(state, creator)
}

pub fn order<S: StateAccess + ?Sized>(state: &mut S, id: &OrderId) -> Result<Order, LedgerError> {
    OrderStore::load(state, id)
}

pub fn invest_records<S: StateAccess + ?Sized>(
    state: &mut S,
    investor: &UserId,
) -> Result<Vec<InvestRecord>, LedgerError> {
    codec::load_prefix(state, &keys::invests_by_user(investor))
}

pub fn refund_records<S: StateAccess + ?Sized>(
    state: &mut S,
    recipient: &UserId,
) -> Result<Vec<RefundRecord>, LedgerError> {
    codec::load_prefix(state, &keys::refunds_by_user(recipient))
}

/// Runs a query and returns its JSON payload.
pub fn run<S: StateAccess + ?Sized>(
    state: &mut S,
    kind: QueryKind,
    param: &str,
) -> Result<Vec<u8>, LedgerError> {
    match kind {
        QueryKind::UserList => codec::encode(&users(state)?),
        QueryKind::User => codec::encode(&user(state, &UserId::from(param))?),
        QueryKind::OrderList => codec::encode(&orders_visible_to(state, &UserId::from(param))?),
        QueryKind::UserOrderList => codec::encode(&orders_by_creator(state, &UserId::from(param))?),
        QueryKind::Order => codec::encode(&order(state, &OrderId::from(param))?),
        QueryKind::InvestRecord => codec::encode(&invest_records(state, &UserId::from(param))?),
        QueryKind::RefundRecord => codec::encode(&refund_records(state, &UserId::from(param))?),
    }
}
