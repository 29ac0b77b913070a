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

//! Ledger key layout.
//!
//! Keys are composite: a namespace followed by NUL-separated components, so a
//! prefix ending in the separator selects exactly one namespace (or one
//! owner within a namespace).
//!
//! | Namespace | Components | Value |
//! |-----------|------------|-------|
//! | `user` | user id | `User` (authoritative) |
//! | `order` | order id | `Order` (authoritative) |
//! | `user-name` | display name | user id |
//! | `order-by-creator` | creator id, order id | order id |
//! | `invest-by-user` | investor id, record id | `InvestRecord` copy |
//! | `refund-by-user` | recipient id, record id | `RefundRecord` copy |

use crate::base::{OrderId, RecordId, UserId};

const SEP: char = '\0';

pub const USER: &str = "user\0";
pub const ORDER: &str = "order\0";
pub const USER_NAME: &str = "user-name\0";
pub const ORDER_BY_CREATOR: &str = "order-by-creator\0";
pub const INVEST_BY_USER: &str = "invest-by-user\0";
pub const REFUND_BY_USER: &str = "refund-by-user\0";

/// Namespaces holding derived data only.
pub const INDEXES: [&str; 4] = [USER_NAME, ORDER_BY_CREATOR, INVEST_BY_USER, REFUND_BY_USER];

pub fn user(id: &UserId) -> String {
    format!("{USER}{id}")
}

pub fn order(id: &OrderId) -> String {
    format!("{ORDER}{id}")
}

pub fn user_name(name: &str) -> String {
    format!("{USER_NAME}{name}")
}

pub fn orders_by_creator(creator: &UserId) -> String {
    format!("{ORDER_BY_CREATOR}{creator}{SEP}")
}

pub fn order_by_creator(creator: &UserId, order: &OrderId) -> String {
    format!("{}{order}", orders_by_creator(creator))
}

pub fn invests_by_user(investor: &UserId) -> String {
    format!("{INVEST_BY_USER}{investor}{SEP}")
}

pub fn invest_by_user(investor: &UserId, record: &RecordId) -> String {
    format!("{}{record}", invests_by_user(investor))
}

pub fn refunds_by_user(recipient: &UserId) -> String {
    format!("{REFUND_BY_USER}{recipient}{SEP}")
}

pub fn refund_by_user(recipient: &UserId, record: &RecordId) -> String {
    format!("{}{record}", refunds_by_user(recipient))
}

/// Whether `component` can be embedded in a key without crossing a separator.
pub fn is_valid_component(component: &str) -> bool {
    !component.is_empty() && !component.contains(SEP)
}
