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

//! # Crowdfund Ledger
//!
//! This library records and settles crowdfunding campaigns on a transactional
//! key-value ledger: users hold balances, orders collect pledges up to a
//! target, the raised amount is loaned to the creator, and the creator later
//! repays every investor with interest.
//!
//! ## Core Components
//!
//! - [`Engine`]: Host runtime that runs each invocation as one atomic transaction
//! - [`Contract`]: The order lifecycle state machine
//! - [`MemoryLedger`] / [`StateAccess`]: Versioned key-value store and its per-transaction accessor
//! - [`Order`]: Campaign record, the single source of truth for its pledges and refunds
//! - [`LedgerError`]: Error types, classified by [`ErrorKind`]
//!
//! ## Example
//!
//! ```
//! use crowdfund_ledger::{Engine, Order, OrderStatus, SequentialIds, User};
//! use std::sync::Arc;
//!
//! let engine = Engine::with_ids(Arc::new(SequentialIds::new("id")));
//! let creator: User = serde_json::from_slice(
//!     &engine.invoke_args(&["createUser", "carol", "555-0100"]).unwrap(),
//! ).unwrap();
//! let creator_id = creator.id.to_string();
//!
//! let order: Order = serde_json::from_slice(
//!     &engine
//!         .invoke_args(&["createOrder", "Orchard", "400", "0.1", creator_id.as_str(), "2025-01-01", "2025-06-30"])
//!         .unwrap(),
//! ).unwrap();
//! assert_eq!(order.status, OrderStatus::Created);
//!
//! engine.invoke_args(&["publish", order.id.as_str()]).unwrap();
//! ```
//!
//! ## Thread Safety
//!
//! The ledger validates every transaction's reads at commit, so concurrent
//! invocations touching the same order or user never overwrite each other:
//! one commits and the others fail with a retryable conflict.

pub mod account;
mod base;
pub mod codec;
mod commit_log;
pub mod config;
pub mod contract;
mod engine;
pub mod error;
mod ids;
pub mod index;
pub mod invocation;
pub mod keys;
pub mod ledger;
pub mod order;
pub mod query;
pub mod store;

pub use account::{AccountLedger, Role, User};
pub use base::{OrderId, RecordId, TxId, UserId};
pub use commit_log::CommitLog;
pub use config::{BootstrapConfig, ConfigError, SeedAccount};
pub use contract::{Contract, NewOrder};
pub use engine::Engine;
pub use error::{ErrorKind, LedgerError};
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};
pub use index::IndexIssue;
pub use invocation::Invocation;
pub use ledger::{MemoryLedger, StateAccess, Transaction};
pub use order::{InvestRecord, Order, OrderStatus, RefundRecord};
pub use query::QueryKind;
pub use store::OrderStore;
