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

//! Invocation engine.
//!
//! The [`Engine`] is the host side of the system: it opens one ledger
//! transaction per invocation, dispatches the typed call to the
//! [`Contract`], and commits or discards the result.
//!
//! # Invocation Processing
//!
//! - **Mutations** run against a fresh [`Transaction`] and are committed only
//!   if the operation succeeds. A failed operation is dropped with all of its
//!   buffered writes.
//! - **Queries** run against a transaction that is validated but never
//!   committed, so a view torn by a concurrent commit is reported as a
//!   conflict instead of being returned.
//!
//! # Thread Safety
//!
//! The engine is `Sync`. Invocations on different keys proceed in parallel;
//! invocations racing on the same order or user are serialized by the
//! ledger's commit validation, and the loser gets [`LedgerError::Conflict`].

use crate::account::User;
use crate::base::TxId;
use crate::config::BootstrapConfig;
use crate::contract::Contract;
use crate::ids::{IdGenerator, UuidGenerator};
use crate::invocation::Invocation;
use crate::ledger::{MemoryLedger, Transaction};
use crate::{LedgerError, codec, index, query};
use std::sync::Arc;
use tracing::{debug, warn};

/// Ledger host that runs invocations as atomic transactions.
pub struct Engine {
    ledger: Arc<MemoryLedger>,
    contract: Contract,
    ids: Arc<dyn IdGenerator>,
}

impl Engine {
    /// Creates an engine over an empty ledger with UUIDv7 identifiers.
    pub fn new() -> Self {
        Self::with_ids(Arc::new(UuidGenerator))
    }

    pub fn with_ids(ids: Arc<dyn IdGenerator>) -> Self {
        Self::with_ledger(Arc::new(MemoryLedger::new()), ids)
    }

    pub fn with_ledger(ledger: Arc<MemoryLedger>, ids: Arc<dyn IdGenerator>) -> Self {
        Engine {
            ledger,
            contract: Contract::new(Arc::clone(&ids)),
            ids,
        }
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Fresh host transaction id.
    pub fn next_tx_id(&self) -> TxId {
        TxId::from(format!("tx-{}", self.ids.next_id()))
    }

    pub fn begin(&self, tx_id: TxId) -> Transaction<'_> {
        self.ledger.begin(tx_id)
    }

    /// Seeds the accounts in `config` in a single transaction.
    pub fn bootstrap(&self, config: &BootstrapConfig) -> Result<Vec<User>, LedgerError> {
        let mut tx = self.begin(self.next_tx_id());
        let users = self.contract.bootstrap(&mut tx, config)?;
        tx.commit()?;
        Ok(users)
    }

    /// Runs `invocation` inside `tx` without committing.
    ///
    /// Returns the JSON payload: the affected record for mutations, the
    /// projection for queries.
    pub fn apply(
        &self,
        tx: &mut Transaction<'_>,
        invocation: &Invocation,
    ) -> Result<Vec<u8>, LedgerError> {
        let contract = &self.contract;
        match invocation {
            Invocation::CreateUser { name, mobile } => {
                codec::encode(&contract.create_user(tx, name, mobile)?)
            }
            Invocation::Recharge { user_id, amount } => {
                codec::encode(&contract.recharge(tx, user_id, *amount)?)
            }
            Invocation::CreateOrder(new) => codec::encode(&contract.create_order(tx, new.clone())?),
            Invocation::Publish { order_id } => codec::encode(&contract.publish(tx, order_id)?),
            Invocation::Invest {
                order_id,
                investor_id,
                amount,
            } => codec::encode(&contract.invest(tx, order_id, investor_id, *amount)?),
            Invocation::Loan { order_id } => codec::encode(&contract.loan(tx, order_id)?),
            Invocation::Refund { order_id } => codec::encode(&contract.refund(tx, order_id)?),
            Invocation::UploadTradeCertificate {
                order_id,
                certificate,
            } => codec::encode(&contract.upload_trade_certificate(tx, order_id, certificate)?),
            Invocation::Query { kind, param } => query::run(tx, *kind, param),
        }
    }

    /// Runs `invocation` as one transaction.
    ///
    /// # Errors
    ///
    /// Any [`LedgerError`] from the operation, or from commit
    /// ([`LedgerError::Conflict`], [`LedgerError::DuplicateTransaction`]).
    /// Nothing is applied on error.
    pub fn invoke(&self, tx_id: TxId, invocation: &Invocation) -> Result<Vec<u8>, LedgerError> {
        let mut tx = self.begin(tx_id.clone());
        let payload = self.apply(&mut tx, invocation).inspect_err(|err| {
            warn!(tx = %tx_id, verb = invocation.verb(), %err, "invocation rejected");
        })?;

        if invocation.is_query() {
            tx.validate()?;
        } else {
            let sequence = tx.commit()?;
            debug!(tx = %tx_id, verb = invocation.verb(), sequence, "invocation committed");
        }
        Ok(payload)
    }

    /// Parses a flat argument list and invokes it with a generated tx id.
    pub fn invoke_args<S: AsRef<str>>(&self, args: &[S]) -> Result<Vec<u8>, LedgerError> {
        let invocation = Invocation::parse(args)?;
        self.invoke(self.next_tx_id(), &invocation)
    }

    /// Invokes, retrying up to `attempts` times while the commit conflicts.
    pub fn invoke_with_retry(
        &self,
        invocation: &Invocation,
        attempts: usize,
    ) -> Result<Vec<u8>, LedgerError> {
        let mut last = LedgerError::Conflict(String::new());
        for _ in 0..attempts.max(1) {
            match self.invoke(self.next_tx_id(), invocation) {
                Err(err) if err.is_retryable() => last = err,
                result => return result,
            }
        }
        Err(last)
    }

    /// Checks every secondary index against the authoritative records.
    pub fn verify_indexes(&self) -> Result<Vec<index::IndexIssue>, LedgerError> {
        let mut tx = self.begin(self.next_tx_id());
        let issues = index::verify(&mut tx)?;
        tx.validate()?;
        Ok(issues)
    }

    /// Rewrites every secondary index from the authoritative records.
    pub fn rebuild_indexes(&self) -> Result<usize, LedgerError> {
        let mut tx = self.begin(self.next_tx_id());
        let repaired = index::rebuild(&mut tx)?;
        if !tx.is_read_only() {
            tx.commit()?;
        }
        Ok(repaired)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
