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

//! Transactional key-value ledger.
//!
//! [`StateAccess`] is the seam every ledger operation is written against: a
//! get/put/scan interface over opaque byte records, scoped to one host
//! transaction. [`MemoryLedger`] is the in-process host runtime that backs
//! it with optimistic concurrency control:
//!
//! - Reads go straight to the committed state and record the version seen.
//! - Writes are buffered in the [`Transaction`] and visible to its own
//!   later reads.
//! - [`Transaction::commit`] re-validates every recorded version under the
//!   commit lock. Any change since the read aborts the whole transaction
//!   with [`LedgerError::Conflict`]; otherwise all writes land together.
//!
//! Dropping a transaction without committing discards its writes.

use crate::LedgerError;
use crate::base::TxId;
use crate::commit_log::CommitLog;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Key-value access for one ledger transaction.
pub trait StateAccess {
    /// Host transaction identifier.
    fn tx_id(&self) -> &TxId;

    /// Host-assigned transaction timestamp, identical for every read within
    /// the transaction.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Reads the value at `key`, including this transaction's own writes.
    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Buffers a write of `value` at `key`.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    /// Buffers removal of `key`.
    fn del_state(&mut self, key: &str) -> Result<(), LedgerError>;

    /// Returns every `(key, value)` whose key starts with `prefix`, in key order.
    fn state_by_prefix(&mut self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerError>;
}

#[derive(Debug, Clone)]
struct Versioned {
    /// Commit sequence number of the write that produced `value`.
    version: u64,
    value: Vec<u8>,
}

/// In-memory host ledger with optimistic, serializable commits.
#[derive(Debug)]
pub struct MemoryLedger {
    state: DashMap<String, Versioned>,
    /// Serializes validation and apply; holds the last commit sequence number.
    commit_lock: Mutex<u64>,
    log: CommitLog,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            state: DashMap::new(),
            commit_lock: Mutex::new(0),
            log: CommitLog::new(),
        }
    }

    /// Opens a transaction stamped with the current time.
    pub fn begin(&self, tx_id: TxId) -> Transaction<'_> {
        self.begin_at(tx_id, Utc::now())
    }

    /// Opens a transaction with an explicit timestamp.
    pub fn begin_at(&self, tx_id: TxId, timestamp: DateTime<Utc>) -> Transaction<'_> {
        Transaction {
            ledger: self,
            tx_id,
            timestamp,
            reads: HashMap::new(),
            scans: Vec::new(),
            writes: BTreeMap::new(),
        }
    }

    /// Committed value at `key`, outside any transaction.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.state.get(key).map(|entry| entry.value.clone())
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Sequence number of the most recent commit (0 before the first).
    pub fn last_sequence(&self) -> u64 {
        *self.commit_lock.lock()
    }

    pub fn commit_log(&self) -> &CommitLog {
        &self.log
    }

    fn version_of(&self, key: &str) -> Option<u64> {
        self.state.get(key).map(|entry| entry.version)
    }

    fn scan(&self, prefix: &str) -> BTreeMap<String, Versioned> {
        self.state
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn scan_versions(&self, prefix: &str) -> BTreeMap<String, u64> {
        self.state
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().version))
            .collect()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Versions observed by one prefix scan, used to detect phantoms at commit.
#[derive(Debug)]
struct PrefixRead {
    prefix: String,
    versions: BTreeMap<String, u64>,
}

/// One unit of atomic work against a [`MemoryLedger`].
#[derive(Debug)]
pub struct Transaction<'a> {
    ledger: &'a MemoryLedger,
    tx_id: TxId,
    timestamp: DateTime<Utc>,
    /// First committed version observed per key (`None` = absent).
    reads: HashMap<String, Option<u64>>,
    scans: Vec<PrefixRead>,
    /// Buffered writes; `None` is a pending delete.
    writes: BTreeMap<String, Option<Vec<u8>>>,
}

impl Transaction<'_> {
    /// Whether the transaction has buffered any write.
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Checks that everything read is still current, without committing.
    ///
    /// Read-only evaluations use this to reject a view torn by a concurrent
    /// commit.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let _guard = self.ledger.commit_lock.lock();
        self.validate_locked()
    }

    /// Atomically applies all buffered writes and returns the commit
    /// sequence number.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Conflict`] - a key read by this transaction changed.
    /// - [`LedgerError::DuplicateTransaction`] - the transaction ID was
    ///   already committed.
    ///
    /// Nothing is applied on error.
    pub fn commit(self) -> Result<u64, LedgerError> {
        let ledger = self.ledger;
        let mut last = ledger.commit_lock.lock();
        self.validate_locked()?;

        let sequence = *last + 1;
        ledger.log.push(self.tx_id.clone(), sequence)?;
        *last = sequence;

        let writes = self.writes.len();
        for (key, value) in self.writes {
            match value {
                Some(value) => {
                    ledger.state.insert(
                        key,
                        Versioned {
                            version: sequence,
                            value,
                        },
                    );
                }
                None => {
                    ledger.state.remove(&key);
                }
            }
        }
        debug!(tx = %self.tx_id, sequence, writes, "transaction committed");
        Ok(sequence)
    }

    fn validate_locked(&self) -> Result<(), LedgerError> {
        for (key, seen) in &self.reads {
            if self.ledger.version_of(key) != *seen {
                warn!(tx = %self.tx_id, key = %key.escape_debug(), "read conflict");
                return Err(LedgerError::Conflict(key.clone()));
            }
        }
        for scan in &self.scans {
            if self.ledger.scan_versions(&scan.prefix) != scan.versions {
                warn!(tx = %self.tx_id, prefix = %scan.prefix.escape_debug(), "range conflict");
                return Err(LedgerError::Conflict(scan.prefix.clone()));
            }
        }
        Ok(())
    }
}

impl StateAccess for Transaction<'_> {
    fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        if let Some(value) = self.writes.get(key) {
            return Ok(value.clone());
        }
        let committed = self
            .ledger
            .state
            .get(key)
            .map(|entry| (entry.version, entry.value.clone()));
        self.reads
            .entry(key.to_owned())
            .or_insert_with(|| committed.as_ref().map(|(version, _)| *version));
        Ok(committed.map(|(_, value)| value))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::MissingArgument("key"));
        }
        self.writes.insert(key.to_owned(), Some(value));
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::MissingArgument("key"));
        }
        self.writes.insert(key.to_owned(), None);
        Ok(())
    }

    fn state_by_prefix(&mut self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, LedgerError> {
        let committed = self.ledger.scan(prefix);
        self.scans.push(PrefixRead {
            prefix: prefix.to_owned(),
            versions: committed
                .iter()
                .map(|(key, entry)| (key.clone(), entry.version))
                .collect(),
        });

        let mut merged: BTreeMap<String, Vec<u8>> = committed
            .into_iter()
            .map(|(key, entry)| (key, entry.value))
            .collect();
        for (key, value) in self
            .writes
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            match value {
                Some(value) => merged.insert(key.clone(), value.clone()),
                None => merged.remove(key),
            };
        }
        Ok(merged.into_iter().collect())
    }
}
