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

//! Thread-safe log of committed transactions with deduplication.
//!
//! Records every committed transaction ID together with its commit sequence
//! number, rejecting an ID that was already committed.

use crate::LedgerError;
use crate::base::TxId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// A thread-safe commit log with duplicate detection.
///
/// Backed by a [`DashMap`] for O(1) duplicate checking; the stored sequence
/// number gives the commit order.
#[derive(Debug)]
pub struct CommitLog {
    /// Committed transaction IDs mapped to their commit sequence number.
    committed: DashMap<TxId, u64>,
}

impl CommitLog {
    /// Creates a new empty commit log.
    pub fn new() -> Self {
        Self {
            committed: DashMap::new(),
        }
    }

    /// Records a committed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateTransaction`] if the ID was already
    /// committed.
    pub fn push(&self, tx_id: TxId, sequence: u64) -> Result<(), LedgerError> {
        // Entry API gives an atomic check-and-insert
        match self.committed.entry(tx_id) {
            Entry::Occupied(entry) => Err(LedgerError::DuplicateTransaction(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(sequence);
                Ok(())
            }
        }
    }

    pub fn contains(&self, tx_id: &TxId) -> bool {
        self.committed.contains_key(tx_id)
    }

    /// Commit sequence number assigned to `tx_id`, if committed.
    pub fn sequence_of(&self, tx_id: &TxId) -> Option<u64> {
        self.committed.get(tx_id).map(|entry| *entry.value())
    }

    /// Number of transactions ever committed.
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}

impl Default for CommitLog {
    fn default() -> Self {
        Self::new()
    }
}
