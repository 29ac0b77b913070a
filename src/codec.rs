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

//! Record encoding at the storage boundary (JSON).

use crate::LedgerError;
use crate::ledger::StateAccess;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LedgerError> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LedgerError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Loads and decodes the record at `key`.
pub fn load<T, S>(state: &mut S, key: &str) -> Result<Option<T>, LedgerError>
where
    T: DeserializeOwned,
    S: StateAccess + ?Sized,
{
    state
        .get_state(key)?
        .map(|bytes| decode(&bytes))
        .transpose()
}

/// Encodes and writes `value` at `key`, returning the bytes written.
pub fn store<T, S>(state: &mut S, key: &str, value: &T) -> Result<Vec<u8>, LedgerError>
where
    T: Serialize,
    S: StateAccess + ?Sized,
{
    let bytes = encode(value)?;
    state.put_state(key, bytes.clone())?;
    Ok(bytes)
}

/// Decodes every record under `prefix`, in key order.
pub fn load_prefix<T, S>(state: &mut S, prefix: &str) -> Result<Vec<T>, LedgerError>
where
    T: DeserializeOwned,
    S: StateAccess + ?Sized,
{
    state
        .state_by_prefix(prefix)?
        .into_iter()
        .map(|(_, bytes)| decode(&bytes))
        .collect()
}
