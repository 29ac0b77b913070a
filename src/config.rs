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

//! Bootstrap configuration: the accounts seeded into an empty ledger.
//!
//! ```json
//! { "accounts": [ { "name": "admin", "mobile": "18888888888", "balance": "200000", "role": "Admin" } ] }
//! ```

use crate::account::Role;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAccount {
    pub name: String,
    pub mobile: String,
    pub balance: Decimal,
    #[serde(default = "SeedAccount::default_role")]
    pub role: Role,
}

impl SeedAccount {
    fn default_role() -> Role {
        Role::Regular
    }

    fn new(name: &str, mobile: &str, balance: Decimal, role: Role) -> Self {
        Self {
            name: name.to_owned(),
            mobile: mobile.to_owned(),
            balance,
            role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub accounts: Vec<SeedAccount>,
}

impl BootstrapConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// No seed accounts.
    pub fn empty() -> Self {
        Self {
            accounts: Vec::new(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            accounts: vec![
                SeedAccount::new("admin", "18888888888", dec!(200000), Role::Admin),
                SeedAccount::new("apple", "18673692416", dec!(100000), Role::Regular),
                SeedAccount::new("jack", "18673692435", dec!(400000), Role::Regular),
                SeedAccount::new("tom", "1333692435", dec!(500000), Role::Regular),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_seeds_one_admin_and_three_regular_users() {
        let config = BootstrapConfig::default();
        assert_eq!(config.accounts.len(), 4);
        assert_eq!(
            config
                .accounts
                .iter()
                .filter(|account| account.role == Role::Admin)
                .count(),
            1
        );
        assert_eq!(config.accounts[0].balance, dec!(200000));
    }

    #[test]
    fn role_defaults_to_regular() {
        let config = BootstrapConfig::from_json(
            r#"{"accounts":[{"name":"zoe","mobile":"1","balance":"5.5"}]}"#,
        )
        .unwrap();
        assert_eq!(config.accounts[0].role, Role::Regular);
        assert_eq!(config.accounts[0].balance, dec!(5.5));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            BootstrapConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
