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

//! User accounts and balances.
//!
//! A [`User`] is stored at its own key; the display name is unique and is
//! indexed separately so a duplicate can be rejected with a single read.
//!
//! # Example
//!
//! ```
//! use crowdfund_ledger::{MemoryLedger, TxId, UserId, account::{AccountLedger, Role}};
//! use rust_decimal_macros::dec;
//!
//! let ledger = MemoryLedger::new();
//! let mut tx = ledger.begin(TxId::from("tx-1"));
//! let user = AccountLedger::create(&mut tx, UserId::from("u1"), "alice", "555-0100", dec!(10), Role::Regular).unwrap();
//! AccountLedger::credit(&mut tx, &user.id, dec!(5)).unwrap();
//! assert_eq!(AccountLedger::load(&mut tx, &user.id).unwrap().balance(), dec!(15));
//! ```

use crate::base::UserId;
use crate::ledger::StateAccess;
use crate::{LedgerError, codec, keys};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Regular,
}

/// Ledger user with a non-negative balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub mobile: String,
    #[serde(rename = "amount")]
    balance: Decimal,
    pub role: Role,
}

impl User {
    pub fn new(id: UserId, name: &str, mobile: &str, balance: Decimal, role: Role) -> Self {
        Self {
            id,
            name: name.to_owned(),
            mobile: mobile.to_owned(),
            balance,
            role,
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= Decimal::ZERO,
            "Invariant violated: balance of {} went negative: {}",
            self.id,
            self.balance
        );
    }

    /// Increases the balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AmountOverflow`] if the new balance is not
    /// representable; the balance is left unchanged.
    pub fn credit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow("balance"))?;
        self.assert_invariants();
        Ok(())
    }

    /// Decreases the balance.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if self.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                user: self.id.clone(),
                required: amount,
                available: self.balance,
            });
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::AmountOverflow("balance"))?;
        self.assert_invariants();
        Ok(())
    }
}

/// Account operations over ledger state.
pub struct AccountLedger;

impl AccountLedger {
    /// Stores a new user and claims its display name.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateUserName`] - name already taken.
    /// - [`LedgerError::MissingArgument`] - empty name or id.
    /// - [`LedgerError::InvalidAmount`] - negative opening balance.
    pub fn create<S: StateAccess + ?Sized>(
        state: &mut S,
        id: UserId,
        name: &str,
        mobile: &str,
        balance: Decimal,
        role: Role,
    ) -> Result<User, LedgerError> {
        if !keys::is_valid_component(name) {
            return Err(LedgerError::MissingArgument("name"));
        }
        if !keys::is_valid_component(id.as_str()) {
            return Err(LedgerError::MissingArgument("user id"));
        }
        if balance < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(balance.to_string()));
        }
        if Self::find_by_name(state, name)?.is_some() {
            return Err(LedgerError::DuplicateUserName(name.to_owned()));
        }

        let user = User::new(id, name, mobile, balance, role);
        Self::save(state, &user)?;
        codec::store(state, &keys::user_name(name), &user.id)?;
        Ok(user)
    }

    pub fn find<S: StateAccess + ?Sized>(
        state: &mut S,
        id: &UserId,
    ) -> Result<Option<User>, LedgerError> {
        codec::load(state, &keys::user(id))
    }

    pub fn find_by_name<S: StateAccess + ?Sized>(
        state: &mut S,
        name: &str,
    ) -> Result<Option<User>, LedgerError> {
        match codec::load::<UserId, _>(state, &keys::user_name(name))? {
            Some(id) => Self::find(state, &id),
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::UserNotFound`] if no user has this id.
    pub fn load<S: StateAccess + ?Sized>(state: &mut S, id: &UserId) -> Result<User, LedgerError> {
        Self::find(state, id)?.ok_or_else(|| LedgerError::UserNotFound(id.clone()))
    }

    pub fn save<S: StateAccess + ?Sized>(state: &mut S, user: &User) -> Result<(), LedgerError> {
        codec::store(state, &keys::user(&user.id), user)?;
        Ok(())
    }

    /// All users in key order.
    pub fn list<S: StateAccess + ?Sized>(state: &mut S) -> Result<Vec<User>, LedgerError> {
        codec::load_prefix(state, keys::USER)
    }

    /// Credits a user from outside the ledger (top-up).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - amount is negative.
    /// - [`LedgerError::AmountOverflow`] - balance would leave the decimal range.
    /// - [`LedgerError::UserNotFound`] - unknown user.
    pub fn recharge<S: StateAccess + ?Sized>(
        state: &mut S,
        id: &UserId,
        amount: Decimal,
    ) -> Result<User, LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount.to_string()));
        }
        Self::credit(state, id, amount)
    }

    pub fn credit<S: StateAccess + ?Sized>(
        state: &mut S,
        id: &UserId,
        amount: Decimal,
    ) -> Result<User, LedgerError> {
        let mut user = Self::load(state, id)?;
        user.credit(amount)?;
        Self::save(state, &user)?;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] if the balance would go
    /// negative; nothing is written in that case.
    pub fn debit<S: StateAccess + ?Sized>(
        state: &mut S,
        id: &UserId,
        amount: Decimal,
    ) -> Result<User, LedgerError> {
        let mut user = Self::load(state, id)?;
        user.debit(amount)?;
        Self::save(state, &user)?;
        Ok(user)
    }
}
