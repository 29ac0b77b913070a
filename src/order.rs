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

//! Crowdfunding orders and their lifecycle.
//!
//! Orders follow a strictly forward state machine:
//!
//! ```text
//!  Created ──publish──► Investable ──invest (target reached)──► Full
//!                          │  ▲                                  │
//!                          └──┘ invest                          loan
//!                                                                ▼
//!  Finished ◄──(refunds ≥ target)── Refunding ◄──refund──────── Loaned
//! ```
//!
//! The methods here only touch the order value; balances are moved by the
//! caller in the same ledger transaction.

use crate::LedgerError;
use crate::account::Role;
use crate::base::{OrderId, RecordId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Created,
    Investable,
    Full,
    Loaned,
    Refunding,
    Finished,
}

impl OrderStatus {
    /// Whether an order in this status may be listed to a caller with `role`.
    pub fn is_visible_to(self, role: Option<Role>) -> bool {
        self != OrderStatus::Created || role == Some(Role::Admin)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One pledge into an order. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestRecord {
    pub id: RecordId,
    #[serde(rename = "creatorId")]
    pub investor_id: UserId,
    pub user_name: String,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub title: String,
    pub create_time: DateTime<Utc>,
}

/// One repayment to an investor. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRecord {
    pub id: RecordId,
    #[serde(rename = "creatorId")]
    pub recipient_id: UserId,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub title: String,
    pub create_time: DateTime<Utc>,
}

/// Amount owed to one investor at refund time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub recipient: UserId,
    pub principal: Decimal,
    pub amount: Decimal,
}

/// A crowdfunding campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub title: String,
    /// Funding target.
    #[serde(rename = "amount")]
    pub target: Decimal,
    /// Pledged and not yet released to the creator.
    pub current: Decimal,
    pub status: OrderStatus,
    pub rate: Decimal,
    pub creator_id: UserId,
    pub create_time: String,
    pub end_time: String,
    pub invest_records: Vec<InvestRecord>,
    pub refund_records: Vec<RefundRecord>,
    #[serde(default)]
    pub trade_certificate: Option<String>,
}

impl Order {
    /// Creates an order in [`OrderStatus::Created`].
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - target is zero or negative.
    /// - [`LedgerError::InvalidRate`] - rate is negative.
    pub fn new(
        id: OrderId,
        title: &str,
        target: Decimal,
        rate: Decimal,
        creator_id: UserId,
        create_time: &str,
        end_time: &str,
    ) -> Result<Self, LedgerError> {
        if target <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(target.to_string()));
        }
        if rate < Decimal::ZERO {
            return Err(LedgerError::InvalidRate(rate.to_string()));
        }
        Ok(Self {
            id,
            title: title.to_owned(),
            target,
            current: Decimal::ZERO,
            status: OrderStatus::Created,
            rate,
            creator_id,
            create_time: create_time.to_owned(),
            end_time: end_time.to_owned(),
            invest_records: Vec::new(),
            refund_records: Vec::new(),
            trade_certificate: None,
        })
    }

    /// Amount still open for pledges.
    pub fn remaining(&self) -> Decimal {
        self.target - self.current
    }

    pub fn invested_total(&self) -> Decimal {
        self.invest_records.iter().map(|record| record.amount).sum()
    }

    pub fn refunded_total(&self) -> Result<Decimal, LedgerError> {
        checked_total(self.refund_records.iter().map(|record| record.amount))
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.current >= Decimal::ZERO && self.current <= self.target,
            "Invariant violated: order {} current {} outside [0, {}]",
            self.id,
            self.current,
            self.target
        );
        debug_assert!(
            self.status >= OrderStatus::Loaned || self.current == self.invested_total(),
            "Invariant violated: order {} current {} differs from pledges {}",
            self.id,
            self.current,
            self.invested_total()
        );
    }

    fn expect_status(&self, expected: OrderStatus) -> Result<(), LedgerError> {
        if self.status != expected {
            return Err(LedgerError::InvalidStatus {
                order: self.id.clone(),
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }

    /// `Created` → `Investable`.
    pub fn publish(&mut self) -> Result<(), LedgerError> {
        self.expect_status(OrderStatus::Created)?;
        self.status = OrderStatus::Investable;
        Ok(())
    }

    /// Checks that a pledge of `amount` fits, without changing anything.
    pub fn check_investment(&self, amount: Decimal) -> Result<(), LedgerError> {
        self.expect_status(OrderStatus::Investable)?;
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount.to_string()));
        }
        if amount > self.remaining() {
            return Err(LedgerError::ExceedsRemaining {
                order: self.id.clone(),
                requested: amount,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Appends a pledge; reaching the target exactly moves the order to `Full`.
    pub fn record_investment(&mut self, record: InvestRecord) -> Result<(), LedgerError> {
        self.check_investment(record.amount)?;
        self.current = self
            .current
            .checked_add(record.amount)
            .ok_or(LedgerError::AmountOverflow("pledged amount"))?;
        self.invest_records.push(record);
        if self.current == self.target {
            self.status = OrderStatus::Full;
        }
        self.assert_invariants();
        Ok(())
    }

    /// `Full` → `Loaned`. Returns the amount to release to the creator.
    pub fn release_funds(&mut self) -> Result<Decimal, LedgerError> {
        self.expect_status(OrderStatus::Full)?;
        if self.current != self.target {
            return Err(LedgerError::NotFullyFunded {
                order: self.id.clone(),
                current: self.current,
                target: self.target,
            });
        }
        let released = self.current;
        self.current = Decimal::ZERO;
        self.status = OrderStatus::Loaned;
        self.assert_invariants();
        Ok(released)
    }

    /// One payout per pledge: `principal × (1 + rate)`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AmountOverflow`] if a payout or their sum is
    /// not representable.
    pub fn refund_plan(&self) -> Result<Vec<Payout>, LedgerError> {
        self.expect_status(OrderStatus::Loaned)?;
        let factor = Decimal::ONE
            .checked_add(self.rate)
            .ok_or(LedgerError::AmountOverflow("refund rate"))?;
        let plan = self
            .invest_records
            .iter()
            .map(|record| {
                Ok(Payout {
                    recipient: record.investor_id.clone(),
                    principal: record.amount,
                    amount: record
                        .amount
                        .checked_mul(factor)
                        .ok_or(LedgerError::AmountOverflow("refund amount"))?,
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;
        checked_total(plan.iter().map(|payout| payout.amount))?;
        Ok(plan)
    }

    /// `Loaned` → `Refunding`, or `Finished` once refunds cover the target.
    pub fn record_refunds(&mut self, records: Vec<RefundRecord>) -> Result<(), LedgerError> {
        self.expect_status(OrderStatus::Loaned)?;
        let refunded = checked_total(
            self.refund_records
                .iter()
                .chain(&records)
                .map(|record| record.amount),
        )?;
        self.refund_records.extend(records);
        self.status = OrderStatus::Refunding;
        if refunded >= self.target {
            self.status = OrderStatus::Finished;
        }
        Ok(())
    }

    pub fn attach_certificate(&mut self, certificate: &str) -> Result<(), LedgerError> {
        if certificate.trim().is_empty() {
            return Err(LedgerError::EmptyCertificate);
        }
        self.trade_certificate = Some(certificate.to_owned());
        Ok(())
    }
}

/// Sums amounts, failing instead of panicking when the total overflows.
pub fn checked_total<I>(amounts: I) -> Result<Decimal, LedgerError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow("total"))
    })
}
