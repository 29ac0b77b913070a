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

//! Crowdfunding operations over ledger state.
//!
//! Each operation loads what it needs through [`StateAccess`], validates every
//! precondition against in-memory copies, and only then writes. Combined with
//! the host's all-or-nothing commit this means a rejected operation leaves no
//! trace, including a refund that fails halfway through its recipients.
//!
//! # Invariants
//!
//! - Money only moves between users or between a user and an order's
//!   pledged `current`; recharge is the single external inflow.
//! - `current` never exceeds `target` and equals the pledged sum until loan.
//! - A refund debits the creator exactly the sum credited to investors.

use crate::account::{AccountLedger, Role, User};
use crate::base::{OrderId, RecordId, UserId};
use crate::config::BootstrapConfig;
use crate::ids::IdGenerator;
use crate::ledger::StateAccess;
use crate::order::{InvestRecord, Order, RefundRecord, checked_total};
use crate::store::OrderStore;
use crate::{LedgerError, keys};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Arguments of [`Contract::create_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub title: String,
    pub target: Decimal,
    pub rate: Decimal,
    pub creator_id: UserId,
    pub create_time: String,
    pub end_time: String,
}

/// The crowdfunding state machine.
#[derive(Clone)]
pub struct Contract {
    ids: Arc<dyn IdGenerator>,
}

impl Contract {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids }
    }

    /// Creates the seed accounts, skipping names that already exist.
    pub fn bootstrap<S: StateAccess + ?Sized>(
        &self,
        state: &mut S,
        config: &BootstrapConfig,
    ) -> Result<Vec<User>, LedgerError> {
        let mut created = Vec::with_capacity(config.accounts.len());
        for seed in &config.accounts {
            if AccountLedger::find_by_name(state, &seed.name)?.is_some() {
                warn!(name = %seed.name, "seed account already exists");
                continue;
            }
            let user = AccountLedger::create(
                state,
                UserId::from(self.ids.next_id()),
                &seed.name,
                &seed.mobile,
                seed.balance,
                seed.role,
            )?;
            created.push(user);
        }
        info!(created = created.len(), "bootstrap accounts written");
        Ok(created)
    }

    /// Registers a regular user with a zero balance.
    pub fn create_user<S: StateAccess + ?Sized>(
        &self,
        state: &mut S,
        name: &str,
        mobile: &str,
    ) -> Result<User, LedgerError> {
        let user = AccountLedger::create(
            state,
            UserId::from(self.ids.next_id()),
            name,
            mobile,
            Decimal::ZERO,
            Role::Regular,
        )?;
        info!(user = %user.id, name = %user.name, "user created");
        Ok(user)
    }

    pub fn recharge<S: StateAccess + ?Sized>(
        &self,
        state: &mut S,
        user_id: &UserId,
        amount: Decimal,
    ) -> Result<User, LedgerError> {
        let user = AccountLedger::recharge(state, user_id, amount)?;
        info!(user = %user_id, %amount, balance = %user.balance(), "recharged");
        Ok(user)
    }

    /// Creates an order in `Created` status for an existing creator.
    pub fn create_order<S: StateAccess + ?Sized>(
        &self,
        state: &mut S,
        new: NewOrder,
    ) -> Result<Order, LedgerError> {
        let order = Order::new(
            OrderId::from(self.ids.next_id()),
            &new.title,
            new.target,
            new.rate,
            new.creator_id,
            &new.create_time,
            &new.end_time,
        )?;
        if !keys::is_valid_component(order.creator_id.as_str()) {
            return Err(LedgerError::MissingArgument("creator id"));
        }
        AccountLedger::load(state, &order.creator_id)?;

        OrderStore::save(state, &order)?;
        info!(order = %order.id, creator = %order.creator_id, target = %order.target, "order created");
        Ok(order)
    }

    pub fn publish<S: StateAccess + ?Sized>(
        &self,
        state: &mut S,
        order_id: &OrderId,
    ) -> Result<Order, LedgerError> {
        let mut order = OrderStore::load(state, order_id)?;
        order.publish()?;
        OrderStore::save(state, &order)?;
        info!(order = %order_id, "order published");
        Ok(order)
    }

    /// Pledges `amount` from `investor_id` into the order.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidStatus`] - order is not `Investable`.
    /// - [`LedgerError::ExceedsRemaining`] - pledge larger than `target - current`.
    /// - [`LedgerError::InsufficientBalance`] - investor cannot cover the pledge.
    pub fn invest<S: StateAccess + ?Sized>(
        &self,
        state: &mut S,
        order_id: &OrderId,
        investor_id: &UserId,
        amount: Decimal,
    ) -> Result<Order, LedgerError> {
        let mut order = OrderStore::load(state, order_id)?;
        order.check_investment(amount)?;
        let mut investor = AccountLedger::load(state, investor_id)?;
        investor.debit(amount)?;

        order.record_investment(InvestRecord {
            id: RecordId::from(self.ids.next_id()),
            investor_id: investor.id.clone(),
            user_name: investor.name.clone(),
            order_id: order.id.clone(),
            amount,
            title: order.title.clone(),
            create_time: state.timestamp(),
        })?;

        AccountLedger::save(state, &investor)?;
        OrderStore::save(state, &order)?;
        info!(
            order = %order_id,
            investor = %investor_id,
            %amount,
            current = %order.current,
            status = %order.status,
            "investment recorded"
        );
        Ok(order)
    }

    /// Releases the raised amount to the creator.
    pub fn loan<S: StateAccess + ?Sized>(
        &self,
        state: &mut S,
        order_id: &OrderId,
    ) -> Result<Order, LedgerError> {
        let mut order = OrderStore::load(state, order_id)?;
        let mut creator = AccountLedger::load(state, &order.creator_id)?;
        let released = order.release_funds()?;
        creator.credit(released)?;

        AccountLedger::save(state, &creator)?;
        OrderStore::save(state, &order)?;
        info!(order = %order_id, creator = %creator.id, %released, "order loaned");
        Ok(order)
    }

    /// Repays every pledge with interest in one settlement.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidStatus`] - order is not `Loaned`.
    /// - [`LedgerError::InsufficientBalance`] - creator cannot cover the total.
    /// - [`LedgerError::AmountOverflow`] - a payout leaves the decimal range.
    /// - [`LedgerError::UserNotFound`] - a recipient no longer resolves.
    pub fn refund<S: StateAccess + ?Sized>(
        &self,
        state: &mut S,
        order_id: &OrderId,
    ) -> Result<Order, LedgerError> {
        let mut order = OrderStore::load(state, order_id)?;
        let plan = order.refund_plan()?;
        let total = checked_total(plan.iter().map(|payout| payout.amount))?;

        let mut creator = AccountLedger::load(state, &order.creator_id)?;
        creator.debit(total)?;
        let recipients: BTreeSet<&UserId> = plan.iter().map(|payout| &payout.recipient).collect();
        for recipient in recipients {
            AccountLedger::load(state, recipient)?;
        }

        // Creator first: an investor who is also the creator reads the
        // debited balance back before being credited.
        AccountLedger::save(state, &creator)?;
        let timestamp = state.timestamp();
        let mut records = Vec::with_capacity(plan.len());
        for payout in plan {
            AccountLedger::credit(state, &payout.recipient, payout.amount)?;
            records.push(RefundRecord {
                id: RecordId::from(self.ids.next_id()),
                recipient_id: payout.recipient,
                order_id: order.id.clone(),
                amount: payout.amount,
                title: order.title.clone(),
                create_time: timestamp,
            });
        }
        order.record_refunds(records)?;
        OrderStore::save(state, &order)?;
        info!(order = %order_id, %total, status = %order.status, "order refunded");
        Ok(order)
    }

    pub fn upload_trade_certificate<S: StateAccess + ?Sized>(
        &self,
        state: &mut S,
        order_id: &OrderId,
        certificate: &str,
    ) -> Result<Order, LedgerError> {
        let mut order = OrderStore::load(state, order_id)?;
        order.attach_certificate(certificate)?;
        OrderStore::save(state, &order)?;
        info!(order = %order_id, "trade certificate attached");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TxId;
    use crate::ids::SequentialIds;
    use crate::ledger::MemoryLedger;
    use crate::order::OrderStatus;
    use rust_decimal_macros::dec;

    fn contract() -> Contract {
        Contract::new(Arc::new(SequentialIds::new("id")))
    }

    fn new_order(creator: &UserId, target: Decimal, rate: Decimal) -> NewOrder {
        NewOrder {
            title: "Orchard".to_owned(),
            target,
            rate,
            creator_id: creator.clone(),
            create_time: "2025-03-01".to_owned(),
            end_time: "2025-09-01".to_owned(),
        }
    }

    #[test]
    fn creator_investing_in_own_order_settles_correctly() {
        let ledger = MemoryLedger::new();
        let mut tx = ledger.begin(TxId::from("t"));
        let contract = contract();
        let creator = contract.create_user(&mut tx, "carol", "1").unwrap();
        contract.recharge(&mut tx, &creator.id, dec!(1000)).unwrap();

        let order = contract
            .create_order(&mut tx, new_order(&creator.id, dec!(100), dec!(0.2)))
            .unwrap();
        contract.publish(&mut tx, &order.id).unwrap();
        contract.invest(&mut tx, &order.id, &creator.id, dec!(100)).unwrap();
        contract.loan(&mut tx, &order.id).unwrap();
        assert_eq!(
            AccountLedger::load(&mut tx, &creator.id).unwrap().balance(),
            dec!(1000)
        );

        let order = contract.refund(&mut tx, &order.id).unwrap();
        assert_eq!(order.status, OrderStatus::Finished);
        // paid 120 to self
        assert_eq!(
            AccountLedger::load(&mut tx, &creator.id).unwrap().balance(),
            dec!(1000)
        );
    }

    #[test]
    fn create_order_requires_existing_creator() {
        let ledger = MemoryLedger::new();
        let mut tx = ledger.begin(TxId::from("t"));
        let result = contract().create_order(
            &mut tx,
            new_order(&UserId::from("ghost"), dec!(10), dec!(0)),
        );
        assert_eq!(result, Err(LedgerError::UserNotFound(UserId::from("ghost"))));
        assert!(tx.is_read_only());
    }

    #[test]
    fn rejected_invest_writes_nothing() {
        let ledger = MemoryLedger::new();
        let contract = contract();
        let mut setup = ledger.begin(TxId::from("setup"));
        let creator = contract.create_user(&mut setup, "carol", "1").unwrap();
        let investor = contract.create_user(&mut setup, "ivan", "2").unwrap();
        contract.recharge(&mut setup, &investor.id, dec!(10)).unwrap();
        let order = contract
            .create_order(&mut setup, new_order(&creator.id, dec!(100), dec!(0)))
            .unwrap();
        contract.publish(&mut setup, &order.id).unwrap();
        setup.commit().unwrap();

        let mut tx = ledger.begin(TxId::from("t"));
        let result = contract.invest(&mut tx, &order.id, &investor.id, dec!(50));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert!(tx.is_read_only());
    }

    #[test]
    fn bootstrap_skips_existing_names() {
        let ledger = MemoryLedger::new();
        let mut tx = ledger.begin(TxId::from("t"));
        let contract = contract();
        let config = BootstrapConfig::default();
        assert_eq!(contract.bootstrap(&mut tx, &config).unwrap().len(), 4);
        assert!(contract.bootstrap(&mut tx, &config).unwrap().is_empty());
        assert_eq!(AccountLedger::list(&mut tx).unwrap().len(), 4);
    }
}
