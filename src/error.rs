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

//! Error types for ledger operations.

use crate::base::{OrderId, TxId, UserId};
use crate::order::OrderStatus;
use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse classification of a [`LedgerError`].
///
/// Callers that only need to decide how to react (reject, retry, report
/// missing data) match on this rather than on the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing argument, or an undecodable record.
    Validation,
    /// Referenced user or order does not exist.
    NotFound,
    /// Operation is not valid for the order's current lifecycle status.
    State,
    /// Balance or remaining order capacity too low.
    InsufficientFunds,
    /// Concurrent write detected at commit time.
    Conflict,
}

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Required positional argument is absent
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// Amount does not parse, or is out of range for the operation
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    /// Arithmetic on an amount left the representable decimal range
    #[error("amount overflow computing {0}")]
    AmountOverflow(&'static str),

    /// Yield rate does not parse or is negative
    #[error("invalid rate: {0:?}")]
    InvalidRate(String),

    /// Trade certificate reference is empty
    #[error("certificate can not be empty")]
    EmptyCertificate,

    /// Display name already belongs to another user
    #[error("user name {0:?} already exists")]
    DuplicateUserName(String),

    /// Verb is not part of the operation surface
    #[error("unknown function {0:?}")]
    UnknownFunction(String),

    /// Query sub-method is not supported
    #[error("unknown query method {0:?}")]
    UnknownQuery(String),

    /// Host transaction id was already committed
    #[error("duplicate transaction ID {0}")]
    DuplicateTransaction(TxId),

    /// Stored bytes could not be decoded, or a value could not be encoded
    #[error("codec error: {0}")]
    Codec(String),

    /// Referenced user does not exist
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// Referenced order does not exist
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// Order is not in the status the operation requires
    #[error("order {order} is {actual}, expected {expected}")]
    InvalidStatus {
        order: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// Loan requested while the pledged amount differs from the target
    #[error("order {order} pledged {current} of {target}")]
    NotFullyFunded {
        order: OrderId,
        current: Decimal,
        target: Decimal,
    },

    /// Balance too low for a debit
    #[error("user {user} has insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        user: UserId,
        required: Decimal,
        available: Decimal,
    },

    /// Pledge larger than what is left to raise
    #[error("order {order} can accept at most {remaining}, requested {requested}")]
    ExceedsRemaining {
        order: OrderId,
        requested: Decimal,
        remaining: Decimal,
    },

    /// Key changed between read and commit
    #[error("write conflict on key {0:?}")]
    Conflict(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingArgument(_)
            | Self::InvalidAmount(_)
            | Self::AmountOverflow(_)
            | Self::InvalidRate(_)
            | Self::EmptyCertificate
            | Self::DuplicateUserName(_)
            | Self::UnknownFunction(_)
            | Self::UnknownQuery(_)
            | Self::DuplicateTransaction(_)
            | Self::Codec(_) => ErrorKind::Validation,
            Self::UserNotFound(_) | Self::OrderNotFound(_) => ErrorKind::NotFound,
            Self::InvalidStatus { .. } | Self::NotFullyFunded { .. } => ErrorKind::State,
            Self::InsufficientBalance { .. } | Self::ExceedsRemaining { .. } => {
                ErrorKind::InsufficientFunds
            }
            Self::Conflict(_) => ErrorKind::Conflict,
        }
    }

    /// Whether resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Codec(err.to_string())
    }
}
