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

//! Typed operations and their flat argument-list form.
//!
//! | Verb | Arguments |
//! |------|-----------|
//! | `createUser` | name, mobile |
//! | `recharge` | userId, amount |
//! | `createOrder` | title, amount, rate, creatorId, createTime, endTime |
//! | `publish` / `loan` / `refund` | orderId |
//! | `invest` | orderId, investorId, amount |
//! | `uploadTradeCertificate` | orderId, certificate |
//! | `query` | subMethod, param |

use crate::LedgerError;
use crate::base::{OrderId, UserId};
use crate::contract::NewOrder;
use crate::query::QueryKind;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    CreateUser {
        name: String,
        mobile: String,
    },
    Recharge {
        user_id: UserId,
        amount: Decimal,
    },
    CreateOrder(NewOrder),
    Publish {
        order_id: OrderId,
    },
    Invest {
        order_id: OrderId,
        investor_id: UserId,
        amount: Decimal,
    },
    Loan {
        order_id: OrderId,
    },
    Refund {
        order_id: OrderId,
    },
    UploadTradeCertificate {
        order_id: OrderId,
        certificate: String,
    },
    Query {
        kind: QueryKind,
        param: String,
    },
}

/// Cursor over positional arguments.
struct Args<'a, S> {
    args: &'a [S],
    position: usize,
}

impl<'a, S: AsRef<str>> Args<'a, S> {
    fn optional(&mut self) -> Option<&'a str> {
        let arg = self.args.get(self.position).map(AsRef::as_ref);
        self.position += 1;
        arg
    }

    fn required(&mut self, name: &'static str) -> Result<&'a str, LedgerError> {
        self.optional().ok_or(LedgerError::MissingArgument(name))
    }

    fn amount(&mut self) -> Result<Decimal, LedgerError> {
        let raw = self.required("amount")?;
        Decimal::from_str(raw.trim()).map_err(|_| LedgerError::InvalidAmount(raw.to_owned()))
    }

    fn rate(&mut self) -> Result<Decimal, LedgerError> {
        let raw = self.required("rate")?;
        Decimal::from_str(raw.trim()).map_err(|_| LedgerError::InvalidRate(raw.to_owned()))
    }
}

impl Invocation {
    /// Parses `verb, args...`. Extra trailing arguments are ignored.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownFunction`] / [`LedgerError::UnknownQuery`] - unsupported verb.
    /// - [`LedgerError::MissingArgument`] - too few arguments.
    /// - [`LedgerError::InvalidAmount`] / [`LedgerError::InvalidRate`] - unparsable number.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, LedgerError> {
        let mut args = Args { args, position: 0 };
        let verb = args.required("function")?;

        match verb {
            "createUser" => Ok(Self::CreateUser {
                name: args.required("name")?.to_owned(),
                mobile: args.required("mobile")?.to_owned(),
            }),
            "recharge" => Ok(Self::Recharge {
                user_id: UserId::from(args.required("userId")?),
                amount: args.amount()?,
            }),
            "createOrder" => Ok(Self::CreateOrder(NewOrder {
                title: args.required("title")?.to_owned(),
                target: args.amount()?,
                rate: args.rate()?,
                creator_id: UserId::from(args.required("creatorId")?),
                create_time: args.required("createTime")?.to_owned(),
                end_time: args.required("endTime")?.to_owned(),
            })),
            "publish" => Ok(Self::Publish {
                order_id: OrderId::from(args.required("orderId")?),
            }),
            "invest" => Ok(Self::Invest {
                order_id: OrderId::from(args.required("orderId")?),
                investor_id: UserId::from(args.required("investorId")?),
                amount: args.amount()?,
            }),
            "loan" => Ok(Self::Loan {
                order_id: OrderId::from(args.required("orderId")?),
            }),
            "refund" => Ok(Self::Refund {
                order_id: OrderId::from(args.required("orderId")?),
            }),
            "uploadTradeCertificate" => Ok(Self::UploadTradeCertificate {
                order_id: OrderId::from(args.required("orderId")?),
                certificate: args.required("certificate")?.to_owned(),
            }),
            "query" => Ok(Self::Query {
                kind: args.required("subMethod")?.parse()?,
                param: args.optional().unwrap_or_default().to_owned(),
            }),
            other => Err(LedgerError::UnknownFunction(other.to_owned())),
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::CreateUser { .. } => "createUser",
            Self::Recharge { .. } => "recharge",
            Self::CreateOrder(_) => "createOrder",
            Self::Publish { .. } => "publish",
            Self::Invest { .. } => "invest",
            Self::Loan { .. } => "loan",
            Self::Refund { .. } => "refund",
            Self::UploadTradeCertificate { .. } => "uploadTradeCertificate",
            Self::Query { .. } => "query",
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }
}
