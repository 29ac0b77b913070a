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

//! REST gateway example for the crowdfunding ledger.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /invoke` - Run one invocation given as a flat argument list
//! - `GET /query/{sub}` - Run a query that takes no parameter (`userList`)
//! - `GET /query/{sub}/{param}` - Run a query
//! - `GET /indexes` - List secondary index inconsistencies
//!
//! The seed accounts are created on start; their ids are printed in the log.
//!
//! ## Example Usage
//!
//! ```bash
//! # Create a user
//! curl -X POST http://localhost:3000/invoke \
//!   -H "Content-Type: application/json" \
//!   -d '{"args": ["createUser", "carol", "13500000000"]}'
//!
//! # Create an order for that user
//! curl -X POST http://localhost:3000/invoke \
//!   -H "Content-Type: application/json" \
//!   -d '{"args": ["createOrder", "Orchard", "400", "0.1", "<user id>", "2025-01-01", "2025-06-30"]}'
//!
//! # List every user
//! curl http://localhost:3000/query/userList
//!
//! # Orders visible to a user
//! curl http://localhost:3000/query/orderList/<user id>
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crowdfund_ledger::{BootstrapConfig, Engine, ErrorKind, IndexIssue, Invocation, LedgerError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, info};

/// Commit attempts per request before a conflict is reported to the client.
const COMMIT_ATTEMPTS: usize = 8;

// === Request/Response DTOs ===

/// Request body for `POST /invoke`.
///
/// ```json
/// {"args": ["invest", "<order id>", "<user id>", "100"]}
/// ```
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub args: Vec<String>,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the ledger engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

// === Error Handling ===

/// Wrapper for converting LedgerError into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match self.0.kind() {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::State => (StatusCode::CONFLICT, "INVALID_STATUS"),
            ErrorKind::InsufficientFunds => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_FUNDS")
            }
            ErrorKind::Conflict => (StatusCode::SERVICE_UNAVAILABLE, "WRITE_CONFLICT"),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

/// Ledger payloads are already JSON; pass the bytes through untouched.
fn json_payload(payload: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], payload).into_response()
}

// === Handlers ===

/// POST /invoke - Run one invocation.
async fn invoke(
    State(state): State<AppState>,
    Json(request): Json<InvokeRequest>,
) -> Result<Response, AppError> {
    let invocation = Invocation::parse(&request.args)?;
    let payload = state.engine.invoke_with_retry(&invocation, COMMIT_ATTEMPTS)?;
    Ok(json_payload(payload))
}

/// GET /query/{sub} - Run a query without a parameter.
async fn query_all(
    State(state): State<AppState>,
    Path(sub): Path<String>,
) -> Result<Response, AppError> {
    run_query(&state, sub, String::new())
}

/// GET /query/{sub}/{param} - Run a query.
async fn query_one(
    State(state): State<AppState>,
    Path((sub, param)): Path<(String, String)>,
) -> Result<Response, AppError> {
    run_query(&state, sub, param)
}

fn run_query(state: &AppState, sub: String, param: String) -> Result<Response, AppError> {
    let invocation = Invocation::Query {
        kind: sub.parse()?,
        param,
    };
    let payload = state.engine.invoke_with_retry(&invocation, COMMIT_ATTEMPTS)?;
    Ok(json_payload(payload))
}

/// GET /indexes - Index keys that disagree with the authoritative records.
async fn verify_indexes(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let issues = state.engine.verify_indexes()?;
    Ok(Json(
        issues
            .into_iter()
            .map(|issue| match issue {
                IndexIssue::Missing(key) => format!("missing {}", key.escape_debug()),
                IndexIssue::Stale(key) => format!("stale {}", key.escape_debug()),
                IndexIssue::Orphan(key) => format!("orphan {}", key.escape_debug()),
            })
            .collect(),
    ))
}

// === Router ===

/// Creates the application router with all routes.
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/invoke", post(invoke))
        .route("/query/{sub}", get(query_all))
        .route("/query/{sub}/{param}", get(query_one))
        .route("/indexes", get(verify_indexes))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let engine = Arc::new(Engine::new());
    match engine.bootstrap(&BootstrapConfig::default()) {
        Ok(users) => {
            for user in users {
                info!(name = %user.name, id = %user.id, role = ?user.role, "seed account");
            }
        }
        Err(e) => {
            eprintln!("Failed to seed accounts: {}", e);
            std::process::exit(1);
        }
    }

    let app = create_router(AppState { engine });

    let addr = "0.0.0.0:3000";
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Crowdfund ledger gateway listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
