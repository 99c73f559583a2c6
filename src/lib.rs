//! A web service for keeping track of personal finances.
//!
//! This library provides a JSON REST API for managing currencies, banks,
//! bank accounts, people, credit cards and their billing cycles, and
//! categorised transactions, all stored in a single SQLite database.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod app_state;
mod bank;
mod bank_account;
mod country;
mod credit_card;
mod credit_card_cycle;
mod credit_card_installment;
mod credit_card_subscription;
mod currency;
mod database_id;
mod db;
mod endpoints;
mod logging;
mod payload;
mod person;
mod resource;
mod routing;
mod transaction;
mod transaction_category;
mod validation;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use bank::{Bank, BankPayload};
pub use bank_account::{BankAccount, BankAccountPayload};
pub use country::{Country, get_all_countries};
pub use credit_card::{
    CreditCard, CreditCardCurrency, CreditCardPayload, get_credit_card_currencies,
    replace_credit_card_currencies,
};
pub use credit_card_cycle::{
    CreditCardCycle, CreditCardCycleBalance, CreditCardCyclePayload, CycleBalancePayload,
    create_cycle_balance, delete_cycle_balance, get_cycle_balance, get_cycle_balances,
    update_cycle_balance,
};
pub use credit_card_installment::{CreditCardInstallment, CreditCardInstallmentPayload};
pub use credit_card_subscription::{CreditCardSubscription, CreditCardSubscriptionPayload};
pub use currency::{Currency, CurrencyPayload};
pub use database_id::DatabaseId;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use person::{Person, PersonPayload};
pub use resource::{Conflict, Resource, create, delete, get, list, update};
pub use routing::build_router;
pub use transaction::{Transaction, TransactionPayload, TransactionType};
pub use transaction_category::{TransactionCategory, TransactionCategoryPayload};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install the terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
///
/// Every variant maps to one HTTP status and one machine-readable error code
/// in the JSON error body, see [Error::code].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A field in the request body was missing, malformed or out of range,
    /// or referred to a record that does not exist.
    ///
    /// The message is shown to the client verbatim.
    #[error("{0}")]
    InvalidPayload(String),

    /// The ID in the request path is not a positive integer.
    ///
    /// The string is the human-readable name of the resource, e.g. "bank account".
    #[error("{0} id must be a positive integer")]
    InvalidId(&'static str),

    /// The requested resource was not found.
    ///
    /// The string is the human-readable name of the resource, e.g. "bank account".
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request would break a uniqueness rule.
    #[error("{}", .0.message)]
    Duplicate(Conflict),

    /// The record cannot be deleted while other records refer to it.
    #[error("{}", .0.message)]
    InUse(Conflict),

    /// The HTTP method is not supported on the requested path.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl Error {
    /// The machine-readable code sent to the client in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidPayload(_) => "invalid_payload",
            Error::InvalidId(_) => "invalid_id",
            Error::NotFound(_) => "not_found",
            Error::Duplicate(conflict) | Error::InUse(conflict) => conflict.code,
            Error::MethodNotAllowed => "method_not_allowed",
            Error::SqlError(_) | Error::DatabaseLockError => "internal_error",
        }
    }

    /// The HTTP status code for the error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidPayload(_) | Error::InvalidId(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Duplicate(_) | Error::InUse(_) => StatusCode::CONFLICT,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::SqlError(_) | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for an [Error::InvalidPayload] with `message`.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidPayload(message.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("record"),
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected request body: {rejection}");
        Error::invalid("request body must be valid JSON")
    }
}

/// The JSON body sent to the client when a request fails.
#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    error: ErrorBody<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let message = match &self {
            Error::SqlError(_) | Error::DatabaseLockError => {
                // The details of internal errors are only for the server logs.
                tracing::error!("An unexpected error occurred: {}", self);
                "internal server error".to_owned()
            }
            error => error.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}
