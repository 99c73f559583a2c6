//! Application router configuration for the JSON API and the static browser UI.

use axum::{
    Json, Router,
    handler::HandlerWithoutStateExt,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tower_http::services::ServeDir;

use crate::{
    AppState, Bank, BankAccount, CreditCard, CreditCardCycle, CreditCardInstallment,
    CreditCardSubscription, Currency, Error, Person, Transaction, TransactionCategory,
    country::list_countries_endpoint,
    credit_card::{get_credit_card_currencies_endpoint, replace_credit_card_currencies_endpoint},
    credit_card_cycle::{
        create_cycle_balance_endpoint, delete_cycle_balance_endpoint, get_cycle_balance_endpoint,
        list_cycle_balances_endpoint, update_cycle_balance_endpoint,
    },
    endpoints,
    resource::{
        Resource, create_endpoint, delete_endpoint, get_endpoint, list_endpoint, update_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Paths that match no route are looked up in the static file directory,
/// and anything not found there gets a JSON 404.
pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(get_404_not_found.into_service());

    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::COUNTRIES, get(list_countries_endpoint))
        .merge(resource_routes::<Currency>(endpoints::CURRENCIES))
        .merge(resource_routes::<Bank>(endpoints::BANKS))
        .merge(resource_routes::<Person>(endpoints::PEOPLE))
        .merge(resource_routes::<TransactionCategory>(
            endpoints::TRANSACTION_CATEGORIES,
        ))
        .merge(resource_routes::<BankAccount>(endpoints::BANK_ACCOUNTS))
        .merge(resource_routes::<CreditCard>(endpoints::CREDIT_CARDS))
        .route(
            endpoints::CREDIT_CARD_CURRENCIES,
            get(get_credit_card_currencies_endpoint).put(replace_credit_card_currencies_endpoint),
        )
        .merge(resource_routes::<CreditCardCycle>(
            endpoints::CREDIT_CARD_CYCLES,
        ))
        .route(
            endpoints::CYCLE_BALANCES,
            get(list_cycle_balances_endpoint).post(create_cycle_balance_endpoint),
        )
        .route(
            endpoints::CYCLE_BALANCE,
            get(get_cycle_balance_endpoint)
                .put(update_cycle_balance_endpoint)
                .delete(delete_cycle_balance_endpoint),
        )
        .merge(resource_routes::<CreditCardInstallment>(
            endpoints::CREDIT_CARD_INSTALLMENTS,
        ))
        .merge(resource_routes::<CreditCardSubscription>(
            endpoints::CREDIT_CARD_SUBSCRIPTIONS,
        ))
        .merge(resource_routes::<Transaction>(endpoints::TRANSACTIONS))
        .method_not_allowed_fallback(get_405_method_not_allowed)
        .fallback_service(static_files)
        .with_state(state)
}

/// The list and create routes at `collection` and the read, replace and
/// delete routes at [Resource::ENDPOINT].
fn resource_routes<R: Resource>(collection: &str) -> Router<AppState> {
    Router::new()
        .route(collection, get(list_endpoint::<R>).post(create_endpoint::<R>))
        .route(
            R::ENDPOINT,
            get(get_endpoint::<R>)
                .put(update_endpoint::<R>)
                .delete(delete_endpoint::<R>),
        )
}

/// Check that the server is up.
async fn get_health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "message": "backend is up"}))
}

async fn get_404_not_found() -> Response {
    Error::NotFound("resource").into_response()
}

async fn get_405_method_not_allowed() -> Response {
    Error::MethodNotAllowed.into_response()
}

#[cfg(test)]
mod routing_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        endpoints,
        test_utils::{assert_error, get_test_server},
    };

    #[tokio::test]
    async fn health_reports_ok() {
        let server = get_test_server();

        let response = server.get(endpoints::HEALTH).await;

        response.assert_status_ok();
        response.assert_json(&json!({"status": "ok", "message": "backend is up"}));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let server = get_test_server();

        let response = server.get("/api/widgets").await;

        assert_error(
            &response,
            StatusCode::NOT_FOUND,
            "not_found",
            "resource not found",
        );
    }

    #[tokio::test]
    async fn post_to_unknown_path_is_not_found() {
        let server = get_test_server();

        let response = server.post("/api/widgets").json(&json!({})).await;

        assert_error(
            &response,
            StatusCode::NOT_FOUND,
            "not_found",
            "resource not found",
        );
    }

    #[tokio::test]
    async fn unsupported_method_is_not_allowed() {
        let server = get_test_server();

        let response = server.patch(endpoints::CURRENCIES).await;

        assert_error(
            &response,
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "method not allowed",
        );
    }

    #[tokio::test]
    async fn non_numeric_id_is_rejected() {
        let server = get_test_server();

        let response = server.get("/api/banks/abc").await;

        assert_error(
            &response,
            StatusCode::BAD_REQUEST,
            "invalid_id",
            "bank id must be a positive integer",
        );
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let server = get_test_server();

        let response = server.get("/api/people/42").await;

        assert_error(
            &response,
            StatusCode::NOT_FOUND,
            "not_found",
            "person not found",
        );
    }

    #[tokio::test]
    async fn countries_are_listed() {
        let server = get_test_server();

        let response = server.get(endpoints::COUNTRIES).await;

        response.assert_status_ok();
        let countries: Vec<serde_json::Value> = response.json();
        assert!(countries.iter().any(|country| country["code"] == "AR"));
    }
}
