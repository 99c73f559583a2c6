//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/banks/{bank_id}', use [format_endpoint].

/// The route for checking that the server is up.
pub const HEALTH: &str = "/api/health";
/// The route to list the seeded countries.
pub const COUNTRIES: &str = "/api/countries";
/// The route to list and create currencies.
pub const CURRENCIES: &str = "/api/currencies";
/// The route to access a single currency.
pub const CURRENCY: &str = "/api/currencies/{currency_id}";
/// The route to list and create banks.
pub const BANKS: &str = "/api/banks";
/// The route to access a single bank.
pub const BANK: &str = "/api/banks/{bank_id}";
/// The route to list and create bank accounts.
pub const BANK_ACCOUNTS: &str = "/api/bank-accounts";
/// The route to access a single bank account.
pub const BANK_ACCOUNT: &str = "/api/bank-accounts/{bank_account_id}";
/// The route to list and create people.
pub const PEOPLE: &str = "/api/people";
/// The route to access a single person.
pub const PERSON: &str = "/api/people/{person_id}";
/// The route to list and create transaction categories.
pub const TRANSACTION_CATEGORIES: &str = "/api/transaction-categories";
/// The route to access a single transaction category.
pub const TRANSACTION_CATEGORY: &str = "/api/transaction-categories/{category_id}";
/// The route to list and create credit cards.
pub const CREDIT_CARDS: &str = "/api/credit-cards";
/// The route to access a single credit card.
pub const CREDIT_CARD: &str = "/api/credit-cards/{credit_card_id}";
/// The route to read or replace the currencies of a credit card.
pub const CREDIT_CARD_CURRENCIES: &str = "/api/credit-cards/{credit_card_id}/currencies";
/// The route to list and create credit card cycles.
pub const CREDIT_CARD_CYCLES: &str = "/api/credit-card-cycles";
/// The route to access a single credit card cycle.
pub const CREDIT_CARD_CYCLE: &str = "/api/credit-card-cycles/{cycle_id}";
/// The route to list and create the balances of a credit card cycle.
pub const CYCLE_BALANCES: &str = "/api/credit-card-cycles/{cycle_id}/balances";
/// The route to access a single balance of a credit card cycle.
pub const CYCLE_BALANCE: &str = "/api/credit-card-cycles/{cycle_id}/balances/{balance_id}";
/// The route to list and create credit card installments.
pub const CREDIT_CARD_INSTALLMENTS: &str = "/api/credit-card-installments";
/// The route to access a single credit card installment.
pub const CREDIT_CARD_INSTALLMENT: &str = "/api/credit-card-installments/{installment_id}";
/// The route to list and create credit card subscriptions.
pub const CREDIT_CARD_SUBSCRIPTIONS: &str = "/api/credit-card-subscriptions";
/// The route to access a single credit card subscription.
pub const CREDIT_CARD_SUBSCRIPTION: &str = "/api/credit-card-subscriptions/{subscription_id}";
/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace and ends with a
/// right brace. For example, in the endpoint path '/banks/{bank_id}',
/// '{bank_id}' is the parameter. Paths with two parameters can be formatted
/// by calling this function twice.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok(), "{uri} is not a valid URI");
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::HEALTH);
        assert_endpoint_is_valid_uri(endpoints::COUNTRIES);
        assert_endpoint_is_valid_uri(endpoints::CURRENCIES);
        assert_endpoint_is_valid_uri(endpoints::BANKS);
        assert_endpoint_is_valid_uri(endpoints::BANK_ACCOUNTS);
        assert_endpoint_is_valid_uri(endpoints::PEOPLE);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTION_CATEGORIES);
        assert_endpoint_is_valid_uri(endpoints::CREDIT_CARDS);
        assert_endpoint_is_valid_uri(endpoints::CREDIT_CARD_CYCLES);
        assert_endpoint_is_valid_uri(endpoints::CREDIT_CARD_INSTALLMENTS);
        assert_endpoint_is_valid_uri(endpoints::CREDIT_CARD_SUBSCRIPTIONS);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS);

        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::CURRENCY, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::BANK, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::BANK_ACCOUNT, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::PERSON, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::TRANSACTION_CATEGORY, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::CREDIT_CARD, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::CREDIT_CARD_CURRENCIES, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::CREDIT_CARD_CYCLE, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::CYCLE_BALANCES, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(
            &format_endpoint(endpoints::CYCLE_BALANCE, 1),
            2,
        ));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::CREDIT_CARD_INSTALLMENT, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::CREDIT_CARD_SUBSCRIPTION, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::TRANSACTION, 1));
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/hello/{world_id}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
    }

    #[test]
    fn parameter_in_middle() {
        let formatted_path = format_endpoint("/hello/{world}/bye", 1);

        assert_eq!(formatted_path, "/hello/1/bye");
    }

    #[test]
    fn formats_two_parameters_in_order() {
        let formatted_path = format_endpoint(&format_endpoint("/a/{a_id}/b/{b_id}", 3), 7);

        assert_eq!(formatted_path, "/a/3/b/7");
    }
}
