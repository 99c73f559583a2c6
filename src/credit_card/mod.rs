//! Credit cards and the set of currencies each card can be charged in.

mod card;
mod currencies;

pub use card::{CreditCard, CreditCardPayload, create_credit_card_tables};
pub use currencies::{
    CreditCardCurrency, get_credit_card_currencies, get_credit_card_currencies_endpoint,
    replace_credit_card_currencies, replace_credit_card_currencies_endpoint,
};
