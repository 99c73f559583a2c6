//! Credit card billing cycles and the balance owed in each currency per cycle.

mod balance;
mod cycle;

pub use balance::{
    CreditCardCycleBalance, CycleBalancePayload, create_cycle_balance,
    create_cycle_balance_endpoint, delete_cycle_balance, delete_cycle_balance_endpoint,
    get_cycle_balance, get_cycle_balance_endpoint, get_cycle_balances,
    list_cycle_balances_endpoint, update_cycle_balance, update_cycle_balance_endpoint,
};
pub use cycle::{CreditCardCycle, CreditCardCyclePayload, create_credit_card_cycle_tables};
