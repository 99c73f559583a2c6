use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use personal_finances::{
    Bank, BankAccount, BankAccountPayload, BankPayload, CreditCard, CreditCardCycle,
    CreditCardCyclePayload, CreditCardInstallment, CreditCardInstallmentPayload,
    CreditCardPayload, CreditCardSubscription, CreditCardSubscriptionPayload, Currency,
    CurrencyPayload, CycleBalancePayload, Person, PersonPayload, Transaction, TransactionCategory,
    TransactionCategoryPayload, TransactionPayload, create, create_cycle_balance, initialize_db,
};

/// A utility for creating a test database for the personal finances API server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating reference data...");

    let peso = create::<Currency>(
        CurrencyPayload {
            name: "Argentine Peso".to_owned(),
            code: "ARS".to_owned(),
        },
        &conn,
    )?;
    let dollar = create::<Currency>(
        CurrencyPayload {
            name: "US Dollar".to_owned(),
            code: "USD".to_owned(),
        },
        &conn,
    )?;
    let bank = create::<Bank>(
        BankPayload {
            name: "Banco Galicia".to_owned(),
            country: "AR".to_owned(),
        },
        &conn,
    )?;
    let person = create::<Person>(
        PersonPayload {
            name: "Test User".to_owned(),
        },
        &conn,
    )?;
    let food = create::<TransactionCategory>(
        TransactionCategoryPayload {
            name: "Food".to_owned(),
            parent_id: None,
        },
        &conn,
    )?;
    let groceries = create::<TransactionCategory>(
        TransactionCategoryPayload {
            name: "Groceries".to_owned(),
            parent_id: Some(food.id),
        },
        &conn,
    )?;

    println!("Creating accounts and credit cards...");

    let account = create::<BankAccount>(
        BankAccountPayload {
            bank_id: bank.id,
            currency_id: peso.id,
            account_number: "0001-123456".to_owned(),
            balance: 150_000.0,
        },
        &conn,
    )?;
    let card = create::<CreditCard>(
        CreditCardPayload {
            bank_id: bank.id,
            person_id: person.id,
            number: "4111 1111 1111 1111".to_owned(),
            name: Some("Visa Gold".to_owned()),
            currency_ids: Some(vec![peso.id, dollar.id]),
        },
        &conn,
    )?;
    let cycle = create::<CreditCardCycle>(
        CreditCardCyclePayload {
            credit_card_id: card.id,
            closing_date: "2025-05-29".to_owned(),
            due_date: "2025-06-10".to_owned(),
        },
        &conn,
    )?;
    create_cycle_balance(
        cycle.id,
        CycleBalancePayload {
            credit_card_cycle_id: cycle.id,
            currency_id: peso.id,
            balance: Some(84_250.5),
            ..Default::default()
        },
        &conn,
    )?;
    create::<CreditCardInstallment>(
        CreditCardInstallmentPayload {
            credit_card_id: card.id,
            currency_id: peso.id,
            concept: "Washing machine".to_owned(),
            amount: 45_000.0,
            start_date: "2025-05-01".to_owned(),
            count: 6,
        },
        &conn,
    )?;
    create::<CreditCardSubscription>(
        CreditCardSubscriptionPayload {
            credit_card_id: card.id,
            currency_id: dollar.id,
            concept: "Music streaming".to_owned(),
            amount: 10.99,
        },
        &conn,
    )?;

    println!("Creating transactions...");

    create::<Transaction>(
        TransactionPayload {
            transaction_date: "2025-05-20".to_owned(),
            kind: "expense".to_owned(),
            amount: 23_400.0,
            notes: Some("Weekly shop".to_owned()),
            person_id: person.id,
            bank_account_id: account.id,
            category_id: groceries.id,
        },
        &conn,
    )?;

    println!("Success!");

    Ok(())
}
