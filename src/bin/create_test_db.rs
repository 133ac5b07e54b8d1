use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use split_bank::{
    GroupName, NewAccount, NewContact, NewP2PTransfer, NewPiggyTransfer, PasswordHash,
    PiggyDirection, User, add_member, create_account, create_contact, create_group,
    create_piggy_bank, create_user, initialize_db, post_p2p, post_piggy_transfer,
};

/// A utility for creating a demo database for the REST API server of split_bank.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The password given to every demo customer.
    #[arg(long, default_value = "demo")]
    password: String,
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

    println!("Creating demo customers...");
    let password_hash = PasswordHash::from_raw_password(&args.password, PasswordHash::DEFAULT_COST)?;
    let mario = create_user("100001", "Mario Rossi", password_hash.clone(), &conn)?;
    let giulia = create_user("100002", "Giulia Bianchi", password_hash.clone(), &conn)?;
    let luca = create_user("100003", "Luca Verdi", password_hash, &conn)?;

    let open_account = |user: &User, iban: &str, cents: i64| {
        create_account(
            NewAccount {
                user_id: user.id,
                name: format!("Conto {}", user.display_name),
                iban: iban.to_owned(),
                opening_balance: Decimal::new(cents, 2),
            },
            &conn,
        )
    };
    let mario_account = open_account(&mario, "IT60X0542811101000000123456", 250_000)?;
    let giulia_account = open_account(&giulia, "IT60X0542811101000000654321", 120_000)?;
    let luca_account = open_account(&luca, "IT60X0542811101000000111222", 80_000)?;

    println!("Creating contacts...");
    let add_contact = |owner: &User, target: &User, account_id: i64| {
        create_contact(
            NewContact {
                owner: owner.id,
                display_name: target.display_name.clone(),
                target_user_id: Some(target.id),
                target_account_id: Some(account_id),
                iban: None,
            },
            &conn,
        )
    };
    let mario_to_giulia = add_contact(&mario, &giulia, giulia_account.id)?;
    let mario_to_luca = add_contact(&mario, &luca, luca_account.id)?;
    add_contact(&giulia, &mario, mario_account.id)?;
    add_contact(&luca, &mario, mario_account.id)?;
    create_contact(
        NewContact {
            owner: mario.id,
            display_name: "Hans Becker".to_owned(),
            target_user_id: None,
            target_account_id: None,
            iban: Some("DE89370400440532013000".to_owned()),
        },
        &conn,
    )?;

    println!("Creating a split group...");
    let group = create_group(mario.id, GroupName::new("Flatmates")?, &conn)?;
    add_member(mario.id, group.id, mario_to_giulia.id, &conn)?;
    add_member(mario.id, group.id, mario_to_luca.id, &conn)?;

    let today = OffsetDateTime::now_utc().date();

    println!("Creating a piggy bank...");
    let piggy = create_piggy_bank(mario.id, "Summer holiday", Some(Decimal::new(1_500, 0)), &conn)?;
    post_piggy_transfer(
        NewPiggyTransfer {
            owner: mario.id,
            piggy_id: piggy.id,
            account_id: mario_account.id,
            amount: Decimal::new(300, 0),
            direction: PiggyDirection::ToPiggy,
            date: today,
            note: Some("First deposit".to_owned()),
        },
        &conn,
    )?;

    println!("Creating P2P history...");
    post_p2p(
        NewP2PTransfer {
            from_user_id: giulia.id,
            to_user_id: mario.id,
            from_account_id: giulia_account.id,
            to_account_id: mario_account.id,
            amount: Decimal::new(2_450, 2),
            message: Some("pizza".to_owned()),
            sender_name: giulia.display_name.clone(),
            recipient_name: mario.display_name.clone(),
            date: today,
        },
        &conn,
    )?;

    println!("Success! Log in with customer code 100001 and the password you chose.");

    Ok(())
}
