//! # Seed Data Generator
//!
//! Populates the local store with a demo family, every record dirty, so a
//! first sync run has something to push.
//!
//! ## Usage
//! ```bash
//! # One month of entries (default)
//! cargo run -p famledger-db --bin seed
//!
//! # Custom family and entry count
//! cargo run -p famledger-db --bin seed -- --family fam-demo --entries 200
//!
//! # Specify database path
//! cargo run -p famledger-db --bin seed -- --db ./data/famledger.db
//! ```
//!
//! ## Generated Data
//! - Categories: a fixed set of income and expense categories
//! - Budgets: one monthly budget for the current month
//! - Ledger entries: spread over the last 30 days, cycling through the
//!   expense categories with deterministic amounts

use chrono::{Datelike, Duration, NaiveDate, Utc};
use famledger_core::{
    Budget, Category, LedgerEntry, PeriodType, TransactionType, DEFAULT_CURRENCY,
};
use famledger_db::{Database, DbConfig};
use std::env;

/// (name, icon, color, type)
const CATEGORIES: &[(&str, &str, &str, TransactionType)] = &[
    ("Salary", "briefcase", "#2E7D32", TransactionType::Income),
    ("Gifts", "gift", "#8E24AA", TransactionType::Income),
    ("Groceries", "cart", "#43A047", TransactionType::Expense),
    ("Dining Out", "utensils", "#FB8C00", TransactionType::Expense),
    ("Transport", "bus", "#1E88E5", TransactionType::Expense),
    ("Utilities", "bolt", "#FDD835", TransactionType::Expense),
    ("Kids", "child", "#EC407A", TransactionType::Expense),
    ("Health", "heart", "#E53935", TransactionType::Expense),
];

const MEMBERS: &[&str] = &["member-parent-1", "member-parent-2", "member-teen"];

fn month_bounds(today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)?;
    let next = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)?
    };
    Some((start, next.pred_opt()?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut entries: usize = 60;
    let mut family_id = String::from("fam-demo");
    let mut db_path = String::from("./famledger_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--entries" | "-n" => {
                if i + 1 < args.len() {
                    entries = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--family" | "-f" => {
                if i + 1 < args.len() {
                    family_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("famledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --entries <N>    Ledger entries to generate (default: 60)");
                println!("  -f, --family <ID>    Family id (default: fam-demo)");
                println!("  -d, --db <PATH>      Database file path (default: ./famledger_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 famledger Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Family:   {}", family_id);
    println!("Entries:  {}", entries);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.categories().count_for_family(&family_id).await?;
    if existing > 0 {
        println!("⚠ Family {} already has {} categories", family_id, existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    // Categories
    let categories: Vec<Category> = CATEGORIES
        .iter()
        .map(|(name, icon, color, kind)| Category::new_local(&family_id, *name, *icon, *color, *kind))
        .collect();
    db.categories().upsert_many(&categories).await?;
    println!("✓ {} categories", categories.len());

    // Budget for the current month
    let today = Utc::now().date_naive();
    let (start, end) = month_bounds(today).ok_or("could not compute current month")?;
    let budget = Budget::new_local(
        &family_id,
        "Household",
        250_000,
        DEFAULT_CURRENCY,
        PeriodType::Monthly,
        start,
        end,
    );
    db.budgets().upsert(&budget).await?;
    println!("✓ 1 budget ({} → {})", start, end);

    // Ledger entries
    let expense_categories: Vec<&Category> = categories
        .iter()
        .filter(|c| c.category_type == TransactionType::Expense)
        .collect();
    let salary = &categories[0];
    let now = Utc::now();

    let mut ledger = Vec::with_capacity(entries + 1);
    ledger.push(LedgerEntry::new_local(
        &family_id,
        MEMBERS[0],
        TransactionType::Income,
        420_000,
        DEFAULT_CURRENCY,
        &salary.id,
        now - Duration::days(29),
        Some("Monthly salary".to_string()),
    ));

    for n in 0..entries {
        let category = expense_categories[n % expense_categories.len()];
        let amount_minor = 350 + ((n as i64 * 7_919) % 12_000);
        ledger.push(LedgerEntry::new_local(
            &family_id,
            MEMBERS[n % MEMBERS.len()],
            TransactionType::Expense,
            amount_minor,
            DEFAULT_CURRENCY,
            &category.id,
            now - Duration::hours((n as i64 * 11) % (30 * 24)),
            None,
        ));
    }
    db.ledger_entries().upsert_many(&ledger).await?;
    println!("✓ {} ledger entries", ledger.len());

    let pending = db.ledger_entries().count_dirty().await?
        + db.budgets().count_dirty().await?
        + db.categories().count_dirty().await?;

    println!();
    println!("================================");
    println!("✅ Seeded {} dirty records, ready to sync", pending);

    db.close().await;
    Ok(())
}
