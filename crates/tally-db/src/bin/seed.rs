//! # Seed Data Generator
//!
//! Populates the database with a demo restaurant menu for one tenant.
//!
//! ## Usage
//! ```bash
//! # Seed tenant "demo" in ./tally_dev.db
//! cargo run -p tally-db --bin seed
//!
//! # Custom tenant and database path
//! cargo run -p tally-db --bin seed -- --tenant spice-hub --db ./data/tally.db
//!
//! # Print the seeded menu as JSON
//! cargo run -p tally-db --bin seed -- --json
//! ```
//!
//! ## Generated Items
//! Each category carries its own tax rate. Starters and mains are
//! stock-limited (prepared in batches); beverages are not.

use chrono::Utc;
use std::env;
use tally_core::validation::{validate_item_name, validate_price_cents, validate_tax_rate_bps};
use tally_core::CatalogItem;
use tally_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// (category, tax bps, stock-limited, [(name, price cents)])
const MENU: &[(&str, i64, bool, &[(&str, i64)])] = &[
    (
        "Starters",
        500,
        true,
        &[
            ("Paneer Tikka", 24000),
            ("Veg Spring Roll", 16000),
            ("Chicken 65", 26000),
            ("Samosa (2 pcs)", 6000),
            ("Hara Bhara Kebab", 18000),
        ],
    ),
    (
        "Mains",
        500,
        true,
        &[
            ("Butter Chicken", 32000),
            ("Dal Makhani", 22000),
            ("Palak Paneer", 24000),
            ("Veg Biryani", 25000),
            ("Chicken Biryani", 30000),
            ("Masala Dosa", 12000),
        ],
    ),
    (
        "Breads",
        500,
        false,
        &[("Butter Naan", 5000), ("Tandoori Roti", 3000), ("Laccha Paratha", 6000)],
    ),
    (
        "Beverages",
        1800,
        false,
        &[
            ("Masala Chai", 2000),
            ("Filter Coffee", 2500),
            ("Sweet Lassi", 6000),
            ("Fresh Lime Soda", 7000),
            ("Mineral Water", 2000),
        ],
    ),
];

/// Initial stock for stock-limited items.
const BATCH_SIZE: i64 = 25;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut tenant_id = String::from("demo");
    let mut db_path = String::from("./tally_dev.db");
    let mut print_json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--json" => print_json = true,
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -t, --tenant <ID>  Tenant to seed (default: demo)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("      --json         Print the seeded menu as JSON");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(tenant_id = %tenant_id, db_path = %db_path, "Seeding demo menu");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.catalog().count(&tenant_id).await?;
    if existing > 0 {
        warn!(
            tenant_id = %tenant_id,
            existing,
            "Tenant already has catalog items, skipping seed to avoid duplicates"
        );
        return Ok(());
    }

    let mut generated = 0;
    for (category, tax_rate_bps, limit_stock, items) in MENU {
        for (name, price_cents) in items.iter() {
            let item = menu_item(
                &tenant_id,
                category,
                name,
                *price_cents,
                *tax_rate_bps,
                *limit_stock,
            )?;

            if let Err(e) = db.catalog().insert(&item).await {
                warn!(name = %item.name, error = %e, "Failed to insert item");
                continue;
            }
            generated += 1;
        }
    }

    info!(generated, "Seed complete");

    if print_json {
        let menu = db.catalog().list(&tenant_id).await?;
        println!("{}", serde_json::to_string_pretty(&menu)?);
    }

    db.close().await;
    Ok(())
}

fn menu_item(
    tenant_id: &str,
    category: &str,
    name: &str,
    price_cents: i64,
    tax_rate_bps: i64,
    limit_stock: bool,
) -> Result<CatalogItem, Box<dyn std::error::Error>> {
    validate_item_name(name)?;
    validate_price_cents(price_cents)?;
    validate_tax_rate_bps(tax_rate_bps)?;

    let now = Utc::now();
    Ok(CatalogItem {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        name: name.to_string(),
        category: Some(category.to_string()),
        price_cents,
        tax_rate_bps,
        stock_quantity: if limit_stock { BATCH_SIZE } else { 0 },
        limit_stock,
        created_at: now,
        updated_at: now,
    })
}
