//! # Seed Data Generator
//!
//! Populates a database with demo reference data and walks a few orders
//! through their lifecycle.
//!
//! ## Usage
//! ```bash
//! # Default database (./fieldops.db)
//! cargo run -p fieldops-db --bin seed
//!
//! # Custom database path and log level
//! FIELDOPS_DB_PATH=./data/demo.db FIELDOPS_LOG=debug cargo run -p fieldops-db --bin seed
//! ```
//!
//! ## Generated Data
//! - 3 companies with different installation charges
//! - 6 products with stock, some of it allocated to technicians
//! - 4 technicians (one blocked), with per-product commissions
//! - Orders covering: direct completion, approved discount, rejected
//!   discount, and a technician who ends up owing money
//!
//! Reference data is only inserted into an empty database, so the binary can
//! be re-run to add more orders.

use chrono::Utc;
use fieldops_core::{
    Commission, Company, Completion, Customer, DiscountSplit, DraftOrder, Money, OrderLine,
    PaymentMethod, Percentage, Product, RawDiscount, Technician,
};
use fieldops_db::{AppConfig, Database, NewPayment, OrderWorkflow};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// (id, name, installation charge in rupees)
const COMPANIES: &[(&str, &str, i64)] = &[
    ("co-aqua", "AquaPure Filters", 500),
    ("co-cool", "CoolBreeze Air Conditioning", 1_200),
    ("co-sun", "SunVolt Solar", 2_500),
];

/// (id, sku, name, price in rupees, units in stock)
const PRODUCTS: &[(&str, &str, &str, i64, i64)] = &[
    ("prd-ro", "AQ-RO-7", "RO Purifier 7L", 14_999, 40),
    ("prd-uv", "AQ-UV-10", "UV Purifier 10L", 9_499, 25),
    ("prd-filter", "AQ-FLT-1", "Replacement Filter Kit", 1_299, 200),
    ("prd-split", "CB-SPL-15", "Split AC 1.5 Ton", 38_990, 12),
    ("prd-stand", "CB-STD-1", "Outdoor Unit Stand", 1_450, 60),
    ("prd-panel", "SV-PNL-540", "Solar Panel 540W", 21_500, 30),
];

/// (product id, technician id, quantity) handed out on first seed
const ALLOCATIONS: &[(&str, &str, i64)] = &[
    ("prd-ro", "tech-ravi", 5),
    ("prd-filter", "tech-meena", 20),
    ("prd-panel", "tech-arjun", 8),
];

/// (id, name, phone, company ids, service rate in rupees, misc share %, blocked)
const TECHNICIANS: &[(&str, &str, &str, &[&str], i64, u32, bool)] = &[
    ("tech-ravi", "Ravi Kumar", "9876543210", &["co-aqua", "co-cool"], 150, 50, false),
    ("tech-meena", "Meena Iyer", "9812345678", &["co-aqua"], 100, 0, false),
    ("tech-arjun", "Arjun Singh", "9988776655", &["co-cool", "co-sun"], 250, 25, false),
    ("tech-vikram", "Vikram Rao", "9090909090", &["co-sun"], 0, 0, true),
];

/// (technician id, product id, commission per unit in rupees)
const COMMISSIONS: &[(&str, &str, i64)] = &[
    ("tech-ravi", "prd-ro", 300),
    ("tech-ravi", "prd-split", 800),
    ("tech-meena", "prd-ro", 250),
    ("tech-arjun", "prd-panel", 600),
];

fn rupees(r: i64) -> Money {
    Money::from_cents(r * 100)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    println!("FieldOps seed");
    println!("  Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config.db_config()).await?;

    let workflow = OrderWorkflow::new(db.clone());

    if db.products().list_catalog().await?.is_empty() {
        seed_reference_data(&db).await?;
        for (product_id, technician_id, quantity) in ALLOCATIONS {
            workflow
                .allocate_inventory(product_id, technician_id, *quantity)
                .await?;
        }
        println!("✓ Allocated stock to {} technicians", ALLOCATIONS.len());
    } else {
        println!("Reference data present, skipping catalog seed");
    }
    let run = &Uuid::new_v4().simple().to_string()[..6];

    // 1. No discount: completes immediately.
    let order = workflow
        .create_draft(draft(&format!("TCR-{run}-1"), "co-aqua", "tech-meena", "prd-ro", false))
        .await?;
    let order = workflow
        .complete_order(&order.id, completion("prd-ro", 1, 0, 200, RawDiscount::default()))
        .await?;
    report("no discount", &order);

    // 2. 10% discount, split 60/40.
    let order = workflow
        .create_draft(draft(&format!("TCR-{run}-2"), "co-cool", "tech-ravi", "prd-split", false))
        .await?;
    let order = workflow
        .complete_order(
            &order.id,
            completion("prd-split", 1, 350, 800, discount("percentage", json!(10))),
        )
        .await?;
    report("discount requested", &order);
    let order = workflow
        .approve_discount(&order.id, DiscountSplit::from_percentages(60.0, 40.0)?)
        .await?;
    report("discount approved", &order);

    // 3. Fixed discount, rejected by the approver.
    let order = workflow
        .create_draft(draft(&format!("TCR-{run}-3"), "co-sun", "tech-arjun", "prd-panel", true))
        .await?;
    let order = workflow
        .complete_order(
            &order.id,
            completion("prd-panel", 4, 0, 1_500, discount("amount", json!("5000"))),
        )
        .await?;
    let order = workflow.reject_discount(&order.id).await?;
    report("discount rejected", &order);

    // 4. Technician carries the whole discount and ends up owing.
    let order = workflow
        .create_draft(draft(&format!("TCR-{run}-4"), "co-aqua", "tech-meena", "prd-filter", false))
        .await?;
    let order = workflow
        .complete_order(
            &order.id,
            completion("prd-filter", 2, 0, 50, discount("amount", json!(1_000))),
        )
        .await?;
    let order = workflow
        .approve_discount(&order.id, DiscountSplit::from_percentages(0.0, 100.0)?)
        .await?;
    report("technician owes", &order);

    let balance = workflow.technician_balance("tech-meena").await?;
    if balance.collectable().is_positive() {
        let half = Money::from_cents((balance.collectable().cents() + 1) / 2);
        workflow
            .record_payment(NewPayment {
                technician_id: "tech-meena".to_string(),
                amount: half,
                method: PaymentMethod::DigitalWallet,
                reference: Some(format!("UPI-{run}")),
                notes: Some("Partial settlement".to_string()),
            })
            .await?;
    }

    println!();
    for (technician_id, ..) in TECHNICIANS {
        let balance = workflow.technician_balance(technician_id).await?;
        println!(
            "  {:<12} orders {:>3}  earned {:>12}  owes {:>10}  paid {:>10}  balance {:>10}",
            technician_id,
            balance.settled_orders,
            balance.total_earned,
            balance.total_outstanding,
            balance.total_paid,
            balance.balance
        );
    }

    println!();
    println!("✓ Seed complete!");
    db.close().await;
    Ok(())
}

async fn seed_reference_data(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();

    for (id, name, installation) in COMPANIES {
        db.companies()
            .insert(&Company {
                id: id.to_string(),
                name: name.to_string(),
                installation_charge: rupees(*installation),
                is_active: true,
                created_at: now,
            })
            .await?;
    }

    for (id, sku, name, price, stock) in PRODUCTS {
        db.products()
            .insert(&Product {
                id: id.to_string(),
                sku: sku.to_string(),
                name: name.to_string(),
                description: None,
                price: rupees(*price),
                is_active: true,
                total_count: *stock,
                allocated_count: 0,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    for (id, name, phone, companies, service_rate, misc_share, blocked) in TECHNICIANS {
        db.technicians()
            .insert(&Technician {
                id: id.to_string(),
                name: name.to_string(),
                phone: phone.to_string(),
                company_ids: companies.iter().map(|c| c.to_string()).collect(),
                service_rate: rupees(*service_rate),
                misc_share: Percentage::from_bps(misc_share * 100),
                is_blocked: *blocked,
                created_at: now,
            })
            .await?;
    }

    for (technician_id, product_id, amount) in COMMISSIONS {
        db.commissions()
            .insert(&Commission {
                id: Uuid::new_v4().to_string(),
                technician_id: technician_id.to_string(),
                product_id: product_id.to_string(),
                amount: rupees(*amount),
            })
            .await?;
    }

    info!(
        companies = COMPANIES.len(),
        products = PRODUCTS.len(),
        technicians = TECHNICIANS.len(),
        "Reference data seeded"
    );
    println!(
        "✓ Seeded {} companies, {} products, {} technicians",
        COMPANIES.len(),
        PRODUCTS.len(),
        TECHNICIANS.len()
    );
    Ok(())
}

fn draft(
    tcr_number: &str,
    company_id: &str,
    technician_id: &str,
    product_id: &str,
    free_installation: bool,
) -> DraftOrder {
    DraftOrder {
        tcr_number: tcr_number.to_string(),
        company_id: company_id.to_string(),
        technician_id: technician_id.to_string(),
        customer: Customer {
            name: "Lakshmi Narayan".to_string(),
            phone: "9445566778".to_string(),
            alternate_phone: None,
            street: "4th Cross, Jayanagar".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560041".to_string(),
        },
        free_installation,
        products: vec![OrderLine::new(product_id, 1)],
    }
}

fn completion(
    product_id: &str,
    quantity: i64,
    misc_rupees: i64,
    fitting_rupees: i64,
    discount: RawDiscount,
) -> Completion {
    Completion {
        products: vec![OrderLine::new(product_id, quantity)],
        miscellaneous_cost: rupees(misc_rupees),
        fitting_cost: rupees(fitting_rupees),
        discount,
    }
}

fn discount(kind: &str, value: serde_json::Value) -> RawDiscount {
    RawDiscount {
        kind: Some(kind.to_string()),
        value,
    }
}

fn report(label: &str, order: &fieldops_core::Order) {
    println!(
        "  {:<20} {:<16} gross {:>12}  discount {:>10}  tech {:>10}  company {:>12}  outstanding {:>9}",
        label,
        order.status,
        order.gross_subtotal,
        order.discount_amount,
        order.technician_cut,
        order.company_cut,
        order.outstanding_amount
    );
}
