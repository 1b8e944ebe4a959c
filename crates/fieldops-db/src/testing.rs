//! Fixtures shared by the repository and workflow tests.

use chrono::Utc;
use uuid::Uuid;

use crate::pool::Database;
use fieldops_core::{
    Commission, Company, Customer, DraftOrder, Money, Order, OrderLine, Percentage, Product,
    Technician,
};

pub const COMPANY_ID: &str = "co-1";
pub const TECHNICIAN_ID: &str = "tech-1";

pub fn company(id: &str, installation_cents: i64) -> Company {
    Company {
        id: id.to_string(),
        name: format!("Company {id}"),
        installation_charge: Money::from_cents(installation_cents),
        is_active: true,
        created_at: Utc::now(),
    }
}

pub fn product(id: &str, sku: &str, price_cents: i64) -> Product {
    Product {
        id: id.to_string(),
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        description: None,
        price: Money::from_cents(price_cents),
        is_active: true,
        total_count: 0,
        allocated_count: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A technician with no earnings beyond fitting.
pub fn technician(id: &str) -> Technician {
    Technician {
        id: id.to_string(),
        name: "Ravi Kumar".to_string(),
        phone: "9876543210".to_string(),
        company_ids: vec![],
        service_rate: Money::zero(),
        misc_share: Percentage::zero(),
        is_blocked: false,
        created_at: Utc::now(),
    }
}

pub fn commission(technician_id: &str, product_id: &str, amount_cents: i64) -> Commission {
    Commission {
        id: Uuid::new_v4().to_string(),
        technician_id: technician_id.to_string(),
        product_id: product_id.to_string(),
        amount: Money::from_cents(amount_cents),
    }
}

/// Company `co-1` (₹50 installation), technician `tech-1`, products
/// `p1` (₹100) and `p2` (₹45).
pub async fn seed_reference_data(db: &Database) {
    db.companies().insert(&company(COMPANY_ID, 5_000)).await.unwrap();

    let mut tech = technician(TECHNICIAN_ID);
    tech.company_ids = vec![COMPANY_ID.to_string()];
    db.technicians().insert(&tech).await.unwrap();

    db.products().insert(&product("p1", "RO-100", 10_000)).await.unwrap();
    db.products().insert(&product("p2", "FLT-200", 4_500)).await.unwrap();
}

pub fn draft_input(tcr_number: &str) -> DraftOrder {
    DraftOrder {
        tcr_number: tcr_number.to_string(),
        company_id: COMPANY_ID.to_string(),
        technician_id: TECHNICIAN_ID.to_string(),
        customer: Customer {
            name: "Asha Rao".to_string(),
            phone: "9123456780".to_string(),
            alternate_phone: None,
            street: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
        },
        free_installation: false,
        products: vec![OrderLine::new("p1", 2)],
    }
}

pub fn draft_order(id: &str, tcr_number: &str) -> Order {
    Order::new_draft(
        id,
        draft_input(tcr_number),
        &company(COMPANY_ID, 5_000),
        &technician(TECHNICIAN_ID),
        Utc::now(),
    )
    .unwrap()
}
