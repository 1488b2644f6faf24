// Shared fixtures; included by each integration test file.
#![allow(dead_code)]

use grocer_types::domain::cart::CartLine;
use grocer_types::domain::order::{OrderDraft, ShippingDetails};
use grocer_types::domain::product::Product;
use grocer_types::domain::quantity::Quantity;
use uuid::Uuid;

pub fn product(id: &str, price_cents: i64) -> Product {
    Product {
        id: id.into(),
        name: format!("Product {id}"),
        description: "test product".into(),
        price_cents,
        image: String::new(),
        category: "Pantry".into(),
        subcategory: "Essentials".into(),
        unit: "pack".into(),
        stock: 10,
        is_popular: false,
        nutrition: None,
    }
}

pub fn draft(user_id: Uuid, key: Option<Uuid>) -> OrderDraft {
    let cart = vec![
        CartLine {
            id: Uuid::new_v4(),
            product: product("1", 300),
            quantity: Quantity::new(2).unwrap(),
        },
        CartLine {
            id: Uuid::new_v4(),
            product: product("2", 550),
            quantity: Quantity::ONE,
        },
    ];
    let shipping = ShippingDetails {
        full_name: "Test".into(),
        email: "test@example.com".into(),
        address: "1 Main St".into(),
        phone: "555-0100".into(),
    };
    OrderDraft::from_cart(user_id, &cart, &shipping, key).unwrap()
}
