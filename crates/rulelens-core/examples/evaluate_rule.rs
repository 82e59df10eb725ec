//! Evaluate one rule against a few customers and print the English reading
//! and section outline alongside.
//!
//! Usage: cargo run -p rulelens-core --example evaluate_rule

use rulelens_core::Engine;
use serde_json::json;
use std::process;

static RULE: &str = r#"{"and": [
    {">": [{"var": "age"}, 18]},
    {"in": [{"var": "country"}, ["USA", "CA"]]},
    [{"var": "vip"}, true, {"<": [{"var": "orders"}, 5]}]
]}"#;

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let engine = Engine::default();
    let rule = engine.parse(RULE).unwrap_or_else(|e| {
        eprintln!("parse: {e}");
        process::exit(1);
    });

    println!("{}", engine.translate(&rule));
    print!("{}", engine.visualize(&rule).outline(None));
    for advisory in engine.advise(&rule) {
        eprintln!("warning: {advisory}");
    }

    let customers = [
        json!({"name": "Jane", "age": 28, "country": "USA", "vip": true}),
        json!({"name": "Bob", "age": 34, "country": "CA", "vip": false, "orders": 9}),
        json!({"name": "Ana", "age": 16, "country": "USA", "vip": true}),
    ];
    for customer in &customers {
        match engine.evaluate(&rule, customer) {
            Ok(result) => println!("{} -> {result}", customer["name"]),
            Err(e) => eprintln!("{}: {e}", customer["name"]),
        }
    }
}
