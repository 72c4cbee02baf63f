//! CLI integration tests
//!
//! Each test runs the `petstore` binary against a database in a fresh
//! temporary directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::{Command, Output};

use rusqlite::Connection;
use tempfile::TempDir;

fn petstore(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_petstore"))
        .arg("--db")
        .arg(db)
        .args(args)
        .env_remove("PETSTORE_DB")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_migrate_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("store.db");

    let first = stdout(&petstore(&db, &["migrate"]));
    let second = stdout(&petstore(&db, &["migrate"]));

    assert!(first.contains("Applied 001_initial_schema"));
    assert!(second.contains("Schema is up to date"));
}

#[test]
fn test_demo_saves_every_table() {
    // GIVEN an empty database path in a directory that does not exist yet
    let dir = TempDir::new().unwrap();
    let db = dir.path().join(".petstore").join("store.db");

    // WHEN the demo runs
    let out = stdout(&petstore(&db, &["demo"]));

    // THEN it reports one cascade over three stores
    assert!(out.contains("Saved 3 stores in one transaction"));

    // AND the rows are in the database
    let conn = Connection::open(&db).unwrap();
    let count = |table: &str| -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    };
    assert_eq!(count("address"), 3);
    assert_eq!(count("store"), 3);
    assert_eq!(count("animal"), 4);
    assert_eq!(count("cat"), 2);
    assert_eq!(count("fish"), 2);
    assert_eq!(count("product"), 3);
    assert_eq!(count("store_product"), 3);
}

#[test]
fn test_show_json_after_demo() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("store.db");
    stdout(&petstore(&db, &["demo"]));

    let out = stdout(&petstore(&db, &["show", "--json"]));

    let stores: serde_json::Value = serde_json::from_str(&out).unwrap();
    let stores = stores.as_array().unwrap();
    assert_eq!(stores.len(), 3);
    assert_eq!(stores[0]["name"], "Baba");
    assert_eq!(stores[0]["address"]["city"], "La Seyne sur Mer");
    assert_eq!(stores[0]["animals"][0]["variant"]["kind"], "fish");
    assert_eq!(stores[0]["animals"][0]["variant"]["living_env"], "fresh_water");
    assert_eq!(stores[2]["animals"].as_array().unwrap().len(), 2);
    assert_eq!(stores[1]["products"][0]["product_type"], "food");
}

#[test]
fn test_show_text_on_empty_database() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("store.db");
    stdout(&petstore(&db, &["migrate"]));

    let out = stdout(&petstore(&db, &["show"]));

    assert!(out.contains("No stores saved"));
}

#[test]
fn test_show_without_schema_fails() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("store.db");

    let output = petstore(&db, &["show"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}
