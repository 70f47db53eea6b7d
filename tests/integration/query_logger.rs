//! Integration tests for the query logger hook.
//!
//! A capturing `log` backend records every `pgunion::db` line; each test
//! filters by a random marker in its own SQL since tests run in parallel.

use fake::faker::lorem::en::Word;
use fake::Fake;
use log::{Level, Log, Metadata, Record};
use once_cell::sync::Lazy;
use pgunion::logger::LOG_TARGET;
use pgunion::schema::Customer;
use pgunion::test_helpers::TestDatabase;
use pgunion::{query_all_raw, HookRegistry, LifeModelTrait};
use sea_query::{Expr, ExprTrait};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

struct Captured {
    lines: Mutex<Vec<(Level, String)>>,
}

impl Log for Captured {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.target() == LOG_TARGET
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            self.lines
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static CAPTURED: Lazy<&'static Captured> = Lazy::new(|| {
    let captured: &'static Captured = Box::leak(Box::new(Captured {
        lines: Mutex::new(Vec::new()),
    }));
    log::set_logger(captured).expect("Failed to install capturing logger");
    log::set_max_level(log::LevelFilter::Trace);
    captured
});

fn marker() -> String {
    let word: String = Word().fake();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{word}{nanos}")
}

fn lines_containing(needle: &str) -> Vec<(Level, String)> {
    CAPTURED
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, line)| line.contains(needle))
        .cloned()
        .collect()
}

#[test]
fn test_registering_twice_logs_each_query_once() {
    Lazy::force(&CAPTURED);
    let registry = HookRegistry::new();
    let Some(mut db) = TestDatabase::connect_with(&registry) else { return };

    let url = db.url().to_string();
    assert!(!registry.attach_logger(db.executor_mut().hooks_mut(), &url, true));
    assert_eq!(db.executor().hooks().len(), 1);

    let name = format!("customer {}", marker());
    let found = Customer::find()
        .filter(Expr::col(Customer::NAME).eq(name.as_str()))
        .all(db.executor())
        .unwrap();
    assert!(found.is_empty());

    let lines = lines_containing(&name);
    let before: Vec<_> = lines.iter().filter(|(_, l)| l.contains("query to execute: ")).collect();
    let after: Vec<_> = lines.iter().filter(|(_, l)| l.contains("executed query: ")).collect();
    assert_eq!(before.len(), 1, "{lines:?}");
    assert_eq!(after.len(), 1, "{lines:?}");
    assert!(before[0].1.contains(&format!("'{name}'")), "parameters are inlined: {}", before[0].1);
    assert!(lines.iter().all(|(level, _)| *level == Level::Trace));
}

#[test]
fn test_failed_query_is_logged_with_error() {
    Lazy::force(&CAPTURED);
    let Some(db) = TestDatabase::connect() else { return };

    let table = format!("missing_{}", marker().to_lowercase());
    let result = query_all_raw(db.executor(), &format!("SELECT * FROM {table}"), &[]);
    assert!(result.is_err());

    let lines = lines_containing(&table);
    let after = lines
        .iter()
        .find(|(_, l)| l.contains("executed query: "))
        .expect("after-query line");
    assert!(after.1.contains(", query error: "), "{}", after.1);
}

#[test]
fn test_second_executor_for_same_url_gets_no_logger() {
    let registry = HookRegistry::new();
    let Some(first) = TestDatabase::connect_with(&registry) else { return };
    let Some(second) = TestDatabase::connect_with(&registry) else { return };

    assert_eq!(first.executor().hooks().len(), 1);
    assert!(second.executor().hooks().is_empty());
    assert!(registry.is_registered(first.url()));
}
