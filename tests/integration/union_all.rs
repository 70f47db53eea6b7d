//! Integration tests for `union_all` against a real PostgreSQL database.
//!
//! Each test inserts customers with random names and links them to a fresh
//! company, so runs never see each other's rows.
//!
//! Tests are skipped when no database answers at `PGUNION_TEST_DATABASE_URL`.

use fake::faker::lorem::en::Words;
use fake::Fake;
use pgunion::schema::{Company, CompanyCustomer, CompanyModel, Customer, CustomerModel};
use pgunion::test_helpers::TestDatabase;
use pgunion::{union_all, LifeModelTrait, SelectQuery, UnionError};
use sea_query::{Expr, ExprTrait, Order};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Test Helpers
// ============================================================================

/// Random words plus a per-process unique tail
fn babble() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let words: Vec<String> = Words(5..6).fake();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        " {} {nanos}-{}",
        words.join(" "),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// Insert `count` customers named "customer <i>..." and link them all to one company
fn seed(db: &TestDatabase, count: usize) -> (CompanyModel, Vec<CustomerModel>) {
    let executor = db.executor();
    let customers: Vec<CustomerModel> = (0..count)
        .map(|i| {
            Customer::insert(executor, &format!("customer {i}{}", babble()))
                .expect("Failed to insert customer")
        })
        .collect();

    let company = Company::insert(executor, babble().trim()).expect("Failed to insert company");
    for customer in &customers {
        CompanyCustomer::link(executor, company.id, customer.id).expect("Failed to link");
    }
    (company, customers)
}

fn by_name(name: &str) -> SelectQuery<Customer> {
    Customer::find().filter(Expr::col(Customer::NAME).eq(name))
}

fn names(customers: &[CustomerModel]) -> Vec<&str> {
    customers.iter().map(|c| c.name.as_str()).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_empty_input_needs_no_database() {
    let queries: Vec<SelectQuery<Customer>> = Vec::new();
    assert_eq!(union_all(queries).unwrap_err(), UnionError::EmptyInput);
}

#[test]
fn test_union_all_minimal() {
    let Some(db) = TestDatabase::connect() else { return };
    let (_, customers) = seed(&db, 2);

    let q0 = by_name(&customers[0].name).limit(4);
    let q1 = by_name(&customers[1].name).limit(3);
    let result = union_all([&q0, &q1])
        .unwrap()
        .order_by(Customer::ID, Order::Asc)
        .limit(1)
        .all(db.executor())
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0], customers[0]);
}

#[test]
fn test_two_branches_ordered_by_name() {
    let Some(db) = TestDatabase::connect() else { return };
    let (_, customers) = seed(&db, 2);

    let q0 = by_name(&customers[0].name).limit(1);
    let q1 = by_name(&customers[1].name);
    let result = union_all([&q0, &q1])
        .unwrap()
        .order_by(Customer::NAME, Order::Asc)
        .limit(2)
        .all(db.executor())
        .unwrap();

    assert_eq!(names(&result), names(&customers));
}

#[test]
fn test_branches_stay_usable_after_composition() {
    let Some(db) = TestDatabase::connect() else { return };
    let (_, customers) = seed(&db, 2);

    let q0 = by_name(&customers[0].name).limit(1);
    let q1 = by_name(&customers[1].name);
    let composed = union_all([&q0, &q1]).unwrap();

    let alone = q0.all(db.executor()).unwrap();
    assert_eq!(alone, vec![customers[0].clone()]);
    assert_eq!(composed.count(db.executor()).unwrap(), 2);
}

#[test]
fn test_union_all_cycle() {
    let Some(db) = TestDatabase::connect() else { return };
    let (_, customers) = seed(&db, 10);

    let queries: Vec<_> = customers.iter().map(|c| by_name(&c.name)).collect();
    let result = union_all(&queries)
        .unwrap()
        .order_by(Customer::NAME, Order::Asc)
        .all(db.executor())
        .unwrap();

    assert_eq!(names(&result), names(&customers));
}

#[test]
fn test_duplicates_are_kept() {
    let Some(db) = TestDatabase::connect() else { return };
    let (_, customers) = seed(&db, 1);

    let q = by_name(&customers[0].name);
    let result = union_all([&q, &q, &q]).unwrap().all(db.executor()).unwrap();

    assert_eq!(result.len(), 3);
    assert!(result.iter().all(|c| *c == customers[0]));
}

#[test]
fn test_union_all_cycle_result_in_model() {
    let Some(db) = TestDatabase::connect() else { return };
    let (company, customers) = seed(&db, 10);
    let limit = 5;

    let queries: Vec<_> = customers
        .iter()
        .map(|c| {
            by_name(&c.name)
                .order_by(Customer::NAME, Order::Desc)
                .find_with_related::<Company>()
        })
        .collect();
    let composed = union_all(&queries)
        .unwrap()
        .order_by(Customer::NAME, Order::Asc)
        .limit(limit);

    let plain = composed.all(db.executor()).unwrap();
    assert_eq!(names(&plain), names(&customers[..limit as usize]));

    // The branch directive was dropped; re-applied on the composed query it loads.
    let with_companies = composed.find_with_related::<Company>().all(db.executor()).unwrap();
    assert_eq!(with_companies.len(), limit as usize);
    for ((customer, companies), expected) in with_companies.iter().zip(&customers) {
        assert_eq!(customer, expected);
        assert_eq!(companies, &vec![company.clone()]);
    }
}

#[test]
fn test_union_all_one_member_result_in_model() {
    let Some(db) = TestDatabase::connect() else { return };
    let (_, customers) = seed(&db, 1);
    let limit = 5;

    let branch = by_name(&customers[0].name)
        .order_by(Customer::NAME, Order::Desc)
        .find_with_related::<Company>();
    let result = union_all([&branch])
        .unwrap()
        .order_by(Customer::NAME, Order::Asc)
        .limit(limit)
        .all(db.executor())
        .unwrap();

    let direct = branch.query().all(db.executor()).unwrap();
    assert_eq!(result, direct);
    assert_eq!(result.len(), limit.min(1) as usize);
}

#[test]
fn test_outer_filter_on_union() {
    let Some(db) = TestDatabase::connect() else { return };
    let (_, customers) = seed(&db, 3);

    let queries: Vec<_> = customers.iter().map(|c| by_name(&c.name)).collect();
    let result = union_all(&queries)
        .unwrap()
        .filter(Expr::col(Customer::ID).gt(customers[0].id))
        .order_by(Customer::ID, Order::Asc)
        .all(db.executor())
        .unwrap();

    assert_eq!(result, customers[1..].to_vec());
}

#[test]
fn test_related_loading_without_parents_is_empty() {
    let Some(db) = TestDatabase::connect() else { return };

    let result = by_name(&format!("nobody{}", babble()))
        .find_with_related::<Company>()
        .all(db.executor())
        .unwrap();
    assert!(result.is_empty());
}
