//! Sample schema: companies and customers linked many-to-many.
//!
//! ```text
//! companies (id, name) <-- companies_customers (company_id, customer_id) --> customers (id, name)
//! ```

use crate::executor::{LifeError, LifeExecutor};
use crate::query::{FromRow, LifeEntityName, LifeModelTrait, ModelTrait};
use crate::raw_sql::execute_unprepared;
use crate::relation::{Junction, Related};
use may_postgres::Row;
use sea_query::{Expr, InsertStatement, PostgresQueryBuilder, Query, Value, Values};

const CREATE_STATEMENTS: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS companies (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS customers (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS companies_customers (
        company_id BIGINT NOT NULL REFERENCES companies (id) ON DELETE CASCADE,
        customer_id BIGINT NOT NULL REFERENCES customers (id) ON DELETE CASCADE,
        PRIMARY KEY (company_id, customer_id)
    )",
];

const COMPANIES_CUSTOMERS: &str = "companies_customers";

/// Create the three tables if they do not exist yet
///
/// # Errors
///
/// Returns `LifeError` if a DDL statement fails.
pub fn create_schema<E: LifeExecutor + ?Sized>(executor: &E) -> Result<(), LifeError> {
    for statement in CREATE_STATEMENTS {
        execute_unprepared(executor, statement)?;
    }
    Ok(())
}

/// Drop the three tables
///
/// # Errors
///
/// Returns `LifeError` if the DDL statement fails.
pub fn drop_schema<E: LifeExecutor + ?Sized>(executor: &E) -> Result<(), LifeError> {
    execute_unprepared(
        executor,
        "DROP TABLE IF EXISTS companies_customers, customers, companies",
    )?;
    Ok(())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Company;

impl Company {
    pub const ID: &'static str = "id";
    pub const NAME: &'static str = "name";

    /// Insert a company and return it with its generated id
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the insert fails.
    pub fn insert<E: LifeExecutor + ?Sized>(executor: &E, name: &str) -> Result<CompanyModel, LifeError> {
        let (sql, values) = insert_named(Company.table_name(), name)?;
        let row = executor.query_one_values(&sql, &values)?;
        parse(&row)
    }
}

impl LifeEntityName for Company {
    fn table_name(&self) -> &'static str {
        "companies"
    }
}

impl LifeModelTrait for Company {
    type Model = CompanyModel;
}

impl Related<Customer> for Company {
    fn via() -> Junction {
        Junction {
            table: COMPANIES_CUSTOMERS,
            from_col: CompanyCustomer::COMPANY_ID,
            to_col: CompanyCustomer::CUSTOMER_ID,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyModel {
    pub id: i64,
    pub name: String,
}

impl FromRow for CompanyModel {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get(Company::ID)?,
            name: row.try_get(Company::NAME)?,
        })
    }
}

impl ModelTrait for CompanyModel {
    type Entity = Company;

    fn primary_key_value(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Customer;

impl Customer {
    pub const ID: &'static str = "id";
    pub const NAME: &'static str = "name";

    /// Insert a customer and return it with its generated id
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the insert fails.
    pub fn insert<E: LifeExecutor + ?Sized>(executor: &E, name: &str) -> Result<CustomerModel, LifeError> {
        let (sql, values) = insert_named(Customer.table_name(), name)?;
        let row = executor.query_one_values(&sql, &values)?;
        parse(&row)
    }
}

impl LifeEntityName for Customer {
    fn table_name(&self) -> &'static str {
        "customers"
    }
}

impl LifeModelTrait for Customer {
    type Model = CustomerModel;
}

impl Related<Company> for Customer {
    fn via() -> Junction {
        Junction {
            table: COMPANIES_CUSTOMERS,
            from_col: CompanyCustomer::CUSTOMER_ID,
            to_col: CompanyCustomer::COMPANY_ID,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerModel {
    pub id: i64,
    pub name: String,
}

impl FromRow for CustomerModel {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            id: row.try_get(Customer::ID)?,
            name: row.try_get(Customer::NAME)?,
        })
    }
}

impl ModelTrait for CustomerModel {
    type Entity = Customer;

    fn primary_key_value(&self) -> i64 {
        self.id
    }
}

/// Junction rows between companies and customers
#[derive(Debug, Default, Clone, Copy)]
pub struct CompanyCustomer;

impl CompanyCustomer {
    pub const COMPANY_ID: &'static str = "company_id";
    pub const CUSTOMER_ID: &'static str = "customer_id";

    /// Link a company to a customer
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the insert fails, e.g. the pair already exists.
    pub fn link<E: LifeExecutor + ?Sized>(
        executor: &E,
        company_id: i64,
        customer_id: i64,
    ) -> Result<(), LifeError> {
        let (sql, values) = link_statement(company_id, customer_id)?;
        executor.query_all_values(&sql, &values)?;
        Ok(())
    }
}

impl LifeEntityName for CompanyCustomer {
    fn table_name(&self) -> &'static str {
        COMPANIES_CUSTOMERS
    }
}

impl LifeModelTrait for CompanyCustomer {
    type Model = CompanyCustomerModel;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanyCustomerModel {
    pub company_id: i64,
    pub customer_id: i64,
}

impl FromRow for CompanyCustomerModel {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Self {
            company_id: row.try_get(CompanyCustomer::COMPANY_ID)?,
            customer_id: row.try_get(CompanyCustomer::CUSTOMER_ID)?,
        })
    }
}

fn insert_statement<const N: usize>(
    table: &'static str,
    columns: [&'static str; N],
    values: [Value; N],
) -> Result<InsertStatement, LifeError> {
    let mut query = Query::insert();
    query
        .into_table(table)
        .columns(columns)
        .values(values.into_iter().map(Expr::val))
        .map_err(|e| LifeError::Other(format!("Failed to build insert into {table}: {e}")))?;
    Ok(query)
}

/// `INSERT INTO <table> (name) VALUES (..) RETURNING *`
fn insert_named(table: &'static str, name: &str) -> Result<(String, Values), LifeError> {
    Ok(insert_statement(table, ["name"], [name.into()])?
        .returning_all()
        .build(PostgresQueryBuilder))
}

fn link_statement(company_id: i64, customer_id: i64) -> Result<(String, Values), LifeError> {
    let query = insert_statement(
        COMPANIES_CUSTOMERS,
        [CompanyCustomer::COMPANY_ID, CompanyCustomer::CUSTOMER_ID],
        [company_id.into(), customer_id.into()],
    )?;
    Ok(query.build(PostgresQueryBuilder))
}

fn parse<M: FromRow>(row: &Row) -> Result<M, LifeError> {
    crate::query::execution::parse_row(row)
}
