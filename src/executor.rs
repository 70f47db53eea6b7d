//! `LifeExecutor` and the hooked `may_postgres` executor.
//!
//! Every statement that goes through [`MayPostgresExecutor`] is wrapped by its
//! [`QueryHooks`], so an attached [`DbLogger`](crate::logger::DbLogger) sees the
//! query before it runs and again once it has finished.

use crate::hook::{HookError, QueryHook, QueryHooks, QueryParams};
use crate::query::value_conversion::with_converted_params;
use may_postgres::types::ToSql;
use may_postgres::{Client, Error as PostgresError, Row};
use sea_query::Values;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// `LifeExecutor` error type
#[derive(Debug, thiserror::Error)]
pub enum LifeError {
    /// `PostgreSQL` error from `may_postgres`
    #[error("PostgreSQL error: {0}")]
    PostgresError(#[from] PostgresError),
    /// Query execution error
    #[error("Query error: {0}")]
    QueryError(String),
    /// Row parsing/conversion error
    #[error("Parse error: {0}")]
    ParseError(String),
    /// A query hook refused or failed the query
    #[error("Query hook error: {0}")]
    Hook(#[from] HookError),
    /// Other execution errors
    #[error("Execution error: {0}")]
    Other(String),
}

/// Trait for executing database operations
///
/// The `*_values` variants take SeaQuery [`Values`] directly. The default
/// implementation converts them and delegates, while [`MayPostgresExecutor`]
/// overrides them so hooks can render the literal SQL.
pub trait LifeExecutor {
    /// Execute a SQL statement and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query execution fails.
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, LifeError>;

    /// Execute a query and return exactly one row
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query fails or does not return exactly one row.
    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, LifeError>;

    /// Execute a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query execution fails.
    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, LifeError>;

    /// Same as [`query_all`](Self::query_all) with SeaQuery values.
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if a value cannot be converted or the query fails.
    fn query_all_values(&self, query: &str, values: &Values) -> Result<Vec<Row>, LifeError> {
        with_converted_params(values, |params| self.query_all(query, params))
    }

    /// Same as [`query_one`](Self::query_one) with SeaQuery values.
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if a value cannot be converted or the query fails.
    fn query_one_values(&self, query: &str, values: &Values) -> Result<Row, LifeError> {
        with_converted_params(values, |params| self.query_one(query, params))
    }
}

/// Implementation of `LifeExecutor` for `may_postgres::Client`
///
/// Hooks are attached with [`add_query_hook`](Self::add_query_hook) or, for the
/// logger, through a [`HookRegistry`](crate::logger::HookRegistry) so that one
/// connection string never ends up with two loggers.
pub struct MayPostgresExecutor {
    client: Client,
    hooks: QueryHooks,
}

impl MayPostgresExecutor {
    /// Create a new executor without any hooks
    pub fn new(client: Client) -> Self {
        Self {
            client,
            hooks: QueryHooks::new(),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Consume the executor and return the underlying client
    pub fn into_client(self) -> Client {
        self.client
    }

    /// Attach a hook that runs around every query on this executor
    pub fn add_query_hook(&mut self, hook: Arc<dyn QueryHook>) {
        self.hooks.push(hook);
    }

    pub fn hooks(&self) -> &QueryHooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut QueryHooks {
        &mut self.hooks
    }

    /// Check if the underlying connection is healthy (`SELECT 1`)
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the health check query fails.
    pub fn check_health(&self) -> Result<bool, LifeError> {
        crate::connection::check_connection_health(&self.client)
            .map_err(|e| LifeError::Other(format!("Health check error: {e}")))
    }

    fn instrumented<T, F>(&self, query: &str, params: QueryParams<'_>, run: F) -> Result<T, LifeError>
    where
        F: FnOnce() -> Result<T, LifeError>,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(query).entered();
        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        let result = self.hooks.run(query, params, run);

        #[cfg(feature = "metrics")]
        {
            METRICS.record_query_duration(start.elapsed());
            if result.is_err() {
                METRICS.record_query_error();
            }
        }

        result
    }
}

impl LifeExecutor for MayPostgresExecutor {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, LifeError> {
        self.instrumented(query, QueryParams::Bound(params), || {
            self.client.execute(query, params).map_err(LifeError::from)
        })
    }

    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, LifeError> {
        self.instrumented(query, QueryParams::Bound(params), || {
            self.client.query_one(query, params).map_err(LifeError::from)
        })
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, LifeError> {
        self.instrumented(query, QueryParams::Bound(params), || {
            self.client.query(query, params).map_err(LifeError::from)
        })
    }

    fn query_all_values(&self, query: &str, values: &Values) -> Result<Vec<Row>, LifeError> {
        with_converted_params(values, |params| {
            self.instrumented(query, QueryParams::Values(values), || {
                self.client.query(query, params).map_err(LifeError::from)
            })
        })
    }

    fn query_one_values(&self, query: &str, values: &Values) -> Result<Row, LifeError> {
        with_converted_params(values, |params| {
            self.instrumented(query, QueryParams::Values(values), || {
                self.client.query_one(query, params).map_err(LifeError::from)
            })
        })
    }
}
