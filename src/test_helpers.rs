//! Database access for integration tests.
//!
//! Tests connect to `PGUNION_TEST_DATABASE_URL` (or the default local URL)
//! and skip when nothing answers there.

use crate::config::DEFAULT_DATABASE_URL;
use crate::connection::{connect_with_retry, establish, ConnectionError};
use crate::executor::{LifeError, MayPostgresExecutor};
use crate::logger::HookRegistry;
use crate::schema::create_schema;
use once_cell::sync::Lazy;
use std::time::Duration;

pub const TEST_DATABASE_URL_ENV: &str = "PGUNION_TEST_DATABASE_URL";

const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(3);
const RETRY_INTERVAL: Duration = Duration::from_millis(200);

/// Checked once per test binary
static REACHABLE: Lazy<bool> = Lazy::new(|| {
    let url = database_url();
    match connect_with_retry(&url, REACHABILITY_TIMEOUT, RETRY_INTERVAL) {
        Ok(_) => true,
        Err(e) => {
            eprintln!("no test database at {TEST_DATABASE_URL_ENV}: {e}");
            false
        }
    }
});

pub fn database_url() -> String {
    std::env::var(TEST_DATABASE_URL_ENV).unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// A connection to the test database with the sample schema in place
pub struct TestDatabase {
    url: String,
    executor: MayPostgresExecutor,
}

impl TestDatabase {
    /// Connect with a fresh [`HookRegistry`], or `None` if no database is reachable
    pub fn connect() -> Option<Self> {
        Self::connect_with(&HookRegistry::new())
    }

    /// Connect through `registry`, or `None` if no database is reachable
    ///
    /// # Panics
    ///
    /// Panics if the database was reachable but connecting or creating the
    /// schema failed.
    pub fn connect_with(registry: &HookRegistry) -> Option<Self> {
        if !*REACHABLE {
            eprintln!("skipping: test database unavailable");
            return None;
        }
        match Self::try_connect_with(registry) {
            Ok(db) => Some(db),
            Err(e) => panic!("test database setup failed: {e}"),
        }
    }

    /// # Errors
    ///
    /// Returns the connection or schema error.
    pub fn try_connect_with(registry: &HookRegistry) -> Result<Self, TestDatabaseError> {
        let url = database_url();
        let executor = establish(&url, REACHABILITY_TIMEOUT, RETRY_INTERVAL, registry, true)?;
        create_schema(&executor)?;
        Ok(Self { url, executor })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn executor(&self) -> &MayPostgresExecutor {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut MayPostgresExecutor {
        &mut self.executor
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TestDatabaseError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("schema setup failed: {0}")]
    Schema(#[from] LifeError),
}
