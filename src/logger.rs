//! Query logger hook and the registry that attaches it once per database.

use crate::connection::redact_connection_string;
use crate::hook::{HookError, QueryEvent, QueryHook, QueryHooks};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Log target of every line written by [`DbLogger`] and [`HookRegistry`]
pub const LOG_TARGET: &str = "pgunion::db";

/// Logs each query at `trace`, before and after it runs
///
/// Lines are prefixed with the connection string (password masked) so output
/// from several databases can be told apart.
#[derive(Debug, Clone)]
pub struct DbLogger {
    connection_string: String,
    log_execution_time: bool,
}

impl DbLogger {
    pub fn new(connection_string: &str, log_execution_time: bool) -> Self {
        Self {
            connection_string: redact_connection_string(connection_string),
            log_execution_time,
        }
    }

    /// The label printed on every line
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn log_execution_time(&self) -> bool {
        self.log_execution_time
    }
}

impl QueryHook for DbLogger {
    fn before_query(&self, event: &QueryEvent<'_>) -> Result<(), HookError> {
        let sql = match event.formatted_query() {
            Ok(sql) => sql,
            Err(e) => {
                // The statement still runs; fall back to the raw SQL.
                log::error!(target: LOG_TARGET, "[{}] {e}", self.connection_string);
                event.sql().to_string()
            }
        };
        log::trace!(target: LOG_TARGET, "[{}] query to execute: {sql}", self.connection_string);
        Ok(())
    }

    fn after_query(&self, event: &QueryEvent<'_>) -> Result<(), HookError> {
        let sql = event.formatted_query().map_err(|e| {
            log::error!(target: LOG_TARGET, "[{}] {e}", self.connection_string);
            HookError::Render(e)
        })?;

        let mut line = if self.log_execution_time {
            format!("{:?} executed query: {sql}", event.elapsed())
        } else {
            format!("executed query: {sql}")
        };
        if let Some(error) = event.error() {
            line.push_str(&format!(", query error: {error}"));
        }
        log::trace!(target: LOG_TARGET, "[{}] {line}", self.connection_string);
        Ok(())
    }
}

/// Remembers which connection strings already have a [`DbLogger`]
///
/// Owned by whatever manages connections and shared by reference; two
/// registries track independently.
#[derive(Debug, Default)]
pub struct HookRegistry {
    registered: Mutex<HashSet<String>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a [`DbLogger`] for `connection_string` to `hooks`, unless one was
    /// attached through this registry before.
    ///
    /// Returns `true` when the logger was attached.
    pub fn attach_logger(
        &self,
        hooks: &mut QueryHooks,
        connection_string: &str,
        log_execution_time: bool,
    ) -> bool {
        // The set stays consistent even if a holder panicked.
        let mut registered = self.registered.lock().unwrap_or_else(PoisonError::into_inner);
        let logger = DbLogger::new(connection_string, log_execution_time);

        if !registered.insert(connection_string.to_string()) {
            log::trace!(
                target: LOG_TARGET,
                "[{}] this db is already added for tracking",
                logger.connection_string()
            );
            return false;
        }

        log::info!(
            target: LOG_TARGET,
            "[{}] added db logger (log_execution_time={log_execution_time})",
            logger.connection_string()
        );
        hooks.push(Arc::new(logger));
        true
    }

    pub fn is_registered(&self, connection_string: &str) -> bool {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(connection_string)
    }

    pub fn len(&self) -> usize {
        self.registered.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
