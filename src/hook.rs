//! Query hooks.
//!
//! A [`QueryHook`] gets two callbacks per statement: one right before it is sent
//! to PostgreSQL and one after the result (or error) came back. Both receive the
//! same [`QueryEvent`], which carries the SQL, its parameters and the start time.

use crate::executor::LifeError;
use may_postgres::types::ToSql;
use sea_query::{Value, Values};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Failure to turn a query and its parameters into literal SQL
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// A `$N` placeholder has no matching parameter
    #[error("placeholder ${index} has no parameter ({available} available)")]
    MissingParameter { index: usize, available: usize },
    /// The parameter cannot be written as a SQL literal
    #[error("cannot render value as SQL literal: {0}")]
    UnsupportedValue(String),
}

/// Error returned by a hook callback
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("failed to render query: {0}")]
    Render(#[from] RenderError),
    #[error("{0}")]
    Other(String),
}

/// Parameters of the statement being executed
#[derive(Clone, Copy)]
pub enum QueryParams<'a> {
    /// No parameters (unprepared statements)
    None,
    /// Parameters already bound as driver values
    Bound(&'a [&'a dyn ToSql]),
    /// Parameters as produced by the SeaQuery builder
    Values(&'a Values),
}

impl QueryParams<'_> {
    pub fn len(&self) -> usize {
        match self {
            QueryParams::None => 0,
            QueryParams::Bound(params) => params.len(),
            QueryParams::Values(values) => values.0.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the parameter behind placeholder `$index` (1-based)
    fn render(&self, index: usize) -> Result<String, RenderError> {
        let missing = RenderError::MissingParameter {
            index,
            available: self.len(),
        };
        if index == 0 {
            return Err(missing);
        }
        match self {
            QueryParams::None => Err(missing),
            // Driver values only expose `Debug`; good enough for a log line.
            QueryParams::Bound(params) => params
                .get(index - 1)
                .map(|param| format!("{param:?}"))
                .ok_or(missing),
            QueryParams::Values(values) => values
                .0
                .get(index - 1)
                .ok_or(missing)
                .and_then(value_to_sql_string),
        }
    }
}

impl fmt::Debug for QueryParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryParams::None => f.write_str("None"),
            QueryParams::Bound(params) => f.debug_list().entries(params.iter()).finish(),
            QueryParams::Values(values) => f.debug_list().entries(values.0.iter()).finish(),
        }
    }
}

/// Per-statement data handed to both hook callbacks
#[derive(Debug)]
pub struct QueryEvent<'a> {
    sql: &'a str,
    params: QueryParams<'a>,
    started: Instant,
    error: Option<String>,
}

impl<'a> QueryEvent<'a> {
    pub fn new(sql: &'a str, params: QueryParams<'a>) -> Self {
        Self {
            sql,
            params,
            started: Instant::now(),
            error: None,
        }
    }

    pub fn sql(&self) -> &str {
        self.sql
    }

    pub fn params(&self) -> QueryParams<'a> {
        self.params
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Time since the event was created, i.e. since before the first hook ran
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Error text of the failed query; always `None` in `before_query`
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn set_error(&mut self, error: &LifeError) {
        self.error = Some(error.to_string());
    }

    /// The SQL with every `$N` placeholder replaced by its parameter.
    ///
    /// Placeholders inside single-quoted literals are left alone.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if a placeholder has no parameter or a value has
    /// no literal form.
    pub fn formatted_query(&self) -> Result<String, RenderError> {
        inline_parameters(self.sql, self.params)
    }
}

/// Substitute `$N` placeholders in `sql` with rendered parameters.
pub(crate) fn inline_parameters(sql: &str, params: QueryParams<'_>) -> Result<String, RenderError> {
    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    let mut chars = sql.chars().peekable();
    let mut in_literal = false;

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            '$' if !in_literal && chars.peek().is_some_and(|n| n.is_ascii_digit()) => {
                let mut index = 0usize;
                while let Some(digit) = chars.peek().and_then(|n| n.to_digit(10)) {
                    index = index.saturating_mul(10).saturating_add(digit as usize);
                    chars.next();
                }
                out.push_str(&params.render(index)?);
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Convert a `sea_query::Value` to its PostgreSQL literal form
pub fn value_to_sql_string(value: &Value) -> Result<String, RenderError> {
    let literal = match value {
        Value::Bool(None)
        | Value::TinyInt(None)
        | Value::SmallInt(None)
        | Value::Int(None)
        | Value::BigInt(None)
        | Value::TinyUnsigned(None)
        | Value::SmallUnsigned(None)
        | Value::Unsigned(None)
        | Value::BigUnsigned(None)
        | Value::Float(None)
        | Value::Double(None)
        | Value::String(None)
        | Value::Char(None)
        | Value::Bytes(None)
        | Value::Json(None) => "NULL".to_string(),

        Value::Bool(Some(b)) => b.to_string(),

        Value::TinyInt(Some(i)) => i.to_string(),
        Value::SmallInt(Some(i)) => i.to_string(),
        Value::Int(Some(i)) => i.to_string(),
        Value::BigInt(Some(i)) => i.to_string(),
        Value::TinyUnsigned(Some(u)) => u.to_string(),
        Value::SmallUnsigned(Some(u)) => u.to_string(),
        Value::Unsigned(Some(u)) => u.to_string(),
        Value::BigUnsigned(Some(u)) => u.to_string(),

        Value::Float(Some(f)) => f.to_string(),
        Value::Double(Some(d)) => d.to_string(),

        Value::String(Some(s)) => quote_literal(s),
        Value::Char(Some(c)) => quote_literal(&c.to_string()),

        // PostgreSQL hex format: '\x...'
        Value::Bytes(Some(b)) => {
            let hex: String = b.iter().map(|byte| format!("{byte:02x}")).collect();
            format!("'\\x{hex}'")
        }

        Value::Json(Some(j)) => quote_literal(&j.to_string()),

        #[allow(unreachable_patterns)]
        other => return Err(RenderError::UnsupportedValue(format!("{other:?}"))),
    };
    Ok(literal)
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Callbacks around a single statement
///
/// `before_query` failing aborts the statement. `after_query` failing is
/// reported to the caller unless the statement itself already failed.
pub trait QueryHook: Send + Sync {
    /// Called right before the statement is sent
    ///
    /// # Errors
    ///
    /// Returning an error cancels the statement.
    fn before_query(&self, event: &QueryEvent<'_>) -> Result<(), HookError>;

    /// Called after the statement returned, successfully or not
    ///
    /// # Errors
    ///
    /// The error is surfaced as [`LifeError::Hook`].
    fn after_query(&self, event: &QueryEvent<'_>) -> Result<(), HookError>;
}

/// Ordered list of hooks attached to one executor
#[derive(Clone, Default)]
pub struct QueryHooks {
    hooks: Vec<Arc<dyn QueryHook>>,
}

impl QueryHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: Arc<dyn QueryHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run `query` between the before and after callbacks of every hook.
    ///
    /// # Errors
    ///
    /// Returns the query's own error first. Otherwise it returns the first
    /// hook error.
    pub fn run<T, F>(&self, sql: &str, params: QueryParams<'_>, query: F) -> Result<T, LifeError>
    where
        F: FnOnce() -> Result<T, LifeError>,
    {
        let mut event = QueryEvent::new(sql, params);

        for hook in &self.hooks {
            hook.before_query(&event)?;
        }

        let result = query();
        if let Err(err) = &result {
            event.set_error(err);
        }

        let mut hook_error = None;
        for hook in &self.hooks {
            if let Err(err) = hook.after_query(&event) {
                hook_error.get_or_insert(err);
            }
        }

        match (result, hook_error) {
            (Ok(value), None) => Ok(value),
            (Ok(_), Some(err)) => Err(LifeError::Hook(err)),
            (Err(err), Some(hook_err)) => {
                log::warn!(target: "pgunion::db", "after-query hook failed on a failed query: {hook_err}");
                Err(err)
            }
            (Err(err), None) => Err(err),
        }
    }
}

impl fmt::Debug for QueryHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}
