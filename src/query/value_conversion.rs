//! Value conversion from SeaQuery to may_postgres.
//!
//! Each `sea_query::Value` is boxed into an owned `ToSql` value first; the
//! borrowed parameter slice handed to the driver only lives inside the closure.

use crate::executor::LifeError;
use may_postgres::types::ToSql;
use sea_query::{Value, Values};

/// Convert SeaQuery values to may_postgres parameters and run `f` with them.
///
/// NULLs keep their column type (`Value::String(None)` binds as a NULL
/// `TEXT`), so PostgreSQL can still infer the parameter type.
///
/// # Errors
///
/// Returns `LifeError::Other` for values that have no driver representation,
/// or whatever `f` returns.
pub fn with_converted_params<F, R>(values: &Values, f: F) -> Result<R, LifeError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, LifeError>,
{
    let owned = values
        .0
        .iter()
        .map(to_sql_param)
        .collect::<Result<Vec<_>, _>>()?;
    let params: Vec<&dyn ToSql> = owned.iter().map(|p| p.as_ref()).collect();
    f(&params)
}

fn to_sql_param(value: &Value) -> Result<Box<dyn ToSql>, LifeError> {
    let param: Box<dyn ToSql> = match value {
        Value::Bool(b) => Box::new(*b),
        Value::TinyInt(i) => Box::new(i.map(i16::from)),
        Value::SmallInt(i) => Box::new(*i),
        Value::Int(i) => Box::new(*i),
        Value::BigInt(i) => Box::new(*i),
        Value::TinyUnsigned(u) => Box::new(u.map(i16::from)),
        Value::SmallUnsigned(u) => Box::new(u.map(i32::from)),
        Value::Unsigned(u) => Box::new(u.map(i64::from)),
        Value::BigUnsigned(u) => {
            let converted = u
                .map(|u| {
                    i64::try_from(u).map_err(|_| {
                        LifeError::Other(format!(
                            "BigUnsigned value {u} exceeds i64::MAX ({}), cannot be safely cast to i64",
                            i64::MAX
                        ))
                    })
                })
                .transpose()?;
            Box::new(converted)
        }
        Value::Float(f) => Box::new(*f),
        Value::Double(d) => Box::new(*d),
        Value::String(s) => Box::new(s.clone()),
        Value::Char(c) => Box::new(c.map(|c| c.to_string())),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Json(j) => Box::new(j.as_ref().map(|j| j.to_string())),
        #[allow(unreachable_patterns)]
        other => {
            return Err(LifeError::Other(format!(
                "Unsupported value type in query: {other:?}"
            )))
        }
    };
    Ok(param)
}
