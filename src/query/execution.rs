//! Query execution methods for `SelectQuery`.

use crate::executor::{LifeError, LifeExecutor};
use crate::query::select::SelectQuery;
use crate::query::traits::{FromRow, LifeModelTrait};
use may_postgres::Row;
use sea_query::{Expr, PostgresQueryBuilder, SelectStatement};

impl<E> SelectQuery<E>
where
    E: LifeModelTrait,
{
    /// Execute the query and return all results
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query fails or a row cannot be decoded.
    pub fn all<Ex: LifeExecutor + ?Sized>(&self, executor: &Ex) -> Result<Vec<E::Model>, LifeError> {
        let (sql, values) = self.build();
        let rows = executor.query_all_values(&sql, &values)?;
        rows.iter().map(parse_row::<E::Model>).collect()
    }

    /// Execute the query and return exactly one result
    ///
    /// # Errors
    ///
    /// Returns an error if zero or more than one row is returned.
    pub fn one<Ex: LifeExecutor + ?Sized>(&self, executor: &Ex) -> Result<E::Model, LifeError> {
        let (sql, values) = self.build();
        let row = executor.query_one_values(&sql, &values)?;
        parse_row::<E::Model>(&row)
    }

    /// Like [`one`](Self::one), but `Ok(None)` when nothing matched
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query fails or matches more than one row.
    pub fn find_one<Ex: LifeExecutor + ?Sized>(
        &self,
        executor: &Ex,
    ) -> Result<Option<E::Model>, LifeError> {
        let mut models = self.all(executor)?;
        match models.len() {
            0 => Ok(None),
            1 => Ok(models.pop()),
            n => Err(LifeError::QueryError(format!(
                "expected at most one row, got {n}"
            ))),
        }
    }

    /// Count the rows this query would return
    ///
    /// Ordering, limit and offset of the query are honoured because the query
    /// is counted as a derived table.
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query fails.
    pub fn count<Ex: LifeExecutor + ?Sized>(&self, executor: &Ex) -> Result<i64, LifeError> {
        let mut count_query = SelectStatement::default();
        count_query
            .expr_as(Expr::cust("COUNT(*)"), "count")
            .from_subquery(self.query.clone(), "count_q");
        let (sql, values) = count_query.build(PostgresQueryBuilder);
        let row = executor.query_one_values(&sql, &values)?;
        row.try_get::<_, i64>("count")
            .map_err(|e| LifeError::ParseError(format!("Failed to read count: {e}")))
    }
}

pub(crate) fn parse_row<M: FromRow>(row: &Row) -> Result<M, LifeError> {
    M::from_row(row).map_err(|e| LifeError::ParseError(format!("Failed to parse row: {e}")))
}
