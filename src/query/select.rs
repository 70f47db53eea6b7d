//! Select query builder.
//!
//! Building methods live here, execution methods in [`super::execution`].

use crate::hook::{inline_parameters, QueryParams, RenderError};
use crate::query::traits::LifeModelTrait;
use sea_query::{IntoColumnRef, IntoCondition, Order, PostgresQueryBuilder, SelectStatement, Values};
use std::fmt;
use std::marker::PhantomData;

/// Query builder for selecting records of entity `E`
///
/// Returned by [`LifeModelTrait::find`] and by [`union_all`](crate::union_all).
///
/// # Example
///
/// ```no_run
/// use pgunion::schema::Customer;
/// use pgunion::LifeModelTrait;
/// use sea_query::{Expr, ExprTrait, Order};
///
/// let query = Customer::find()
///     .filter(Expr::col("name").like("customer 1%"))
///     .order_by("id", Order::Asc)
///     .limit(10);
/// println!("{}", query.to_sql().unwrap());
/// ```
pub struct SelectQuery<E>
where
    E: LifeModelTrait,
{
    pub(crate) query: SelectStatement,
    pub(crate) _phantom: PhantomData<E>,
}

impl<E> SelectQuery<E>
where
    E: LifeModelTrait,
{
    /// `SELECT * FROM <table>`, table taken from `E::default().table_name()`
    pub fn new() -> Self {
        let table_name = E::default().table_name();
        let mut query = SelectStatement::default();
        query.column(sea_query::Asterisk).from(table_name);
        Self::from_statement(query)
    }

    /// Wrap an already built statement whose rows have the shape of `E::Model`
    pub fn from_statement(query: SelectStatement) -> Self {
        Self {
            query,
            _phantom: PhantomData,
        }
    }

    /// Add a filter condition (AND-ed with previous ones)
    pub fn filter<F>(mut self, condition: F) -> Self
    where
        F: IntoCondition,
    {
        self.query.cond_where(condition.into_condition());
        self
    }

    /// Add an ORDER BY clause
    pub fn order_by<C: IntoColumnRef>(mut self, column: C, order: Order) -> Self {
        self.query.order_by(column, order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query.offset(offset);
        self
    }

    /// The underlying SeaQuery statement
    pub fn statement(&self) -> &SelectStatement {
        &self.query
    }

    pub fn into_statement(self) -> SelectStatement {
        self.query
    }

    /// Build the parameterized PostgreSQL statement
    pub fn build(&self) -> (String, Values) {
        self.query.build(PostgresQueryBuilder)
    }

    /// The statement with its parameters inlined, as logged by the query hook
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if a parameter has no literal form.
    pub fn to_sql(&self) -> Result<String, RenderError> {
        let (sql, values) = self.build();
        inline_parameters(&sql, QueryParams::Values(&values))
    }
}

impl<E> Default for SelectQuery<E>
where
    E: LifeModelTrait,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for SelectQuery<E>
where
    E: LifeModelTrait,
{
    fn clone(&self) -> Self {
        Self::from_statement(self.query.clone())
    }
}

impl<E> fmt::Debug for SelectQuery<E>
where
    E: LifeModelTrait,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectQuery")
            .field("sql", &self.build().0)
            .finish()
    }
}
