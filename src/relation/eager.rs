//! Eager loading of many-to-many relations.
//!
//! Uses the "selectinload" strategy:
//! 1. Fetch the parent rows with the caller's query
//! 2. Collect their primary keys
//! 3. Fetch every related row in one query joined through the junction table,
//!    filtered with `IN (<parent keys>)`
//! 4. Group related rows by the parent key carried along in the result
//!
//! Two queries in total, whatever the number of parents.

use crate::executor::{LifeError, LifeExecutor};
use crate::query::execution::parse_row;
use crate::query::{LifeModelTrait, ModelTrait, SelectQuery};
use crate::relation::Related;
use sea_query::{Expr, ExprTrait, JoinType, PostgresQueryBuilder, SelectStatement};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;

/// Alias of the junction column identifying the parent in related rows
const PARENT_KEY: &str = "__parent_id";

/// A select query plus an eager-load directive for `R`
///
/// Created by [`SelectQuery::find_with_related`].
pub struct SelectWithRelated<E, R>
where
    E: LifeModelTrait + Related<R>,
    R: LifeModelTrait,
{
    query: SelectQuery<E>,
    _related: PhantomData<R>,
}

impl<E> SelectQuery<E>
where
    E: LifeModelTrait,
{
    /// Also load every `R` linked to each returned row
    pub fn find_with_related<R>(self) -> SelectWithRelated<E, R>
    where
        E: Related<R>,
        R: LifeModelTrait,
    {
        SelectWithRelated {
            query: self,
            _related: PhantomData,
        }
    }
}

impl<E, R> SelectWithRelated<E, R>
where
    E: LifeModelTrait + Related<R>,
    R: LifeModelTrait,
{
    /// The parent query, without the relation
    pub fn query(&self) -> &SelectQuery<E> {
        &self.query
    }

    pub fn into_query(self) -> SelectQuery<E> {
        self.query
    }

    /// Run the parent query, then load the related rows for all parents
    ///
    /// Parents keep the order of the parent query. A parent appearing twice
    /// (e.g. from a `UNION ALL`) gets its related rows both times.
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if either query fails or a row cannot be decoded.
    pub fn all<Ex: LifeExecutor + ?Sized>(
        &self,
        executor: &Ex,
    ) -> Result<Vec<(E::Model, Vec<R::Model>)>, LifeError>
    where
        E::Model: ModelTrait,
        R::Model: Clone,
    {
        let parents = self.query.all(executor)?;
        let related = load_many_to_many::<E, R, Ex>(&parents, executor)?;

        Ok(parents
            .into_iter()
            .map(|parent| {
                let models = related
                    .get(&parent.primary_key_value())
                    .cloned()
                    .unwrap_or_default();
                (parent, models)
            })
            .collect())
    }
}

impl<E, R> Clone for SelectWithRelated<E, R>
where
    E: LifeModelTrait + Related<R>,
    R: LifeModelTrait,
{
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            _related: PhantomData,
        }
    }
}

impl<E, R> fmt::Debug for SelectWithRelated<E, R>
where
    E: LifeModelTrait + Related<R>,
    R: LifeModelTrait,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectWithRelated")
            .field("query", &self.query)
            .field("related", &R::default().table_name())
            .finish()
    }
}

/// Load the `R` rows linked to `parents`, keyed by parent primary key.
///
/// No query is issued when `parents` is empty.
///
/// # Errors
///
/// Returns `LifeError` if the query fails or a row cannot be decoded.
pub fn load_many_to_many<E, R, Ex>(
    parents: &[E::Model],
    executor: &Ex,
) -> Result<HashMap<i64, Vec<R::Model>>, LifeError>
where
    E: LifeModelTrait + Related<R>,
    E::Model: ModelTrait,
    R: LifeModelTrait,
    Ex: LifeExecutor + ?Sized,
{
    let parent_ids: BTreeSet<i64> = parents.iter().map(ModelTrait::primary_key_value).collect();
    if parent_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let (sql, values) = related_statement::<E, R>(&parent_ids).build(PostgresQueryBuilder);
    let rows = executor.query_all_values(&sql, &values)?;

    let mut grouped: HashMap<i64, Vec<R::Model>> = HashMap::new();
    for row in &rows {
        let parent_id: i64 = row
            .try_get(PARENT_KEY)
            .map_err(|e| LifeError::ParseError(format!("Failed to read {PARENT_KEY}: {e}")))?;
        grouped.entry(parent_id).or_default().push(parse_row::<R::Model>(row)?);
    }
    Ok(grouped)
}

/// `SELECT "r".*, "j"."from" AS "__parent_id" FROM "r" JOIN "j" ON ... WHERE "j"."from" IN (...)`
fn related_statement<E, R>(parent_ids: &BTreeSet<i64>) -> SelectStatement
where
    E: LifeModelTrait + Related<R>,
    R: LifeModelTrait,
{
    let junction = E::via();
    let related_table = R::default().table_name();
    let related_pk = R::primary_key_column();

    let mut query = SelectStatement::default();
    query
        .expr(Expr::cust(format!(r#""{related_table}".*"#)))
        .expr_as(Expr::col((junction.table, junction.from_col)), PARENT_KEY)
        .from(related_table)
        .join(
            JoinType::InnerJoin,
            junction.table,
            Expr::cust(format!(
                r#""{}"."{}" = "{}"."{}""#,
                junction.table, junction.to_col, related_table, related_pk
            )),
        )
        .and_where(
            Expr::col((junction.table, junction.from_col)).is_in(parent_ids.iter().copied()),
        );
    query
}
