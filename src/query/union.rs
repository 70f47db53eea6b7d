//! `UNION ALL` composition of select queries.
//!
//! [`union_all`] turns `N` queries over one entity into a single query that
//! reads from the derived table `union_q`:
//!
//! ```text
//! SELECT * FROM (
//!     SELECT * FROM (<branch 1>) AS "union_branch"
//!     UNION ALL (SELECT * FROM (<branch 2>) AS "union_branch")
//!     ...
//! ) AS "union_q"
//! ```
//!
//! Each branch is its own derived table, so a branch's ORDER BY / LIMIT only
//! applies to that branch. Ordering of the combined rows is whatever the caller
//! puts on the returned query.

use crate::query::select::SelectQuery;
use crate::query::traits::LifeModelTrait;
use crate::relation::eager::SelectWithRelated;
use crate::relation::Related;
use sea_query::{SelectStatement, UnionType};

/// Name of the derived table holding the union
pub const UNION_TABLE: &str = "union_q";

const BRANCH_ALIAS: &str = "union_branch";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnionError {
    #[error("missing input queries")]
    EmptyInput,
}

/// Something that can be one side of a `UNION ALL`
pub trait UnionBranch {
    /// Entity whose row shape the branch selects
    type Entity: LifeModelTrait;

    /// A copy of the branch statement; the branch itself stays untouched
    fn branch_statement(&self) -> SelectStatement;

    /// Table of an eager-load directive the union cannot carry
    fn dropped_relation(&self) -> Option<&'static str> {
        None
    }
}

impl<E: LifeModelTrait> UnionBranch for SelectQuery<E> {
    type Entity = E;

    fn branch_statement(&self) -> SelectStatement {
        self.statement().clone()
    }
}

impl<E, R> UnionBranch for SelectWithRelated<E, R>
where
    E: LifeModelTrait + Related<R>,
    R: LifeModelTrait,
{
    type Entity = E;

    fn branch_statement(&self) -> SelectStatement {
        self.query().statement().clone()
    }

    fn dropped_relation(&self) -> Option<&'static str> {
        Some(R::default().table_name())
    }
}

impl<B> UnionBranch for &B
where
    B: UnionBranch + ?Sized,
{
    type Entity = B::Entity;

    fn branch_statement(&self) -> SelectStatement {
        (**self).branch_statement()
    }

    fn dropped_relation(&self) -> Option<&'static str> {
        (**self).dropped_relation()
    }
}

/// Combine `queries` with `UNION ALL` and wrap the result as `union_q`.
///
/// Duplicates across branches are kept. Eager-load directives on the branches
/// are not carried over; call
/// [`find_with_related`](SelectQuery::find_with_related) on the returned query
/// to load relations for the combined rows.
///
/// # Errors
///
/// Returns [`UnionError::EmptyInput`] when `queries` is empty.
///
/// # Example
///
/// ```no_run
/// use pgunion::schema::Customer;
/// use pgunion::{union_all, LifeModelTrait};
/// use sea_query::{Expr, ExprTrait, Order};
///
/// let first = Customer::find().filter(Expr::col("name").eq("customer 1")).limit(4);
/// let second = Customer::find().filter(Expr::col("name").eq("customer 2")).limit(3);
/// let combined = union_all([&first, &second])?
///     .order_by("id", Order::Asc)
///     .limit(1);
/// # Ok::<(), pgunion::UnionError>(())
/// ```
pub fn union_all<B, I>(queries: I) -> Result<SelectQuery<B::Entity>, UnionError>
where
    B: UnionBranch,
    I: IntoIterator<Item = B>,
{
    let mut union: Option<SelectStatement> = None;

    for (index, branch) in queries.into_iter().enumerate() {
        if let Some(relation) = branch.dropped_relation() {
            log::debug!(
                "union_all: branch {index} eager-loads \"{relation}\"; relations are not carried through the union"
            );
        }

        let wrapped = wrap_branch(branch.branch_statement());
        match union.as_mut() {
            None => union = Some(wrapped),
            Some(accumulator) => {
                accumulator.union(UnionType::All, wrapped);
            }
        }
    }

    let union = union.ok_or(UnionError::EmptyInput)?;
    let mut outer = SelectStatement::default();
    outer.column(sea_query::Asterisk).from_subquery(union, UNION_TABLE);
    Ok(SelectQuery::from_statement(outer))
}

fn wrap_branch(branch: SelectStatement) -> SelectStatement {
    let mut wrapped = SelectStatement::default();
    wrapped.column(sea_query::Asterisk).from_subquery(branch, BRANCH_ALIAS);
    wrapped
}
