//! Query building and execution.
//!
//! - **Traits**: entity and model traits (`LifeModelTrait`, `LifeEntityName`, `FromRow`, `ModelTrait`)
//! - **Select**: SELECT query builder (`SelectQuery`)
//! - **Execution**: `all`, `one`, `find_one`, `count`
//! - **Union**: `UNION ALL` composition (`union_all`)
//! - **Value Conversion**: SeaQuery `Value` to `ToSql` parameters
//!
//! # Examples
//!
//! ```no_run
//! use pgunion::schema::Customer;
//! use pgunion::{LifeExecutor, LifeModelTrait};
//! use sea_query::{Expr, ExprTrait};
//!
//! # fn run(executor: &dyn LifeExecutor) -> Result<(), pgunion::LifeError> {
//! let customers = Customer::find()
//!     .filter(Expr::col("name").like("customer 1%"))
//!     .all(executor)?;
//! # Ok(())
//! # }
//! ```

pub mod traits;
#[doc(inline)]
pub use traits::{FromRow, LifeEntityName, LifeModelTrait, ModelTrait};

pub(crate) mod value_conversion;

pub mod select;
#[doc(inline)]
pub use select::SelectQuery;

pub mod execution;

pub mod union;
#[doc(inline)]
pub use union::{union_all, UnionBranch, UnionError, UNION_TABLE};
