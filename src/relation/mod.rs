//! Many-to-many relations through a junction table.
//!
//! An entity declares how it reaches another one with [`Related::via`]:
//!
//! ```text
//! customers.id  <-  companies_customers.customer_id
//!                   companies_customers.company_id  ->  companies.id
//! ```
//!
//! Loading happens in [`eager`], one extra query per relation.

pub mod eager;

#[doc(inline)]
pub use eager::{load_many_to_many, SelectWithRelated};

use crate::query::LifeModelTrait;

/// Junction table between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Junction {
    /// Junction table name
    pub table: &'static str,
    /// Column referencing the entity the relation starts from
    pub from_col: &'static str,
    /// Column referencing the related entity
    pub to_col: &'static str,
}

/// `Self` is related to `R` through a junction table
pub trait Related<R>: LifeModelTrait
where
    R: LifeModelTrait,
{
    fn via() -> Junction;
}
