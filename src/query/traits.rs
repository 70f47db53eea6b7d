//! Entity and model traits.

use crate::query::select::SelectQuery;
use may_postgres::Row;

/// Table name of an entity
pub trait LifeEntityName {
    fn table_name(&self) -> &'static str;
}

/// An entity: a table plus the model its rows map to
///
/// Following SeaORM's pattern, the entity is a zero-sized marker and rows are
/// decoded into `Self::Model`.
pub trait LifeModelTrait: LifeEntityName + Default + Sized {
    type Model: FromRow;

    /// Name of the single-column primary key
    fn primary_key_column() -> &'static str {
        "id"
    }

    /// Start a `SELECT * FROM <table>` query
    fn find() -> SelectQuery<Self> {
        SelectQuery::new()
    }
}

/// Trait for types that can be created from a database row
pub trait FromRow: Sized {
    /// # Errors
    ///
    /// Returns the driver error when a column is missing or has the wrong type.
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error>;
}

/// Access to a model's primary key
pub trait ModelTrait: Clone + Send + std::fmt::Debug {
    type Entity: LifeModelTrait<Model = Self>;

    fn primary_key_value(&self) -> i64;
}
