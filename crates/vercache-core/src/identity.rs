//! Identification of cache dependencies.
//!
//! A dependency is anything whose change must invalidate cached results: a scalar
//! argument, a single row, the rows pointing at a parent, or a whole table. Every shape
//! is a variant of [`Thing`], and an [`IdentityInspector`] turns it into an [`Identity`].
//!
//! # Identity formats
//!
//! | Thing | Identity |
//! |---|---|
//! | `Scalar("42")` | `42` |
//! | `Row` of `user` with `id=1` | `user:id=1` |
//! | `Collection` of `user_note` with `user_id=1` | `user_note:user_id=1` |
//! | `Class` of `user` | `user` |
//! | `Tuple([a, b])` | `<a>:<b>` |
//! | `Dict({k: v})` | `k=<v>` (sorted by key) |
//!
//! Columns are always rendered in lexicographic order.

use std::collections::BTreeMap;

use crate::error::IdentityError;
use crate::version::Identity;

/// A persisted record type whose rows can be cache dependencies.
///
/// # Example
///
/// ```
/// use vercache_core::{Entity, Thing, DefaultIdentityInspector, IdentityInspector};
///
/// struct UserNote {
///     user_id: i64,
///     id: i64,
/// }
///
/// impl Entity for UserNote {
///     const TABLE: &'static str = "user_note";
///
///     fn primary_key(&self) -> Vec<(&'static str, Option<String>)> {
///         vec![("user_id", Some(self.user_id.to_string())), ("id", Some(self.id.to_string()))]
///     }
///
///     fn foreign_keys(&self) -> Vec<(&'static str, Option<String>)> {
///         vec![("user_id", Some(self.user_id.to_string()))]
///     }
/// }
///
/// let note = UserNote { user_id: 123, id: 456 };
/// let inspector = DefaultIdentityInspector;
/// let id = inspector.identify(&Thing::row_of(&note)).unwrap();
/// assert_eq!(id.as_str(), "user_note:id=456:user_id=123");
/// ```
pub trait Entity {
    /// Name of the table backing this entity.
    const TABLE: &'static str;

    /// Primary key columns and their values.
    fn primary_key(&self) -> Vec<(&'static str, Option<String>)>;

    /// Foreign key columns and their values.
    ///
    /// These identify the collection a row belongs to.
    fn foreign_keys(&self) -> Vec<(&'static str, Option<String>)> {
        Vec::new()
    }
}

/// Column name to value, `None` for NULL.
pub type Columns = BTreeMap<String, Option<String>>;

/// Every shape a cache dependency can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thing {
    /// A plain value, identified by its string form.
    Scalar(String),
    /// A single row, identified by its primary key.
    Row { table: String, columns: Columns },
    /// The rows pointing at a parent, identified by foreign key values.
    Collection { table: String, columns: Columns },
    /// A whole table.
    Class { table: String },
    /// An ordered group of things.
    Tuple(Vec<Thing>),
    /// Named things, identified in key order.
    Dict(BTreeMap<String, Thing>),
}

impl Thing {
    /// A scalar thing.
    pub fn scalar(value: impl ToString) -> Self {
        Self::Scalar(value.to_string())
    }

    /// A row of `table` with the given key columns.
    pub fn row<K, V>(table: impl Into<String>, columns: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        Self::Row {
            table: table.into(),
            columns: columns
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.to_string())))
                .collect(),
        }
    }

    /// A whole table by name.
    pub fn table(table: impl Into<String>) -> Self {
        Self::Class {
            table: table.into(),
        }
    }

    /// The table of entity type `E`.
    pub fn class<E: Entity>() -> Self {
        Self::table(E::TABLE)
    }

    /// The row of an entity instance.
    pub fn row_of<E: Entity>(entity: &E) -> Self {
        Self::Row {
            table: E::TABLE.to_string(),
            columns: collect_columns(entity.primary_key()),
        }
    }

    /// The collection an entity instance belongs to.
    pub fn collection_of<E: Entity>(entity: &E) -> Self {
        Self::Collection {
            table: E::TABLE.to_string(),
            columns: collect_columns(entity.foreign_keys()),
        }
    }

    /// An ordered group of things.
    pub fn tuple(items: impl IntoIterator<Item = Thing>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    /// Named things.
    pub fn dict<K: Into<String>>(items: impl IntoIterator<Item = (K, Thing)>) -> Self {
        Self::Dict(items.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Whether this is a single row (an entity instance).
    pub fn is_instance(&self) -> bool {
        matches!(self, Self::Row { .. })
    }

    /// The table a row or collection belongs to.
    pub fn owning_class(&self) -> Option<Thing> {
        match self {
            Self::Row { table, .. } | Self::Collection { table, .. } => Some(Self::table(table)),
            _ => None,
        }
    }
}

fn collect_columns(columns: Vec<(&'static str, Option<String>)>) -> Columns {
    columns
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

macro_rules! scalar_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Thing {
                fn from(value: $ty) -> Self {
                    Self::Scalar(value.to_string())
                }
            }
        )*
    };
}

scalar_from!(&str, String, i32, i64, u32, u64, f64);

/// Maps a [`Thing`] to a stable [`Identity`].
pub trait IdentityInspector: Send + Sync {
    /// Identify a thing.
    fn identify(&self, thing: &Thing) -> Result<Identity, IdentityError>;
}

/// The standard identity formats (see the module documentation).
///
/// NULL key columns are rejected with [`IdentityError::NullColumn`] instead of being
/// dropped, since dropping them would merge distinct rows into one identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIdentityInspector;

impl DefaultIdentityInspector {
    fn render(&self, thing: &Thing) -> Result<String, IdentityError> {
        match thing {
            Thing::Scalar(value) => Ok(value.clone()),
            Thing::Row { table, columns } => {
                if columns.is_empty() {
                    return Err(IdentityError::NoKeyColumns {
                        table: table.clone(),
                    });
                }
                render_columns(table, columns)
            }
            Thing::Collection { table, columns } => render_columns(table, columns),
            Thing::Class { table } => Ok(table.clone()),
            Thing::Tuple(items) => {
                let parts = items
                    .iter()
                    .map(|item| self.render(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parts.join(":"))
            }
            Thing::Dict(items) => {
                let parts = items
                    .iter()
                    .map(|(k, v)| Ok(format!("{}={}", k, self.render(v)?)))
                    .collect::<Result<Vec<_>, IdentityError>>()?;
                Ok(parts.join(":"))
            }
        }
    }
}

impl IdentityInspector for DefaultIdentityInspector {
    fn identify(&self, thing: &Thing) -> Result<Identity, IdentityError> {
        self.render(thing).map(Identity::new)
    }
}

fn render_columns(table: &str, columns: &Columns) -> Result<String, IdentityError> {
    let mut parts = Vec::with_capacity(columns.len() + 1);
    parts.push(table.to_string());

    for (column, value) in columns {
        match value {
            Some(value) => parts.push(format!("{}={}", column, value)),
            None => {
                return Err(IdentityError::NullColumn {
                    table: table.to_string(),
                    column: column.clone(),
                })
            }
        }
    }

    Ok(parts.join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct User {
        id: i64,
    }

    impl Entity for User {
        const TABLE: &'static str = "user";

        fn primary_key(&self) -> Vec<(&'static str, Option<String>)> {
            vec![("id", Some(self.id.to_string()))]
        }
    }

    struct UserNote {
        user_id: Option<i64>,
        id: i64,
    }

    impl Entity for UserNote {
        const TABLE: &'static str = "user_note";

        fn primary_key(&self) -> Vec<(&'static str, Option<String>)> {
            vec![
                ("user_id", self.user_id.map(|v| v.to_string())),
                ("id", Some(self.id.to_string())),
            ]
        }

        fn foreign_keys(&self) -> Vec<(&'static str, Option<String>)> {
            vec![("user_id", self.user_id.map(|v| v.to_string()))]
        }
    }

    fn identify(thing: &Thing) -> Result<String, IdentityError> {
        DefaultIdentityInspector
            .identify(thing)
            .map(|id| id.as_str().to_string())
    }

    #[test]
    fn test_scalars() {
        assert_eq!(identify(&"bob".into()).unwrap(), "bob");
        assert_eq!(identify(&42i64.into()).unwrap(), "42");
        assert_eq!(identify(&1.5f64.into()).unwrap(), "1.5");
    }

    #[test]
    fn test_row_and_class() {
        let user = User { id: 1 };
        assert_eq!(identify(&Thing::row_of(&user)).unwrap(), "user:id=1");
        assert_eq!(identify(&Thing::class::<User>()).unwrap(), "user");
    }

    #[test]
    fn test_composite_key_columns_are_sorted() {
        let note = UserNote {
            user_id: Some(123),
            id: 456,
        };
        assert_eq!(
            identify(&Thing::row_of(&note)).unwrap(),
            "user_note:id=456:user_id=123"
        );

        let by_hand = Thing::row("user_note", [("user_id", 123), ("id", 456)]);
        assert_eq!(identify(&by_hand).unwrap(), "user_note:id=456:user_id=123");
    }

    #[test]
    fn test_collection_uses_foreign_keys() {
        let note = UserNote {
            user_id: Some(123),
            id: 456,
        };
        assert_eq!(
            identify(&Thing::collection_of(&note)).unwrap(),
            "user_note:user_id=123"
        );

        // No foreign keys: the collection is the whole table.
        let user = User { id: 1 };
        assert_eq!(identify(&Thing::collection_of(&user)).unwrap(), "user");
    }

    #[test]
    fn test_null_column_is_rejected() {
        let note = UserNote {
            user_id: None,
            id: 456,
        };
        let err = identify(&Thing::collection_of(&note)).unwrap_err();
        assert_eq!(
            err,
            IdentityError::NullColumn {
                table: "user_note".into(),
                column: "user_id".into(),
            }
        );
        assert!(identify(&Thing::row_of(&note)).is_err());
    }

    #[test]
    fn test_row_without_columns_is_rejected() {
        let thing = Thing::Row {
            table: "user".into(),
            columns: Columns::new(),
        };
        assert_eq!(
            identify(&thing).unwrap_err(),
            IdentityError::NoKeyColumns {
                table: "user".into()
            }
        );
    }

    #[test]
    fn test_tuple_and_dict() {
        let tuple = Thing::tuple([Thing::table("user"), Thing::scalar(7)]);
        assert_eq!(identify(&tuple).unwrap(), "user:7");

        let dict = Thing::dict([("zeta", Thing::scalar(1)), ("alpha", Thing::scalar("x"))]);
        assert_eq!(identify(&dict).unwrap(), "alpha=x:zeta=1");
    }

    #[test]
    fn test_owning_class() {
        let user = User { id: 9 };
        assert_eq!(Thing::row_of(&user).owning_class(), Some(Thing::table("user")));
        assert!(Thing::row_of(&user).is_instance());
        assert_eq!(Thing::table("user").owning_class(), None);
        assert!(!Thing::table("user").is_instance());
    }
}
