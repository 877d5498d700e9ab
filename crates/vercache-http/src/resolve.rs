//! Dependency resolution from request context.

use std::collections::BTreeMap;

use thiserror::Error;

use vercache_core::{Columns, Entity, RequestContext, Thing};

/// Failure to resolve a dependency from a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("route parameter '{0}' is missing")]
    MissingRouteParam(String),
}

/// Produces one dependency of a view from the request.
pub trait DependencyResolver: Send + Sync {
    /// Resolve the dependency.
    fn resolve(&self, ctx: &RequestContext) -> Result<Thing, ResolveError>;
}

/// A single row whose key columns come from route parameters.
///
/// ```
/// use vercache_core::{Entity, Method, RequestContext};
/// use vercache_http::{DependencyResolver, RouteDependency};
///
/// struct User;
///
/// impl Entity for User {
///     const TABLE: &'static str = "user";
///     fn primary_key(&self) -> Vec<(&'static str, Option<String>)> {
///         Vec::new()
///     }
/// }
///
/// let dep = RouteDependency::of::<User>([("user_id", "id")]);
/// let ctx = RequestContext::new(Method::Get, "/users/7").with_param("user_id", "7");
/// assert!(dep.resolve(&ctx).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct RouteDependency {
    table: String,
    mapping: Vec<(String, String)>,
}

impl RouteDependency {
    /// Map route parameters to key columns of `E`, as `(param, column)` pairs.
    pub fn of<E: Entity>(mapping: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        Self::for_table(E::TABLE, mapping)
    }

    /// Map route parameters to key columns of a table.
    pub fn for_table(
        table: impl Into<String>,
        mapping: impl IntoIterator<Item = (&'static str, &'static str)>,
    ) -> Self {
        Self {
            table: table.into(),
            mapping: mapping
                .into_iter()
                .map(|(param, column)| (param.to_string(), column.to_string()))
                .collect(),
        }
    }
}

impl DependencyResolver for RouteDependency {
    fn resolve(&self, ctx: &RequestContext) -> Result<Thing, ResolveError> {
        let mut columns = Columns::new();
        for (param, column) in &self.mapping {
            let value = ctx
                .param(param)
                .ok_or_else(|| ResolveError::MissingRouteParam(param.clone()))?;
            columns.insert(column.clone(), Some(value.to_string()));
        }
        Ok(Thing::Row {
            table: self.table.clone(),
            columns,
        })
    }
}

/// A whole table, for listing views.
#[derive(Debug, Clone)]
pub struct ModelDependency {
    table: String,
}

impl ModelDependency {
    /// Depend on every row of `E`.
    pub fn of<E: Entity>() -> Self {
        Self {
            table: E::TABLE.to_string(),
        }
    }
}

impl DependencyResolver for ModelDependency {
    fn resolve(&self, _ctx: &RequestContext) -> Result<Thing, ResolveError> {
        Ok(Thing::table(&self.table))
    }
}

/// A route parameter taken as a plain value.
#[derive(Debug, Clone)]
pub struct ParamDependency {
    name: String,
}

impl ParamDependency {
    /// Depend on the value of route parameter `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl DependencyResolver for ParamDependency {
    fn resolve(&self, ctx: &RequestContext) -> Result<Thing, ResolveError> {
        ctx.param(&self.name)
            .map(Thing::scalar)
            .ok_or_else(|| ResolveError::MissingRouteParam(self.name.clone()))
    }
}

/// Identity of the resource tree root.
pub const ROOT_RESOURCE: &str = "__root__";

/// One location in a resource tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Path segment naming the resource.
    pub name: String,
    /// Whether the resource contains other resources (a collection).
    pub composite: bool,
}

impl Resource {
    /// A resource containing items.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            composite: true,
        }
    }

    /// A leaf resource.
    pub fn item(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            composite: false,
        }
    }
}

/// The dependency of the last resource in `lineage`, listed from below the root.
///
/// | Lineage | Identity |
/// |---|---|
/// | (root) | `__root__` |
/// | `users` | `users` |
/// | `users`, `1` | `users=1` |
/// | `users`, `1`, `notes` | `notes:users=1` |
///
/// A collection depends on its own name; every item of an enclosing collection adds a
/// `collection=item` entry.
pub fn resource_thing(lineage: &[Resource]) -> Thing {
    let Some(context) = lineage.last() else {
        return Thing::tuple([Thing::scalar(ROOT_RESOURCE)]);
    };

    let mut deps = Vec::with_capacity(2);
    if context.composite {
        deps.push(Thing::scalar(&context.name));
    }
    let enclosing: BTreeMap<String, Thing> = lineage
        .windows(2)
        .filter(|pair| pair[0].composite)
        .map(|pair| (pair[0].name.clone(), Thing::scalar(&pair[1].name)))
        .collect();
    if !enclosing.is_empty() {
        deps.push(Thing::Dict(enclosing));
    }
    Thing::Tuple(deps)
}

/// The resource addressed by the request path, read as alternating collections and
/// items (`/users/1/notes/2`).
#[derive(Debug, Clone, Default)]
pub struct ResourceDependency {
    mount: String,
}

impl ResourceDependency {
    /// Resolve paths from the server root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve paths below `prefix`, e.g. `/api`.
    pub fn mounted_at(prefix: impl Into<String>) -> Self {
        Self {
            mount: prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// The lineage of the resource at `path`.
    pub fn lineage(&self, path: &str) -> Vec<Resource> {
        let path = match path.strip_prefix(self.mount.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path,
        };
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .enumerate()
            .map(|(depth, segment)| {
                if depth % 2 == 0 {
                    Resource::collection(segment)
                } else {
                    Resource::item(segment)
                }
            })
            .collect()
    }
}

impl DependencyResolver for ResourceDependency {
    fn resolve(&self, ctx: &RequestContext) -> Result<Thing, ResolveError> {
        Ok(resource_thing(&self.lineage(&ctx.path)))
    }
}
