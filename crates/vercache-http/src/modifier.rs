//! Request-dependent key bases.

use std::collections::BTreeMap;

use vercache_core::{KeyPart, RequestContext};

/// Derives an extra key base from a request.
pub trait KeyModifier: Send + Sync {
    /// The key part for this request.
    fn modify(&self, ctx: &RequestContext) -> KeyPart;
}

/// Varies the key on query string parameters.
#[derive(Debug, Clone, Default)]
pub struct QueryStringModifier {
    params: Option<Vec<String>>,
}

impl QueryStringModifier {
    /// Vary on every query parameter.
    pub fn all() -> Self {
        Self { params: None }
    }

    /// Vary on the listed parameters only.
    pub fn only<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: Some(params.into_iter().map(Into::into).collect()),
        }
    }
}

impl KeyModifier for QueryStringModifier {
    fn modify(&self, ctx: &RequestContext) -> KeyPart {
        let selected: BTreeMap<String, Vec<String>> = match &self.params {
            None => ctx.query.clone(),
            Some(params) => params
                .iter()
                .filter_map(|name| {
                    ctx.query
                        .get(name)
                        .map(|values| (name.clone(), values.clone()))
                })
                .collect(),
        };
        KeyPart::Map(selected)
    }
}
