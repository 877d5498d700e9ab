//! Cached views.

use async_trait::async_trait;
use http::Response;
use tracing::warn;

use vercache_cache::{CacheManager, CacheStatus};
use vercache_core::{CachingConfig, KeyPart, RequestContext, Thing};

use crate::headers::CacheHeaders;
use crate::modifier::KeyModifier;
use crate::resolve::{DependencyResolver, ResolveError};

/// A request handler producing a response.
#[async_trait]
pub trait View: Send + Sync {
    /// Static name of the view; the first base of its cache keys.
    fn name(&self) -> &str;

    /// Render a response.
    async fn render(&self, ctx: &RequestContext) -> Response<String>;
}

/// Wraps a view, caching its responses under version-stamped keys.
///
/// Every response is tagged with `X-View-Cache`; hits and misses also carry an `ETag`.
/// A cache failure never changes the response body: the wrapped view renders uncached
/// and the response is tagged `ERROR` (or `DISABLED` when caching is switched off).
/// A rendered response that could not be stored is tagged `ERROR` as well.
pub struct CachedView<V> {
    view: V,
    manager: CacheManager<Response<String>>,
    modifiers: Vec<Box<dyn KeyModifier>>,
    resolvers: Vec<Box<dyn DependencyResolver>>,
    enabled: bool,
}

impl<V: View> CachedView<V> {
    /// Wrap a view.
    pub fn new(view: V, manager: CacheManager<Response<String>>) -> Self {
        Self {
            view,
            manager,
            modifiers: Vec::new(),
            resolvers: Vec::new(),
            enabled: true,
        }
    }

    /// Add a key base derived from the request.
    pub fn varies_on(mut self, modifier: impl KeyModifier + 'static) -> Self {
        self.modifiers.push(Box::new(modifier));
        self
    }

    /// Add a dependency resolved from the request.
    pub fn depends_on(mut self, resolver: impl DependencyResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Switch caching on or off for this view.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Follow the global caching switch.
    pub fn with_config(self, config: &CachingConfig) -> Self {
        self.enabled(config.enabled)
    }

    /// The wrapped view.
    pub fn inner(&self) -> &V {
        &self.view
    }

    fn bases(&self, ctx: &RequestContext) -> Vec<KeyPart> {
        let mut bases = Vec::with_capacity(self.modifiers.len() + 1);
        bases.push(KeyPart::from(self.view.name()));
        bases.extend(self.modifiers.iter().map(|m| m.modify(ctx)));
        bases
    }

    fn dependencies(&self, ctx: &RequestContext) -> Result<Vec<Thing>, ResolveError> {
        self.resolvers.iter().map(|r| r.resolve(ctx)).collect()
    }

    async fn render_uncached(&self, ctx: &RequestContext, status: CacheStatus) -> Response<String> {
        let mut response = self.view.render(ctx).await;
        CacheHeaders::new(status).apply(&mut response);
        response
    }
}

#[async_trait]
impl<V: View> View for CachedView<V> {
    fn name(&self) -> &str {
        self.view.name()
    }

    async fn render(&self, ctx: &RequestContext) -> Response<String> {
        if !self.enabled {
            return self.render_uncached(ctx, CacheStatus::Disabled).await;
        }

        let dependencies = match self.dependencies(ctx) {
            Ok(deps) => deps,
            Err(e) => {
                warn!(view = self.view.name(), error = %e, "cannot resolve dependencies, rendering uncached");
                return self.render_uncached(ctx, CacheStatus::Error).await;
            }
        };
        let bases = self.bases(ctx);

        let lookup = self
            .manager
            .get_or_cache_for(
                Some(&ctx.request_id),
                || self.view.render(ctx),
                &bases,
                &dependencies,
            )
            .await;

        match lookup {
            Ok(result) => {
                let headers = match result.error() {
                    Some(e) => {
                        warn!(view = self.view.name(), error = %e, "response not cached");
                        CacheHeaders::new(CacheStatus::Error)
                    }
                    None => CacheHeaders::new(result.status()).with_etag(result.key_hash()),
                };
                let mut response = result.into_data();
                headers.apply(&mut response);
                response
            }
            Err(e) if e.is_disabled() => self.render_uncached(ctx, CacheStatus::Disabled).await,
            Err(e) => {
                warn!(view = self.view.name(), error = %e, "cache unavailable, rendering uncached");
                self.render_uncached(ctx, CacheStatus::Error).await
            }
        }
    }
}
