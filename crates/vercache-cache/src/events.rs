//! Hit and miss events.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use vercache_core::RequestId;

/// Outcome of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheEventKind {
    Hit,
    Miss,
}

impl std::fmt::Display for CacheEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "hit"),
            Self::Miss => write!(f, "miss"),
        }
    }
}

/// A lookup event, tagged with the key root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    /// Hit or miss.
    pub kind: CacheEventKind,
    /// Root of the cache key (no version information).
    pub root: String,
    /// Request the lookup ran for.
    pub request_id: Option<RequestId>,
}

impl CacheEvent {
    /// Create an event without request context.
    pub fn new(kind: CacheEventKind, root: impl Into<String>) -> Self {
        Self {
            kind,
            root: root.into(),
            request_id: None,
        }
    }

    /// Attach the request ID.
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Whether this is a hit.
    pub fn is_hit(&self) -> bool {
        self.kind == CacheEventKind::Hit
    }
}

/// Receives cache events.
///
/// Sinks run inline on the request path and must not block.
pub trait EventSink: Send + Sync {
    /// Handle one event.
    fn emit(&self, event: &CacheEvent);
}

/// Sink calling a closure.
pub struct FnSink<F>(F);

impl<F> FnSink<F>
where
    F: Fn(&CacheEvent) + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventSink for FnSink<F>
where
    F: Fn(&CacheEvent) + Send + Sync,
{
    fn emit(&self, event: &CacheEvent) {
        (self.0)(event)
    }
}

/// Sink forwarding events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<CacheEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CacheEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &CacheEvent) {
        if self.tx.send(event.clone()).is_err() {
            debug!(root = %event.root, "event receiver dropped");
        }
    }
}
