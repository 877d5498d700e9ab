//! Change notification from the persistence layer.
//!
//! A [`ChangeTracker`] collects the entities written during one unit of work and
//! increments the affected versions once the commit succeeded. Rolled back work
//! increments nothing.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use vercache_core::{Entity, Identity, IdentityError, IdentityInspector, Thing, VersionError};

use crate::versioner::Versioner;

/// Outcome of incrementing versions after a commit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IncrementReport {
    /// Identities whose version was incremented.
    pub incremented: Vec<Identity>,
    /// Identities whose increment failed.
    pub failed: Vec<(Identity, VersionError)>,
    /// Changed things that could not be identified, so nothing was incremented for them.
    pub unidentified: Vec<IdentityError>,
}

impl IncrementReport {
    /// Whether every change was identified and incremented.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.unidentified.is_empty()
    }
}

/// Collects the identities touched by one unit of work.
///
/// | Change | Identities |
/// |---|---|
/// | created | table, foreign-key collection |
/// | updated | row, table, foreign-key collection |
/// | deleted | row, table, foreign-key collection |
///
/// Each identity is incremented once, however many times it was touched.
///
/// A row whose primary key holds NULL has no identity. Its table is still incremented,
/// and the [`IdentityError`] is kept and returned in [`IncrementReport::unidentified`].
/// A collection whose foreign key holds NULL falls back to its table.
pub struct ChangeTracker {
    inspector: Arc<dyn IdentityInspector>,
    pending: BTreeSet<Identity>,
    unidentified: Vec<IdentityError>,
}

impl ChangeTracker {
    /// Create an empty tracker.
    pub fn new(inspector: Arc<dyn IdentityInspector>) -> Self {
        Self {
            inspector,
            pending: BTreeSet::new(),
            unidentified: Vec::new(),
        }
    }

    /// Record a newly inserted entity.
    pub fn created<E: Entity>(&mut self, entity: &E) {
        self.touch_class::<E>();
        self.touch_collection(entity);
    }

    /// Record a modified entity.
    pub fn updated<E: Entity>(&mut self, entity: &E) {
        self.touch_row(entity);
        self.touch_class::<E>();
        self.touch_collection(entity);
    }

    /// Record a removed entity.
    pub fn deleted<E: Entity>(&mut self, entity: &E) {
        self.updated(entity);
    }

    /// Record an arbitrary thing.
    pub fn touch(&mut self, thing: &Thing) {
        match self.inspector.identify(thing) {
            Ok(identity) => {
                self.pending.insert(identity);
            }
            Err(e) => {
                warn!(error = %e, "cannot identify changed thing");
                self.unidentified.push(e);
            }
        }
    }

    /// Changes recorded so far that could not be identified.
    pub fn unidentified(&self) -> &[IdentityError] {
        &self.unidentified
    }

    /// Identities that will be incremented on commit.
    pub fn pending(&self) -> impl Iterator<Item = &Identity> {
        self.pending.iter()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run `commit`, then increment every recorded identity if it succeeded.
    ///
    /// A failed commit increments nothing and returns its error.
    pub async fn commit_with<F, Fut, T, E>(
        self,
        versioner: &Versioner,
        commit: F,
    ) -> Result<(T, IncrementReport), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match commit().await {
            Ok(value) => {
                let report = self.after_commit(versioner).await;
                Ok((value, report))
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    /// Increment every recorded identity. Call only once the commit is durable.
    ///
    /// Failures are logged and reported; the commit itself stands.
    pub async fn after_commit(self, versioner: &Versioner) -> IncrementReport {
        let mut report = IncrementReport {
            unidentified: self.unidentified,
            ..Default::default()
        };
        for identity in self.pending {
            match versioner.incr_identity(&identity).await {
                Ok(()) => report.incremented.push(identity),
                Err(e) => {
                    warn!(identity = %identity, error = %e, "failed to increment version after commit");
                    report.failed.push((identity, e));
                }
            }
        }
        report
    }

    /// Discard every recorded change.
    pub fn rollback(self) {
        debug!(discarded = self.pending.len(), "unit of work rolled back");
    }

    fn touch_row<E: Entity>(&mut self, entity: &E) {
        match self.inspector.identify(&Thing::row_of(entity)) {
            Ok(identity) => {
                self.pending.insert(identity);
            }
            Err(e) => {
                warn!(table = E::TABLE, error = %e, "cannot identify changed row");
                self.unidentified.push(e);
            }
        }
    }

    fn touch_class<E: Entity>(&mut self) {
        self.touch(&Thing::class::<E>());
    }

    fn touch_collection<E: Entity>(&mut self, entity: &E) {
        match self.inspector.identify(&Thing::collection_of(entity)) {
            Ok(identity) => {
                self.pending.insert(identity);
            }
            Err(e) => {
                // The table identity covers the collection.
                warn!(table = E::TABLE, error = %e, "cannot identify collection, invalidating table");
                self.touch_class::<E>();
            }
        }
    }
}

impl std::fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
