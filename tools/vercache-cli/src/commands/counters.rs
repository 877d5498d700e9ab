//! Identity counter commands.

use std::collections::BTreeMap;

use anyhow::{bail, Context as _, Result};

use vercache_core::{Identity, DEFAULT_VERSION};
use vercache_versioning::{CounterStore, KeyVersioner};

use super::{FlushArgs, GetArgs, IncrArgs};
use crate::context::Context;

/// Read raw counters.
///
/// Reads the counter store directly so that counters stay readable while caching is
/// disabled.
pub async fn get(args: GetArgs, ctx: &Context) -> Result<()> {
    let versioner = ctx.versioner().await?;
    let values = versioner
        .store()
        .mget(&args.identities)
        .await
        .context("Failed to read counters")?;

    let mut versions = BTreeMap::new();
    for (identity, value) in args.identities.iter().zip(values) {
        let version = match value {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("Counter of '{}' is not a version: {:?}", identity, raw))?,
            None => DEFAULT_VERSION,
        };
        versions.insert(identity.clone(), version);
    }

    if ctx.output.is_json() {
        ctx.output.json(&versions);
        return Ok(());
    }
    for identity in &args.identities {
        if let Some(version) = versions.get(identity) {
            ctx.output.kv(identity, &version.to_string());
        }
    }
    Ok(())
}

/// Increment one counter.
pub async fn incr(args: IncrArgs, ctx: &Context) -> Result<()> {
    let versioner = ctx.versioner().await?;
    let identity = Identity::new(args.identity);
    versioner
        .incr(&identity)
        .await
        .with_context(|| format!("Failed to increment '{}'", identity))?;

    let raw = versioner
        .store()
        .mget(&[identity.as_str().to_string()])
        .await
        .context("Failed to read counter back")?;
    let version = raw
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(|| DEFAULT_VERSION.to_string());

    if ctx.output.is_json() {
        ctx.output
            .json(&serde_json::json!({ "identity": identity.as_str(), "version": version }));
        return Ok(());
    }
    ctx.output
        .success(&format!("{} is now at version {}", identity, version));
    Ok(())
}

/// Reset every counter, including the master version.
pub async fn flush(args: FlushArgs, ctx: &Context) -> Result<()> {
    if !args.yes {
        bail!("Refusing to flush the version store without --yes");
    }
    let versioner = ctx.versioner().await?;
    versioner
        .flush_all()
        .await
        .context("Failed to flush the version store")?;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({ "flushed": true }));
        return Ok(());
    }
    ctx.output
        .success("Version store flushed; a fresh master version is installed on next use");
    Ok(())
}
