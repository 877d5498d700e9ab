//! Master version commands.

use anyhow::{Context as _, Result};
use serde::Serialize;

use vercache_versioning::MasterState;

use crate::context::Context;
use crate::output::state_badge;

#[derive(Serialize)]
struct StatusReport {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    master: Option<u64>,
}

impl From<MasterState> for StatusReport {
    fn from(state: MasterState) -> Self {
        match state {
            MasterState::Enabled(v) => Self {
                state: "enabled",
                master: Some(v),
            },
            MasterState::Disabled => Self {
                state: "disabled",
                master: None,
            },
            MasterState::Missing => Self {
                state: "missing",
                master: None,
            },
        }
    }
}

fn print_report(ctx: &Context, report: &StatusReport) {
    if ctx.output.is_json() {
        ctx.output.json(report);
        return;
    }
    ctx.output.kv("caching", &state_badge(report.state));
    if let Some(master) = report.master {
        ctx.output.kv("master version", &master.to_string());
    }
}

/// Show the master version state.
pub async fn status(ctx: &Context) -> Result<()> {
    let versioner = ctx.versioner().await?;
    let state = versioner
        .status()
        .await
        .context("Failed to read master version")?;

    ctx.output.header("Version store");
    if !ctx.config.enabled {
        ctx.output
            .warn("Caching is switched off in the local configuration");
    }
    print_report(ctx, &state.into());
    Ok(())
}

/// Switch caching off store-wide.
pub async fn disable(ctx: &Context) -> Result<()> {
    let versioner = ctx.versioner().await?;
    versioner
        .disable()
        .await
        .context("Failed to disable caching")?;

    ctx.output.success("Caching disabled");
    print_report(ctx, &MasterState::Disabled.into());
    Ok(())
}

/// Switch caching back on.
pub async fn enable(ctx: &Context) -> Result<()> {
    let versioner = ctx.versioner().await?;
    let state = versioner.enable().await.context("Failed to enable caching")?;

    ctx.output.success("Caching enabled");
    print_report(ctx, &state.into());
    Ok(())
}

/// Install a fresh master version.
pub async fn invalidate_all(ctx: &Context) -> Result<()> {
    let versioner = ctx.versioner().await?;
    let version = versioner
        .invalidate_all()
        .await
        .context("Failed to install a new master version")?;

    ctx.output.success("Every cached entry is now unreachable");
    print_report(ctx, &MasterState::Enabled(version).into());
    Ok(())
}
