//! # State File Persistence
//!
//! The registry lives in one JSON file between invocations. Every
//! mutating command loads it, applies one operation, and rewrites the
//! whole file, so the on-disk form is always a complete serialization
//! of the aggregate.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use jur_registry::Jurisdiction;

pub fn load(path: &Path) -> Result<Jurisdiction> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading registry state {}", path.display()))?;
    let registry = serde_json::from_str(&data)
        .with_context(|| format!("parsing registry state {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded registry state");
    Ok(registry)
}

pub fn save(path: &Path, registry: &Jurisdiction) -> Result<()> {
    let mut data =
        serde_json::to_string_pretty(registry).context("serializing registry state")?;
    data.push('\n');
    fs::write(path, data).with_context(|| format!("writing registry state {}", path.display()))?;
    tracing::debug!(path = %path.display(), "saved registry state");
    Ok(())
}

/// Like [`save`], but refuses to clobber an existing file.
pub fn create(path: &Path, registry: &Jurisdiction) -> Result<()> {
    if path.exists() {
        bail!("state file {} already exists", path.display());
    }
    save(path, registry)
}
