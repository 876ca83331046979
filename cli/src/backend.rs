//! Builds the configured lookup backend.

use anyhow::{Context, Result};
use canopy_config::{BackendKind, LookupConfig};
use canopy_lookup::{HttpLookup, LookupBackend, ScriptedLookup, SimulatedLookup};

pub fn build(config: &LookupConfig) -> Result<LookupBackend> {
    let backend = match config.backend {
        BackendKind::Simulated => LookupBackend::Simulated(
            SimulatedLookup::new()
                .with_latency(config.latency())
                .with_branching(config.min_branching..config.max_branching)
                .with_leaf_kinds(config.leaf_types.iter().cloned()),
        ),
        BackendKind::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .context("lookup.base_url is not set")?;
            LookupBackend::Http(HttpLookup::new(base_url).context("failed to build HTTP client")?)
        }
        BackendKind::Fixture => {
            let path = config
                .fixture
                .as_deref()
                .context("lookup.fixture is not set")?;
            LookupBackend::Fixture(ScriptedLookup::from_json_file(path)?)
        }
    };
    tracing::debug!(backend = ?config.backend, "Lookup backend ready");
    Ok(backend)
}
