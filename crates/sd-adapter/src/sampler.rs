use tracing::{debug, warn};

use crate::{DiffusionBackend, GenerationError, Result};

/// Sampler asked for when the caller does not name one.
pub const DEFAULT_SAMPLER: &str = "DPM++ 2M Karras";

/// Sampler used when the requested one is not loaded by the WebUI.
pub const FALLBACK_SAMPLER: &str = "Euler a";

/// The sampler a generation will run with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerChoice {
    pub name: String,
    /// True when `name` is the fallback rather than what was requested.
    pub substituted: bool,
}

/// Picks a sampler the WebUI currently offers.
///
/// The sampler list is fetched on every call. A requested sampler that is not in the list is
/// replaced by [`FALLBACK_SAMPLER`]; failing to fetch the list is an error.
pub async fn resolve_sampler(
    backend: &dyn DiffusionBackend,
    requested: Option<&str>,
) -> Result<SamplerChoice> {
    let requested = requested.unwrap_or(DEFAULT_SAMPLER);
    let samplers = backend
        .samplers()
        .await
        .map_err(|e| GenerationError::BackendUnavailable(format!("Failed to fetch samplers: {e}")))?;

    debug!(
        samplers = ?samplers.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        "available samplers"
    );

    if samplers.iter().any(|s| s.name == requested) {
        return Ok(SamplerChoice {
            name: requested.to_owned(),
            substituted: false,
        });
    }

    warn!(
        requested,
        fallback = FALLBACK_SAMPLER,
        "sampler not found, using fallback"
    );
    Ok(SamplerChoice {
        name: FALLBACK_SAMPLER.to_owned(),
        substituted: true,
    })
}
