//! Turns command-line input into library configuration.

use std::path::Path;

use rate_scout::{ExtractionProfile, RoomType, RoomTypeFilter, ScanConfig};

use crate::cli::TimingArgs;
use crate::error::CliError;

/// Library defaults with any timing flags applied on top.
pub fn scan_config(timing: &TimingArgs) -> ScanConfig {
    let mut config = ScanConfig::default();
    if let Some(ms) = timing.timeout_ms {
        config.navigation_timeout_ms = ms;
    }
    if let Some(n) = timing.max_attempts {
        config.max_attempts = n;
    }
    if let Some(ms) = timing.retry_delay_ms {
        config.retry_delay_ms = ms;
    }
    if let Some(ms) = timing.date_delay_ms {
        config.date_delay_ms = ms;
    }
    if let Some(ms) = timing.settle_ms {
        config.settle_delay_ms = ms;
    }
    config
}

/// Parse the room-type filter argument, a JSON array of type names.
///
/// Unknown names are rejected. `unavailable` and `error` are accepted and
/// ignored, as they are never extracted.
pub fn room_type_filter(raw: Option<&str>) -> Result<RoomTypeFilter, CliError> {
    let Some(raw) = raw else {
        return Ok(RoomTypeFilter::default());
    };
    let names: Vec<String> = serde_json::from_str(raw)
        .map_err(|e| CliError::Usage(format!("room types must be a JSON array of strings: {e}")))?;
    let types = names
        .iter()
        .map(|name| name.parse::<RoomType>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(CliError::Usage)?;
    Ok(RoomTypeFilter::new(types))
}

pub fn load_profile(path: Option<&Path>) -> Result<ExtractionProfile, CliError> {
    match path {
        None => Ok(ExtractionProfile::booking()),
        Some(path) => ExtractionProfile::from_path(path).map_err(|e| {
            CliError::Usage(format!("cannot load profile {}: {e}", path.display()))
        }),
    }
}
