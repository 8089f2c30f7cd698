//! Agent config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use vitals_core::error::{Result, VitalsError};

pub use schema::{AgentConfig, AgentSection, CollectorToggle, CollectorsSection, OutputSection};

pub fn load_from_file(path: &str) -> Result<AgentConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| VitalsError::BadConfig(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

/// Like [`load_from_file`], but a missing file yields the built-in defaults.
pub fn load_or_default(path: &str) -> Result<AgentConfig> {
    match fs::read_to_string(path) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(%path, "config file not found, using defaults");
            let cfg = AgentConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
        Err(e) => Err(VitalsError::BadConfig(format!("read {path} failed: {e}"))),
    }
}

pub fn load_from_str(s: &str) -> Result<AgentConfig> {
    let cfg: AgentConfig = serde_yaml::from_str(s)
        .map_err(|e| VitalsError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
