//! Scenario file model for the demo driver.
//!
//! A scenario declares the signals the driver may toggle, the rule entries
//! to register, and optional engine configuration overrides. It stands in
//! for the host-side songpack loader at the engine's interface boundary.

use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use leitmotif_lib::config::EngineConfig;
use leitmotif_lib::rules::entry::EntrySpec;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Engine configuration; omitted fields fall back to defaults.
    pub config: EngineConfig,
    /// Signals available to `set` commands.
    pub signals: Vec<String>,
    /// Signals that start out true.
    pub initial_signals: Vec<String>,
    /// Rule entries, in priority order.
    pub entries: Vec<EntrySpec>,
    /// Initial location label.
    pub location: String,
    /// Initial region label.
    pub region: String,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            signals: Vec::new(),
            initial_signals: Vec::new(),
            entries: Vec::new(),
            location: String::new(),
            region: String::new(),
        }
    }
}

pub fn load(path: &Path) -> Result<Scenario, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let scenario: Scenario = serde_json::from_str(&contents)?;
    Ok(scenario)
}
