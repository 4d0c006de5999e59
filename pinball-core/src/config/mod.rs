//! YAML machine configuration.
//!
//! Parses the declarative part of a machine's setup (tick rate, switches,
//! accelerometers) before the core boots. Typos in the document surface
//! immediately as [`CoreError::Config`] (`deny_unknown_fields`); whether the
//! resulting configuration makes physical sense (matching driver numbers,
//! wiring) is explicitly not this crate's job.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::accelerometer::AccelerometerConfig;
use crate::error::{CoreError, Result};
use crate::switches::SwitchType;

/// One declared switch's static configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchConfig {
    pub name: String,
    pub number: String,
    #[serde(rename = "type")]
    pub switch_type: SwitchTypeConfig,
    #[serde(default)]
    pub tags: Vec<String>,
    /// The raw hardware reading to assume at `initialize_hw_states` time,
    /// before any real hardware report has arrived.
    #[serde(default)]
    pub initial_raw_state: u8,
}

/// The YAML spelling of [`SwitchType`].
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchTypeConfig {
    Nc,
    No,
}

impl From<SwitchTypeConfig> for SwitchType {
    fn from(value: SwitchTypeConfig) -> Self {
        match value {
            SwitchTypeConfig::Nc => SwitchType::NormallyClosed,
            SwitchTypeConfig::No => SwitchType::NormallyOpen,
        }
    }
}

/// The root of a machine's YAML configuration document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineConfig {
    pub hz: u32,
    #[serde(default)]
    pub switches: Vec<SwitchConfig>,
    #[serde(default)]
    pub accelerometers: HashMap<String, AccelerometerConfig>,
}

impl MachineConfig {
    /// Parses a YAML document from a string.
    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Reads and parses a YAML document from `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Misconfigured(format!("cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_yaml(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
hz: 50
switches:
  - name: left_flipper
    number: "12"
    type: no
    tags: [left_flipper]
  - name: plumb_tilt
    number: "13"
    type: nc
accelerometers:
  plumb_bob:
    level_ref: [0.0, 0.0, 1.0]
    alpha: 0.9
    hit_limits:
      - threshold: 0.5
        event: tilt_warning
    level_limits:
      - threshold: 30.0
        event: tilted
"#;

    #[test]
    fn parses_switches_and_accelerometers() {
        let config = MachineConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.hz, 50);
        assert_eq!(config.switches.len(), 2);
        assert_eq!(config.switches[0].tags, vec!["left_flipper".to_string()]);
        let accel = &config.accelerometers["plumb_bob"];
        assert!((accel.alpha - 0.9).abs() < f64::EPSILON);
        assert_eq!(accel.hit_limits[0].event, "tilt_warning");
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let bad = format!("{SAMPLE}\nunknown_field: true\n");
        assert!(MachineConfig::from_yaml(&bad).is_err());
    }

    #[test]
    fn from_file_reads_and_parses_a_real_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, SAMPLE.as_bytes()).unwrap();
        let config = MachineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.hz, 50);
    }

    #[test]
    fn from_file_reports_missing_path() {
        assert!(MachineConfig::from_file("/nonexistent/pinball.yaml").is_err());
    }
}
