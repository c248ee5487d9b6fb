use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for placement, collaboration feedback and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Snap dropped nodes to the grid.
    pub grid_snap: bool,
    pub grid_unit: f64,
    /// Content rectangle of every scope-level section.
    pub section_width: f64,
    pub section_height: f64,
    /// How long a remote-change highlight stays visible, in milliseconds.
    pub highlight_duration_ms: u64,
    /// Quiet period after the last local change before a save runs, in milliseconds.
    pub save_quiet_period_ms: u64,
    /// User id of the local participant; inbound echoes of its own messages are dropped.
    pub local_actor: String,
    pub local_username: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_snap: false,
            grid_unit: 50.0,
            section_width: 4000.0,
            section_height: 4000.0,
            highlight_duration_ms: 2000,
            save_quiet_period_ms: 1000,
            local_actor: "local".to_string(),
            local_username: "local".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Loads a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_duration_ms)
    }

    pub fn save_quiet_period(&self) -> Duration {
        Duration::from_millis(self.save_quiet_period_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid_unit > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "gridUnit",
                message: format!("must be positive, got {}", self.grid_unit),
            });
        }
        if !(self.section_width > 0.0 && self.section_height > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "sectionWidth/sectionHeight",
                message: "section dimensions must be positive".to_string(),
            });
        }
        Ok(())
    }
}

pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }
    pub fn grid_snap(mut self, enabled: bool) -> Self {
        self.config.grid_snap = enabled;
        self
    }
    pub fn grid_unit(mut self, unit: f64) -> Self {
        if unit > 0.0 {
            self.config.grid_unit = unit;
        }
        self
    }
    pub fn section_size(mut self, width: f64, height: f64) -> Self {
        self.config.section_width = width;
        self.config.section_height = height;
        self
    }
    pub fn highlight_duration(mut self, duration: Duration) -> Self {
        self.config.highlight_duration_ms = duration.as_millis() as u64;
        self
    }
    pub fn save_quiet_period(mut self, duration: Duration) -> Self {
        self.config.save_quiet_period_ms = duration.as_millis() as u64;
        self
    }
    pub fn local_actor(mut self, user_id: &str, username: &str) -> Self {
        self.config.local_actor = user_id.to_string();
        self.config.local_username = username.to_string();
        self
    }
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
