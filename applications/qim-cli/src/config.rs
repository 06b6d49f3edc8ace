//! CLI configuration
use crate::error::{CliError, Result};
use qim_core::resolver::DEFAULT_AYAH_TEMPLATE;
use qim_core::TemplateAudioResolver;
use qim_playback::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub playback: EngineConfig,

    #[serde(default = "default_resolver")]
    pub resolver: ResolverSettings,

    #[serde(default = "default_simulation")]
    pub simulation: SimulationSettings,

    #[serde(default = "default_preferences")]
    pub preferences: PreferencesSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverSettings {
    /// URL template with `{edition}` and `{reference}` placeholders
    #[serde(default = "default_template")]
    pub template: String,

    #[serde(default = "default_edition")]
    pub edition: String,

    /// Simulated lookup latency per item
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// How long each simulated item plays
    #[serde(default = "default_item_ms")]
    pub item_ms: u64,

    /// Delay between a play request and start (or failure)
    #[serde(default = "default_load_ms")]
    pub load_ms: u64,

    /// Give up waiting for completion after this long
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreferencesSettings {
    /// Persisted preference document; applied on top of `playback` when set
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            playback: EngineConfig::default(),
            resolver: default_resolver(),
            simulation: default_simulation(),
            preferences: default_preferences(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// Reads `path` when given (it must exist), otherwise `qim.toml` in the
    /// working directory if present. `QIM_*` variables override both, with
    /// `__` between section and key: `QIM_PLAYBACK__MAX_RETRIES=3`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("qim.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("QIM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let playback = &self.playback;
        if !(0.0..=1.0).contains(&playback.volume) {
            return Err(CliError::Config(format!(
                "Volume must be within 0.0-1.0, got {}",
                playback.volume
            )));
        }

        if !(playback.playback_rate.is_finite() && playback.playback_rate > 0.0) {
            return Err(CliError::Config(format!(
                "Playback rate must be positive, got {}",
                playback.playback_rate
            )));
        }

        if playback.max_retries > 10 {
            return Err(CliError::Config(format!(
                "At most 10 retries are supported, got {}",
                playback.max_retries
            )));
        }

        if self.simulation.item_ms == 0 {
            return Err(CliError::Config(
                "Simulated item duration must be non-zero".to_string(),
            ));
        }

        // Surfaces a missing {reference} placeholder
        self.audio_resolver()?;

        Ok(())
    }

    /// Resolver built from `[resolver]`
    pub fn audio_resolver(&self) -> Result<TemplateAudioResolver> {
        Ok(TemplateAudioResolver::new(self.resolver.template.clone())?)
    }
}

// Default values
fn default_resolver() -> ResolverSettings {
    ResolverSettings {
        template: default_template(),
        edition: default_edition(),
        latency_ms: default_latency_ms(),
    }
}

fn default_template() -> String {
    DEFAULT_AYAH_TEMPLATE.to_string()
}

fn default_edition() -> String {
    "ar.alafasy".to_string()
}

fn default_latency_ms() -> u64 {
    300
}

fn default_simulation() -> SimulationSettings {
    SimulationSettings {
        item_ms: default_item_ms(),
        load_ms: default_load_ms(),
        max_ms: default_max_ms(),
    }
}

fn default_item_ms() -> u64 {
    2_000
}

fn default_load_ms() -> u64 {
    50
}

fn default_max_ms() -> u64 {
    120_000
}

fn default_preferences() -> PreferencesSettings {
    PreferencesSettings { file: None }
}
