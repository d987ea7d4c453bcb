use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_CONFIG_PATH: &str = "SPOTCRAFT_CONFIG_PATH";
const ENV_COMPOSITION_MAX: &str = "SPOTCRAFT_COMPOSITION_MAX_CHARS";
const ENV_MAX_GENERATION: &str = "SPOTCRAFT_MAX_GENERATION_SECONDS";
const ENV_DURATION_TOLERANCE: &str = "SPOTCRAFT_DURATION_TOLERANCE_SECONDS";

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub limits: ProviderLimits,
    pub tolerances: Tolerances,
}

#[derive(Debug, Clone)]
pub struct ProviderLimits {
    pub title_max_chars: usize,
    pub composition_max_chars: usize,
    pub alt_composition_max_chars: usize,
    pub simple_prompt_max_chars: usize,
    pub max_generation_seconds: f32,
}

impl Default for ProviderLimits {
    fn default() -> Self {
        Self {
            title_max_chars: 80,
            composition_max_chars: 2000,
            alt_composition_max_chars: 1000,
            simple_prompt_max_chars: 500,
            max_generation_seconds: 30.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tolerances {
    pub duration_sum_seconds: f32,
    pub alignment_bars: f32,
    pub music_solo_max_seconds: f32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { duration_sum_seconds: 1.0, alignment_bars: 0.5, music_solo_max_seconds: 5.0 }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = config_file_override()? {
            if path.exists() {
                let partial = read_partial(&path)?;
                config.apply_partial(partial);
            }
        } else {
            let path = Self::default_config_path()?;
            if path.exists() {
                let partial = read_partial(&path)?;
                config.apply_partial(partial);
            }
        }

        config.apply_env()?;
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "Spotcraft", "Spotcraft")
            .ok_or_else(|| anyhow!("unable to determine config directory"))?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(value) = partial.limits.title_max_chars {
            self.limits.title_max_chars = value;
        }
        if let Some(value) = partial.limits.composition_max_chars {
            self.limits.composition_max_chars = value;
        }
        if let Some(value) = partial.limits.alt_composition_max_chars {
            self.limits.alt_composition_max_chars = value;
        }
        if let Some(value) = partial.limits.simple_prompt_max_chars {
            self.limits.simple_prompt_max_chars = value;
        }
        if let Some(value) = partial.limits.max_generation_seconds {
            self.limits.max_generation_seconds = value;
        }
        if let Some(value) = partial.tolerances.duration_sum_seconds {
            self.tolerances.duration_sum_seconds = value;
        }
        if let Some(value) = partial.tolerances.alignment_bars {
            self.tolerances.alignment_bars = value;
        }
        if let Some(value) = partial.tolerances.music_solo_max_seconds {
            self.tolerances.music_solo_max_seconds = value;
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = env::var(ENV_COMPOSITION_MAX) {
            if !value.trim().is_empty() {
                let parsed = value
                    .parse::<usize>()
                    .context("SPOTCRAFT_COMPOSITION_MAX_CHARS must be an integer")?;
                self.limits.composition_max_chars = parsed;
            }
        }
        if let Ok(value) = env::var(ENV_MAX_GENERATION) {
            if !value.trim().is_empty() {
                let parsed = value
                    .parse::<f32>()
                    .context("SPOTCRAFT_MAX_GENERATION_SECONDS must be a number")?;
                self.limits.max_generation_seconds = parsed;
            }
        }
        if let Ok(value) = env::var(ENV_DURATION_TOLERANCE) {
            if !value.trim().is_empty() {
                let parsed = value
                    .parse::<f32>()
                    .context("SPOTCRAFT_DURATION_TOLERANCE_SECONDS must be a number")?;
                self.tolerances.duration_sum_seconds = parsed;
            }
        }
        Ok(())
    }
}

fn config_file_override() -> Result<Option<PathBuf>> {
    if let Some(value) = env::var_os(ENV_CONFIG_PATH) {
        if value.is_empty() {
            return Ok(None);
        }
        let path = PathBuf::from(value);
        if path.is_dir() {
            return Ok(Some(path.join(CONFIG_FILE_NAME)));
        }
        return Ok(Some(path));
    }
    Ok(None)
}

fn read_partial(path: &Path) -> Result<PartialConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let partial: PartialConfig =
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(partial)
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialConfig {
    limits: PartialLimits,
    tolerances: PartialTolerances,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialLimits {
    title_max_chars: Option<usize>,
    composition_max_chars: Option<usize>,
    alt_composition_max_chars: Option<usize>,
    simple_prompt_max_chars: Option<usize>,
    max_generation_seconds: Option<f32>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialTolerances {
    duration_sum_seconds: Option<f32>,
    alignment_bars: Option<f32>,
    music_solo_max_seconds: Option<f32>,
}
