use anyhow::{bail, Context, Result};
use dirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

mod key_bindings;
pub use key_bindings::KeyBindings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub pace: PaceConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub glyphs: GlyphConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub key_bindings: KeyBindings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_width")]
    pub width: u16,
    #[serde(default = "default_height")]
    pub height: u16,
}

/// Largest board side accepted, in cells.
pub const MAX_BOARD_SIDE: u16 = 1000;

fn default_width() -> u16 { 60 }
fn default_height() -> u16 { 24 }

/// Tick delays in milliseconds. A larger delay is a slower snake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaceConfig {
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_horizontal")]
    pub horizontal_ms: u64,
    #[serde(default = "default_vertical")]
    pub vertical_ms: u64,
    #[serde(default = "default_floor")]
    pub floor_ms: u64,
    #[serde(default = "default_ceiling")]
    pub ceiling_ms: u64,
    #[serde(default = "default_step")]
    pub step_ms: u64,
}

fn default_initial_delay() -> u64 { 200 }
// Terminal cells are taller than they are wide, so vertical moves are slower
fn default_horizontal() -> u64 { 60 }
fn default_vertical() -> u64 { 80 }
fn default_floor() -> u64 { 20 }
fn default_ceiling() -> u64 { 500 }
fn default_step() -> u64 { 10 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_initial_length")]
    pub initial_length: usize,
    #[serde(default = "default_normal_growth")]
    pub normal_growth: usize,
    #[serde(default = "default_magic_growth")]
    pub magic_growth: usize,
    #[serde(default = "default_food_points")]
    pub food_points: u64,
    #[serde(default = "default_difficulty_ramp")]
    pub difficulty_ramp: u64,
    #[serde(default = "default_fairness_distance")]
    pub fairness_distance: u32,
    #[serde(default = "default_survival_bonus")]
    pub survival_bonus: u64,
    #[serde(default = "default_score_interval")]
    pub score_interval_secs: u64,
    #[serde(default = "default_game_over_pause")]
    pub game_over_pause_ms: u64,
}

fn default_initial_length() -> usize { 3 }
fn default_normal_growth() -> usize { 3 }
fn default_magic_growth() -> usize { 6 }
fn default_food_points() -> u64 { 10 }
fn default_difficulty_ramp() -> u64 { 1 }
fn default_fairness_distance() -> u32 { 8 }
fn default_survival_bonus() -> u64 { 2 }
fn default_score_interval() -> u64 { 2 }
fn default_game_over_pause() -> u64 { 2500 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlyphConfig {
    #[serde(default = "default_head")]
    pub head: String,
    #[serde(default = "default_body")]
    pub body: String,
    #[serde(default = "default_food")]
    pub food: String,
}

fn default_head() -> String { "░".to_string() }
fn default_body() -> String { "▓".to_string() }
fn default_food() -> String { "▒".to_string() }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Read keys on a dedicated thread instead of polling once per tick
    #[serde(default)]
    pub threaded_reader: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            horizontal_ms: default_horizontal(),
            vertical_ms: default_vertical(),
            floor_ms: default_floor(),
            ceiling_ms: default_ceiling(),
            step_ms: default_step(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            initial_length: default_initial_length(),
            normal_growth: default_normal_growth(),
            magic_growth: default_magic_growth(),
            food_points: default_food_points(),
            difficulty_ramp: default_difficulty_ramp(),
            fairness_distance: default_fairness_distance(),
            survival_bonus: default_survival_bonus(),
            score_interval_secs: default_score_interval(),
            game_over_pause_ms: default_game_over_pause(),
        }
    }
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            head: default_head(),
            body: default_body(),
            food: default_food(),
        }
    }
}

impl Config {
    /// Loads the config from the user's config directory, writing the
    /// defaults there on first run.
    pub fn load() -> Result<Self> {
        let config_path = get_config_dir()?.join("config.toml");
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let config_str = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let config: Config = toml::from_str(&config_str)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
        }

        let config_str = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize config")?;

        fs::write(config_path, config_str)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.board.width < 2 || self.board.height < 2 {
            bail!(
                "Board must be at least 2x2, got {}x{}",
                self.board.width,
                self.board.height
            );
        }
        if self.board.width > MAX_BOARD_SIDE || self.board.height > MAX_BOARD_SIDE {
            bail!(
                "Board can be at most {}x{}, got {}x{}",
                MAX_BOARD_SIDE,
                MAX_BOARD_SIDE,
                self.board.width,
                self.board.height
            );
        }
        if self.pace.floor_ms > self.pace.ceiling_ms {
            bail!(
                "Pace floor ({} ms) is above the ceiling ({} ms)",
                self.pace.floor_ms,
                self.pace.ceiling_ms
            );
        }
        if self.rules.initial_length == 0 {
            bail!("Initial snake length must be at least 1");
        }
        Ok(())
    }
}

fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .with_context(|| "Failed to determine config directory")?
        .join("serpent");

    Ok(config_dir)
}
