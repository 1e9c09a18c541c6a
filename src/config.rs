/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// `RulesConfig` is the immutable rule set threaded into the maze generator
/// and the world at session start. Nothing in the core reads process-wide
/// state, so two sessions with different rules can run side by side.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub rules: RulesConfig,
    pub tick_rate_ms: u64,
    pub scores_dir: PathBuf,
    pub player_name: String,
}

/// Game rules. Times are in seconds, scores in points.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    // ── Grid / generation ──
    pub rows: usize,
    pub cols: usize,
    pub generation_attempts: u32,
    pub spawn_attempts: u32,
    pub min_spawn_exit_distance: usize,

    // ── Enemies ──
    pub enemy_count: usize,
    pub enemy_respawn_secs: f64,
    pub min_enemy_spawn_distance: usize, // initial placement and respawn: >=
    pub min_replacement_distance: usize, // replacements after capture/escape: >
    pub escape_enemy_period: u64,        // enemies advance every Nth tick
    pub hunter_enemy_period: u64,

    // ── Player ──
    pub stamina_max: u32,
    pub stamina_regen: u32,
    pub run_cost: u32,
    pub max_active_traps: u32,
    pub trap_cooldown_secs: f64,

    // ── Scoring ──
    pub capture_bonus: u32,
    pub trap_bonus: u32,
    pub escape_penalty: u32,
    pub win_base: u32,
    pub win_decay_per_sec: u32,
    pub win_floor: u32,
    pub difficulty_bonus_per_enemy: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            rows: 12,
            cols: 18,
            generation_attempts: 10,
            spawn_attempts: 100,
            min_spawn_exit_distance: 3,

            enemy_count: 3,
            enemy_respawn_secs: 10.0,
            min_enemy_spawn_distance: 4,
            min_replacement_distance: 5,
            escape_enemy_period: 4,
            hunter_enemy_period: 3,

            stamina_max: 100,
            stamina_regen: 5,
            run_cost: 10,
            max_active_traps: 3,
            trap_cooldown_secs: 5.0,

            capture_bonus: 200,
            trap_bonus: 50,
            escape_penalty: 100,
            win_base: 2000,
            win_decay_per_sec: 20,
            win_floor: 100,
            difficulty_bonus_per_enemy: 100,
        }
    }
}

impl RulesConfig {
    pub fn respawn_delay(&self) -> Duration {
        Duration::from_secs_f64(self.enemy_respawn_secs)
    }

    pub fn trap_cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.trap_cooldown_secs)
    }

    /// Reject rule sets the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows < 5 || self.cols < 5 {
            return Err(ConfigError::Invalid(format!(
                "grid must be at least 5x5, got {}x{}", self.rows, self.cols
            )));
        }
        if self.escape_enemy_period == 0 || self.hunter_enemy_period == 0 {
            return Err(ConfigError::Invalid("enemy periods must be non-zero".into()));
        }
        let finite = |v: f64| v.is_finite() && v >= 0.0;
        if !finite(self.enemy_respawn_secs) || !finite(self.trap_cooldown_secs) {
            return Err(ConfigError::Invalid("timers must be finite and non-negative".into()));
        }
        if self.stamina_max == 0 {
            return Err(ConfigError::Invalid("stamina_max must be non-zero".into()));
        }
        Ok(())
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    rules: RulesConfig,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_scores_dir")]
    scores_dir: String,
    #[serde(default = "default_player_name")]
    player_name: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 100 }
fn default_scores_dir() -> String { ".".into() }
fn default_player_name() -> String { "player".into() }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            tick_rate_ms: default_tick_rate(),
            scores_dir: default_scores_dir(),
            player_name: default_player_name(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file, missing keys or invalid rules fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = search_dirs
            .iter()
            .map(|d| d.join("config.toml"))
            .find(|p| p.exists())
            .map(|path| match read_toml(&path) {
                Ok(cfg) => {
                    tracing::info!("Loaded {}", path.display());
                    cfg
                }
                Err(e) => {
                    tracing::warn!("{e}; using default settings");
                    TomlConfig::default()
                }
            })
            .unwrap_or_default();
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse config text directly. Used by `load` and by tests.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let cfg: TomlConfig = toml::from_str(text)?;
        cfg.rules.validate()?;
        Ok(GameConfig::from_toml(cfg, &[]))
    }

    fn from_toml(mut cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        if let Err(e) = cfg.rules.validate() {
            tracing::warn!("{e}; using default rules");
            cfg.rules = RulesConfig::default();
        }

        let scores_dir = PathBuf::from(&cfg.general.scores_dir);
        let scores_dir = if scores_dir.is_absolute() {
            scores_dir
        } else {
            search_dirs
                .iter()
                .map(|d| d.join(&scores_dir))
                .find(|p| p.is_dir())
                .unwrap_or(scores_dir)
        };

        GameConfig {
            rules: cfg.rules,
            tick_rate_ms: cfg.general.tick_rate_ms.max(1),
            scores_dir,
            player_name: cfg.general.player_name,
        }
    }
}

fn read_toml(path: &Path) -> Result<TomlConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<TomlConfig>(&text)?;
    Ok(cfg)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}
