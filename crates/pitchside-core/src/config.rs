// Configuration loading and parsing (pitchside.toml).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::SourceKind;

/// File name of the single config file under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "pitchside.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the config was loaded from; relative data paths resolve
    /// against it.
    pub base_dir: PathBuf,
    pub data: DataPaths,
    pub roster: RosterConfig,
    pub thresholds: Thresholds,
    pub backfill: BackfillConfig,
    pub fbref: FbrefConfig,
    pub ucl: UclConfig,
}

/// Raw deserialization target for the entire pitchside.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    data: DataPaths,
    #[serde(default)]
    roster: RosterConfig,
    #[serde(default)]
    thresholds: Thresholds,
    #[serde(default)]
    backfill: BackfillConfig,
    #[serde(default)]
    fbref: FbrefConfig,
    #[serde(default)]
    ucl: UclConfig,
}

impl Config {
    /// A config rooted at `base_dir` with every section at its default.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            data: DataPaths::default(),
            roster: RosterConfig::default(),
            thresholds: Thresholds::default(),
            backfill: BackfillConfig::default(),
            fbref: FbrefConfig::default(),
            ucl: UclConfig::default(),
        }
    }

    fn data_dir(&self) -> PathBuf {
        self.base_dir.join(&self.data.dir)
    }

    /// Resolved path of a single-file source. FBref and UCL are directory
    /// sources and resolve through `fbref_dir` / `ucl_dir`.
    pub fn path_for(&self, source: SourceKind) -> PathBuf {
        let file = match source {
            SourceKind::Gps => &self.data.gps,
            SourceKind::Recovery => &self.data.recovery,
            SourceKind::Priority => &self.data.priority,
            SourceKind::Capability => &self.data.capability,
            SourceKind::MatchEvents => &self.data.events,
            SourceKind::DevPlan => &self.data.dev_plan,
            SourceKind::ExternalFactors => &self.data.external,
            SourceKind::Fbref => &self.data.fbref_dir,
            SourceKind::Ucl => &self.data.ucl_dir,
        };
        self.data_dir().join(file)
    }

    pub fn fbref_dir(&self) -> PathBuf {
        self.path_for(SourceKind::Fbref)
    }

    pub fn ucl_dir(&self) -> PathBuf {
        self.path_for(SourceKind::Ucl)
    }
}

// ---------------------------------------------------------------------------
// [data]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub dir: String,
    pub gps: String,
    pub recovery: String,
    pub priority: String,
    pub capability: String,
    pub events: String,
    pub dev_plan: String,
    pub external: String,
    pub fbref_dir: String,
    pub ucl_dir: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            dir: "data".into(),
            gps: "PSG GPS Data.csv".into(),
            recovery: "PSG Recovery status Data.csv".into(),
            priority: "PSG Individual Priority Areas.csv".into(),
            capability: "PSG Physical Capability Data_.csv".into(),
            events: "PSG Match Events Data.csv".into(),
            dev_plan: "PSG Player Dev Plan.csv".into(),
            external: "PSG External Factors Data.csv".into(),
            fbref_dir: "fbref".into(),
            ucl_dir: "ucl".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// [roster]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Static player_id → display name mapping.
    pub players: Vec<RosterEntry>,
    /// Ids that synthetic player_id values are drawn from.
    pub backfill_ids: Vec<i64>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        let players = [
            (29, "Bradley Barcola"),
            (17, "Vitinha"),
            (10, "Ousmane Dembélé"),
            (14, "Désiré Doué"),
        ]
        .into_iter()
        .map(|(id, name)| RosterEntry {
            id,
            name: name.to_string(),
        })
        .collect();
        Self {
            players,
            backfill_ids: vec![7, 10, 22],
        }
    }
}

// ---------------------------------------------------------------------------
// [thresholds]
// ---------------------------------------------------------------------------

/// Calibration constants. None of these are derived statistically; they are
/// exposed so a club can tune them to its own data.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub readiness_low: f64,
    pub readiness_high: f64,
    pub readiness_distance_scale: f64,
    pub trend_drop_slope: f64,
    pub trend_gain_slope: f64,
    pub recovery_alert_low: f64,
    pub recovery_alert_moderate: f64,
    pub low_recovery_window_days: i64,
    pub capability_min_benchmark: f64,
    pub development_floor: f64,
    pub development_ceiling: f64,
    pub pitch_midline_x: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            readiness_low: 60.0,
            readiness_high: 75.0,
            readiness_distance_scale: 10_000.0,
            trend_drop_slope: -0.005,
            trend_gain_slope: 0.005,
            recovery_alert_low: 50.0,
            recovery_alert_moderate: 70.0,
            low_recovery_window_days: 3,
            capability_min_benchmark: 1.0,
            development_floor: 80.0,
            development_ceiling: 100.0,
            pitch_midline_x: 52.5,
        }
    }
}

// ---------------------------------------------------------------------------
// [backfill.*]
// ---------------------------------------------------------------------------

/// How synthetic values for one field are drawn.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Uniform in `[low, high)`, optionally rounded.
    Uniform {
        low: f64,
        high: f64,
        #[serde(default)]
        decimals: Option<u32>,
    },
    /// Uniform choice among `roster.backfill_ids`.
    Choice,
    /// A handful of dated injury events per roster player.
    InjuryEvents {
        min_per_player: u32,
        max_per_player: u32,
        window_days: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldPolicy {
    pub enabled: bool,
    pub seed: u64,
    pub distribution: Distribution,
}

impl FieldPolicy {
    fn uniform(seed: u64, low: f64, high: f64, decimals: Option<u32>) -> Self {
        Self {
            enabled: true,
            seed,
            distribution: Distribution::Uniform {
                low,
                high,
                decimals,
            },
        }
    }
}

/// The whole synthetic-data policy in one place. Each field has its own
/// seed so the generated values do not depend on which other fields were
/// backfilled.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackfillConfig {
    pub gps_x: FieldPolicy,
    pub gps_y: FieldPolicy,
    pub recovery_score: FieldPolicy,
    pub injury_status: FieldPolicy,
    pub player_id: FieldPolicy,
}

impl BackfillConfig {
    /// Every field disabled: absent columns stay absent.
    pub fn disabled() -> Self {
        let mut cfg = Self::default();
        for policy in cfg.policies_mut() {
            policy.enabled = false;
        }
        cfg
    }

    fn policies(&self) -> [(&'static str, &FieldPolicy); 5] {
        [
            ("gps_x", &self.gps_x),
            ("gps_y", &self.gps_y),
            ("recovery_score", &self.recovery_score),
            ("injury_status", &self.injury_status),
            ("player_id", &self.player_id),
        ]
    }

    fn policies_mut(&mut self) -> [&mut FieldPolicy; 5] {
        [
            &mut self.gps_x,
            &mut self.gps_y,
            &mut self.recovery_score,
            &mut self.injury_status,
            &mut self.player_id,
        ]
    }
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            gps_x: FieldPolicy::uniform(42, 0.0, 105.0, None),
            gps_y: FieldPolicy::uniform(43, 0.0, 68.0, None),
            recovery_score: FieldPolicy::uniform(0, 50.0, 95.0, Some(1)),
            injury_status: FieldPolicy {
                enabled: true,
                seed: 42,
                distribution: Distribution::InjuryEvents {
                    min_per_player: 2,
                    max_per_player: 3,
                    window_days: 365,
                },
            },
            player_id: FieldPolicy {
                enabled: true,
                seed: 7,
                distribution: Distribution::Choice,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// [fbref] and [ucl]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FbrefCategory {
    pub name: String,
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FbrefConfig {
    /// Stat categories in join order. The first is the base table.
    pub categories: Vec<FbrefCategory>,
    pub player_column: String,
    pub minutes_column: String,
    pub per90_metrics: Vec<String>,
}

impl Default for FbrefConfig {
    fn default() -> Self {
        let categories = [
            ("standard", "standard.csv"),
            ("shooting", "shooting.csv"),
            ("passing", "passing.csv"),
            ("possession", "possession.csv"),
            ("playing_time", "playing_time.csv"),
            ("goalkeeping", "goalkeeping.csv"),
        ]
        .into_iter()
        .map(|(name, file)| FbrefCategory {
            name: name.into(),
            file: file.into(),
        })
        .collect();
        Self {
            categories,
            player_column: "Player".into(),
            minutes_column: "Min".into(),
            per90_metrics: ["Gls", "Ast", "xG", "xAG", "Sh", "KP", "PrgP"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// One entry of the filename → (phase, order, score) lookup table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UclMatchSpec {
    pub file: String,
    pub phase: String,
    pub order: u32,
    pub score: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UclConfig {
    pub matches: Vec<UclMatchSpec>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/pitchside.toml` relative to
/// `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        base_dir: base_dir.to_path_buf(),
        data: file.data,
        roster: file.roster,
        thresholds: file.thresholds,
        backfill: file.backfill,
        fbref: file.fbref,
        ucl: file.ucl,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy `defaults/pitchside.toml` into `config/` unless a config file is
/// already there. Returns the path written, if any.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }
    let source = base_dir.join("defaults").join(CONFIG_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither config/{CONFIG_FILE} nor defaults/{CONFIG_FILE} found in {}; \
                 run from the project root or pass its path",
                base_dir.display()
            ),
        });
    }
    let copy_err = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(copy_err)?;
    }
    std::fs::copy(&source, &target).map_err(copy_err)?;
    Ok(Some(target))
}

/// Convenience wrapper: ensures defaults are copied, then loads config
/// relative to `base_dir`.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_file(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn validate(config: &Config) -> Result<(), ConfigError> {
    let t = &config.thresholds;

    for (name, val) in [
        ("thresholds.readiness_low", t.readiness_low),
        ("thresholds.readiness_high", t.readiness_high),
    ] {
        if !(0.0..=100.0).contains(&val) {
            return Err(invalid(name, format!("must be between 0 and 100, got {val}")));
        }
    }
    if t.readiness_low >= t.readiness_high {
        return Err(invalid(
            "thresholds.readiness_low",
            format!(
                "must be below readiness_high ({} >= {})",
                t.readiness_low, t.readiness_high
            ),
        ));
    }
    if t.readiness_distance_scale <= 0.0 {
        return Err(invalid(
            "thresholds.readiness_distance_scale",
            format!("must be > 0, got {}", t.readiness_distance_scale),
        ));
    }
    if t.trend_drop_slope > t.trend_gain_slope {
        return Err(invalid(
            "thresholds.trend_drop_slope",
            "must not exceed trend_gain_slope",
        ));
    }
    if t.recovery_alert_low > t.recovery_alert_moderate {
        return Err(invalid(
            "thresholds.recovery_alert_low",
            "must not exceed recovery_alert_moderate",
        ));
    }
    if t.low_recovery_window_days < 0 {
        return Err(invalid(
            "thresholds.low_recovery_window_days",
            "must be >= 0",
        ));
    }

    validate_backfill(config)?;

    let mut seen_orders = BTreeMap::new();
    for spec in &config.ucl.matches {
        if let Some(prev) = seen_orders.insert(spec.order, &spec.file) {
            return Err(invalid(
                "ucl.matches.order",
                format!("order {} used by both {prev} and {}", spec.order, spec.file),
            ));
        }
    }

    Ok(())
}

fn validate_backfill(config: &Config) -> Result<(), ConfigError> {
    for (name, policy) in config.backfill.policies() {
        let field = format!("backfill.{name}.distribution");
        let expected = match name {
            "gps_x" | "gps_y" | "recovery_score" => "uniform",
            "player_id" => "choice",
            _ => "injury_events",
        };
        match (&policy.distribution, expected) {
            (Distribution::Uniform { low, high, .. }, "uniform") => {
                if !(low < high) {
                    return Err(invalid(field, format!("low ({low}) must be below high ({high})")));
                }
            }
            (Distribution::Choice, "choice") => {
                if policy.enabled && config.roster.backfill_ids.is_empty() {
                    return Err(invalid(
                        "roster.backfill_ids",
                        "must not be empty while player_id backfill is enabled",
                    ));
                }
            }
            (
                Distribution::InjuryEvents {
                    min_per_player,
                    max_per_player,
                    window_days,
                },
                "injury_events",
            ) => {
                if *min_per_player == 0 || min_per_player > max_per_player {
                    return Err(invalid(
                        field,
                        format!(
                            "need 1 <= min_per_player <= max_per_player, got {min_per_player}..{max_per_player}"
                        ),
                    ));
                }
                if *window_days == 0 {
                    return Err(invalid(field, "window_days must be > 0"));
                }
            }
            _ => {
                return Err(invalid(field, format!("must be of kind `{expected}`")));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
