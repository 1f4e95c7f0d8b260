//! Configuration management for the showreel daemon.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. The platform config directory (`showreel/config.toml`)
//! 2. `~/.config/showreel/config.toml`
//! 3. `./config.toml` (current directory, for development)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use showreel_core_layout::{
    ArcGeometry, ArcSettings, Card, MarqueeItem, MarqueeSettings, WheelGate, DEFAULT_CLONE_GUARD,
    DEFAULT_CLONE_MULTIPLE, DEFAULT_MIN_VISIBLE_RATIO, DEFAULT_PAGINATION_INTERVAL_MS,
    DEFAULT_SMOOTHING, DEFAULT_SPEED_PX_PER_SEC, DEFAULT_WHEEL_SCALE,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial host viewport.
    pub viewport: ViewportConfig,
    /// Motion preferences shared by both widgets.
    pub motion: MotionConfig,
    /// Arc carousel geometry and cards.
    pub arc: ArcConfig,
    /// Marquee tunables and items.
    pub marquee: MarqueeConfig,
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    #[serde(default = "default_viewport_width")]
    pub width: f64,
    #[serde(default = "default_viewport_height")]
    pub height: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_viewport_width(),
            height: default_viewport_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Read once at startup; disables smoothing and auto-scroll.
    #[serde(default)]
    pub prefers_reduced_motion: bool,

    /// Per-frame fraction of the remaining distance the arc offset covers.
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,

    /// Frame driver period in milliseconds.
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            prefers_reduced_motion: false,
            smoothing: default_smoothing(),
            frame_interval_ms: default_frame_interval(),
        }
    }
}

/// Arc carousel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcConfig {
    #[serde(default = "default_wide_breakpoint")]
    pub wide_breakpoint: f64,
    #[serde(default = "default_wide_step")]
    pub wide_step: f64,
    #[serde(default = "default_narrow_step")]
    pub narrow_step: f64,
    #[serde(default = "default_wide_radius")]
    pub wide_radius: f64,
    #[serde(default = "default_narrow_radius")]
    pub narrow_radius: f64,
    #[serde(default = "default_wide_amplitude")]
    pub wide_amplitude: f64,
    #[serde(default = "default_narrow_amplitude")]
    pub narrow_amplitude: f64,

    /// Height of the stage the cards hang from.
    #[serde(default = "default_stage_height")]
    pub stage_height: f64,

    #[serde(default = "default_center_ratio")]
    pub center_ratio: f64,

    /// Minimum visible fraction of the section before wheel input counts.
    #[serde(default = "default_min_visible_ratio")]
    pub min_visible_ratio: f64,

    /// Multiplier applied to accepted wheel deltas.
    #[serde(default = "default_wheel_scale")]
    pub wheel_scale: f64,

    #[serde(default = "default_cards")]
    pub cards: Vec<CardConfig>,
}

impl Default for ArcConfig {
    fn default() -> Self {
        let geometry = ArcGeometry::default();
        Self {
            wide_breakpoint: geometry.wide_breakpoint,
            wide_step: geometry.wide_step,
            narrow_step: geometry.narrow_step,
            wide_radius: geometry.wide_radius,
            narrow_radius: geometry.narrow_radius,
            wide_amplitude: geometry.wide_amplitude,
            narrow_amplitude: geometry.narrow_amplitude,
            stage_height: default_stage_height(),
            center_ratio: geometry.center_ratio,
            min_visible_ratio: default_min_visible_ratio(),
            wheel_scale: default_wheel_scale(),
            cards: default_cards(),
        }
    }
}

/// One `[[arc.cards]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    pub title: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Marquee configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarqueeConfig {
    #[serde(default = "default_speed")]
    pub speed_px_per_sec: f64,

    #[serde(default = "default_pagination_interval")]
    pub pagination_interval_ms: u64,

    /// Gap between track items in pixels.
    #[serde(default = "default_gap_px")]
    pub gap_px: f64,

    /// Track width target as a multiple of the viewport width.
    #[serde(default = "default_clone_multiple")]
    pub clone_multiple: f64,

    /// Maximum number of clone passes per fill.
    #[serde(default = "default_clone_guard")]
    pub clone_guard: u32,

    #[serde(default = "default_marquee_items")]
    pub items: Vec<MarqueeItemConfig>,
}

impl Default for MarqueeConfig {
    fn default() -> Self {
        Self {
            speed_px_per_sec: default_speed(),
            pagination_interval_ms: default_pagination_interval(),
            gap_px: default_gap_px(),
            clone_multiple: default_clone_multiple(),
            clone_guard: default_clone_guard(),
            items: default_marquee_items(),
        }
    }
}

/// One `[[marquee.items]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarqueeItemConfig {
    pub title: String,
    /// Rendered width of the item in pixels.
    #[serde(default = "default_item_width")]
    pub width: f64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
}

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Default value functions for serde
fn default_viewport_width() -> f64 {
    1440.0
}

fn default_viewport_height() -> f64 {
    900.0
}

fn default_smoothing() -> f64 {
    DEFAULT_SMOOTHING
}

fn default_frame_interval() -> u64 {
    16
}

fn default_wide_breakpoint() -> f64 {
    ArcGeometry::default().wide_breakpoint
}

fn default_wide_step() -> f64 {
    ArcGeometry::default().wide_step
}

fn default_narrow_step() -> f64 {
    ArcGeometry::default().narrow_step
}

fn default_wide_radius() -> f64 {
    ArcGeometry::default().wide_radius
}

fn default_narrow_radius() -> f64 {
    ArcGeometry::default().narrow_radius
}

fn default_wide_amplitude() -> f64 {
    ArcGeometry::default().wide_amplitude
}

fn default_narrow_amplitude() -> f64 {
    ArcGeometry::default().narrow_amplitude
}

fn default_stage_height() -> f64 {
    520.0
}

fn default_center_ratio() -> f64 {
    ArcGeometry::default().center_ratio
}

fn default_min_visible_ratio() -> f64 {
    DEFAULT_MIN_VISIBLE_RATIO
}

fn default_wheel_scale() -> f64 {
    DEFAULT_WHEEL_SCALE
}

fn default_speed() -> f64 {
    DEFAULT_SPEED_PX_PER_SEC
}

fn default_pagination_interval() -> u64 {
    DEFAULT_PAGINATION_INTERVAL_MS
}

fn default_gap_px() -> f64 {
    24.0
}

fn default_clone_multiple() -> f64 {
    DEFAULT_CLONE_MULTIPLE
}

fn default_clone_guard() -> u32 {
    DEFAULT_CLONE_GUARD
}

fn default_item_width() -> f64 {
    320.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cards() -> Vec<CardConfig> {
    [
        ("Atlas", "Rebuilt the booking flow end to end."),
        ("Beacon", "Realtime dashboards for field teams."),
        ("Cinder", "Brand system and motion language."),
        ("Delta", "Migration of a legacy catalogue."),
        ("Ember", "Accessibility audit and fixes."),
    ]
    .into_iter()
    .map(|(title, reason)| CardConfig {
        title: title.to_string(),
        reason: reason.to_string(),
        image: Some(format!("images/{}.jpg", title.to_lowercase())),
    })
    .collect()
}

fn default_marquee_items() -> Vec<MarqueeItemConfig> {
    ["Harbor", "Lumen", "Orbit", "Quartz", "Solace", "Tidal"]
        .into_iter()
        .map(|title| {
            let slug = title.to_lowercase();
            MarqueeItemConfig {
                title: title.to_string(),
                width: default_item_width(),
                image: Some(format!("images/{}.jpg", slug)),
                video: Some(format!("video/{}.mp4", slug)),
            }
        })
        .collect()
}

/// A problem found (and corrected) while validating a loaded config.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Replace a non-finite or non-positive value with `fallback`.
fn clamp_positive(
    value: &mut f64,
    fallback: f64,
    field: &'static str,
    warnings: &mut Vec<ConfigWarning>,
) {
    if !value.is_finite() || *value <= 0.0 {
        warnings.push(ConfigWarning::new(
            field,
            format!("{} is not a positive number, using {}", value, fallback),
        ));
        *value = fallback;
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound on clone passes per refill.
const MAX_CLONE_GUARD: u32 = 50;

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Clamp out-of-range values in place and report what was changed.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let defaults = ArcConfig::default();

        clamp_positive(
            &mut self.viewport.width,
            default_viewport_width(),
            "viewport.width",
            &mut warnings,
        );
        clamp_positive(
            &mut self.viewport.height,
            default_viewport_height(),
            "viewport.height",
            &mut warnings,
        );

        if !self.motion.smoothing.is_finite()
            || self.motion.smoothing <= 0.0
            || self.motion.smoothing > 1.0
        {
            warnings.push(ConfigWarning::new(
                "motion.smoothing",
                format!("{} is outside (0, 1], using {}", self.motion.smoothing, DEFAULT_SMOOTHING),
            ));
            self.motion.smoothing = DEFAULT_SMOOTHING;
        }
        if self.motion.frame_interval_ms == 0 {
            warnings.push(ConfigWarning::new(
                "motion.frame_interval_ms",
                "must be at least 1, using 16",
            ));
            self.motion.frame_interval_ms = default_frame_interval();
        }

        let arc = &mut self.arc;
        clamp_positive(
            &mut arc.wide_breakpoint,
            defaults.wide_breakpoint,
            "arc.wide_breakpoint",
            &mut warnings,
        );
        clamp_positive(&mut arc.wide_step, defaults.wide_step, "arc.wide_step", &mut warnings);
        clamp_positive(&mut arc.narrow_step, defaults.narrow_step, "arc.narrow_step", &mut warnings);
        clamp_positive(&mut arc.stage_height, defaults.stage_height, "arc.stage_height", &mut warnings);
        for (value, fallback, field) in [
            (&mut arc.wide_radius, defaults.wide_radius, "arc.wide_radius"),
            (&mut arc.narrow_radius, defaults.narrow_radius, "arc.narrow_radius"),
            (&mut arc.wide_amplitude, defaults.wide_amplitude, "arc.wide_amplitude"),
            (&mut arc.narrow_amplitude, defaults.narrow_amplitude, "arc.narrow_amplitude"),
            (&mut arc.wheel_scale, defaults.wheel_scale, "arc.wheel_scale"),
        ] {
            if !value.is_finite() || *value < 0.0 {
                warnings.push(ConfigWarning::new(
                    field,
                    format!("{} is negative or not a number, using {}", value, fallback),
                ));
                *value = fallback;
            }
        }
        if !(0.0..=1.0).contains(&arc.center_ratio) {
            warnings.push(ConfigWarning::new(
                "arc.center_ratio",
                format!("{} is outside [0, 1], clamping", arc.center_ratio),
            ));
            arc.center_ratio = if arc.center_ratio.is_nan() {
                defaults.center_ratio
            } else {
                arc.center_ratio.clamp(0.0, 1.0)
            };
        }
        if !(0.0..=1.0).contains(&arc.min_visible_ratio) {
            warnings.push(ConfigWarning::new(
                "arc.min_visible_ratio",
                format!("{} is outside [0, 1], clamping", arc.min_visible_ratio),
            ));
            arc.min_visible_ratio = if arc.min_visible_ratio.is_nan() {
                defaults.min_visible_ratio
            } else {
                arc.min_visible_ratio.clamp(0.0, 1.0)
            };
        }

        let marquee = &mut self.marquee;
        if !marquee.speed_px_per_sec.is_finite() || marquee.speed_px_per_sec < 0.0 {
            warnings.push(ConfigWarning::new(
                "marquee.speed_px_per_sec",
                format!("{} is invalid, using {}", marquee.speed_px_per_sec, default_speed()),
            ));
            marquee.speed_px_per_sec = default_speed();
        }
        if marquee.pagination_interval_ms == 0 {
            warnings.push(ConfigWarning::new(
                "marquee.pagination_interval_ms",
                "must be at least 1, using 160",
            ));
            marquee.pagination_interval_ms = default_pagination_interval();
        }
        if !marquee.gap_px.is_finite() || marquee.gap_px < 0.0 {
            warnings.push(ConfigWarning::new(
                "marquee.gap_px",
                format!("{} is invalid, using {}", marquee.gap_px, default_gap_px()),
            ));
            marquee.gap_px = default_gap_px();
        }
        clamp_positive(
            &mut marquee.clone_multiple,
            default_clone_multiple(),
            "marquee.clone_multiple",
            &mut warnings,
        );
        if marquee.clone_guard == 0 || marquee.clone_guard > MAX_CLONE_GUARD {
            let clamped = marquee.clone_guard.clamp(1, MAX_CLONE_GUARD);
            warnings.push(ConfigWarning::new(
                "marquee.clone_guard",
                format!(
                    "{} is outside [1, {}], using {}",
                    marquee.clone_guard, MAX_CLONE_GUARD, clamped
                ),
            ));
            marquee.clone_guard = clamped;
        }
        for item in &mut marquee.items {
            clamp_positive(&mut item.width, default_item_width(), "marquee.items.width", &mut warnings);
        }

        if !VALID_LOG_LEVELS.contains(&self.behavior.log_level.to_lowercase().as_str()) {
            warnings.push(ConfigWarning::new(
                "behavior.log_level",
                format!("unknown level '{}', using info", self.behavior.log_level),
            ));
            self.behavior.log_level = default_log_level();
        }

        if self.arc.cards.is_empty() {
            warnings.push(ConfigWarning::new("arc.cards", "no cards, the arc carousel is disabled"));
        }
        if self.marquee.items.is_empty() {
            warnings.push(ConfigWarning::new("marquee.items", "no items, the marquee is disabled"));
        }

        warnings
    }

    /// Breakpoint table for the arc resolver.
    pub fn arc_geometry(&self) -> ArcGeometry {
        ArcGeometry {
            wide_breakpoint: self.arc.wide_breakpoint,
            wide_step: self.arc.wide_step,
            narrow_step: self.arc.narrow_step,
            wide_radius: self.arc.wide_radius,
            narrow_radius: self.arc.narrow_radius,
            wide_amplitude: self.arc.wide_amplitude,
            narrow_amplitude: self.arc.narrow_amplitude,
            center_ratio: self.arc.center_ratio,
        }
    }

    pub fn arc_settings(&self) -> ArcSettings {
        ArcSettings {
            geometry: self.arc_geometry(),
            gate: WheelGate {
                min_visible_ratio: self.arc.min_visible_ratio,
                delta_scale: self.arc.wheel_scale,
            },
            smoothing: self.motion.smoothing,
            reduced_motion: self.motion.prefers_reduced_motion,
        }
    }

    pub fn marquee_settings(&self) -> MarqueeSettings {
        MarqueeSettings {
            speed_px_per_sec: self.marquee.speed_px_per_sec,
            pagination_interval_ms: self.marquee.pagination_interval_ms,
            clone_multiple: self.marquee.clone_multiple,
            clone_guard: self.marquee.clone_guard,
            reduced_motion: self.motion.prefers_reduced_motion,
            ..MarqueeSettings::default()
        }
    }

    pub fn cards(&self) -> Vec<Card> {
        self.arc
            .cards
            .iter()
            .map(|c| Card {
                title: c.title.clone(),
                reason: c.reason.clone(),
                image: c.image.clone(),
            })
            .collect()
    }

    pub fn marquee_items(&self) -> Vec<MarqueeItem> {
        self.marquee
            .items
            .iter()
            .map(|i| MarqueeItem {
                title: i.title.clone(),
                image: i.image.clone(),
                video: i.video.clone(),
            })
            .collect()
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(proj_dirs) = ProjectDirs::from("com", "showreel", "showreel") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("showreel").join("config.toml"));
    }

    paths.push(PathBuf::from("config.toml"));

    paths
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.arc.wide_breakpoint, 900.0);
        assert_eq!(config.arc.wide_step, 150.0);
        assert_eq!(config.arc.narrow_step, 128.0);
        assert_eq!(config.arc.stage_height, 520.0);
        assert_eq!(config.motion.smoothing, 0.09);
        assert_eq!(config.motion.frame_interval_ms, 16);
        assert_eq!(config.marquee.speed_px_per_sec, 72.0);
        assert_eq!(config.marquee.pagination_interval_ms, 160);
        assert_eq!(config.marquee.clone_guard, 10);
        assert!(!config.motion.prefers_reduced_motion);
        assert_eq!(config.arc.cards.len(), 5);
        assert_eq!(config.marquee.items.len(), 6);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.arc.cards, config.arc.cards);
        assert_eq!(parsed.marquee.items, config.marquee.items);
    }

    #[test]
    fn test_config_partial_parse() {
        let toml_str = r#"
            [arc]
            wide_step = 170

            [[arc.cards]]
            title = "Solo"
            reason = "Only card"

            [[marquee.items]]
            title = "Clip"
            video = "clip.webm"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.arc.wide_step, 170.0);
        assert_eq!(config.arc.narrow_step, 128.0); // default
        assert_eq!(config.arc.cards.len(), 1);
        assert_eq!(config.arc.cards[0].image, None);
        assert_eq!(config.marquee.items[0].width, 320.0);
        assert_eq!(config.marquee.gap_px, 24.0);
    }

    #[test]
    fn test_config_paths_not_empty() {
        let paths = config_paths();
        assert!(!paths.is_empty());
        assert_eq!(paths.last(), Some(&PathBuf::from("config.toml")));
    }

    #[test]
    fn test_load_from_missing_path_fails_with_context() {
        let err = Config::load_from_path(Path::new("/nonexistent/showreel.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_validate_default_is_clean() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_clamps_bad_values() {
        let mut config = Config::default();
        config.motion.smoothing = 1.5;
        config.arc.min_visible_ratio = 2.0;
        config.arc.wide_step = -10.0;
        config.marquee.pagination_interval_ms = 0;
        config.behavior.log_level = "loud".to_string();

        let warnings = config.validate();
        let fields: Vec<&str> = warnings.iter().map(|w| w.field).collect();
        assert!(fields.contains(&"motion.smoothing"));
        assert!(fields.contains(&"arc.min_visible_ratio"));
        assert!(fields.contains(&"arc.wide_step"));
        assert!(fields.contains(&"marquee.pagination_interval_ms"));
        assert!(fields.contains(&"behavior.log_level"));

        assert_eq!(config.motion.smoothing, 0.09);
        assert_eq!(config.arc.min_visible_ratio, 1.0);
        assert_eq!(config.arc.wide_step, 150.0);
        assert_eq!(config.marquee.pagination_interval_ms, 160);
        assert_eq!(config.behavior.log_level, "info");
    }

    #[test]
    fn test_validate_clamps_breakpoint_and_guard() {
        let mut config = Config::default();
        config.arc.wide_breakpoint = f64::NAN;
        config.marquee.clone_guard = 100_000;

        let warnings = config.validate();
        let fields: Vec<&str> = warnings.iter().map(|w| w.field).collect();
        assert!(fields.contains(&"arc.wide_breakpoint"));
        assert!(fields.contains(&"marquee.clone_guard"));
        assert_eq!(config.arc.wide_breakpoint, 900.0);
        assert_eq!(config.marquee.clone_guard, MAX_CLONE_GUARD);
        assert!(config.arc_geometry().is_wide(1440.0));

        config.marquee.clone_guard = 0;
        config.validate();
        assert_eq!(config.marquee.clone_guard, 1);
    }

    #[test]
    fn test_validate_warns_on_empty_widgets() {
        let mut config = Config::default();
        config.arc.cards.clear();
        config.marquee.items.clear();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_settings_conversion() {
        let mut config = Config::default();
        config.motion.prefers_reduced_motion = true;
        config.arc.wheel_scale = 0.5;

        let arc = config.arc_settings();
        assert_eq!(arc.gate.delta_scale, 0.5);
        assert!(arc.reduced_motion);

        let marquee = config.marquee_settings();
        assert!(marquee.reduced_motion);
        assert_eq!(marquee.clone_guard, 10);

        let items = config.marquee_items();
        assert_eq!(items[0].video.as_deref(), Some("video/harbor.mp4"));
        assert_eq!(config.cards()[2].title, "Cinder");
    }
}
