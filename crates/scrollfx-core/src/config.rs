use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::motion::Easing;
use crate::visibility::MIN_THRESHOLD_STEP;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scroll: SmoothScrollConfig,
    #[serde(default)]
    pub visibility: VisibilityConfig,
    #[serde(default)]
    pub parallax: ParallaxConfig,
    #[serde(default)]
    pub header: HeaderConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub entrance: EntranceConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothScrollConfig {
    /// Duration of anchor-link scroll animations
    #[serde(default = "default_scroll_duration")]
    pub duration_ms: u64,
    /// Easing curve name (e.g., "easeInOutCubic", "easeOutQuad")
    #[serde(default = "default_easing")]
    pub easing: String,
    /// Start of a new scroll supersedes any in-flight one.
    /// When false, overlapping scrolls all keep writing and the last write
    /// in a frame wins.
    #[serde(default)]
    pub cancellable: bool,
    /// Pixels kept clear above an anchor target (sticky header height)
    #[serde(default)]
    pub anchor_offset: f64,
}

impl Default for SmoothScrollConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_scroll_duration(),
            easing: default_easing(),
            cancellable: false,
            anchor_offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityConfig {
    /// Intersection threshold granularity (0.01 = 101 thresholds)
    #[serde(default = "default_threshold_step")]
    pub threshold_step: f64,
    /// Class added when an element's entrance starts
    #[serde(default = "default_trigger_class")]
    pub trigger_class: String,
    /// Custom event dispatched on the element when it triggers
    #[serde(default = "default_trigger_event")]
    pub trigger_event: String,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            threshold_step: default_threshold_step(),
            trigger_class: default_trigger_class(),
            trigger_event: default_trigger_event(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallaxConfig {
    /// Speed factor for elements whose attribute is missing or unparseable
    #[serde(default = "default_parallax_speed")]
    pub default_speed: f64,
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            default_speed: default_parallax_speed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    /// Scroll offset past which the body gets the `scrolled` class
    #[serde(default = "default_scrolled_threshold")]
    pub scrolled_threshold: f64,
    /// Evaluate at most once per animation frame
    #[serde(default)]
    pub frame_throttle: bool,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            scrolled_threshold: default_scrolled_threshold(),
            frame_throttle: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Mount a scroll progress bar
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntranceConfig {
    /// Delay between consecutive hero elements on page load
    #[serde(default = "default_stagger")]
    pub stagger_ms: u64,
}

impl Default for EntranceConfig {
    fn default() -> Self {
        Self {
            stagger_ms: default_stagger(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Look-ahead added to the scroll offset when picking the active section
    #[serde(default = "default_spy_offset")]
    pub spy_offset: f64,
    /// Scroll offset past which the back-to-top control is shown
    #[serde(default = "default_back_to_top")]
    pub back_to_top_threshold: f64,
    /// Space left above a section when a navigation link scrolls to it
    #[serde(default = "default_link_offset")]
    pub link_offset: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            spy_offset: default_spy_offset(),
            back_to_top_threshold: default_back_to_top(),
            link_offset: default_link_offset(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_scroll_duration() -> u64 {
    800
}

fn default_easing() -> String {
    "easeInOutCubic".to_string()
}

fn default_threshold_step() -> f64 {
    0.01
}

fn default_trigger_class() -> String {
    "animate-in".to_string()
}

fn default_trigger_event() -> String {
    "animationStart".to_string()
}

fn default_parallax_speed() -> f64 {
    0.5
}

fn default_scrolled_threshold() -> f64 {
    50.0
}

fn default_stagger() -> u64 {
    150
}

fn default_spy_offset() -> f64 {
    200.0
}

fn default_back_to_top() -> f64 {
    100.0
}

fn default_link_offset() -> f64 {
    80.0
}

/// Validated, name-resolved view of a [`CoordinatorConfig`]
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub scroll_duration_ms: u64,
    pub easing: Easing,
    pub cancellable: bool,
    pub anchor_offset: f64,
    pub threshold_step: f64,
    pub trigger_class: String,
    pub trigger_event: String,
    pub default_speed: f64,
    pub scrolled_threshold: f64,
    pub header_frame_throttle: bool,
    pub progress_enabled: bool,
    pub stagger_ms: u64,
    pub spy_offset: f64,
    pub back_to_top_threshold: f64,
    pub link_offset: f64,
}

impl CoordinatorConfig {
    /// Load configuration from the default path or return defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::ConfigFile(e.to_string()))
    }

    pub fn to_toml_string(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::ConfigFile(e.to_string()))
    }

    /// Save configuration to the default path
    pub fn save(&self) -> crate::Result<PathBuf> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&config_path, self.to_toml_string()?)?;

        Ok(config_path)
    }

    /// Get the configuration file path
    /// Always uses ~/.config/scrollfx/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("scrollfx")
            .join("config.toml")
    }

    /// Resolve names and check ranges
    ///
    /// Unknown easing names and out-of-range values are rejected here so a
    /// coordinator never starts with a configuration it would misapply.
    pub fn validate(&self) -> crate::Result<Settings> {
        let easing: Easing = self.scroll.easing.parse()?;

        if self.scroll.duration_ms == 0 {
            return Err(config_error("scroll.duration_ms must be positive"));
        }
        if !self.scroll.anchor_offset.is_finite() {
            return Err(config_error("scroll.anchor_offset must be finite"));
        }
        let step = self.visibility.threshold_step;
        if !(MIN_THRESHOLD_STEP..=1.0).contains(&step) {
            return Err(config_error(format!(
                "visibility.threshold_step must be in [{}, 1], got {}",
                MIN_THRESHOLD_STEP, step
            )));
        }
        if self.visibility.trigger_class.trim().is_empty() {
            return Err(config_error("visibility.trigger_class must not be empty"));
        }
        if !self.parallax.default_speed.is_finite() {
            return Err(config_error("parallax.default_speed must be finite"));
        }
        if !self.header.scrolled_threshold.is_finite() || self.header.scrolled_threshold < 0.0 {
            return Err(config_error("header.scrolled_threshold must be a non-negative number"));
        }
        if !self.navigation.spy_offset.is_finite()
            || !self.navigation.back_to_top_threshold.is_finite()
            || !self.navigation.link_offset.is_finite()
        {
            return Err(config_error("navigation offsets must be finite"));
        }

        Ok(Settings {
            scroll_duration_ms: self.scroll.duration_ms,
            easing,
            cancellable: self.scroll.cancellable,
            anchor_offset: self.scroll.anchor_offset,
            threshold_step: step,
            trigger_class: self.visibility.trigger_class.clone(),
            trigger_event: self.visibility.trigger_event.clone(),
            default_speed: self.parallax.default_speed,
            scrolled_threshold: self.header.scrolled_threshold,
            header_frame_throttle: self.header.frame_throttle,
            progress_enabled: self.progress.enabled,
            stagger_ms: self.entrance.stagger_ms,
            spy_offset: self.navigation.spy_offset,
            back_to_top_threshold: self.navigation.back_to_top_threshold,
            link_offset: self.navigation.link_offset,
        })
    }
}

fn config_error(message: impl Into<String>) -> crate::Error {
    crate::Error::Configuration(message.into())
}
