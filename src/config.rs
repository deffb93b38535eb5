//! Declarative configuration: appearance numbers, tag names and placement
//! rules. Loaded from a JSON file; every field has a default so an empty
//! object is a valid config.

use {
    serde::Deserialize,
    std::{io, path::Path},
    thiserror::Error,
};

/// Tags are a bitmask in a `u32` with the top bit reserved.
pub const MAX_TAGS: usize = 31;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read the config file")]
    Io(#[source] io::Error),
    #[error("could not parse the config file")]
    Parse(#[source] serde_json::Error),
    #[error("too many tags: {0} (max {MAX_TAGS})")]
    TooManyTags(usize),
}

/// Window placement rule. Matched by substring against the window's class,
/// instance and title; `None` patterns match everything.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Rule {
    pub class: Option<String>,
    pub instance: Option<String>,
    pub title: Option<String>,
    /// Tag bits ORed into the client's tags.
    pub tags: u32,
    pub floating: Option<bool>,
    pub fullscreen: Option<bool>,
    /// Monitor number to place the client on.
    pub monitor: Option<i32>,
}

impl Rule {
    pub fn matches(&self, class: &str, instance: &str, title: &str) -> bool {
        let hit = |pat: &Option<String>, hay: &str| match pat {
            Some(p) => hay.contains(p.as_str()),
            None => true,
        };
        hit(&self.class, class) && hit(&self.instance, instance) && hit(&self.title, title)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub border_px: i32,
    pub gap_px: i32,
    /// Height of the bar strip reserved on each monitor.
    pub bar_px: i32,
    /// Extra gap between the bar and the client area.
    pub bar_gap_px: i32,
    pub snap: i32,
    pub mfact: f64,
    pub nmaster: i32,
    pub rmaster: bool,
    pub show_bar: bool,
    pub top_bar: bool,
    /// Respect size hints for tiled windows.
    pub resize_hints: bool,
    /// Keep focus-stack navigation inside a fullscreen window.
    pub lock_fullscreen: bool,
    pub tags: Vec<String>,
    pub rules: Vec<Rule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            border_px: 2,
            gap_px: 0,
            bar_px: 20,
            bar_gap_px: 2,
            snap: 5,
            mfact: 0.55,
            nmaster: 1,
            rmaster: false,
            show_bar: true,
            top_bar: true,
            resize_hints: false,
            lock_fullscreen: true,
            tags: (1..=9).map(|n| n.to_string()).collect(),
            rules: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path).map_err(ConfigError::Io)?;
        let config: Config = serde_json::from_slice(&data).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tags.len() > MAX_TAGS {
            return Err(ConfigError::TooManyTags(self.tags.len()));
        }
        Ok(())
    }

    /// Mask with one bit per configured tag.
    pub fn tag_mask(&self) -> u32 {
        (1u32 << self.tags.len()) - 1
    }
}
