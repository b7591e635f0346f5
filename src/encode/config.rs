use std::{fs::File, io::BufReader, path::Path, str::FromStr};

use crate::foundation::{
    core::{DisposalMethod, Rgb},
    error::{GifError, GifResult},
};

/// Looping behavior announced by the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    /// Play once; no looping extension is written.
    #[default]
    Off,
    /// Loop forever (loop value 0).
    Infinite,
    /// Loop the given number of times.
    Count(u16),
}

impl Repeat {
    /// Loop value for the looping extension, or `None` when it is omitted.
    pub fn loop_count(self) -> Option<u16> {
        match self {
            Self::Off => None,
            Self::Infinite => Some(0),
            Self::Count(n) => Some(n),
        }
    }
}

/// Parses `off`, `infinite` (or `forever`) and plain loop counts.
impl FromStr for Repeat {
    type Err = GifError;

    fn from_str(s: &str) -> GifResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "infinite" | "forever" => Ok(Self::Infinite),
            n => n.parse::<u16>().map(Self::Count).map_err(|_| {
                GifError::validation(format!(
                    "repeat '{s}' must be off, infinite or a count in 0..=65535"
                ))
            }),
        }
    }
}

/// Session-level encoder options.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderConfig {
    /// Quantizer sample factor: 1 examines every pixel, larger values sample sparser and run
    /// faster.
    pub quality: u32,
    /// Looping behavior.
    pub repeat: Repeat,
    /// Color to mark transparent in every frame.
    pub transparent: Option<Rgb>,
    /// Disposal method written for every frame instead of the derived one.
    pub dispose: Option<DisposalMethod>,
    /// Delay after each frame in hundredths of a second.
    pub delay: u16,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            quality: 10,
            repeat: Repeat::Off,
            transparent: None,
            dispose: None,
            delay: 0,
        }
    }
}

impl EncoderConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> GifResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| GifError::serde(format!("parse encoder config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a configuration from a JSON file on disk.
    pub fn from_json_path(path: impl AsRef<Path>) -> GifResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            GifError::validation(format!("open encoder config '{}': {e}", path.display()))
        })?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            GifError::serde(format!("parse encoder config '{}': {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Pretty JSON rendering of this configuration.
    pub fn to_json_string(&self) -> GifResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GifError::serde(format!("serialize encoder config: {e}")))
    }

    /// Reject values a session cannot run with.
    pub fn validate(&self) -> GifResult<()> {
        if self.quality == 0 {
            return Err(GifError::validation("encoder quality must be at least 1"));
        }
        Ok(())
    }

    /// Sample factor handed to the quantizer; never below 1.
    pub fn sample_factor(&self) -> u32 {
        self.quality.max(1)
    }

    /// Disposal for a frame: the explicit choice if any, otherwise restore-to-background
    /// for transparent frames and unspecified for opaque ones.
    pub fn resolve_dispose(explicit: Option<DisposalMethod>, transparent: bool) -> DisposalMethod {
        match explicit {
            Some(d) => d,
            None if transparent => DisposalMethod::Background,
            None => DisposalMethod::Unspecified,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/config.rs"]
mod tests;
