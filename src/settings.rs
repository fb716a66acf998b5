//! Outline recolor settings.
//!
//! Settings are layered: built-in defaults, then an optional `key=value`
//! settings file, then command-line overrides. The result is validated once
//! before any image is touched and passed around by reference afterwards.
//!
//! File format (one entry per line, `#` starts a comment):
//!
//! ```text
//! outline_color=0,0,0,255
//! shadow_color=0,0,0,83
//! outline_darkness=1.5
//! darken_base_outline=true
//! darken_nation_outlines=false
//! reduce_nation_alpha=true
//! alpha_reduction_strength=8
//! ```

use std::path::Path;

use image::Rgba;
use log::warn;

/// Errors raised while loading or validating settings.
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    InvalidValue { key: String, value: String },
    NonPositiveDarkness(f64),
    NonFiniteDarkness(f64),
    ZeroAlphaStrength,
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "could not read settings: {}", e),
            SettingsError::InvalidValue { key, value } => {
                write!(f, "invalid value '{}' for setting '{}'", value, key)
            }
            SettingsError::NonPositiveDarkness(v) => {
                write!(f, "outline_darkness must be greater than 0, got {}", v)
            }
            SettingsError::NonFiniteDarkness(v) => {
                write!(f, "outline_darkness must be a finite number, got {}", v)
            }
            SettingsError::ZeroAlphaStrength => {
                write!(f, "alpha_reduction_strength must be greater than 0")
            }
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

/// Process-wide recolor configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct OutlineSettings {
    /// Marker color of the pixels to recolor.
    pub outline_color: Rgba<u8>,
    /// Excluded from blends, never replaced. Set to fully transparent to let
    /// shadows bleed into the outline.
    pub shadow_color: Rgba<u8>,
    /// Divisor for the HSV value of a darkened blend (> 1 darker, < 1 lighter).
    pub outline_darkness: f64,
    /// Darken the recolored outline of the base image.
    pub darken_base_outline: bool,
    /// Darken the recolored outline of the nation-color overlays.
    pub darken_nation_outlines: bool,
    /// Fade overlay outline alpha when few neighbors contributed.
    pub reduce_nation_alpha: bool,
    /// Higher = less alpha on weakly surrounded overlay outline pixels.
    pub alpha_reduction_strength: u32,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            outline_color: Rgba([0, 0, 0, 255]),
            shadow_color: Rgba([0, 0, 0, 83]),
            outline_darkness: 1.5,
            darken_base_outline: true,
            darken_nation_outlines: false,
            reduce_nation_alpha: true,
            alpha_reduction_strength: 8,
        }
    }
}

impl OutlineSettings {
    /// Load settings from a file on top of the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let mut s = Self::default();
        s.apply_config_str(&content)?;
        Ok(s)
    }

    /// Apply every `key=value` line of `content` to `self`.
    pub fn apply_config_str(&mut self, content: &str) -> Result<(), SettingsError> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else {
                warn!("ignoring settings line without '=': {}", line);
                continue;
            };
            let key = key.trim();
            let val = val.trim();
            let invalid = || SettingsError::InvalidValue {
                key: key.to_string(),
                value: val.to_string(),
            };
            match key {
                "outline_color" => {
                    self.outline_color = parse_rgba(val).map_err(|_| invalid())?;
                }
                "shadow_color" => {
                    self.shadow_color = parse_rgba(val).map_err(|_| invalid())?;
                }
                "outline_darkness" => {
                    self.outline_darkness = val.parse().map_err(|_| invalid())?;
                }
                "darken_base_outline" => {
                    self.darken_base_outline = parse_bool(val).ok_or_else(invalid)?;
                }
                "darken_nation_outlines" => {
                    self.darken_nation_outlines = parse_bool(val).ok_or_else(invalid)?;
                }
                "reduce_nation_alpha" => {
                    self.reduce_nation_alpha = parse_bool(val).ok_or_else(invalid)?;
                }
                "alpha_reduction_strength" => {
                    self.alpha_reduction_strength = val.parse().map_err(|_| invalid())?;
                }
                _ => warn!("ignoring unknown setting '{}'", key),
            }
        }
        Ok(())
    }

    /// Reject configurations the recolor pass cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.outline_darkness.is_finite() {
            return Err(SettingsError::NonFiniteDarkness(self.outline_darkness));
        }
        if self.outline_darkness <= 0.0 {
            return Err(SettingsError::NonPositiveDarkness(self.outline_darkness));
        }
        if self.alpha_reduction_strength == 0 {
            return Err(SettingsError::ZeroAlphaStrength);
        }
        Ok(())
    }

    /// Serialize in the same format `load` reads.
    pub fn to_config_string(&self) -> String {
        format!(
            "outline_color={}\n\
             shadow_color={}\n\
             outline_darkness={}\n\
             darken_base_outline={}\n\
             darken_nation_outlines={}\n\
             reduce_nation_alpha={}\n\
             alpha_reduction_strength={}\n",
            color_to_str(self.outline_color),
            color_to_str(self.shadow_color),
            self.outline_darkness,
            self.darken_base_outline,
            self.darken_nation_outlines,
            self.reduce_nation_alpha,
            self.alpha_reduction_strength,
        )
    }
}

/// Format a color as "r,g,b,a".
pub fn color_to_str(c: Rgba<u8>) -> String {
    format!("{},{},{},{}", c[0], c[1], c[2], c[3])
}

/// Parse a color from "r,g,b,a". Also used as a clap value parser.
pub fn parse_rgba(s: &str) -> Result<Rgba<u8>, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 4 {
        return Err(format!("expected R,G,B,A but got '{}'", s));
    }
    let mut channels = [0u8; 4];
    for (channel, part) in channels.iter_mut().zip(&parts) {
        *channel = part
            .trim()
            .parse::<u8>()
            .map_err(|e| format!("bad channel '{}': {}", part.trim(), e))?;
    }
    Ok(Rgba(channels))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(OutlineSettings::default().validate().is_ok());
    }

    #[test]
    fn config_string_round_trips() {
        let mut s = OutlineSettings::default();
        s.outline_color = Rgba([10, 20, 30, 255]);
        s.outline_darkness = 0.75;
        s.reduce_nation_alpha = false;
        s.alpha_reduction_strength = 3;

        let mut loaded = OutlineSettings::default();
        loaded.apply_config_str(&s.to_config_string()).unwrap();
        assert_eq!(loaded, s);
    }

    #[test]
    fn comments_blank_lines_and_unknown_keys_are_skipped() {
        let mut s = OutlineSettings::default();
        s.apply_config_str("# header\n\nshadow_color = 0, 0, 0, 0\ncolour=1\n")
            .unwrap();
        assert_eq!(s.shadow_color, Rgba([0, 0, 0, 0]));
        assert_eq!(s.outline_color, OutlineSettings::default().outline_color);
    }

    #[test]
    fn malformed_values_are_reported_with_their_key() {
        let mut s = OutlineSettings::default();
        let err = s.apply_config_str("outline_color=0,0,300,255").unwrap_err();
        match err {
            SettingsError::InvalidValue { key, .. } => assert_eq!(key, "outline_color"),
            other => panic!("unexpected error: {}", other),
        }
        assert!(s.apply_config_str("darken_base_outline=maybe").is_err());
        assert!(s.apply_config_str("alpha_reduction_strength=-1").is_err());
    }

    #[test]
    fn zero_darkness_is_rejected() {
        let s = OutlineSettings { outline_darkness: 0.0, ..Default::default() };
        assert!(matches!(s.validate(), Err(SettingsError::NonPositiveDarkness(_))));

        let s = OutlineSettings { outline_darkness: f64::NAN, ..Default::default() };
        assert!(matches!(s.validate(), Err(SettingsError::NonFiniteDarkness(_))));
    }

    #[test]
    fn negative_darkness_is_rejected() {
        let s = OutlineSettings { outline_darkness: -1.5, ..Default::default() };
        assert!(matches!(s.validate(), Err(SettingsError::NonPositiveDarkness(v)) if v == -1.5));

        let s = OutlineSettings { outline_darkness: 0.25, ..Default::default() };
        assert!(s.validate().is_ok());
    }

    #[test]
    fn zero_alpha_strength_is_rejected() {
        let s = OutlineSettings { alpha_reduction_strength: 0, ..Default::default() };
        assert!(matches!(s.validate(), Err(SettingsError::ZeroAlphaStrength)));
    }

    #[test]
    fn parse_rgba_needs_four_channels() {
        assert_eq!(parse_rgba("1,2,3,4").unwrap(), Rgba([1, 2, 3, 4]));
        assert!(parse_rgba("1,2,3").is_err());
        assert!(parse_rgba("1,2,3,4,5").is_err());
    }
}
