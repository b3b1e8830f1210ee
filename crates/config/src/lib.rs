//! Frozen configuration snapshot for the affinity core.
//!
//! Everything here is plain data: parsing, defaults, and load-time
//! validation. The snapshot itself is handed to `affinity-memory` and
//! `affinity-runtime`, which treat it as immutable for the lifetime of a
//! single operation (see `affinity-runtime::config` for the atomic
//! hot-reload wrapper).

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Load-time validation failures. Fatal — the caller should abort startup
/// rather than run with an inconsistent configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("channel_weights.{0} must be nonnegative, got {1}")]
    NegativeChannelWeight(&'static str, f64),
    #[error("affinity_scale must be > 0, got {0}")]
    NonPositiveAffinityScale(f64),
    #[error("half_lives.{0}.{1} must be > 0 days, got {2}")]
    NonPositiveHalfLife(&'static str, &'static str, f64),
    #[error("compaction.scar_half_life_days must be > 0, got {0}")]
    NonPositiveScarHalfLife(f64),
    #[error("compaction.prune_threshold must be >= 0, got {0}")]
    NegativePruneThreshold(f64),
    #[error("institutions.half_life_days must be > 0, got {0}")]
    NonPositiveInstitutionHalfLife(f64),
    #[error(
        "channel_weights.institutional ({0}) must not exceed channel_weights.behavior ({1})"
    )]
    InstitutionalWeightTooLarge(f64, f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelHalfLives {
    pub personal: f64,
    pub group: f64,
    pub behavior: f64,
}

impl Default for ChannelHalfLives {
    fn default() -> Self {
        Self {
            personal: 7.0,
            group: 21.0,
            behavior: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HalfLives {
    pub location: ChannelHalfLives,
    pub artifact: ChannelHalfLives,
    pub npc: ChannelHalfLives,
}

impl Default for HalfLives {
    fn default() -> Self {
        Self {
            location: ChannelHalfLives::default(),
            artifact: ChannelHalfLives {
                personal: 14.0,
                group: 30.0,
                behavior: 90.0,
            },
            npc: ChannelHalfLives {
                personal: 5.0,
                group: 14.0,
                behavior: 45.0,
            },
        }
    }
}

/// Blend weights for `compute_affinity`. Conventionally sum to 1.0, but
/// this is not enforced — only nonnegativity is (see `validate`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelWeights {
    pub personal: f64,
    pub group: f64,
    pub behavior: f64,
    /// Weight of the institutional bias channel. Default 0.0 — an
    /// institution's stance is opt-in per §9's open-question resolution.
    pub institutional: f64,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            personal: 0.5,
            group: 0.3,
            behavior: 0.2,
            institutional: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturationCapacity {
    pub personal: f64,
    pub group: f64,
    pub behavior: f64,
}

impl Default for SaturationCapacity {
    fn default() -> Self {
        Self {
            personal: 5.0,
            group: 10.0,
            behavior: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    pub hot_window_days: f64,
    pub warm_window_days: f64,
    pub scar_intensity_threshold: f64,
    pub scar_half_life_days: f64,
    pub prune_threshold: f64,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            hot_window_days: 14.0,
            warm_window_days: 60.0,
            scar_intensity_threshold: 3.0,
            scar_half_life_days: 365.0,
            prune_threshold: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct InstitutionsConfig {
    pub drift_rate: f64,
    pub inertia: f64,
    pub half_life_days: f64,
    pub refresh_interval_seconds: u64,
}

impl Default for InstitutionsConfig {
    fn default() -> Self {
        Self {
            drift_rate: 0.1,
            inertia: 0.85,
            half_life_days: 180.0,
            refresh_interval_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AffinityConfig {
    pub half_lives: HalfLives,
    pub channel_weights: ChannelWeights,
    pub saturation_capacity: SaturationCapacity,
    pub world_tick_interval_seconds: u64,
    pub compaction: CompactionConfig,
    pub institutions: InstitutionsConfig,
    /// Tags that survive hot→warm compaction verbatim; everything else
    /// collapses into a catch-all tag (spec.md §4.6).
    pub institutional_tags: HashSet<String>,
    /// Denominator multiplier for the tanh normalizer in `compute_affinity`.
    /// `10.0` is the documented neutral baseline.
    pub affinity_scale: f64,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            half_lives: HalfLives::default(),
            channel_weights: ChannelWeights::default(),
            saturation_capacity: SaturationCapacity::default(),
            world_tick_interval_seconds: 300,
            compaction: CompactionConfig::default(),
            institutions: InstitutionsConfig::default(),
            institutional_tags: ["human", "elf", "dwarf", "outsider", "hunter", "merchant"]
                .into_iter()
                .map(String::from)
                .collect(),
            affinity_scale: 10.0,
        }
    }
}

impl AffinityConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path.as_ref()) {
            config = toml::from_str(&raw)
                .with_context(|| format!("parsing {}", path.as_ref().display()))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Load-time validation per spec.md §6 and §9's institutional-weight
    /// open-question resolution. Returns the first violation found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let w = &self.channel_weights;
        if w.personal < 0.0 {
            return Err(ValidationError::NegativeChannelWeight("personal", w.personal));
        }
        if w.group < 0.0 {
            return Err(ValidationError::NegativeChannelWeight("group", w.group));
        }
        if w.behavior < 0.0 {
            return Err(ValidationError::NegativeChannelWeight("behavior", w.behavior));
        }
        if w.institutional < 0.0 {
            return Err(ValidationError::NegativeChannelWeight(
                "institutional",
                w.institutional,
            ));
        }
        if w.institutional > w.behavior {
            return Err(ValidationError::InstitutionalWeightTooLarge(
                w.institutional,
                w.behavior,
            ));
        }
        if self.affinity_scale <= 0.0 {
            return Err(ValidationError::NonPositiveAffinityScale(self.affinity_scale));
        }
        for (kind, hl) in [
            ("location", &self.half_lives.location),
            ("artifact", &self.half_lives.artifact),
            ("npc", &self.half_lives.npc),
        ] {
            for (channel, value) in [
                ("personal", hl.personal),
                ("group", hl.group),
                ("behavior", hl.behavior),
            ] {
                if value <= 0.0 {
                    return Err(ValidationError::NonPositiveHalfLife(kind, channel, value));
                }
            }
        }
        if self.compaction.scar_half_life_days <= 0.0 {
            return Err(ValidationError::NonPositiveScarHalfLife(
                self.compaction.scar_half_life_days,
            ));
        }
        if self.compaction.prune_threshold < 0.0 {
            return Err(ValidationError::NegativePruneThreshold(
                self.compaction.prune_threshold,
            ));
        }
        if self.institutions.half_life_days <= 0.0 {
            return Err(ValidationError::NonPositiveInstitutionHalfLife(
                self.institutions.half_life_days,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(AffinityConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_channel_weight_is_rejected() {
        let mut cfg = AffinityConfig::default();
        cfg.channel_weights.group = -0.1;
        assert_eq!(
            cfg.validate(),
            Err(ValidationError::NegativeChannelWeight("group", -0.1))
        );
    }

    #[test]
    fn nonpositive_affinity_scale_is_rejected() {
        let mut cfg = AffinityConfig::default();
        cfg.affinity_scale = 0.0;
        assert_eq!(
            cfg.validate(),
            Err(ValidationError::NonPositiveAffinityScale(0.0))
        );
    }

    #[test]
    fn institutional_weight_above_behavior_is_rejected() {
        let mut cfg = AffinityConfig::default();
        cfg.channel_weights.institutional = 0.5;
        cfg.channel_weights.behavior = 0.2;
        assert_eq!(
            cfg.validate(),
            Err(ValidationError::InstitutionalWeightTooLarge(0.5, 0.2))
        );
    }

    #[test]
    fn round_trip_through_toml() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("affinity.toml");
        let cfg = AffinityConfig::default();
        cfg.save_to(&path)?;
        let loaded = AffinityConfig::load_from(&path)?;
        assert_eq!(loaded.affinity_scale, cfg.affinity_scale);
        assert_eq!(loaded.institutional_tags, cfg.institutional_tags);
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_defaults() -> Result<()> {
        let cfg = AffinityConfig::load_from("/nonexistent/path/affinity.toml")?;
        assert_eq!(cfg.affinity_scale, AffinityConfig::default().affinity_scale);
        Ok(())
    }
}
