//! The three-channel decaying trace store (spec.md §3, §4.3).

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::clock::SECONDS_PER_DAY;

/// Exponential decay of a signed value over elapsed days. Shared by
/// nonnegative trace accumulation and the signed institutional stance
/// drift (spec.md §4.10) — the math is identical either way.
pub fn exponential_decay(value: f64, elapsed_days: f64, half_life_days: f64) -> f64 {
    let elapsed_days = elapsed_days.max(0.0);
    value * 0.5_f64.powf(elapsed_days / half_life_days)
}

fn elapsed_days(last_updated: f64, now: f64) -> f64 {
    ((now - last_updated).max(0.0)) / SECONDS_PER_DAY
}

/// A single trace entry. Keys are not stored here — they live in the
/// owning map (spec.md §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TraceRecord {
    pub accumulated: f64,
    pub last_updated: f64,
    pub event_count: u64,
    pub is_scar: bool,
}

impl TraceRecord {
    fn new(timestamp: f64) -> Self {
        Self {
            accumulated: 0.0,
            last_updated: timestamp,
            event_count: 0,
            is_scar: false,
        }
    }

    /// Decayed magnitude at `now`. `0 <= decayed_value <= accumulated`
    /// for all `now >= last_updated` (spec.md §8).
    pub fn decayed_value(&self, now: f64, half_life_days: f64, scar_half_life_days: f64) -> f64 {
        let half_life = if self.is_scar {
            scar_half_life_days
        } else {
            half_life_days
        };
        exponential_decay(
            self.accumulated,
            elapsed_days(self.last_updated, now),
            half_life,
        )
    }

    /// Apply one contributing event: decay to `timestamp`, fold in the
    /// saturation-dampened intensity, bump the event count. Out-of-order
    /// timestamps (earlier than `last_updated`) clamp elapsed time to 0 —
    /// "append without decay" — and never move `last_updated` backwards.
    fn apply_event(
        &mut self,
        timestamp: f64,
        intensity: f64,
        saturation: f64,
        half_life_days: f64,
        scar_half_life_days: f64,
    ) {
        let decayed = self.decayed_value(timestamp, half_life_days, scar_half_life_days);
        let effective = intensity * (1.0 - saturation.powi(2));
        self.accumulated = decayed + effective;
        self.last_updated = self.last_updated.max(timestamp);
        self.event_count += 1;
    }
}

/// A per-channel map from a channel-specific key to its [`TraceRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceTable<K: Eq + Hash> {
    entries: HashMap<K, TraceRecord>,
}

impl<K: Eq + Hash + Clone> TraceTable<K> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &TraceRecord)> {
        self.entries.iter()
    }

    pub fn get(&self, key: &K) -> Option<&TraceRecord> {
        self.entries.get(key)
    }

    /// Record one event's contribution under `key`, creating the trace on
    /// first touch.
    pub fn log(
        &mut self,
        key: K,
        timestamp: f64,
        intensity: f64,
        saturation: f64,
        half_life_days: f64,
        scar_half_life_days: f64,
    ) {
        let record = self
            .entries
            .entry(key)
            .or_insert_with(|| TraceRecord::new(timestamp));
        record.apply_event(
            timestamp,
            intensity,
            saturation,
            half_life_days,
            scar_half_life_days,
        );
    }

    /// Sum of decayed magnitudes across the whole channel — feeds
    /// saturation refresh (spec.md §4.6).
    pub fn total_decayed(&self, now: f64, half_life_days: f64, scar_half_life_days: f64) -> f64 {
        self.entries
            .values()
            .map(|record| record.decayed_value(now, half_life_days, scar_half_life_days))
            .sum()
    }

    /// Remove traces whose current decayed magnitude has fallen below
    /// `prune_threshold`. Returns the number removed.
    pub fn prune(
        &mut self,
        now: f64,
        half_life_days: f64,
        scar_half_life_days: f64,
        prune_threshold: f64,
    ) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, record| record.decayed_value(now, half_life_days, scar_half_life_days) >= prune_threshold);
        before - self.entries.len()
    }

    pub fn retain<F: FnMut(&K, &TraceRecord) -> bool>(&mut self, mut keep: F) {
        self.entries.retain(|k, v| keep(k, v));
    }

    pub fn insert_raw(&mut self, key: K, record: TraceRecord) {
        self.entries.insert(key, record);
    }

    pub fn into_entries(self) -> HashMap<K, TraceRecord> {
        self.entries
    }
}

/// Per-channel fullness in `[0,1]`, a cache derived from decayed weight
/// over configured capacity — never authoritative (spec.md §3, §4.6).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SaturationState {
    pub personal: f64,
    pub group: f64,
    pub behavior: f64,
    pub last_refreshed: f64,
}

impl SaturationState {
    /// Recompute from the authoritative decayed sums (the world tick's
    /// saturation-refresh step). Always clamped to `[0,1]`.
    pub fn refresh(&mut self, now: f64, personal_total: f64, group_total: f64, behavior_total: f64, capacity_personal: f64, capacity_group: f64, capacity_behavior: f64) {
        self.personal = (personal_total / capacity_personal).clamp(0.0, 1.0);
        self.group = (group_total / capacity_group).clamp(0.0, 1.0);
        self.behavior = (behavior_total / capacity_behavior).clamp(0.0, 1.0);
        self.last_refreshed = now;
    }

    /// Between ticks the cached saturation is stale by construction — the
    /// source material does not mandate a decay curve for it (spec.md §9
    /// open question). This workspace resolves it with a linear decrease
    /// proportional to elapsed-over-half-life, using the channel's own
    /// half-life as the decay horizon, documented here rather than left
    /// implicit.
    pub fn effective(&self, now: f64, half_life_days_personal: f64, half_life_days_group: f64, half_life_days_behavior: f64) -> (f64, f64, f64) {
        let elapsed = elapsed_days(self.last_refreshed, now);
        let factor = |half_life: f64| (1.0 - elapsed / half_life).clamp(0.0, 1.0);
        (
            self.personal * factor(half_life_days_personal),
            self.group * factor(half_life_days_group),
            self.behavior * factor(half_life_days_behavior),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decayed_value_is_bounded_by_accumulated() {
        let mut record = TraceRecord::new(0.0);
        record.apply_event(0.0, 1.0, 0.0, 7.0, 365.0);
        let decayed = record.decayed_value(1000.0, 7.0, 365.0);
        assert!(decayed >= 0.0);
        assert!(decayed <= record.accumulated);
    }

    #[test]
    fn one_half_life_halves_the_value() {
        let mut record = TraceRecord::new(0.0);
        record.apply_event(0.0, 1.0, 0.0, 7.0, 365.0);
        let after_one_hl = record.decayed_value(7.0 * SECONDS_PER_DAY, 7.0, 365.0);
        assert!((after_one_hl - 0.5).abs() < 1e-9);
        let after_two_hl = record.decayed_value(14.0 * SECONDS_PER_DAY, 7.0, 365.0);
        assert!((after_two_hl - 0.25).abs() < 1e-9);
    }

    #[test]
    fn out_of_order_event_clamps_elapsed_to_zero() {
        let mut record = TraceRecord::new(1000.0);
        record.apply_event(1000.0, 1.0, 0.0, 7.0, 365.0);
        // Earlier timestamp: append without decay, last_updated unchanged.
        record.apply_event(500.0, 0.5, 0.0, 7.0, 365.0);
        assert_eq!(record.last_updated, 1000.0);
        assert!((record.accumulated - 1.5).abs() < 1e-9);
    }

    #[test]
    fn saturation_dampens_effective_intensity() {
        let mut record = TraceRecord::new(0.0);
        record.apply_event(0.0, 1.0, 0.9, 7.0, 365.0);
        // effective = 1.0 * (1 - 0.81) = 0.19
        assert!((record.accumulated - 0.19).abs() < 1e-9);
    }

    #[test]
    fn prune_removes_entries_below_threshold() {
        let mut table: TraceTable<String> = TraceTable::new();
        table.log("harm.fire".to_string(), 0.0, 0.01, 0.0, 7.0, 365.0);
        let removed = table.prune(0.0, 7.0, 365.0, 0.1);
        assert_eq!(removed, 1);
        assert!(table.is_empty());
    }
}
