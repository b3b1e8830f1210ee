//! Age-tiered compaction: hot → warm → scar (spec.md §4.6).
//!
//! Distinct from the world tick: tick prunes, refreshes saturation, and
//! sweeps cooldowns on every scheduled pass; compaction is a separate,
//! host-invoked operation (or a long-period sub-tick) so lifecycle tests
//! can assert that tick alone never folds traces.

use std::collections::HashMap;

use affinity_config::AffinityConfig;

use crate::entity::{EntityKind, GroupKey, MemoryEntity};
use crate::ids::{EventType, Tag};
use crate::trace::TraceRecord;

fn elapsed_days(last_updated: f64, now: f64) -> f64 {
    ((now - last_updated).max(0.0)) / crate::clock::SECONDS_PER_DAY
}

/// Fold `tag` into itself if it's in the institutional set, otherwise
/// into the catch-all (spec.md §4.6).
fn fold_tag(tag: &Tag, institutional_tags: &std::collections::HashSet<String>) -> Tag {
    if institutional_tags.contains(tag.as_str()) {
        tag.clone()
    } else {
        Tag::from("other")
    }
}

/// Run hot→warm folding and warm→scar promotion/deletion over one
/// entity, using its `kind`-appropriate half-life tier for age
/// thresholds. Returns the number of group keys merged and the number of
/// traces promoted to scar, for host-side observability.
pub fn compact_traces(entity: &mut MemoryEntity, now: f64, config: &AffinityConfig) -> CompactionReport {
    let mut report = CompactionReport::default();

    // Hot -> warm: personal traces older than the hot window are simply
    // forgotten (individual identities are not preserved past this
    // point); group traces are merged into folded-tag/folded-category
    // aggregates.
    entity
        .personal
        .retain(|_, record| elapsed_days(record.last_updated, now) <= config.compaction.hot_window_days);

    // Merge is a decayed-sum accumulation rather than a true exponential
    // moving average — the distinct identities being folded together no
    // longer have individual weights to average over.
    let mut folded: HashMap<GroupKey, TraceRecord> = HashMap::new();
    let mut carried_over = Vec::new();
    entity.group.retain(|key, record| {
        if elapsed_days(record.last_updated, now) <= config.compaction.hot_window_days {
            carried_over.push((key.clone(), *record));
            return false;
        }
        let folded_key = GroupKey(
            fold_tag(&key.0, &config.institutional_tags),
            EventType::from(key.1.category()),
        );
        merge_into(&mut folded, folded_key, record);
        report.group_keys_folded += 1;
        false
    });
    for (key, record) in carried_over {
        entity.group.insert_raw(key, record);
    }
    for (key, record) in folded {
        entity.group.insert_raw(key, record);
    }

    // Warm -> scar: traces past the warm window either promote to a
    // long-lived scar or are deleted outright.
    let scar_threshold = config.compaction.scar_intensity_threshold;
    let warm_window = config.compaction.warm_window_days;
    promote_or_delete(&mut entity.personal, now, warm_window, scar_threshold, &mut report);
    promote_or_delete_group(&mut entity.group, now, warm_window, scar_threshold, &mut report);
    promote_or_delete_behavior(&mut entity.behavior, now, warm_window, scar_threshold, &mut report);
    if let Some(bearer) = entity.bearer.as_mut() {
        promote_or_delete_bearer(bearer, now, warm_window, scar_threshold, &mut report);
    }

    report
}

fn merge_into(folded: &mut HashMap<GroupKey, TraceRecord>, key: GroupKey, incoming: &TraceRecord) {
    folded
        .entry(key)
        .and_modify(|existing| {
            existing.accumulated += incoming.accumulated;
            existing.last_updated = existing.last_updated.max(incoming.last_updated);
            existing.event_count += incoming.event_count;
        })
        .or_insert(*incoming);
}

#[derive(Debug, Clone, Default)]
pub struct CompactionReport {
    pub group_keys_folded: usize,
    pub promoted_to_scar: usize,
    pub deleted: usize,
}

fn promote_or_delete<K: Eq + std::hash::Hash + Clone>(table: &mut crate::trace::TraceTable<K>, now: f64, warm_window: f64, scar_threshold: f64, report: &mut CompactionReport) {
    let mut keep = Vec::new();
    table.retain(|key, record| {
        if elapsed_days(record.last_updated, now) <= warm_window {
            keep.push((key.clone(), *record));
            return false;
        }
        if record.accumulated > scar_threshold {
            let mut scarred = *record;
            scarred.is_scar = true;
            keep.push((key.clone(), scarred));
            report.promoted_to_scar += 1;
        } else {
            report.deleted += 1;
        }
        false
    });
    for (key, record) in keep {
        table.insert_raw(key, record);
    }
}

fn promote_or_delete_group(table: &mut crate::trace::TraceTable<GroupKey>, now: f64, warm_window: f64, scar_threshold: f64, report: &mut CompactionReport) {
    promote_or_delete(table, now, warm_window, scar_threshold, report);
}

fn promote_or_delete_behavior(table: &mut crate::trace::TraceTable<EventType>, now: f64, warm_window: f64, scar_threshold: f64, report: &mut CompactionReport) {
    promote_or_delete(table, now, warm_window, scar_threshold, report);
}

fn promote_or_delete_bearer(table: &mut crate::trace::TraceTable<crate::ids::ActorId>, now: f64, warm_window: f64, scar_threshold: f64, report: &mut CompactionReport) {
    promote_or_delete(table, now, warm_window, scar_threshold, report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::ValuationProfile;

    #[test]
    fn hot_personal_traces_survive_within_window() {
        let mut entity = MemoryEntity::new("forest_clearing", EntityKind::Location, ValuationProfile::new());
        let config = AffinityConfig::default();
        entity.personal.log(
            crate::entity::PersonalKey(crate::ids::ActorId::from("p1"), EventType::from("harm.fire")),
            0.0,
            0.5,
            0.0,
            7.0,
            365.0,
        );
        let report = compact_traces(&mut entity, 1.0 * crate::clock::SECONDS_PER_DAY, &config);
        assert_eq!(report.deleted, 0);
        assert_eq!(entity.personal.len(), 1);
    }

    #[test]
    fn hot_personal_traces_are_forgotten_past_hot_window() {
        let mut entity = MemoryEntity::new("forest_clearing", EntityKind::Location, ValuationProfile::new());
        let config = AffinityConfig::default();
        entity.personal.log(
            crate::entity::PersonalKey(crate::ids::ActorId::from("p1"), EventType::from("harm.fire")),
            0.0,
            0.5,
            0.0,
            7.0,
            365.0,
        );
        let past_hot_window = (config.compaction.hot_window_days + 1.0) * crate::clock::SECONDS_PER_DAY;
        compact_traces(&mut entity, past_hot_window, &config);
        assert!(entity.personal.is_empty());
    }

    #[test]
    fn high_intensity_group_trace_promotes_to_scar_past_warm_window() {
        let mut entity = MemoryEntity::new("forest_clearing", EntityKind::Location, ValuationProfile::new());
        let mut config = AffinityConfig::default();
        config.compaction.scar_intensity_threshold = 0.1;
        entity.group.log(
            GroupKey(Tag::from("human"), EventType::from("harm.fire")),
            0.0,
            1.0,
            0.0,
            7.0,
            365.0,
        );
        let past_warm_window = (config.compaction.warm_window_days + 1.0) * crate::clock::SECONDS_PER_DAY;
        let report = compact_traces(&mut entity, past_warm_window, &config);
        assert_eq!(report.promoted_to_scar, 1);
        let (_, record) = entity.group.iter().next().expect("one scar remains");
        assert!(record.is_scar);
    }
}
