//! Heuristic conflict detection over a flat permission selection
//!
//! Two independent passes feed one report: duplicate actions in the same
//! module/menu/card context, and an anomalous spread of power levels.
//! Input order never matters; ids are sorted first, and ids naming the same
//! permission (a legacy id and its composite alias) count once.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::EngineConfig;
use crate::constants::{RECOMMEND_DUPLICATES, RECOMMEND_POWER_GAPS, RECOMMEND_TEMPLATES};
use crate::index::PermissionIndex;
use crate::power::resolve_distinct;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub permission_id: String,
    pub conflicting_with: Vec<String>,
    pub severity: Severity,
    pub description: String,
}

/// Conflict query result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
    pub has_conflicts: bool,
    pub recommendations: Vec<String>,
    /// Input ids that matched nothing in the snapshot
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

impl ConflictReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.conflicts.iter().filter(|c| c.severity == severity).count()
    }
}

/// Sorted, deduplicated ids: the cache key of a selection
pub fn cache_key<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let set: BTreeSet<&str> = ids.iter().map(AsRef::as_ref).collect();
    set.into_iter().map(str::to_string).collect()
}

pub fn detect<S: AsRef<str>>(index: &PermissionIndex, config: &EngineConfig, ids: &[S]) -> ConflictReport {
    let sorted: Vec<&str> = ids.iter().map(AsRef::as_ref).collect::<BTreeSet<_>>().into_iter().collect();
    let resolved = resolve_distinct(index, &sorted);

    let mut conflicts = Vec::new();

    // Duplicate action in the same context
    let mut contexts: BTreeMap<_, Vec<&str>> = BTreeMap::new();
    for &(id, p) in &resolved.found {
        contexts.entry(p.context()).or_default().push(id);
    }
    for ((_, _, _, action), group) in &contexts {
        if group.len() > 1 {
            conflicts.push(Conflict {
                permission_id: group[0].to_string(),
                conflicting_with: group[1..].iter().map(|s| s.to_string()).collect(),
                severity: Severity::High,
                description: format!("duplicate action '{}' in same context", action),
            });
        }
    }

    // Power gap between the extremes
    let mut by_power: BTreeMap<u8, Vec<&str>> = BTreeMap::new();
    for &(id, p) in &resolved.found {
        by_power.entry(p.power_level).or_default().push(id);
    }
    if let (Some((&lo, lo_ids)), Some((&hi, hi_ids))) = (by_power.first_key_value(), by_power.last_key_value()) {
        let gap = hi - lo;
        if gap > config.conflicts.power_gap_threshold {
            conflicts.push(Conflict {
                permission_id: hi_ids[0].to_string(),
                conflicting_with: vec![lo_ids[0].to_string()],
                severity: Severity::Medium,
                description: format!("power gap of {} between levels {} and {}", gap, lo, hi),
            });
        }
    }

    let recommendations = recommend(&conflicts);
    ConflictReport {
        has_conflicts: !conflicts.is_empty(),
        conflicts,
        recommendations,
        unresolved: resolved.unresolved.iter().map(|s| s.to_string()).collect(),
    }
}

/// Recommendations depend only on which severities are present
pub fn recommend(conflicts: &[Conflict]) -> Vec<String> {
    let mut r = Vec::new();
    if conflicts.iter().any(|c| c.severity == Severity::High) {
        r.push(RECOMMEND_DUPLICATES.to_string());
    }
    if conflicts.iter().any(|c| c.severity == Severity::Medium) {
        r.push(RECOMMEND_POWER_GAPS.to_string());
    }
    if !conflicts.is_empty() {
        r.push(RECOMMEND_TEMPLATES.to_string());
    }
    r
}

/// Permissions held by more than one role, one low-severity conflict per shared permission and role pair
pub fn find_role_overlaps<N: AsRef<str>, S: AsRef<str>>(index: &PermissionIndex, roles: &[(N, Vec<S>)]) -> Vec<Conflict> {
    let held: Vec<(&str, BTreeSet<usize>)> = roles
        .iter()
        .map(|(name, ids)| {
            let set = ids.iter().filter_map(|id| index.position(id.as_ref())).collect();
            (name.as_ref(), set)
        })
        .collect();

    let mut out = Vec::new();
    for (i, (r1, p1)) in held.iter().enumerate() {
        for (r2, p2) in &held[i + 1..] {
            for &pos in p1.intersection(p2) {
                let p = &index.permissions()[pos];
                out.push(Conflict {
                    permission_id: p.id.clone(),
                    conflicting_with: vec![r1.to_string(), r2.to_string()],
                    severity: Severity::Low,
                    description: format!("permission '{}' exists in both {} and {}", p.display_name, r1, r2),
                });
            }
        }
    }
    out
}
