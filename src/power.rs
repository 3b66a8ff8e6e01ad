//! Power-level analysis over flat permission ids
//!
//! Unresolved ids are skipped everywhere: a selection may still reference
//! permissions that are gone from the current snapshot.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::{EngineConfig, PowerBand, PowerBands};
use crate::index::{PermissionIndex, PermissionInfo};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PowerDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl PowerDistribution {
    pub fn add(&mut self, band: PowerBand) {
        match band {
            PowerBand::Low => self.low += 1,
            PowerBand::Medium => self.medium += 1,
            PowerBand::High => self.high += 1,
            PowerBand::Critical => self.critical += 1,
        }
    }

    pub fn merge(&mut self, other: &PowerDistribution) {
        self.low += other.low;
        self.medium += other.medium;
        self.high += other.high;
        self.critical += other.critical;
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high + self.critical
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionSummary {
    pub permission_id: String,
    pub display_name: String,
    pub action: String,
    pub power_level: u8,
    pub band: PowerBand,
    pub module_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_name: Option<String>,
}

impl PermissionSummary {
    fn of(p: &PermissionInfo, bands: &PowerBands) -> Self {
        PermissionSummary {
            permission_id: p.id.clone(),
            display_name: p.display_name.clone(),
            action: p.action.clone(),
            power_level: p.power_level,
            band: bands.classify(p.power_level),
            module_name: p.module_name.clone(),
            menu_name: p.menu_name.clone(),
            card_name: p.card_name.clone(),
        }
    }
}

/// Power query result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PowerAnalysis {
    pub permission_count: usize,
    pub max_power: u8,
    pub average_power: f64,
    pub power_distribution: PowerDistribution,
    pub most_powerful_permissions: Vec<PermissionSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildCheck {
    pub permission_id: String,
    pub permission_name: String,
    pub power_level: u8,
    pub is_allowed: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildValidation {
    pub max_parent_power: u8,
    pub validation_results: Vec<ChildCheck>,
    pub all_allowed: bool,
}

/// Ids split into resolved and dangling, in encounter order.
/// Repeats are dropped by the permission they name, so a legacy id and its
/// composite alias count once; the first id seen is kept.
#[derive(Debug, Clone, Default)]
pub struct Resolved<'s, 'a> {
    pub found: Vec<(&'s str, &'a PermissionInfo)>,
    pub unresolved: Vec<&'s str>,
}

pub fn resolve_distinct<'s, 'a, S: AsRef<str>>(index: &'a PermissionIndex, ids: &'s [S]) -> Resolved<'s, 'a> {
    let mut seen_pos = HashSet::new();
    let mut seen_dangling = HashSet::new();
    let mut out = Resolved::default();
    for id in ids.iter().map(AsRef::as_ref) {
        match index.position(id) {
            Some(pos) => {
                if seen_pos.insert(pos) {
                    out.found.push((id, &index.permissions()[pos]));
                }
            }
            None => {
                if seen_dangling.insert(id) {
                    out.unresolved.push(id);
                }
            }
        }
    }
    out
}

/// Highest power among resolvable ids (0 for none)
pub fn max_power<S: AsRef<str>>(index: &PermissionIndex, ids: &[S]) -> u8 {
    ids.iter()
        .filter_map(|id| index.resolve(id.as_ref()))
        .map(|p| p.power_level)
        .max()
        .unwrap_or(0)
}

pub fn analyze<S: AsRef<str>>(index: &PermissionIndex, config: &EngineConfig, ids: &[S]) -> PowerAnalysis {
    let resolved = resolve_distinct(index, ids).found;
    if resolved.is_empty() {
        return PowerAnalysis::default();
    }

    let bands = &config.power_bands;
    let mut dist = PowerDistribution::default();
    let mut total = 0u64;
    let mut max = 0u8;
    for (_, p) in &resolved {
        dist.add(bands.classify(p.power_level));
        total += u64::from(p.power_level);
        max = max.max(p.power_level);
    }
    let avg = total as f64 / resolved.len() as f64;

    // sort_by is stable: equal power keeps encounter order
    let mut ranked = resolved.clone();
    ranked.sort_by(|a, b| b.1.power_level.cmp(&a.1.power_level));
    let most_powerful = ranked
        .into_iter()
        .take(config.analysis.top_permissions)
        .map(|(id, p)| PermissionSummary { permission_id: id.to_string(), ..PermissionSummary::of(p, bands) })
        .collect();

    PowerAnalysis {
        permission_count: resolved.len(),
        max_power: max,
        average_power: (avg * 100.0).round() / 100.0,
        power_distribution: dist,
        most_powerful_permissions: most_powerful,
    }
}

/// Candidates whose power does not exceed the parents' ceiling.
/// Candidates that cannot be resolved have no provable power and are excluded.
pub fn allowed_child_permissions<P: AsRef<str>, C: AsRef<str>>(index: &PermissionIndex, parents: &[P], candidates: &[C]) -> Vec<String> {
    let ceiling = max_power(index, parents);
    candidates
        .iter()
        .map(AsRef::as_ref)
        .filter(|c| index.resolve(c).is_some_and(|p| p.power_level <= ceiling))
        .map(str::to_string)
        .collect()
}

/// Every permission of the structure under the parents' ceiling, in structure order
pub fn allowed_child_catalog<'a, P: AsRef<str>>(index: &'a PermissionIndex, parents: &[P]) -> Vec<&'a PermissionInfo> {
    let ceiling = max_power(index, parents);
    index.permissions().iter().filter(|p| p.power_level <= ceiling).collect()
}

/// The least powerful permission of the structure, first in structure order on ties.
/// Seeds a new role or module that must start with some access.
pub fn default_permission(index: &PermissionIndex) -> Option<&PermissionInfo> {
    index.permissions().iter().min_by_key(|p| p.power_level)
}

/// Per-child verdict against the parents' ceiling; unresolved children are omitted
pub fn validate_child_permissions<P: AsRef<str>, C: AsRef<str>>(index: &PermissionIndex, parents: &[P], children: &[C]) -> ChildValidation {
    let ceiling = max_power(index, parents);
    let validation_results: Vec<ChildCheck> = children
        .iter()
        .filter_map(|c| index.resolve(c.as_ref()).map(|p| (c.as_ref(), p)))
        .map(|(id, p)| {
            let is_allowed = p.power_level <= ceiling;
            ChildCheck {
                permission_id: id.to_string(),
                permission_name: p.display_name.clone(),
                power_level: p.power_level,
                is_allowed,
                reason: if is_allowed {
                    "Allowed".to_string()
                } else {
                    format!("Power level {} exceeds parent max {}", p.power_level, ceiling)
                },
            }
        })
        .collect();
    ChildValidation {
        max_parent_power: ceiling,
        all_allowed: validation_results.iter().all(|r| r.is_allowed),
        validation_results,
    }
}

/// True if the ids reach at least `required` power
pub fn can_access_power_level<S: AsRef<str>>(index: &PermissionIndex, ids: &[S], required: u8) -> bool {
    max_power(index, ids) >= required
}
