//! System-wide power analysis across roles

use serde::Serialize;

use crate::config::PowerBand;
use crate::conflict::find_role_overlaps;
use crate::constants::SYSTEM_RECOMMENDATIONS;
use crate::power::{PowerAnalysis, PowerDistribution};
use crate::role::Role;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RolePower {
    pub role_id: String,
    pub display_name: String,
    pub analysis: PowerAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemPowerAnalysis {
    pub total_roles: usize,
    pub overall_power_distribution: PowerDistribution,
    pub role_analysis: Vec<RolePower>,
    pub high_risk_roles: Vec<String>,
    pub potential_conflicts: Vec<String>,
    pub recommendations: Vec<String>,
}

pub fn system_power_analysis(snap: &Snapshot, roles: &[Role]) -> SystemPowerAnalysis {
    let bands = &snap.config().power_bands;
    let mut overall = PowerDistribution::default();
    let mut high_risk = Vec::new();
    let mut held = Vec::with_capacity(roles.len());
    let mut role_analysis = Vec::with_capacity(roles.len());

    for r in roles {
        let ids = r.selection().permission_ids();
        let analysis = snap.analyze(&ids).as_ref().clone();
        overall.merge(&analysis.power_distribution);
        if bands.classify(analysis.max_power) == PowerBand::Critical {
            high_risk.push(r.role_id.clone());
        }
        role_analysis.push(RolePower { role_id: r.role_id.clone(), display_name: r.display_name.clone(), analysis });
        held.push((r.role_id.as_str(), ids));
    }

    let potential_conflicts = find_role_overlaps(snap.index(), &held)
        .into_iter()
        .map(|c| c.description)
        .collect();

    SystemPowerAnalysis {
        total_roles: roles.len(),
        overall_power_distribution: overall,
        role_analysis,
        high_risk_roles: high_risk,
        potential_conflicts,
        recommendations: SYSTEM_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
    }
}
