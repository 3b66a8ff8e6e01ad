//! Default thresholds and action-name conventions

// Power band upper bounds (inclusive)
pub const LOW_MAX: u8 = 30;
pub const MEDIUM_MAX: u8 = 60;
pub const HIGH_MAX: u8 = 80;

// Highest power level an action may declare
pub const MAX_POWER_LEVEL: u8 = 100;

// Spread between highest and lowest selected power that counts as an anomaly
pub const POWER_GAP_THRESHOLD: u8 = 50;

// Size of the "most powerful permissions" list in an analysis
pub const TOP_PERMISSIONS: usize = 5;

// Categories that always mark an action as a "view" action
pub const VIEW_CATEGORIES: &[&str] = &["access"];

// Substrings of action key / display name that mark a "view" action
pub const VIEW_PATTERNS: &[&str] = &["view", "access", "read"];

// Separator in composite permission ids: "<node_id>:<action_key>"
pub const ID_SEPARATOR: char = ':';

// Recommendation texts, keyed off severities present in a conflict report
pub const RECOMMEND_DUPLICATES: &str = "Resolve duplicate permissions granted in the same context";
pub const RECOMMEND_POWER_GAPS: &str = "Review the power level gap between the selected permissions";
pub const RECOMMEND_TEMPLATES: &str = "Consider starting from a role template for consistent permission sets";

// Recommendations attached to every system-wide power analysis
pub const SYSTEM_RECOMMENDATIONS: &[&str] = &[
    "Regularly review high-power role assignments",
    "Monitor permission overlaps between roles",
    "Use role templates for consistent permission sets",
];
