//! Tool capabilities and dig time calculation.

use std::collections::BTreeMap;

/// Group ratings of a node or item, e.g. `cracky = 3`.
pub type ItemGroups = BTreeMap<String, i32>;

/// Rating of `group`, or 0 when the group is absent.
pub fn group_rating(groups: &ItemGroups, group: &str) -> i32 {
    groups.get(group).copied().unwrap_or(0)
}

/// What a tool can do against one node group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolGroupCap {
    /// Dig time in seconds per group rating.
    pub times: BTreeMap<i32, f32>,
    /// Number of uses before the tool breaks at `maxlevel`. 0 = no wear.
    pub uses: i32,
    /// Highest node `level` this tool can dig.
    pub maxlevel: i32,
}

impl ToolGroupCap {
    pub fn new(times: &[(i32, f32)], uses: i32, maxlevel: i32) -> Self {
        Self {
            times: times.iter().copied().collect(),
            uses,
            maxlevel,
        }
    }

    pub fn time(&self, rating: i32) -> Option<f32> {
        self.times.get(&rating).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCapabilities {
    pub full_punch_interval: f32,
    pub max_drop_level: i32,
    pub groupcaps: BTreeMap<String, ToolGroupCap>,
}

impl Default for ToolCapabilities {
    fn default() -> Self {
        Self {
            full_punch_interval: 1.4,
            max_drop_level: 1,
            groupcaps: BTreeMap::new(),
        }
    }
}

impl ToolCapabilities {
    pub fn with_groupcap(mut self, group: &str, cap: ToolGroupCap) -> Self {
        self.groupcaps.insert(group.to_string(), cap);
        self
    }
}

/// Result of matching a node's groups against a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct DigParams {
    pub diggable: bool,
    /// Seconds needed to dig.
    pub time: f32,
    /// Wear added to the tool, out of 65535.
    pub wear: u16,
    pub main_group: String,
}

impl DigParams {
    fn immediate(time: f32) -> Self {
        Self {
            diggable: true,
            time,
            wear: 0,
            main_group: "dig_immediate".to_string(),
        }
    }
}

/// Work out whether and how fast `tool` digs a node with `groups`.
///
/// `dig_immediate = 2` and `3` short-circuit to 0.5 s and instant digs.
/// Otherwise the fastest matching group capability wins; capabilities whose
/// `maxlevel` is below the node's `level` are skipped.
pub fn get_dig_params(groups: &ItemGroups, tool: &ToolCapabilities) -> DigParams {
    match group_rating(groups, "dig_immediate") {
        2 => return DigParams::immediate(0.5),
        3 => return DigParams::immediate(0.0),
        _ => {}
    }

    let level = group_rating(groups, "level");
    let mut result = DigParams {
        diggable: false,
        time: 0.0,
        wear: 0,
        main_group: String::new(),
    };
    let mut result_wear = 0.0f64;

    for (group, cap) in &tool.groupcaps {
        let leveldiff = cap.maxlevel - level;
        if leveldiff < 0 {
            continue;
        }
        let Some(mut time) = cap.time(group_rating(groups, group)) else {
            continue;
        };
        if leveldiff > 1 {
            time /= leveldiff as f32;
        }
        if !result.diggable || time < result.time {
            result.diggable = true;
            result.time = time;
            result_wear = if cap.uses != 0 {
                1.0 / cap.uses as f64 / 3f64.powi(leveldiff)
            } else {
                0.0
            };
            result.main_group = group.clone();
        }
    }

    result.wear = (65535.0 * result_wear) as u16;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(pairs: &[(&str, i32)]) -> ItemGroups {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn pick() -> ToolCapabilities {
        ToolCapabilities::default()
            .with_groupcap("cracky", ToolGroupCap::new(&[(1, 4.0), (2, 1.6), (3, 0.8)], 20, 1))
    }

    #[test]
    fn dig_immediate_shortcuts() {
        let tool = ToolCapabilities::default();
        let p = get_dig_params(&groups(&[("dig_immediate", 3)]), &tool);
        assert!(p.diggable);
        assert_eq!(p.time, 0.0);
        let p = get_dig_params(&groups(&[("dig_immediate", 2)]), &tool);
        assert_eq!(p.time, 0.5);
        assert_eq!(p.main_group, "dig_immediate");
    }

    #[test]
    fn matching_group_gives_time_and_wear() {
        let p = get_dig_params(&groups(&[("cracky", 3)]), &pick());
        assert!(p.diggable);
        assert_eq!(p.time, 0.8);
        assert_eq!(p.main_group, "cracky");
        // leveldiff 1: 1/20/3
        assert_eq!(p.wear, (65535.0 * (1.0 / 20.0 / 3.0)) as u16);
    }

    #[test]
    fn level_too_high_is_undiggable() {
        let p = get_dig_params(&groups(&[("cracky", 1), ("level", 2)]), &pick());
        assert!(!p.diggable);
    }

    #[test]
    fn unknown_rating_is_undiggable() {
        let p = get_dig_params(&groups(&[("crumbly", 3)]), &pick());
        assert!(!p.diggable);
        assert_eq!(p.wear, 0);
    }

    #[test]
    fn high_maxlevel_divides_time() {
        let tool = ToolCapabilities::default()
            .with_groupcap("cracky", ToolGroupCap::new(&[(1, 6.0)], 0, 3));
        let p = get_dig_params(&groups(&[("cracky", 1)]), &tool);
        assert_eq!(p.time, 2.0);
        assert_eq!(p.wear, 0);
    }

    #[test]
    fn fastest_group_wins() {
        let tool = pick().with_groupcap("crumbly", ToolGroupCap::new(&[(3, 0.3)], 0, 1));
        let p = get_dig_params(&groups(&[("cracky", 3), ("crumbly", 3)]), &tool);
        assert_eq!(p.main_group, "crumbly");
        assert_eq!(p.time, 0.3);
    }
}
