//! Canonical placement policies and the aliases accepted for each

/// Canonical memory placement policies the feature vector encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlacementPolicy {
    FirstTouch,
    Interleave,
    PreferredNode0,
    PreferredNode1,
}

/// Accepted spellings per policy, in one-hot column order
const ALIASES: [(PlacementPolicy, &[&str]); 4] = [
    (
        PlacementPolicy::FirstTouch,
        &["default", "first_touch", "first-touch", "firsttouch"],
    ),
    (
        PlacementPolicy::Interleave,
        &["interleave", "interleave_all", "interleave-all"],
    ),
    (
        PlacementPolicy::PreferredNode0,
        &["preferred_node0", "preferred_0", "preferred0", "preferred-0"],
    ),
    (
        PlacementPolicy::PreferredNode1,
        &["preferred_node1", "preferred_1", "preferred1", "preferred-1"],
    ),
];

impl PlacementPolicy {
    pub const ALL: [PlacementPolicy; 4] = [
        PlacementPolicy::FirstTouch,
        PlacementPolicy::Interleave,
        PlacementPolicy::PreferredNode0,
        PlacementPolicy::PreferredNode1,
    ];

    /// Resolve a free-form label (case and surrounding whitespace ignored)
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase();
        ALIASES
            .iter()
            .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
            .map(|(policy, _)| *policy)
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        ALIASES
            .iter()
            .find(|(policy, _)| policy == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }

    /// Flags in column order: first-touch, interleave, preferred_0, preferred_1
    pub fn one_hot(policy: Option<Self>) -> [u8; 4] {
        let mut flags = [0u8; 4];
        if let Some(policy) = policy {
            if let Some(slot) = Self::ALL.iter().position(|p| *p == policy) {
                flags[slot] = 1;
            }
        }
        flags
    }

    /// Command prefix that enforces the policy on the workload
    pub fn command_prefix(&self) -> Vec<String> {
        let args: &[&str] = match self {
            PlacementPolicy::FirstTouch => &[],
            PlacementPolicy::Interleave => &["numactl", "--interleave=all"],
            PlacementPolicy::PreferredNode0 => &["numactl", "--preferred=0"],
            PlacementPolicy::PreferredNode1 => &["numactl", "--preferred=1"],
        };
        args.iter().map(|s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(PlacementPolicy::parse("default"), Some(PlacementPolicy::FirstTouch));
        assert_eq!(PlacementPolicy::parse("  First-Touch "), Some(PlacementPolicy::FirstTouch));
        assert_eq!(PlacementPolicy::parse("INTERLEAVE_ALL"), Some(PlacementPolicy::Interleave));
        assert_eq!(PlacementPolicy::parse("preferred-0"), Some(PlacementPolicy::PreferredNode0));
        assert_eq!(PlacementPolicy::parse("preferred_node1"), Some(PlacementPolicy::PreferredNode1));
        assert_eq!(PlacementPolicy::parse("foo"), None);
        assert_eq!(PlacementPolicy::parse(""), None);
    }

    #[test]
    fn test_every_alias_round_trips_to_its_policy() {
        for policy in PlacementPolicy::ALL {
            for alias in policy.aliases() {
                assert_eq!(PlacementPolicy::parse(alias), Some(policy), "alias {}", alias);
            }
        }
    }

    #[test]
    fn test_one_hot_is_exclusive() {
        for policy in PlacementPolicy::ALL {
            let flags = PlacementPolicy::one_hot(Some(policy));
            assert_eq!(flags.iter().map(|f| *f as u32).sum::<u32>(), 1);
        }
        assert_eq!(PlacementPolicy::one_hot(PlacementPolicy::parse("foo")), [0, 0, 0, 0]);
        assert_eq!(
            PlacementPolicy::one_hot(Some(PlacementPolicy::Interleave)),
            [0, 1, 0, 0]
        );
    }

    #[test]
    fn test_command_prefix() {
        assert!(PlacementPolicy::FirstTouch.command_prefix().is_empty());
        assert_eq!(
            PlacementPolicy::PreferredNode1.command_prefix(),
            vec!["numactl", "--preferred=1"]
        );
    }
}
