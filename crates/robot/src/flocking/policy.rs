//! Policy — when a peer-table change triggers a flocking recompute.

use serde::{Deserialize, Serialize};

use crate::presence::TableChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecomputePolicy {
    /// Every accepted announce or departure; the target follows moving peers.
    #[default]
    EveryUpdate,
    /// Only when a peer joins or leaves. Targets go stale while peers move.
    MembershipChange,
}

impl RecomputePolicy {
    pub fn should_recompute(self, change: TableChange) -> bool {
        match self {
            RecomputePolicy::EveryUpdate => change != TableChange::Unchanged,
            RecomputePolicy::MembershipChange => change.is_membership_change(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_update_recomputes_on_moves() {
        let policy = RecomputePolicy::EveryUpdate;
        assert!(policy.should_recompute(TableChange::Joined));
        assert!(policy.should_recompute(TableChange::Moved));
        assert!(policy.should_recompute(TableChange::Departed));
        assert!(!policy.should_recompute(TableChange::Unchanged));
    }

    #[test]
    fn test_membership_change_ignores_moves() {
        let policy = RecomputePolicy::MembershipChange;
        assert!(policy.should_recompute(TableChange::Joined));
        assert!(!policy.should_recompute(TableChange::Moved));
        assert!(policy.should_recompute(TableChange::Departed));
        assert!(!policy.should_recompute(TableChange::Unchanged));
    }
}
