//! Priority-profile table: sibling transitions and per-quota priorities.

use std::collections::BTreeMap;

use da_algo::ProfileTransitions;
use da_core::frames::PriorityProfileRow;
use da_core::ids::{ProfileId, QuotaId};

/// Unpacked `priority_profiles` frame. Duplicate profile rows keep the last
/// occurrence, matching the tabular semantics of a keyed lookup.
#[derive(Clone, Debug, Default)]
pub struct ProfileTable {
    transitions: BTreeMap<ProfileId, ProfileId>,
    priorities: BTreeMap<ProfileId, BTreeMap<QuotaId, u32>>,
}

impl ProfileTable {
    pub fn from_rows(rows: &[PriorityProfileRow]) -> Self {
        let mut table = Self::default();
        for row in rows {
            table
                .transitions
                .insert(row.priority_profile, row.priority_profile_sibling_transition);
            table
                .priorities
                .insert(row.priority_profile, row.quota_priorities.clone());
        }
        table
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl ProfileTransitions for ProfileTable {
    fn sibling_transition(&self, from: ProfileId) -> Option<ProfileId> {
        self.transitions.get(&from).copied()
    }

    fn priority(&self, profile: ProfileId, quota: QuotaId) -> Option<u32> {
        self.priorities.get(&profile)?.get(&quota).copied()
    }
}
