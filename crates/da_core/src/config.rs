//! Rule domains for a matching run and for lottery generation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction in which grade cohorts are processed.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GradeOrder {
    Ascending,
    Descending,
}

impl Default for GradeOrder {
    /// School systems fill the highest entry grades first.
    fn default() -> Self {
        GradeOrder::Descending
    }
}

/// Policy switches for one matching run. Each switch that requires an input
/// table (siblings, links) is validated against the provided frames when the
/// graph is built.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchRules {
    pub order: GradeOrder,
    /// Upgrade priority profiles at institutions where a sibling was already
    /// assigned in an earlier cohort.
    pub sibling_priority: bool,
    /// Move preferences at institutions holding an assigned linked applicant
    /// to the front of the list.
    pub linked_postulation: bool,
    /// Truncate preference lists at the declared secured-enrollment seat.
    pub secured_enrollment: bool,
    /// After each cohort, force applicants left without a seat into their
    /// secured-enrollment seat, over capacity if needed.
    pub forced_secured_enrollment: bool,
    /// After each special-type cohort, move unused special capacity into the
    /// regular queue of the same program.
    pub transfer_capacity: bool,
}

/// Granularity of multiple tie-break draws.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TieBreakLevel {
    /// One draw per (applicant, program), shared by the program's quotas.
    Program,
    /// An independent draw per (applicant, program, quota).
    Quota,
}

/// Tie-break regime. The level is only meaningful under `Multiple`, so the
/// domain makes the invalid combination unrepresentable.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TieBreak {
    /// One draw per applicant, copied to every application entry.
    Single,
    Multiple(TieBreakLevel),
}

/// Configuration of one lottery generation pass.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LotteryRules {
    pub tie_break: TieBreak,
    /// Propagate draws across same-grade siblings with an epsilon nudge.
    pub sibling_lottery: bool,
    /// Sole source of randomness for the run.
    pub seed: u64,
}

impl LotteryRules {
    pub fn new(tie_break: TieBreak, sibling_lottery: bool, seed: u64) -> Self {
        Self {
            tie_break,
            sibling_lottery,
            seed,
        }
    }
}
