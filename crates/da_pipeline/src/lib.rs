//! da_pipeline — Round orchestration for the school-choice engine.
//!
//! Takes the tabular inputs (as typed frames from `da_core`), builds the
//! applicant and program graphs, and runs deferred acceptance once per
//! (grade, assignment-type) cohort, applying the between-round policies:
//! sibling priority upgrades, linked preference re-ranking, quota-order
//! rewrites, secured-enrollment truncation, capacity transfers, and forced
//! secured-enrollment admission.
//!
//! The whole pipeline is synchronous and strictly serial: every side effect
//! of cohort *k* (queue contents, transferred capacities, forced
//! admissions) is visible before cohort *k+1* starts.

#![forbid(unsafe_code)]

use thiserror::Error;

use da_algo::{LotteryError, MatchError};

pub mod build;
pub mod policy;
pub mod profiles;
pub mod quota_order;

pub use da_core::config::{GradeOrder, LotteryRules, MatchRules, TieBreak, TieBreakLevel};
pub use da_core::frames::{AssignmentRow, LotteryInputs, MatchInputs};
pub use policy::PolicyMaker;
pub use profiles::ProfileTable;
pub use quota_order::{QuotaOrderTable, QuotaRule};

/// Fatal pipeline error. Everything maps onto the three input-contract
/// failure kinds; the message names the offending applicant or program.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A rule switch needs a table or column that was not provided, or a
    /// table cell cannot be interpreted.
    #[error("configuration error: {0}")]
    Config(String),
    /// A row references an entity that does not exist.
    #[error("referential error: {0}")]
    Referential(String),
    /// The inputs contradict themselves (NaN scores, ragged groups, broken
    /// internal state).
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl From<MatchError> for PipelineError {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::UnknownApplicant { .. }
            | MatchError::UnknownProgram { .. }
            | MatchError::MissingQueue { .. }
            | MatchError::SecuredProgramNotInPreferences { .. } => {
                PipelineError::Referential(e.to_string())
            }
            MatchError::UnknownProfile { .. }
            | MatchError::InvalidQuotaOrder { .. }
            | MatchError::UnknownCharacteristic { .. } => PipelineError::Config(e.to_string()),
            MatchError::MissingScore { .. } | MatchError::CorruptQueue { .. } => {
                PipelineError::Invariant(e.to_string())
            }
        }
    }
}

impl From<LotteryError> for PipelineError {
    fn from(e: LotteryError) -> Self {
        match e {
            LotteryError::SiblingsTableRequired => PipelineError::Config(e.to_string()),
            LotteryError::UnknownApplicant { .. } | LotteryError::UnknownSibling { .. } => {
                PipelineError::Referential(e.to_string())
            }
        }
    }
}

/// One-shot matching run: build the graphs, run every cohort, return the
/// assignment table (one row per applicant).
pub fn run_match(
    inputs: &MatchInputs,
    rules: MatchRules,
) -> Result<Vec<AssignmentRow>, PipelineError> {
    let mut policy_maker = PolicyMaker::new(inputs, rules)?;
    policy_maker.run()?;
    policy_maker.results()
}

/// One-shot lottery generation: returns the applications table with
/// `lottery_number_quota` filled in.
pub fn run_lottery(
    inputs: &LotteryInputs,
    rules: LotteryRules,
) -> Result<Vec<da_core::frames::ApplicationRow>, PipelineError> {
    let mut lottery = da_algo::Lottery::new(inputs, rules)?;
    lottery.run();
    Ok(lottery.output(&inputs.applications))
}
