//! Error types for the algorithm layer.
//!
//! Everything here is fatal to the run: the engine never retries, and every
//! variant names the offending applicant or program so the caller can point
//! at the broken input row.

use core::fmt;

use da_core::ids::{ApplicantId, AssignmentType, ProfileId, ProgramId, ProgramKey, QuotaId};

/// Fatal condition raised while matching a cohort or rewriting applicant
/// state between rounds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchError {
    /// A cohort id has no applicant behind it.
    UnknownApplicant { applicant: ApplicantId },
    /// A preference entry references a (program, quota) node absent from the
    /// program graph.
    UnknownProgram {
        applicant: ApplicantId,
        key: ProgramKey,
    },
    /// The applicant holds no score or priority for a (program, quota) pair
    /// that appears in their preference list.
    MissingScore {
        applicant: ApplicantId,
        key: ProgramKey,
    },
    /// A program has no seat queue for the applicant's assignment type.
    MissingQueue {
        key: ProgramKey,
        assignment_type: AssignmentType,
    },
    /// A seat queue's bookkeeping disagrees with itself (cut-off occupant
    /// not found where one must exist).
    CorruptQueue { key: ProgramKey },
    /// An applicant declared a secured-enrollment program that is not in
    /// their preference list.
    SecuredProgramNotInPreferences {
        applicant: ApplicantId,
        program: ProgramId,
    },
    /// A priority-profile transition or per-quota priority is missing from
    /// the profile table.
    UnknownProfile {
        applicant: ApplicantId,
        profile: ProfileId,
        quota: QuotaId,
    },
    /// A quota-order rule lists a quota set that cannot be mapped onto the
    /// applicant's entries for the program.
    InvalidQuotaOrder {
        applicant: ApplicantId,
        program: ProgramId,
    },
    /// A quota-order predicate tests a characteristic the applicant does not
    /// carry.
    UnknownCharacteristic { applicant: ApplicantId },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::UnknownApplicant { applicant } => {
                write!(f, "cohort references unknown applicant {applicant}")
            }
            MatchError::UnknownProgram { applicant, key } => {
                write!(f, "applicant {applicant}: no program node {key} in the graph")
            }
            MatchError::MissingScore { applicant, key } => {
                write!(f, "applicant {applicant}: no score/priority for {key}")
            }
            MatchError::MissingQueue {
                key,
                assignment_type,
            } => {
                write!(f, "program {key}: no queue for assignment type {assignment_type}")
            }
            MatchError::CorruptQueue { key } => {
                write!(f, "program {key}: seat queue state is inconsistent")
            }
            MatchError::SecuredProgramNotInPreferences { applicant, program } => {
                write!(
                    f,
                    "applicant {applicant}: secured program {program} absent from preferences"
                )
            }
            MatchError::UnknownProfile {
                applicant,
                profile,
                quota,
            } => {
                write!(
                    f,
                    "applicant {applicant}: profile table has no entry for profile {profile} / quota {quota}"
                )
            }
            MatchError::InvalidQuotaOrder { applicant, program } => {
                write!(
                    f,
                    "applicant {applicant}: quota order does not cover their entries at program {program}"
                )
            }
            MatchError::UnknownCharacteristic { applicant } => {
                write!(f, "applicant {applicant}: unknown characteristic in quota-order predicate")
            }
        }
    }
}

/// Fatal condition raised while generating lottery numbers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LotteryError {
    /// Sibling propagation was requested without a siblings table.
    SiblingsTableRequired,
    /// An application row references an applicant missing from the
    /// applicants table.
    UnknownApplicant { applicant: ApplicantId },
    /// A sibling edge points at someone with no applications; propagation
    /// has nowhere to write.
    UnknownSibling {
        applicant: ApplicantId,
        sibling: ApplicantId,
    },
}

impl fmt::Display for LotteryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LotteryError::SiblingsTableRequired => {
                write!(f, "sibling lottery is on but no siblings table was provided")
            }
            LotteryError::UnknownApplicant { applicant } => {
                write!(f, "application references unknown applicant {applicant}")
            }
            LotteryError::UnknownSibling { applicant, sibling } => {
                write!(
                    f,
                    "sibling edge {applicant} -> {sibling} points outside the applications table"
                )
            }
        }
    }
}
