//! Typed rows for the tabular data contracts.
//!
//! External collaborators hand the engine rectangular tables; one struct here
//! corresponds to one row of each. Parsing CSV (or whatever carrier the
//! caller uses) into these rows is the collaborator's job; the engine only
//! validates and consumes them.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use smol_str::SmolStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::{
    ApplicantId, AssignmentType, GradeId, InstitutionId, ProfileId, ProgramId, QuotaId,
};

/// One applicant. `secured_enrollment` is `None` when the input column was
/// null or 0 (no guaranteed seat). Characteristic columns
/// (`applicant_characteristic_*`) arrive as a name → value bag.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApplicantRow {
    pub applicant_id: ApplicantId,
    pub grade_id: GradeId,
    pub special_assignment: AssignmentType,
    pub secured_enrollment: Option<SecuredEnrollment>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub characteristics: BTreeMap<SmolStr, f64>,
}

/// The applicant-declared guaranteed seat.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SecuredEnrollment {
    pub program_id: ProgramId,
    pub quota_id: QuotaId,
}

/// One application entry: applicant × (program, quota).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApplicationRow {
    pub applicant_id: ApplicantId,
    pub program_id: ProgramId,
    pub institution_id: InstitutionId,
    pub quota_id: QuotaId,
    /// Ordinal preference of the program (1 = most preferred).
    pub ranking_program: u32,
    pub priority_number_quota: u32,
    pub priority_profile_program: ProfileId,
    /// Supplied externally or filled in by the lottery generator.
    #[cfg_attr(feature = "serde", serde(default))]
    pub lottery_number_quota: Option<f64>,
    /// 0 marks an application the applicant actually filed; positive values
    /// mark entries imputed by distance.
    #[cfg_attr(feature = "serde", serde(default))]
    pub distance: Option<u32>,
}

/// One (program, quota) node with its seat counts. `special_vacancies` maps
/// the positive assignment types (columns `special_<i>_vacancies`) to their
/// capacities.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VacancyRow {
    pub program_id: ProgramId,
    pub institution_id: InstitutionId,
    pub grade_id: GradeId,
    pub quota_id: QuotaId,
    pub regular_vacancies: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub special_vacancies: BTreeMap<AssignmentType, u32>,
}

/// One priority profile: the profile it transitions to when sibling priority
/// activates, and the priority number it grants in each quota
/// (columns `priority_q<k>`).
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PriorityProfileRow {
    pub priority_profile: ProfileId,
    pub priority_profile_sibling_transition: ProfileId,
    pub quota_priorities: BTreeMap<QuotaId, u32>,
}

/// One quota-order rule row. Rows sharing a `priority_profile` are evaluated
/// in table order. Criteria cells stay as raw tokens here; they are parsed
/// (and rejected with a configuration error) when the table is unpacked.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuotaOrderRow {
    pub priority_profile: ProfileId,
    pub secured_enrollment_indicator: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub secured_enrollment_quota_id_criteria: Option<SmolStr>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub secured_enrollment_quota_id_value: Option<f64>,
    /// characteristic name → (criteria token, comparison value).
    #[cfg_attr(feature = "serde", serde(default))]
    pub characteristic_criteria: BTreeMap<SmolStr, (SmolStr, f64)>,
    /// quota id → rank (columns `order_q<k>`); lower rank proposes earlier.
    pub quota_order: BTreeMap<QuotaId, u32>,
}

/// One directed sibling edge.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SiblingRow {
    pub applicant_id: ApplicantId,
    pub sibling_id: ApplicantId,
}

/// One directed family-link edge.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkRow {
    pub applicant_id: ApplicantId,
    pub linked_id: ApplicantId,
}

/// One row of the final assignment table. Null program fields mean the
/// applicant finished unassigned.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AssignmentRow {
    pub applicant_id: ApplicantId,
    pub grade_id: GradeId,
    pub program_id: Option<ProgramId>,
    pub institution_id: Option<InstitutionId>,
    pub quota_id: Option<QuotaId>,
    pub assigned_score: Option<f64>,
    pub priority_profile: Option<ProfileId>,
}

/// Input bundle for a matching run. Optional tables may be omitted when the
/// switch that needs them is off.
#[derive(Clone, Debug, Default)]
pub struct MatchInputs {
    pub vacancies: Vec<VacancyRow>,
    pub applicants: Vec<ApplicantRow>,
    pub applications: Vec<ApplicationRow>,
    pub priority_profiles: Vec<PriorityProfileRow>,
    pub quota_order: Vec<QuotaOrderRow>,
    pub siblings: Option<Vec<SiblingRow>>,
    pub links: Option<Vec<LinkRow>>,
}

/// Input bundle for a lottery generation pass.
#[derive(Clone, Debug, Default)]
pub struct LotteryInputs {
    pub applicants: Vec<ApplicantRow>,
    pub applications: Vec<ApplicationRow>,
    pub siblings: Option<Vec<SiblingRow>>,
}
