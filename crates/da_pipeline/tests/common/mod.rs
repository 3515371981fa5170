//! Fixture builders shared by the integration suites.
#![allow(dead_code)]

use std::collections::BTreeMap;

use smol_str::SmolStr;

use da_core::frames::{
    ApplicantRow, ApplicationRow, PriorityProfileRow, SecuredEnrollment, SiblingRow, VacancyRow,
};
use da_core::ids::{
    ApplicantId, AssignmentType, GradeId, InstitutionId, ProfileId, ProgramId, QuotaId,
};

pub fn applicant_row(id: u64, grade: i32) -> ApplicantRow {
    ApplicantRow {
        applicant_id: ApplicantId::new(id),
        grade_id: GradeId::new(grade),
        special_assignment: AssignmentType::REGULAR,
        secured_enrollment: None,
        characteristics: BTreeMap::new(),
    }
}

pub fn secured(program: u32, quota: u32) -> Option<SecuredEnrollment> {
    Some(SecuredEnrollment {
        program_id: ProgramId::new(program),
        quota_id: QuotaId::new(quota),
    })
}

pub fn with_characteristic(mut row: ApplicantRow, name: &str, value: f64) -> ApplicantRow {
    row.characteristics.insert(SmolStr::new(name), value);
    row
}

pub struct App {
    pub applicant: u64,
    pub program: u32,
    pub institution: u32,
    pub ranking: u32,
    pub quota: u32,
    pub priority: u32,
    pub profile: u32,
    pub lottery: f64,
}

pub fn application_row(app: App) -> ApplicationRow {
    ApplicationRow {
        applicant_id: ApplicantId::new(app.applicant),
        program_id: ProgramId::new(app.program),
        institution_id: InstitutionId::new(app.institution),
        quota_id: QuotaId::new(app.quota),
        ranking_program: app.ranking,
        priority_number_quota: app.priority,
        priority_profile_program: ProfileId::new(app.profile),
        lottery_number_quota: Some(app.lottery),
        distance: None,
    }
}

/// Plain regular application with priority 0 and profile 1.
pub fn simple_app(applicant: u64, program: u32, ranking: u32, lottery: f64) -> ApplicationRow {
    application_row(App {
        applicant,
        program,
        institution: program,
        ranking,
        quota: 1,
        priority: 0,
        profile: 1,
        lottery,
    })
}

pub fn vacancy_row(
    program: u32,
    institution: u32,
    grade: i32,
    quota: u32,
    regular: u32,
    special: &[(u32, u32)],
) -> VacancyRow {
    VacancyRow {
        program_id: ProgramId::new(program),
        institution_id: InstitutionId::new(institution),
        grade_id: GradeId::new(grade),
        quota_id: QuotaId::new(quota),
        regular_vacancies: regular,
        special_vacancies: special
            .iter()
            .map(|&(ty, cap)| (AssignmentType::new(ty), cap))
            .collect(),
    }
}

pub fn profile_row(profile: u32, transition: u32, priorities: &[(u32, u32)]) -> PriorityProfileRow {
    PriorityProfileRow {
        priority_profile: ProfileId::new(profile),
        priority_profile_sibling_transition: ProfileId::new(transition),
        quota_priorities: priorities
            .iter()
            .map(|&(quota, priority)| (QuotaId::new(quota), priority))
            .collect(),
    }
}

pub fn sibling_row(applicant: u64, sibling: u64) -> SiblingRow {
    SiblingRow {
        applicant_id: ApplicantId::new(applicant),
        sibling_id: ApplicantId::new(sibling),
    }
}
