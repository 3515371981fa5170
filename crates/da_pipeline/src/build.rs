//! Graph construction: validate the input frames and turn them into the
//! applicant and program maps the rounds run against.

use std::collections::{BTreeMap, BTreeSet};

use da_algo::{Applicant, Preference, Program};
use da_core::config::{GradeOrder, MatchRules};
use da_core::frames::{ApplicationRow, LinkRow, MatchInputs, SiblingRow, VacancyRow};
use da_core::ids::{ApplicantId, AssignmentType, GradeId, ProgramKey};

use crate::PipelineError;

/// Program graph: one node per (program, quota) vacancy row. A duplicate
/// (program, quota) row is an input contradiction.
pub fn build_programs(
    vacancies: &[VacancyRow],
) -> Result<BTreeMap<ProgramKey, Program>, PipelineError> {
    let mut programs = BTreeMap::new();
    for row in vacancies {
        let key = ProgramKey::new(row.program_id, row.quota_id);
        let program = Program::new(
            row.program_id,
            row.institution_id,
            row.grade_id,
            row.quota_id,
            row.regular_vacancies,
            row.special_vacancies.clone(),
        );
        if programs.insert(key, program).is_some() {
            return Err(PipelineError::Invariant(format!(
                "vacancies table defines program node {key} twice"
            )));
        }
    }
    Ok(programs)
}

/// Assignment types to iterate per grade: the special types declared by the
/// vacancies table ascending, then the regular cohort last.
pub fn assignment_types(vacancies: &[VacancyRow]) -> Vec<AssignmentType> {
    let mut types: BTreeSet<AssignmentType> = vacancies
        .iter()
        .flat_map(|row| row.special_vacancies.keys().copied())
        .collect();
    types.remove(&AssignmentType::REGULAR);
    types.into_iter().chain([AssignmentType::REGULAR]).collect()
}

/// Distinct applicant grades in processing order.
pub fn ordered_grades(
    applicants: &BTreeMap<ApplicantId, Applicant>,
    order: GradeOrder,
) -> Vec<GradeId> {
    let grades: BTreeSet<GradeId> = applicants.values().map(|a| a.grade()).collect();
    match order {
        GradeOrder::Ascending => grades.into_iter().collect(),
        GradeOrder::Descending => grades.into_iter().rev().collect(),
    }
}

/// Applicant graph: join the applicants, applications, and edge frames.
pub fn build_applicants(
    inputs: &MatchInputs,
    rules: &MatchRules,
) -> Result<BTreeMap<ApplicantId, Applicant>, PipelineError> {
    let siblings = edge_map(
        inputs.siblings.as_deref().map(sibling_edges),
        rules.sibling_priority,
        "sibling_priority",
        "siblings",
    )?;
    let links = edge_map(
        inputs.links.as_deref().map(link_edges),
        rules.linked_postulation,
        "linked_postulation",
        "links",
    )?;

    let known: BTreeSet<ApplicantId> =
        inputs.applicants.iter().map(|a| a.applicant_id).collect();
    let mut grouped: BTreeMap<ApplicantId, Vec<&ApplicationRow>> = BTreeMap::new();
    for row in &inputs.applications {
        if !known.contains(&row.applicant_id) {
            return Err(PipelineError::Referential(format!(
                "applications table references unknown applicant {}",
                row.applicant_id
            )));
        }
        grouped.entry(row.applicant_id).or_default().push(row);
    }

    let mut applicants = BTreeMap::new();
    for row in &inputs.applicants {
        let id = row.applicant_id;
        let Some(mut applications) = grouped.remove(&id) else {
            return Err(PipelineError::Invariant(format!(
                "applicant {id} has no rows in the applications table"
            )));
        };
        // Proposal order: program ranking first, quota id inside a program.
        // Quota-order rules may rewrite the quota sequence before each round.
        applications.sort_by_key(|a| (a.ranking_program, a.quota_id, a.program_id));

        let mut preferences = Vec::with_capacity(applications.len());
        let mut scores = BTreeMap::new();
        let mut priorities = BTreeMap::new();
        let mut profiles = BTreeMap::new();
        for application in applications {
            let key = ProgramKey::new(application.program_id, application.quota_id);
            let lottery = application.lottery_number_quota.ok_or_else(|| {
                PipelineError::Invariant(format!(
                    "applicant {id}: application to {key} has no lottery number"
                ))
            })?;
            if !(lottery > 0.0 && lottery < 1.0) {
                return Err(PipelineError::Invariant(format!(
                    "applicant {id}: lottery number {lottery} at {key} outside (0,1)"
                )));
            }
            preferences.push(Preference {
                program: application.program_id,
                institution: application.institution_id,
                quota: application.quota_id,
                distance: application.distance,
            });
            scores.insert(key, lottery);
            priorities.insert(key, application.priority_number_quota);
            profiles.insert(application.program_id, application.priority_profile_program);
        }

        applicants.insert(
            id,
            Applicant::new(
                id,
                row.grade_id,
                row.special_assignment,
                siblings.get(&id).cloned().unwrap_or_default(),
                links.get(&id).cloned().unwrap_or_default(),
                row.secured_enrollment,
                row.characteristics.clone(),
                preferences,
                scores,
                priorities,
                profiles,
            ),
        );
    }
    Ok(applicants)
}

fn sibling_edges(rows: &[SiblingRow]) -> Vec<(ApplicantId, ApplicantId)> {
    rows.iter().map(|r| (r.applicant_id, r.sibling_id)).collect()
}

fn link_edges(rows: &[LinkRow]) -> Vec<(ApplicantId, ApplicantId)> {
    rows.iter().map(|r| (r.applicant_id, r.linked_id)).collect()
}

fn edge_map(
    edges: Option<Vec<(ApplicantId, ApplicantId)>>,
    required: bool,
    switch: &str,
    table: &str,
) -> Result<BTreeMap<ApplicantId, Vec<ApplicantId>>, PipelineError> {
    let Some(edges) = edges else {
        if required {
            return Err(PipelineError::Config(format!(
                "{switch} is on but no {table} table was provided"
            )));
        }
        return Ok(BTreeMap::new());
    };
    let mut map: BTreeMap<ApplicantId, Vec<ApplicantId>> = BTreeMap::new();
    for (from, to) in edges {
        map.entry(from).or_default().push(to);
    }
    for list in map.values_mut() {
        list.sort();
        list.dedup();
    }
    Ok(map)
}
