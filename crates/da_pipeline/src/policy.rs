//! The policy maker: runs deferred acceptance once per (grade,
//! assignment-type) cohort and applies the between-round policies.
//!
//! Round order is grades (ascending or descending per the rules) × the
//! assignment types declared by the vacancies table, special types first,
//! regular last. Sibling and linked rewrites only activate from the second
//! grade onward, since they react to assignments made in earlier grades.

use std::collections::{BTreeMap, BTreeSet};

use da_algo::{run_cohort, Applicant, Program};
use da_core::config::MatchRules;
use da_core::frames::{AssignmentRow, MatchInputs};
use da_core::ids::{ApplicantId, AssignmentType, GradeId, InstitutionId, ProgramKey};

use crate::build::{assignment_types, build_applicants, build_programs, ordered_grades};
use crate::profiles::ProfileTable;
use crate::quota_order::QuotaOrderTable;
use crate::PipelineError;

/// Owns the applicant and program graphs for one run and drives the rounds.
pub struct PolicyMaker {
    rules: MatchRules,
    profile_table: ProfileTable,
    quota_order: QuotaOrderTable,
    applicants: BTreeMap<ApplicantId, Applicant>,
    programs: BTreeMap<ProgramKey, Program>,
    grades: Vec<GradeId>,
    assignment_types: Vec<AssignmentType>,
}

impl PolicyMaker {
    pub fn new(inputs: &MatchInputs, rules: MatchRules) -> Result<Self, PipelineError> {
        let profile_table = ProfileTable::from_rows(&inputs.priority_profiles);
        let quota_order = QuotaOrderTable::from_rows(&inputs.quota_order)?;
        let programs = build_programs(&inputs.vacancies)?;
        let applicants = build_applicants(inputs, &rules)?;
        let grades = ordered_grades(&applicants, rules.order);
        let assignment_types = assignment_types(&inputs.vacancies);
        Ok(Self {
            rules,
            profile_table,
            quota_order,
            applicants,
            programs,
            grades,
            assignment_types,
        })
    }

    pub fn applicants(&self) -> &BTreeMap<ApplicantId, Applicant> {
        &self.applicants
    }

    pub fn programs(&self) -> &BTreeMap<ProgramKey, Program> {
        &self.programs
    }

    pub fn grades(&self) -> &[GradeId] {
        &self.grades
    }

    pub fn assignment_types(&self) -> &[AssignmentType] {
        &self.assignment_types
    }

    /// Run every cohort in order. Program state accumulates across cohorts;
    /// applicants are only touched during their own cohort (and by forced
    /// secured enrollment right after it).
    pub fn run(&mut self) -> Result<(), PipelineError> {
        let grades = self.grades.clone();
        let types = self.assignment_types.clone();
        let first_grade = grades.first().copied();
        for &grade in &grades {
            for &assignment_type in &types {
                let first = first_grade == Some(grade);
                let cohort = self.prepare_cohort(grade, assignment_type, first)?;
                run_cohort(&cohort, &mut self.applicants, &mut self.programs)?;
                self.after_round(&cohort, grade, assignment_type)?;
            }
        }
        Ok(())
    }

    /// Final assignment table, one row per applicant in ascending id order.
    pub fn results(&self) -> Result<Vec<AssignmentRow>, PipelineError> {
        let mut rows = Vec::with_capacity(self.applicants.len());
        for applicant in self.applicants.values() {
            let row = match applicant.assigned() {
                None => AssignmentRow {
                    applicant_id: applicant.id(),
                    grade_id: applicant.grade(),
                    program_id: None,
                    institution_id: None,
                    quota_id: None,
                    assigned_score: None,
                    priority_profile: None,
                },
                Some(key) => {
                    let program = self.programs.get(&key).ok_or_else(|| {
                        PipelineError::Invariant(format!(
                            "assigned program node {key} missing from the graph"
                        ))
                    })?;
                    AssignmentRow {
                        applicant_id: applicant.id(),
                        grade_id: applicant.grade(),
                        program_id: Some(key.program),
                        institution_id: Some(program.institution_id()),
                        quota_id: Some(key.quota),
                        assigned_score: Some(program.score_of(applicant)?),
                        priority_profile: applicant.profile_at(key.program),
                    }
                }
            };
            rows.push(row);
        }
        Ok(rows)
    }

    /// Restore programs and applicants to their as-built state. Idempotent;
    /// a reset run reproduces the previous one.
    pub fn reset(&mut self) {
        for program in self.programs.values_mut() {
            program.reset();
        }
        for applicant in self.applicants.values_mut() {
            applicant.reset();
        }
    }

    // ----- per-cohort pre-processing -----

    fn prepare_cohort(
        &mut self,
        grade: GradeId,
        assignment_type: AssignmentType,
        first_grade: bool,
    ) -> Result<Vec<ApplicantId>, PipelineError> {
        let cohort: Vec<ApplicantId> = self
            .applicants
            .values()
            .filter(|a| a.grade() == grade && a.special_assignment() == assignment_type)
            .map(|a| a.id())
            .collect();

        if !first_grade && self.rules.sibling_priority {
            for &id in &cohort {
                self.apply_sibling_priority(id)?;
            }
        }
        if !first_grade && self.rules.linked_postulation {
            for &id in &cohort {
                self.apply_linked_reorder(id)?;
            }
        }
        for &id in &cohort {
            self.apply_quota_order(id)?;
        }
        if self.rules.secured_enrollment {
            for &id in &cohort {
                if let Some(applicant) = self.applicants.get_mut(&id) {
                    if applicant.secured().is_some() {
                        applicant.truncate_at_secured()?;
                    }
                }
            }
        }
        Ok(cohort)
    }

    /// Upgrade the applicant's priority profile at every institution where a
    /// sibling already holds a seat. Matches are collected as a sorted set,
    /// so a non-idempotent transition table still behaves reproducibly.
    fn apply_sibling_priority(&mut self, id: ApplicantId) -> Result<(), PipelineError> {
        let indexes: Vec<usize> = {
            let Some(applicant) = self.applicants.get(&id) else {
                return Ok(());
            };
            if applicant.siblings().is_empty() {
                return Ok(());
            }
            let institutions =
                self.assigned_institutions(id, applicant.siblings(), "sibling")?;
            applicant
                .preferences()
                .iter()
                .enumerate()
                .filter(|(_, p)| institutions.contains(&p.institution))
                .map(|(i, _)| i)
                .collect()
        };
        let table = &self.profile_table;
        if let Some(applicant) = self.applicants.get_mut(&id) {
            for index in indexes {
                applicant.upgrade_priority_profile(index, table)?;
            }
        }
        Ok(())
    }

    /// Move preference entries at institutions holding an assigned linked
    /// applicant to the front (original order inside each block). When the
    /// table carries distance data, only the entries the applicant actually
    /// filed (distance 0) move.
    fn apply_linked_reorder(&mut self, id: ApplicantId) -> Result<(), PipelineError> {
        let (order, linked_grades) = {
            let Some(applicant) = self.applicants.get(&id) else {
                return Ok(());
            };
            if applicant.links().is_empty() {
                return Ok(());
            }
            let mut institutions = BTreeSet::new();
            let mut grades = BTreeSet::new();
            for &linked_id in applicant.links() {
                let linked = self.applicants.get(&linked_id).ok_or_else(|| {
                    PipelineError::Referential(format!(
                        "applicant {id}: linked applicant {linked_id} is not an applicant"
                    ))
                })?;
                if !linked.is_matched() {
                    continue;
                }
                let Some(key) = linked.assigned() else {
                    continue;
                };
                let program = self.program(key)?;
                institutions.insert(program.institution_id());
                grades.insert(program.grade_id());
            }

            let preferences = applicant.preferences();
            let has_distance = preferences.iter().any(|p| p.distance.is_some());
            let front: Vec<usize> = preferences
                .iter()
                .enumerate()
                .filter(|(_, p)| {
                    institutions.contains(&p.institution)
                        && (!has_distance || p.distance.unwrap_or(0) == 0)
                })
                .map(|(i, _)| i)
                .collect();
            let order: Vec<usize> = front
                .iter()
                .copied()
                .chain((0..preferences.len()).filter(|i| !front.contains(i)))
                .collect();
            (order, grades.into_iter().collect::<Vec<_>>())
        };
        if let Some(applicant) = self.applicants.get_mut(&id) {
            applicant.reorder_preferences(linked_grades, &order);
        }
        Ok(())
    }

    /// Scan the quota-order rules for each program's profile in table order;
    /// the first rule whose predicates all match rewrites the applicant's
    /// quota sequence for that program, and the scan moves on.
    fn apply_quota_order(&mut self, id: ApplicantId) -> Result<(), PipelineError> {
        if self.quota_order.is_empty() {
            return Ok(());
        }
        let profile_map = match self.applicants.get(&id) {
            Some(a) => a.profiles().clone(),
            None => return Ok(()),
        };
        for (program, profile) in profile_map {
            let Some(rules) = self.quota_order.rules_for(profile) else {
                continue;
            };
            for rule in rules {
                let Some(applicant) = self.applicants.get(&id) else {
                    break;
                };
                let se_indicator = applicant
                    .secured()
                    .is_some_and(|se| se.program_id == program);
                if rule.se_indicator != se_indicator {
                    continue;
                }
                if se_indicator {
                    if let Some((criterion, value)) = rule.se_quota_criterion {
                        if !applicant.check_se_quota_criterion(criterion, value) {
                            continue;
                        }
                    }
                }
                let mut all_hold = true;
                for (name, criterion, value) in &rule.characteristic_criteria {
                    if !applicant.check_characteristic(name, *criterion, *value)? {
                        all_hold = false;
                        break;
                    }
                }
                if !all_hold {
                    continue;
                }
                if let Some(applicant) = self.applicants.get_mut(&id) {
                    applicant.reorder_quotas_for_program(program, &rule.ordered_quotas)?;
                }
                // First matching rule wins.
                break;
            }
        }
        Ok(())
    }

    // ----- per-cohort post-processing -----

    fn after_round(
        &mut self,
        cohort: &[ApplicantId],
        grade: GradeId,
        assignment_type: AssignmentType,
    ) -> Result<(), PipelineError> {
        if !assignment_type.is_regular() && self.rules.transfer_capacity {
            for program in self.programs.values_mut() {
                if program.grade_id() != grade {
                    continue;
                }
                let freed = program.get_capacity_to_transfer(assignment_type);
                if freed > 0 {
                    program.transfer_capacity(freed);
                }
            }
        }

        if self.rules.forced_secured_enrollment {
            for &id in cohort {
                let key = {
                    let Some(applicant) = self.applicants.get(&id) else {
                        continue;
                    };
                    let Some(se) = applicant.secured() else {
                        continue;
                    };
                    // Only applicants that exhausted their list without a
                    // seat; unmatched mid-states never survive a cohort.
                    if !applicant.is_matched() || applicant.assigned().is_some() {
                        continue;
                    }
                    ProgramKey::new(se.program_id, se.quota_id)
                };
                let applicant = self.applicants.get(&id).ok_or_else(|| {
                    PipelineError::Referential(format!("cohort references unknown applicant {id}"))
                })?;
                let program = self.programs.get_mut(&key).ok_or_else(|| {
                    PipelineError::Referential(format!(
                        "applicant {id}: secured program node {key} missing from the graph"
                    ))
                })?;
                program.force_se_match(applicant)?;
                if let Some(applicant) = self.applicants.get_mut(&id) {
                    applicant.assign(key);
                }
            }
        }
        Ok(())
    }

    // ----- helpers -----

    fn program(&self, key: ProgramKey) -> Result<&Program, PipelineError> {
        self.programs.get(&key).ok_or_else(|| {
            PipelineError::Invariant(format!("assigned program node {key} missing from the graph"))
        })
    }

    /// Institutions where any of `related` already holds a seat.
    fn assigned_institutions(
        &self,
        id: ApplicantId,
        related: &[ApplicantId],
        role: &str,
    ) -> Result<BTreeSet<InstitutionId>, PipelineError> {
        let mut institutions = BTreeSet::new();
        for &other_id in related {
            let other = self.applicants.get(&other_id).ok_or_else(|| {
                PipelineError::Referential(format!(
                    "applicant {id}: {role} {other_id} is not an applicant"
                ))
            })?;
            if !other.is_matched() {
                continue;
            }
            let Some(key) = other.assigned() else {
                continue;
            };
            institutions.insert(self.program(key)?.institution_id());
        }
        Ok(institutions)
    }
}
