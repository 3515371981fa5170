//! Applicant state: preference records, per-(program, quota) scores and
//! priorities, and the dynamic re-ranking operations the round orchestrator
//! applies between cohorts.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use smol_str::SmolStr;

use da_core::criteria::Criterion;
use da_core::frames::SecuredEnrollment;
use da_core::ids::{
    ApplicantId, AssignmentType, GradeId, InstitutionId, ProfileId, ProgramId, ProgramKey,
    QuotaId,
};

use crate::errors::MatchError;

/// One preference entry. An applicant applying to N quotas of a program
/// carries N consecutive entries for it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Preference {
    pub program: ProgramId,
    pub institution: InstitutionId,
    pub quota: QuotaId,
    /// 0 for applications the applicant filed; positive for entries imputed
    /// by distance.
    pub distance: Option<u32>,
}

impl Preference {
    pub fn key(&self) -> ProgramKey {
        ProgramKey::new(self.program, self.quota)
    }
}

/// Source of priority-profile rewrites. The orchestrator's profile table
/// implements this; the applicant only needs the two lookups.
pub trait ProfileTransitions {
    /// Profile reached from `from` when a sibling match activates.
    fn sibling_transition(&self, from: ProfileId) -> Option<ProfileId>;
    /// Priority number granted by `profile` in `quota`.
    fn priority(&self, profile: ProfileId, quota: QuotaId) -> Option<u32>;
}

/// An applicant and their mutable matching state. Identity fields never
/// change; everything the run touches is restored by [`Applicant::reset`].
#[derive(Clone, Debug)]
pub struct Applicant {
    id: ApplicantId,
    grade: GradeId,
    special_assignment: AssignmentType,
    siblings: Vec<ApplicantId>,
    links: Vec<ApplicantId>,
    secured: Option<SecuredEnrollment>,
    characteristics: BTreeMap<SmolStr, f64>,

    original_preferences: Vec<Preference>,
    original_priorities: BTreeMap<ProgramKey, u32>,
    original_profiles: BTreeMap<ProgramId, ProfileId>,
    /// Lottery-backed postulation scores; fixed for the whole run.
    scores: BTreeMap<ProgramKey, f64>,

    preferences: Vec<Preference>,
    priorities: BTreeMap<ProgramKey, u32>,
    profiles: BTreeMap<ProgramId, ProfileId>,
    /// Index of the entry the applicant proposes to next.
    option_n: usize,
    matched: bool,
    assigned: Option<ProgramKey>,
    /// Parallel to `preferences`: true where a sibling rule raised priority.
    dynamic_priority: Vec<bool>,
    linked_reordered: bool,
    linked_grades: Vec<GradeId>,
    cut_postulation: bool,
}

impl Applicant {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ApplicantId,
        grade: GradeId,
        special_assignment: AssignmentType,
        siblings: Vec<ApplicantId>,
        links: Vec<ApplicantId>,
        secured: Option<SecuredEnrollment>,
        characteristics: BTreeMap<SmolStr, f64>,
        preferences: Vec<Preference>,
        scores: BTreeMap<ProgramKey, f64>,
        priorities: BTreeMap<ProgramKey, u32>,
        profiles: BTreeMap<ProgramId, ProfileId>,
    ) -> Self {
        let n = preferences.len();
        let mut applicant = Self {
            id,
            grade,
            special_assignment,
            siblings,
            links,
            secured,
            characteristics,
            original_preferences: preferences,
            original_priorities: priorities,
            original_profiles: profiles,
            scores,
            preferences: Vec::new(),
            priorities: BTreeMap::new(),
            profiles: BTreeMap::new(),
            option_n: 0,
            matched: false,
            assigned: None,
            dynamic_priority: Vec::with_capacity(n),
            linked_reordered: false,
            linked_grades: Vec::new(),
            cut_postulation: false,
        };
        applicant.reset();
        applicant
    }

    // ----- identity -----

    pub fn id(&self) -> ApplicantId {
        self.id
    }

    pub fn grade(&self) -> GradeId {
        self.grade
    }

    pub fn special_assignment(&self) -> AssignmentType {
        self.special_assignment
    }

    pub fn siblings(&self) -> &[ApplicantId] {
        &self.siblings
    }

    pub fn links(&self) -> &[ApplicantId] {
        &self.links
    }

    pub fn secured(&self) -> Option<SecuredEnrollment> {
        self.secured
    }

    // ----- matching state -----

    pub fn preferences(&self) -> &[Preference] {
        &self.preferences
    }

    pub fn option_n(&self) -> usize {
        self.option_n
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }

    pub fn assigned(&self) -> Option<ProgramKey> {
        self.assigned
    }

    pub fn dynamic_priority(&self) -> &[bool] {
        &self.dynamic_priority
    }

    pub fn linked_reordered(&self) -> bool {
        self.linked_reordered
    }

    pub fn linked_grades(&self) -> &[GradeId] {
        &self.linked_grades
    }

    pub fn cut_postulation(&self) -> bool {
        self.cut_postulation
    }

    /// Entry the applicant proposes to next, if any remain.
    pub fn current_choice(&self) -> Option<&Preference> {
        self.preferences.get(self.option_n)
    }

    pub fn postulation_score(&self, key: ProgramKey) -> Option<f64> {
        self.scores.get(&key).copied()
    }

    pub fn priority(&self, key: ProgramKey) -> Option<u32> {
        self.priorities.get(&key).copied()
    }

    pub fn profile_at(&self, program: ProgramId) -> Option<ProfileId> {
        self.profiles.get(&program).copied()
    }

    /// Current priority profile per program.
    pub fn profiles(&self) -> &BTreeMap<ProgramId, ProfileId> {
        &self.profiles
    }

    // ----- engine transitions -----

    pub fn assign(&mut self, key: ProgramKey) {
        self.matched = true;
        self.assigned = Some(key);
    }

    /// Rejected or evicted: back to proposing.
    pub fn unmatch(&mut self) {
        self.matched = false;
        self.assigned = None;
    }

    /// Exhausted every entry: terminally matched to no program.
    pub fn finalize_unassigned(&mut self) {
        self.matched = true;
        self.assigned = None;
    }

    pub fn advance(&mut self) {
        self.option_n += 1;
    }

    pub fn has_remaining_choice(&self) -> bool {
        self.option_n < self.preferences.len()
    }

    // ----- between-round rewrites -----

    /// Rewrite the priority profile behind preference entry `index` through
    /// the sibling transition, and refresh the stored priority number for
    /// that (program, quota).
    pub fn upgrade_priority_profile(
        &mut self,
        index: usize,
        table: &dyn ProfileTransitions,
    ) -> Result<(), MatchError> {
        let entry = self.preferences[index];
        let profile = self
            .profiles
            .get(&entry.program)
            .copied()
            .ok_or(MatchError::MissingScore {
                applicant: self.id,
                key: entry.key(),
            })?;
        let upgraded =
            table
                .sibling_transition(profile)
                .ok_or(MatchError::UnknownProfile {
                    applicant: self.id,
                    profile,
                    quota: entry.quota,
                })?;
        let priority =
            table
                .priority(upgraded, entry.quota)
                .ok_or(MatchError::UnknownProfile {
                    applicant: self.id,
                    profile: upgraded,
                    quota: entry.quota,
                })?;
        self.profiles.insert(entry.program, upgraded);
        self.priorities.insert(entry.key(), priority);
        self.dynamic_priority[index] = true;
        Ok(())
    }

    /// Apply a permutation to the preference vector (linked re-ranking).
    /// `order[i]` names the old index that moves to position `i`. The
    /// dynamic-priority flags travel with their entries.
    pub fn reorder_preferences(&mut self, linked_grades: Vec<GradeId>, order: &[usize]) {
        debug_assert_eq!(order.len(), self.preferences.len());
        self.linked_reordered = true;
        self.linked_grades = linked_grades;
        let mut preferences = Vec::with_capacity(order.len());
        let mut dynamic = Vec::with_capacity(order.len());
        for &old in order {
            preferences.push(self.preferences[old]);
            dynamic.push(self.dynamic_priority[old]);
        }
        self.preferences = preferences;
        self.dynamic_priority = dynamic;
    }

    /// Drop every entry after the last occurrence of the secured program, so
    /// the applicant cannot land worse than the guaranteed seat.
    pub fn truncate_at_secured(&mut self) -> Result<(), MatchError> {
        let secured = self.secured.ok_or(MatchError::SecuredProgramNotInPreferences {
            applicant: self.id,
            program: ProgramId::default(),
        })?;
        let last = self
            .preferences
            .iter()
            .rposition(|p| p.program == secured.program_id)
            .ok_or(MatchError::SecuredProgramNotInPreferences {
                applicant: self.id,
                program: secured.program_id,
            })?;
        self.cut_postulation = true;
        self.preferences.truncate(last + 1);
        self.dynamic_priority.truncate(last + 1);
        Ok(())
    }

    /// Rewrite the quota slots this applicant holds at `program` into the
    /// given order. When the applicant holds fewer quotas than the rule
    /// lists, the rule is intersected with the held set, preserving the
    /// rule's relative order.
    pub fn reorder_quotas_for_program(
        &mut self,
        program: ProgramId,
        ordered_quotas: &[QuotaId],
    ) -> Result<(), MatchError> {
        let slots: Vec<usize> = self
            .preferences
            .iter()
            .enumerate()
            .filter(|(_, p)| p.program == program)
            .map(|(i, _)| i)
            .collect();
        if slots.is_empty() {
            return Ok(());
        }
        if slots.len() == ordered_quotas.len() {
            for (&slot, &quota) in slots.iter().zip(ordered_quotas) {
                self.preferences[slot].quota = quota;
            }
            return Ok(());
        }
        let held: Vec<QuotaId> = slots.iter().map(|&i| self.preferences[i].quota).collect();
        let filtered: Vec<QuotaId> = ordered_quotas
            .iter()
            .copied()
            .filter(|q| held.contains(q))
            .collect();
        if filtered.len() != slots.len() {
            return Err(MatchError::InvalidQuotaOrder {
                applicant: self.id,
                program,
            });
        }
        for (&slot, &quota) in slots.iter().zip(&filtered) {
            self.preferences[slot].quota = quota;
        }
        Ok(())
    }

    // ----- predicate checks -----

    /// Compare the declared secured-enrollment quota id against a rule value.
    pub fn check_se_quota_criterion(&self, criterion: Criterion, value: f64) -> bool {
        match self.secured {
            Some(se) => criterion.holds(se.quota_id.get() as f64, value),
            None => false,
        }
    }

    /// Compare an applicant characteristic against a rule value.
    pub fn check_characteristic(
        &self,
        name: &str,
        criterion: Criterion,
        value: f64,
    ) -> Result<bool, MatchError> {
        let attr = self
            .characteristics
            .get(name)
            .copied()
            .ok_or(MatchError::UnknownCharacteristic { applicant: self.id })?;
        Ok(criterion.holds(attr, value))
    }

    // ----- lifecycle -----

    /// Restore every run-mutable field from the originals. Idempotent.
    pub fn reset(&mut self) {
        self.preferences = self.original_preferences.clone();
        self.priorities = self.original_priorities.clone();
        self.profiles = self.original_profiles.clone();
        self.option_n = 0;
        self.matched = false;
        self.assigned = None;
        self.dynamic_priority.clear();
        self.dynamic_priority
            .resize(self.original_preferences.len(), false);
        self.linked_reordered = false;
        self.linked_grades.clear();
        self.cut_postulation = false;
    }
}
