//! One (program, quota) node of the matching graph: seat queues per
//! assignment type, capacity transfers, forced secured-enrollment admission,
//! and the rejection waitlist.

use alloc::collections::BTreeMap;

use da_core::ids::{ApplicantId, AssignmentType, GradeId, InstitutionId, ProgramId, ProgramKey, QuotaId};

use crate::applicant::Applicant;
use crate::errors::MatchError;
use crate::queue::SeatQueue;

/// A matching entity. Programs offering N quota types appear as N values of
/// this struct, all sharing `program_id` and differing in `quota_id`.
#[derive(Clone, Debug)]
pub struct Program {
    program_id: ProgramId,
    institution_id: InstitutionId,
    grade_id: GradeId,
    quota_id: QuotaId,
    regular: SeatQueue,
    special: BTreeMap<AssignmentType, SeatQueue>,
    /// Operational history for the run; reporting reads these.
    pub transfer_capacity: bool,
    pub receive_capacity: bool,
    pub over_capacity: bool,
    /// Rejections seen this run: applicant → priority number at rejection.
    /// Later rejections overwrite earlier ones.
    waitlist: BTreeMap<ApplicantId, u32>,
}

impl Program {
    pub fn new(
        program_id: ProgramId,
        institution_id: InstitutionId,
        grade_id: GradeId,
        quota_id: QuotaId,
        regular_capacity: u32,
        special_capacities: BTreeMap<AssignmentType, u32>,
    ) -> Self {
        let special = special_capacities
            .into_iter()
            .map(|(ty, capacity)| (ty, SeatQueue::new(capacity)))
            .collect();
        Self {
            program_id,
            institution_id,
            grade_id,
            quota_id,
            regular: SeatQueue::new(regular_capacity),
            special,
            transfer_capacity: false,
            receive_capacity: false,
            over_capacity: false,
            waitlist: BTreeMap::new(),
        }
    }

    pub fn program_id(&self) -> ProgramId {
        self.program_id
    }

    pub fn institution_id(&self) -> InstitutionId {
        self.institution_id
    }

    pub fn grade_id(&self) -> GradeId {
        self.grade_id
    }

    pub fn quota_id(&self) -> QuotaId {
        self.quota_id
    }

    pub fn key(&self) -> ProgramKey {
        ProgramKey::new(self.program_id, self.quota_id)
    }

    /// Combined score of `applicant` here: integer priority plus the
    /// lottery-backed postulation score.
    pub fn score_of(&self, applicant: &Applicant) -> Result<f64, MatchError> {
        let key = self.key();
        let missing = MatchError::MissingScore {
            applicant: applicant.id(),
            key,
        };
        let score = applicant.postulation_score(key).ok_or(missing)?;
        let priority = applicant.priority(key).ok_or(missing)?;
        Ok(score + priority as f64)
    }

    pub fn queue_for(&self, assignment_type: AssignmentType) -> Option<&SeatQueue> {
        if assignment_type.is_regular() {
            Some(&self.regular)
        } else {
            self.special.get(&assignment_type)
        }
    }

    pub fn queue_for_mut(&mut self, assignment_type: AssignmentType) -> Option<&mut SeatQueue> {
        if assignment_type.is_regular() {
            Some(&mut self.regular)
        } else {
            self.special.get_mut(&assignment_type)
        }
    }

    pub fn special_assignment_types(&self) -> impl Iterator<Item = AssignmentType> + '_ {
        self.special.keys().copied()
    }

    /// Free the unused seats of the given assignment-type queue: shrink its
    /// capacity down to its assigned count and return the freed seats.
    /// Returns 0 when the queue filled up (or does not exist).
    pub fn get_capacity_to_transfer(&mut self, from: AssignmentType) -> u32 {
        let Some(queue) = self.queue_for_mut(from) else {
            return 0;
        };
        if queue.check_capacity() {
            return 0;
        }
        let freed = queue.capacity() - queue.len() as u32;
        queue.transfer_capacity = true;
        queue.modify_capacity(-(freed as i64));
        self.transfer_capacity = true;
        freed
    }

    /// Grow the regular queue by seats freed elsewhere.
    pub fn transfer_capacity(&mut self, seats: u32) {
        self.receive_capacity = true;
        self.regular.receive_capacity = true;
        self.regular.modify_capacity(seats as i64);
    }

    /// Admit the applicant into their cohort queue regardless of capacity
    /// (secured enrollment), and clear them from the waitlist. The caller is
    /// responsible for marking the applicant matched.
    pub fn force_se_match(&mut self, applicant: &Applicant) -> Result<(), MatchError> {
        self.over_capacity = true;
        let score = self.score_of(applicant)?;
        let key = self.key();
        let queue = self
            .queue_for_mut(applicant.special_assignment())
            .ok_or(MatchError::MissingQueue {
                key,
                assignment_type: applicant.special_assignment(),
            })?;
        queue.modify_over_capacity(1);
        queue.add(applicant.id(), score);
        self.waitlist.remove(&applicant.id());
        Ok(())
    }

    /// Record a rejection at the given priority number (the integer part of
    /// the combined score). Last write wins.
    pub fn add_to_waitlist(&mut self, applicant: ApplicantId, priority: u32) {
        self.waitlist.insert(applicant, priority);
    }

    pub fn waitlist(&self) -> &BTreeMap<ApplicantId, u32> {
        &self.waitlist
    }

    /// Clear all matching state; capacities return to their input values.
    pub fn reset(&mut self) {
        self.transfer_capacity = false;
        self.receive_capacity = false;
        self.over_capacity = false;
        self.regular.reset();
        for queue in self.special.values_mut() {
            queue.reset();
        }
        self.waitlist.clear();
    }
}
