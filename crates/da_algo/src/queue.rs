//! Bounded reject-queue for one (program, quota, assignment type) seat pool.
//!
//! The queue holds the currently admitted applicants with their combined
//! scores (`priority + lottery`, lower is better). Internal order is
//! irrelevant; admission decisions only ever look at the worst admitted
//! score, so a plain vector with a max scan is enough.

use alloc::vec::Vec;

use da_core::ids::ApplicantId;

/// Seat pool with a soft capacity. The deferred-acceptance engine decides
/// evictions; the queue itself never rejects an `add`.
#[derive(Clone, Debug, Default)]
pub struct SeatQueue {
    capacity: u32,
    original_capacity: u32,
    /// Seats admitted past capacity by forced secured enrollment.
    over_capacity: u32,
    assigned: Vec<(ApplicantId, f64)>,
    /// Set when unused capacity was moved out of this queue.
    pub transfer_capacity: bool,
    /// Set when this queue received capacity from another.
    pub receive_capacity: bool,
}

impl SeatQueue {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            original_capacity: capacity,
            over_capacity: 0,
            assigned: Vec::new(),
            transfer_capacity: false,
            receive_capacity: false,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn over_capacity(&self) -> u32 {
        self.over_capacity
    }

    pub fn assigned(&self) -> &[(ApplicantId, f64)] {
        &self.assigned
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Worst admitted combined score, with two sentinels: `0.0` while seats
    /// remain, and `+∞` when the pool has no seats at all. The zero sentinel
    /// cannot collide with a real score because lottery values exclude 0, so
    /// every combined score is strictly positive.
    pub fn cut_off_score(&self) -> f64 {
        if (self.assigned.len() as u32) < self.capacity {
            0.0
        } else if self.capacity == 0 {
            f64::INFINITY
        } else {
            let mut worst = f64::NEG_INFINITY;
            for &(_, score) in &self.assigned {
                if score > worst {
                    worst = score;
                }
            }
            worst
        }
    }

    /// Occupant currently sitting at the cut-off score, if any.
    pub fn cut_off_applicant(&self, cut_off: f64) -> Option<ApplicantId> {
        self.assigned
            .iter()
            .find(|&&(_, score)| score == cut_off)
            .map(|&(id, _)| id)
    }

    /// Admit without eviction. The engine only calls this when
    /// `cut_off_score()` signalled spare capacity (or deliberately over
    /// capacity for forced admissions).
    pub fn add(&mut self, applicant: ApplicantId, score: f64) {
        self.assigned.push((applicant, score));
    }

    /// Replace the ejected occupant in place with the incoming applicant.
    /// Returns false if the ejected applicant is not actually here.
    pub fn reassign(
        &mut self,
        incoming: ApplicantId,
        incoming_score: f64,
        ejected: ApplicantId,
    ) -> bool {
        match self.assigned.iter().position(|&(id, _)| id == ejected) {
            Some(slot) => {
                self.assigned[slot] = (incoming, incoming_score);
                true
            }
            None => false,
        }
    }

    /// True once the pool is at (or past) capacity.
    pub fn check_capacity(&self) -> bool {
        self.assigned.len() as u32 >= self.capacity
    }

    /// Shift capacity by `delta` seats (transfers between assignment-type
    /// pools). Never drops below zero.
    pub fn modify_capacity(&mut self, delta: i64) {
        let next = self.capacity as i64 + delta;
        self.capacity = if next < 0 { 0 } else { next as u32 };
    }

    pub fn modify_over_capacity(&mut self, delta: u32) {
        self.over_capacity += delta;
    }

    /// Clear assignments and restore the configured capacity.
    pub fn reset(&mut self) {
        self.assigned.clear();
        self.capacity = self.original_capacity;
        self.over_capacity = 0;
        self.transfer_capacity = false;
        self.receive_capacity = false;
    }
}
