//! Applicant-proposing deferred acceptance over one cohort.
//!
//! The engine drains a worklist of proposing applicants against the shared
//! program graph. Each proposal lands at the (program, quota) entry the
//! applicant's `option_n` points at; the seat queue for the applicant's
//! assignment type answers with its cut-off score and the four admission
//! cases fall out of it (spare capacity / closed pool / cut-off wins /
//! proposal wins).
//!
//! **Worklist order.** The worklist pops from the tail (LIFO). The deferred
//! acceptance fixed point does not depend on this, but waitlist timing and
//! intermediate states do, so tests pin the choice.
//!
//! An evicted incumbent is unmatched and pushed back with its `option_n`
//! preserved; it advances only when the scan itself rejects it (which, being
//! the old cut-off occupant, happens on its next pop, at which point it is
//! also recorded on the waitlist).

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use da_core::ids::{ApplicantId, ProgramKey};

use crate::applicant::Applicant;
use crate::errors::MatchError;
use crate::program::Program;

/// Run deferred acceptance for `cohort` (ids into `applicants`) against the
/// full program graph. Applicants outside the cohort are never touched;
/// program state mutates in place and persists into later cohorts.
pub fn run_cohort(
    cohort: &[ApplicantId],
    applicants: &mut BTreeMap<ApplicantId, Applicant>,
    programs: &mut BTreeMap<ProgramKey, Program>,
) -> Result<(), MatchError> {
    let mut worklist: Vec<ApplicantId> = cohort.to_vec();

    while let Some(id) = worklist.pop() {
        let mut evicted: Option<ApplicantId> = None;
        {
            let applicant = applicants
                .get_mut(&id)
                .ok_or(MatchError::UnknownApplicant { applicant: id })?;
            if applicant.is_matched() {
                continue;
            }
            let Some(&choice) = applicant.current_choice() else {
                // Only reachable with an empty preference list; nobody to
                // propose to means terminally unassigned.
                applicant.finalize_unassigned();
                continue;
            };
            let key = choice.key();
            let assignment_type = applicant.special_assignment();
            let program = programs
                .get_mut(&key)
                .ok_or(MatchError::UnknownProgram { applicant: id, key })?;
            let score = program.score_of(applicant)?;
            let queue =
                program
                    .queue_for_mut(assignment_type)
                    .ok_or(MatchError::MissingQueue {
                        key,
                        assignment_type,
                    })?;
            let cut_off = queue.cut_off_score();

            if cut_off == 0.0 {
                // Spare capacity.
                applicant.assign(key);
                queue.add(id, score);
            } else if cut_off.is_infinite() || cut_off <= score {
                // Closed pool, or the incumbent cut-off wins the tie.
                program.add_to_waitlist(id, score as u32);
                applicant.unmatch();
                applicant.advance();
                if applicant.has_remaining_choice() {
                    worklist.push(id);
                } else {
                    applicant.finalize_unassigned();
                }
            } else {
                // Proposal beats the cut-off occupant: swap them.
                let cut = queue
                    .cut_off_applicant(cut_off)
                    .ok_or(MatchError::CorruptQueue { key })?;
                if !queue.reassign(id, score, cut) {
                    return Err(MatchError::CorruptQueue { key });
                }
                applicant.assign(key);
                evicted = Some(cut);
            }
        }

        if let Some(evicted_id) = evicted {
            let incumbent = applicants
                .get_mut(&evicted_id)
                .ok_or(MatchError::UnknownApplicant {
                    applicant: evicted_id,
                })?;
            incumbent.unmatch();
            worklist.push(evicted_id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    use da_core::ids::{
        AssignmentType, GradeId, InstitutionId, ProfileId, ProgramId, QuotaId,
    };

    use crate::applicant::Preference;

    const QUOTA: u32 = 1;

    fn program(id: u32, capacity: u32) -> Program {
        Program::new(
            ProgramId::new(id),
            InstitutionId::new(id),
            GradeId::new(1),
            QuotaId::new(QUOTA),
            capacity,
            BTreeMap::new(),
        )
    }

    /// Applicant over `programs`, with per-program (priority, lottery).
    fn applicant(id: u64, entries: &[(u32, u32, f64)]) -> Applicant {
        let mut preferences = Vec::new();
        let mut scores = BTreeMap::new();
        let mut priorities = BTreeMap::new();
        let mut profiles = BTreeMap::new();
        for &(program, priority, lottery) in entries {
            let p = Preference {
                program: ProgramId::new(program),
                institution: InstitutionId::new(program),
                quota: QuotaId::new(QUOTA),
                distance: None,
            };
            preferences.push(p);
            scores.insert(p.key(), lottery);
            priorities.insert(p.key(), priority);
            profiles.insert(p.program, ProfileId::new(0));
        }
        Applicant::new(
            ApplicantId::new(id),
            GradeId::new(1),
            AssignmentType::REGULAR,
            Vec::new(),
            Vec::new(),
            None,
            BTreeMap::new(),
            preferences,
            scores,
            priorities,
            profiles,
        )
    }

    fn run(
        applicants: Vec<Applicant>,
        programs: Vec<Program>,
    ) -> (BTreeMap<ApplicantId, Applicant>, BTreeMap<ProgramKey, Program>) {
        let cohort: Vec<ApplicantId> = applicants.iter().map(|a| a.id()).collect();
        let mut applicants: BTreeMap<ApplicantId, Applicant> =
            applicants.into_iter().map(|a| (a.id(), a)).collect();
        let mut programs: BTreeMap<ProgramKey, Program> =
            programs.into_iter().map(|p| (p.key(), p)).collect();
        run_cohort(&cohort, &mut applicants, &mut programs).unwrap();
        (applicants, programs)
    }

    fn assigned_program(a: &Applicant) -> Option<u32> {
        a.assigned().map(|k| k.program.get())
    }

    #[test]
    fn better_lottery_wins_single_seat() {
        let (applicants, programs) = run(
            vec![
                applicant(1, &[(10, 0, 0.3)]),
                applicant(2, &[(10, 0, 0.7)]),
            ],
            vec![program(10, 1)],
        );
        assert_eq!(assigned_program(&applicants[&ApplicantId::new(1)]), Some(10));
        assert_eq!(assigned_program(&applicants[&ApplicantId::new(2)]), None);
        let loser = &applicants[&ApplicantId::new(2)];
        assert!(loser.is_matched(), "terminal state is matched-to-none");
        // The loser was rejected at priority 0.
        let key = ProgramKey::new(ProgramId::new(10), QuotaId::new(QUOTA));
        assert_eq!(programs[&key].waitlist()[&ApplicantId::new(2)], 0);
    }

    #[test]
    fn displaced_applicant_takes_second_choice() {
        let (applicants, _) = run(
            vec![
                applicant(1, &[(10, 0, 0.4), (20, 0, 0.4)]),
                applicant(2, &[(10, 0, 0.6), (20, 0, 0.6)]),
            ],
            vec![program(10, 1), program(20, 1)],
        );
        assert_eq!(assigned_program(&applicants[&ApplicantId::new(1)]), Some(10));
        assert_eq!(assigned_program(&applicants[&ApplicantId::new(2)]), Some(20));
        // The displaced applicant was rejected by their first choice only.
        assert_eq!(applicants[&ApplicantId::new(2)].option_n(), 1);
    }

    #[test]
    fn priority_dominates_lottery() {
        let (applicants, _) = run(
            vec![
                applicant(1, &[(10, 1, 0.9)]),
                applicant(2, &[(10, 10, 0.1)]),
            ],
            vec![program(10, 1)],
        );
        assert_eq!(assigned_program(&applicants[&ApplicantId::new(1)]), Some(10));
        assert_eq!(assigned_program(&applicants[&ApplicantId::new(2)]), None);
    }

    #[test]
    fn zero_capacity_rejects_everyone() {
        let (applicants, programs) = run(
            vec![applicant(1, &[(10, 0, 0.2)])],
            vec![program(10, 0)],
        );
        let a = &applicants[&ApplicantId::new(1)];
        assert!(a.is_matched() && a.assigned().is_none());
        let key = ProgramKey::new(ProgramId::new(10), QuotaId::new(QUOTA));
        assert_eq!(programs[&key].waitlist().len(), 1);
    }

    #[test]
    fn incumbent_wins_exact_tie() {
        // Equal combined scores: the seated applicant keeps the seat.
        // With LIFO pop, applicant 2 proposes first and is seated.
        let (applicants, _) = run(
            vec![
                applicant(1, &[(10, 0, 0.5)]),
                applicant(2, &[(10, 0, 0.5)]),
            ],
            vec![program(10, 1)],
        );
        assert_eq!(assigned_program(&applicants[&ApplicantId::new(2)]), Some(10));
        assert_eq!(assigned_program(&applicants[&ApplicantId::new(1)]), None);
    }

    #[test]
    fn missing_program_node_is_fatal() {
        let cohort = vec![ApplicantId::new(1)];
        let mut applicants: BTreeMap<ApplicantId, Applicant> =
            [(ApplicantId::new(1), applicant(1, &[(99, 0, 0.5)]))]
                .into_iter()
                .collect();
        let mut programs = BTreeMap::new();
        let err = run_cohort(&cohort, &mut applicants, &mut programs).unwrap_err();
        assert!(matches!(err, MatchError::UnknownProgram { .. }));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Random single-grade instances: every applicant ranks every
        /// program (in their own order) with arbitrary priorities/lotteries.
        fn instances() -> impl Strategy<
            Value = (Vec<Vec<(u32, u32, f64)>>, Vec<u32>),
        > {
            let programs = proptest::collection::vec(0u32..4, 1..4);
            programs.prop_flat_map(|capacities| {
                let n_programs = capacities.len();
                let entry = (0u32..3, 0.0f64..1.0).prop_map(|(priority, lottery)| {
                    // keep lotteries strictly inside (0,1)
                    (priority, lottery.max(1e-9).min(1.0 - 1e-9))
                });
                let per_applicant = proptest::collection::vec(entry, n_programs)
                    .prop_map(move |scores| {
                        scores
                            .iter()
                            .enumerate()
                            .map(|(i, &(priority, lottery))| (10 + i as u32, priority, lottery))
                            .collect::<Vec<_>>()
                    })
                    .prop_shuffle();
                (
                    proptest::collection::vec(per_applicant, 1..12),
                    Just(capacities),
                )
            })
        }

        proptest! {
            #[test]
            fn stable_and_capacity_respecting((cohort_entries, capacities) in instances()) {
                let programs: Vec<Program> = capacities
                    .iter()
                    .enumerate()
                    .map(|(i, &c)| program(10 + i as u32, c))
                    .collect();
                let applicants: Vec<Applicant> = cohort_entries
                    .iter()
                    .enumerate()
                    .map(|(i, entries)| applicant(1 + i as u64, entries))
                    .collect();
                let (applicants, programs) = run(applicants, programs);

                // Capacity respect: nothing exceeds its seat count.
                for p in programs.values() {
                    let q = p.queue_for(AssignmentType::REGULAR).unwrap();
                    prop_assert!(q.len() as u32 <= q.capacity());
                }

                // Stability: no applicant strictly prefers a pool that would
                // admit them over their final outcome.
                for a in applicants.values() {
                    prop_assert!(a.is_matched());
                    for preferred in &a.preferences()[..a.option_n()] {
                        let key = preferred.key();
                        let q = programs[&key].queue_for(AssignmentType::REGULAR).unwrap();
                        let cut_off = q.cut_off_score();
                        let score = a.postulation_score(key).unwrap()
                            + a.priority(key).unwrap() as f64;
                        prop_assert!(cut_off != 0.0, "spare seat left at a preferred pool");
                        prop_assert!(
                            cut_off.is_infinite() || cut_off <= score,
                            "blocking pair at {key}"
                        );
                    }
                    // The final option points at the assignment itself.
                    if let Some(assigned) = a.assigned() {
                        prop_assert_eq!(a.preferences()[a.option_n()].key(), assigned);
                    }
                }
            }
        }
    }
}
