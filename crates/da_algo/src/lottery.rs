//! Lottery tie-break generation.
//!
//! Before matching, every application entry needs a `lottery_number_quota`
//! in (0, 1). Draws happen in a deterministic order (applicants ascending
//! by id, each applicant's programs by (ranking, program id), quotas sorted)
//! so a seed pins the entire table. Any lottery values already present in
//! the input are ignored and overwritten.
//!
//! Draws cover the full (global) quota list for every (applicant, program)
//! pair, and the output keeps only the quotas actually applied to. This
//! keeps sibling propagation aligned per quota id even when two siblings
//! applied to different quota subsets of the same program.
//!
//! **Sibling propagation.** When enabled, a fresh draw is pushed through the
//! sibling graph: a sibling in the same grade whose target values are still
//! unset receives the base draw plus an epsilon-scale perturbation, and the
//! walk continues from them (always carrying the base draw, so every sibling
//! is perturbed relative to the originator). The walk stops at siblings in
//! other grades, without the program in question, or already drawn.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use da_core::config::{LotteryRules, TieBreak, TieBreakLevel};
use da_core::frames::{ApplicationRow, LotteryInputs};
use da_core::ids::{ApplicantId, GradeId, ProgramId, QuotaId};
use da_core::rng::LotteryRng;

use crate::errors::LotteryError;

/// Draw state for one (applicant, program) pair: one value per quota in the
/// global quota list. 0.0 marks an undrawn slot (real draws exclude 0).
type QuotaValues = Vec<f64>;

#[derive(Clone, Debug)]
struct ApplicantDraws {
    grade: GradeId,
    /// Programs in proposal order: ranking ascending, program id breaking ties.
    order: Vec<ProgramId>,
    values: BTreeMap<ProgramId, QuotaValues>,
}

impl ApplicantDraws {
    fn any_unset(&self) -> bool {
        self.values.values().any(|vs| vs.iter().any(|&v| v == 0.0))
    }
}

/// One lottery generation pass over an applications table.
#[derive(Clone, Debug)]
pub struct Lottery {
    rules: LotteryRules,
    rng: LotteryRng,
    /// All quota ids seen in the table, ascending.
    quotas: Vec<QuotaId>,
    draws: BTreeMap<ApplicantId, ApplicantDraws>,
    siblings: BTreeMap<ApplicantId, Vec<ApplicantId>>,
}

impl Lottery {
    pub fn new(inputs: &LotteryInputs, rules: LotteryRules) -> Result<Self, LotteryError> {
        let grades: BTreeMap<ApplicantId, GradeId> = inputs
            .applicants
            .iter()
            .map(|a| (a.applicant_id, a.grade_id))
            .collect();

        let mut quotas: Vec<QuotaId> = Vec::new();
        for row in &inputs.applications {
            if let Err(slot) = quotas.binary_search(&row.quota_id) {
                quotas.insert(slot, row.quota_id);
            }
        }

        // (applicant, program) → ranking, keeping the best ranking when a
        // program repeats across quota rows.
        let mut rankings: BTreeMap<ApplicantId, BTreeMap<ProgramId, u32>> = BTreeMap::new();
        for row in &inputs.applications {
            let grade = grades.get(&row.applicant_id);
            if grade.is_none() {
                return Err(LotteryError::UnknownApplicant {
                    applicant: row.applicant_id,
                });
            }
            let per_program = rankings.entry(row.applicant_id).or_default();
            per_program
                .entry(row.program_id)
                .and_modify(|r| *r = (*r).min(row.ranking_program))
                .or_insert(row.ranking_program);
        }

        let mut draws: BTreeMap<ApplicantId, ApplicantDraws> = BTreeMap::new();
        for (applicant, per_program) in rankings {
            let mut order: Vec<(u32, ProgramId)> = per_program
                .iter()
                .map(|(&program, &ranking)| (ranking, program))
                .collect();
            order.sort();
            draws.insert(
                applicant,
                ApplicantDraws {
                    grade: grades[&applicant],
                    order: order.into_iter().map(|(_, p)| p).collect(),
                    values: per_program
                        .keys()
                        .map(|&p| (p, vec_of_zeros(quotas.len())))
                        .collect(),
                },
            );
        }

        let siblings = if rules.sibling_lottery {
            let edges = inputs
                .siblings
                .as_deref()
                .ok_or(LotteryError::SiblingsTableRequired)?;
            let mut map: BTreeMap<ApplicantId, Vec<ApplicantId>> = BTreeMap::new();
            for edge in edges {
                map.entry(edge.applicant_id).or_default().push(edge.sibling_id);
            }
            for list in map.values_mut() {
                list.sort();
                list.dedup();
            }
            // Any edge reachable from an active applicant must land on an
            // active applicant, or propagation has nowhere to write.
            for (&applicant, list) in &map {
                if !draws.contains_key(&applicant) {
                    continue;
                }
                for &sibling in list {
                    if !draws.contains_key(&sibling) {
                        return Err(LotteryError::UnknownSibling { applicant, sibling });
                    }
                }
            }
            map
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            rng: LotteryRng::from_seed_u64(rules.seed),
            rules,
            quotas,
            draws,
            siblings,
        })
    }

    pub fn quotas(&self) -> &[QuotaId] {
        &self.quotas
    }

    /// Drawn values for one (applicant, program), parallel to [`Self::quotas`].
    pub fn values(&self, applicant: ApplicantId, program: ProgramId) -> Option<&[f64]> {
        self.draws
            .get(&applicant)
            .and_then(|d| d.values.get(&program))
            .map(|v| v.as_slice())
    }

    /// Draw every lottery number. The tie-break routine is selected once
    /// from the rules and applied to all applicants in ascending id order.
    pub fn run(&mut self) {
        let ids: Vec<ApplicantId> = self.draws.keys().copied().collect();
        match self.rules.tie_break {
            TieBreak::Single => {
                for id in ids {
                    self.draw_single(id);
                }
            }
            TieBreak::Multiple(level) => {
                for id in ids {
                    self.draw_multiple(id, level);
                }
            }
        }
    }

    /// Copy the drawn values onto the application rows, preserving row order.
    pub fn output(&self, applications: &[ApplicationRow]) -> Vec<ApplicationRow> {
        applications
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.lottery_number_quota = self
                    .quotas
                    .binary_search(&row.quota_id)
                    .ok()
                    .and_then(|slot| {
                        self.values(row.applicant_id, row.program_id)
                            .map(|vs| vs[slot])
                    });
                row
            })
            .collect()
    }

    /// Clear every draw back to the unset state.
    pub fn reset(&mut self) {
        for draws in self.draws.values_mut() {
            for values in draws.values.values_mut() {
                values.iter_mut().for_each(|v| *v = 0.0);
            }
        }
    }

    fn draw_single(&mut self, id: ApplicantId) {
        let Some(draws) = self.draws.get(&id) else {
            return;
        };
        if !draws.any_unset() {
            return;
        }
        let grade = draws.grade;
        let value = self.rng.next_open01();
        if let Some(target) = self.draws.get_mut(&id) {
            for values in target.values.values_mut() {
                values.iter_mut().for_each(|v| *v = value);
            }
        }
        for sibling in self.siblings.get(&id).cloned().unwrap_or_default() {
            propagate_single(
                &mut self.draws,
                &self.siblings,
                &mut self.rng,
                sibling,
                grade,
                value,
            );
        }
    }

    fn draw_multiple(&mut self, id: ApplicantId, level: TieBreakLevel) {
        let Some(draws) = self.draws.get(&id) else {
            return;
        };
        let grade = draws.grade;
        let order = draws.order.clone();
        for program in order {
            let unset = self.draws[&id].values[&program].iter().any(|&v| v == 0.0);
            if !unset {
                continue;
            }
            let base: Vec<f64> = match level {
                TieBreakLevel::Program => {
                    let v = self.rng.next_open01();
                    vec_of(v, self.quotas.len())
                }
                TieBreakLevel::Quota => {
                    (0..self.quotas.len()).map(|_| self.rng.next_open01()).collect()
                }
            };
            if let Some(target) = self
                .draws
                .get_mut(&id)
                .and_then(|d| d.values.get_mut(&program))
            {
                target.copy_from_slice(&base);
            }
            for sibling in self.siblings.get(&id).cloned().unwrap_or_default() {
                propagate_multiple(
                    &mut self.draws,
                    &self.siblings,
                    &mut self.rng,
                    sibling,
                    program,
                    grade,
                    &base,
                );
            }
        }
    }
}

fn vec_of_zeros(n: usize) -> Vec<f64> {
    vec_of(0.0, n)
}

fn vec_of(value: f64, n: usize) -> Vec<f64> {
    let mut v = Vec::with_capacity(n);
    v.resize(n, value);
    v
}

/// Single-mode propagation: same grade and anything undrawn → the whole
/// application gets `base + δ`, then the walk continues with `base`.
fn propagate_single(
    draws: &mut BTreeMap<ApplicantId, ApplicantDraws>,
    siblings: &BTreeMap<ApplicantId, Vec<ApplicantId>>,
    rng: &mut LotteryRng,
    sibling: ApplicantId,
    grade: GradeId,
    base: f64,
) {
    let Some(target) = draws.get(&sibling) else {
        return;
    };
    if target.grade != grade || !target.any_unset() {
        return;
    }
    let delta = rng.jitter_unit();
    if let Some(target) = draws.get_mut(&sibling) {
        for values in target.values.values_mut() {
            values.iter_mut().for_each(|v| *v = base + delta);
        }
    }
    for next in siblings.get(&sibling).cloned().unwrap_or_default() {
        propagate_single(draws, siblings, rng, next, grade, base);
    }
}

/// Multiple-mode propagation: same grade, same program, still undrawn →
/// per-quota `base + δ`, then the walk continues with `base`.
fn propagate_multiple(
    draws: &mut BTreeMap<ApplicantId, ApplicantDraws>,
    siblings: &BTreeMap<ApplicantId, Vec<ApplicantId>>,
    rng: &mut LotteryRng,
    sibling: ApplicantId,
    program: ProgramId,
    grade: GradeId,
    base: &[f64],
) {
    let Some(target) = draws.get(&sibling) else {
        return;
    };
    if target.grade != grade {
        return;
    }
    let Some(values) = target.values.get(&program) else {
        return;
    };
    if !values.iter().any(|&v| v == 0.0) {
        return;
    }
    let delta = rng.jitter_wide();
    if let Some(values) = draws.get_mut(&sibling).and_then(|d| d.values.get_mut(&program)) {
        for (slot, v) in values.iter_mut().enumerate() {
            *v = base[slot] + delta;
        }
    }
    for next in siblings.get(&sibling).cloned().unwrap_or_default() {
        propagate_multiple(draws, siblings, rng, next, program, grade, base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    use da_core::frames::{ApplicantRow, SiblingRow};
    use da_core::ids::{AssignmentType, InstitutionId, ProfileId};

    fn applicant_row(id: u64, grade: i32) -> ApplicantRow {
        ApplicantRow {
            applicant_id: ApplicantId::new(id),
            grade_id: GradeId::new(grade),
            special_assignment: AssignmentType::REGULAR,
            secured_enrollment: None,
            characteristics: BTreeMap::new(),
        }
    }

    fn application_row(applicant: u64, program: u32, ranking: u32, quota: u32) -> ApplicationRow {
        ApplicationRow {
            applicant_id: ApplicantId::new(applicant),
            program_id: ProgramId::new(program),
            institution_id: InstitutionId::new(program),
            quota_id: QuotaId::new(quota),
            ranking_program: ranking,
            priority_number_quota: 0,
            priority_profile_program: ProfileId::new(1),
            lottery_number_quota: None,
            distance: None,
        }
    }

    fn two_programs_two_quotas(applicant: u64) -> Vec<ApplicationRow> {
        vec![
            application_row(applicant, 10, 1, 1),
            application_row(applicant, 10, 1, 2),
            application_row(applicant, 20, 2, 1),
            application_row(applicant, 20, 2, 2),
        ]
    }

    fn rules(tie_break: TieBreak, sibling_lottery: bool, seed: u64) -> LotteryRules {
        LotteryRules::new(tie_break, sibling_lottery, seed)
    }

    fn drawn(inputs: &LotteryInputs, r: LotteryRules) -> Vec<ApplicationRow> {
        let mut lottery = Lottery::new(inputs, r).unwrap();
        lottery.run();
        lottery.output(&inputs.applications)
    }

    #[test]
    fn single_mode_copies_one_draw_everywhere() {
        let inputs = LotteryInputs {
            applicants: vec![applicant_row(1, 1)],
            applications: two_programs_two_quotas(1),
            siblings: None,
        };
        let rows = drawn(&inputs, rules(TieBreak::Single, false, 7));
        let values: Vec<f64> = rows.iter().map(|r| r.lottery_number_quota.unwrap()).collect();
        assert!(values.iter().all(|&v| v > 0.0 && v < 1.0));
        assert!(values.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn program_mode_varies_by_program_only() {
        let inputs = LotteryInputs {
            applicants: vec![applicant_row(1, 1)],
            applications: two_programs_two_quotas(1),
            siblings: None,
        };
        let rows = drawn(
            &inputs,
            rules(TieBreak::Multiple(TieBreakLevel::Program), false, 7),
        );
        assert_eq!(rows[0].lottery_number_quota, rows[1].lottery_number_quota);
        assert_eq!(rows[2].lottery_number_quota, rows[3].lottery_number_quota);
        assert_ne!(rows[0].lottery_number_quota, rows[2].lottery_number_quota);
    }

    #[test]
    fn quota_mode_draws_independently() {
        let inputs = LotteryInputs {
            applicants: vec![applicant_row(1, 1)],
            applications: two_programs_two_quotas(1),
            siblings: None,
        };
        let rows = drawn(
            &inputs,
            rules(TieBreak::Multiple(TieBreakLevel::Quota), false, 7),
        );
        let values: Vec<f64> = rows.iter().map(|r| r.lottery_number_quota.unwrap()).collect();
        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                assert_ne!(values[i], values[j]);
            }
        }
    }

    #[test]
    fn same_seed_reproduces_the_table() {
        let inputs = LotteryInputs {
            applicants: vec![applicant_row(1, 1), applicant_row(2, 1)],
            applications: [two_programs_two_quotas(1), two_programs_two_quotas(2)].concat(),
            siblings: None,
        };
        let r = rules(TieBreak::Multiple(TieBreakLevel::Quota), false, 2021);
        assert_eq!(drawn(&inputs, r), drawn(&inputs, r));
        let other = rules(TieBreak::Multiple(TieBreakLevel::Quota), false, 2022);
        assert_ne!(drawn(&inputs, r), drawn(&inputs, other));
    }

    #[test]
    fn siblings_same_grade_land_within_epsilon() {
        let inputs = LotteryInputs {
            applicants: vec![applicant_row(1, 1), applicant_row(2, 1), applicant_row(3, 1)],
            applications: [
                two_programs_two_quotas(1),
                two_programs_two_quotas(2),
                two_programs_two_quotas(3),
            ]
            .concat(),
            siblings: Some(vec![
                SiblingRow {
                    applicant_id: ApplicantId::new(1),
                    sibling_id: ApplicantId::new(2),
                },
                // Transitive chain: 2 → 3.
                SiblingRow {
                    applicant_id: ApplicantId::new(2),
                    sibling_id: ApplicantId::new(3),
                },
            ]),
        };
        let rows = drawn(&inputs, rules(TieBreak::Single, true, 99));
        let value_of = |id: u64| {
            rows.iter()
                .find(|r| r.applicant_id == ApplicantId::new(id))
                .unwrap()
                .lottery_number_quota
                .unwrap()
        };
        let (a, b, c) = (value_of(1), value_of(2), value_of(3));
        assert!((a - b).abs() < 1.0e-9 && (a - c).abs() < 1.0e-9);
        assert_ne!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn sibling_in_other_grade_draws_independently() {
        let inputs = LotteryInputs {
            applicants: vec![applicant_row(1, 1), applicant_row(2, 2)],
            applications: [two_programs_two_quotas(1), two_programs_two_quotas(2)].concat(),
            siblings: Some(vec![SiblingRow {
                applicant_id: ApplicantId::new(1),
                sibling_id: ApplicantId::new(2),
            }]),
        };
        let rows = drawn(&inputs, rules(TieBreak::Single, true, 5));
        let a = rows[0].lottery_number_quota.unwrap();
        let b = rows[4].lottery_number_quota.unwrap();
        assert!((a - b).abs() > 1.0e-9);
    }

    #[test]
    fn sibling_lottery_without_table_is_a_config_error() {
        let inputs = LotteryInputs {
            applicants: vec![applicant_row(1, 1)],
            applications: two_programs_two_quotas(1),
            siblings: None,
        };
        assert!(matches!(
            Lottery::new(&inputs, rules(TieBreak::Single, true, 1)),
            Err(LotteryError::SiblingsTableRequired)
        ));
    }

    #[test]
    fn reset_clears_draws() {
        let inputs = LotteryInputs {
            applicants: vec![applicant_row(1, 1)],
            applications: two_programs_two_quotas(1),
            siblings: None,
        };
        let mut lottery = Lottery::new(&inputs, rules(TieBreak::Single, false, 1)).unwrap();
        lottery.run();
        lottery.reset();
        assert!(lottery
            .values(ApplicantId::new(1), ProgramId::new(10))
            .unwrap()
            .iter()
            .all(|&v| v == 0.0));
    }
}
