//! Quota-order table: per-profile predicate rules that rewrite the order in
//! which an applicant proposes to a program's quotas.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use da_core::criteria::Criterion;
use da_core::frames::QuotaOrderRow;
use da_core::ids::{ProfileId, QuotaId};

use crate::PipelineError;

/// One rule row, predicates parsed. Rules for a profile are evaluated in
/// table order; the first row whose predicates all match supplies the quota
/// order and ends the scan for that program.
#[derive(Clone, Debug)]
pub struct QuotaRule {
    /// The rule only applies when (applicant's secured program == the
    /// program under rewrite) equals this flag.
    pub se_indicator: bool,
    /// Additional test on the secured quota id; present whenever
    /// `se_indicator` is set.
    pub se_quota_criterion: Option<(Criterion, f64)>,
    /// Every characteristic predicate must hold.
    pub characteristic_criteria: Vec<(SmolStr, Criterion, f64)>,
    /// Quota ids by ascending `order_q<k>` rank.
    pub ordered_quotas: Vec<QuotaId>,
}

/// Unpacked `quota_order` frame, keyed by priority profile.
#[derive(Clone, Debug, Default)]
pub struct QuotaOrderTable {
    rules: BTreeMap<ProfileId, Vec<QuotaRule>>,
}

impl QuotaOrderTable {
    pub fn from_rows(rows: &[QuotaOrderRow]) -> Result<Self, PipelineError> {
        let mut table = Self::default();
        for row in rows {
            let profile = row.priority_profile;

            let se_quota_criterion = match (
                &row.secured_enrollment_quota_id_criteria,
                row.secured_enrollment_quota_id_value,
            ) {
                (Some(token), Some(value)) => Some((parse_criterion(token, profile)?, value)),
                _ if row.secured_enrollment_indicator => {
                    return Err(PipelineError::Config(format!(
                        "quota-order rule for profile {profile} sets the secured-enrollment \
                         indicator but has no quota-id criterion"
                    )));
                }
                _ => None,
            };

            let mut characteristic_criteria = Vec::with_capacity(row.characteristic_criteria.len());
            for (name, (token, value)) in &row.characteristic_criteria {
                characteristic_criteria.push((name.clone(), parse_criterion(token, profile)?, *value));
            }

            // order_q<k> ranks → quota sequence; ties keep ascending quota id.
            let mut ranked: Vec<(u32, QuotaId)> = row
                .quota_order
                .iter()
                .map(|(&quota, &rank)| (rank, quota))
                .collect();
            ranked.sort();

            table.rules.entry(profile).or_default().push(QuotaRule {
                se_indicator: row.secured_enrollment_indicator,
                se_quota_criterion,
                characteristic_criteria,
                ordered_quotas: ranked.into_iter().map(|(_, q)| q).collect(),
            });
        }
        Ok(table)
    }

    /// Rules declared for `profile`, in table order.
    pub fn rules_for(&self, profile: ProfileId) -> Option<&[QuotaRule]> {
        self.rules.get(&profile).map(|r| r.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_criterion(token: &SmolStr, profile: ProfileId) -> Result<Criterion, PipelineError> {
    token.parse().map_err(|_| {
        PipelineError::Config(format!(
            "quota-order rule for profile {profile} holds an invalid criterion token '{token}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(profile: u32, se: bool, ranks: &[(u32, u32)]) -> QuotaOrderRow {
        QuotaOrderRow {
            priority_profile: ProfileId::new(profile),
            secured_enrollment_indicator: se,
            secured_enrollment_quota_id_criteria: se.then(|| SmolStr::new("==")),
            secured_enrollment_quota_id_value: se.then_some(1.0),
            characteristic_criteria: BTreeMap::new(),
            quota_order: ranks
                .iter()
                .map(|&(q, rank)| (QuotaId::new(q), rank))
                .collect(),
        }
    }

    #[test]
    fn ranks_become_ordered_quotas() {
        let table =
            QuotaOrderTable::from_rows(&[row(5, false, &[(1, 3), (2, 1), (3, 2)])]).unwrap();
        let rules = table.rules_for(ProfileId::new(5)).unwrap();
        let order: Vec<u32> = rules[0].ordered_quotas.iter().map(|q| q.get()).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn rows_keep_table_order_per_profile() {
        let table = QuotaOrderTable::from_rows(&[
            row(5, false, &[(1, 1), (2, 2)]),
            row(5, true, &[(2, 1), (1, 2)]),
        ])
        .unwrap();
        let rules = table.rules_for(ProfileId::new(5)).unwrap();
        assert_eq!(rules.len(), 2);
        assert!(!rules[0].se_indicator && rules[1].se_indicator);
    }

    #[test]
    fn se_rule_without_criterion_is_a_config_error() {
        let mut bad = row(5, true, &[(1, 1)]);
        bad.secured_enrollment_quota_id_criteria = None;
        bad.secured_enrollment_quota_id_value = None;
        assert!(matches!(
            QuotaOrderTable::from_rows(&[bad]),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn bad_token_is_a_config_error() {
        let mut bad = row(5, false, &[(1, 1)]);
        bad.characteristic_criteria
            .insert(SmolStr::new("applicant_characteristic_income"), (SmolStr::new("~"), 1.0));
        assert!(matches!(
            QuotaOrderTable::from_rows(&[bad]),
            Err(PipelineError::Config(_))
        ));
    }
}
