//! `CrossProviderAggregation` (§4.6): roll `CostResult.breakdown` entries up
//! into daily or monthly buckets, summed per provider. Requires every input
//! result to share one currency (§3, §9 "Currency") — mixing is rejected
//! rather than silently summed.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use pulumicost_domain::{provider_of, Aggregation, CostResult, RollupGroupBy};

use crate::EngineError;

pub fn cross_provider_aggregation(
    results: &[CostResult],
    group_by: RollupGroupBy,
) -> Result<Vec<Aggregation>, EngineError> {
    let currencies: BTreeSet<&str> = results.iter().map(|r| r.currency.as_str()).collect();
    if currencies.len() > 1 {
        return Err(EngineError::MixedCurrencies(currencies.into_iter().map(String::from).collect()));
    }
    let currency = currencies.into_iter().next().unwrap_or("USD").to_string();

    let mut buckets: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for result in results {
        let provider = provider_of(&result.resource_type, None);
        for (date, amount) in &result.breakdown {
            let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| EngineError::InvalidDateRange(format!("unparseable breakdown date: {:?}", date)))?;
            let period = match group_by {
                RollupGroupBy::Daily => parsed.format("%Y-%m-%d").to_string(),
                RollupGroupBy::Monthly => parsed.format("%Y-%m").to_string(),
            };
            *buckets.entry(period).or_default().entry(provider.clone()).or_default() += amount;
        }
    }

    Ok(buckets
        .into_iter()
        .map(|(period, providers)| {
            let total = providers.values().sum();
            Aggregation { period, total, currency: currency.clone(), providers }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumicost_domain::Confidence;

    fn result(resource_type: &str, currency: &str, breakdown: &[(&str, f64)]) -> CostResult {
        CostResult {
            resource_type: resource_type.to_string(),
            resource_id: "urn:x".to_string(),
            adapter: "aws".to_string(),
            currency: currency.to_string(),
            monthly: 0.0,
            hourly: 0.0,
            total_cost: Some(breakdown.iter().map(|(_, v)| v).sum()),
            cost_period: None,
            notes: Vec::new(),
            breakdown: breakdown.iter().map(|(d, v)| (d.to_string(), *v)).collect(),
            confidence: Confidence::High,
        }
    }

    #[test]
    fn mixed_currencies_are_rejected() {
        let results = vec![
            result("aws:ec2/instance:Instance", "USD", &[("2026-01-01", 1.0)]),
            result("azure:compute/vm:VirtualMachine", "EUR", &[("2026-01-01", 1.0)]),
        ];
        let err = cross_provider_aggregation(&results, RollupGroupBy::Daily).unwrap_err();
        assert!(matches!(err, EngineError::MixedCurrencies(_)));
    }

    #[test]
    fn daily_rollup_groups_by_provider_and_sorts_chronologically() {
        let results = vec![
            result("aws:ec2/instance:Instance", "USD", &[("2026-01-02", 3.0), ("2026-01-01", 1.0)]),
            result("azure:compute/vm:VirtualMachine", "USD", &[("2026-01-01", 2.0)]),
        ];
        let agg = cross_provider_aggregation(&results, RollupGroupBy::Daily).unwrap();
        assert_eq!(agg.len(), 2);
        assert_eq!(agg[0].period, "2026-01-01");
        assert_eq!(agg[1].period, "2026-01-02");
        assert_eq!(agg[0].total, 3.0);
        assert_eq!(agg[0].providers.get("aws"), Some(&1.0));
        assert_eq!(agg[0].providers.get("azure"), Some(&2.0));
    }

    #[test]
    fn monthly_rollup_merges_days_into_one_bucket() {
        let results = vec![result(
            "aws:ec2/instance:Instance",
            "USD",
            &[("2026-01-01", 1.0), ("2026-01-31", 2.0)],
        )];
        let agg = cross_provider_aggregation(&results, RollupGroupBy::Monthly).unwrap();
        assert_eq!(agg.len(), 1);
        assert_eq!(agg[0].period, "2026-01");
        assert_eq!(agg[0].total, 3.0);
    }

    #[test]
    fn malformed_breakdown_date_is_rejected() {
        let results = vec![result("aws:ec2/instance:Instance", "USD", &[("not-a-date", 1.0)])];
        let err = cross_provider_aggregation(&results, RollupGroupBy::Daily).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDateRange(_)));
    }
}
