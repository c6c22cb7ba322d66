//! Invariants of the feature pipeline over randomly generated sales series.

use chrono::{Days, NaiveDate};
use medicine_demand::features::build_series_features;
use medicine_demand::model::{Action, FeatureRow, FeatureVector, THRESHOLD};
use medicine_demand::{recommend_batch, recommend_one, DemandClassifier, Observation, Result};
use proptest::prelude::*;
use statrs::statistics::Statistics;

fn observations(sales: &[f64]) -> Vec<Observation> {
    let start = NaiveDate::from_ymd_opt(2014, 1, 2).unwrap();
    sales
        .iter()
        .enumerate()
        .map(|(i, &s)| Observation {
            medicine_id: "N02BE".to_string(),
            date: start + Days::new(i as u64),
            sales: s,
        })
        .collect()
}

/// Non-negative daily sales, like the reference dataset.
fn sales_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0..200.0_f64, min_len..max_len)
}

/// Squashes last_7d into [0, 1] so the ranking depends on the input.
struct Squash;

impl DemandClassifier for Squash {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
        Ok(features.last_7d / (1.0 + features.last_7d.abs()))
    }

    fn name(&self) -> &str {
        "squash"
    }
}

proptest! {
    #[test]
    fn output_length_is_series_length_minus_warm_up(sales in sales_strategy(30, 200)) {
        let obs = observations(&sales);
        let rows = build_series_features("N02BE", &obs);
        prop_assert_eq!(rows.len(), sales.len() - 29);
        prop_assert_eq!(rows[0].date, obs[29].date);
    }

    #[test]
    fn short_series_have_no_features(sales in sales_strategy(0, 30)) {
        let rows = build_series_features("N02BE", &observations(&sales));
        prop_assert!(rows.is_empty());
    }

    #[test]
    fn month_total_covers_week_total(sales in sales_strategy(30, 120)) {
        for row in build_series_features("N02BE", &observations(&sales)) {
            prop_assert!(row.last_30d + 1e-9 >= row.last_7d);
            prop_assert!(row.std_30d >= 0.0);
        }
    }

    #[test]
    fn features_match_direct_window_statistics(sales in sales_strategy(30, 150)) {
        let rows = build_series_features("N02BE", &observations(&sales));
        for (k, row) in rows.iter().enumerate() {
            let end = k + 30;
            let window = sales[end - 30..end].to_vec();
            let week: f64 = sales[end - 7..end].iter().sum();
            let month: f64 = window.iter().sum();

            prop_assert!((row.last_7d - week).abs() < 1e-6);
            prop_assert!((row.last_30d - month).abs() < 1e-6);
            prop_assert!((row.avg_30d - window.clone().mean()).abs() < 1e-8);
            prop_assert!((row.std_30d - window.std_dev()).abs() < 1e-6);
        }
    }

    #[test]
    fn batch_is_a_sorted_permutation(weeks in prop::collection::vec(0.0..500.0_f64, 0..20)) {
        let latest: Vec<FeatureRow> = weeks
            .iter()
            .enumerate()
            .map(|(i, &w)| FeatureRow {
                medicine_id: format!("M{:02}", i),
                date: NaiveDate::from_ymd_opt(2019, 10, 8).unwrap(),
                last_7d: w,
                last_30d: w * 4.0,
                avg_30d: w / 7.0,
                std_30d: 1.0,
            })
            .collect();

        let recs = recommend_batch(&latest, &Squash, THRESHOLD).unwrap();
        prop_assert_eq!(recs.len(), latest.len());
        for pair in recs.windows(2) {
            prop_assert!(pair[0].probability >= pair[1].probability);
        }

        let mut ids: Vec<String> = recs.iter().map(|r| r.medicine_id.clone()).collect();
        ids.sort();
        let mut expected: Vec<String> = latest.iter().map(|r| r.medicine_id.clone()).collect();
        expected.sort();
        prop_assert_eq!(ids, expected);

        for rec in &recs {
            prop_assert_eq!(rec.action == Action::IncreaseStock, rec.probability >= THRESHOLD);
        }
    }

    #[test]
    fn single_record_agrees_with_batch(w in 0.0..500.0_f64) {
        let row = FeatureRow {
            medicine_id: "R03".to_string(),
            date: NaiveDate::from_ymd_opt(2019, 10, 8).unwrap(),
            last_7d: w,
            last_30d: w * 4.0,
            avg_30d: w / 7.0,
            std_30d: 1.5,
        };
        let batch = recommend_batch(std::slice::from_ref(&row), &Squash, THRESHOLD).unwrap();
        let one = recommend_one("R03", &row.vector(), &Squash, THRESHOLD).unwrap();

        prop_assert!((batch[0].probability - one.probability).abs() <= 5e-5);
        prop_assert_eq!(batch[0].action, one.action);
    }
}
