use crate::classifier::DemandClassifier;
use crate::error::{DemandError, Result};
use crate::model::{Action, FeatureRow, FeatureVector, Recommendation};

pub fn recommend_batch<C>(
    latest: &[FeatureRow],
    classifier: &C,
    threshold: f64,
) -> Result<Vec<Recommendation>>
where
    C: DemandClassifier + ?Sized,
{
    let mut results = Vec::with_capacity(latest.len());

    for row in latest {
        let probability = score(classifier, &row.vector())?;
        results.push(Recommendation {
            medicine_id: row.medicine_id.clone(),
            probability,
            action: Action::from_probability(probability, threshold),
        });
    }

    // Stable: equal probabilities keep catalog order.
    results.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    Ok(results)
}

pub fn recommend_one<C>(
    medicine_id: &str,
    features: &FeatureVector,
    classifier: &C,
    threshold: f64,
) -> Result<Recommendation>
where
    C: DemandClassifier + ?Sized,
{
    features.validate()?;

    let probability = score(classifier, features)?;
    Ok(Recommendation {
        medicine_id: medicine_id.to_string(),
        probability: round4(probability),
        action: Action::from_probability(probability, threshold),
    })
}

fn score<C>(classifier: &C, features: &FeatureVector) -> Result<f64>
where
    C: DemandClassifier + ?Sized,
{
    let p = classifier.predict_probability(features)?;
    if !(0.0..=1.0).contains(&p) {
        return Err(DemandError::Classifier(format!(
            "{} returned probability {} outside [0, 1]",
            classifier.name(),
            p
        )));
    }
    Ok(p)
}

fn round4(p: f64) -> f64 {
    (p * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::THRESHOLD;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed probability and counts calls.
    struct Fixed {
        p: f64,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(p: f64) -> Self {
            Fixed {
                p,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl DemandClassifier for Fixed {
        fn predict_probability(&self, _features: &FeatureVector) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.p)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    /// Uses last_7d as the probability.
    struct Echo;

    impl DemandClassifier for Echo {
        fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
            Ok(features.last_7d)
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct Broken;

    impl DemandClassifier for Broken {
        fn predict_probability(&self, _features: &FeatureVector) -> Result<f64> {
            Err(DemandError::Classifier("model unavailable".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn row(id: &str, last_7d: f64) -> FeatureRow {
        FeatureRow {
            medicine_id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2019, 10, 8).unwrap(),
            last_7d,
            last_30d: 300.0,
            avg_30d: 10.0,
            std_30d: 2.0,
        }
    }

    #[test]
    fn batch_is_sorted_descending_and_stable() {
        let latest = vec![
            row("A", 0.2),
            row("B", 0.9),
            row("C", 0.55),
            row("D", 0.9),
            row("E", 0.1),
        ];
        let recs = recommend_batch(&latest, &Echo, THRESHOLD).unwrap();

        let ids: Vec<&str> = recs.iter().map(|r| r.medicine_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "D", "C", "A", "E"]);
        assert_eq!(recs.len(), latest.len());

        assert_eq!(recs[0].action, Action::IncreaseStock);
        assert_eq!(recs[2].action, Action::IncreaseStock);
        assert_eq!(recs[3].action, Action::Normal);
    }

    #[test]
    fn batch_propagates_classifier_failure() {
        let err = recommend_batch(&[row("A", 1.0)], &Broken, THRESHOLD).unwrap_err();
        assert!(matches!(err, DemandError::Classifier(_)));
    }

    #[test]
    fn out_of_range_probability_is_a_classifier_error() {
        let err = recommend_batch(&[row("A", 1.5)], &Echo, THRESHOLD).unwrap_err();
        assert!(matches!(err, DemandError::Classifier(ref m) if m.contains("echo")));
    }

    #[test]
    fn single_scenario_follows_threshold() {
        let v = FeatureVector::new(79.0, 300.0, 10.0, 2.0);

        let rec = recommend_one("N02BE", &v, &Fixed::new(0.6), THRESHOLD).unwrap();
        assert_eq!(rec.action, Action::IncreaseStock);
        assert_eq!(rec.medicine_id, "N02BE");

        let rec = recommend_one("N02BE", &v, &Fixed::new(0.4), THRESHOLD).unwrap();
        assert_eq!(rec.action, Action::Normal);

        let rec = recommend_one("N02BE", &v, &Fixed::new(0.55), THRESHOLD).unwrap();
        assert_eq!(rec.action, Action::IncreaseStock);
    }

    #[test]
    fn single_rounds_to_four_places() {
        let v = FeatureVector::new(79.0, 300.0, 10.0, 2.0);
        let rec = recommend_one("R03", &v, &Fixed::new(0.123456), THRESHOLD).unwrap();
        assert_eq!(rec.probability, 0.1235);
    }

    #[test]
    fn single_rejects_nan_without_calling_classifier() {
        let classifier = Fixed::new(0.9);
        let v = FeatureVector::new(79.0, f64::NAN, 10.0, 2.0);

        let err = recommend_one("R03", &v, &classifier, THRESHOLD).unwrap_err();
        assert!(matches!(
            err,
            DemandError::InvalidFeature { feature: "last_30d", .. }
        ));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn works_through_trait_objects() {
        let classifier: Box<dyn DemandClassifier> = Box::new(Fixed::new(0.7));
        let recs = recommend_batch(&[row("A", 0.0)], classifier.as_ref(), THRESHOLD).unwrap();
        assert_eq!(recs[0].probability, 0.7);
    }
}
