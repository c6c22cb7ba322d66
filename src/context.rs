use std::sync::Arc;

use tracing::info;

use crate::classifier::{DemandClassifier, LogisticModel};
use crate::config::Settings;
use crate::engine::{recommend_batch, recommend_one};
use crate::error::Result;
use crate::features::{build_features, FeatureTable};
use crate::loader::TimeSeriesStore;
use crate::model::{FeatureRow, MedicineInput, Recommendation, THRESHOLD};

/// Everything a query needs, built once at startup and never mutated.
///
/// Share it behind an `Arc`; replacing the dataset means building a new context.
pub struct ForecastContext {
    store: TimeSeriesStore,
    features: FeatureTable,
    latest: Vec<FeatureRow>,
    classifier: Arc<dyn DemandClassifier>,
    threshold: f64,
}

impl ForecastContext {
    pub fn new(
        store: TimeSeriesStore,
        classifier: Arc<dyn DemandClassifier>,
        threshold: f64,
    ) -> Self {
        let features = build_features(&store);
        let latest = features.latest();

        info!(
            medicines = store.all_medicine_ids().len(),
            feature_rows = features.len(),
            scored = latest.len(),
            classifier = classifier.name(),
            "forecast context ready"
        );

        ForecastContext {
            store,
            features,
            latest,
            classifier,
            threshold,
        }
    }

    /// Loads data and model per `settings` and scores at `THRESHOLD`. Any failure here is
    /// fatal.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let store = TimeSeriesStore::load(&settings.source(), &settings.layout())?;
        let classifier = LogisticModel::from_path(&settings.model_path)?;
        Ok(Self::new(store, Arc::new(classifier), THRESHOLD))
    }

    pub fn medicines(&self) -> Vec<String> {
        self.store.all_medicine_ids()
    }

    pub fn predict(&self) -> Result<Vec<Recommendation>> {
        recommend_batch(&self.latest, self.classifier.as_ref(), self.threshold)
    }

    pub fn predict_one(&self, input: &MedicineInput) -> Result<Recommendation> {
        recommend_one(
            &input.medicine,
            &input.vector(),
            self.classifier.as_ref(),
            self.threshold,
        )
    }

    /// Last `tail` feature rows of one medicine, oldest first.
    pub fn features_for(&self, medicine_id: &str, tail: usize) -> Result<&[FeatureRow]> {
        let rows = self.features.rows_for(medicine_id)?;
        Ok(&rows[rows.len().saturating_sub(tail)..])
    }

    pub fn latest_for(&self, medicine_id: &str) -> Result<&FeatureRow> {
        self.features.latest_for(medicine_id)
    }
}
