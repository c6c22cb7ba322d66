use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use statrs::function::logistic::logistic;
use tracing::info;

use crate::error::{DemandError, Result};
use crate::model::{FeatureVector, FEATURES};

/// Pre-trained demand spike classifier. Read-only and shared across requests.
pub trait DemandClassifier: Send + Sync {
    /// Probability of a demand spike, in `[0, 1]`.
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// JSON export of a fitted logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub features: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub scaler: Option<Scaler>,
}

#[derive(Debug, Clone)]
pub struct LogisticModel {
    name: String,
    coefficients: [f64; 4],
    intercept: f64,
    mean: [f64; 4],
    scale: [f64; 4],
}

impl LogisticModel {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            DemandError::ModelLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        let model = Self::from_json(&data)?;
        info!(model = %model.name, path = %path.display(), "loaded classifier");
        Ok(model)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let artifact: ModelArtifact =
            serde_json::from_str(data).map_err(|e| DemandError::ModelLoad(e.to_string()))?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        if artifact.features.len() != FEATURES.len()
            || artifact.features.iter().zip(FEATURES).any(|(a, b)| a != b)
        {
            return Err(DemandError::ModelLoad(format!(
                "feature order {:?} does not match {:?}",
                artifact.features, FEATURES
            )));
        }

        let coefficients = four("coefficients", &artifact.coefficients)?;
        if !artifact.intercept.is_finite() {
            return Err(DemandError::ModelLoad("intercept is not finite".to_string()));
        }

        let (mean, scale) = match &artifact.scaler {
            Some(s) => (four("scaler.mean", &s.mean)?, four("scaler.scale", &s.scale)?),
            None => ([0.0; 4], [1.0; 4]),
        };
        if scale.iter().any(|s| *s == 0.0) {
            return Err(DemandError::ModelLoad("scaler.scale contains zero".to_string()));
        }

        let name = if artifact.version.is_empty() {
            artifact.name
        } else {
            format!("{}@{}", artifact.name, artifact.version)
        };

        Ok(LogisticModel {
            name,
            coefficients,
            intercept: artifact.intercept,
            mean,
            scale,
        })
    }
}

impl DemandClassifier for LogisticModel {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
        let x = features.to_array();
        let mut z = self.intercept;
        for i in 0..4 {
            z += self.coefficients[i] * (x[i] - self.mean[i]) / self.scale[i];
        }

        let p = logistic(z);
        if !p.is_finite() {
            return Err(DemandError::Classifier(format!(
                "{} produced non-finite score",
                self.name
            )));
        }
        Ok(p)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn four(field: &str, values: &[f64]) -> Result<[f64; 4]> {
    let arr: [f64; 4] = values.try_into().map_err(|_| {
        DemandError::ModelLoad(format!("{} must have 4 values, got {}", field, values.len()))
    })?;
    if arr.iter().any(|v| !v.is_finite()) {
        return Err(DemandError::ModelLoad(format!("{} contains non-finite values", field)));
    }
    Ok(arr)
}
