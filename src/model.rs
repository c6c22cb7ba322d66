use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DemandError, Result};

pub const SHORT_WINDOW: usize = 7;
pub const LONG_WINDOW: usize = 30;

/// Probability at or above which a stock increase is recommended.
pub const THRESHOLD: f64 = 0.55;

/// Classifier input order. Part of the model's training contract.
pub const FEATURES: [&str; 4] = ["last_7d", "last_30d", "avg_30d", "std_30d"];

pub const DEFAULT_CATALOG: [&str; 8] = [
    "M01AB", "M01AE", "N02BA", "N02BE", "N05B", "N05C", "R03", "R06",
];

pub const DEFAULT_DATE_COLUMN: &str = "datum";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub medicine_id: String,
    pub date: NaiveDate,
    pub sales: f64, // NaN when the source cell was blank
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(rename = "medicine")]
    pub medicine_id: String,
    pub date: NaiveDate,

    pub last_7d: f64,
    pub last_30d: f64,
    pub avg_30d: f64,
    pub std_30d: f64,
}

impl FeatureRow {
    pub fn vector(&self) -> FeatureVector {
        FeatureVector {
            last_7d: self.last_7d,
            last_30d: self.last_30d,
            avg_30d: self.avg_30d,
            std_30d: self.std_30d,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub last_7d: f64,
    pub last_30d: f64,
    pub avg_30d: f64,
    pub std_30d: f64,
}

impl FeatureVector {
    pub fn new(last_7d: f64, last_30d: f64, avg_30d: f64, std_30d: f64) -> Self {
        FeatureVector {
            last_7d,
            last_30d,
            avg_30d,
            std_30d,
        }
    }

    /// Values in `FEATURES` order.
    pub fn to_array(&self) -> [f64; 4] {
        [self.last_7d, self.last_30d, self.avg_30d, self.std_30d]
    }

    /// Rejects values the classifier must never see.
    pub fn validate(&self) -> Result<()> {
        for (feature, value) in FEATURES.into_iter().zip(self.to_array()) {
            if !value.is_finite() {
                return Err(DemandError::InvalidFeature { feature, value });
            }
        }
        if self.std_30d < 0.0 {
            return Err(DemandError::InvalidFeature {
                feature: "std_30d",
                value: self.std_30d,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "Increase Stock")]
    IncreaseStock,
    #[serde(rename = "Normal")]
    Normal,
}

impl Action {
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        if probability >= threshold {
            Action::IncreaseStock
        } else {
            Action::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::IncreaseStock => "Increase Stock",
            Action::Normal => "Normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "medicine")]
    pub medicine_id: String,
    pub probability: f64,
    pub action: Action,
}

/// Single-record request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineInput {
    pub medicine: String,
    pub last_7d: f64,
    pub last_30d: f64,
    pub avg_30d: f64,
    pub std_30d: f64,
}

impl MedicineInput {
    pub fn vector(&self) -> FeatureVector {
        FeatureVector::new(self.last_7d, self.last_30d, self.avg_30d, self.std_30d)
    }
}
