//! Short-term demand spike forecasting for a fixed medicine catalog.
//!
//! Daily sales are reshaped into per-medicine series ([`loader`]), turned into
//! trailing 7/30-row window features ([`features`]) and scored by a
//! pre-trained classifier ([`classifier`]) into ranked stocking
//! recommendations ([`engine`]).

pub mod classifier;
pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod features;
pub mod loader;
pub mod model;
pub mod rolling;

pub use classifier::{DemandClassifier, LogisticModel};
pub use context::ForecastContext;
pub use engine::{recommend_batch, recommend_one};
pub use error::{DemandError, Result};
pub use features::{build_features, latest_features, FeatureTable};
pub use loader::{DataSource, SourceLayout, TimeSeriesStore};
pub use model::{Action, FeatureRow, FeatureVector, MedicineInput, Observation, Recommendation};
