use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{DemandError, Result};
use crate::loader::TimeSeriesStore;
use crate::model::{FeatureRow, Observation, LONG_WINDOW, SHORT_WINDOW};
use crate::rolling::RollingWindow;

/// Rolling features per medicine, derived wholesale from a store.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    rows: BTreeMap<String, Vec<FeatureRow>>,
    history: BTreeMap<String, usize>,
}

impl FeatureTable {
    pub fn rows_for(&self, medicine_id: &str) -> Result<&[FeatureRow]> {
        self.rows
            .get(medicine_id)
            .map(|r| r.as_slice())
            .ok_or_else(|| DemandError::UnknownMedicine(medicine_id.to_string()))
    }

    pub fn latest_for(&self, medicine_id: &str) -> Result<&FeatureRow> {
        let rows = self.rows_for(medicine_id)?;
        rows.last().ok_or_else(|| DemandError::InsufficientHistory {
            medicine: medicine_id.to_string(),
            needed: LONG_WINDOW,
            got: self.history.get(medicine_id).copied().unwrap_or(0),
        })
    }

    /// Last row of every medicine that has one, in catalog order.
    pub fn latest(&self) -> Vec<FeatureRow> {
        let mut latest = Vec::with_capacity(self.rows.len());
        for id in self.rows.keys() {
            match self.latest_for(id) {
                Ok(row) => latest.push(row.clone()),
                Err(e) => warn!(medicine = %id, error = %e, "skipping medicine"),
            }
        }
        latest
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn build_features(store: &TimeSeriesStore) -> FeatureTable {
    let rows: BTreeMap<String, Vec<FeatureRow>> = store
        .series()
        .par_iter()
        .map(|(id, series)| (id.clone(), build_series_features(id, series)))
        .collect();

    let history = store
        .series()
        .iter()
        .map(|(id, series)| (id.clone(), series.len()))
        .collect();

    FeatureTable { rows, history }
}

pub fn latest_features(store: &TimeSeriesStore) -> Vec<FeatureRow> {
    build_features(store).latest()
}

/// Windows run over row index, not calendar days: a gap in dates is just
/// a missing row. A row is kept only when both windows are full and clean.
pub fn build_series_features(medicine_id: &str, series: &[Observation]) -> Vec<FeatureRow> {
    let mut short = RollingWindow::new(SHORT_WINDOW);
    let mut long = RollingWindow::new(LONG_WINDOW);
    let mut rows = Vec::with_capacity(series.len().saturating_sub(LONG_WINDOW - 1));

    for obs in series {
        short.push(obs.sales);
        long.push(obs.sales);

        let (Some(last_7d), Some(last_30d), Some(avg_30d), Some(std_30d)) =
            (short.sum(), long.sum(), long.mean(), long.std_dev())
        else {
            continue;
        };

        rows.push(FeatureRow {
            medicine_id: medicine_id.to_string(),
            date: obs.date,
            last_7d,
            last_30d,
            avg_30d,
            std_30d,
        });
    }

    debug!(
        medicine = %medicine_id,
        series = series.len(),
        features = rows.len(),
        "built rolling features"
    );
    rows
}
