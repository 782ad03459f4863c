//! Multi-step forecast engine.
//!
//! Drives the Seeding → Stepping → Finalized loop: seeds a rolling window
//! from the observation store, computes a volatility profile, then emits
//! `horizon` forecast steps where each step's value is the previous value
//! perturbed by a volatility-scaled Gaussian shock and hard-clipped to a
//! per-step band.
//!
//! Persistence is the caller's final move: hand the finished batch to a
//! [`ForecastSink`](crate::store::ForecastSink) via `replace_batch`. Keeping
//! that call outside [`ForecastEngine::forecast`] means a sink failure never
//! costs the computed batch; the caller retries the write without re-running
//! inference.

use crate::buffer::{JointObservation, WindowBuffer};
use crate::error::ForecastError;
use crate::models::{ModelBundle, ModelKind};
use crate::store::ObservationStore;
use crate::volatility::VolatilityProfile;
use crate::Result;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Configuration for a forecast engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model input window length
    pub sequence_length: usize,

    /// Number of forecast steps to emit per run
    pub horizon: usize,

    /// Maximum per-step fractional deviation from the previous value
    pub clip_fraction: f64,

    /// Fixed RNG seed for reproducible runs; `None` seeds from entropy
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sequence_length: 5,
            horizon: 50,
            clip_fraction: 0.05,
            rng_seed: None,
        }
    }
}

/// One emitted forecast point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastStep {
    pub date: NaiveDate,
    pub predicted_btc: f64,
    pub predicted_oil: f64,
}

/// The complete, ordered output of one engine run.
pub type ForecastBatch = Vec<ForecastStep>;

/// Iterative multi-step forecaster over the joint BTC/oil series.
///
/// Owns the model bundle for its lifetime; the window buffer and volatility
/// profile are created fresh on every run and discarded afterwards.
pub struct ForecastEngine {
    models: ModelBundle,
    config: EngineConfig,
    rng: StdRng,
}

impl ForecastEngine {
    /// Create an engine around an already-loaded model bundle.
    pub fn new(models: ModelBundle, config: EngineConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            models,
            config,
            rng,
        }
    }

    /// Produce one full forecast batch: seed, then step `horizon` times.
    ///
    /// Any failure aborts the whole run with no batch emitted, so a caller
    /// that only persists a returned batch can never write partial output.
    /// The returned batch is plain data: if the subsequent sink write fails,
    /// it is still in hand for a retry.
    pub fn forecast<S: ObservationStore>(&mut self, store: &S) -> Result<ForecastBatch> {
        // Seeding.
        let history = store.fetch_recent_joint(self.config.sequence_length)?;
        let mut window = WindowBuffer::new(self.config.sequence_length);
        window.seed(&history)?;
        let profile = VolatilityProfile::estimate(&window)?;
        tracing::debug!(
            btc_volatility = profile.btc_volatility,
            oil_volatility = profile.oil_volatility,
            "seeded from {} observations",
            history.len()
        );

        let last = history
            .last()
            .copied()
            .ok_or(ForecastError::InsufficientHistory {
                have: 0,
                need: self.config.sequence_length,
            })?;
        let mut last_btc = last.btc_price;
        let mut last_oil = last.oil_price;
        let mut date = last.date;

        // Stepping.
        let mut batch = Vec::with_capacity(self.config.horizon);
        for step in 0..self.config.horizon {
            // Raw model predictions. The emitted value is driven by the
            // volatility-shocked candidate below; the correlation output in
            // particular is consulted but not blended in.
            let raw_btc = self.models.predict(ModelKind::Btc, window.btc_input()?)?;
            let raw_oil = self.models.predict(ModelKind::Oil, window.oil_input()?)?;
            let correlation_hint = self
                .models
                .predict(ModelKind::Correlation, window.joint_input()?)?;
            tracing::debug!(step, raw_btc, raw_oil, correlation_hint, "model outputs");

            let btc_shock: f64 =
                self.rng.sample::<f64, _>(StandardNormal) * profile.btc_volatility;
            let oil_shock: f64 =
                self.rng.sample::<f64, _>(StandardNormal) * profile.oil_volatility;

            let btc_candidate = clip(last_btc * (1.0 + btc_shock), last_btc, self.config.clip_fraction);
            let oil_candidate = clip(last_oil * (1.0 + oil_shock), last_oil, self.config.clip_fraction);

            // Dates run forward from the day after the last observation.
            date = date + Duration::days(1);
            let emitted = JointObservation {
                date,
                btc_price: btc_candidate,
                oil_price: oil_candidate,
            };
            window.push(emitted);
            batch.push(ForecastStep {
                date,
                predicted_btc: btc_candidate,
                predicted_oil: oil_candidate,
            });

            last_btc = btc_candidate;
            last_oil = oil_candidate;
        }

        Ok(batch)
    }
}

/// Hard per-step bound: clamp `candidate` to within `fraction` of `last`.
fn clip(candidate: f64, last: f64, fraction: f64) -> f64 {
    candidate.clamp(last * (1.0 - fraction), last * (1.0 + fraction))
}
