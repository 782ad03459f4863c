//! Multi-step joint BTC/oil price forecasting.
//!
//! Turns a short window of historical joint price observations into a batch
//! of future price forecasts using independently trained ONNX sequence
//! models, bounds each step with a volatility-derived stochastic adjustment,
//! and persists the batch as a single atomic replace.

pub mod buffer;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
pub mod volatility;

pub use buffer::{JointObservation, WindowBuffer};
pub use engine::{EngineConfig, ForecastBatch, ForecastEngine, ForecastStep};
pub use error::{ForecastError, Result};
pub use models::{ModelBundle, ModelKind, OnnxModel, SequenceModel};
pub use store::{ForecastSink, ObservationStore, SqliteForecastDb};
pub use volatility::VolatilityProfile;
