//! Sequence-regression model bundle.
//!
//! Loads the three independently trained ONNX models (single-series BTC,
//! single-series oil, joint-series correlation) and exposes one-scalar
//! prediction over a fixed-length input window. Model artifacts are static:
//! a load failure is surfaced once and never retried.

use crate::error::ForecastError;
use crate::Result;
use ndarray::Array3;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The three model keys recognized by the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Btc,
    Oil,
    Correlation,
}

impl ModelKind {
    /// All kinds, in load order.
    pub fn all() -> [ModelKind; 3] {
        [ModelKind::Btc, ModelKind::Oil, ModelKind::Correlation]
    }

    /// Number of input channels the model expects (1 for the single-series
    /// models, 2 for the correlation model).
    pub fn channels(&self) -> usize {
        match self {
            ModelKind::Btc | ModelKind::Oil => 1,
            ModelKind::Correlation => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Btc => "btc",
            ModelKind::Oil => "oil",
            ModelKind::Correlation => "correlation",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    /// Parse a model key, failing with [`ForecastError::InvalidModelType`]
    /// for anything outside `{btc, oil, correlation}`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "btc" => Ok(ModelKind::Btc),
            "oil" => Ok(ModelKind::Oil),
            "correlation" => Ok(ModelKind::Correlation),
            other => Err(ForecastError::InvalidModelType(other.to_string())),
        }
    }
}

/// A pure function from a fixed-length window to one predicted scalar.
///
/// Input shape is `(1, sequence_length, channels)`. Takes `&mut self` only
/// because the ONNX session does; implementations must behave as pure
/// functions of the input window across calls.
pub trait SequenceModel: Send {
    fn predict(&mut self, window: Array3<f32>) -> Result<f64>;
}

/// ONNX-backed sequence model.
pub struct OnnxModel {
    session: Session,
}

impl OnnxModel {
    /// Load an ONNX model from disk.
    ///
    /// # Arguments
    /// * `path` - Path to the `.onnx` artifact
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ForecastError::ModelUnavailable(format!(
                "model artifact not found: {}",
                path.display()
            )));
        }
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)? // single-threaded for determinism
            .commit_from_file(path)?;
        Ok(Self { session })
    }
}

impl SequenceModel for OnnxModel {
    fn predict(&mut self, window: Array3<f32>) -> Result<f64> {
        let input = Value::from_array(window)?;
        let outputs = self.session.run(ort::inputs![input])?;
        let (_, data) = outputs[0].try_extract_tensor::<f32>()?;
        match data.first() {
            Some(&value) => Ok(value as f64),
            None => Err(ForecastError::ModelUnavailable(
                "model produced an empty output tensor".to_string(),
            )),
        }
    }
}

/// The three predictors, loaded once and immutable thereafter.
pub struct ModelBundle {
    btc: Box<dyn SequenceModel>,
    oil: Box<dyn SequenceModel>,
    correlation: Box<dyn SequenceModel>,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle").finish_non_exhaustive()
    }
}

impl ModelBundle {
    /// Load all three models from a directory containing
    /// `btc_model.onnx`, `oil_model.onnx` and `correlation_model.onnx`.
    ///
    /// Fails with [`ForecastError::ModelUnavailable`] if any artifact is
    /// missing or corrupt.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let artifact = |kind: ModelKind| model_dir.join(format!("{kind}_model.onnx"));
        Ok(Self {
            btc: Box::new(OnnxModel::load(&artifact(ModelKind::Btc))?),
            oil: Box::new(OnnxModel::load(&artifact(ModelKind::Oil))?),
            correlation: Box::new(OnnxModel::load(&artifact(ModelKind::Correlation))?),
        })
    }

    /// Build a bundle from arbitrary predictors (stub models in tests).
    pub fn from_parts(
        btc: Box<dyn SequenceModel>,
        oil: Box<dyn SequenceModel>,
        correlation: Box<dyn SequenceModel>,
    ) -> Self {
        Self {
            btc,
            oil,
            correlation,
        }
    }

    /// Predict the next scalar with the model selected by `kind`.
    ///
    /// The window must be shaped `(1, sequence_length, kind.channels())`.
    pub fn predict(&mut self, kind: ModelKind, window: Array3<f32>) -> Result<f64> {
        debug_assert_eq!(window.shape()[2], kind.channels());
        match kind {
            ModelKind::Btc => self.btc.predict(window),
            ModelKind::Oil => self.oil.predict(window),
            ModelKind::Correlation => self.correlation.predict(window),
        }
    }
}
