//! Per-channel volatility estimation over the seed window.

use crate::buffer::WindowBuffer;
use crate::error::ForecastError;
use crate::Result;

/// Dispersion of period-over-period fractional price change, per channel.
///
/// Computed once per forecast run from the seed window and used to scale
/// the Gaussian shocks applied at each step. A constant series yields zero
/// volatility, which downstream degenerates to zero perturbation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityProfile {
    pub btc_volatility: f64,
    pub oil_volatility: f64,
}

impl VolatilityProfile {
    /// Estimate volatility from the observations currently in the buffer.
    ///
    /// Per channel this is the sample standard deviation (n-1 denominator)
    /// of consecutive fractional changes `(x[i] - x[i-1]) / x[i-1]`.
    /// Requires at least two points.
    pub fn estimate(buffer: &WindowBuffer) -> Result<Self> {
        if buffer.len() < 2 {
            return Err(ForecastError::InsufficientHistory {
                have: buffer.len(),
                need: 2,
            });
        }
        let btc: Vec<f64> = buffer.iter().map(|o| o.btc_price).collect();
        let oil: Vec<f64> = buffer.iter().map(|o| o.oil_price).collect();
        Ok(Self {
            btc_volatility: pct_change_std(&btc),
            oil_volatility: pct_change_std(&oil),
        })
    }
}

/// Sample standard deviation of consecutive fractional changes.
///
/// Returns 0.0 when there are fewer than two changes or no variance.
fn pct_change_std(values: &[f64]) -> f64 {
    let changes: Vec<f64> = values
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect();
    if changes.len() < 2 {
        return 0.0;
    }
    let mean = changes.iter().sum::<f64>() / changes.len() as f64;
    let variance = changes
        .iter()
        .map(|c| (c - mean).powi(2))
        .sum::<f64>()
        / (changes.len() - 1) as f64;
    variance.sqrt()
}
