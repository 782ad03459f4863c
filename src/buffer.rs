//! Rolling window of joint price observations.
//!
//! Maintains the fixed-length recent-history sequence that feeds the models,
//! updated by FIFO eviction as forecast steps are appended.

use crate::error::ForecastError;
use crate::Result;
use chrono::NaiveDate;
use ndarray::Array3;
use std::collections::VecDeque;

/// One day where both a BTC and an oil price are present.
///
/// Observations are unique per date and ordered ascending by date; only
/// dates present in both source series become observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointObservation {
    pub date: NaiveDate,
    pub btc_price: f64,
    pub oil_price: f64,
}

/// Fixed-capacity rolling window of [`JointObservation`].
///
/// Capacity is `sequence_length + 1`: the extra slot lets an appended
/// forecast step coexist with a full model window before the oldest entry
/// is evicted. Entries are always ascending by date, oldest first.
///
/// # Example
/// ```
/// use btc_oil_forecast::WindowBuffer;
/// let buffer = WindowBuffer::new(5);
/// assert_eq!(buffer.capacity(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    entries: VecDeque<JointObservation>,
    sequence_length: usize,
}

impl WindowBuffer {
    /// Create an empty buffer sized for windows of `sequence_length` entries.
    pub fn new(sequence_length: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(sequence_length + 1),
            sequence_length,
        }
    }

    /// Seed the buffer from historical observations, oldest first.
    ///
    /// Fails with [`ForecastError::InsufficientHistory`] if fewer than
    /// `sequence_length` observations are supplied. Only the most recent
    /// `sequence_length + 1` entries are retained.
    pub fn seed(&mut self, observations: &[JointObservation]) -> Result<()> {
        if observations.len() < self.sequence_length {
            return Err(ForecastError::InsufficientHistory {
                have: observations.len(),
                need: self.sequence_length,
            });
        }
        self.entries.clear();
        for obs in observations {
            self.push(*obs);
        }
        Ok(())
    }

    /// Append a new point, evicting the oldest entry past capacity.
    pub fn push(&mut self, observation: JointObservation) {
        if self.entries.len() > self.sequence_length {
            self.entries.pop_front();
        }
        self.entries.push_back(observation);
    }

    /// The configured model window length.
    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Maximum number of retained entries (`sequence_length + 1`).
    pub fn capacity(&self) -> usize {
        self.sequence_length + 1
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent entry, if any.
    pub fn latest(&self) -> Option<&JointObservation> {
        self.entries.back()
    }

    /// Iterate over entries, oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &JointObservation> {
        self.entries.iter()
    }

    /// Single-channel BTC model input: the `sequence_length` most recent
    /// BTC prices, shaped `(1, sequence_length, 1)`.
    pub fn btc_input(&self) -> Result<Array3<f32>> {
        self.single_channel(|obs| obs.btc_price)
    }

    /// Single-channel oil model input, shaped `(1, sequence_length, 1)`.
    pub fn oil_input(&self) -> Result<Array3<f32>> {
        self.single_channel(|obs| obs.oil_price)
    }

    /// Dual-channel input for the correlation model: the `sequence_length`
    /// most recent (btc, oil) pairs, shaped `(1, sequence_length, 2)`.
    pub fn joint_input(&self) -> Result<Array3<f32>> {
        let window = self.window()?;
        let mut input = Array3::<f32>::zeros((1, self.sequence_length, 2));
        for (i, obs) in window.iter().enumerate() {
            input[[0, i, 0]] = obs.btc_price as f32;
            input[[0, i, 1]] = obs.oil_price as f32;
        }
        Ok(input)
    }

    fn single_channel(&self, value: impl Fn(&JointObservation) -> f64) -> Result<Array3<f32>> {
        let window = self.window()?;
        let mut input = Array3::<f32>::zeros((1, self.sequence_length, 1));
        for (i, obs) in window.iter().enumerate() {
            input[[0, i, 0]] = value(obs) as f32;
        }
        Ok(input)
    }

    /// The `sequence_length` most recent entries, oldest first.
    ///
    /// Fails with [`ForecastError::WindowUnderflow`] if fewer entries exist.
    fn window(&self) -> Result<Vec<&JointObservation>> {
        if self.entries.len() < self.sequence_length {
            return Err(ForecastError::WindowUnderflow {
                have: self.entries.len(),
                need: self.sequence_length,
            });
        }
        let skip = self.entries.len() - self.sequence_length;
        Ok(self.entries.iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(day: u32, btc: f64, oil: f64) -> JointObservation {
        JointObservation {
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            btc_price: btc,
            oil_price: oil,
        }
    }

    fn seeded(n: u32) -> WindowBuffer {
        let history: Vec<_> = (1..=n)
            .map(|d| obs(d, 100.0 + d as f64, 50.0 + d as f64))
            .collect();
        let mut buffer = WindowBuffer::new(5);
        buffer.seed(&history).unwrap();
        buffer
    }

    #[test]
    fn test_seed_too_short() {
        let mut buffer = WindowBuffer::new(5);
        let history: Vec<_> = (1..=3).map(|d| obs(d, 100.0, 50.0)).collect();
        let err = buffer.seed(&history).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientHistory { have: 3, need: 5 }
        ));
    }

    #[test]
    fn test_seed_retains_most_recent() {
        let buffer = seeded(10);
        assert_eq!(buffer.len(), 6); // sequence_length + 1
        assert_eq!(buffer.latest().unwrap().btc_price, 110.0);
        assert_eq!(buffer.iter().next().unwrap().btc_price, 105.0);
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut buffer = seeded(6);
        buffer.push(obs(7, 200.0, 90.0));
        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.iter().next().unwrap().btc_price, 102.0);
        assert_eq!(buffer.latest().unwrap().btc_price, 200.0);
    }

    #[test]
    fn test_order_preserved() {
        let buffer = seeded(8);
        let dates: Vec<_> = buffer.iter().map(|o| o.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn test_btc_input_shape_and_values() {
        let buffer = seeded(6);
        let input = buffer.btc_input().unwrap();
        assert_eq!(input.shape(), &[1, 5, 1]);
        // Most recent 5 of 6 entries: days 2..=6.
        assert_eq!(input[[0, 0, 0]], 102.0);
        assert_eq!(input[[0, 4, 0]], 106.0);
    }

    #[test]
    fn test_joint_input_shape() {
        let buffer = seeded(5);
        let input = buffer.joint_input().unwrap();
        assert_eq!(input.shape(), &[1, 5, 2]);
        assert_eq!(input[[0, 0, 0]], 101.0);
        assert_eq!(input[[0, 0, 1]], 51.0);
    }

    #[test]
    fn test_window_underflow() {
        let mut buffer = WindowBuffer::new(5);
        buffer.push(obs(1, 100.0, 50.0));
        let err = buffer.oil_input().unwrap_err();
        assert!(matches!(
            err,
            ForecastError::WindowUnderflow { have: 1, need: 5 }
        ));
    }
}
