//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a strict trailing window.
//! Lookback: period - 1 (first defined value at index period-1).

use crate::domain::PriceBar;

/// Window length used for the reported `sma20` column.
pub const SMA_PERIOD: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn lookback(&self) -> usize {
        self.period - 1
    }

    /// Rolling mean of `closes`; `None` until a full window is available.
    ///
    /// Single pass with a running sum.
    pub fn compute(&self, closes: &[f64]) -> Vec<Option<f64>> {
        let n = closes.len();
        let mut result = vec![None; n];
        if n < self.period {
            return result;
        }

        let window = self.period as f64;
        let mut sum: f64 = closes[..self.period].iter().sum();
        result[self.period - 1] = Some(sum / window);

        for i in self.period..n {
            sum += closes[i] - closes[i - self.period];
            result[i] = Some(sum / window);
        }

        result
    }

    /// Fill `sma20` on an ascending bar series in place.
    pub fn apply(&self, bars: &mut [PriceBar]) {
        debug_assert!(
            bars.windows(2).all(|w| w[0].date < w[1].date),
            "SMA input must be strictly ascending by date"
        );

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        for (bar, sma) in bars.iter_mut().zip(self.compute(&closes)) {
            bar.sma20 = sma;
        }
    }
}

impl Default for Sma {
    fn default() -> Self {
        Self::new(SMA_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0];
        let result = Sma::new(5).compute(&closes);

        assert_eq!(result.len(), 7);
        for (i, value) in result.iter().enumerate().take(4) {
            assert!(value.is_none(), "expected None at index {i}");
        }
        // SMA[4] = mean(10,11,12,13,14) = 12.0
        assert_approx(result[4].unwrap(), 12.0, DEFAULT_EPSILON);
        // SMA[5] = mean(11,12,13,14,15) = 13.0
        assert_approx(result[5].unwrap(), 13.0, DEFAULT_EPSILON);
        // SMA[6] = mean(12,13,14,15,16) = 14.0
        assert_approx(result[6].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_close() {
        let result = Sma::new(1).compute(&[100.0, 200.0, 300.0]);
        assert_eq!(result, vec![Some(100.0), Some(200.0), Some(300.0)]);
    }

    #[test]
    fn sma_lookback() {
        assert_eq!(Sma::default().period(), 20);
        assert_eq!(Sma::default().lookback(), 19);
        assert_eq!(Sma::new(1).lookback(), 0);
    }

    #[test]
    fn sma_too_few_bars() {
        let result = Sma::new(5).compute(&[10.0, 11.0]);
        assert!(result.iter().all(Option::is_none));
    }

    #[test]
    fn sma_is_not_zero_before_window_fills() {
        let result = Sma::default().compute(&[0.0; 19]);
        assert!(result.iter().all(Option::is_none));
    }

    #[test]
    fn apply_20_bars_defines_only_last() {
        let closes: Vec<f64> = (1..=20).map(f64::from).collect();
        let mut bars = make_bars(&closes);
        Sma::default().apply(&mut bars);

        let defined: Vec<usize> = bars
            .iter()
            .enumerate()
            .filter(|(_, b)| b.has_sma())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(defined, vec![19]);
        assert_approx(bars[19].sma20.unwrap(), 10.5, DEFAULT_EPSILON);
    }

    #[test]
    fn apply_19_bars_defines_nothing() {
        let closes: Vec<f64> = (1..=19).map(f64::from).collect();
        let mut bars = make_bars(&closes);
        Sma::default().apply(&mut bars);
        assert!(bars.iter().all(|b| !b.has_sma()));
    }

    #[test]
    #[should_panic(expected = "SMA period must be >= 1")]
    fn zero_period_rejected() {
        let _ = Sma::new(0);
    }
}
