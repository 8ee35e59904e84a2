//! Time interpolators
//!
//! Tide boundary series are dense enough for linear interpolation; the
//! seasonal MSL anomaly is sparse (monthly, irregular) and uses a
//! natural cubic spline. Both close over plain arrays of
//! (unix seconds, value) pairs and must be built before the simulation
//! loop starts.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::{ForcingError, Result};

/// Piecewise-linear series over Unix seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSeries {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl LinearSeries {
    /// `times` must be strictly increasing and parallel to `values`.
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if times.len() < 2 || times.len() != values.len() {
            return Err(ForcingError::TooFewPoints(times.len().min(values.len())));
        }
        if times.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(ForcingError::UnsortedTimes);
        }
        Ok(Self { times, values })
    }

    /// First covered time (Unix seconds)
    pub fn start(&self) -> f64 {
        self.times[0]
    }

    /// Last covered time (Unix seconds)
    pub fn end(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn eval(&self, time: f64) -> Result<f64> {
        if time < self.start() || time > self.end() {
            return Err(ForcingError::OutOfRange {
                series: "tide".into(),
                time,
            });
        }

        // Index of the segment containing `time`
        let hi = self.times.partition_point(|&t| t < time).min(self.times.len() - 1);
        let lo = hi.saturating_sub(1);
        if hi == lo {
            return Ok(self.values[lo]);
        }

        let t = (time - self.times[lo]) / (self.times[hi] - self.times[lo]);
        Ok(self.values[lo] + t * (self.values[hi] - self.values[lo]))
    }
}

/// Natural cubic spline over Unix seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots; zero at both ends
    m: Vec<f64>,
}

impl CubicSpline {
    /// `x` must be strictly increasing and parallel to `y`.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        let n = x.len();
        if n < 2 || n != y.len() {
            return Err(ForcingError::TooFewPoints(n.min(y.len())));
        }
        if x.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(ForcingError::UnsortedTimes);
        }

        let mut m = vec![0.0; n];
        if n > 2 {
            // Tridiagonal system for the interior second derivatives:
            // h[i-1] m[i-1] + 2(h[i-1]+h[i]) m[i] + h[i] m[i+1]
            //   = 6 ((y[i+1]-y[i])/h[i] - (y[i]-y[i-1])/h[i-1])
            let k = n - 2;
            let mut a = DMatrix::zeros(k, k);
            let mut rhs = DVector::zeros(k);

            for i in 1..n - 1 {
                let h_prev = x[i] - x[i - 1];
                let h_next = x[i + 1] - x[i];
                let row = i - 1;

                a[(row, row)] = 2.0 * (h_prev + h_next);
                if row > 0 {
                    a[(row, row - 1)] = h_prev;
                }
                if row + 1 < k {
                    a[(row, row + 1)] = h_next;
                }
                rhs[row] =
                    6.0 * ((y[i + 1] - y[i]) / h_next - (y[i] - y[i - 1]) / h_prev);
            }

            let solution = a.lu().solve(&rhs).ok_or(ForcingError::SplineSolve)?;
            m[1..n - 1].copy_from_slice(solution.as_slice());
        }

        Ok(Self { x, y, m })
    }

    pub fn start(&self) -> f64 {
        self.x[0]
    }

    pub fn end(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    pub fn eval(&self, time: f64) -> Result<f64> {
        if time < self.start() || time > self.end() {
            return Err(ForcingError::OutOfRange {
                series: "seasonal MSL".into(),
                time,
            });
        }

        let hi = self.x.partition_point(|&t| t < time).min(self.x.len() - 1);
        let lo = hi.saturating_sub(1);
        if hi == lo {
            return Ok(self.y[lo]);
        }

        let h = self.x[hi] - self.x[lo];
        let above = self.x[hi] - time;
        let below = time - self.x[lo];

        Ok(self.m[lo] * above.powi(3) / (6.0 * h)
            + self.m[hi] * below.powi(3) / (6.0 * h)
            + (self.y[lo] / h - self.m[lo] * h / 6.0) * above
            + (self.y[hi] / h - self.m[hi] * h / 6.0) * below)
    }
}
