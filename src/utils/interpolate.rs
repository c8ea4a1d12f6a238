//! Monotone piecewise cubic Hermite interpolation (PCHIP).
//!
//! Knot derivatives follow Fritsch and Carlson: interior slopes are a
//! weighted harmonic mean of the neighbouring secants, set to zero at local
//! extrema, and the end slopes come from a shape-preserving three-point
//! formula. The interpolant therefore never overshoots the data between knots.
//! Outside the knot range the first and last cubics are extended.

use crate::error::{LayerFitError, Result};
use ndarray::{Array1, ArrayView1};

/// A shape-preserving cubic interpolant through a set of knots.
///
/// Between two knots the interpolant stays within their values, so a
/// monotone set of knots gives a monotone curve.
///
/// # Examples
///
/// ```
/// use layerfit_rs::utils::Pchip;
/// use ndarray::array;
///
/// let pchip = Pchip::new(array![0.0, 1.0, 2.0].view(), array![0.0, 1.0, 4.0].view()).unwrap();
/// assert_eq!(pchip.evaluate(1.0), 1.0);
///
/// let v = pchip.evaluate(0.5);
/// assert!(v > 0.0 && v < 1.0);
///
/// let area = pchip.integrate(0.0, 1.0);
/// assert!(area > 0.0 && area < 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Pchip {
    x: Array1<f64>,
    y: Array1<f64>,
    slopes: Array1<f64>,
}

impl Pchip {
    /// Fit the interpolant through `(x[i], y[i])`.
    ///
    /// `x` must be strictly increasing and at least two points long.
    pub fn new(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Result<Self> {
        let n = x.len();
        if n != y.len() {
            return Err(LayerFitError::DimensionMismatch(format!(
                "interpolation needs as many values as knots: {} knots, {} values",
                n,
                y.len()
            )));
        }
        if n < 2 {
            return Err(LayerFitError::InvalidInput(
                "interpolation needs at least two knots".to_string(),
            ));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(LayerFitError::InvalidInput(
                "knots and values must be finite".to_string(),
            ));
        }
        if x.windows(2).into_iter().any(|w| w[1] <= w[0]) {
            return Err(LayerFitError::InvalidInput(
                "knot positions must be strictly increasing".to_string(),
            ));
        }

        let slopes = fritsch_carlson_slopes(x, y);
        Ok(Self {
            x: x.to_owned(),
            y: y.to_owned(),
            slopes,
        })
    }

    /// Knot positions.
    pub fn knots(&self) -> ArrayView1<f64> {
        self.x.view()
    }

    /// Values at the knots.
    pub fn values(&self) -> ArrayView1<f64> {
        self.y.view()
    }

    /// Derivative of the interpolant at each knot.
    pub fn slopes(&self) -> ArrayView1<f64> {
        self.slopes.view()
    }

    /// Interpolated value at `xi`.
    pub fn evaluate(&self, xi: f64) -> f64 {
        let i = self.interval(xi);
        let [c0, c1, c2, c3] = self.coefficients(i);
        let t = xi - self.x[i];
        c0 + t * (c1 + t * (c2 + t * c3))
    }

    pub fn evaluate_many(&self, xs: ArrayView1<f64>) -> Array1<f64> {
        xs.mapv(|xi| self.evaluate(xi))
    }

    /// Definite integral of the interpolant from `a` to `b`.
    pub fn integrate(&self, a: f64, b: f64) -> f64 {
        if a > b {
            return -self.integrate(b, a);
        }

        let last = self.x.len() - 2;
        let mut total = 0.0;
        let mut lo = a;
        while lo < b {
            let i = self.interval(lo);
            let segment_end = if i == last {
                f64::INFINITY
            } else {
                self.x[i + 1]
            };
            let hi = b.min(segment_end);
            total += self.antiderivative(i, hi - self.x[i]) - self.antiderivative(i, lo - self.x[i]);
            lo = hi;
        }
        total
    }

    /// Index of the cubic used at `xi`.
    fn interval(&self, xi: f64) -> usize {
        let upper = self.x.len() - 2;
        let above = self.x.iter().take_while(|&&k| k <= xi).count();
        above.saturating_sub(1).min(upper)
    }

    /// Power-basis coefficients of the cubic on `[x[i], x[i+1]]` in `t = x - x[i]`.
    fn coefficients(&self, i: usize) -> [f64; 4] {
        let h = self.x[i + 1] - self.x[i];
        let secant = (self.y[i + 1] - self.y[i]) / h;
        let d0 = self.slopes[i];
        let d1 = self.slopes[i + 1];
        [
            self.y[i],
            d0,
            (3.0 * secant - 2.0 * d0 - d1) / h,
            (d0 + d1 - 2.0 * secant) / (h * h),
        ]
    }

    fn antiderivative(&self, i: usize, t: f64) -> f64 {
        let [c0, c1, c2, c3] = self.coefficients(i);
        t * (c0 + t * (c1 / 2.0 + t * (c2 / 3.0 + t * c3 / 4.0)))
    }
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn fritsch_carlson_slopes(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Array1<f64> {
    let n = x.len();
    let h: Vec<f64> = (0..n - 1).map(|k| x[k + 1] - x[k]).collect();
    let m: Vec<f64> = (0..n - 1).map(|k| (y[k + 1] - y[k]) / h[k]).collect();

    if n == 2 {
        return Array1::from_elem(2, m[0]);
    }

    let mut d = Array1::zeros(n);
    for k in 1..n - 1 {
        let (m_left, m_right) = (m[k - 1], m[k]);
        if m_left == 0.0 || m_right == 0.0 || sign(m_left) != sign(m_right) {
            continue;
        }
        let w1 = 2.0 * h[k] + h[k - 1];
        let w2 = h[k] + 2.0 * h[k - 1];
        let harmonic = (w1 / m_left + w2 / m_right) / (w1 + w2);
        d[k] = 1.0 / harmonic;
    }

    d[0] = edge_slope(h[0], h[1], m[0], m[1]);
    d[n - 1] = edge_slope(h[n - 2], h[n - 3], m[n - 2], m[n - 3]);
    d
}

/// Three-point end slope, limited so the end cubic stays monotone.
fn edge_slope(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && d.abs() > (3.0 * m0).abs() {
        3.0 * m0
    } else {
        d
    }
}
