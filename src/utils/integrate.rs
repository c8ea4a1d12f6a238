//! Numerical quadrature over sampled data.

use ndarray::ArrayView1;

/// Integrate samples `y` taken at abscissae `x` with the composite Simpson rule.
///
/// Spacing may be uneven. With an odd number of intervals the last interval is
/// integrated by the quadratic through the last three samples. Two samples fall
/// back to the trapezoidal rule; fewer integrate to zero.
///
/// `x` and `y` must have equal length.
pub fn simpson(y: ArrayView1<f64>, x: ArrayView1<f64>) -> f64 {
    let n = y.len().min(x.len());
    if n < 2 {
        return 0.0;
    }
    if n == 2 {
        return 0.5 * (x[1] - x[0]) * (y[0] + y[1]);
    }

    let n_intervals = n - 1;
    let paired = if n_intervals % 2 == 0 {
        n_intervals
    } else {
        n_intervals - 1
    };

    let mut total = 0.0;
    let mut i = 0;
    while i < paired {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let hsum = h0 + h1;
        total += hsum / 6.0
            * ((2.0 - h1 / h0) * y[i] + hsum * hsum / (h0 * h1) * y[i + 1] + (2.0 - h0 / h1) * y[i + 2]);
        i += 2;
    }

    if paired < n_intervals {
        let h0 = x[n - 2] - x[n - 3];
        let h1 = x[n - 1] - x[n - 2];
        let alpha = (2.0 * h1 * h1 + 3.0 * h0 * h1) / (6.0 * (h0 + h1));
        let beta = (h1 * h1 + 3.0 * h0 * h1) / (6.0 * h0);
        let eta = h1 * h1 * h1 / (6.0 * h0 * (h0 + h1));
        total += alpha * y[n - 1] + beta * y[n - 2] - eta * y[n - 3];
    }

    total
}
