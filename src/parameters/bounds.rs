//! Prior distributions attached to parameters
//!
//! Every parameter carries a [`Bounds`] object. It plays two roles: it maps a
//! value to a log-probability density (the log-prior used by objectives), and
//! it maps a uniform variate `u` in `[0, 1)` to a parameter value (the inverse
//! CDF used by prior-transform samplers).
//!
//! Hard bounds produce `-inf` outside their support. The soft-truncated
//! Gaussian instead degrades linearly outside its range, so that step-based
//! samplers always see a finite, worsening signal.

use std::fmt;
use std::sync::Arc;

use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use thiserror::Error;

/// Slope of the linear log-density penalty outside a soft-truncated range.
pub const SOFT_PENALTY: f64 = 10000.0;

/// Errors that can occur when constructing or sampling a prior
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriorError {
    #[error("Invalid bounds: lower bound ({lb}) must be less than upper bound ({ub})")]
    InvalidBounds { lb: f64, ub: f64 },

    #[error("Invalid scale: standard deviation must be positive and finite, got {sd}")]
    InvalidScale { sd: f64 },

    #[error("Prior has no inverse CDF: {description}")]
    ImproperPrior { description: String },

    #[error("Uniform variate {u} is outside [0, 1]")]
    InvalidQuantile { u: f64 },
}

/// Behaviour shared by every prior distribution.
///
/// Implementations must be stateless (or hold only plain data) so that an
/// objective carrying them can be copied to independent workers.
pub trait PriorDistribution: fmt::Debug + Send + Sync {
    /// Natural logarithm of the probability density at `value`.
    fn logpdf(&self, value: f64) -> f64;

    /// Map a uniform variate `u` in `[0, 1)` to a value distributed as the prior.
    fn invcdf(&self, u: f64) -> Result<f64, PriorError>;
}

fn check_quantile(u: f64) -> Result<(), PriorError> {
    if (0.0..=1.0).contains(&u) {
        Ok(())
    } else {
        Err(PriorError::InvalidQuantile { u })
    }
}

fn normal(mean: f64, sd: f64) -> Result<Normal, PriorError> {
    if !(sd.is_finite() && sd > 0.0) {
        return Err(PriorError::InvalidScale { sd });
    }
    Normal::new(mean, sd).map_err(|_| PriorError::InvalidScale { sd })
}

/// A hard interval `[lb, ub]`.
///
/// When both ends are finite this is a uniform distribution. A semi-infinite
/// interval is an improper prior: constant (zero log-density) inside, `-inf`
/// outside, and it cannot be sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    lb: f64,
    ub: f64,
}

impl Interval {
    /// Create a new interval
    ///
    /// # Examples
    ///
    /// ```
    /// use layerfit_rs::parameters::bounds::Interval;
    ///
    /// let interval = Interval::new(0.0, 10.0).unwrap();
    /// assert_eq!(interval.lb(), 0.0);
    /// assert!(Interval::new(1.0, 0.0).is_err());
    /// ```
    pub fn new(lb: f64, ub: f64) -> Result<Self, PriorError> {
        if lb.is_nan() || ub.is_nan() || lb >= ub {
            return Err(PriorError::InvalidBounds { lb, ub });
        }
        Ok(Self { lb, ub })
    }

    pub fn lb(&self) -> f64 {
        self.lb
    }

    pub fn ub(&self) -> f64 {
        self.ub
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lb && value <= self.ub
    }

    pub fn is_finite(&self) -> bool {
        self.lb.is_finite() && self.ub.is_finite()
    }
}

impl PriorDistribution for Interval {
    fn logpdf(&self, value: f64) -> f64 {
        if !self.contains(value) {
            return f64::NEG_INFINITY;
        }
        if self.is_finite() {
            -(self.ub - self.lb).ln()
        } else {
            0.0
        }
    }

    fn invcdf(&self, u: f64) -> Result<f64, PriorError> {
        check_quantile(u)?;
        if !self.is_finite() {
            return Err(PriorError::ImproperPrior {
                description: format!("interval [{}, {}] is not finite", self.lb, self.ub),
            });
        }
        Ok(self.lb + u * (self.ub - self.lb))
    }
}

/// An untruncated normal prior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalPrior {
    mean: f64,
    sd: f64,
    dist: Normal,
}

impl NormalPrior {
    pub fn new(mean: f64, sd: f64) -> Result<Self, PriorError> {
        Ok(Self {
            mean,
            sd,
            dist: normal(mean, sd)?,
        })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sd(&self) -> f64 {
        self.sd
    }
}

impl PriorDistribution for NormalPrior {
    fn logpdf(&self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::NEG_INFINITY;
        }
        self.dist.ln_pdf(value)
    }

    fn invcdf(&self, u: f64) -> Result<f64, PriorError> {
        check_quantile(u)?;
        Ok(self.dist.inverse_cdf(u))
    }
}

/// Gaussian distribution with soft truncation.
///
/// Inside `[lhs, rhs]` this is a truncated normal. Outside, the log-density
/// continues from its boundary value and falls linearly with the distance to
/// the boundary, with slope [`SOFT_PENALTY`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftTruncNormal {
    mean: f64,
    sd: f64,
    lhs: f64,
    rhs: f64,
    dist: Normal,
    cdf_lhs: f64,
    cdf_rhs: f64,
    ln_mass: f64,
}

impl SoftTruncNormal {
    /// Create a soft-truncated normal. `None` leaves that side untruncated.
    ///
    /// # Examples
    ///
    /// ```
    /// use layerfit_rs::parameters::bounds::{PriorDistribution, SoftTruncNormal};
    ///
    /// let prior = SoftTruncNormal::new(100.0, 10.0, Some(80.0), Some(120.0)).unwrap();
    /// // finite, and worse, beyond the soft boundary
    /// assert!(prior.logpdf(125.0).is_finite());
    /// assert!(prior.logpdf(125.0) < prior.logpdf(120.0));
    /// ```
    pub fn new(mean: f64, sd: f64, lhs: Option<f64>, rhs: Option<f64>) -> Result<Self, PriorError> {
        let dist = normal(mean, sd)?;
        let lhs = lhs.unwrap_or(f64::NEG_INFINITY);
        let rhs = rhs.unwrap_or(f64::INFINITY);
        if lhs.is_nan() || rhs.is_nan() || lhs >= rhs {
            return Err(PriorError::InvalidBounds { lb: lhs, ub: rhs });
        }

        let cdf_lhs = if lhs.is_finite() { dist.cdf(lhs) } else { 0.0 };
        let cdf_rhs = if rhs.is_finite() { dist.cdf(rhs) } else { 1.0 };
        let mass = cdf_rhs - cdf_lhs;
        if !(mass > 0.0) {
            // the truncation window holds no probability at double precision
            return Err(PriorError::InvalidBounds { lb: lhs, ub: rhs });
        }

        Ok(Self {
            mean,
            sd,
            lhs,
            rhs,
            dist,
            cdf_lhs,
            cdf_rhs,
            ln_mass: mass.ln(),
        })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sd(&self) -> f64 {
        self.sd
    }

    pub fn lhs(&self) -> f64 {
        self.lhs
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    fn truncated_logpdf(&self, value: f64) -> f64 {
        self.dist.ln_pdf(value) - self.ln_mass
    }
}

impl PriorDistribution for SoftTruncNormal {
    fn logpdf(&self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::NEG_INFINITY;
        }
        if value < self.lhs {
            return self.truncated_logpdf(self.lhs) - (self.lhs - value) * SOFT_PENALTY;
        }
        if value > self.rhs {
            return self.truncated_logpdf(self.rhs) - (value - self.rhs) * SOFT_PENALTY;
        }
        self.truncated_logpdf(value)
    }

    fn invcdf(&self, u: f64) -> Result<f64, PriorError> {
        check_quantile(u)?;
        let p = self.cdf_lhs + u * (self.cdf_rhs - self.cdf_lhs);
        Ok(self.dist.inverse_cdf(p).clamp(self.lhs, self.rhs))
    }
}

/// The prior attached to a parameter.
#[derive(Debug, Clone, Default)]
pub enum Bounds {
    /// Improper flat prior over the real line.
    #[default]
    Unbounded,
    /// Hard interval (uniform when finite).
    Interval(Interval),
    /// Untruncated normal.
    Normal(NormalPrior),
    /// Normal with soft, linearly penalised truncation.
    SoftTruncNormal(SoftTruncNormal),
    /// User-defined distribution.
    Custom(Arc<dyn PriorDistribution>),
}

impl Bounds {
    /// Hard interval `[lb, ub]`.
    pub fn interval(lb: f64, ub: f64) -> Result<Self, PriorError> {
        Interval::new(lb, ub).map(Bounds::Interval)
    }

    /// Untruncated normal prior.
    pub fn normal(mean: f64, sd: f64) -> Result<Self, PriorError> {
        NormalPrior::new(mean, sd).map(Bounds::Normal)
    }

    /// Soft-truncated normal prior.
    pub fn soft_trunc_normal(
        mean: f64,
        sd: f64,
        lhs: Option<f64>,
        rhs: Option<f64>,
    ) -> Result<Self, PriorError> {
        SoftTruncNormal::new(mean, sd, lhs, rhs).map(Bounds::SoftTruncNormal)
    }

    /// Wrap a user-defined distribution.
    pub fn custom<P: PriorDistribution + 'static>(prior: P) -> Self {
        Bounds::Custom(Arc::new(prior))
    }

    /// Clip `value` into the hard support of the prior, if it has one.
    pub fn valid(&self, value: f64) -> f64 {
        match self {
            Bounds::Interval(interval) => value.clamp(interval.lb, interval.ub),
            _ => value,
        }
    }

    fn as_distribution(&self) -> Option<&dyn PriorDistribution> {
        match self {
            Bounds::Unbounded => None,
            Bounds::Interval(p) => Some(p),
            Bounds::Normal(p) => Some(p),
            Bounds::SoftTruncNormal(p) => Some(p),
            Bounds::Custom(p) => Some(p.as_ref()),
        }
    }
}

impl PriorDistribution for Bounds {
    fn logpdf(&self, value: f64) -> f64 {
        match self.as_distribution() {
            Some(prior) => prior.logpdf(value),
            None if value.is_nan() => f64::NEG_INFINITY,
            None => 0.0,
        }
    }

    fn invcdf(&self, u: f64) -> Result<f64, PriorError> {
        match self.as_distribution() {
            Some(prior) => prior.invcdf(u),
            None => Err(PriorError::ImproperPrior {
                description: "an unbounded parameter cannot be sampled from the unit hypercube"
                    .to_string(),
            }),
        }
    }
}

impl From<Interval> for Bounds {
    fn from(interval: Interval) -> Self {
        Bounds::Interval(interval)
    }
}

impl From<SoftTruncNormal> for Bounds {
    fn from(prior: SoftTruncNormal) -> Self {
        Bounds::SoftTruncNormal(prior)
    }
}
