//! In-memory datasets.
//!
//! A [`Dataset`] exposes one independent variable and one or more observed
//! channels measured at the same points. Observations are laid out as
//! `(n_channels, n_points)`.

use crate::error::{LayerFitError, Result};
use ndarray::{Array1, Array2, Axis};

/// Observations that an [`Objective`](crate::objective::Objective) fits.
///
/// Implementors provide at least [`x`](Self::x) and [`y`](Self::y). The
/// number of columns of `y`, and of `y_err` when present, must equal the
/// length of `x`. Masked points are left out of everything returned here.
///
/// # Examples
///
/// ```
/// use layerfit_rs::dataset::{Data1D, Dataset};
/// use ndarray::array;
///
/// let mut data = Data1D::new(array![0.0, 1.0, 2.0], array![1.0, 3.0, 5.0]).unwrap();
/// assert!(!data.weighted());
///
/// data.set_mask(vec![true, false, true]).unwrap();
/// assert_eq!(data.npoints(), 2);
/// assert_eq!(data.y().shape(), &[1, 2]);
/// ```
pub trait Dataset {
    /// Independent variable.
    fn x(&self) -> Array1<f64>;

    /// Uncertainty of the independent variable, if known.
    fn x_err(&self) -> Option<Array1<f64>> {
        None
    }

    /// Observations, shape `(n_channels, n_points)`.
    fn y(&self) -> Array2<f64>;

    /// Uncertainties of the observations, same shape as [`y`](Self::y).
    fn y_err(&self) -> Option<Array2<f64>> {
        None
    }

    /// Whether uncertainties are available for the observations.
    fn weighted(&self) -> bool {
        self.y_err().is_some()
    }

    /// Number of points (not channels × points).
    fn npoints(&self) -> usize {
        self.x().len()
    }

    /// Name shown in an objective's summary.
    fn name(&self) -> Option<&str> {
        None
    }
}

fn check_len(what: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(LayerFitError::DimensionMismatch(format!(
            "{} has {} entries, expected {}",
            what, got, expected
        )));
    }
    Ok(())
}

fn select(values: &Array1<f64>, mask: &[bool]) -> Array1<f64> {
    values
        .iter()
        .zip(mask)
        .filter(|(_, &keep)| keep)
        .map(|(v, _)| *v)
        .collect()
}

/// A single observed channel `y(x)` with optional uncertainties and a point mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Data1D {
    name: Option<String>,
    x: Array1<f64>,
    y: Array1<f64>,
    y_err: Option<Array1<f64>>,
    x_err: Option<Array1<f64>>,
    mask: Vec<bool>,
}

impl Data1D {
    pub fn new(x: Array1<f64>, y: Array1<f64>) -> Result<Self> {
        check_len("y", x.len(), y.len())?;
        let mask = vec![true; x.len()];
        Ok(Self {
            name: None,
            x,
            y,
            y_err: None,
            x_err: None,
            mask,
        })
    }

    /// Attach one-standard-deviation uncertainties of `y`, making the data weighted.
    pub fn with_y_err(mut self, y_err: Array1<f64>) -> Result<Self> {
        check_len("y_err", self.x.len(), y_err.len())?;
        self.y_err = Some(y_err);
        Ok(self)
    }

    /// Attach uncertainties of `x`. Models receive them as resolution information.
    pub fn with_x_err(mut self, x_err: Array1<f64>) -> Result<Self> {
        check_len("x_err", self.x.len(), x_err.len())?;
        self.x_err = Some(x_err);
        Ok(self)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Only points whose mask entry is `true` are used.
    pub fn set_mask(&mut self, mask: Vec<bool>) -> Result<()> {
        check_len("mask", self.x.len(), mask.len())?;
        self.mask = mask;
        Ok(())
    }

    /// Use every point again.
    pub fn clear_mask(&mut self) {
        self.mask = vec![true; self.x.len()];
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }
}

impl Dataset for Data1D {
    fn x(&self) -> Array1<f64> {
        select(&self.x, &self.mask)
    }

    fn x_err(&self) -> Option<Array1<f64>> {
        self.x_err.as_ref().map(|e| select(e, &self.mask))
    }

    fn y(&self) -> Array2<f64> {
        select(&self.y, &self.mask).insert_axis(Axis(0))
    }

    fn y_err(&self) -> Option<Array2<f64>> {
        self.y_err
            .as_ref()
            .map(|e| select(e, &self.mask).insert_axis(Axis(0)))
    }

    fn npoints(&self) -> usize {
        self.mask.iter().filter(|&&keep| keep).count()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Ellipsometric angles psi and delta measured against angle of incidence.
///
/// The angle of incidence is the independent variable; psi and delta are the
/// two observed channels, in that order. No uncertainties are recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct EllipsometryData {
    name: Option<String>,
    wavelength: Array1<f64>,
    aoi: Array1<f64>,
    psi: Array1<f64>,
    delta: Array1<f64>,
}

impl EllipsometryData {
    pub fn new(
        wavelength: Array1<f64>,
        aoi: Array1<f64>,
        psi: Array1<f64>,
        delta: Array1<f64>,
    ) -> Result<Self> {
        let n = aoi.len();
        check_len("wavelength", n, wavelength.len())?;
        check_len("psi", n, psi.len())?;
        check_len("delta", n, delta.len())?;
        Ok(Self {
            name: None,
            wavelength,
            aoi,
            psi,
            delta,
        })
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn wavelength(&self) -> &Array1<f64> {
        &self.wavelength
    }

    pub fn aoi(&self) -> &Array1<f64> {
        &self.aoi
    }

    pub fn psi(&self) -> &Array1<f64> {
        &self.psi
    }

    pub fn delta(&self) -> &Array1<f64> {
        &self.delta
    }
}

impl Dataset for EllipsometryData {
    fn x(&self) -> Array1<f64> {
        self.aoi.clone()
    }

    fn y(&self) -> Array2<f64> {
        let mut y = Array2::zeros((2, self.aoi.len()));
        y.row_mut(0).assign(&self.psi);
        y.row_mut(1).assign(&self.delta);
        y
    }

    fn npoints(&self) -> usize {
        self.aoi.len()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
