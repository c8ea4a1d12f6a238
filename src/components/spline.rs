//! Freeform volume-fraction profile.
//!
//! The polymer volume fraction through a layer of thickness `extent` is a
//! monotone cubic (PCHIP) through a set of knots. Knot positions are the
//! cumulative sum of the `dz` spacings, normalised so that they never run past
//! the end of the layer, and knot heights are the `vf` parameters. The profile
//! is pinned to the slabs on either side of it: its value just before zero is
//! the polymer fraction of the last left slab and its value just after the end
//! is that of the first right slab. Knots that land on the same depth, from a
//! zero spacing, are merged and keep the height of the later one.
//!
//! For the reflectivity or ellipsometry calculation the profile is cut into
//! uniform microslabs no thicker than `microslab_max_thickness`.

use crate::components::{Component, Sld, Slab};
use crate::error::{LayerFitError, Result};
use crate::parameters::{
    ParamId, Parameter, ParameterError, ParameterGraph, ParameterSet, PriorDistribution,
};
use crate::utils::{simpson, Pchip};
use log::trace;
use ndarray::{Array1, Array2};
use std::sync::{Arc, Mutex, PoisonError};

/// Roughness given to the last microslab, smoothing the step into the next layer.
pub const LAST_SLAB_ROUGHNESS: f64 = 0.5;

/// Knots at which the profile is held at its end values when `zgrad` is set.
const OUTER_KNOT: f64 = 1.1;

#[derive(Debug)]
struct CachedInterpolant {
    zeds: Vec<f64>,
    vf: Vec<f64>,
    ends: (f64, f64),
    extent: f64,
    interpolant: Arc<Pchip>,
}

/// A layer whose volume fraction follows a spline.
///
/// Built with [`SplineProfile::builder`]. The profile itself holds only
/// parameter handles; every evaluation reads the current values from a
/// [`ParameterSet`].
///
/// # Examples
///
/// ```
/// use layerfit_rs::components::{Component, Sld, SplineProfile};
/// use layerfit_rs::parameters::ParameterSet;
///
/// let mut params = ParameterSet::new();
/// let polymer = Sld::new(&mut params, "polymer", 0.46, 0.0);
/// let solvent = Sld::new(&mut params, "d2o", 6.36, 0.0);
///
/// let brush = SplineProfile::builder("brush", 100.0, &[0.5, 0.5], &[0.3, 0.7], polymer, solvent)
///     .zgrad(false)
///     .build(&mut params)
///     .unwrap();
///
/// // one microslab per length unit, solvent fraction `1 - vf`
/// let slabs = brush.slabs(&params).unwrap();
/// assert_eq!(slabs.nrows(), 100);
/// assert!((slabs[[0, 4]] - 0.7).abs() < 1e-12);
///
/// // two knot spacings and two knot heights vary
/// assert_eq!(brush.parameters().unique_varying(&params).len(), 4);
/// ```
#[derive(Debug)]
pub struct SplineProfile {
    name: String,
    extent: ParamId,
    dz: Vec<ParamId>,
    vf: Vec<ParamId>,
    polymer: Sld,
    solvent: Sld,
    gamma: ParamId,
    left_slabs: Vec<Arc<Slab>>,
    right_slabs: Vec<Arc<Slab>>,
    zgrad: bool,
    microslab_max_thickness: f64,
    cache: Mutex<Option<CachedInterpolant>>,
}

/// Builder for [`SplineProfile`].
#[derive(Debug, Clone)]
pub struct SplineProfileBuilder {
    name: String,
    extent: f64,
    dz: Vec<f64>,
    vf: Vec<f64>,
    polymer: Sld,
    solvent: Sld,
    gamma: Option<Parameter>,
    left_slabs: Vec<Arc<Slab>>,
    right_slabs: Vec<Arc<Slab>>,
    zgrad: bool,
    microslab_max_thickness: f64,
}

impl SplineProfileBuilder {
    /// Parameter holding the adsorbed amount. Its prior is applied to the
    /// integrated profile area. Defaults to a fixed, unbounded parameter.
    pub fn gamma(mut self, gamma: Parameter) -> Self {
        self.gamma = Some(gamma);
        self
    }

    /// Slabs between the fronting medium and the spline.
    pub fn left_slabs(mut self, slabs: Vec<Arc<Slab>>) -> Self {
        self.left_slabs = slabs;
        self
    }

    /// Slabs between the spline and the backing medium.
    pub fn right_slabs(mut self, slabs: Vec<Arc<Slab>>) -> Self {
        self.right_slabs = slabs;
        self
    }

    /// Hold the end values over an extra knot on each side, flattening the
    /// gradient where the profile meets its neighbours. On by default.
    pub fn zgrad(mut self, zgrad: bool) -> Self {
        self.zgrad = zgrad;
        self
    }

    /// Upper limit on the thickness of the microslabs the profile is cut
    /// into. Defaults to 1.
    pub fn microslab_max_thickness(mut self, thickness: f64) -> Self {
        self.microslab_max_thickness = thickness;
        self
    }

    /// Register the profile's parameters in `params` and build it.
    ///
    /// The extent is added as a fixed parameter and each `dz` and `vf` as a
    /// varying parameter with a `[0, 1]` prior.
    ///
    /// # Errors
    ///
    /// * [`LayerFitError::InvalidInput`] when `dz` and `vf` differ in length,
    ///   are empty, or the microslab thickness is not positive
    pub fn build(self, params: &mut ParameterSet) -> Result<SplineProfile> {
        if self.dz.len() != self.vf.len() {
            return Err(LayerFitError::InvalidInput(format!(
                "dz and vf must have the same length, got {} and {}",
                self.dz.len(),
                self.vf.len()
            )));
        }
        if self.vf.is_empty() {
            return Err(LayerFitError::InvalidInput(
                "a spline profile needs at least one knot".to_string(),
            ));
        }
        if !(self.microslab_max_thickness > 0.0) {
            return Err(LayerFitError::InvalidInput(format!(
                "microslab thickness must be positive, got {}",
                self.microslab_max_thickness
            )));
        }

        let name = self.name;
        let extent = params.add(Parameter::fixed(&format!("{} - spline extent", name), self.extent));
        let mut knot_params = |label: &str, values: &[f64]| -> Result<Vec<ParamId>> {
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| -> Result<ParamId> {
                    let mut param = Parameter::new(&format!("{} - spline {}[{}]", name, label, i), v);
                    param.range(0.0, 1.0)?;
                    Ok(params.add(param))
                })
                .collect()
        };
        let dz = knot_params("dz", &self.dz)?;
        let vf = knot_params("vf", &self.vf)?;
        let gamma = self
            .gamma
            .unwrap_or_else(|| Parameter::fixed(&format!("{} - gamma", name), 0.0));
        let gamma = params.add(gamma);

        Ok(SplineProfile {
            name,
            extent,
            dz,
            vf,
            polymer: self.polymer,
            solvent: self.solvent,
            gamma,
            left_slabs: self.left_slabs,
            right_slabs: self.right_slabs,
            zgrad: self.zgrad,
            microslab_max_thickness: self.microslab_max_thickness,
            cache: Mutex::new(None),
        })
    }
}

impl SplineProfile {
    /// Start building a profile spanning `extent`, with knot spacings `dz`
    /// and knot volume fractions `vf`.
    pub fn builder(
        name: &str,
        extent: f64,
        dz: &[f64],
        vf: &[f64],
        polymer: Sld,
        solvent: Sld,
    ) -> SplineProfileBuilder {
        SplineProfileBuilder {
            name: name.to_string(),
            extent,
            dz: dz.to_vec(),
            vf: vf.to_vec(),
            polymer,
            solvent,
            gamma: None,
            left_slabs: Vec::new(),
            right_slabs: Vec::new(),
            zgrad: true,
            microslab_max_thickness: 1.0,
        }
    }

    /// Handle of the thickness of the spline region.
    pub fn extent(&self) -> ParamId {
        self.extent
    }

    pub fn dz(&self) -> &[ParamId] {
        &self.dz
    }

    pub fn vf(&self) -> &[ParamId] {
        &self.vf
    }

    /// Handle of the adsorbed amount, whose prior constrains the profile area.
    pub fn gamma(&self) -> ParamId {
        self.gamma
    }

    pub fn polymer(&self) -> Sld {
        self.polymer
    }

    pub fn solvent(&self) -> Sld {
        self.solvent
    }

    pub fn left_slabs(&self) -> &[Arc<Slab>] {
        &self.left_slabs
    }

    pub fn right_slabs(&self) -> &[Arc<Slab>] {
        &self.right_slabs
    }

    pub fn zgrad(&self) -> bool {
        self.zgrad
    }

    pub fn microslab_max_thickness(&self) -> f64 {
        self.microslab_max_thickness
    }

    fn extent_value(&self, params: &ParameterSet) -> Result<f64> {
        let extent = params.value(self.extent)?;
        if !(extent > 0.0 && extent.is_finite()) {
            return Err(LayerFitError::InvalidParameter(format!(
                "spline extent must be positive and finite, got {}",
                extent
            )));
        }
        Ok(extent)
    }

    /// Normalised knot positions and knot volume fractions.
    fn knot_table(&self, params: &ParameterSet) -> Result<(Vec<f64>, Vec<f64>)> {
        let mut zeds = Vec::with_capacity(self.dz.len());
        let mut position = 0.0;
        for &id in &self.dz {
            position += params.value(id)?;
            zeds.push(position);
        }
        if let Some(&last) = zeds.last() {
            if last > 1.0 {
                for z in zeds.iter_mut() {
                    *z = (*z / last).clamp(0.0, 1.0);
                }
            }
        }

        let vf = self
            .vf
            .iter()
            .map(|&id| params.value(id))
            .collect::<std::result::Result<Vec<_>, ParameterError>>()?;
        Ok((zeds, vf))
    }

    fn polymer_fraction(params: &ParameterSet, slab: &Slab) -> Result<f64> {
        Ok(1.0 - params.value(slab.vfsolv())?)
    }

    /// The interpolant through the current knots, in units of the extent.
    ///
    /// The interpolant is rebuilt only when the knots, the end values taken
    /// from the neighbouring slabs or the extent change; otherwise the
    /// previously built one is returned.
    pub fn interpolator(&self, params: &ParameterSet) -> Result<Arc<Pchip>> {
        let (zeds, vf) = self.knot_table(params)?;
        let extent = params.value(self.extent)?;

        let left_end = match self.left_slabs.last() {
            Some(slab) => Self::polymer_fraction(params, slab)?,
            None => vf[0],
        };
        let right_end = match self.right_slabs.first() {
            Some(slab) => Self::polymer_fraction(params, slab)?,
            None => 0.0,
        };

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.as_ref() {
            if cached.zeds == zeds
                && cached.vf == vf
                && cached.ends == (left_end, right_end)
                && cached.extent == extent
            {
                return Ok(Arc::clone(&cached.interpolant));
            }
        }

        let (mut knots, mut values) = if self.zgrad {
            (vec![-OUTER_KNOT, -f64::EPSILON], vec![left_end, left_end])
        } else {
            (vec![-f64::EPSILON], vec![left_end])
        };
        knots.extend_from_slice(&zeds);
        values.extend_from_slice(&vf);
        knots.push(1.0 + f64::EPSILON);
        values.push(right_end);
        if self.zgrad {
            knots.push(1.0 + OUTER_KNOT);
            values.push(right_end);
        }
        let (knots, values) = merge_coincident(knots, values);

        trace!(
            "rebuilding interpolant for '{}' through {} knots",
            self.name,
            knots.len()
        );
        let interpolant = Arc::new(Pchip::new(
            Array1::from(knots).view(),
            Array1::from(values).view(),
        )?);
        *cache = Some(CachedInterpolant {
            zeds,
            vf,
            ends: (left_end, right_end),
            extent,
            interpolant: Arc::clone(&interpolant),
        });
        Ok(interpolant)
    }

    /// Volume fraction at distance `z` into the spline region.
    pub fn value_at(&self, params: &ParameterSet, z: f64) -> Result<f64> {
        let extent = self.extent_value(params)?;
        Ok(self.interpolator(params)?.evaluate(z / extent))
    }

    /// Volume fractions at each distance in `z`.
    pub fn values_at(&self, params: &ParameterSet, z: &Array1<f64>) -> Result<Array1<f64>> {
        let extent = self.extent_value(params)?;
        let interpolant = self.interpolator(params)?;
        Ok(z.mapv(|zi| interpolant.evaluate(zi / extent)))
    }

    /// Knot positions measured from the top of the left slabs, and knot values.
    pub fn knots(&self, params: &ParameterSet) -> Result<(Array1<f64>, Array1<f64>)> {
        let extent = self.extent_value(params)?;
        let offset = self.left_thickness(params)?;
        let (zeds, vf) = self.knot_table(params)?;
        let z = zeds.iter().map(|z| offset + z * extent).collect();
        Ok((z, Array1::from(vf)))
    }

    fn left_thickness(&self, params: &ParameterSet) -> Result<f64> {
        self.left_slabs
            .iter()
            .map(|s| params.value(s.thick()).map_err(LayerFitError::from))
            .sum()
    }

    /// `(end, polymer fraction)` for consecutive slabs starting at `origin`.
    fn segments(params: &ParameterSet, slabs: &[Arc<Slab>], origin: f64) -> Result<Vec<(f64, f64)>> {
        let mut end = origin;
        slabs
            .iter()
            .map(|slab| -> Result<(f64, f64)> {
                end += params.value(slab.thick())?;
                Ok((end, Self::polymer_fraction(params, slab)?))
            })
            .collect()
    }

    /// Volume fraction through the left slabs, the spline and the right slabs.
    ///
    /// Returns `points` evenly spaced depths from zero to the total thickness
    /// and the volume fraction at each. By default the spacing is about one
    /// length unit.
    pub fn profile(
        &self,
        params: &ParameterSet,
        points: Option<usize>,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        let extent = self.extent_value(params)?;
        let interpolant = self.interpolator(params)?;
        let left = Self::segments(params, &self.left_slabs, 0.0)?;
        let offset = left.last().map_or(0.0, |s| s.0);
        let right = Self::segments(params, &self.right_slabs, offset + extent)?;
        let total = right.last().map_or(offset + extent, |s| s.0);

        let points = points.unwrap_or(total.ceil() as usize + 1).max(2);
        let z = Array1::linspace(0.0, total, points);
        let vf = z.mapv(|zi| {
            if zi < offset {
                piecewise(&left, zi)
            } else if zi <= offset + extent || right.is_empty() {
                interpolant.evaluate((zi - offset) / extent)
            } else {
                piecewise(&right, zi)
            }
        });
        Ok((z, vf))
    }

    /// Integrated polymer volume fraction over the spline and its adjoining slabs.
    pub fn profile_area(&self, params: &ParameterSet) -> Result<f64> {
        let extent = self.extent_value(params)?;
        let mut area = self.interpolator(params)?.integrate(0.0, 1.0) * extent;
        for slab in self.left_slabs.iter().chain(self.right_slabs.iter()) {
            area += params.value(slab.thick())? * Self::polymer_fraction(params, slab)?;
        }
        Ok(area)
    }

    /// `order`-th moment of the volume-fraction profile, normalised by its area.
    pub fn moment(&self, params: &ParameterSet, order: i32) -> Result<f64> {
        let (z, vf) = self.profile(params, None)?;
        let weighted = &vf * &z.mapv(|zi| zi.powi(order));
        Ok(simpson(weighted.view(), z.view()) / self.profile_area(params)?)
    }
}

/// Collapse runs of knots at the same position onto the last of them.
///
/// A zero `dz` spacing is inside its prior but would give the interpolant two
/// knots at one depth.
fn merge_coincident(knots: Vec<f64>, values: Vec<f64>) -> (Vec<f64>, Vec<f64>) {
    let mut merged_knots: Vec<f64> = Vec::with_capacity(knots.len());
    let mut merged_values: Vec<f64> = Vec::with_capacity(values.len());
    for (z, v) in knots.into_iter().zip(values) {
        match (merged_knots.last(), merged_values.last_mut()) {
            (Some(&previous), Some(value)) if previous == z => *value = v,
            _ => {
                merged_knots.push(z);
                merged_values.push(v);
            }
        }
    }
    (merged_knots, merged_values)
}

fn piecewise(segments: &[(f64, f64)], z: f64) -> f64 {
    segments
        .iter()
        .find(|(end, _)| z < *end)
        .or_else(|| segments.last())
        .map_or(0.0, |s| s.1)
}

impl Component for SplineProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> ParameterGraph {
        let mut graph = ParameterGraph::named(&self.name);
        graph.push_param(self.extent);
        graph.push_group(ParameterGraph::from_params("dz - spline", &self.dz));
        graph.push_group(ParameterGraph::from_params("vf - spline", &self.vf));
        graph.push_group(self.solvent.parameters());
        graph.push_group(self.polymer.parameters());
        graph.push_param(self.gamma);
        for slab in self.left_slabs.iter().chain(self.right_slabs.iter()) {
            graph.push_group(slab.parameters());
        }
        graph
    }

    fn slabs(&self, params: &ParameterSet) -> Result<Array2<f64>> {
        let extent = self.extent_value(params)?;
        let interpolant = self.interpolator(params)?;

        let count = (extent / self.microslab_max_thickness).ceil().max(1.0) as usize;
        let thick = extent / count as f64;
        let real = params.value(self.polymer.real())?;
        let imag = params.value(self.polymer.imag())?;

        let mut slabs = Array2::zeros((count, 5));
        for (i, mut row) in slabs.rows_mut().into_iter().enumerate() {
            let middle = (i as f64 + 0.5) * thick;
            row[0] = thick;
            row[1] = real;
            row[2] = imag;
            row[4] = 1.0 - interpolant.evaluate(middle / extent);
        }
        slabs[[count - 1, 3]] = LAST_SLAB_ROUGHNESS;
        Ok(slabs)
    }

    /// The gamma parameter's prior evaluated at the profile area.
    fn logp(&self, params: &ParameterSet) -> Result<f64> {
        let area = self.profile_area(params)?;
        let gamma = params
            .get(self.gamma)
            .ok_or(ParameterError::UnknownHandle {
                index: self.gamma.index(),
            })?;
        Ok(gamma.bounds().logpdf(area))
    }
}
