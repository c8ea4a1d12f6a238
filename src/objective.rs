//! Objective function combining a model, a dataset and a parameter set.
//!
//! This module defines the [`Objective`], which turns a [`Model`] and a
//! [`Dataset`] into the quantities an optimizer or sampler needs: residuals,
//! chi-squared, log-prior, log-likelihood and log-posterior, along with a
//! covariance estimate and draws from a stored posterior chain.
//!
//! Every public numeric method taking `pvals: Option<&[f64]>` first installs
//! those values with [`Objective::setp`], so the result always reflects the
//! parameter values currently held by the objective.

use crate::dataset::Dataset;
use crate::error::{LayerFitError, Result};
use crate::model::Model;
use crate::parameters::{
    ParamId, Parameter, ParameterGraph, ParameterSet, PriorDistribution,
};
use crate::uncertainty::{covariance_from_jacobian, Chain, PosteriorSamples};
use crate::utils::finite_difference::jacobian;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rayon::prelude::*;
use std::f64::consts::PI;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static OBJECTIVE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Transform applied to observations and model before residuals are formed.
///
/// Called as `transform(x, y, y_err)` and returns the transformed
/// `(y, y_err)`. The model prediction is passed through with `y_err = None`.
pub type TransformFn = dyn Fn(
        ArrayView1<f64>,
        ArrayView2<f64>,
        Option<ArrayView2<f64>>,
    ) -> Result<(Array2<f64>, Option<Array2<f64>>)>
    + Send
    + Sync;

/// Extra log-probability term, called with the model, the data and the
/// currently installed parameter values.
pub type LogpExtraFn<M, D> = dyn Fn(&M, &D, &ParameterSet) -> Result<f64> + Send + Sync;

/// How residuals from several observed channels are reduced to a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelCombination {
    /// One residual per point: the channel residuals are added together.
    #[default]
    Sum,
    /// One residual per point and channel, all of channel 0 first.
    Stack,
}

/// A model, a dataset and the parameter values they are evaluated at.
///
/// The objective borrows the model and the data and owns the
/// [`ParameterSet`]. Varying parameters are the unique varying leaves of
/// [`parameters`](Objective::parameters), in first-occurrence order; every
/// `pvals` vector passed to the objective follows that order.
///
/// # Examples
///
/// ```
/// use layerfit_rs::dataset::Data1D;
/// use layerfit_rs::model::BaseModel;
/// use layerfit_rs::objective::Objective;
/// use layerfit_rs::parameters::{ParameterGraph, ParameterSet};
/// use ndarray::{array, Axis};
///
/// let mut params = ParameterSet::new();
/// let slope = params.add_param_with_bounds("slope", 1.0, 0.0, 5.0).unwrap();
/// let offset = params.add_param("offset", 0.0);
///
/// let model = BaseModel::new(
///     ParameterGraph::from_params("line", &[slope, offset]),
///     move |p, x, _| {
///         let (m, c) = (p.value(slope)?, p.value(offset)?);
///         Ok(x.mapv(|v| m * v + c).insert_axis(Axis(0)))
///     },
/// );
/// let data = Data1D::new(array![0.0, 1.0, 2.0], array![1.0, 3.0, 5.0])
///     .unwrap()
///     .with_y_err(array![0.5, 0.5, 0.5])
///     .unwrap();
///
/// let mut objective = Objective::new(&model, &data, params).with_name("line fit");
/// assert_eq!(objective.varying_parameters(), vec![slope, offset]);
///
/// // An exact fit leaves only the normalisation of the likelihood
/// let logl = objective.logl(Some(&[2.0, 1.0][..])).unwrap();
/// let expected = -1.5 * (2.0 * std::f64::consts::PI * 0.25).ln();
/// assert!((logl - expected).abs() < 1e-12);
///
/// // Outside the slope's prior the posterior is impossible
/// assert_eq!(objective.logpost(Some(&[6.0, 1.0][..])).unwrap(), f64::NEG_INFINITY);
/// ```
pub struct Objective<'a, M, D> {
    model: &'a M,
    data: &'a D,
    params: ParameterSet,
    lnsigma: Option<ParamId>,
    use_weights: bool,
    transform: Option<Arc<TransformFn>>,
    logp_extra: Option<Arc<LogpExtraFn<M, D>>>,
    name: String,
    combination: ChannelCombination,
    chain: Option<Chain>,
}

impl<M, D> Clone for Objective<'_, M, D> {
    fn clone(&self) -> Self {
        Self {
            model: self.model,
            data: self.data,
            params: self.params.clone(),
            lnsigma: self.lnsigma,
            use_weights: self.use_weights,
            transform: self.transform.clone(),
            logp_extra: self.logp_extra.clone(),
            name: self.name.clone(),
            combination: self.combination,
            chain: self.chain.clone(),
        }
    }
}

impl<'a, M: Model, D: Dataset> Objective<'a, M, D> {
    /// Create an objective over `model` and `data`.
    ///
    /// `params` must hold every parameter the model refers to. The objective
    /// takes ownership of it; read or change values afterwards through
    /// [`params`](Self::params) and [`params_mut`](Self::params_mut).
    pub fn new(model: &'a M, data: &'a D, params: ParameterSet) -> Self {
        let id = OBJECTIVE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            model,
            data,
            params,
            lnsigma: None,
            use_weights: true,
            transform: None,
            logp_extra: None,
            name: format!("objective-{}", id),
            combination: ChannelCombination::default(),
            chain: None,
        }
    }

    /// Add a parameter for the fractional underestimate of the uncertainties.
    ///
    /// The variance of each point becomes `y_err^2 + exp(2 lnsigma) model^2`.
    pub fn with_lnsigma(mut self, lnsigma: Parameter) -> Self {
        self.lnsigma = Some(self.params.add(lnsigma));
        self
    }

    /// Whether residuals and the likelihood use the data's uncertainties.
    ///
    /// Defaults to `true`. Has no effect when the data carry no uncertainties.
    pub fn with_use_weights(mut self, use_weights: bool) -> Self {
        self.use_weights = use_weights;
        self
    }

    /// Transform the observations and the model before residuals are formed.
    ///
    /// # Arguments
    ///
    /// * `transform` - Called as `transform(x, y, y_err)`; see [`TransformFn`]
    ///
    /// The same transform is applied to the model prediction, with `y_err`
    /// set to `None`.
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(
                ArrayView1<f64>,
                ArrayView2<f64>,
                Option<ArrayView2<f64>>,
            ) -> Result<(Array2<f64>, Option<Array2<f64>>)>
            + Send
            + Sync
            + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Add a term to the log-likelihood.
    ///
    /// The function sees the model, the data and the installed parameter
    /// values, and its result is added by [`logl`](Self::logl) and so by
    /// [`logpost`](Self::logpost).
    pub fn with_logp_extra<F>(mut self, logp_extra: F) -> Self
    where
        F: Fn(&M, &D, &ParameterSet) -> Result<f64> + Send + Sync + 'static,
    {
        self.logp_extra = Some(Arc::new(logp_extra));
        self
    }

    /// Replace the generated `objective-<n>` name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// How residuals of several channels are combined. Defaults to
    /// [`ChannelCombination::Sum`].
    pub fn with_channel_combination(mut self, combination: ChannelCombination) -> Self {
        self.combination = combination;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &M {
        self.model
    }

    pub fn data(&self) -> &D {
        self.data
    }

    /// The parameter set, holding the currently installed values.
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    /// Handle of the `lnsigma` parameter, if one was added.
    pub fn lnsigma(&self) -> Option<ParamId> {
        self.lnsigma
    }

    pub fn channel_combination(&self) -> ChannelCombination {
        self.combination
    }

    /// Whether the data carry uncertainties and the objective uses them.
    pub fn weighted(&self) -> bool {
        self.data.weighted() && self.use_weights
    }

    pub fn set_use_weights(&mut self, use_weights: bool) {
        self.use_weights = use_weights;
    }

    /// Number of residuals.
    pub fn npoints(&self) -> usize {
        match self.combination {
            ChannelCombination::Sum => self.data.npoints(),
            ChannelCombination::Stack => self.data.y().len(),
        }
    }

    /// All parameters of the system, `lnsigma` first when present.
    pub fn parameters(&self) -> ParameterGraph {
        match self.lnsigma {
            Some(id) => ParameterGraph::from_params("lnsigma", &[id]).join(self.model.parameters()),
            None => self.model.parameters(),
        }
    }

    /// Handles of the unique varying parameters, in the order of `setp`.
    pub fn varying_parameters(&self) -> Vec<ParamId> {
        self.parameters().unique_varying(&self.params)
    }

    /// Current values of the unique varying parameters.
    pub fn varying_values(&self) -> Array1<f64> {
        self.params.varying_values(&self.varying_parameters())
    }

    /// Install parameter values.
    ///
    /// # Arguments
    ///
    /// * `pvals` - Either one value per unique varying parameter, or one value
    ///   per leaf of [`parameters`](Self::parameters). Constrained leaves of a
    ///   full-length vector are skipped.
    ///
    /// # Returns
    ///
    /// * `Ok(())`, or [`LayerFitError::DimensionMismatch`] for any other
    ///   length, in which case nothing is changed
    pub fn setp(&mut self, pvals: &[f64]) -> Result<()> {
        self.parameters().set_values(&mut self.params, pvals)
    }

    fn install(&mut self, pvals: Option<&[f64]>) -> Result<()> {
        match pvals {
            Some(pvals) => self.setp(pvals),
            None => Ok(()),
        }
    }

    /// Model prediction for the dataset, shape `(n_channels, n_points)`.
    pub fn generative(&mut self, pvals: Option<&[f64]>) -> Result<Array2<f64>> {
        self.install(pvals)?;
        self.evaluate_model()
    }

    fn evaluate_model(&self) -> Result<Array2<f64>> {
        let x = self.data.x();
        let x_err = self.data.x_err();
        self.model
            .evaluate(&self.params, x.view(), x_err.as_ref().map(|e| e.view()))
    }

    /// Observations, their uncertainties (when weighted) and the model,
    /// after the transform.
    fn transformed(&self) -> Result<(Array2<f64>, Option<Array2<f64>>, Array2<f64>)> {
        let model = self.evaluate_model()?;
        let y = self.data.y();
        let y_err = if self.weighted() { self.data.y_err() } else { None };

        if model.dim() != y.dim() {
            return Err(LayerFitError::DimensionMismatch(format!(
                "model produced shape {:?}, observations have shape {:?}",
                model.dim(),
                y.dim()
            )));
        }

        match &self.transform {
            Some(transform) => {
                let x = self.data.x();
                let (y, y_err) = transform(x.view(), y.view(), y_err.as_ref().map(|e| e.view()))?;
                let (model, _) = transform(x.view(), model.view(), None)?;
                Ok((y, y_err, model))
            }
            None => Ok((y, y_err, model)),
        }
    }

    fn current_residuals(&self) -> Result<Array1<f64>> {
        let (y, y_err, model) = self.transformed()?;
        let mut resid = y - &model;
        if let Some(y_err) = y_err {
            resid /= &y_err;
        }

        Ok(match self.combination {
            ChannelCombination::Sum => resid.sum_axis(Axis(0)),
            ChannelCombination::Stack => resid.iter().copied().collect(),
        })
    }

    /// Residuals `(y - model)`, divided by `y_err` when weighted.
    pub fn residuals(&mut self, pvals: Option<&[f64]>) -> Result<Array1<f64>> {
        self.install(pvals)?;
        self.current_residuals()
    }

    fn current_chisqr(&self) -> Result<f64> {
        let resid = self.current_residuals()?;
        Ok(resid.dot(&resid))
    }

    /// Sum of squared residuals.
    pub fn chisqr(&mut self, pvals: Option<&[f64]>) -> Result<f64> {
        self.install(pvals)?;
        self.current_chisqr()
    }

    fn current_logp(&self) -> f64 {
        let logp = self.parameters().logp(&self.params);
        if logp.is_finite() {
            logp
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Log-prior: the sum of the priors of the unique varying parameters.
    ///
    /// Any non-finite sum is reported as `-inf`.
    pub fn logp(&mut self, pvals: Option<&[f64]>) -> Result<f64> {
        self.install(pvals)?;
        Ok(self.current_logp())
    }

    fn current_logl(&self) -> Result<f64> {
        if !self.weighted() {
            return Err(LayerFitError::NotImplemented(
                "the log-likelihood needs experimental uncertainties; this objective is unweighted"
                    .to_string(),
            ));
        }

        let (y, y_err, model) = self.transformed()?;
        let y_err = y_err.ok_or_else(|| {
            LayerFitError::NotImplemented(
                "the transform removed the experimental uncertainties".to_string(),
            )
        })?;

        let mut var_y = y_err.mapv(|e| e * e);
        if let Some(id) = self.lnsigma {
            let scale = (2.0 * self.params.value(id)?).exp();
            var_y = var_y + model.mapv(|m| m * m) * scale;
        }

        let data_term: f64 = y
            .iter()
            .zip(model.iter())
            .zip(var_y.iter())
            .map(|((y, m), v)| (y - m).powi(2) / v + (2.0 * PI * v).ln())
            .sum();

        let mut logl = -0.5 * data_term;
        logl += self.model.logp(&self.params)?;
        if let Some(extra) = &self.logp_extra {
            logl += extra(self.model, self.data, &self.params)?;
        }
        Ok(logl)
    }

    /// Log-likelihood of the data, plus the model's own log-probability and
    /// the extra term.
    ///
    /// Only defined for weighted objectives; otherwise this returns
    /// [`LayerFitError::NotImplemented`].
    pub fn logl(&mut self, pvals: Option<&[f64]>) -> Result<f64> {
        self.install(pvals)?;
        self.current_logl()
    }

    /// Negative log-likelihood.
    pub fn nll(&mut self, pvals: Option<&[f64]>) -> Result<f64> {
        Ok(-self.logl(pvals)?)
    }

    fn current_logpost(&self) -> Result<f64> {
        let logp = self.current_logp();
        if !logp.is_finite() {
            return Ok(f64::NEG_INFINITY);
        }
        Ok(logp + self.current_logl()?)
    }

    /// Log-posterior, `logp + logl`.
    ///
    /// When the prior is impossible the result is `-inf` and the likelihood
    /// is not evaluated, so an unweighted objective still reports `-inf`
    /// outside the prior.
    ///
    /// # Arguments
    ///
    /// * `pvals` - Values to install first, as for [`setp`](Self::setp)
    ///
    /// # Returns
    ///
    /// * The log-posterior at the installed values, or the first error from
    ///   evaluating the model, the constraints or the likelihood
    pub fn logpost(&mut self, pvals: Option<&[f64]>) -> Result<f64> {
        self.install(pvals)?;
        self.current_logpost()
    }

    /// Log-posterior of each row of `pvals`, evaluated in parallel.
    ///
    /// Every worker evaluates on its own copy of the objective; the installed
    /// values of `self` are not touched.
    pub fn logpost_batch(&self, pvals: ArrayView2<f64>) -> Result<Vec<f64>>
    where
        M: Sync,
        D: Sync,
    {
        (0..pvals.nrows())
            .into_par_iter()
            .map_init(
                || self.clone(),
                |objective, i| {
                    let row = pvals.row(i).to_vec();
                    objective.logpost(Some(row.as_slice()))
                },
            )
            .collect()
    }

    /// Map a point of the unit hypercube to parameter space through the
    /// inverse CDF of each varying parameter's prior.
    pub fn prior_transform(&self, u: &[f64]) -> Result<Array1<f64>> {
        let varying = self.varying_parameters();
        if u.len() != varying.len() {
            return Err(LayerFitError::DimensionMismatch(format!(
                "got {} quantiles for {} varying parameters",
                u.len(),
                varying.len()
            )));
        }

        varying
            .iter()
            .zip(u)
            .map(|(&id, &u)| self.params[id].bounds().invcdf(u).map_err(LayerFitError::from))
            .collect()
    }

    /// Forward-difference Jacobian of the residuals around `pvals`.
    ///
    /// Differentiates with respect to the fractional change of each parameter
    /// when possible; the flag in the result says whether that scaling was used.
    fn residual_jacobian(&mut self, pvals: &Array1<f64>) -> Result<(Array2<f64>, bool)> {
        if pvals.iter().any(|&v| v == 0.0) {
            debug!(
                "{}: a varying parameter is zero, differentiating without scaling",
                self.name
            );
        } else {
            let ones = Array1::ones(pvals.len());
            let jac = jacobian(
                |scale| {
                    let values = (pvals * scale).to_vec();
                    self.residuals(Some(values.as_slice()))
                },
                &ones,
            )?;
            if jac.iter().all(|v| v.is_finite()) {
                return Ok((jac, true));
            }
            debug!(
                "{}: scaled Jacobian is not finite, differentiating without scaling",
                self.name
            );
        }

        let jac = jacobian(|values| self.residuals(Some(values.to_vec().as_slice())), pvals)?;
        Ok((jac, false))
    }

    /// Estimate the covariance matrix of the varying parameters.
    ///
    /// Rows and columns follow [`varying_parameters`](Self::varying_parameters).
    /// The residual Jacobian is differentiated numerically and inverted through
    /// its SVD. Parameters that have no effect on the residuals make this fail
    /// with [`LayerFitError::SingularParameters`]. For unweighted objectives the
    /// result is scaled by the reduced chi-squared. The installed parameter
    /// values are unchanged afterwards.
    pub fn covar(&mut self) -> Result<Array2<f64>> {
        let varying = self.varying_parameters();
        let pvals = self.params.varying_values(&varying);

        let differentiated = self.residual_jacobian(&pvals);
        self.setp(&pvals.to_vec())?;
        let (jac, scaled) = differentiated?;

        let mut covar = covariance_from_jacobian(&jac)?;
        if scaled {
            let column = pvals.view().insert_axis(Axis(1));
            let row = pvals.view().insert_axis(Axis(0));
            covar = covar * column.dot(&row);
        }

        let singular: Vec<usize> = (0..varying.len())
            .filter(|&j| covar[[j, j]] == 0.0 || jac.column(j).iter().all(|&v| v == 0.0))
            .collect();
        if !singular.is_empty() {
            let names: Vec<String> = singular
                .iter()
                .map(|&j| self.params[varying[j]].name().to_string())
                .collect();
            warn!(
                "{}: parameters with no effect on the residuals: {}",
                self.name,
                names.join(", ")
            );
            return Err(LayerFitError::SingularParameters { names });
        }

        if !self.weighted() {
            let n_datapoints = jac.nrows();
            if n_datapoints <= varying.len() {
                return Err(LayerFitError::InvalidInput(format!(
                    "{} residuals cannot constrain {} varying parameters",
                    n_datapoints,
                    varying.len()
                )));
            }
            let dof = (n_datapoints - varying.len()) as f64;
            let redchi = self.current_chisqr()? / dof;
            debug!("{}: scaling covariance by reduced chi2 {}", self.name, redchi);
            covar *= redchi;
        }

        Ok(covar)
    }

    /// Compute [`covar`](Self::covar) and store the standard error of each
    /// varying parameter.
    pub fn update_stderr(&mut self) -> Result<Array2<f64>> {
        let covar = self.covar()?;
        for (j, id) in self.varying_parameters().into_iter().enumerate() {
            let variance = covar[[j, j]];
            self.params[id].set_stderr(Some(variance.max(0.0).sqrt()));
        }
        Ok(covar)
    }

    /// Install samples of the varying parameters produced by a sampler.
    pub fn set_chain(&mut self, chain: Chain) -> Result<()> {
        let n_varying = self.varying_parameters().len();
        if chain.n_params() != n_varying {
            return Err(LayerFitError::DimensionMismatch(format!(
                "chain has {} columns, objective has {} varying parameters",
                chain.n_params(),
                n_varying
            )));
        }
        self.chain = Some(chain);
        Ok(())
    }

    /// The stored chain, if any.
    pub fn chain(&self) -> Option<&Chain> {
        self.chain.as_ref()
    }

    /// Draw up to `ngen` distinct samples from the stored chain.
    ///
    /// The first `nburn` samples are discarded and then every `nthin`-th is
    /// kept. The draws are copies; nothing is installed.
    pub fn pgen(&self, ngen: usize, nburn: usize, nthin: usize) -> Result<PosteriorSamples<'_>> {
        self.pgen_with_rng(ngen, nburn, nthin, &mut rand::thread_rng())
    }

    /// [`pgen`](Self::pgen) with a caller-supplied random number generator,
    /// for reproducible draws.
    pub fn pgen_with_rng<R: Rng + ?Sized>(
        &self,
        ngen: usize,
        nburn: usize,
        nthin: usize,
        rng: &mut R,
    ) -> Result<PosteriorSamples<'_>> {
        let chain = self.chain.as_ref().ok_or_else(|| {
            LayerFitError::MissingChain(format!("{} has no stored samples", self.name))
        })?;
        chain.draw(ngen, nburn, nthin, rng)
    }
}

impl<M: Model, D: Dataset> fmt::Display for Objective<'_, M, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:_>80}", "")?;
        writeln!(f, "Objective - {}", self.name)?;
        writeln!(f, "Dataset = {}", self.data.name().unwrap_or("<unnamed>"))?;
        writeln!(f, "datapoints = {}", self.npoints())?;
        match self.current_chisqr() {
            Ok(chisqr) => writeln!(f, "chi2 = {}", chisqr)?,
            Err(err) => writeln!(f, "chi2 = <{}>", err)?,
        }
        writeln!(f, "Weighted = {}", self.weighted())?;
        writeln!(f, "Transform = {}", self.transform.is_some())?;
        for id in self.parameters().flatten() {
            let param = &self.params[id];
            let value = self
                .params
                .value(id)
                .map_or_else(|err| format!("<{}>", err), |v| format!("{:.6}", v));
            let stderr = param
                .stderr()
                .map_or_else(|| "None".to_string(), |s| format!("{:.6}", s));
            writeln!(
                f,
                "<Parameter: {:>20}, value={}, vary={}, stderr={}>",
                format!("'{}'", param.name()),
                value,
                param.vary(),
                stderr
            )?;
        }
        Ok(())
    }
}
