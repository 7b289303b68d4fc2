//! Transient response under a held load using the generalized-alpha method.
//!
//! Solves `M·ü + C·u̇ + K·u = F` on the free DOFs of an assembled
//! [`Structure`], with Rayleigh damping `C = α₁·M + α₂·K`. The integration
//! constants follow Chung and Hulbert:
//!
//! ```text
//! α_m = (2ρ − 1) / (ρ + 1)
//! α_f = ρ / (ρ + 1)
//! β   = ¼ (1 − α_m + α_f)²
//! γ   = ½ − α_m + α_f
//! ```
//!
//! where the spectral radius `ρ ∈ (0, 1]` sets the high-frequency numerical damping;
//! `ρ = 1` is non-dissipative.
//!
//! The step size is adapted from a local truncation error estimate. A step is never
//! rejected or repeated: the displacement it produced is kept and the adapted size is
//! used both to advance the clock for that step and for the following step. The
//! recorded time stamps therefore drift ahead of the displacement they label by the
//! difference between the adapted and the used size.
//!
//! # Example
//!
//! ```
//! use trussdyn::{force, point, DynamicIntegrator, ElementProperties, GeneralizedAlphaConfig, Structure, TimeSpan};
//!
//! let mut structure = Structure::new();
//! let a = structure.add_node(point(0.0, 0.0, 0.0));
//! let b = structure.add_node(point(1.0, 0.0, 0.0));
//! structure.set_constraint(a, [true, true, true])?;
//! structure.set_constraint(b, [false, true, true])?;
//! structure.set_force(b, force(1.0, 0.0, 0.0))?;
//! structure.add_element(a, b, ElementProperties::new(1.0, 1.0, 2.0))?;
//!
//! let integrator = DynamicIntegrator::new(&mut structure, GeneralizedAlphaConfig::default())?;
//! let span = TimeSpan::new(0.0, 1.0, 0.125);
//! let history = integrator.integrate(span)?;
//! assert!(history.len() <= span.step_budget());
//! assert!(history.time().last().copied().unwrap_or_default() >= 1.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use crate::assembly::GlobalSystem;
use crate::errors::{AnalysisError, IntegrationParameterError};
use crate::solver::{solve_spd, SpdFactor};
use crate::structure::Structure;

/// Damping and step-control settings for the generalized-alpha integrator.
///
/// Missing fields fall back to [`Default`] when deserialising, so a configuration
/// file only needs to name the values it changes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralizedAlphaConfig {
    /// Mass-proportional Rayleigh coefficient `α₁`.
    pub mass_damping: f64,
    /// Stiffness-proportional Rayleigh coefficient `α₂`.
    pub stiffness_damping: f64,
    /// Spectral radius at infinite frequency, in `(0, 1]`.
    pub spectral_radius: f64,
    /// Target relative error `tol` of the step controller.
    pub error_tolerance: f64,
    /// Lower band factor `v1`; errors below `v1·tol` keep the step.
    pub lower_band: f64,
    /// Upper band factor `v2`; errors above `v2·tol` keep the step.
    pub upper_band: f64,
}

impl Default for GeneralizedAlphaConfig {
    fn default() -> Self {
        Self {
            mass_damping: 0.01,
            stiffness_damping: 0.02,
            spectral_radius: 0.9,
            error_tolerance: 1.0e-2,
            lower_band: 0.5,
            upper_band: 1.0,
        }
    }
}

impl GeneralizedAlphaConfig {
    /// Replace the Rayleigh coefficients.
    #[must_use]
    pub fn with_rayleigh_damping(mut self, mass_damping: f64, stiffness_damping: f64) -> Self {
        self.mass_damping = mass_damping;
        self.stiffness_damping = stiffness_damping;
        self
    }

    /// Replace the spectral radius.
    #[must_use]
    pub fn with_spectral_radius(mut self, spectral_radius: f64) -> Self {
        self.spectral_radius = spectral_radius;
        self
    }

    /// Check every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationParameterError`] for a spectral radius outside `(0, 1]`,
    /// negative or non-finite damping, or an unusable tolerance band.
    pub fn validate(&self) -> Result<(), IntegrationParameterError> {
        let rho = self.spectral_radius;
        if !(rho > 0.0 && rho <= 1.0) {
            return Err(IntegrationParameterError::SpectralRadiusOutOfRange(rho));
        }
        let damping_valid = [self.mass_damping, self.stiffness_damping]
            .iter()
            .all(|value| value.is_finite() && *value >= 0.0);
        if !damping_valid {
            return Err(IntegrationParameterError::InvalidDamping {
                mass: self.mass_damping,
                stiffness: self.stiffness_damping,
            });
        }
        let band_valid = self.error_tolerance.is_finite()
            && self.error_tolerance > 0.0
            && self.lower_band.is_finite()
            && self.upper_band.is_finite()
            && self.lower_band >= 0.0
            && self.lower_band < self.upper_band;
        if !band_valid {
            return Err(IntegrationParameterError::InvalidTolerance {
                tolerance: self.error_tolerance,
                lower: self.lower_band,
                upper: self.upper_band,
            });
        }
        Ok(())
    }

    /// Size of the step following one with relative error `relative_error`.
    ///
    /// Inside the open band `(v1·tol, v2·tol)` the step is scaled by `√(tol/η)`;
    /// anywhere else it is kept.
    #[must_use]
    pub fn next_step(&self, step: f64, relative_error: f64) -> f64 {
        let lower = self.lower_band * self.error_tolerance;
        let upper = self.upper_band * self.error_tolerance;
        if relative_error > lower && relative_error < upper {
            step * (self.error_tolerance / relative_error).sqrt()
        } else {
            step
        }
    }
}

/// Integration constants derived from the spectral radius.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AlphaCoefficients {
    /// Inertia weighting `α_m`.
    pub alpha_m: f64,
    /// Stiffness and damping weighting `α_f`.
    pub alpha_f: f64,
    /// Newmark `β`.
    pub beta: f64,
    /// Newmark `γ`.
    pub gamma: f64,
}

impl AlphaCoefficients {
    /// Chung–Hulbert constants for spectral radius `rho`.
    #[must_use]
    pub fn from_spectral_radius(rho: f64) -> Self {
        let alpha_m = (2.0 * rho - 1.0) / (rho + 1.0);
        let alpha_f = rho / (rho + 1.0);
        let beta = 0.25 * (1.0 - alpha_m + alpha_f).powi(2);
        let gamma = 0.5 - alpha_m + alpha_f;
        Self {
            alpha_m,
            alpha_f,
            beta,
            gamma,
        }
    }

    /// Factor `(6β − 1)/6` of the local truncation error estimate.
    fn error_factor(&self) -> f64 {
        (6.0 * self.beta - 1.0) / 6.0
    }
}

/// Start, end and initial step of an integration run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    /// Start time `t₀`.
    pub start: f64,
    /// End time `t_end`.
    pub end: f64,
    /// Initial step size `dt₀`.
    pub initial_step: f64,
}

impl TimeSpan {
    /// Create a span from `start` to `end` beginning with steps of `initial_step`.
    #[must_use]
    pub const fn new(start: f64, end: f64, initial_step: f64) -> Self {
        Self {
            start,
            end,
            initial_step,
        }
    }

    /// Check that the span is non-empty and the step usable.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationParameterError::NonPositiveStep`] or
    /// [`IntegrationParameterError::EmptyInterval`].
    pub fn validate(&self) -> Result<(), IntegrationParameterError> {
        if !(self.initial_step.is_finite() && self.initial_step > 0.0) {
            return Err(IntegrationParameterError::NonPositiveStep(self.initial_step));
        }
        if !(self.start.is_finite() && self.end.is_finite() && self.end > self.start) {
            return Err(IntegrationParameterError::EmptyInterval {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Maximum number of recorded states, `ceil((t_end − t₀)/dt₀) + 1`.
    #[must_use]
    pub fn step_budget(&self) -> usize {
        ((self.end - self.start) / self.initial_step).ceil() as usize + 1
    }
}

/// Recorded response of a transient run.
///
/// Column `i` of each state matrix belongs to `time()[i]`; rows follow the global
/// free-DOF numbering of the structure.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DynamicHistory {
    /// Time stamps of the recorded states.
    time: Vec<f64>,
    /// Step size in force after each state; entry 0 holds `dt₀`.
    step_sizes: Vec<f64>,
    /// Relative error estimate `η` of the step leaving each state.
    relative_errors: Vec<f64>,
    /// Running sum of the absolute error estimates.
    cumulative_errors: Vec<f64>,
    /// Displacements, `num_dof × steps`.
    displacement: DMatrix<f64>,
    /// Velocities, `num_dof × steps`.
    velocity: DMatrix<f64>,
    /// Accelerations, `num_dof × steps`.
    acceleration: DMatrix<f64>,
}

impl DynamicHistory {
    /// Number of recorded states, including the initial one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time stamps.
    #[must_use]
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Step sizes after adaptation.
    ///
    /// Entry `k` is the size that moved the clock from `time()[k - 1]` to `time()[k]`
    /// and is also the size of the next step. Entry 0 is the initial step.
    #[must_use]
    pub fn step_sizes(&self) -> &[f64] {
        &self.step_sizes
    }

    /// Relative error estimates.
    ///
    /// Entry `k` belongs to the step from state `k` to state `k + 1`; the last entry
    /// has no outgoing step and stays zero.
    #[must_use]
    pub fn relative_errors(&self) -> &[f64] {
        &self.relative_errors
    }

    /// Cumulative absolute error estimates; entry `k` sums every step up to state `k`.
    #[must_use]
    pub fn cumulative_errors(&self) -> &[f64] {
        &self.cumulative_errors
    }

    /// Displacement history matrix.
    #[must_use]
    pub fn displacement(&self) -> &DMatrix<f64> {
        &self.displacement
    }

    /// Velocity history matrix.
    #[must_use]
    pub fn velocity(&self) -> &DMatrix<f64> {
        &self.velocity
    }

    /// Acceleration history matrix.
    #[must_use]
    pub fn acceleration(&self) -> &DMatrix<f64> {
        &self.acceleration
    }

    /// Displacement vector of one recorded state.
    #[must_use]
    pub fn displacement_at(&self, step: usize) -> Option<DVector<f64>> {
        (step < self.len()).then(|| self.displacement.column(step).into_owned())
    }

    /// Velocity vector of one recorded state.
    #[must_use]
    pub fn velocity_at(&self, step: usize) -> Option<DVector<f64>> {
        (step < self.len()).then(|| self.velocity.column(step).into_owned())
    }

    /// Acceleration vector of one recorded state.
    #[must_use]
    pub fn acceleration_at(&self, step: usize) -> Option<DVector<f64>> {
        (step < self.len()).then(|| self.acceleration.column(step).into_owned())
    }

    /// Displacement of a single DOF over time.
    #[must_use]
    pub fn dof_displacement(&self, dof: usize) -> Option<Vec<f64>> {
        (dof < self.displacement.nrows())
            .then(|| self.displacement.row(dof).iter().copied().collect())
    }

    /// Final recorded displacement.
    #[must_use]
    pub fn final_displacement(&self) -> Option<DVector<f64>> {
        self.len()
            .checked_sub(1)
            .and_then(|last| self.displacement_at(last))
    }
}

/// Column-wise recorder used while stepping.
struct Recorder {
    /// Time stamps.
    time: Vec<f64>,
    /// Step sizes.
    step_sizes: Vec<f64>,
    /// Relative errors.
    relative_errors: Vec<f64>,
    /// Cumulative errors.
    cumulative_errors: Vec<f64>,
    /// Displacement columns.
    displacement: Vec<DVector<f64>>,
    /// Velocity columns.
    velocity: Vec<DVector<f64>>,
    /// Acceleration columns.
    acceleration: Vec<DVector<f64>>,
}

impl Recorder {
    /// Empty recorder.
    fn new() -> Self {
        Self {
            time: Vec::new(),
            step_sizes: Vec::new(),
            relative_errors: Vec::new(),
            cumulative_errors: Vec::new(),
            displacement: Vec::new(),
            velocity: Vec::new(),
            acceleration: Vec::new(),
        }
    }

    /// Number of recorded states.
    fn len(&self) -> usize {
        self.time.len()
    }

    /// Append one state. Its relative error stays zero until the step leaving it is taken.
    fn record(&mut self, time: f64, step: f64, cumulative_error: f64, state: &State) {
        self.time.push(time);
        self.step_sizes.push(step);
        self.relative_errors.push(0.0);
        self.cumulative_errors.push(cumulative_error);
        self.displacement.push(state.displacement.clone());
        self.velocity.push(state.velocity.clone());
        self.acceleration.push(state.acceleration.clone());
    }

    /// Store the error of the step leaving the latest state.
    fn set_outgoing_error(&mut self, relative_error: f64) {
        if let Some(last) = self.relative_errors.last_mut() {
            *last = relative_error;
        }
    }

    /// Pack the columns into history matrices.
    fn finish(self, num_dof: usize) -> DynamicHistory {
        let columns = |vectors: &[DVector<f64>]| {
            DMatrix::from_fn(num_dof, vectors.len(), |row, col| vectors[col][row])
        };
        DynamicHistory {
            displacement: columns(&self.displacement),
            velocity: columns(&self.velocity),
            acceleration: columns(&self.acceleration),
            time: self.time,
            step_sizes: self.step_sizes,
            relative_errors: self.relative_errors,
            cumulative_errors: self.cumulative_errors,
        }
    }
}

/// Kinematic state at one instant.
struct State {
    /// Displacement.
    displacement: DVector<f64>,
    /// Velocity.
    velocity: DVector<f64>,
    /// Acceleration.
    acceleration: DVector<f64>,
}

/// Generalized-alpha integrator over the matrices of an assembled structure.
#[derive(Clone, Debug)]
pub struct DynamicIntegrator {
    /// Stiffness `K`.
    stiffness: DMatrix<f64>,
    /// Mass `M`.
    mass: DMatrix<f64>,
    /// Rayleigh damping `C`.
    damping: DMatrix<f64>,
    /// Held external load `F`.
    load: DVector<f64>,
    /// Displacement at `t₀`.
    initial_displacement: DVector<f64>,
    /// Velocity at `t₀`.
    initial_velocity: DVector<f64>,
    /// Damping and step-control settings.
    config: GeneralizedAlphaConfig,
    /// Constants derived from the spectral radius.
    coefficients: AlphaCoefficients,
}

impl DynamicIntegrator {
    /// Build an integrator from a structure, enumerating and assembling it first when
    /// that has not happened yet. The structure is not modified afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidIntegration`] for a rejected configuration and
    /// propagates assembly failures.
    pub fn new(
        structure: &mut Structure,
        config: GeneralizedAlphaConfig,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        let system = structure.ensure_assembled()?;
        Self::from_system(system, config)
    }

    /// Build an integrator from already assembled matrices.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidIntegration`] for a rejected configuration.
    pub fn from_system(
        system: &GlobalSystem,
        config: GeneralizedAlphaConfig,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        let num_dof = system.num_dof();
        Ok(Self {
            stiffness: system.stiffness().clone(),
            mass: system.mass().clone(),
            damping: system.rayleigh_damping(config.mass_damping, config.stiffness_damping),
            load: system.load().clone(),
            initial_displacement: DVector::zeros(num_dof),
            initial_velocity: DVector::zeros(num_dof),
            coefficients: AlphaCoefficients::from_spectral_radius(config.spectral_radius),
            config,
        })
    }

    /// Replace the zero initial displacement and velocity.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DimensionMismatch`] when a vector does not have one
    /// entry per free DOF.
    pub fn with_initial_conditions(
        mut self,
        displacement: DVector<f64>,
        velocity: DVector<f64>,
    ) -> Result<Self, AnalysisError> {
        self.check_dimension(&displacement)?;
        self.check_dimension(&velocity)?;
        self.initial_displacement = displacement;
        self.initial_velocity = velocity;
        Ok(self)
    }

    /// Number of free DOFs being integrated.
    #[must_use]
    pub fn num_dof(&self) -> usize {
        self.load.len()
    }

    /// Settings the integrator was built with.
    #[must_use]
    pub fn config(&self) -> &GeneralizedAlphaConfig {
        &self.config
    }

    /// Integration constants in use.
    #[must_use]
    pub fn coefficients(&self) -> AlphaCoefficients {
        self.coefficients
    }

    /// Rayleigh damping matrix in use.
    #[must_use]
    pub fn damping(&self) -> &DMatrix<f64> {
        &self.damping
    }

    /// Kinetic plus strain energy `½vᵀMv + ½uᵀKu`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DimensionMismatch`] for vectors of the wrong length.
    pub fn mechanical_energy(
        &self,
        displacement: &DVector<f64>,
        velocity: &DVector<f64>,
    ) -> Result<f64, AnalysisError> {
        self.check_dimension(displacement)?;
        self.check_dimension(velocity)?;
        let kinetic = velocity.dot(&(&self.mass * velocity));
        let strain = displacement.dot(&(&self.stiffness * displacement));
        Ok(0.5 * (kinetic + strain))
    }

    /// Advance the response over `span` under the held load.
    ///
    /// The run stops at the first recorded time at or beyond `span.end`, or when
    /// [`TimeSpan::step_budget`] states have been recorded, whichever comes first.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidIntegration`] for a rejected span,
    /// [`AnalysisError::SingularMass`] when the initial acceleration cannot be found and
    /// [`AnalysisError::SingularEffectiveStiffness`] when a step cannot be solved.
    pub fn integrate(&self, span: TimeSpan) -> Result<DynamicHistory, AnalysisError> {
        span.validate()?;
        let budget = span.step_budget();
        let AlphaCoefficients {
            alpha_m,
            alpha_f,
            beta,
            gamma,
        } = self.coefficients;
        info!(
            num_dof = self.num_dof(),
            budget,
            alpha_m,
            alpha_f,
            beta,
            gamma,
            "starting generalized-alpha integration"
        );

        let initial_residual = &self.load
            - &self.damping * &self.initial_velocity
            - &self.stiffness * &self.initial_displacement;
        let mut state = State {
            displacement: self.initial_displacement.clone(),
            velocity: self.initial_velocity.clone(),
            acceleration: solve_spd(&self.mass, &initial_residual)
                .ok_or(AnalysisError::SingularMass)?,
        };

        let mut recorder = Recorder::new();
        let mut time = span.start;
        let mut step = span.initial_step;
        let mut cumulative_error = 0.0;
        recorder.record(time, step, cumulative_error, &state);

        let mut factor = self.factorize(step, time)?;
        let mut factor_step = step;
        while time < span.end && recorder.len() < budget {
            if step != factor_step {
                factor = self.factorize(step, time)?;
                factor_step = step;
            }
            let displacement = factor.solve(&self.effective_load(&state, step));
            let increment = &displacement - &state.displacement;
            let velocity = &increment * (gamma / (beta * step))
                - &state.velocity * ((gamma - beta) / beta)
                - &state.acceleration * ((gamma - 2.0 * beta) / (2.0 * beta) * step);
            let acceleration = &increment / (beta * step * step)
                - &state.velocity / (beta * step)
                - &state.acceleration * ((1.0 - 2.0 * beta) / (2.0 * beta));

            let error = (&acceleration - &state.acceleration)
                * (self.coefficients.error_factor() * step * step);
            let error_norm = error.norm();
            let increment_norm = increment.norm();
            let relative_error = if increment_norm == 0.0 {
                0.0
            } else {
                error_norm / increment_norm
            };
            cumulative_error += error_norm;

            recorder.set_outgoing_error(relative_error);

            // The adapted size already applies to the advance of this step.
            step = self.config.next_step(step, relative_error);
            time += step;
            trace!(time, step, relative_error, "generalized-alpha step");

            state = State {
                displacement,
                velocity,
                acceleration,
            };
            recorder.record(time, step, cumulative_error, &state);
        }

        if time < span.end {
            warn!(
                time,
                end = span.end,
                budget,
                "step budget exhausted before the end time"
            );
        }
        info!(steps = recorder.len(), time, "finished generalized-alpha integration");
        Ok(recorder.finish(self.num_dof()))
    }

    /// Factorise `K_eff` for step size `step`.
    fn factorize(&self, step: f64, time: f64) -> Result<SpdFactor, AnalysisError> {
        SpdFactor::new(self.effective_stiffness(step))
            .ok_or(AnalysisError::SingularEffectiveStiffness { time })
    }

    /// `K_eff = M(1−α_m)/(β dt²) + C γ(1−α_f)/(β dt) + K(1−α_f)`.
    fn effective_stiffness(&self, step: f64) -> DMatrix<f64> {
        let AlphaCoefficients {
            alpha_m,
            alpha_f,
            beta,
            gamma,
        } = self.coefficients;
        &self.mass * ((1.0 - alpha_m) / (beta * step * step))
            + &self.damping * (gamma * (1.0 - alpha_f) / (beta * step))
            + &self.stiffness * (1.0 - alpha_f)
    }

    /// Right-hand side for the displacement at the end of the step.
    fn effective_load(&self, state: &State, step: f64) -> DVector<f64> {
        let AlphaCoefficients {
            alpha_m,
            alpha_f,
            beta,
            gamma,
        } = self.coefficients;
        let State {
            displacement: u,
            velocity: v,
            acceleration: a,
        } = state;
        let damping_terms = u * (gamma * (1.0 - alpha_f) / (beta * step))
            + v * ((gamma - gamma * alpha_f - beta) / beta)
            + a * ((gamma - 2.0 * beta) * (1.0 - alpha_f) / (2.0 * beta) * step);
        let inertia_terms = u * ((1.0 - alpha_m) / (beta * step * step))
            + v * ((1.0 - alpha_m) / (beta * step))
            + a * ((1.0 - alpha_m - 2.0 * beta) / (2.0 * beta));
        &self.load - &self.stiffness * (u * alpha_f)
            + &self.damping * damping_terms
            + &self.mass * inertia_terms
    }

    /// Reject vectors without one entry per free DOF.
    fn check_dimension(&self, vector: &DVector<f64>) -> Result<(), AnalysisError> {
        if vector.len() == self.num_dof() {
            Ok(())
        } else {
            Err(AnalysisError::DimensionMismatch {
                expected: self.num_dof(),
                actual: vector.len(),
            })
        }
    }
}
