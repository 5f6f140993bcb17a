use argmin::core::{
    CostFunction,
    Error as ArgminError,
    Executor,
    State
};
use argmin::solver::neldermead::NelderMead;
use log::{
    debug,
    warn
};
use nalgebra::DVector;

use crate::configuration::{
    validate_pixel_size,
    Configuration
};
use crate::math::curve::curve::Curve;
use crate::math::curve::segmentfunction::SegmentFunction;
use crate::segment::segment::Segment;
use crate::stitching::fitresult::FitResult;
use crate::stitching::stitcherror::StitchError;

/// Cost of any trial offset outside the pixel window. Walls the simplex in
/// without a constrained solver.
pub const OUT_OF_WINDOW_COST: f64 = 123456789098765432124.0;

// Initial simplex steps, relative for non-zero coordinates, absolute for zero ones.
const SIMPLEX_RELATIVE_STEP: f64 = 0.05;
const SIMPLEX_ZERO_STEP: f64 = 0.00025;

// ─────────────────────────────────────────────
// FitWindow
// ─────────────────────────────────────────────

/// The candidate samples a fit is scored on, with their inverse variances.
pub struct FitWindow {
    x: DVector<f64>,
    y: DVector<f64>,
    inverse_variance: DVector<f64>,
}

impl FitWindow {
    /// Samples of `candidate` from `start` on, unit errors.
    pub fn new(candidate: &Segment, start: usize) -> FitWindow {
        let start = start.min(candidate.len());
        FitWindow::unit_errors(&candidate.x()[start..], &candidate.y()[start..])
    }

    /// Samples of `candidate` from `start` on; `errors` runs parallel to the
    /// whole candidate.
    pub fn with_errors(candidate: &Segment, start: usize, errors: &[f64]) -> Result<FitWindow, StitchError> {
        if errors.len() != candidate.len() {
            return Err(StitchError::LengthMismatch { x_len: candidate.len(), y_len: errors.len() });
        }
        if let Some((index, &value)) = errors.iter().enumerate().find(|(_, e)| !e.is_finite() || **e <= 0.0) {
            return Err(StitchError::InvalidError { index, value });
        }
        let start = start.min(candidate.len());
        let mut window = FitWindow::new(candidate, start);
        window.inverse_variance = DVector::from_iterator(
            window.len(),
            errors[start..].iter().map(|e| 1.0 / (e * e)),
        );
        Ok(window)
    }

    /// Unit-error window over parallel sample slices.
    pub fn from_samples(x: &[f64], y: &[f64]) -> Result<FitWindow, StitchError> {
        if x.len() != y.len() {
            return Err(StitchError::LengthMismatch { x_len: x.len(), y_len: y.len() });
        }
        Ok(FitWindow::unit_errors(x, y))
    }

    fn unit_errors(x: &[f64], y: &[f64]) -> FitWindow {
        FitWindow {
            x: DVector::from_column_slice(x),
            y: DVector::from_column_slice(y),
            inverse_variance: DVector::from_element(x.len(), 1.0),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Mean over the window of `(y_i - f(x_i; x_offset, y_offset))² / err_i²`.
/// Zero for an empty window.
pub fn chi_square<C: Curve>(function: &C, window: &FitWindow, x_offset: f64, y_offset: f64) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let predicted = DVector::from_iterator(
        window.len(),
        window.x.iter().map(|&x| function.shifted_value(x, x_offset, y_offset)),
    );
    let residual = &window.y - predicted;
    residual.component_mul(&residual).dot(&window.inverse_variance) / window.len() as f64
}

pub fn is_railed(x_offset: f64, pixel_size: f64, railing_tolerance: f64) -> bool {
    x_offset.abs() > pixel_size - railing_tolerance
}

struct WindowedChiSquare<'a, C> {
    function: &'a C,
    window: &'a FitWindow,
    pixel_size: f64,
}

impl<C: Curve> CostFunction for WindowedChiSquare<'_, C> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, ArgminError> {
        let (x_offset, y_offset) = (param[0], param[1]);
        if x_offset.abs() > self.pixel_size {
            return Ok(OUT_OF_WINDOW_COST);
        }
        let chi = chi_square(self.function, self.window, x_offset, y_offset);
        if chi.is_nan() {
            return Ok(OUT_OF_WINDOW_COST);
        }
        Ok(chi)
    }
}

fn initial_simplex(guess: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = vec![guess.to_vec()];
    for k in 0..guess.len() {
        let mut vertex = guess.to_vec();
        vertex[k] = if vertex[k] != 0.0 {
            (1.0 + SIMPLEX_RELATIVE_STEP) * vertex[k]
        } else {
            SIMPLEX_ZERO_STEP
        };
        simplex.push(vertex);
    }
    simplex
}

// ─────────────────────────────────────────────
// OffsetFitter
// ─────────────────────────────────────────────

/// Finds the `(x_offset, y_offset)` that best lays a reference segment over a
/// candidate's samples.
///
/// The search is a coarse multi-start: `restarts` Nelder-Mead runs, each
/// starting `restart_step` further right than the last (wrapping to
/// `-pixel_size + restart_wrap_inset` at the right edge of the window). A
/// restart that improves on the best cost so far also becomes the base for the
/// next start. Ties keep the earlier restart.
pub struct OffsetFitter<'c> {
    configuration: &'c Configuration,
}

impl<'c> OffsetFitter<'c> {
    pub fn new(configuration: &'c Configuration) -> OffsetFitter<'c> {
        OffsetFitter { configuration }
    }

    /// Fits `candidate[start_overlap..]` against `reference`.
    pub fn fit_offset(
        &self,
        reference: &Segment,
        candidate: &Segment,
        start_overlap: usize,
        pixel_size: f64,
    ) -> Result<FitResult, StitchError> {
        let function = SegmentFunction::select(reference, self.configuration.interpolation)?;
        let window = FitWindow::new(candidate, start_overlap);
        self.fit_window(&function, &window, pixel_size)
    }

    pub fn fit_offset_weighted(
        &self,
        reference: &Segment,
        candidate: &Segment,
        start_overlap: usize,
        pixel_size: f64,
        errors: &[f64],
    ) -> Result<FitResult, StitchError> {
        let function = SegmentFunction::select(reference, self.configuration.interpolation)?;
        let window = FitWindow::with_errors(candidate, start_overlap, errors)?;
        self.fit_window(&function, &window, pixel_size)
    }

    pub fn fit_window<C: Curve>(
        &self,
        function: &C,
        window: &FitWindow,
        pixel_size: f64,
    ) -> Result<FitResult, StitchError> {
        validate_pixel_size(pixel_size)?;
        if window.is_empty() {
            return Ok(FitResult::zero());
        }
        let configuration = self.configuration;

        let mut best_param = vec![configuration.initial_x_offset, configuration.initial_y_offset];
        let mut best_cost = OUT_OF_WINDOW_COST;
        let mut guess = best_param.clone();
        for restart in 0..configuration.restarts {
            guess[0] += configuration.restart_step;
            if guess[0] >= pixel_size {
                guess[0] = -pixel_size + configuration.restart_wrap_inset;
            }
            let Some(param) = self.minimize(function, window, pixel_size, &guess, restart) else {
                continue;
            };
            let cost = WindowedChiSquare { function, window, pixel_size }
                .cost(&param)
                .map_err(|error| StitchError::Optimizer(error.to_string()))?;
            if cost < best_cost {
                debug!("restart {}: offset ({:.6}, {:.6}) improves chi-square to {:e}", restart, param[0], param[1], cost);
                best_cost = cost;
                best_param = param.clone();
                guess = param;
            }
        }

        let railed = is_railed(best_param[0], pixel_size, configuration.railing_tolerance);
        if railed {
            warn!(
                "offset fit railed to the pixel boundary: x offset {:.6} with pixel size {}",
                best_param[0], pixel_size
            );
        }
        Ok(FitResult::new(best_param[0], best_param[1], best_cost).with_railed(railed))
    }

    /// One Nelder-Mead run from `guess`; `None` when the run fails.
    fn minimize<C: Curve>(
        &self,
        function: &C,
        window: &FitWindow,
        pixel_size: f64,
        guess: &[f64],
        restart: usize,
    ) -> Option<Vec<f64>> {
        let solver = match NelderMead::new(initial_simplex(guess)).with_sd_tolerance(self.configuration.sd_tolerance) {
            Ok(solver) => solver,
            Err(error) => {
                debug!("restart {} skipped, solver setup failed: {}", restart, error);
                return None;
            }
        };
        let problem = WindowedChiSquare { function, window, pixel_size };
        let max_iters = self.configuration.max_iters;
        match Executor::new(problem, solver)
            .configure(|state| state.max_iters(max_iters))
            .run()
        {
            Ok(result) => result.state().get_best_param().cloned(),
            Err(error) => {
                debug!("restart {} skipped, minimization failed: {}", restart, error);
                None
            }
        }
    }
}
