//! Darcy friction factor and Darcy-Weisbach pressure loss.

use std::f64::consts::LN_10;

/// Reynolds number below which flow is treated as laminar.
pub const LAMINAR_LIMIT: f64 = 2000.0;

/// Colebrook-White root-finder configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColebrookConfig {
    /// Maximum Newton iterations
    pub max_iterations: usize,
    /// Absolute tolerance on the step in x = 1/sqrt(f)
    pub abs_tol: f64,
    /// Initial guess, also the fallback when the iteration fails
    pub initial_guess: f64,
}

impl Default for ColebrookConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            abs_tol: 1e-10,
            initial_guess: 0.02,
        }
    }
}

/// Friction factor with solver diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionFactor {
    pub value: f64,
    /// Newton iterations used (0 for the laminar closed form)
    pub iterations: usize,
    /// False when the root-finder gave up and `value` is the fallback guess
    pub converged: bool,
}

impl FrictionFactor {
    fn exact(value: f64) -> Self {
        Self {
            value,
            iterations: 0,
            converged: true,
        }
    }
}

/// Solve 1/sqrt(f) + 2 log10(e/(3.7 D) + 2.51/(Re sqrt(f))) = 0 for f.
///
/// Newton iteration runs on x = 1/sqrt(f). A non-finite step, a
/// non-positive iterate or hitting the iteration cap returns the initial
/// guess with `converged: false`.
pub fn colebrook(reynolds: f64, relative_roughness: f64, config: &ColebrookConfig) -> FrictionFactor {
    let a = relative_roughness / 3.7;
    let b = 2.51 / reynolds;
    let fallback = FrictionFactor {
        value: config.initial_guess,
        iterations: config.max_iterations,
        converged: false,
    };

    let mut x = 1.0 / config.initial_guess.sqrt();
    for iter in 1..=config.max_iterations {
        let inner = a + b * x;
        if inner <= 0.0 || !inner.is_finite() {
            return fallback;
        }
        let g = x + 2.0 * inner.log10();
        let dg = 1.0 + 2.0 * b / (inner * LN_10);
        let step = g / dg;
        x -= step;
        if !x.is_finite() || x <= 0.0 {
            return fallback;
        }
        if step.abs() < config.abs_tol {
            return FrictionFactor {
                value: 1.0 / (x * x),
                iterations: iter,
                converged: true,
            };
        }
    }
    fallback
}

/// Darcy friction factor for any Reynolds number.
///
/// Laminar flow uses 64/Re; `Re = 0` yields `f = inf`, which
/// [`pressure_loss`] treats as no loss since nothing flows.
pub fn friction_factor(
    reynolds: f64,
    relative_roughness: f64,
    config: &ColebrookConfig,
) -> FrictionFactor {
    if reynolds <= 0.0 {
        FrictionFactor::exact(f64::INFINITY)
    } else if reynolds < LAMINAR_LIMIT {
        FrictionFactor::exact(64.0 / reynolds)
    } else {
        colebrook(reynolds, relative_roughness, config)
    }
}

pub fn reynolds(density: f64, velocity: f64, diameter: f64, viscosity: f64) -> f64 {
    density * velocity * diameter / viscosity
}

/// Darcy-Weisbach: dP = f L rho v^2 / (2 D), all SI.
pub fn pressure_loss(friction: f64, length: f64, density: f64, velocity: f64, diameter: f64) -> f64 {
    if velocity == 0.0 {
        return 0.0;
    }
    friction * length * density * velocity * velocity / (2.0 * diameter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn residual(f: f64, re: f64, rr: f64) -> f64 {
        1.0 / f.sqrt() + 2.0 * (rr / 3.7 + 2.51 / (re * f.sqrt())).log10()
    }

    #[test]
    fn laminar_is_closed_form() {
        let f = friction_factor(1000.0, 1e-3, &ColebrookConfig::default());
        assert_relative_eq!(f.value, 0.064);
        assert!(f.converged);
        assert_eq!(f.iterations, 0);
    }

    #[test]
    fn stagnant_flow_has_no_loss() {
        let f = friction_factor(0.0, 1e-3, &ColebrookConfig::default());
        assert!(f.value.is_infinite());
        assert_eq!(pressure_loss(f.value, 1000.0, 1000.0, 0.0, 0.1), 0.0);
    }

    #[test]
    fn colebrook_satisfies_the_equation() {
        let cfg = ColebrookConfig::default();
        for &(re, rr) in &[(4.0e3, 1e-4), (1.0e5, 1.2e-3), (5.0e6, 1e-5), (2.0e3, 0.0)] {
            let f = colebrook(re, rr, &cfg);
            assert!(f.converged, "Re={re} rr={rr}");
            assert!(residual(f.value, re, rr).abs() < 1e-8);
        }
    }

    #[test]
    fn colebrook_matches_moody_chart() {
        // Smooth pipe at Re = 1e5 sits near f = 0.018.
        let f = colebrook(1.0e5, 0.0, &ColebrookConfig::default());
        assert_relative_eq!(f.value, 0.018, epsilon = 5e-4);
    }

    #[test]
    fn iteration_cap_falls_back_to_initial_guess() {
        let cfg = ColebrookConfig {
            max_iterations: 1,
            ..ColebrookConfig::default()
        };
        let f = colebrook(1.0e5, 1e-4, &cfg);
        assert!(!f.converged);
        assert_eq!(f.value, 0.02);
    }

    #[test]
    fn pressure_loss_scales_with_velocity_squared() {
        let dp1 = pressure_loss(0.02, 1000.0, 1000.0, 1.0, 0.1);
        let dp2 = pressure_loss(0.02, 1000.0, 1000.0, 2.0, 0.1);
        assert_relative_eq!(dp1, 100_000.0);
        assert_relative_eq!(dp2, 4.0 * dp1);
    }
}
