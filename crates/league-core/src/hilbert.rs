//! Complex state-vector algebra
//!
//! Every agent carries its perception state as a finite vector of complex
//! scalars. This module provides the inner-product-space operations the
//! engine is built on:
//! - Norms, normalisation, and distances
//! - Consensus averaging across agents ("spectral sync")
//! - Privacy-preserving projection with bounded noise
//! - A scalar energy functional and a randomised stability probe
//!
//! All operations preserve the dimension of their inputs. Operations that
//! combine two vectors require equal dimensions and fail with
//! [`CoreError::DimensionMismatch`] otherwise. NaN and infinity propagate
//! per IEEE semantics; callers screen their inputs.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Norms below this are treated as zero by [`normalize`].
pub const ZERO_NORM_EPSILON: f64 = 1e-12;

/// Number of random probes drawn by [`is_stable`].
const STABILITY_PROBES: usize = 10;

/// A complex scalar, stored as an ordered (re, im) pair of doubles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn zero() -> Self {
        Self { re: 0.0, im: 0.0 }
    }

    /// |z| = sqrt(re² + im²)
    pub fn magnitude(&self) -> f64 {
        (self.re * self.re + self.im * self.im).sqrt()
    }

    pub fn conjugate(&self) -> Self {
        Self {
            re: self.re,
            im: -self.im,
        }
    }
}

/// A state vector of `n` complex zeros.
pub fn zero_state(n: usize) -> Vec<Complex> {
    vec![Complex::zero(); n]
}

/// Squared norm: Σ (reᵢ² + imᵢ²). Finite for finite input, never negative.
pub fn norm_squared(x: &[Complex]) -> f64 {
    x.iter().map(|c| c.re * c.re + c.im * c.im).sum()
}

pub fn norm(x: &[Complex]) -> f64 {
    norm_squared(x).sqrt()
}

/// Scale a state to unit norm.
///
/// States with norm below [`ZERO_NORM_EPSILON`] map to the zero state of the
/// same dimension. Idempotent up to floating-point tolerance.
pub fn normalize(x: &[Complex]) -> Vec<Complex> {
    let n = norm(x);
    if n < ZERO_NORM_EPSILON {
        return zero_state(x.len());
    }
    x.iter()
        .map(|c| Complex::new(c.re / n, c.im / n))
        .collect()
}

/// Hermitian inner product ⟨a, b⟩ = Σ conj(aᵢ)·bᵢ.
///
/// Conjugate-symmetric: `inner_product(a, b) = conj(inner_product(b, a))`.
pub fn inner_product(a: &[Complex], b: &[Complex]) -> Result<Complex, CoreError> {
    if a.len() != b.len() {
        return Err(CoreError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let mut acc = Complex::zero();
    for (x, y) in a.iter().zip(b) {
        acc.re += x.re * y.re + x.im * y.im;
        acc.im += x.re * y.im - x.im * y.re;
    }
    Ok(acc)
}

/// Euclidean distance `‖a − b‖`. Symmetric, non-negative, zero iff the
/// vectors agree componentwise.
pub fn distance(a: &[Complex], b: &[Complex]) -> Result<f64, CoreError> {
    if a.len() != b.len() {
        return Err(CoreError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let diff: Vec<Complex> = a
        .iter()
        .zip(b)
        .map(|(x, y)| Complex::new(x.re - y.re, x.im - y.im))
        .collect();
    Ok(norm(&diff))
}

/// Add independent uniform noise in `[-half_width, +half_width]` to every
/// real and imaginary part. A non-positive half-width is a no-op.
pub fn perturb<R: Rng>(x: &[Complex], half_width: f64, rng: &mut R) -> Vec<Complex> {
    if half_width <= 0.0 {
        return x.to_vec();
    }
    x.iter()
        .map(|c| {
            Complex::new(
                c.re + rng.gen_range(-half_width..=half_width),
                c.im + rng.gen_range(-half_width..=half_width),
            )
        })
        .collect()
}

/// Project a state down to `target_dimension` components and blur the
/// survivors with uniform noise in `[-sigma, +sigma]` per part.
///
/// When the target is at least the current dimension the whole state is
/// kept (and still blurred). Components beyond the target are discarded.
pub fn privacy_projection<R: Rng>(
    x: &[Complex],
    target_dimension: usize,
    sigma: f64,
    rng: &mut R,
) -> Vec<Complex> {
    let kept = if target_dimension >= x.len() {
        x
    } else {
        &x[..target_dimension]
    };
    perturb(kept, sigma, rng)
}

/// Consensus average: componentwise arithmetic mean of equal-length states,
/// renormalised to unit norm.
///
/// Empty input yields the empty state. A single input `[s]` yields
/// `normalize(s)`. Mixed dimensions are a [`CoreError::DimensionMismatch`].
pub fn spectral_sync(states: &[Vec<Complex>]) -> Result<Vec<Complex>, CoreError> {
    let Some(first) = states.first() else {
        return Ok(Vec::new());
    };
    let dim = first.len();
    let mut mean = zero_state(dim);
    for state in states {
        if state.len() != dim {
            return Err(CoreError::DimensionMismatch {
                left: dim,
                right: state.len(),
            });
        }
        for (slot, c) in mean.iter_mut().zip(state) {
            slot.re += c.re;
            slot.im += c.im;
        }
    }
    let count = states.len() as f64;
    for slot in &mut mean {
        slot.re /= count;
        slot.im /= count;
    }
    Ok(normalize(&mean))
}

/// Scalar regularity proxy: `|‖x‖ − 1| + 0.1 · variance(|xᵢ|)`.
///
/// Non-negative; lower is better. Zero exactly when the state has unit norm
/// and all component magnitudes are equal.
pub fn learning_energy(x: &[Complex]) -> f64 {
    let norm_term = (norm(x) - 1.0).abs();
    if x.is_empty() {
        return norm_term;
    }
    let magnitudes: Vec<f64> = x.iter().map(Complex::magnitude).collect();
    let mean = magnitudes.iter().sum::<f64>() / magnitudes.len() as f64;
    let variance = magnitudes
        .iter()
        .map(|m| (m - mean) * (m - mean))
        .sum::<f64>()
        / magnitudes.len() as f64;
    norm_term + 0.1 * variance
}

/// Randomised local-minimum probe.
///
/// Draws ten perturbations with half-width `epsilon / 2` and reports whether
/// none of them has strictly lower energy than the base state. The probe can
/// return false negatives; callers treat the answer as a hint.
pub fn is_stable<R: Rng>(x: &[Complex], epsilon: f64, rng: &mut R) -> bool {
    let base = learning_energy(x);
    for _ in 0..STABILITY_PROBES {
        let probe = perturb(x, epsilon / 2.0, rng);
        if learning_energy(&probe) < base {
            return false;
        }
    }
    true
}
