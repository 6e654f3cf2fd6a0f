//! Reference-frame transforms and space-vector modulation.
//!
//! Clarke is amplitude invariant: a balanced set with peak `I` maps to an
//! alpha/beta vector of magnitude `I`. Modulation quantities are normalized
//! so that a vector of magnitude `m` produces phase voltage amplitude
//! `m · (2/3) · Vbus`; the linear SVM range ends at `m = √3/2`.

use motor_common::motor::types::PhaseCurrents;

pub const ONE_BY_SQRT3: f32 = 0.577_350_26;
pub const SQRT3_BY_2: f32 = 0.866_025_4;

/// Volts of alpha/beta voltage per unit of modulation at `vbus`.
#[inline]
pub fn volts_per_modulation(vbus: f32) -> f32 {
    vbus * (2.0 / 3.0)
}

/// Three phase quantities → (alpha, beta).
#[inline]
pub fn clarke(p: PhaseCurrents) -> (f32, f32) {
    let alpha = (2.0 * p.a - p.b - p.c) * (1.0 / 3.0);
    let beta = (p.b - p.c) * ONE_BY_SQRT3;
    (alpha, beta)
}

/// (alpha, beta) → three phase quantities.
#[inline]
pub fn inverse_clarke(alpha: f32, beta: f32) -> PhaseCurrents {
    PhaseCurrents::new(
        alpha,
        -0.5 * alpha + SQRT3_BY_2 * beta,
        -0.5 * alpha - SQRT3_BY_2 * beta,
    )
}

/// (alpha, beta) → (d, q) at electrical angle `phase`.
#[inline]
pub fn park(alpha: f32, beta: f32, phase: f32) -> (f32, f32) {
    let (s, c) = phase.sin_cos();
    (c * alpha + s * beta, c * beta - s * alpha)
}

/// (d, q) → (alpha, beta) at electrical angle `phase`.
#[inline]
pub fn inverse_park(d: f32, q: f32, phase: f32) -> (f32, f32) {
    let (s, c) = phase.sin_cos();
    (c * d - s * q, c * q + s * d)
}

/// Scale `(x, y)` down to magnitude `limit`, keeping its direction.
///
/// Returns the scaled vector and whether scaling was needed.
#[inline]
pub fn limit_vector(x: f32, y: f32, limit: f32) -> (f32, f32, bool) {
    let norm = (x * x + y * y).sqrt();
    if norm > limit && norm > 0.0 {
        let k = limit.max(0.0) / norm;
        (x * k, y * k, true)
    } else {
        (x, y, false)
    }
}

/// Space-vector modulation by min/max midpoint injection.
///
/// Returns the high-side on-time fraction for each phase, or `None` if the
/// vector is not finite or lies outside the realizable hexagon.
pub fn svm(mod_alpha: f32, mod_beta: f32) -> Option<[f32; 3]> {
    if !mod_alpha.is_finite() || !mod_beta.is_finite() {
        return None;
    }
    let m = inverse_clarke(mod_alpha, mod_beta);
    let max = m.a.max(m.b).max(m.c);
    let min = m.a.min(m.b).min(m.c);
    let mid = 0.5 * (max + min);

    let duty = |x: f32| 0.5 + (2.0 / 3.0) * (x - mid);
    let timings = [duty(m.a), duty(m.b), duty(m.c)];
    if timings.iter().all(|t| (0.0..=1.0).contains(t)) {
        Some(timings)
    } else {
        None
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
