//! Random variate generators used by the chain runner.

use rand::RngExt;
use rand::rngs::StdRng;

/// Uniform draw on `[0, 1)`.
pub(crate) fn uniform(rng: &mut StdRng) -> f64 {
    rng.random::<f64>()
}

/// Box-Muller standard normal.
pub(crate) fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1 = (1.0_f64 - rng.random::<f64>()).max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0_f64 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// `Normal(mean, precision)` draw.
pub(crate) fn normal_precision(rng: &mut StdRng, mean: f64, precision: f64) -> f64 {
    standard_normal(rng).mul_add(precision.sqrt().recip(), mean)
}

/// `Gamma(shape, rate)` draw via Marsaglia-Tsang, boosted for `shape < 1`.
pub(crate) fn gamma(rng: &mut StdRng, shape: f64, rate: f64) -> f64 {
    if !(shape > 0.0 && rate > 0.0) {
        return f64::NAN;
    }

    if shape < 1.0 {
        let u = (1.0_f64 - rng.random::<f64>()).max(f64::MIN_POSITIVE);
        return gamma(rng, shape + 1.0, rate) * u.powf(1.0 / shape);
    }

    let shape_minus_third = shape - (1.0 / 3.0);
    let coeff = (1.0 / (9.0 * shape_minus_third)).sqrt();
    loop {
        let standard_normal = standard_normal(rng);
        let one_plus_coeff_noise = coeff.mul_add(standard_normal, 1.0);
        if one_plus_coeff_noise <= 0.0 {
            continue;
        }
        let cubic_term = one_plus_coeff_noise * one_plus_coeff_noise * one_plus_coeff_noise;
        let uniform = rng.random::<f64>();
        if uniform
            < (0.0331 * standard_normal * standard_normal * standard_normal)
                .mul_add(-standard_normal, 1.0)
        {
            return shape_minus_third * cubic_term / rate;
        }
        if uniform.ln()
            < (0.5 * standard_normal).mul_add(
                standard_normal,
                shape_minus_third * (1.0 - cubic_term + cubic_term.ln()),
            )
        {
            return shape_minus_third * cubic_term / rate;
        }
    }
}

/// `Beta(alpha, beta)` draw from two independent gammas.
pub(crate) fn beta(rng: &mut StdRng, alpha: f64, beta: f64) -> f64 {
    let x = gamma(rng, alpha, 1.0);
    let y = gamma(rng, beta, 1.0);
    x / (x + y)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::utils::{mean, sample_variance};

    #[test]
    fn gamma_moments_match_shape_and_rate() {
        let mut rng = StdRng::seed_from_u64(7);
        let draws: Vec<f64> = (0..20_000).map(|_| gamma(&mut rng, 3.0, 2.0)).collect();
        assert!((mean(&draws) - 1.5).abs() < 0.05);
        assert!((sample_variance(&draws) - 0.75).abs() < 0.08);
    }

    #[test]
    fn small_shape_gamma_stays_positive() {
        let mut rng = StdRng::seed_from_u64(11);
        assert!((0..1_000).all(|_| gamma(&mut rng, 0.3, 1.0) > 0.0));
    }

    #[test]
    fn beta_mean_matches_shapes() {
        let mut rng = StdRng::seed_from_u64(3);
        let draws: Vec<f64> = (0..20_000).map(|_| beta(&mut rng, 2.0, 6.0)).collect();
        assert!((mean(&draws) - 0.25).abs() < 0.01);
        assert!(draws.iter().all(|value| *value > 0.0 && *value < 1.0));
    }

    #[test]
    fn normal_precision_scales_variance() {
        let mut rng = StdRng::seed_from_u64(5);
        let draws: Vec<f64> = (0..20_000)
            .map(|_| normal_precision(&mut rng, 1.0, 4.0))
            .collect();
        assert!((mean(&draws) - 1.0).abs() < 0.02);
        assert!((sample_variance(&draws) - 0.25).abs() < 0.02);
    }
}
