//! Kolmogorov-Smirnov goodness of fit against a normal distribution
use statrs::distribution::{ContinuousCDF, Normal};

/// Kolmogorov-Smirnov statistic of `values` against a normal distribution
pub(crate) fn ks_statistic(values: &[f64], normal: &Normal) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len() as f64;
    sorted
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let cdf = normal.cdf(*x);
            let above = (i as f64 + 1.) / n - cdf;
            let below = cdf - i as f64 / n;
            above.max(below)
        })
        .fold(0., f64::max)
}

/// Asymptotic p-value of a Kolmogorov-Smirnov statistic `d` for a sample of size `n`
pub(crate) fn ks_p_value(d: f64, n: usize) -> f64 {
    if n == 0 {
        return 1.;
    }
    let sqrt_n = (n as f64).sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d;
    if lambda < 0.27 {
        return 1.;
    }
    let mut sum = 0.;
    for j in 1..=100 {
        let j = j as f64;
        let sign = if j % 2. == 1. { 1. } else { -1. };
        let term = sign * (-2. * j * j * lambda * lambda).exp();
        sum += term;
        if term.abs() < 1e-12 {
            break;
        }
    }
    (2. * sum).clamp(0., 1.)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ks_test() {
        let normal = Normal::new(0., 1.).unwrap();
        // Quantiles of the distribution itself fit well
        let values: Vec<f64> = (1..100)
            .map(|i| normal.inverse_cdf(i as f64 / 100.))
            .collect();
        let d = ks_statistic(&values, &normal);
        assert!(d < 0.05);
        assert!(ks_p_value(d, values.len()) > 0.9);

        // A shifted sample does not
        let shifted: Vec<f64> = values.iter().map(|v| v + 3.).collect();
        let d = ks_statistic(&shifted, &normal);
        assert!(d > 0.5);
        assert!(ks_p_value(d, shifted.len()) < 1e-6);
    }
}
