//! Descriptive and inferential statistics used by the cost and
//! performance comparisons.
//!
//! Mann–Whitney U uses the normal approximation with tie and continuity
//! corrections; Welch's t uses the Welch–Satterthwaite degrees of freedom
//! with a Student-t survival function evaluated through the regularized
//! incomplete beta function.

use std::f64::consts::SQRT_2;

/// Sample mean; `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n−1 denominator); `None` below two values.
#[must_use]
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Median; `None` for an empty slice.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Result of a two-sided Mann–Whitney U test.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MannWhitney {
    /// U statistic of the first sample.
    pub u: f64,
    pub p_value: f64,
}

/// Two-sided Mann–Whitney U test of `xs` against `ys`.
///
/// Returns `None` when either sample is empty. The p-value comes from the
/// normal approximation with tie and continuity corrections; for the
/// sample sizes in this study the approximation is adequate.
#[must_use]
pub fn mann_whitney_u(xs: &[f64], ys: &[f64]) -> Option<MannWhitney> {
    let n1 = xs.len();
    let n2 = ys.len();
    if n1 == 0 || n2 == 0 {
        return None;
    }

    let mut pooled: Vec<f64> = Vec::with_capacity(n1 + n2);
    pooled.extend_from_slice(xs);
    pooled.extend_from_slice(ys);
    let (ranks, tie_term) = average_ranks(&pooled);

    let r1: f64 = ranks[..n1].iter().sum();
    let u = r1 - (n1 * (n1 + 1)) as f64 / 2.0;

    let n = (n1 + n2) as f64;
    let mean_u = (n1 * n2) as f64 / 2.0;
    let variance =
        ((n1 * n2) as f64 / 12.0) * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if variance <= 0.0 {
        // Every pooled value identical: no evidence either way.
        return Some(MannWhitney { u, p_value: 1.0 });
    }

    let diff = u - mean_u;
    let corrected = if diff > 0.0 {
        diff - 0.5
    } else if diff < 0.0 {
        diff + 0.5
    } else {
        0.0
    };
    let z = corrected / variance.sqrt();
    let p_value = (2.0 * (1.0 - normal_cdf(z.abs()))).clamp(0.0, 1.0);

    Some(MannWhitney { u, p_value })
}

/// Result of a two-sided Welch's t-test.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct WelchT {
    pub t: f64,
    /// Welch–Satterthwaite degrees of freedom.
    pub df: f64,
    pub p_value: f64,
}

/// Two-sided Welch's t-test (unequal variances) of `xs` against `ys`.
///
/// Returns `None` when either sample has fewer than two values or both
/// variances are zero.
#[must_use]
pub fn welch_t_test(xs: &[f64], ys: &[f64]) -> Option<WelchT> {
    let n1 = xs.len() as f64;
    let n2 = ys.len() as f64;
    if xs.len() < 2 || ys.len() < 2 {
        return None;
    }

    let m1 = mean(xs)?;
    let m2 = mean(ys)?;
    let v1 = sample_std(xs)?.powi(2);
    let v2 = sample_std(ys)?.powi(2);

    let se2 = v1 / n1 + v2 / n2;
    if se2 <= 0.0 {
        return None;
    }

    let t = (m1 - m2) / se2.sqrt();
    let df = se2 * se2
        / ((v1 / n1).powi(2) / (n1 - 1.0) + (v2 / n2).powi(2) / (n2 - 1.0));
    let p_value = (2.0 * student_t_sf(t.abs(), df)).clamp(0.0, 1.0);

    Some(WelchT { t, df, p_value })
}

/// Average ranks of the pooled sample (ties share their mean rank) and
/// the tie-correction term Σ(t³ − t).
fn average_ranks(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Positions i..=j share the average of ranks i+1..=j+1.
        let avg = (i + j + 2) as f64 / 2.0;
        for &k in &order[i..=j] {
            ranks[k] = avg;
        }
        let t = (j - i + 1) as f64;
        tie_term += t * t * t - t;
        i = j + 1;
    }
    (ranks, tie_term)
}

/// Standard normal CDF.
#[must_use]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Complementary error function, rational Chebyshev approximation
/// (fractional error below 1.2e-7 everywhere).
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let ans = t
        * (-z * z - 1.265_512_23
            + t * (1.000_023_68
                + t * (0.374_091_96
                    + t * (0.096_784_18
                        + t * (-0.186_288_06
                            + t * (0.278_868_07
                                + t * (-1.135_203_98
                                    + t * (1.488_515_87
                                        + t * (-0.822_152_23 + t * 0.170_872_77)))))))))
            .exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Student-t survival function P(T > t) for `t >= 0`.
fn student_t_sf(t: f64, df: f64) -> f64 {
    if df <= 0.0 {
        return f64::NAN;
    }
    let x = df / (df + t * t);
    0.5 * incomplete_beta(df / 2.0, 0.5, x)
}

/// Regularized incomplete beta function I_x(a, b).
fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_bt = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b)
        + a * x.ln()
        + b * (1.0 - x).ln();
    let bt = ln_bt.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        bt * beta_cf(a, b, x) / a
    } else {
        1.0 - bt * beta_cf(b, a, 1.0 - x) / b
    }
}

/// Continued-fraction evaluation for the incomplete beta function.
fn beta_cf(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 200;
    const EPS: f64 = 3.0e-12;
    const FPMIN: f64 = 1.0e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;

        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Lanczos approximation of ln Γ(z) for z > 0.
fn ln_gamma(z: f64) -> f64 {
    const COF: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.120_865_097_386_617_9e-2,
        -0.539_523_938_495_3e-5,
    ];
    let mut ser = 1.000_000_000_190_015;
    let mut y = z;
    for c in COF {
        y += 1.0;
        ser += c / y;
    }
    let tmp = z + 5.5;
    let tmp = tmp - (z + 0.5) * tmp.ln();
    -tmp + (2.506_628_274_631_000_5 * ser / z).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptive_helpers() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
        assert_eq!(median(&[1.0, 3.0, 2.0]), Some(2.0));
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(sample_std(&[1.0]), None);
        // std of [2, 4, 4, 4, 5, 5, 7, 9] with n-1 denominator
        let s = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((s - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn normal_cdf_known_values() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-9);
        assert!((normal_cdf(1.959_964) - 0.975).abs() < 1e-4);
        assert!((normal_cdf(-1.959_964) - 0.025).abs() < 1e-4);
    }

    #[test]
    fn student_t_sf_matches_references() {
        // df = 1 is the Cauchy distribution: P(T > 1) = 1/4.
        assert!((student_t_sf(1.0, 1.0) - 0.25).abs() < 1e-6);
        // At t = 0 the survival function is one half.
        assert!((student_t_sf(0.0, 8.0) - 0.5).abs() < 1e-9);
        // Large df converges to the normal tail.
        assert!((student_t_sf(1.959_964, 100_000.0) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn ranks_average_ties() {
        let (ranks, tie_term) = average_ranks(&[10.0, 20.0, 20.0, 30.0]);
        assert_eq!(ranks, vec![1.0, 2.5, 2.5, 4.0]);
        assert!((tie_term - 6.0).abs() < 1e-12);
    }

    #[test]
    fn mann_whitney_separated_samples() {
        let r = mann_whitney_u(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert!((r.u - 0.0).abs() < 1e-12);
        // Normal approximation with continuity correction.
        assert!((r.p_value - 0.0809).abs() < 0.005, "p = {}", r.p_value);
    }

    #[test]
    fn mann_whitney_identical_samples() {
        let r = mann_whitney_u(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((r.u - 4.5).abs() < 1e-12);
        assert!(r.p_value > 0.9);
    }

    #[test]
    fn mann_whitney_all_tied_values() {
        let r = mann_whitney_u(&[5.0, 5.0], &[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn mann_whitney_empty_sample() {
        assert!(mann_whitney_u(&[], &[1.0]).is_none());
    }

    #[test]
    fn welch_known_example() {
        // Equal variances, shifted means: t = -1, df = 8.
        let r = welch_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert!((r.t + 1.0).abs() < 1e-9);
        assert!((r.df - 8.0).abs() < 1e-9);
        assert!((r.p_value - 0.3466).abs() < 0.005, "p = {}", r.p_value);
    }

    #[test]
    fn welch_needs_two_values_per_sample() {
        assert!(welch_t_test(&[1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn welch_zero_variance_everywhere() {
        assert!(welch_t_test(&[2.0, 2.0], &[3.0, 3.0]).is_none());
    }
}
