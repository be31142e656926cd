//! Lag polynomials: parameter constraints, seasonal expansion and ψ-weights.
//!
//! AR coefficients follow `y_t = φ_1 y_{t-1} + ... + ε_t`, i.e. the
//! polynomial `1 - φ_1 B - ...`; MA coefficients follow `1 + θ_1 B + ...`.

pub(crate) use crate::transform::diff::multiply;

/// Map unconstrained reals to the coefficients of a stationary AR polynomial.
///
/// Each input is squashed to a partial autocorrelation in (-1, 1) and the
/// Durbin-Levinson recursion turns the partial autocorrelations into AR
/// coefficients (Monahan 1984, Jones 1980).
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let n = unconstrained.len();
    let pacf: Vec<f64> = unconstrained
        .iter()
        .map(|&x| x / (1.0 + x * x).sqrt())
        .collect();

    let mut phi: Vec<f64> = Vec::with_capacity(n);
    for (k, &r) in pacf.iter().enumerate() {
        let prev = phi.clone();
        for i in 0..k {
            phi[i] = prev[i] - r * prev[k - 1 - i];
        }
        phi.push(r);
    }
    phi
}

/// Map unconstrained reals to an invertible MA polynomial `1 + θ_1 B + ...`.
pub fn constrain_invertible(unconstrained: &[f64]) -> Vec<f64> {
    constrain_stationary(unconstrained)
        .into_iter()
        .map(|c| -c)
        .collect()
}

/// `1 + sign * c_1 B^step + sign * c_2 B^{2 step} + ...`
fn lag_polynomial(coefficients: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * step + 1];
    poly[0] = 1.0;
    for (i, &c) in coefficients.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

/// Full AR polynomial `φ(B)Φ(B^s)` with constant term first.
pub fn ar_polynomial(ar: &[f64], seasonal_ar: &[f64], period: usize) -> Vec<f64> {
    multiply(
        &lag_polynomial(ar, 1, -1.0),
        &lag_polynomial(seasonal_ar, period.max(1), -1.0),
    )
}

/// Full MA polynomial `θ(B)Θ(B^s)` with constant term first.
pub fn ma_polynomial(ma: &[f64], seasonal_ma: &[f64], period: usize) -> Vec<f64> {
    multiply(
        &lag_polynomial(ma, 1, 1.0),
        &lag_polynomial(seasonal_ma, period.max(1), 1.0),
    )
}

/// AR coefficients in `y_t = a_1 y_{t-1} + ...` form from a polynomial `1 - a_1 B - ...`.
pub fn ar_coefficients_from_polynomial(poly: &[f64]) -> Vec<f64> {
    poly.iter().skip(1).map(|c| -c).collect()
}

/// ψ-weights of `ma_poly / ar_poly` up to lag `horizon - 1`.
///
/// `ar_poly` may include unit roots (differencing); the weights then
/// do not decay, which is what widens integrated forecast intervals.
pub fn psi_weights(ar_poly: &[f64], ma_poly: &[f64], horizon: usize) -> Vec<f64> {
    let mut psi = vec![0.0; horizon];
    for j in 0..horizon {
        let mut value = ma_poly.get(j).copied().unwrap_or(0.0);
        for k in 1..=j.min(ar_poly.len().saturating_sub(1)) {
            value -= ar_poly[k] * psi[j - k];
        }
        psi[j] = value;
    }
    psi
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    /// Spectral radius of the AR companion matrix.
    fn spectral_radius(phi: &[f64]) -> f64 {
        let p = phi.len();
        if p == 0 {
            return 0.0;
        }
        let mut companion = DMatrix::zeros(p, p);
        for (j, &c) in phi.iter().enumerate() {
            companion[(0, j)] = c;
        }
        for i in 1..p {
            companion[(i, i - 1)] = 1.0;
        }
        companion
            .complex_eigenvalues()
            .iter()
            .map(|z| z.norm())
            .fold(0.0, f64::max)
    }

    fn is_stationary(phi: &[f64]) -> bool {
        spectral_radius(phi) < 1.0
    }

    /// Inverse of `constrain_stationary`. Returns `None` if `phi` is not stationary.
    fn unconstrain_stationary(phi: &[f64]) -> Option<Vec<f64>> {
        let n = phi.len();
        let mut current = phi.to_vec();
        let mut pacf = vec![0.0; n];

        for k in (0..n).rev() {
            let r = current[k];
            if r.abs() >= 1.0 {
                return None;
            }
            pacf[k] = r;
            let denom = 1.0 - r * r;
            let prev: Vec<f64> = (0..k)
                .map(|i| (current[i] + r * current[k - 1 - i]) / denom)
                .collect();
            current = prev;
        }

        Some(pacf.iter().map(|&r| r / (1.0 - r * r).sqrt()).collect())
    }

    /// Inverse of `constrain_invertible`.
    fn unconstrain_invertible(theta: &[f64]) -> Option<Vec<f64>> {
        let negated: Vec<f64> = theta.iter().map(|c| -c).collect();
        unconstrain_stationary(&negated)
    }

    #[test]
    fn constrain_single_coefficient() {
        let phi = constrain_stationary(&[0.0]);
        assert_relative_eq!(phi[0], 0.0);
        let phi = constrain_stationary(&[1.0]);
        assert_relative_eq!(phi[0], 1.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert!(constrain_stationary(&[1e6])[0] < 1.0);
    }

    #[test]
    fn constrained_polynomials_are_stationary() {
        for x in [[3.0, -2.5, 1.7], [-4.0, 4.0, 4.0], [0.3, 0.2, -0.1]] {
            assert!(is_stationary(&constrain_stationary(&x)), "{:?}", x);
        }
    }

    #[test]
    fn near_unit_root_is_still_stationary() {
        // slow decay: the impulse response is still ~0.1 after 1900 lags
        let phi = constrain_stationary(&[-4.0, 4.0, 4.0]);
        let radius = spectral_radius(&phi);
        assert!(radius > 0.999 && radius < 1.0, "radius {}", radius);
        assert!(!is_stationary(&[1.0]));
        assert!(!is_stationary(&[0.5, 0.6]));
    }

    #[test]
    fn unconstrain_inverts_constrain() {
        let x = vec![0.4, -1.3, 2.2];
        let phi = constrain_stationary(&x);
        let back = unconstrain_stationary(&phi).unwrap();
        for (a, b) in back.iter().zip(&x) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }

        let theta = constrain_invertible(&x);
        let back = unconstrain_invertible(&theta).unwrap();
        for (a, b) in back.iter().zip(&x) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn unconstrain_rejects_unit_root() {
        assert!(unconstrain_stationary(&[1.0]).is_none());
        assert!(unconstrain_stationary(&[1.2, -0.1]).is_none());
    }

    #[test]
    fn seasonal_expansion() {
        // (1 + 0.5B)(1 + 0.8B^4) = 1 + 0.5B + 0.8B^4 + 0.4B^5
        let ma = ma_polynomial(&[0.5], &[0.8], 4);
        assert_eq!(ma, vec![1.0, 0.5, 0.0, 0.0, 0.8, 0.4]);

        // (1 - 0.5B)(1 - 0.3B^2) = 1 - 0.5B - 0.3B^2 + 0.15B^3
        let ar = ar_polynomial(&[0.5], &[0.3], 2);
        assert_relative_eq!(ar[3], 0.15, epsilon = 1e-12);
        assert_eq!(ar_coefficients_from_polynomial(&ar)[..2], [0.5, 0.3]);

        assert_eq!(ar_polynomial(&[], &[], 12), vec![1.0]);
    }

    #[test]
    fn psi_weights_of_ar1() {
        let psi = psi_weights(&[1.0, -0.5], &[1.0], 4);
        assert_eq!(psi, vec![1.0, 0.5, 0.25, 0.125]);
    }

    #[test]
    fn psi_weights_of_random_walk_with_ma() {
        // (1 - B) y = (1 + 0.4B) e  => psi = 1, 1.4, 1.4, ...
        let psi = psi_weights(&[1.0, -1.0], &[1.0, 0.4], 4);
        for (a, b) in psi.iter().zip([1.0, 1.4, 1.4, 1.4]) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }
    }
}
