//! Trapezoidal integration over sampled curves and band edges

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TrapezoidError {
    #[error("Insufficient points for integration, need at least 2 points")]
    InsufficientPoints,

    #[error("Points must be in ascending order")]
    NotAscending,
}

/// Composite trapezoidal integral of `to_integrate` evaluated at `corners`.
///
/// # Arguments
///
/// * `corners` - Abscissae in strictly ascending order
/// * `to_integrate` - The function to integrate
pub fn trap_integrate<F>(corners: &[f64], to_integrate: F) -> Result<f64, TrapezoidError>
where
    F: Fn(f64) -> f64,
{
    if corners.len() < 2 {
        return Err(TrapezoidError::InsufficientPoints);
    }
    if corners.windows(2).any(|w| w[1] <= w[0]) {
        return Err(TrapezoidError::NotAscending);
    }

    let values: Vec<f64> = corners.iter().map(|&x| to_integrate(x)).collect();
    Ok(corners
        .windows(2)
        .zip(values.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum())
}

/// `n` evenly spaced points from `lower` to `upper` inclusive
pub fn linspace(lower: f64, upper: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lower],
        _ => {
            let step = (upper - lower) / (n - 1) as f64;
            (0..n).map(|i| lower + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_trap_integrate() {
        // (1-0)(0+1)/2 + (2-1)(1+4)/2 + (3-2)(4+9)/2 = 9.5
        let result = trap_integrate(&[0.0, 1.0, 2.0, 3.0], |x| x * x).unwrap();
        assert_relative_eq!(result, 9.5, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_is_exact() {
        let corners = linspace(2.0, 5.0, 7);
        let result = trap_integrate(&corners, |x| 3.0 * x + 1.0).unwrap();
        assert_relative_eq!(result, 1.5 * (25.0 - 4.0) + 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_insufficient_points() {
        assert_eq!(
            trap_integrate(&[1.0], |x| x),
            Err(TrapezoidError::InsufficientPoints)
        );
    }

    #[test]
    fn test_not_ascending() {
        assert_eq!(
            trap_integrate(&[0.0, 2.0, 1.0, 3.0], |x| x),
            Err(TrapezoidError::NotAscending)
        );
    }

    #[test]
    fn test_linspace_endpoints() {
        let xs = linspace(400.0, 550.0, 4);
        assert_eq!(xs, vec![400.0, 450.0, 500.0, 550.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
