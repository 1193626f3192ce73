//! Free vector operations shared by the matrix and solver layers.

/// Dot product of two equal-length real slices.
pub fn dot(u: &[f64], v: &[f64]) -> f64 {
    assert_eq!(u.len(), v.len(), "dot product length mismatch");
    u.iter().zip(v.iter()).map(|(&a, &b)| a * b).sum()
}

/// Euclidean (2-) norm of a real slice.
pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}
