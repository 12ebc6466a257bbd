use crate::error::ClusterError;

/// Cosine similarity between two vectors of equal dimension.
///
/// Fails with [`ClusterError::DegenerateVector`] when either vector has zero
/// norm; fails with [`ClusterError::ShapeMismatch`] on a dimension mismatch.
pub fn cosine(a: &[f64], b: &[f64]) -> Result<f64, ClusterError> {
    if a.len() != b.len() {
        return Err(ClusterError::ShapeMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(ClusterError::DegenerateVector);
    }

    Ok(dot / (norm_a * norm_b))
}

/// Population-scaled similarity threshold τ(k, k').
///
/// `cluster_sim` is S (the base threshold, τ(1,1)); `pair_sim_max` is M (the
/// asymptotic ceiling as populations grow). Both populations must be ≥ 1.
pub fn population_threshold(k: usize, k_prime: usize, cluster_sim: f64, pair_sim_max: f64) -> f64 {
    debug_assert!(k >= 1 && k_prime >= 1);

    let s = cluster_sim;
    let s_sq = s * s;
    let inv_s_sq_minus_one = 1.0 / s_sq - 1.0;

    let term_a = 1.0 + inv_s_sq_minus_one / k as f64;
    let term_b = 1.0 + inv_s_sq_minus_one / k_prime as f64;
    let s0 = 1.0 / (term_a * term_b).sqrt();

    s_sq + (pair_sim_max - s_sq) / (1.0 - s_sq) * (s0 - s_sq)
}

/// Validates the (S, σ, M) parameter relation required by construction; see
/// the engine's constructors for the exact bounds enforced.
pub fn validate_params(cluster_sim: f64, subcluster_sim: f64, pair_sim_max: f64) -> Result<(), ClusterError> {
    if !(0.0 < cluster_sim && cluster_sim < 1.0) {
        return Err(ClusterError::BadParameter(format!(
            "cluster_sim (S) must be in (0, 1), got {cluster_sim}"
        )));
    }
    if !(cluster_sim <= subcluster_sim && subcluster_sim <= pair_sim_max && pair_sim_max <= 1.0) {
        return Err(ClusterError::BadParameter(format!(
            "parameters must satisfy S <= sigma <= M <= 1, got S={cluster_sim}, sigma={subcluster_sim}, M={pair_sim_max}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {a} ~= {b}");
    }

    #[test]
    fn cosine_of_identical_unit_vectors_is_one() {
        let v = vec![1.0, 0.0, 0.0];
        approx_eq(cosine(&v, &v).unwrap(), 1.0);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        approx_eq(cosine(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn cosine_rejects_zero_vector() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        assert!(matches!(cosine(&a, &b), Err(ClusterError::DegenerateVector)));
    }

    #[test]
    fn cosine_rejects_shape_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(matches!(cosine(&a, &b), Err(ClusterError::ShapeMismatch { .. })));
    }

    #[test]
    fn threshold_at_unit_populations_equals_s_squared() {
        let s = 0.7;
        let m = 0.95;
        approx_eq(population_threshold(1, 1, s, m), s * s);
    }

    #[test]
    fn threshold_is_symmetric() {
        let s = 0.6;
        let m = 0.9;
        approx_eq(
            population_threshold(3, 9, s, m),
            population_threshold(9, 3, s, m),
        );
    }

    #[test]
    fn threshold_approaches_pair_sim_max_for_large_populations() {
        let s = 0.6;
        let m = 0.9;
        let t = population_threshold(100_000, 100_000, s, m);
        assert!(t > 0.89 && t <= m + 1e-9);
    }

    #[test]
    fn threshold_is_monotonic_in_population() {
        let s = 0.6;
        let m = 0.9;
        let small = population_threshold(1, 1, s, m);
        let mid = population_threshold(5, 5, s, m);
        let large = population_threshold(50, 50, s, m);
        assert!(small <= mid && mid <= large);
    }

    #[test]
    fn validate_params_rejects_s_equal_one() {
        assert!(validate_params(1.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn validate_params_rejects_out_of_order_bounds() {
        assert!(validate_params(0.9, 0.5, 0.95).is_err());
    }

    #[test]
    fn validate_params_accepts_sane_values() {
        assert!(validate_params(0.7, 0.9, 0.99).is_ok());
    }
}
