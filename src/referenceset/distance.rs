//! Cosine distance and prior-weighted neighbor averaging over dense
//! feature columns, as used by [`super::reference_set::ReferenceSet`] for
//! nearest-neighbor lookups during specificity derivation.

pub fn vec_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

pub fn cosine_distance(a: &[f64], b: &[f64], a_norm: f64, b_norm: f64) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    1.0 - (dot / (a_norm * b_norm))
}

/// Cosine distance from `v` to every column of `columns`, given
/// precomputed column norms.
pub fn cosine_distances(v: &[f64], columns: &[Vec<f64>], column_norms: &[f64]) -> Vec<f64> {
    let v_norm = vec_norm(v);
    columns
        .iter()
        .zip(column_norms)
        .map(|(col, &col_norm)| cosine_distance(v, col, v_norm, col_norm))
        .collect()
}

/// Weighted average of `columns` at `indexes`, weighted by `priors`.
pub fn neighbor_average(columns: &[Vec<f64>], priors: &[f64], indexes: &[usize]) -> Vec<f64> {
    let norm: f64 = indexes.iter().map(|&j| priors[j]).sum();
    let n_features = columns.first().map_or(0, |c| c.len());
    let mut result = vec![0.0; n_features];
    for &j in indexes {
        let weight = priors[j];
        for (i, value) in columns[j].iter().enumerate() {
            result[i] += weight * value;
        }
    }
    for value in &mut result {
        *value /= norm;
    }
    result
}

/// Indexes of the `k` nearest columns to `source_index` by cosine
/// distance, excluding `source_index` itself. Ties are broken by
/// insertion order (stable sort over `(distance, index)`).
pub fn nearest_neighbors(
    source_index: usize,
    columns: &[Vec<f64>],
    column_norms: &[f64],
    k: usize,
) -> Vec<usize> {
    let mut distances = cosine_distances(&columns[source_index], columns, column_norms);
    distances[source_index] = f64::INFINITY;
    let mut dist_index: Vec<(f64, usize)> = distances.into_iter().zip(0..).collect();
    dist_index.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("distances are finite or inf"));
    dist_index.into_iter().take(k).map(|(_, i)| i).collect()
}
