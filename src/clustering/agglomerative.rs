use anyhow::Result;

use crate::similarity::SimilarityMatrix;

/// Hierarchical agglomerative clustering with average linkage.
///
/// Distances are `1 - similarity`. Clusters keep merging while the closest pair
/// is strictly nearer than `1 - threshold`; there is no fixed cluster count.
/// Average linkage keeps a chain of weak pairwise links from pulling a whole
/// batch into one cluster. Ties go to the lowest index pair.
///
/// Fails on matrices that are not finite and symmetric.
pub fn average_linkage_clusters(
    similarity: &SimilarityMatrix,
    threshold: f32,
) -> Result<Vec<Vec<usize>>> {
    let n = similarity.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    if !similarity.is_finite() {
        return Err(anyhow::anyhow!("Similarity matrix contains non-finite values"));
    }
    if !similarity.is_symmetric(1e-4) {
        return Err(anyhow::anyhow!("Similarity matrix is not symmetric"));
    }

    let cutoff = 1.0 - f64::from(threshold);
    let mut distance: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| 1.0 - f64::from(similarity.get(i, j))).collect())
        .collect();
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let mut active = vec![true; n];

    loop {
        let mut closest: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|&i| active[i]) {
            for j in ((i + 1)..n).filter(|&j| active[j]) {
                let d = distance[i][j];
                if closest.map_or(true, |(_, _, best)| d < best) {
                    closest = Some((i, j, d));
                }
            }
        }

        let Some((a, b, d)) = closest else {
            break;
        };
        if d >= cutoff {
            break;
        }

        // Lance-Williams update for average linkage, `b` folds into `a`
        let size_a = members[a].len() as f64;
        let size_b = members[b].len() as f64;
        for k in (0..n).filter(|&k| active[k] && k != a && k != b) {
            let merged = (size_a * distance[a][k] + size_b * distance[b][k]) / (size_a + size_b);
            distance[a][k] = merged;
            distance[k][a] = merged;
        }
        active[b] = false;
        let moved = std::mem::take(&mut members[b]);
        members[a].extend(moved);
    }

    let mut groups: Vec<Vec<usize>> = members
        .into_iter()
        .zip(active)
        .filter_map(|(mut group, alive)| {
            alive.then(|| {
                group.sort_unstable();
                group
            })
        })
        .collect();
    groups.sort_by_key(|group| group[0]);
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[f32]]) -> SimilarityMatrix {
        SimilarityMatrix::from_rows(rows.iter().map(|r| r.to_vec()).collect()).unwrap()
    }

    #[test]
    fn test_pairs_merge_above_threshold() {
        let m = matrix(&[
            &[1.0, 0.9, 0.1, 0.0],
            &[0.9, 1.0, 0.2, 0.1],
            &[0.1, 0.2, 1.0, 0.8],
            &[0.0, 0.1, 0.8, 1.0],
        ]);
        let groups = average_linkage_clusters(&m, 0.75).unwrap();
        assert_eq!(groups, vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn test_average_linkage_resists_chaining() {
        // 0-1 and 1-2 are close, 0-2 is not; single linkage would chain all three
        let m = matrix(&[
            &[1.0, 0.85, 0.3],
            &[0.85, 1.0, 0.8],
            &[0.3, 0.8, 1.0],
        ]);
        let groups = average_linkage_clusters(&m, 0.75).unwrap();
        assert_eq!(groups, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_equal_to_threshold_does_not_merge() {
        let m = matrix(&[&[1.0, 0.75], &[0.75, 1.0]]);
        assert_eq!(average_linkage_clusters(&m, 0.75).unwrap(), vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_rejects_degenerate_matrices() {
        let nan = matrix(&[&[1.0, f32::NAN], &[f32::NAN, 1.0]]);
        assert!(average_linkage_clusters(&nan, 0.75).is_err());

        let skewed = matrix(&[&[1.0, 0.9], &[0.1, 1.0]]);
        assert!(average_linkage_clusters(&skewed, 0.75).is_err());
    }

    #[test]
    fn test_empty_matrix() {
        assert!(average_linkage_clusters(&SimilarityMatrix::identity(0), 0.75)
            .unwrap()
            .is_empty());
    }
}
