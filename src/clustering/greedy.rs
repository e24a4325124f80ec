use crate::similarity::SimilarityMatrix;

/// Fallback grouping used when hierarchical clustering cannot run.
///
/// Walks articles in order; each unvisited article opens a group that takes every
/// not-yet-visited article whose similarity to it exceeds `threshold`. Never fails.
pub fn greedy_threshold_groups(similarity: &SimilarityMatrix, threshold: f32) -> Vec<Vec<usize>> {
    let n = similarity.len();
    let mut visited = vec![false; n];
    let mut groups = Vec::new();

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let mut group = vec![i];
        for j in (i + 1)..n {
            // NaN never exceeds the threshold
            if !visited[j] && similarity.get(i, j) > threshold {
                visited[j] = true;
                group.push(j);
            }
        }
        groups.push(group);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greedy_groups_by_seed() {
        let m = SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.9, 0.2, 0.8],
            vec![0.9, 1.0, 0.9, 0.1],
            vec![0.2, 0.9, 1.0, 0.1],
            vec![0.8, 0.1, 0.1, 1.0],
        ])
        .unwrap();
        // 2 is close to 1 but not to seed 0, and 1 is already taken
        assert_eq!(greedy_threshold_groups(&m, 0.75), vec![vec![0, 1, 3], vec![2]]);
    }

    #[test]
    fn test_greedy_survives_nan() {
        let m = SimilarityMatrix::from_rows(vec![vec![1.0, f32::NAN], vec![f32::NAN, 1.0]]).unwrap();
        assert_eq!(greedy_threshold_groups(&m, 0.5), vec![vec![0], vec![1]]);
    }
}
