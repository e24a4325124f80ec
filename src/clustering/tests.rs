use super::*;
use crate::similarity::SimilarityMatrix;

fn sample_matrix() -> SimilarityMatrix {
    // Two tight stories, one loose pair and a singleton
    SimilarityMatrix::from_rows(vec![
        vec![1.0, 0.95, 0.9, 0.2, 0.1, 0.0],
        vec![0.95, 1.0, 0.88, 0.1, 0.2, 0.1],
        vec![0.9, 0.88, 1.0, 0.2, 0.1, 0.0],
        vec![0.2, 0.1, 0.2, 1.0, 0.7, 0.1],
        vec![0.1, 0.2, 0.1, 0.7, 1.0, 0.2],
        vec![0.0, 0.1, 0.0, 0.1, 0.2, 1.0],
    ])
    .unwrap()
}

fn covers_every_index_once(partition: &Partition, n: usize) -> bool {
    let mut seen: Vec<usize> = partition.groups.iter().flatten().copied().collect();
    seen.sort_unstable();
    seen == (0..n).collect::<Vec<_>>()
}

#[test]
fn test_find_similar_groups() {
    let partition = find_similar_groups(&sample_matrix(), 0.75);
    assert_eq!(partition.method, ClusteringMethod::AverageLinkage);
    assert_eq!(partition.groups, vec![vec![0, 1, 2], vec![3], vec![4], vec![5]]);
    assert!(covers_every_index_once(&partition, 6));
    assert!((partition.average_size() - 1.5).abs() < 1e-9);
}

#[test]
fn test_cluster_count_non_decreasing_in_threshold() {
    let m = sample_matrix();
    let mut previous = 0;
    for step in 0..=20 {
        let threshold = step as f32 * 0.05;
        let partition = find_similar_groups(&m, threshold);
        assert!(covers_every_index_once(&partition, 6));
        assert!(
            partition.groups.len() >= previous,
            "threshold {} produced {} clusters after {}",
            threshold,
            partition.groups.len(),
            previous
        );
        previous = partition.groups.len();
    }
    assert_eq!(previous, 6);
}

#[test]
fn test_degenerate_matrix_uses_greedy_fallback() {
    let mut rows = vec![vec![1.0, 0.9, 0.1], vec![0.9, 1.0, 0.1], vec![0.1, 0.1, 1.0]];
    rows[2][0] = f32::INFINITY;
    rows[0][2] = f32::INFINITY;
    let m = SimilarityMatrix::from_rows(rows).unwrap();

    let partition = find_similar_groups(&m, 0.75);
    assert_eq!(partition.method, ClusteringMethod::GreedyFallback);
    assert!(covers_every_index_once(&partition, 3));
}

#[test]
fn test_cluster_label_and_others() {
    use crate::article::ArticleId;

    assert_eq!(cluster_label(3), "C_3");
    let group = ClusterGroup {
        cluster_id: cluster_label(0),
        members: vec![ArticleId(2), ArticleId(5), ArticleId(7)],
        representative: ArticleId(5),
    };
    assert_eq!(group.others().collect::<Vec<_>>(), vec![ArticleId(2), ArticleId(7)]);
    assert_eq!(group.len(), 3);
}
