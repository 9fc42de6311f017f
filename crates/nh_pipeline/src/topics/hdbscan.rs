use crate::config::Metric;

/// Stands in for an infinite density level when two points coincide.
const MAX_LAMBDA: f64 = 1e12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HdbscanParams {
    pub min_cluster_size: usize,
    /// Neighbours used for core distances, not counting the point itself.
    pub min_samples: usize,
    pub metric: Metric,
}

pub fn pairwise_distances(points: &[Vec<f64>], metric: Metric) -> Vec<f64> {
    let n = points.len();
    let norms: Vec<f64> = points.iter().map(|p| p.iter().map(|x| x * x).sum::<f64>().sqrt()).collect();
    let mut dist = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = match metric {
                Metric::Euclidean => points[i]
                    .iter()
                    .zip(&points[j])
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt(),
                Metric::Cosine => {
                    let denom = norms[i] * norms[j];
                    let sim = if denom == 0.0 {
                        0.0
                    } else {
                        points[i].iter().zip(&points[j]).map(|(a, b)| a * b).sum::<f64>() / denom
                    };
                    (1.0 - sim).max(0.0)
                }
            };
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }
    dist
}

/// Distance from each point to its `min_samples`-th nearest other point.
fn core_distances(dist: &[f64], n: usize, min_samples: usize) -> Vec<f64> {
    // Each sorted row starts with the point's zero distance to itself.
    let k = min_samples.max(1).min(n.saturating_sub(1));
    (0..n)
        .map(|i| {
            let mut row = dist[i * n..(i + 1) * n].to_vec();
            row.sort_by(|a, b| a.total_cmp(b));
            row[k]
        })
        .collect()
}

fn mutual_reachability_mst(dist: &[f64], core: &[f64], n: usize) -> Vec<(usize, usize, f64)> {
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut from = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    in_tree[0] = true;
    for _ in 1..n {
        for j in (0..n).filter(|&j| !in_tree[j]) {
            let reach = dist[current * n + j].max(core[current]).max(core[j]);
            if reach < best[j] {
                best[j] = reach;
                from[j] = current;
            }
        }
        let next = (0..n)
            .filter(|&j| !in_tree[j])
            .min_by(|&a, &b| best[a].total_cmp(&best[b]));
        let Some(next) = next else { break };
        edges.push((from[next], next, best[next]));
        in_tree[next] = true;
        current = next;
    }

    edges.sort_by(|a, b| a.2.total_cmp(&b.2));
    edges
}

#[derive(Debug, Clone, Copy)]
struct LinkageNode {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn single_linkage(mst: &[(usize, usize, f64)], n: usize) -> Vec<LinkageNode> {
    let mut parent: Vec<usize> = (0..2 * n).collect();
    let mut size = vec![1usize; 2 * n];
    let mut nodes = Vec::with_capacity(mst.len());

    for (k, &(a, b, distance)) in mst.iter().enumerate() {
        let (left, right) = (find(&mut parent, a), find(&mut parent, b));
        let id = n + k;
        parent[left] = id;
        parent[right] = id;
        size[id] = size[left] + size[right];
        nodes.push(LinkageNode { left, right, distance, size: size[id] });
    }
    nodes
}

#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: usize,
    lambda: f64,
    size: usize,
}

fn lambda_of(distance: f64) -> f64 {
    if distance > 0.0 {
        (1.0 / distance).min(MAX_LAMBDA)
    } else {
        MAX_LAMBDA
    }
}

/// Walks the hierarchy from the root, keeping only splits where both sides
/// reach `min_cluster_size`. Cluster ids start at `n`; the root is `n`.
fn condense(nodes: &[LinkageNode], n: usize, min_cluster_size: usize) -> (Vec<CondensedEdge>, usize) {
    let size_of = |node: usize| if node < n { 1 } else { nodes[node - n].size };
    let leaves_of = |node: usize| {
        let mut leaves = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current < n {
                leaves.push(current);
            } else {
                stack.push(nodes[current - n].left);
                stack.push(nodes[current - n].right);
            }
        }
        leaves
    };

    let mut edges = Vec::new();
    let mut next_cluster = n + 1;
    let mut stack = vec![(n + nodes.len() - 1, n)];

    while let Some((node, cluster)) = stack.pop() {
        if node < n {
            continue;
        }
        let LinkageNode { left, right, distance, .. } = nodes[node - n];
        let lambda = lambda_of(distance);
        let (left_big, right_big) = (size_of(left) >= min_cluster_size, size_of(right) >= min_cluster_size);

        match (left_big, right_big) {
            (true, true) => {
                for child in [left, right] {
                    let id = next_cluster;
                    next_cluster += 1;
                    edges.push(CondensedEdge { parent: cluster, child: id, lambda, size: size_of(child) });
                    stack.push((child, id));
                }
            }
            (false, false) => {
                for point in leaves_of(left).into_iter().chain(leaves_of(right)) {
                    edges.push(CondensedEdge { parent: cluster, child: point, lambda, size: 1 });
                }
            }
            (true, false) | (false, true) => {
                let (kept, dropped) = if left_big { (left, right) } else { (right, left) };
                for point in leaves_of(dropped) {
                    edges.push(CondensedEdge { parent: cluster, child: point, lambda, size: 1 });
                }
                stack.push((kept, cluster));
            }
        }
    }

    (edges, next_cluster)
}

/// Excess-of-mass selection. Returns `selected[c - n]` for every cluster id.
fn select_clusters(edges: &[CondensedEdge], n: usize, cluster_end: usize) -> Vec<bool> {
    let count = cluster_end - n;
    let mut birth = vec![0.0; count];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for edge in edges.iter().filter(|e| e.child >= n) {
        birth[edge.child - n] = edge.lambda;
        children[edge.parent - n].push(edge.child - n);
    }

    let mut stability = vec![0.0; count];
    for edge in edges {
        stability[edge.parent - n] += (edge.lambda - birth[edge.parent - n]) * edge.size as f64;
    }

    // Children always carry larger ids than their parent, so a reverse sweep
    // settles every subtree before the cluster above it.
    let mut selected = vec![false; count];
    for c in (1..count).rev() {
        let subtree: f64 = children[c].iter().map(|&child| stability[child]).sum();
        if children[c].is_empty() || subtree <= stability[c] {
            selected[c] = true;
            let mut stack = children[c].clone();
            while let Some(descendant) = stack.pop() {
                selected[descendant] = false;
                stack.extend(children[descendant].iter().copied());
            }
        } else {
            stability[c] = subtree;
        }
    }
    selected
}

/// One label per point, `None` for noise. Cluster labels are dense and follow
/// the order in which the hierarchy discovered them.
pub fn hdbscan(points: &[Vec<f64>], params: &HdbscanParams) -> Vec<Option<usize>> {
    let n = points.len();
    if n < params.min_cluster_size.max(2) {
        return vec![None; n];
    }

    let dist = pairwise_distances(points, params.metric);
    let core = core_distances(&dist, n, params.min_samples);
    let mst = mutual_reachability_mst(&dist, &core, n);
    let nodes = single_linkage(&mst, n);
    let (edges, cluster_end) = condense(&nodes, n, params.min_cluster_size);
    let selected = select_clusters(&edges, n, cluster_end);

    let mut parent_of = vec![usize::MAX; cluster_end];
    for edge in &edges {
        parent_of[edge.child] = edge.parent;
    }

    let mut dense = vec![None; cluster_end - n];
    let mut next = 0;
    for (c, is_selected) in selected.iter().enumerate() {
        if *is_selected {
            dense[c] = Some(next);
            next += 1;
        }
    }

    (0..n)
        .map(|point| {
            let mut cluster = parent_of[point];
            while cluster != usize::MAX && cluster > n {
                if let Some(label) = dense[cluster - n] {
                    return Some(label);
                }
                cluster = parent_of[cluster];
            }
            None
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min_cluster_size: usize, metric: Metric) -> HdbscanParams {
        HdbscanParams { min_cluster_size, min_samples: 1, metric }
    }

    #[test]
    fn test_too_few_points_are_noise() {
        let points = vec![vec![0.0, 0.0], vec![0.0, 0.1], vec![0.1, 0.0]];
        assert_eq!(hdbscan(&points, &params(5, Metric::Euclidean)), vec![None, None, None]);
        assert!(hdbscan(&[], &params(2, Metric::Euclidean)).is_empty());
    }

    #[test]
    fn test_two_groups_and_an_outlier() {
        let points = vec![
            vec![0.0, 0.0],
            vec![10.0, 10.0],
            vec![0.0, 0.1],
            vec![10.0, 10.1],
            vec![0.1, 0.0],
            vec![10.1, 10.0],
            vec![50.0, 50.0],
        ];
        let labels = hdbscan(&points, &params(3, Metric::Euclidean));

        assert!(labels[0].is_some());
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[0], labels[4]);
        assert!(labels[1].is_some());
        assert_eq!(labels[1], labels[3]);
        assert_eq!(labels[1], labels[5]);
        assert_ne!(labels[0], labels[1]);
        assert_eq!(labels[6], None);
    }

    #[test]
    fn test_cosine_metric_ignores_magnitude() {
        let points = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![2.0, 0.01],
            vec![0.01, 2.0],
            vec![3.0, 0.0],
            vec![0.0, 3.0],
        ];
        let labels = hdbscan(&points, &params(3, Metric::Cosine));
        assert!(labels.iter().all(Option::is_some));
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[0], labels[4]);
        assert_eq!(labels[1], labels[3]);
        assert_eq!(labels[1], labels[5]);
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn test_single_dense_blob_is_noise_without_a_split() {
        let points = vec![vec![0.0], vec![0.1], vec![0.2], vec![0.3]];
        let labels = hdbscan(&points, &params(3, Metric::Euclidean));
        assert_eq!(labels, vec![None; 4]);
    }

    #[test]
    fn test_core_distance_skips_self() {
        let dist = pairwise_distances(&[vec![0.0], vec![1.0], vec![3.0]], Metric::Euclidean);
        assert_eq!(core_distances(&dist, 3, 1), vec![1.0, 1.0, 2.0]);
        assert_eq!(core_distances(&dist, 3, 2), vec![3.0, 2.0, 3.0]);
        assert_eq!(core_distances(&dist, 3, 10), vec![3.0, 2.0, 3.0]);
    }

    #[test]
    fn test_larger_min_samples_marks_sparse_points_as_noise() {
        // Two tight triples plus a far pair too small to form a cluster.
        let points = vec![
            vec![0.0, 0.0],
            vec![0.0, 0.1],
            vec![0.1, 0.0],
            vec![10.0, 10.0],
            vec![10.0, 10.1],
            vec![10.1, 10.0],
            vec![30.0, 30.0],
            vec![31.0, 31.0],
        ];
        let labels = hdbscan(
            &points,
            &HdbscanParams { min_cluster_size: 3, min_samples: 2, metric: Metric::Euclidean },
        );
        assert!(labels[0].is_some());
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert!(labels[3].is_some());
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
        assert_eq!(labels[6], None);
        assert_eq!(labels[7], None);
    }
}
