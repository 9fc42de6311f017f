use nh_core::{Article, ArticleFilter, ArticleStorage, FieldUpdate, Result};
use serde::Serialize;
use tracing::{debug, info};
use crate::config::DuplicateConfig;
use crate::report::{write_updates, StageReport};
use crate::similarity::{cosine_similarity_matrix, embeddings_of, SimilarityMatrix};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub a: usize,
    pub b: usize,
    pub distance: f64,
}

/// Full average-linkage dendrogram over the cosine distances of `matrix`,
/// `n - 1` merges in discovery order.
pub fn average_linkage(matrix: &SimilarityMatrix) -> Vec<Merge> {
    let n = matrix.len();
    let mut dist: Vec<f64> = (0..n * n).map(|k| matrix.distance(k / n, k % n)).collect();
    let mut size = vec![1usize; n];
    let mut active = vec![true; n];
    let mut merges = Vec::with_capacity(n.saturating_sub(1));
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut remaining = n;

    while remaining > 1 {
        if chain.is_empty() {
            match active.iter().position(|a| *a) {
                Some(first) => chain.push(first),
                None => break,
            }
        }
        let tip = chain[chain.len() - 1];
        let previous = chain.len().checked_sub(2).map(|i| chain[i]);

        // Ties go to the previous chain element so the chain always terminates.
        let (mut nearest, mut nearest_dist) = match previous {
            Some(p) => (p, dist[tip * n + p]),
            None => (tip, f64::INFINITY),
        };
        for c in (0..n).filter(|&c| c != tip && active[c]) {
            if dist[tip * n + c] < nearest_dist {
                nearest = c;
                nearest_dist = dist[tip * n + c];
            }
        }

        if Some(nearest) != previous {
            chain.push(nearest);
            continue;
        }

        chain.truncate(chain.len() - 2);
        let (keep, gone) = (tip.min(nearest), tip.max(nearest));
        merges.push(Merge { a: keep, b: gone, distance: nearest_dist });

        // Lance-Williams update for average linkage
        let (size_keep, size_gone) = (size[keep] as f64, size[gone] as f64);
        for c in (0..n).filter(|&c| active[c] && c != keep && c != gone) {
            let d = (size_keep * dist[keep * n + c] + size_gone * dist[gone * n + c]) / (size_keep + size_gone);
            dist[keep * n + c] = d;
            dist[c * n + keep] = d;
        }
        size[keep] += size[gone];
        active[gone] = false;
        remaining -= 1;
    }

    merges
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Flat labels from the merges strictly below `cutoff`. Labels are dense,
/// zero-based and numbered by first appearance.
pub fn cut_dendrogram(n: usize, merges: &[Merge], cutoff: f64) -> Vec<usize> {
    let mut parent: Vec<usize> = (0..n).collect();
    for merge in merges.iter().filter(|m| m.distance < cutoff) {
        let (ra, rb) = (find(&mut parent, merge.a), find(&mut parent, merge.b));
        if ra != rb {
            parent[rb] = ra;
        }
    }

    let mut label_of_root = vec![usize::MAX; n];
    let mut next = 0;
    (0..n)
        .map(|i| {
            let root = find(&mut parent, i);
            if label_of_root[root] == usize::MAX {
                label_of_root[root] = next;
                next += 1;
            }
            label_of_root[root]
        })
        .collect()
}

pub fn cluster_duplicates(articles: &[Article], threshold: f64) -> Result<Vec<usize>> {
    let config = DuplicateConfig { threshold };
    config.validate()?;
    let embeddings = embeddings_of(articles)?;
    let matrix = cosine_similarity_matrix(&embeddings)?;
    let merges = average_linkage(&matrix);
    Ok(cut_dendrogram(matrix.len(), &merges, config.distance_cutoff()))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    pub stage: StageReport,
    pub clusters: usize,
    /// Article ids grouped by duplicate label.
    pub groups: Vec<Vec<String>>,
}

/// Recomputes `duplicate_cluster_id` for every article with an embedding.
pub async fn detect_duplicates(store: &dyn ArticleStorage, config: &DuplicateConfig) -> Result<DuplicateReport> {
    let articles = store.find(&ArticleFilter::with_embedding()).await?;
    if articles.is_empty() {
        info!("No articles found with embeddings.");
        return Ok(DuplicateReport::default());
    }
    info!("🔍 Detecting duplicates among {} articles (threshold {})", articles.len(), config.threshold);

    let labels = cluster_duplicates(&articles, config.threshold)?;
    let clusters = labels.iter().copied().max().map_or(0, |max| max + 1);
    let mut groups = vec![Vec::new(); clusters];
    for (article, label) in articles.iter().zip(&labels) {
        groups[*label].push(article.id.clone());
    }
    for (label, ids) in groups.iter().enumerate().filter(|(_, ids)| ids.len() > 1) {
        debug!("Duplicate cluster {}: {:?}", label, ids);
    }

    let stage = write_updates(
        store,
        articles
            .iter()
            .zip(&labels)
            .map(|(article, label)| (article.id.clone(), vec![FieldUpdate::DuplicateCluster(*label)])),
    )
    .await;
    info!("✨ Updated {} articles with duplicate_cluster_id ({} clusters)", stage.updated, clusters);

    Ok(DuplicateReport { stage, clusters, groups })
}
