use nh_core::{Article, Error, Result};

/// Dense symmetric N×N matrix of cosine similarities, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n..(i + 1) * self.n]
    }

    /// Cosine distance `1 - similarity`, clamped at zero.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        (1.0 - self.get(i, j)).max(0.0)
    }

    /// Number of other rows whose similarity to row `i` is strictly above `threshold`.
    pub fn count_above(&self, i: usize, threshold: f64) -> usize {
        self.row(i)
            .iter()
            .enumerate()
            .filter(|(j, sim)| *j != i && **sim > threshold)
            .count()
    }
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum()
}

/// Cosine similarity of two equal-length vectors; zero when either has no length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        0.0
    } else {
        (dot(a, b) / denom).clamp(-1.0, 1.0)
    }
}

pub fn check_dimensions<V: AsRef<[f32]>>(vectors: &[V]) -> Result<usize> {
    let first = vectors
        .first()
        .ok_or_else(|| Error::Input("At least one embedding is required".to_string()))?;
    let dimension = first.as_ref().len();
    if dimension == 0 {
        return Err(Error::Input("Embeddings must have at least one component".to_string()));
    }
    if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.as_ref().len() != dimension) {
        return Err(Error::Input(format!(
            "Embedding {} has {} components, expected {}",
            i,
            v.as_ref().len(),
            dimension
        )));
    }
    Ok(dimension)
}

/// Builds the pairwise similarity matrix. The diagonal is exactly 1.
pub fn cosine_similarity_matrix<V: AsRef<[f32]>>(vectors: &[V]) -> Result<SimilarityMatrix> {
    check_dimensions(vectors)?;
    let n = vectors.len();
    let norms: Vec<f64> = vectors.iter().map(|v| norm(v.as_ref())).collect();
    let mut values = vec![0.0; n * n];

    for i in 0..n {
        values[i * n + i] = 1.0;
        for j in (i + 1)..n {
            let denom = norms[i] * norms[j];
            let sim = if denom == 0.0 {
                0.0
            } else {
                (dot(vectors[i].as_ref(), vectors[j].as_ref()) / denom).clamp(-1.0, 1.0)
            };
            values[i * n + j] = sim;
            values[j * n + i] = sim;
        }
    }

    Ok(SimilarityMatrix { n, values })
}

/// Borrows the embedding of every article, failing on the first one without.
pub fn embeddings_of(articles: &[Article]) -> Result<Vec<&[f32]>> {
    articles
        .iter()
        .map(|article| {
            article
                .embedding
                .as_deref()
                .ok_or_else(|| Error::Input(format!("Article {} has no embedding", article.id)))
        })
        .collect()
}
