use nh_core::{Error, Result};
use super::{Reducer, UnitNormalize};

const MAX_ITERATIONS: usize = 200;
const TOLERANCE: f64 = 1e-10;

/// Principal component projection down to `components` dimensions, computed by
/// power iteration with deflation. Vectors are unit-normalised first when
/// `normalize` is set, so distances follow the cosine geometry of the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pca {
    pub components: usize,
    pub normalize: bool,
}

impl Pca {
    pub fn new(components: usize) -> Self {
        Self { components, normalize: true }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalized(v: Vec<f64>) -> Option<Vec<f64>> {
    let norm = dot(&v, &v).sqrt();
    (norm > TOLERANCE).then(|| v.into_iter().map(|x| x / norm).collect())
}

fn orthogonalize(mut v: Vec<f64>, basis: &[Vec<f64>]) -> Vec<f64> {
    for b in basis {
        let p = dot(&v, b);
        v.iter_mut().zip(b).for_each(|(x, y)| *x -= p * y);
    }
    v
}

/// `Xᵀ X v` for the centred rows `x`.
fn covariance_apply(x: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; v.len()];
    for row in x {
        let p = dot(row, v);
        out.iter_mut().zip(row).for_each(|(o, r)| *o += p * r);
    }
    out
}

fn leading_direction(x: &[Vec<f64>], basis: &[Vec<f64>]) -> Option<Vec<f64>> {
    // Start from the row with the most variance left outside `basis`.
    let mut start = None;
    let mut best = TOLERANCE;
    for row in x {
        let rest = orthogonalize(row.clone(), basis);
        let norm = dot(&rest, &rest).sqrt();
        if norm > best {
            best = norm;
            start = Some(rest);
        }
    }
    let mut v = normalized(start?)?;

    for _ in 0..MAX_ITERATIONS {
        let next = normalized(orthogonalize(covariance_apply(x, &v), basis))?;
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        if delta < TOLERANCE {
            break;
        }
    }
    Some(v)
}

impl Reducer for Pca {
    fn name(&self) -> &str {
        "pca"
    }

    fn reduce(&self, vectors: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>> {
        if self.components == 0 {
            return Err(Error::Input("PCA needs at least one component".to_string()));
        }
        let vectors = if self.normalize { UnitNormalize.reduce(vectors)? } else { vectors };
        let Some(dim) = vectors.first().map(Vec::len) else {
            return Ok(vectors);
        };

        let n = vectors.len() as f64;
        let mut mean = vec![0.0; dim];
        for v in &vectors {
            mean.iter_mut().zip(v).for_each(|(m, x)| *m += x / n);
        }
        let centred: Vec<Vec<f64>> = vectors
            .iter()
            .map(|v| v.iter().zip(&mean).map(|(x, m)| x - m).collect())
            .collect();

        let mut basis: Vec<Vec<f64>> = Vec::new();
        while basis.len() < self.components.min(dim) {
            match leading_direction(&centred, &basis) {
                Some(direction) => basis.push(direction),
                None => break,
            }
        }

        if basis.is_empty() {
            // Every vector is the same point.
            return Ok(vec![vec![0.0]; centred.len()]);
        }
        Ok(centred
            .iter()
            .map(|row| basis.iter().map(|b| dot(row, b)).collect())
            .collect())
    }
}
