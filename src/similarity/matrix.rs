use anyhow::Result;

/// Square, symmetric similarity matrix over the canonical articles of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Every article maximally dissimilar from every other.
    pub fn identity(size: usize) -> Self {
        let mut values = vec![0.0; size * size];
        for i in 0..size {
            values[i * size + i] = 1.0;
        }
        Self { size, values }
    }

    /// Builds a matrix from a pairwise function evaluated once per unordered pair.
    /// The diagonal is fixed at 1.0.
    pub fn from_pairwise<F>(size: usize, mut similarity: F) -> Self
    where
        F: FnMut(usize, usize) -> f32,
    {
        let mut matrix = Self::identity(size);
        for i in 0..size {
            for j in (i + 1)..size {
                matrix.set(i, j, similarity(i, j));
            }
        }
        matrix
    }

    /// Wraps row-major values, checking the shape.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let size = rows.len();
        let mut values = Vec::with_capacity(size * size);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(anyhow::anyhow!(
                    "Row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    size
                ));
            }
            values.extend(row);
        }
        Ok(Self { size, values })
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.size + j]
    }

    /// Sets both `(i, j)` and `(j, i)`.
    pub fn set(&mut self, i: usize, j: usize, value: f32) {
        self.values[i * self.size + j] = value;
        self.values[j * self.size + i] = value;
    }

    /// Off-diagonal unordered pairs whose similarity is strictly above `threshold`.
    pub fn pairs_above(&self, threshold: f32) -> usize {
        let mut count = 0;
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                if self.get(i, j) > threshold {
                    count += 1;
                }
            }
        }
        count
    }

    /// Short-circuiting variant of [`pairs_above`](Self::pairs_above).
    pub fn any_pair_above(&self, threshold: f32) -> bool {
        (0..self.size).any(|i| ((i + 1)..self.size).any(|j| self.get(i, j) > threshold))
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    pub fn is_symmetric(&self, tolerance: f32) -> bool {
        (0..self.size)
            .all(|i| ((i + 1)..self.size).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tolerance))
    }

    /// Element-wise `a * self + b * other`. Shapes must match.
    pub fn weighted_sum(&self, a: f32, other: &SimilarityMatrix, b: f32) -> Result<Self> {
        if self.size != other.size {
            return Err(anyhow::anyhow!(
                "Matrix dimensions don't match: {} vs {}",
                self.size,
                other.size
            ));
        }
        let values = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(x, y)| a * x + b * y)
            .collect();
        Ok(Self {
            size: self.size,
            values,
        })
    }
}
