use serde::{Deserialize, Serialize};

use crate::error::{BiometricError, BiometricResult};

/// Fixed embedding dimension produced by the external capture pipeline.
pub const EMBEDDING_DIM: usize = 128;

/// A validated 128-dimensional face embedding.
///
/// Construction goes through [`BiometricVector::new`], which rejects the
/// degenerate outputs a broken extractor produces: wrong length, all zeros,
/// NaN or infinity. Code holding a `BiometricVector` may therefore compare
/// it without re-checking.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct BiometricVector(Vec<f64>);

impl BiometricVector {
    pub fn new(values: Vec<f64>) -> BiometricResult<Self> {
        if values.is_empty() {
            return Err(BiometricError::MissingVector);
        }
        if values.len() != EMBEDDING_DIM {
            return Err(BiometricError::WrongDimension {
                expected: EMBEDDING_DIM,
                actual: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(BiometricError::NonFinite);
        }
        if values.iter().all(|v| *v == 0.0) {
            return Err(BiometricError::AllZeros);
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean norm of the element-wise difference.
    pub fn distance(&self, other: &BiometricVector) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

impl std::fmt::Debug for BiometricVector {
    // Never print embedding values; they are biometric data.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BiometricVector(dim={})", self.0.len())
    }
}

impl TryFrom<Vec<f64>> for BiometricVector {
    type Error = BiometricError;

    fn try_from(values: Vec<f64>) -> BiometricResult<Self> {
        Self::new(values)
    }
}

impl From<BiometricVector> for Vec<f64> {
    fn from(v: BiometricVector) -> Self {
        v.0
    }
}
