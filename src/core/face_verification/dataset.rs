use super::embedding::array_to_tensor;
use crate::utils::error::{PipelineError, Result};
use candle_core::{Device, Tensor};
use ndarray::{Array1, Array4, Axis};
use ndarray_npy::read_npy;
use std::path::Path;

/// Anchor, positive and negative image batches of identical shape `(N, H, W, C)`.
#[derive(Debug, Clone)]
pub struct Triplets {
    anchors: Array4<f32>,
    positives: Array4<f32>,
    negatives: Array4<f32>,
}

impl Triplets {
    pub fn new(
        anchors: Array4<f32>,
        positives: Array4<f32>,
        negatives: Array4<f32>,
    ) -> Result<Self> {
        let expected = anchors.shape().to_vec();
        for (name, array) in [("positives", &positives), ("negatives", &negatives)] {
            if array.shape() != expected.as_slice() {
                return Err(PipelineError::ShapeMismatch {
                    name: name.to_string(),
                    expected,
                    actual: array.shape().to_vec(),
                });
            }
        }

        Ok(Self {
            anchors,
            positives,
            negatives,
        })
    }

    /// Reads the three arrays from `.npy` files (`float32`, shape `(N, H, W, C)`).
    pub fn from_npy<P: AsRef<Path>>(anchors: P, positives: P, negatives: P) -> Result<Self> {
        let anchors: Array4<f32> = read_npy(anchors)?;
        let positives: Array4<f32> = read_npy(positives)?;
        let negatives: Array4<f32> = read_npy(negatives)?;
        Self::new(anchors, positives, negatives)
    }

    pub fn len(&self) -> usize {
        self.anchors.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-sample shape `[H, W, C]`.
    pub fn sample_shape(&self) -> &[usize] {
        &self.anchors.shape()[1..]
    }

    /// Gathers the given rows of all three arrays into tensors.
    pub fn batch(&self, indices: &[usize], device: &Device) -> Result<(Tensor, Tensor, Tensor)> {
        let anchors = self.anchors.select(Axis(0), indices);
        let positives = self.positives.select(Axis(0), indices);
        let negatives = self.negatives.select(Axis(0), indices);
        Ok((
            array_to_tensor(anchors.view(), device)?,
            array_to_tensor(positives.view(), device)?,
            array_to_tensor(negatives.view(), device)?,
        ))
    }
}

/// Loads evaluation images `(N, H, W, C)` and their integer identities `(N,)`.
pub fn load_labelled_images<P: AsRef<Path>>(
    images: P,
    identities: P,
) -> Result<(Array4<f32>, Vec<i64>)> {
    let images: Array4<f32> = read_npy(images)?;
    let identities: Array1<i64> = read_npy(identities)?;
    if identities.len() != images.len_of(Axis(0)) {
        return Err(PipelineError::ShapeMismatch {
            name: "identities".to_string(),
            expected: vec![images.len_of(Axis(0))],
            actual: vec![identities.len()],
        });
    }
    Ok((images, identities.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::write_npy;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_mismatched_shapes() {
        let a = Array4::<f32>::zeros((4, 8, 8, 3));
        let p = Array4::<f32>::zeros((4, 8, 8, 3));
        let n = Array4::<f32>::zeros((3, 8, 8, 3));

        let result = Triplets::new(a, p, n);

        match result {
            Err(PipelineError::ShapeMismatch { name, .. }) => assert_eq!(name, "negatives"),
            other => panic!("expected shape mismatch, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_batch_selects_rows() {
        let a = Array4::from_shape_fn((3, 1, 1, 1), |(n, _, _, _)| n as f32);
        let p = a.mapv(|v| v + 10.0);
        let n = a.mapv(|v| v + 20.0);
        let triplets = Triplets::new(a, p, n).unwrap();

        let (anchors, positives, negatives) = triplets.batch(&[2, 0], &Device::Cpu).unwrap();

        assert_eq!(anchors.dims(), &[2, 1, 1, 1]);
        assert_eq!(anchors.flatten_all().unwrap().to_vec1::<f32>().unwrap(), vec![2.0, 0.0]);
        assert_eq!(positives.flatten_all().unwrap().to_vec1::<f32>().unwrap(), vec![12.0, 10.0]);
        assert_eq!(negatives.flatten_all().unwrap().to_vec1::<f32>().unwrap(), vec![22.0, 20.0]);
    }

    #[test]
    fn test_load_from_npy_files() {
        let dir = TempDir::new().unwrap();
        let arrays = Array4::<f32>::from_elem((2, 4, 4, 3), 0.25);
        for name in ["a.npy", "p.npy", "n.npy"] {
            write_npy(dir.path().join(name), &arrays).unwrap();
        }

        let triplets = Triplets::from_npy(
            dir.path().join("a.npy"),
            dir.path().join("p.npy"),
            dir.path().join("n.npy"),
        )
        .unwrap();

        assert_eq!(triplets.len(), 2);
        assert_eq!(triplets.sample_shape(), &[4, 4, 3]);
    }

    #[test]
    fn test_load_labelled_images_checks_lengths() {
        let dir = TempDir::new().unwrap();
        write_npy(dir.path().join("images.npy"), &Array4::<f32>::zeros((3, 4, 4, 3))).unwrap();
        write_npy(dir.path().join("ids.npy"), &Array1::<i64>::from(vec![1, 2])).unwrap();

        let result =
            load_labelled_images(dir.path().join("images.npy"), dir.path().join("ids.npy"));

        assert!(matches!(result, Err(PipelineError::ShapeMismatch { .. })));
    }
}
