use candle_core::{Result, Tensor};

/// Margin loss over anchor/positive/negative embeddings:
/// `max(‖a − p‖² − ‖a − n‖² + alpha, 0)` per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripletLoss {
    alpha: f32,
}

impl TripletLoss {
    pub fn new(alpha: f32) -> Self {
        Self { alpha }
    }

    /// Loss for each triplet in the batch, shape `(N,)`.
    pub fn per_sample(
        &self,
        anchor: &Tensor,
        positive: &Tensor,
        negative: &Tensor,
    ) -> Result<Tensor> {
        let pos_dist = anchor.sub(positive)?.sqr()?.sum(1)?;
        let neg_dist = anchor.sub(negative)?.sqr()?.sum(1)?;
        pos_dist
            .sub(&neg_dist)?
            .affine(1.0, f64::from(self.alpha))?
            .relu()
    }

    /// Mean loss over the batch, as a scalar tensor.
    pub fn forward(&self, anchor: &Tensor, positive: &Tensor, negative: &Tensor) -> Result<Tensor> {
        self.per_sample(anchor, positive, negative)?.mean_all()
    }
}
