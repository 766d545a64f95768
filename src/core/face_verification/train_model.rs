use super::dataset::Triplets;
use super::embedding::{EmbeddingConfig, EmbeddingModel};
use super::metrics;
use super::triplet_loss::TripletLoss;
use crate::utils::error::{PipelineError, Result};
use crate::utils::monitor::SystemMonitor;
use candle_core::{Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use ndarray::{ArrayView4, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

pub const LEARNING_RATE: f64 = 1e-3;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    pub verbose: bool,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 5,
            batch_size: 32,
            validation_split: 0.3,
            verbose: true,
            shuffle: true,
            seed: None,
        }
    }
}

/// Per-epoch losses. `val_loss` stays empty when nothing is held out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub loss: Vec<f32>,
    pub val_loss: Vec<f32>,
}

/// Result of a threshold sweep over pairwise embedding distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestTau {
    pub tau: f32,
    pub f1: f64,
    pub accuracy: f64,
}

/// Three-input network sharing one base model, with triplet loss and Adam attached.
pub struct TripletNetwork {
    base: EmbeddingModel,
    loss: TripletLoss,
    optimizer: AdamW,
}

impl TripletNetwork {
    pub fn new(base: EmbeddingModel, alpha: f32, learning_rate: f64) -> Result<Self> {
        let params = ParamsAdamW {
            lr: learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        };
        let optimizer = AdamW::new(base.varmap().all_vars(), params)?;
        Ok(Self {
            base,
            loss: TripletLoss::new(alpha),
            optimizer,
        })
    }

    pub fn input_shape(&self) -> [usize; 3] {
        self.base.config().input_shape()
    }

    fn check_inputs(&self, anchor: &Tensor, positive: &Tensor, negative: &Tensor) -> Result<()> {
        self.base.check_input("anchor", anchor)?;
        for (name, input) in [("positive", positive), ("negative", negative)] {
            if input.dims() != anchor.dims() {
                return Err(PipelineError::ShapeMismatch {
                    name: name.to_string(),
                    expected: anchor.dims().to_vec(),
                    actual: input.dims().to_vec(),
                });
            }
        }
        Ok(())
    }

    /// Per-sample triplet loss for a batch, shape `(N,)`.
    pub fn forward(&self, anchor: &Tensor, positive: &Tensor, negative: &Tensor) -> Result<Tensor> {
        self.check_inputs(anchor, positive, negative)?;
        let a = self.base.embed(anchor)?;
        let p = self.base.embed(positive)?;
        let n = self.base.embed(negative)?;
        Ok(self.loss.per_sample(&a, &p, &n)?)
    }

    /// Mean batch loss without updating weights.
    pub fn evaluate(&self, anchor: &Tensor, positive: &Tensor, negative: &Tensor) -> Result<f32> {
        let loss = self.forward(anchor, positive, negative)?.mean_all()?;
        Ok(loss.to_scalar::<f32>()?)
    }

    /// One Adam step on a batch; returns the batch loss before the update.
    pub fn train_step(
        &mut self,
        anchor: &Tensor,
        positive: &Tensor,
        negative: &Tensor,
    ) -> Result<f32> {
        let loss = self.forward(anchor, positive, negative)?.mean_all()?;
        self.optimizer.backward_step(&loss)?;
        Ok(loss.to_scalar::<f32>()?)
    }
}

pub struct TrainModel {
    pub base_model: EmbeddingModel,
    pub training_model: TripletNetwork,
}

impl TrainModel {
    /// Loads the base embedding model from `model_path` and builds the training network.
    pub fn new<P: AsRef<Path>>(model_path: P, alpha: f32) -> Result<Self> {
        Self::with_config(model_path, alpha, EmbeddingConfig::default(), &Device::Cpu)
    }

    pub fn with_config<P: AsRef<Path>>(
        model_path: P,
        alpha: f32,
        config: EmbeddingConfig,
        device: &Device,
    ) -> Result<Self> {
        let base_model = EmbeddingModel::load(model_path, config, device)?;
        Self::from_base_model(base_model, alpha)
    }

    pub fn from_base_model(base_model: EmbeddingModel, alpha: f32) -> Result<Self> {
        let training_model = TripletNetwork::new(base_model.clone(), alpha, LEARNING_RATE)?;
        tracing::debug!(
            "Built triplet network: input {:?}, alpha {}",
            training_model.input_shape(),
            alpha
        );
        Ok(Self {
            base_model,
            training_model,
        })
    }

    pub fn train(&mut self, triplets: &Triplets, options: &TrainOptions) -> Result<History> {
        self.train_monitored(triplets, options, &SystemMonitor::new(false))
    }

    /// Trains on the leading `1 - validation_split` share of the triplets and
    /// scores the trailing share after every epoch.
    pub fn train_monitored(
        &mut self,
        triplets: &Triplets,
        options: &TrainOptions,
        monitor: &SystemMonitor,
    ) -> Result<History> {
        if options.batch_size == 0 {
            return Err(PipelineError::InvalidConfigValueError {
                field: "training.batch_size".to_string(),
                value: "0".to_string(),
                reason: "Batch size must be at least 1".to_string(),
            });
        }
        if !(0.0..1.0).contains(&options.validation_split) {
            return Err(PipelineError::InvalidConfigValueError {
                field: "training.validation_split".to_string(),
                value: options.validation_split.to_string(),
                reason: "Validation split must be in [0, 1)".to_string(),
            });
        }

        let total = triplets.len();
        let split_at = (total as f64 * (1.0 - options.validation_split)).floor() as usize;
        if split_at == 0 {
            return Err(PipelineError::ProcessingError {
                message: format!(
                    "No training samples left after holding out {} of {} triplets",
                    options.validation_split, total
                ),
            });
        }

        let train_indices: Vec<usize> = (0..split_at).collect();
        let val_indices: Vec<usize> = (split_at..total).collect();
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let device = self.base_model.device().clone();
        let mut history = History::default();

        tracing::info!(
            "Training on {} triplets, validating on {}",
            train_indices.len(),
            val_indices.len()
        );

        for epoch in 1..=options.epochs {
            let mut order = train_indices.clone();
            if options.shuffle {
                order.shuffle(&mut rng);
            }

            let mut weighted_loss = 0.0f64;
            for chunk in order.chunks(options.batch_size) {
                let (a, p, n) = triplets.batch(chunk, &device)?;
                let loss = self.training_model.train_step(&a, &p, &n)?;
                weighted_loss += f64::from(loss) * chunk.len() as f64;
            }
            let epoch_loss = (weighted_loss / order.len() as f64) as f32;
            history.loss.push(epoch_loss);

            if !val_indices.is_empty() {
                let mut weighted_val = 0.0f64;
                for chunk in val_indices.chunks(options.batch_size) {
                    let (a, p, n) = triplets.batch(chunk, &device)?;
                    let loss = self.training_model.evaluate(&a, &p, &n)?;
                    weighted_val += f64::from(loss) * chunk.len() as f64;
                }
                history
                    .val_loss
                    .push((weighted_val / val_indices.len() as f64) as f32);
            }

            if options.verbose {
                match history.val_loss.last() {
                    Some(val) => tracing::info!(
                        "Epoch {}/{} - loss: {:.4} - val_loss: {:.4}",
                        epoch,
                        options.epochs,
                        epoch_loss,
                        val
                    ),
                    None => tracing::info!(
                        "Epoch {}/{} - loss: {:.4}",
                        epoch,
                        options.epochs,
                        epoch_loss
                    ),
                }
            }
            monitor.log_stats(&format!("Epoch {}", epoch));
        }

        Ok(history)
    }

    /// Saves the base model weights.
    pub fn save<P: AsRef<Path>>(&self, save_path: P) -> Result<()> {
        self.base_model.save(&save_path)?;
        tracing::info!("Saved base model to {}", save_path.as_ref().display());
        Ok(())
    }

    pub fn f1_score(y_true: &[bool], y_pred: &[bool]) -> Result<f64> {
        metrics::f1_score(y_true, y_pred)
    }

    pub fn accuracy(y_true: &[bool], y_pred: &[bool]) -> Result<f64> {
        metrics::accuracy(y_true, y_pred)
    }

    /// Picks the distance threshold that best separates same-identity pairs.
    ///
    /// Every unordered image pair is scored by squared embedding distance and
    /// predicted "same person" when the distance is at most `tau`. The first
    /// threshold with the highest F1 wins.
    pub fn best_tau<T: PartialEq>(
        &self,
        images: ArrayView4<'_, f32>,
        identities: &[T],
        thresholds: &[f32],
    ) -> Result<BestTau> {
        let n = images.len_of(Axis(0));
        if identities.len() != n {
            return Err(PipelineError::ShapeMismatch {
                name: "identities".to_string(),
                expected: vec![n],
                actual: vec![identities.len()],
            });
        }
        if n < 2 {
            return Err(PipelineError::ProcessingError {
                message: "At least two images are needed to form a pair".to_string(),
            });
        }
        if thresholds.is_empty() {
            return Err(PipelineError::ProcessingError {
                message: "No thresholds to evaluate".to_string(),
            });
        }

        let embeddings = self.base_model.embed_array(images, 32)?;

        let mut distances = Vec::with_capacity(n * (n - 1) / 2);
        let mut same = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                let diff = &embeddings.row(i) - &embeddings.row(j);
                distances.push(diff.mapv(|d| d * d).sum());
                same.push(identities[i] == identities[j]);
            }
        }

        let mut best: Option<BestTau> = None;
        for &tau in thresholds {
            let predicted: Vec<bool> = distances.iter().map(|&d| d <= tau).collect();
            let f1 = metrics::f1_score(&same, &predicted)?;
            let accuracy = metrics::accuracy(&same, &predicted)?;
            tracing::debug!("tau {:.4}: f1 {:.4}, accuracy {:.4}", tau, f1, accuracy);

            if best.map_or(true, |b| f1 > b.f1) {
                best = Some(BestTau { tau, f1, accuracy });
            }
        }

        best.ok_or_else(|| PipelineError::ProcessingError {
            message: "No thresholds to evaluate".to_string(),
        })
    }
}
