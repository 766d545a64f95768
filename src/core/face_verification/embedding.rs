use crate::utils::error::{PipelineError, Result};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, VarBuilder, VarMap};
use ndarray::{Array2, ArrayView4, Axis};
use std::path::Path;

pub const IMAGE_SIZE: usize = 96;
pub const CHANNELS: usize = 3;
pub const DEFAULT_EMBEDDING_DIM: usize = 128;

/// Three conv/pool stages halve the image three times.
const DOWNSAMPLE: usize = 8;
const FEATURE_CHANNELS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingConfig {
    pub image_size: usize,
    pub channels: usize,
    pub embedding_dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            image_size: IMAGE_SIZE,
            channels: CHANNELS,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl EmbeddingConfig {
    /// Per-sample input shape, channels last.
    pub fn input_shape(&self) -> [usize; 3] {
        [self.image_size, self.image_size, self.channels]
    }

    fn check(&self) -> Result<()> {
        if self.image_size == 0 || self.image_size % DOWNSAMPLE != 0 {
            return Err(PipelineError::InvalidConfigValueError {
                field: "model.image_size".to_string(),
                value: self.image_size.to_string(),
                reason: format!("Image size must be a positive multiple of {}", DOWNSAMPLE),
            });
        }
        if self.channels == 0 || self.embedding_dim == 0 {
            return Err(PipelineError::ConfigError {
                message: "channels and embedding_dim must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct EmbeddingNet {
    conv1: Conv2d,
    conv2: Conv2d,
    conv3: Conv2d,
    fc: Linear,
}

impl EmbeddingNet {
    fn new(config: &EmbeddingConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        let same = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        let conv1 = conv2d(config.channels, 16, 3, same, vb.pp("conv1"))?;
        let conv2 = conv2d(16, 32, 3, same, vb.pp("conv2"))?;
        let conv3 = conv2d(32, FEATURE_CHANNELS, 3, same, vb.pp("conv3"))?;

        let side = config.image_size / DOWNSAMPLE;
        let fc = linear(
            FEATURE_CHANNELS * side * side,
            config.embedding_dim,
            vb.pp("fc"),
        )?;

        Ok(Self {
            conv1,
            conv2,
            conv3,
            fc,
        })
    }
}

impl Module for EmbeddingNet {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        // NHWC -> NCHW
        let xs = xs.permute((0, 3, 1, 2))?.contiguous()?;
        let xs = self.conv1.forward(&xs)?.relu()?.max_pool2d(2)?;
        let xs = self.conv2.forward(&xs)?.relu()?.max_pool2d(2)?;
        let xs = self.conv3.forward(&xs)?.relu()?.max_pool2d(2)?;
        let xs = self.fc.forward(&xs.flatten_from(1)?)?;
        l2_normalize(&xs)
    }
}

fn l2_normalize(xs: &Tensor) -> candle_core::Result<Tensor> {
    let norm = xs.sqr()?.sum_keepdim(1)?.sqrt()?.affine(1.0, 1e-10)?;
    xs.broadcast_div(&norm)
}

/// Base face embedding model: `(N, H, W, C)` images to unit-length `(N, D)` embeddings.
///
/// Clones share weights, so a clone handed to the triplet network trains the
/// same variables that [`EmbeddingModel::save`] writes.
#[derive(Clone)]
pub struct EmbeddingModel {
    varmap: VarMap,
    net: EmbeddingNet,
    config: EmbeddingConfig,
    device: Device,
}

impl EmbeddingModel {
    /// Freshly initialised weights.
    pub fn new(config: EmbeddingConfig, device: &Device) -> Result<Self> {
        config.check()?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let net = EmbeddingNet::new(&config, vb)?;
        Ok(Self {
            varmap,
            net,
            config,
            device: device.clone(),
        })
    }

    /// Loads weights from a safetensors file written by [`EmbeddingModel::save`].
    pub fn load<P: AsRef<Path>>(path: P, config: EmbeddingConfig, device: &Device) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Model file not found: {}", path.display()),
            )));
        }

        let mut model = Self::new(config, device)?;
        model.varmap.load(path)?;
        tracing::debug!("Loaded base model weights from {}", path.display());
        Ok(model)
    }

    /// Writes a randomly initialised model, for bootstrapping a training run.
    pub fn init<P: AsRef<Path>>(path: P, config: EmbeddingConfig) -> Result<Self> {
        let model = Self::new(config, &Device::Cpu)?;
        model.save(path)?;
        Ok(model)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.varmap.save(path)?;
        Ok(())
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub(crate) fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Checks that `images` is a batch of this model's input shape.
    pub fn check_input(&self, name: &str, images: &Tensor) -> Result<()> {
        let dims = images.dims();
        let expected = self.config.input_shape();
        if dims.len() != 4 || dims[1..] != expected {
            let batch = dims.first().copied().unwrap_or(0);
            return Err(PipelineError::ShapeMismatch {
                name: name.to_string(),
                expected: vec![batch, expected[0], expected[1], expected[2]],
                actual: dims.to_vec(),
            });
        }
        Ok(())
    }

    pub fn embed(&self, images: &Tensor) -> Result<Tensor> {
        self.check_input("images", images)?;
        Ok(self.net.forward(images)?)
    }

    /// Embeds an image array in batches and returns the embeddings as `(N, D)`.
    pub fn embed_array(
        &self,
        images: ArrayView4<'_, f32>,
        batch_size: usize,
    ) -> Result<Array2<f32>> {
        let n = images.len_of(Axis(0));
        let dim = self.config.embedding_dim;
        let mut out = Vec::with_capacity(n * dim);

        for start in (0..n).step_by(batch_size.max(1)) {
            let end = (start + batch_size.max(1)).min(n);
            let batch =
                array_to_tensor(images.slice_axis(Axis(0), (start..end).into()), &self.device)?;
            let embeddings = self.embed(&batch)?;
            out.extend(embeddings.flatten_all()?.to_vec1::<f32>()?);
        }

        Ok(Array2::from_shape_vec((n, dim), out)?)
    }
}

pub(crate) fn array_to_tensor(images: ArrayView4<'_, f32>, device: &Device) -> Result<Tensor> {
    let shape = images.dim();
    let data: Vec<f32> = images.iter().copied().collect();
    Ok(Tensor::from_vec(data, shape, device)?)
}
