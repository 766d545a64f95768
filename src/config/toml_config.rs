use crate::core::face_verification::{EmbeddingConfig, TrainOptions};
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Training and evaluation settings for the face verification model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    pub data: Option<DataConfig>,
    pub evaluation: Option<EvaluationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    pub alpha: f32,
    pub image_size: Option<usize>,
    pub embedding_dim: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    pub verbose: bool,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub save_path: Option<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let options = TrainOptions::default();
        Self {
            epochs: options.epochs,
            batch_size: options.batch_size,
            validation_split: options.validation_split,
            verbose: options.verbose,
            shuffle: options.shuffle,
            seed: options.seed,
            save_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub anchors: String,
    pub positives: String,
    pub negatives: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub images: String,
    pub identities: String,
    pub thresholds: Vec<f32>,
}

impl TrainConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PipelineError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PipelineError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PipelineError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn embedding_config(&self) -> EmbeddingConfig {
        let defaults = EmbeddingConfig::default();
        EmbeddingConfig {
            image_size: self.model.image_size.unwrap_or(defaults.image_size),
            embedding_dim: self.model.embedding_dim.unwrap_or(defaults.embedding_dim),
            ..defaults
        }
    }

    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            epochs: self.training.epochs,
            batch_size: self.training.batch_size,
            validation_split: self.training.validation_split,
            verbose: self.training.verbose,
            shuffle: self.training.shuffle,
            seed: self.training.seed,
        }
    }

    /// Where trained weights go; defaults to overwriting the base model.
    pub fn save_path(&self) -> &str {
        self.training
            .save_path
            .as_deref()
            .unwrap_or(&self.model.path)
    }

    pub fn data(&self) -> Result<&DataConfig> {
        validation::validate_required_field("data", &self.data)
    }

    pub fn evaluation(&self) -> Result<&EvaluationConfig> {
        validation::validate_required_field("evaluation", &self.evaluation)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("model.path", &self.model.path)?;
        validation::validate_range("model.alpha", self.model.alpha, 0.0, f32::MAX)?;
        validation::validate_positive_number("training.epochs", self.training.epochs, 1)?;
        validation::validate_positive_number("training.batch_size", self.training.batch_size, 1)?;
        validation::validate_range(
            "training.validation_split",
            self.training.validation_split,
            0.0,
            0.99,
        )?;

        if let Some(data) = &self.data {
            let files = vec![
                data.anchors.clone(),
                data.positives.clone(),
                data.negatives.clone(),
            ];
            validation::validate_file_extensions("data", &files, &["npy"])?;
        }

        if let Some(evaluation) = &self.evaluation {
            let files = vec![evaluation.images.clone(), evaluation.identities.clone()];
            validation::validate_file_extensions("evaluation", &files, &["npy"])?;
            if evaluation.thresholds.is_empty() {
                return Err(PipelineError::InvalidConfigValueError {
                    field: "evaluation.thresholds".to_string(),
                    value: "[]".to_string(),
                    reason: "At least one threshold is required".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for TrainConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
