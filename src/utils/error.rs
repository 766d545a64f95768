use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Tensor error: {0}")]
    TensorError(#[from] candle_core::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Array shape error: {0}")]
    ArrayShapeError(#[from] ndarray::ShapeError),

    #[error("NPY read error: {0}")]
    NpyError(#[from] ndarray_npy::ReadNpyError),

    #[error("Shape mismatch for {name}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Model,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::ApiError(_) => ErrorCategory::Network,
            PipelineError::CsvError(_)
            | PipelineError::SerializationError(_)
            | PipelineError::ImageError(_)
            | PipelineError::ArrayShapeError(_)
            | PipelineError::NpyError(_)
            | PipelineError::ProcessingError { .. } => ErrorCategory::Data,
            PipelineError::TensorError(_) | PipelineError::ShapeMismatch { .. } => {
                ErrorCategory::Model
            }
            PipelineError::ConfigError { .. }
            | PipelineError::MissingConfigError { .. }
            | PipelineError::InvalidConfigValueError { .. }
            | PipelineError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            PipelineError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤通常可以重試
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Model | ErrorCategory::Configuration => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PipelineError::ApiError(e) if e.is_timeout() => {
                "The starship catalog did not respond in time".to_string()
            }
            PipelineError::ApiError(e) if e.is_status() => format!(
                "The starship catalog returned an error status ({})",
                e.status().map(|s| s.to_string()).unwrap_or_default()
            ),
            PipelineError::ApiError(_) => "Could not reach the starship catalog".to_string(),
            PipelineError::ShapeMismatch { name, .. } => {
                format!("Input '{}' does not have the shape the model expects", name)
            }
            PipelineError::MissingConfigError { field } => {
                format!("Required setting '{}' is missing", field)
            }
            PipelineError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check the endpoint URL and your network connection, then retry"
            }
            ErrorCategory::Data => "Check that the input files exist and have the expected format",
            ErrorCategory::Model => {
                "Check that the model weights and input arrays match the expected shapes"
            }
            ErrorCategory::Configuration => "Fix the configuration file or command-line arguments",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}
