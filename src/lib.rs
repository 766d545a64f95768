pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
pub use config::toml_config::TrainConfig;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command, ShipsConfig};

pub use crate::core::augment::{rot90, rotate_image};
pub use crate::core::face_verification::{EmbeddingModel, TrainModel, TrainOptions, Triplets};
pub use crate::core::starships::StarshipCatalog;
pub use crate::core::{etl::EtlEngine, pipeline::StarshipPipeline};
pub use utils::error::{PipelineError, Result};
