pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::starships::DEFAULT_STARSHIPS_ENDPOINT;
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "pipeline-kit")]
#[command(about = "Starship listing, image rotation and face verification training")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log process CPU and memory usage")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List starships that can carry at least the given number of passengers
    Ships(ShipsConfig),
    /// Rotate an image by quarter turns counter-clockwise
    Rotate(RotateConfig),
    /// Write a freshly initialised base embedding model
    InitModel(InitModelConfig),
    /// Train the base model with triplet loss
    Train(TrainArgs),
    /// Pick the verification distance threshold for a trained model
    Evaluate(TrainArgs),
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct ShipsConfig {
    #[arg(long, default_value = DEFAULT_STARSHIPS_ENDPOINT)]
    pub api_endpoint: String,

    #[arg(short, long, default_value = "4", help = "Minimum passenger capacity")]
    pub passengers: u64,

    #[arg(long, help = "Directory to write available_ships.csv into")]
    pub output_path: Option<String>,

    #[arg(long, default_value = "30")]
    pub timeout_seconds: u64,
}

#[cfg(feature = "cli")]
impl ConfigProvider for ShipsConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn output_path(&self) -> &str {
        self.output_path.as_deref().unwrap_or(".")
    }

    fn passenger_count(&self) -> u64 {
        self.passengers
    }
}

#[cfg(feature = "cli")]
impl Validate for ShipsConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api_endpoint", &self.api_endpoint)?;
        validation::validate_positive_number("timeout_seconds", self.timeout_seconds as usize, 1)?;
        if let Some(path) = &self.output_path {
            validation::validate_path("output_path", path)?;
        }
        Ok(())
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct RotateConfig {
    #[arg(short, long)]
    pub input: String,

    #[arg(short, long)]
    pub output: String,

    #[arg(
        short = 'k',
        long,
        default_value = "1",
        allow_negative_numbers = true,
        help = "Quarter turns counter-clockwise; negative turns clockwise"
    )]
    pub turns: i32,
}

#[cfg(feature = "cli")]
impl Validate for RotateConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input)?;
        validation::validate_path("output", &self.output)?;
        validation::validate_file_extensions(
            "output",
            std::slice::from_ref(&self.output),
            &["png", "jpg", "jpeg"],
        )
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct InitModelConfig {
    #[arg(short, long)]
    pub output: String,

    #[arg(long, default_value = "96")]
    pub image_size: usize,

    #[arg(long, default_value = "128")]
    pub embedding_dim: usize,
}

#[cfg(feature = "cli")]
impl Validate for InitModelConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("output", &self.output)?;
        validation::validate_file_extensions(
            "output",
            std::slice::from_ref(&self.output),
            &["safetensors"],
        )?;
        validation::validate_positive_number("image_size", self.image_size, 8)?;
        validation::validate_positive_number("embedding_dim", self.embedding_dim, 1)
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct TrainArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "train-config.toml")]
    pub config: String,
}
