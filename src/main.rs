use clap::Parser;
use pipeline_kit::config::{InitModelConfig, RotateConfig, TrainArgs};
use pipeline_kit::core::augment;
use pipeline_kit::core::face_verification::{
    load_labelled_images, EmbeddingConfig, EmbeddingModel,
};
use pipeline_kit::core::starships::HttpPageSource;
use pipeline_kit::utils::error::ErrorSeverity;
use pipeline_kit::utils::monitor::SystemMonitor;
use pipeline_kit::utils::{logger, validation::Validate};
use pipeline_kit::{
    CliConfig, Command, EtlEngine, LocalStorage, PipelineError, ShipsConfig, StarshipCatalog,
    StarshipPipeline, TrainConfig, TrainModel, Triplets,
};
use std::path::Path;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting pipeline-kit");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let result = match config.command {
        Command::Ships(ships) => run_ships(ships, monitor_enabled).await,
        Command::Rotate(rotate) => run_rotate(&rotate),
        Command::InitModel(init) => run_init_model(&init),
        Command::Train(args) => run_train(&args, monitor_enabled),
        Command::Evaluate(args) => run_evaluate(&args),
    };

    if let Err(e) = result {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run_ships(config: ShipsConfig, monitor_enabled: bool) -> Result<(), PipelineError> {
    config.validate()?;
    let source = HttpPageSource::with_timeout(Duration::from_secs(config.timeout_seconds))?;

    match config.output_path.clone() {
        Some(output_path) => {
            let storage = LocalStorage::new(output_path);
            let pipeline = StarshipPipeline::with_source(storage, config, source);
            let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

            let written = engine.run().await?;
            println!("📁 Output saved to: {}", written);
        }
        None => {
            let catalog = StarshipCatalog::with_source(source, config.api_endpoint.clone());
            for name in catalog.available_ships(config.passengers).await? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn run_rotate(config: &RotateConfig) -> Result<(), PipelineError> {
    config.validate()?;
    let (width, height) = augment::rotate_file(
        Path::new(&config.input),
        Path::new(&config.output),
        config.turns,
    )?;
    tracing::info!("✅ Wrote {}x{} image to {}", width, height, config.output);
    Ok(())
}

fn run_init_model(config: &InitModelConfig) -> Result<(), PipelineError> {
    config.validate()?;
    let embedding = EmbeddingConfig {
        image_size: config.image_size,
        embedding_dim: config.embedding_dim,
        ..EmbeddingConfig::default()
    };
    EmbeddingModel::init(&config.output, embedding)?;
    tracing::info!("✅ Initialised base model at {}", config.output);
    Ok(())
}

fn load_train_config(args: &TrainArgs) -> Result<TrainConfig, PipelineError> {
    tracing::info!("📁 Loading configuration from: {}", args.config);
    let config = TrainConfig::from_file(&args.config)?;
    config.validate()?;
    Ok(config)
}

fn run_train(args: &TrainArgs, monitor_enabled: bool) -> Result<(), PipelineError> {
    let config = load_train_config(args)?;
    let data = config.data()?;

    let triplets = Triplets::from_npy(&data.anchors, &data.positives, &data.negatives)?;
    tracing::info!(
        "Loaded {} triplets of shape {:?}",
        triplets.len(),
        triplets.sample_shape()
    );

    let mut model = TrainModel::with_config(
        &config.model.path,
        config.model.alpha,
        config.embedding_config(),
        &candle_core::Device::Cpu,
    )?;

    let monitor = SystemMonitor::new(monitor_enabled);
    let history = model.train_monitored(&triplets, &config.train_options(), &monitor)?;
    monitor.log_final_stats();

    if let Some(loss) = history.loss.last() {
        println!("✅ Final loss: {:.4}", loss);
    }
    model.save(config.save_path())?;
    println!("📁 Model saved to: {}", config.save_path());
    Ok(())
}

fn run_evaluate(args: &TrainArgs) -> Result<(), PipelineError> {
    let config = load_train_config(args)?;
    let evaluation = config.evaluation()?;

    let (images, identities) = load_labelled_images(&evaluation.images, &evaluation.identities)?;
    let model = TrainModel::with_config(
        config.save_path(),
        config.model.alpha,
        config.embedding_config(),
        &candle_core::Device::Cpu,
    )?;

    let best = model.best_tau(images.view(), &identities, &evaluation.thresholds)?;
    println!(
        "tau: {:.4}, f1: {:.4}, accuracy: {:.4}",
        best.tau, best.f1, best.accuracy
    );
    Ok(())
}
