use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting starship listing...");
        self.monitor.log_stats("Start");

        // Extract
        tracing::info!("Fetching catalog pages...");
        let ships = self.pipeline.extract().await?;
        tracing::info!("Extracted {} ships", ships.len());
        self.monitor.log_stats("Extract");

        // Transform
        let transformed = self.pipeline.transform(ships).await?;
        tracing::info!("{} ships meet the passenger requirement", transformed.matching.len());
        self.monitor.log_stats("Transform");

        // Load
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
