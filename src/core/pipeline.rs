use crate::core::starships::{has_capacity, starships_to_csv, HttpPageSource, StarshipCatalog};
use crate::core::{ConfigProvider, PageSource, Pipeline, Starship, Storage, TransformResult};
use crate::utils::error::Result;

pub const OUTPUT_FILENAME: &str = "available_ships.csv";

/// Lists ships through the catalog and writes the ones with enough seats as CSV.
pub struct StarshipPipeline<S: Storage, C: ConfigProvider, P: PageSource = HttpPageSource> {
    storage: S,
    config: C,
    catalog: StarshipCatalog<P>,
}

impl<S: Storage, C: ConfigProvider> StarshipPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let catalog = StarshipCatalog::new(config.api_endpoint());
        Self {
            storage,
            config,
            catalog,
        }
    }
}

impl<S: Storage, C: ConfigProvider, P: PageSource> StarshipPipeline<S, C, P> {
    pub fn with_source(storage: S, config: C, source: P) -> Self {
        let catalog = StarshipCatalog::with_source(source, config.api_endpoint());
        Self {
            storage,
            config,
            catalog,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, P: PageSource> Pipeline for StarshipPipeline<S, C, P> {
    async fn extract(&self) -> Result<Vec<Starship>> {
        self.catalog.fetch_all().await
    }

    async fn transform(&self, data: Vec<Starship>) -> Result<TransformResult> {
        let passenger_count = self.config.passenger_count();
        let total = data.len();

        let matching: Vec<Starship> = data
            .into_iter()
            .filter(|ship| has_capacity(ship, passenger_count))
            .collect();

        tracing::debug!(
            "Kept {}/{} ships with capacity >= {}",
            matching.len(),
            total,
            passenger_count
        );

        let csv_output = starships_to_csv(&matching)?;
        Ok(TransformResult {
            matching,
            csv_output,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let output_path = format!("{}/{}", self.config.output_path(), OUTPUT_FILENAME);

        tracing::debug!(
            "Writing CSV ({} bytes) to storage",
            result.csv_output.len()
        );
        self.storage
            .write_file(OUTPUT_FILENAME, result.csv_output.as_bytes())
            .await?;

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::PipelineError;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                PipelineError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        api_endpoint: String,
        output_path: String,
        passenger_count: u64,
    }

    impl MockConfig {
        fn new(api_endpoint: String, passenger_count: u64) -> Self {
            Self {
                api_endpoint,
                output_path: "test_output".to_string(),
                passenger_count,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn api_endpoint(&self) -> &str {
            &self.api_endpoint
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn passenger_count(&self) -> u64 {
            self.passenger_count
        }
    }

    #[tokio::test]
    async fn test_extract_single_page() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/api/starships/");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "count": 2,
                    "next": null,
                    "results": [
                        {"name": "CR90 corvette", "model": "CR90 corvette", "passengers": "600"},
                        {"name": "Death Star", "model": "DS-1 Orbital Battle Station", "passengers": "843,342"}
                    ]
                }));
        });

        let pipeline = StarshipPipeline::new(
            MockStorage::new(),
            MockConfig::new(server.url("/api/starships/"), 1),
        );

        let ships = pipeline.extract().await.unwrap();

        api_mock.assert();
        assert_eq!(ships.len(), 2);
        assert_eq!(ships[1].passengers, "843,342");
        assert_eq!(ships[0].model.as_deref(), Some("CR90 corvette"));
    }

    #[tokio::test]
    async fn test_extract_server_error_is_reported() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/api/starships/");
            then.status(503);
        });

        let pipeline = StarshipPipeline::new(
            MockStorage::new(),
            MockConfig::new(server.url("/api/starships/"), 1),
        );

        let result = pipeline.extract().await;

        api_mock.assert();
        assert!(matches!(result, Err(PipelineError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_extract_malformed_body_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/starships/");
            then.status(200)
                .header("Content-Type", "application/json")
                .body("{\"results\": \"not a list\"}");
        });

        let pipeline = StarshipPipeline::new(
            MockStorage::new(),
            MockConfig::new(server.url("/api/starships/"), 1),
        );

        assert!(pipeline.extract().await.is_err());
    }

    #[tokio::test]
    async fn test_transform_filters_and_renders_csv() {
        let pipeline = StarshipPipeline::new(
            MockStorage::new(),
            MockConfig::new("http://unused.invalid/".to_string(), 100),
        );

        let ships = vec![
            Starship {
                name: "Executor".to_string(),
                passengers: "38,000".to_string(),
                model: Some("Executor-class star dreadnought".to_string()),
                manufacturer: None,
                url: None,
            },
            Starship {
                name: "X-wing".to_string(),
                passengers: "0".to_string(),
                model: Some("T-65 X-wing".to_string()),
                manufacturer: None,
                url: None,
            },
            Starship {
                name: "Droid control ship".to_string(),
                passengers: "unknown".to_string(),
                model: None,
                manufacturer: None,
                url: None,
            },
        ];

        let result = pipeline.transform(ships).await.unwrap();

        assert_eq!(result.matching.len(), 1);
        assert_eq!(result.matching[0].name, "Executor");
        assert!(result
            .csv_output
            .contains("Executor,Executor-class star dreadnought,\"38,000\""));
        assert!(!result.csv_output.contains("X-wing"));
    }

    #[tokio::test]
    async fn test_load_writes_csv_to_storage() {
        let storage = MockStorage::new();
        let pipeline = StarshipPipeline::new(
            storage.clone(),
            MockConfig::new("http://unused.invalid/".to_string(), 1),
        );

        let output = pipeline
            .load(TransformResult {
                matching: vec![],
                csv_output: "name,model,passengers\n".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(output, "test_output/available_ships.csv");
        let written = storage.get_file(OUTPUT_FILENAME).await.unwrap();
        assert_eq!(written, b"name,model,passengers\n");
    }
}
