use crate::core::{Page, PageSource, Starship};
use crate::utils::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_STARSHIPS_ENDPOINT: &str = "https://swapi-api.hbtn.io/api/starships/";

/// Parses a catalog passenger field into a head count.
///
/// Thousands separators are dropped first. Anything that is not then a plain
/// run of ASCII digits (`"n/a"`, `"unknown"`, `"30-165"`, `""`) yields `None`,
/// as does a count too large for `u64`.
pub fn parse_capacity(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn has_capacity(ship: &Starship, passenger_count: u64) -> bool {
    parse_capacity(&ship.passengers).is_some_and(|capacity| capacity >= passenger_count)
}

/// Renders ships as `name,model,passengers` CSV with a header row.
pub fn starships_to_csv(ships: &[Starship]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["name", "model", "passengers"])?;
    for ship in ships {
        writer.write_record([
            ship.name.as_str(),
            ship.model.as_deref().unwrap_or(""),
            ship.passengers.as_str(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::ProcessingError {
            message: format!("Failed to flush CSV writer: {}", e),
        })?;
    String::from_utf8(bytes).map_err(|e| PipelineError::ProcessingError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}

#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Default for HttpPageSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, url: &str) -> Result<Page<Starship>> {
        tracing::debug!("Making API request to: {}", url);
        let response = self.client.get(url).send().await?;
        tracing::debug!("API response status: {}", response.status());

        let body = response.error_for_status()?.bytes().await?;
        let page = serde_json::from_slice::<Page<Starship>>(&body)?;
        Ok(page)
    }
}

/// Client for the paginated starship listing.
pub struct StarshipCatalog<S: PageSource = HttpPageSource> {
    source: S,
    endpoint: String,
}

impl StarshipCatalog<HttpPageSource> {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_source(HttpPageSource::new(), endpoint)
    }
}

impl<S: PageSource> StarshipCatalog<S> {
    pub fn with_source(source: S, endpoint: impl Into<String>) -> Self {
        Self {
            source,
            endpoint: endpoint.into(),
        }
    }

    /// Walks the `next` cursor from the first page until it is null or empty.
    pub async fn fetch_all(&self) -> Result<Vec<Starship>> {
        let mut ships = Vec::new();
        let mut next = Some(self.endpoint.clone());
        let mut pages = 0usize;

        while let Some(url) = next.filter(|u| !u.is_empty()) {
            let page = self.source.fetch_page(&url).await?;
            pages += 1;
            tracing::debug!("Page {} returned {} ships", pages, page.results.len());
            ships.extend(page.results);
            next = page.next;
        }

        tracing::info!("Fetched {} ships across {} pages", ships.len(), pages);
        Ok(ships)
    }

    pub async fn matching_starships(&self, passenger_count: u64) -> Result<Vec<Starship>> {
        let ships = self.fetch_all().await?;
        Ok(ships
            .into_iter()
            .filter(|ship| has_capacity(ship, passenger_count))
            .collect())
    }

    /// Names of every ship that can carry at least `passenger_count` people.
    pub async fn available_ships(&self, passenger_count: u64) -> Result<Vec<String>> {
        let ships = self.matching_starships(passenger_count).await?;
        Ok(ships.into_iter().map(|ship| ship.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ship(name: &str, passengers: &str) -> Starship {
        Starship {
            name: name.to_string(),
            passengers: passengers.to_string(),
            model: None,
            manufacturer: None,
            url: None,
        }
    }

    struct InMemorySource {
        pages: HashMap<String, Page<Starship>>,
        calls: AtomicUsize,
    }

    impl InMemorySource {
        fn new(pages: Vec<(&str, Vec<Starship>, Option<&str>)>) -> Self {
            let pages = pages
                .into_iter()
                .map(|(url, results, next)| {
                    (
                        url.to_string(),
                        Page {
                            results,
                            next: next.map(str::to_string),
                        },
                    )
                })
                .collect();
            Self {
                pages,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageSource for InMemorySource {
        async fn fetch_page(&self, url: &str) -> Result<Page<Starship>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| PipelineError::ProcessingError {
                    message: format!("no page at {}", url),
                })
        }
    }

    #[test]
    fn test_parse_capacity() {
        assert_eq!(parse_capacity("843,342"), Some(843_342));
        assert_eq!(parse_capacity("38000"), Some(38_000));
        assert_eq!(parse_capacity("0"), Some(0));
        assert_eq!(parse_capacity("n/a"), None);
        assert_eq!(parse_capacity("unknown"), None);
        assert_eq!(parse_capacity("30-165"), None);
        assert_eq!(parse_capacity("1.5"), None);
        assert_eq!(parse_capacity(""), None);
        assert_eq!(parse_capacity(","), None);
        assert_eq!(parse_capacity("99999999999999999999999"), None);
    }

    #[test]
    fn test_has_capacity_boundary() {
        assert!(has_capacity(&ship("X-wing", "4"), 4));
        assert!(!has_capacity(&ship("X-wing", "4"), 5));
        assert!(!has_capacity(&ship("Death Star", "n/a"), 0));
    }

    #[tokio::test]
    async fn test_available_ships_follows_cursor() {
        let source = InMemorySource::new(vec![
            (
                "mem://1",
                vec![ship("CR90 corvette", "600"), ship("TIE Advanced x1", "n/a")],
                Some("mem://2"),
            ),
            (
                "mem://2",
                vec![ship("Executor", "38,000"), ship("Y-wing", "0")],
                Some("mem://3"),
            ),
            ("mem://3", vec![ship("Millennium Falcon", "6")], None),
        ]);
        let catalog = StarshipCatalog::with_source(source, "mem://1");

        let names = catalog.available_ships(6).await.unwrap();

        assert_eq!(names, vec!["CR90 corvette", "Executor", "Millennium Falcon"]);
        assert_eq!(catalog.source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_next_ends_pagination() {
        let source = InMemorySource::new(vec![(
            "mem://1",
            vec![ship("Rebel transport", "90")],
            Some(""),
        )]);
        let catalog = StarshipCatalog::with_source(source, "mem://1");

        let ships = catalog.fetch_all().await.unwrap();

        assert_eq!(ships.len(), 1);
        assert_eq!(catalog.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let source = InMemorySource::new(vec![("mem://1", vec![], Some("mem://missing"))]);
        let catalog = StarshipCatalog::with_source(source, "mem://1");

        let result = catalog.available_ships(1).await;

        assert!(matches!(result, Err(PipelineError::ProcessingError { .. })));
    }

    #[test]
    fn test_starships_to_csv() {
        let mut falcon = ship("Millennium Falcon", "6");
        falcon.model = Some("YT-1300 light freighter".to_string());
        let csv = starships_to_csv(&[falcon, ship("Executor", "38,000")]).unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "name,model,passengers");
        assert_eq!(lines[1], "Millennium Falcon,YT-1300 light freighter,6");
        assert_eq!(lines[2], "Executor,,\"38,000\"");
    }
}
