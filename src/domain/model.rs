use serde::{Deserialize, Serialize};

/// A starship entry as returned by the catalog API.
///
/// `passengers` is kept verbatim: the catalog uses values such as `"843,342"`,
/// `"n/a"` and `"unknown"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Starship {
    pub name: String,
    pub passengers: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One page of a paginated listing. `next` is `null` on the last page.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub matching: Vec<Starship>,
    pub csv_output: String,
}
