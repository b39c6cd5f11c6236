//! Weather lookup via wttr.in's JSON format (`?format=j1`).
//!
//! The location is fixed by configuration; it is not parsed from the message.

use async_trait::async_trait;
use concierge_core::error::ToolError;
use concierge_core::tool::{ToolInvoker, ToolNote, WEATHER_KEYWORDS, matches_keywords};
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://wttr.in";
pub const DEFAULT_LOCATION: &str = "San Francisco";

pub struct WeatherInvoker {
    client: reqwest::Client,
    base_url: String,
    location: String,
    keywords: Vec<String>,
}

impl WeatherInvoker {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            client: http_client(concat!("concierge/", env!("CARGO_PKG_VERSION"))),
            base_url: DEFAULT_BASE_URL.into(),
            location: location.into(),
            keywords: WEATHER_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Replace the trigger keywords. An empty list disables triggering.
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// `{base}/{location}?format=j1`, with the location as one encoded path segment.
    fn lookup_url(&self) -> Result<reqwest::Url, ToolError> {
        let invalid = |reason: String| ToolError::ExecutionFailed {
            tool_name: "weather".into(),
            reason,
        };

        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| invalid(format!("bad base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| invalid(format!("base URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push(&self.location);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }
}

/// Client with a 10s timeout. Falls back to reqwest's defaults if the build fails.
fn http_client(user_agent: &str) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .user_agent(user_agent)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Weather HTTP client build failed; using defaults");
            reqwest::Client::default()
        })
}

impl Default for WeatherInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATION)
    }
}

#[async_trait]
impl ToolInvoker for WeatherInvoker {
    fn name(&self) -> &str {
        "weather"
    }

    fn is_triggered(&self, message: &str) -> bool {
        matches_keywords(message, &self.keywords)
    }

    async fn invoke(&self, _message: &str) -> Result<ToolNote, ToolError> {
        let url = self.lookup_url()?;
        debug!(url = %url, "Fetching weather");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "weather".into(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ToolError::ExecutionFailed {
                tool_name: "weather".into(),
                reason: format!("HTTP {}", response.status().as_u16()),
            });
        }

        let report: WeatherReport = response
            .json()
            .await
            .map_err(|e| ToolError::InvalidResponse(e.to_string()))?;

        Ok(ToolNote {
            tool: "weather".into(),
            summary: summarize(&self.location, &report)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    current_condition: Vec<CurrentCondition>,
}

#[derive(Debug, Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "FeelsLikeC", default)]
    feels_like_c: Option<String>,
    #[serde(default)]
    humidity: Option<String>,
    #[serde(rename = "windspeedKmph", default)]
    windspeed_kmph: Option<String>,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<Described>,
}

#[derive(Debug, Deserialize)]
struct Described {
    value: String,
}

/// Format the current conditions as one line, e.g.
/// `San Francisco: Partly cloudy, 17°C (feels like 16°C), humidity 72%, wind 19 km/h`.
pub fn summarize(location: &str, report: &WeatherReport) -> Result<String, ToolError> {
    let current = report
        .current_condition
        .first()
        .ok_or_else(|| ToolError::InvalidResponse("no current_condition in report".into()))?;

    let description = current
        .weather_desc
        .first()
        .map(|d| d.value.trim())
        .filter(|d| !d.is_empty())
        .unwrap_or("Unknown conditions");

    let mut line = format!("{location}: {description}, {}°C", current.temp_c);
    if let Some(feels) = &current.feels_like_c {
        line.push_str(&format!(" (feels like {feels}°C)"));
    }
    if let Some(humidity) = &current.humidity {
        line.push_str(&format!(", humidity {humidity}%"));
    }
    if let Some(wind) = &current.windspeed_kmph {
        line.push_str(&format!(", wind {wind} km/h"));
    }
    Ok(line)
}
