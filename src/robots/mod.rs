//! Robots.txt preflight for the calculator page
//!
//! Before the browser is launched the crawler fetches the target origin's
//! robots.txt with its own user agent. A disallowed calculator path aborts the
//! run; a `Crawl-delay` longer than the configured request delay stretches it.

use crate::config::{Config, UserAgentConfig};
use crate::{CrawlError, Result};
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::time::Duration;
use url::Url;

/// Robots.txt rules of the target origin
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    /// Raw robots.txt body; `None` allows everything
    content: Option<String>,
}

impl RobotsPolicy {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    /// Policy used when robots.txt is absent or unreachable
    pub fn allow_all() -> Self {
        Self { content: None }
    }

    /// Checks whether `url` may be fetched by the agent `product_token`
    pub fn is_allowed(&self, url: &str, product_token: &str) -> bool {
        match self.content.as_deref() {
            None | Some("") => true,
            Some(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, product_token, url)
            }
        }
    }

    /// Returns the `Crawl-delay` that applies to `product_token`
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, product_token: &str) -> Option<Duration> {
        let content = self.content.as_deref()?;
        let agent = product_token.to_lowercase();

        let mut group: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // A user-agent line after rules starts a new group
                    if in_rules {
                        group.clear();
                        in_rules = false;
                    }
                    // Only the product token counts, not a trailing version
                    let token = value
                        .split(|c: char| c == '/' || c.is_whitespace())
                        .next()
                        .unwrap_or("");
                    if !token.is_empty() {
                        group.push(token.to_lowercase());
                    }
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(seconds) = value.parse::<f64>() else {
                        continue;
                    };
                    let Ok(delay) = Duration::try_from_secs_f64(seconds) else {
                        continue;
                    };
                    if group.iter().any(|ua| *ua == agent) {
                        specific = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard = Some(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        specific.or(wildcard)
    }
}

/// Builds the HTTP client used for the preflight
///
/// Identifies itself with the same user agent as the browser.
pub fn build_http_client(config: &UserAgentConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches robots.txt for the origin of `target`
///
/// Any non-success status or transport failure yields [`RobotsPolicy::allow_all`].
pub async fn fetch_robots(client: &Client, target: &Url) -> Result<RobotsPolicy> {
    let robots_url = target.join("/robots.txt")?;

    let response = match client.get(robots_url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Could not fetch {}: {}. Assuming allow-all", robots_url, e);
            return Ok(RobotsPolicy::allow_all());
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "{} answered HTTP {}, assuming allow-all",
            robots_url,
            response.status()
        );
        return Ok(RobotsPolicy::allow_all());
    }

    match response.text().await {
        Ok(body) => Ok(RobotsPolicy::from_content(&body)),
        Err(e) => {
            tracing::warn!("Could not read {}: {}. Assuming allow-all", robots_url, e);
            Ok(RobotsPolicy::allow_all())
        }
    }
}

/// Checks the configured target against its robots.txt
///
/// # Returns
///
/// * `Ok(delay)` - The crawl may proceed, with the robots.txt `Crawl-delay` if any
/// * `Err(CrawlError::RobotsDenied)` - The calculator page is disallowed
pub async fn preflight(config: &Config) -> Result<Option<Duration>> {
    let target = Url::parse(&config.crawler.base_url)?;
    let client = build_http_client(&config.user_agent)?;
    let policy = fetch_robots(&client, &target).await?;
    let agent = &config.user_agent.crawler_name;

    if !policy.is_allowed(target.as_str(), agent) {
        return Err(CrawlError::RobotsDenied {
            url: target.to_string(),
        });
    }

    let delay = policy.crawl_delay(agent);
    if let Some(delay) = delay {
        tracing::info!("robots.txt requests a crawl delay of {:?}", delay);
    }
    Ok(delay)
}
