//! Best-effort robots.txt support
//!
//! Matching is delegated to `robotstxt`, so the most specific group addressed to
//! our product token wins over `*`, and `*`/`$` patterns are honored. A missing or
//! unreadable robots.txt allows everything.

use robotstxt::DefaultMatcher;
use tracing::{debug, warn};

/// A robots.txt body and the user agent it is checked for
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    body: String,
    agent: String,
}

/// Product token of a user agent string, e.g. `sitekb-crawler` for `sitekb-crawler/0.1.0`
fn product_token(user_agent: &str) -> &str {
    let user_agent = user_agent.trim();
    let end = user_agent
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(user_agent.len());
    &user_agent[..end]
}

impl RobotsRules {
    /// Keep `body` for checks on behalf of `user_agent`
    pub fn parse(body: &str, user_agent: &str) -> Self {
        Self {
            body: body.to_string(),
            agent: product_token(user_agent).to_string(),
        }
    }

    /// Fetch `{origin}/robots.txt`
    pub async fn fetch(client: &reqwest::Client, origin: &str, user_agent: &str) -> Self {
        let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));
        let response = match client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("No robots.txt at {} ({})", robots_url, response.status());
                return Self::default();
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", robots_url, e);
                return Self::default();
            }
        };

        match response.text().await {
            Ok(body) => Self::parse(&body, user_agent),
            Err(e) => {
                warn!("Failed to read {}: {}", robots_url, e);
                Self::default()
            }
        }
    }

    /// Whether `path` (with optional query) may be crawled
    pub fn allows(&self, path: &str) -> bool {
        if self.body.trim().is_empty() {
            return true;
        }
        let agent = if self.agent.is_empty() { "*" } else { &self.agent };

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.body, agent, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOTS: &str = "\
# comment
User-agent: badbot
Disallow: /

User-agent: *
Disallow: /private
Allow: /private/press
Disallow:
";

    #[test]
    fn test_wildcard_group() {
        let rules = RobotsRules::parse(ROBOTS, "sitekb-crawler/0.1");

        assert!(rules.allows("/"));
        assert!(rules.allows("/about"));
        assert!(!rules.allows("/private/data"));
        assert!(rules.allows("/private/press/release"));
    }

    #[test]
    fn test_named_group() {
        let rules = RobotsRules::parse(ROBOTS, "BadBot/2.0");
        assert!(!rules.allows("/anything"));
    }

    #[test]
    fn test_specific_group_replaces_wildcard() {
        let robots = "User-agent: sitekb-crawler\nDisallow: /private\n\nUser-agent: *\nDisallow: /\n";
        let rules = RobotsRules::parse(robots, "sitekb-crawler/0.1.0");

        assert!(rules.allows("/about"));
        assert!(!rules.allows("/private/notes"));

        let others = RobotsRules::parse(robots, "otherbot/1.0");
        assert!(!others.allows("/about"));
    }

    #[test]
    fn test_wildcard_and_anchor_patterns() {
        let robots = "User-agent: *\nDisallow: /*.pdf$\nDisallow: /*?session=\n";
        let rules = RobotsRules::parse(robots, "sitekb");

        assert!(!rules.allows("/files/menu.pdf"));
        assert!(rules.allows("/files/menu.pdf.html"));
        assert!(!rules.allows("/shop?session=42"));
        assert!(rules.allows("/shop"));
    }

    #[test]
    fn test_product_token() {
        assert_eq!(product_token("sitekb-crawler/0.1.0"), "sitekb-crawler");
        assert_eq!(product_token("Mozilla/5.0 (X11)"), "Mozilla");
    }

    #[test]
    fn test_empty_allows_everything() {
        let rules = RobotsRules::parse("", "sitekb");
        assert!(rules.allows("/admin"));
    }
}
