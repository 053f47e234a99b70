//! Crawl-permission (robots.txt) loading and evaluation.
//!
//! A policy is fetched once per scraper from `<base>/robots.txt`. A missing or
//! unreadable document degrades to allow-all with a warning rather than
//! blocking the scraper.

use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

/// Path of the crawl-permission document relative to a site's base URL.
pub const ROBOTS_PATH: &str = "robots.txt";

/// One `Allow`/`Disallow` line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    allow: bool,
    pattern: String,
}

/// Rules shared by a run of consecutive `User-agent` lines.
#[derive(Debug, Clone, Default)]
struct Group {
    /// Lowercased user-agent tokens this group applies to (`*` for the default group)
    agents: Vec<String>,
    rules: Vec<Rule>,
    crawl_delay: Option<Duration>,
}

/// Parsed crawl-permission rules for one site.
///
/// Read-only once built. [`AccessPolicy::allow_all`] is the fallback when the
/// document cannot be loaded.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    groups: Vec<Group>,
}

impl AccessPolicy {
    /// A policy that permits every path for every agent.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parse a robots.txt document.
    ///
    /// Unknown directives and malformed lines are ignored.
    pub fn parse(content: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut current = Group::default();
        // Whether the current group has seen a rule yet; a `User-agent` line
        // after rules starts a new group.
        let mut in_rules = false;

        for raw in content.lines() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_ascii_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if in_rules {
                        groups.push(std::mem::take(&mut current));
                        in_rules = false;
                    }
                    current.agents.push(value.to_ascii_lowercase());
                }
                "allow" | "disallow" => {
                    if current.agents.is_empty() {
                        // Rules before any User-agent line belong to no group
                        continue;
                    }
                    in_rules = true;
                    // An empty Disallow means "allow everything" and matches nothing
                    if value.is_empty() {
                        continue;
                    }
                    current.rules.push(Rule {
                        allow: directive == "allow",
                        pattern: value.to_string(),
                    });
                }
                "crawl-delay" => {
                    if current.agents.is_empty() {
                        continue;
                    }
                    in_rules = true;
                    match value.parse::<f64>().map(Duration::try_from_secs_f64) {
                        Ok(Ok(delay)) => current.crawl_delay = Some(delay),
                        _ => debug!(value, "Ignoring malformed Crawl-delay"),
                    }
                }
                _ => {}
            }
        }

        if !current.agents.is_empty() {
            groups.push(current);
        }

        Self { groups }
    }

    /// Fetch and parse `<base_url>/robots.txt`.
    ///
    /// Any failure (network error, non-success status, undecodable body) is logged
    /// and yields [`AccessPolicy::allow_all`].
    pub async fn load(client: &reqwest::Client, base_url: &Url) -> Self {
        let robots_url = match base_url.join(ROBOTS_PATH) {
            Ok(url) => url,
            Err(e) => {
                warn!(base_url = %base_url, error = %e, "Cannot build robots.txt URL; proceeding without crawl rules");
                return Self::allow_all();
            }
        };

        let result = async {
            let response = client.get(robots_url.clone()).send().await?;
            let response = response.error_for_status()?;
            response.text().await
        }
        .await;

        match result {
            Ok(body) => {
                let policy = Self::parse(&body);
                info!(url = %robots_url, groups = policy.groups.len(), "Loaded robots.txt");
                policy
            }
            Err(e) => {
                warn!(
                    url = %robots_url,
                    error = %e,
                    "Failed to load robots.txt; proceeding without crawl rules enforced"
                );
                Self::allow_all()
            }
        }
    }

    /// Find the group governing `user_agent`.
    ///
    /// Matching uses the agent's product token (text before the first `/`); a
    /// group token matches when it is a case-insensitive substring of it. The
    /// `*` group is the fallback.
    fn group_for(&self, user_agent: &str) -> Option<&Group> {
        let product = user_agent
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        self.groups
            .iter()
            .find(|g| {
                g.agents
                    .iter()
                    .any(|a| a != "*" && !a.is_empty() && product.contains(a.as_str()))
            })
            .or_else(|| self.groups.iter().find(|g| g.agents.iter().any(|a| a == "*")))
    }

    /// Whether `user_agent` may fetch `path`.
    ///
    /// The longest matching pattern decides; `Allow` wins a tie. Never fails.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        let path = if path.is_empty() { "/" } else { path };
        if path == "/robots.txt" {
            return true;
        }

        let Some(group) = self.group_for(user_agent) else {
            return true;
        };

        let verdict = group
            .rules
            .iter()
            .filter(|rule| pattern_matches(&rule.pattern, path))
            .max_by(|a, b| {
                a.pattern
                    .len()
                    .cmp(&b.pattern.len())
                    .then(a.allow.cmp(&b.allow))
            });

        match verdict {
            Some(rule) => {
                if !rule.allow {
                    debug!(path, pattern = %rule.pattern, "Path disallowed by robots.txt");
                }
                rule.allow
            }
            None => true,
        }
    }

    /// `Crawl-delay` declared for `user_agent`, if any.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        self.group_for(user_agent).and_then(|g| g.crawl_delay)
    }
}

/// Match a robots path pattern against a URL path.
///
/// Patterns are prefix matches; `*` matches any run of characters and a
/// trailing `$` anchors the end of the path.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };

    let mut pieces = pattern.split('*');
    let first = pieces.next().unwrap_or_default();
    let Some(mut rest) = path.strip_prefix(first) else {
        return false;
    };

    let pieces: Vec<&str> = pieces.collect();
    if pieces.is_empty() {
        return !anchored || rest.is_empty();
    }

    for (i, piece) in pieces.iter().enumerate() {
        let is_last = i == pieces.len() - 1;
        if is_last && anchored {
            return rest.ends_with(piece);
        }
        if piece.is_empty() {
            continue;
        }
        match rest.find(piece) {
            Some(idx) => rest = &rest[idx + piece.len()..],
            None => return false,
        }
    }

    // Pattern ended with a wildcard piece, or was unanchored
    true
}
