//! Allow-list of public routes.

use serde::{Deserialize, Serialize};

/// Path prefixes where an anonymous 401 is expected.
///
/// A logout caused by a request to one of these paths does not force the
/// user back to the sign-in page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PublicRoutes {
    prefixes: Vec<String>,
}

impl PublicRoutes {
    /// Create an empty allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefix.
    #[must_use]
    pub fn with(mut self, prefix: impl Into<String>) -> Self {
        self.push(prefix);
        self
    }

    /// Add a prefix in place. Trailing slashes are ignored.
    pub fn push(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        let trimmed = prefix.trim().trim_end_matches('/');
        let normalized = if trimmed.is_empty() {
            "/".to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        if !self.prefixes.contains(&normalized) {
            self.prefixes.push(normalized);
        }
    }

    /// Parse a comma-separated list, as found in environment variables.
    pub fn parse_list(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .fold(Self::new(), |routes, prefix| routes.with(prefix))
    }

    /// Configured prefixes.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether the allow-list is empty.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Check a request path (query string and fragment are ignored).
    ///
    /// Prefixes match whole segments: `/product` matches `/product/42` but
    /// not `/products`. `/` matches only the root.
    pub fn matches(&self, path: &str) -> bool {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };

        self.prefixes.iter().any(|prefix| {
            if prefix == "/" {
                return path == "/";
            }
            path.strip_prefix(prefix.as_str())
                .map(|rest| rest.is_empty() || rest.starts_with('/'))
                .unwrap_or(false)
        })
    }
}

impl<S: Into<String>> FromIterator<S> for PublicRoutes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |routes, prefix| routes.with(prefix))
    }
}

impl From<Vec<String>> for PublicRoutes {
    fn from(prefixes: Vec<String>) -> Self {
        prefixes.into_iter().collect()
    }
}

impl From<PublicRoutes> for Vec<String> {
    fn from(routes: PublicRoutes) -> Self {
        routes.prefixes
    }
}
