//! View Routing
//!
//! Maps browser locations to the two views of the application:
//!
//! - `/` → [`Route::Home`] (tournament list)
//! - `/tournament/:id` → [`Route::Tournament`] (table grid of one tournament)
//!
//! The history mode decides where the route lives in the URL. In path mode it
//! is the request path below the base prefix; in hash mode the request path is
//! the base itself and the route is carried in the fragment
//! (`/purplefox-poc/#/tournament/abc`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Path prefix used when deployed under a sub-path in production
pub const PRODUCTION_BASE: &str = "/purplefox-poc/";

/// Path prefix used in development
pub const DEVELOPMENT_BASE: &str = "/";

/// Browser URL strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    /// Real browser paths (`/tournament/abc`)
    #[default]
    Path,
    /// Hash fragments (`#/tournament/abc`)
    Hash,
}

impl FromStr for HistoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "path" | "web" | "history" => Ok(HistoryMode::Path),
            "hash" => Ok(HistoryMode::Hash),
            other => Err(format!("unknown history mode '{}'", other)),
        }
    }
}

/// Deployment target, chosen at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Development,
    Production,
}

impl Profile {
    /// Profile of the running binary: release builds are production.
    pub fn from_build() -> Self {
        if cfg!(debug_assertions) {
            Profile::Development
        } else {
            Profile::Production
        }
    }

    /// Default base prefix for this profile
    pub fn default_base(&self) -> &'static str {
        match self {
            Profile::Development => DEVELOPMENT_BASE,
            Profile::Production => PRODUCTION_BASE,
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::from_build()
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Profile::Development),
            "production" | "prod" => Ok(Profile::Production),
            other => Err(format!("unknown profile '{}'", other)),
        }
    }
}

/// A resolved view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "name", rename_all = "PascalCase")]
pub enum Route {
    /// Tournament list
    Home,
    /// Table grid for one tournament; `id` is passed to the view as input
    Tournament { id: String },
}

impl Route {
    /// Route name as registered in the table
    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Tournament { .. } => "Tournament",
        }
    }

    /// Path of this route relative to the base, always starting with `/`
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Tournament { id } => format!("/tournament/{}", urlencoding::encode(id)),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Route resolution for one history mode and base prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    history: HistoryMode,
    base: String,
}

impl RouteTable {
    /// Create a route table. The base is normalized to start and end with `/`.
    pub fn new(history: HistoryMode, base: &str) -> Self {
        Self {
            history,
            base: normalize_base(base),
        }
    }

    pub fn history(&self) -> HistoryMode {
        self.history
    }

    /// Normalized base prefix (`/` or `/prefix/`)
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve a request path (no fragment, which browsers never send)
    pub fn resolve(&self, path: &str) -> Option<Route> {
        self.resolve_location(path, None)
    }

    /// Resolve a full browser location
    pub fn resolve_location(&self, path: &str, fragment: Option<&str>) -> Option<Route> {
        let relative = self.strip_base(path)?;

        match self.history {
            HistoryMode::Path => match_route(relative),
            HistoryMode::Hash => {
                if relative != "/" {
                    return None;
                }
                let fragment = fragment.unwrap_or("").trim_start_matches('#');
                if fragment.is_empty() {
                    Some(Route::Home)
                } else {
                    match_route(fragment)
                }
            }
        }
    }

    /// Resolve an absolute URL or a path with an optional `#fragment`
    pub fn resolve_url(&self, url: &str) -> Option<Route> {
        let without_origin = match url.find("://") {
            Some(scheme_end) => {
                let rest = &url[scheme_end + 3..];
                rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
            }
            None => url,
        };

        let (path_and_query, fragment) = match without_origin.split_once('#') {
            Some((p, f)) => (p, Some(f)),
            None => (without_origin, None),
        };
        let path = path_and_query.split('?').next().unwrap_or("/");

        self.resolve_location(path, fragment)
    }

    /// Link to a route, honoring base and history mode
    pub fn href(&self, route: &Route) -> String {
        match self.history {
            HistoryMode::Path => {
                let path = route.path();
                format!("{}{}", self.base, path.trim_start_matches('/'))
            }
            HistoryMode::Hash => match route {
                Route::Home => self.base.clone(),
                other => format!("{}#{}", self.base, other.path()),
            },
        }
    }

    /// Path below the base, starting with `/`; `None` when outside the base
    fn strip_base<'a>(&self, path: &'a str) -> Option<&'a str> {
        let path = if path.is_empty() { "/" } else { path };

        if self.base == "/" {
            return Some(path);
        }

        // The base without its trailing slash also mounts the root
        let bare = &self.base[..self.base.len() - 1];
        if path == bare {
            return Some("/");
        }

        path.strip_prefix(bare).filter(|rest| rest.starts_with('/'))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(HistoryMode::default(), Profile::from_build().default_base())
    }
}

fn normalize_base(base: &str) -> String {
    let trimmed = base.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// Match a base-relative path against the two routes
fn match_route(relative: &str) -> Option<Route> {
    let relative = relative.split('?').next().unwrap_or("");
    if relative.is_empty() || relative == "/" {
        return Some(Route::Home);
    }

    let trimmed = relative.strip_prefix('/')?;
    // A single trailing slash is tolerated
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

    let mut segments = trimmed.split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some("tournament"), Some(id), None) if !id.is_empty() => {
            let id = urlencoding::decode(id).ok()?.into_owned();
            Some(Route::Tournament { id })
        }
        _ => None,
    }
}
