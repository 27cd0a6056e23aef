//! View Routes
//!
//! Mounts the home and tournament views. Any request that is not an API,
//! health or asset request is resolved through the [`RouteTable`]; a matching
//! route gets the HTML shell of its view with a read-only snapshot of the
//! rows, everything else is a 404.
//!
//! [`RouteTable`]: crate::routing::RouteTable

use axum::{
    extract::State,
    http::{Method, Uri},
    response::Html,
};
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::routing::{HistoryMode, Route};
use crate::status::{Status, TableStatus};
use crate::theme::status_class;
use crate::websocket::tournament_topic;

/// Fallback handler rendering the view for the requested location
pub async fn render_view(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> ApiResult<Html<String>> {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::NotFound(format!("{} {}", method, uri.path())));
    }

    let route = state
        .routes
        .resolve(uri.path())
        .ok_or_else(|| ApiError::NotFound(format!("No view for {}", uri.path())))?;

    tracing::debug!(route = %route.name(), path = %uri.path(), "Mounting view");

    let page = match &route {
        Route::Home => {
            let tournaments = state.store.tournaments().await?;
            home_page(&state, &tournaments)
        }
        Route::Tournament { id } => {
            let tables = state.store.tables(id).await?;
            tournament_page(&state, id, &tables)
        }
    };

    Ok(Html(page))
}

fn home_page(state: &AppState, tournaments: &[String]) -> String {
    let mut body =
        String::from("<h1 class=\"text-2xl font-bold text-purple\">Tournaments</h1>\n<ul>\n");
    if tournaments.is_empty() {
        body.push_str("  <li class=\"text-gray-500\">No tournaments yet</li>\n");
    }
    for id in tournaments {
        let href = state.routes.href(&Route::Tournament { id: id.clone() });
        let _ = writeln!(
            body,
            "  <li><a class=\"text-purple\" href=\"{}\">{}</a></li>",
            escape_html(&href),
            escape_html(id)
        );
    }
    body.push_str("</ul>\n");

    let snapshot = json!({ "route": Route::Home, "tournaments": tournaments });
    shell(state, "Tournaments", &body, &snapshot)
}

fn tournament_page(state: &AppState, tournament_id: &str, tables: &[TableStatus]) -> String {
    let home = state.routes.href(&Route::Home);
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<a class=\"text-purple\" href=\"{}\">All tournaments</a>",
        escape_html(&home)
    );
    let _ = writeln!(
        body,
        "<h1 class=\"text-2xl font-bold\">Tournament {}</h1>",
        escape_html(tournament_id)
    );

    body.push_str("<div class=\"grid grid-cols-6 gap-2\">\n");
    for row in tables {
        let _ = writeln!(
            body,
            "  <div class=\"table-tile {}\" data-table=\"{}\" data-status=\"{}\">{} <span>{}</span></div>",
            status_class(row.status),
            row.table_number,
            row.status,
            row.table_number,
            row.status.label()
        );
    }
    body.push_str("</div>\n");
    body.push_str(&legend());

    let snapshot = json!({
        "route": Route::Tournament { id: tournament_id.to_string() },
        "topic": tournament_topic(tournament_id),
        "tables": tables,
    });
    shell(state, &format!("Tournament {}", tournament_id), &body, &snapshot)
}

fn legend() -> String {
    let mut out = String::from("<ul class=\"legend\">\n");
    for status in Status::ALL {
        let _ = writeln!(
            out,
            "  <li class=\"{}\">{}</li>",
            status_class(status),
            status.label()
        );
    }
    out.push_str("</ul>\n");
    out
}

/// Document around a view body, loading the external view bundle
fn shell(state: &AppState, title: &str, body: &str, snapshot: &serde_json::Value) -> String {
    let base = state.routes.base();
    let history = match state.routes.history() {
        HistoryMode::Path => "path",
        HistoryMode::Hash => "hash",
    };
    let purple = state
        .theme
        .color("purple", "DEFAULT")
        .map(|c| c.value.as_str())
        .unwrap_or("#8b5cf6");
    // Keep the JSON from closing its script element
    let snapshot = snapshot.to_string().replace("</", "<\\/");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="theme-color" content="{purple}">
<title>{title}</title>
<base href="{base}">
<link rel="stylesheet" href="{base}assets/index.css">
</head>
<body data-history="{history}">
<main id="app">
{body}</main>
<script id="purplefox-state" type="application/json">{snapshot}</script>
<script type="module" src="{base}assets/index.js"></script>
</body>
</html>
"#,
        purple = escape_html(purple),
        title = escape_html(title),
        base = escape_html(base),
        history = history,
        body = body,
        snapshot = snapshot,
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_legend_lists_every_status() {
        let legend = legend();
        assert!(legend.contains("bg-white"));
        assert!(legend.contains("bg-red-500"));
        assert!(legend.contains("bg-yellow-400"));
        assert!(legend.contains("bg-green-800"));
    }
}
