//! Style Configuration
//!
//! Content-scan paths and custom color tokens for the utility-CSS build, plus
//! the mapping from table status to color classes used by the views.

use serde::Deserialize;
use std::fmt::Write;

use crate::status::Status;

/// A custom color token, e.g. `green.800 = #166534`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColorToken {
    /// Color family (`green`, `purple`)
    pub family: String,
    /// Shade key (`800`, `DEFAULT`)
    pub shade: String,
    /// CSS color value
    pub value: String,
}

impl ColorToken {
    pub fn new(family: &str, shade: &str, value: &str) -> Self {
        Self {
            family: family.to_string(),
            shade: shade.to_string(),
            value: value.to_string(),
        }
    }

    /// Utility class suffix for this token (`green-800`, `purple`)
    pub fn class_suffix(&self) -> String {
        if self.shade == "DEFAULT" {
            self.family.clone()
        } else {
            format!("{}-{}", self.family, self.shade)
        }
    }
}

/// Style build configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Theme {
    #[serde(default = "default_content")]
    pub content: Vec<String>,

    #[serde(default = "default_colors")]
    pub colors: Vec<ColorToken>,
}

fn default_content() -> Vec<String> {
    vec!["./index.html".to_string(), "./src/**/*.rs".to_string()]
}

fn default_colors() -> Vec<ColorToken> {
    vec![
        ColorToken::new("green", "800", "#166534"),
        ColorToken::new("purple", "DEFAULT", "#8b5cf6"),
    ]
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            content: default_content(),
            colors: default_colors(),
        }
    }
}

impl Theme {
    /// Look up a token by family and shade
    pub fn color(&self, family: &str, shade: &str) -> Option<&ColorToken> {
        self.colors
            .iter()
            .find(|c| c.family == family && c.shade == shade)
    }

    /// Render `tailwind.config.js`
    pub fn render_tailwind_config(&self) -> String {
        let mut out = String::new();
        out.push_str("/** @type {import('tailwindcss').Config} */\n");
        out.push_str("export default {\n");
        out.push_str("    content: [\n");
        for path in &self.content {
            let _ = writeln!(out, "        \"{}\",", path);
        }
        out.push_str("    ],\n");
        out.push_str("    theme: {\n");
        out.push_str("        extend: {\n");
        out.push_str("            colors: {\n");

        // Group shades under their family, keeping first-seen order
        let mut families: Vec<&str> = Vec::new();
        for token in &self.colors {
            if !families.contains(&token.family.as_str()) {
                families.push(&token.family);
            }
        }
        for family in families {
            let _ = writeln!(out, "                '{}': {{", family);
            for token in self.colors.iter().filter(|c| c.family == family) {
                let _ = writeln!(out, "                    '{}': '{}',", token.shade, token.value);
            }
            out.push_str("                },\n");
        }

        out.push_str("            },\n");
        out.push_str("        },\n");
        out.push_str("    },\n");
        out.push_str("    plugins: [],\n");
        out.push_str("}\n");
        out
    }
}

/// Background class for a table tile
pub fn status_class(status: Status) -> &'static str {
    match status {
        Status::Unknown => "bg-white text-gray-900",
        Status::Playing => "bg-red-500 text-white",
        Status::Covered => "bg-yellow-400 text-gray-900",
        Status::Done => "bg-green-800 text-white",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tokens() {
        let theme = Theme::default();
        assert_eq!(theme.color("green", "800").unwrap().value, "#166534");
        assert_eq!(theme.color("purple", "DEFAULT").unwrap().value, "#8b5cf6");
        assert_eq!(theme.color("purple", "DEFAULT").unwrap().class_suffix(), "purple");
        assert!(theme.color("blue", "500").is_none());
    }

    #[test]
    fn test_render_tailwind_config() {
        let rendered = Theme::default().render_tailwind_config();
        assert!(rendered.contains("\"./index.html\","));
        assert!(rendered.contains("'green': {"));
        assert!(rendered.contains("'800': '#166534',"));
        assert!(rendered.contains("'DEFAULT': '#8b5cf6',"));
        assert!(rendered.trim_end().ends_with('}'));
    }

    #[test]
    fn test_done_uses_custom_green() {
        let theme = Theme::default();
        let green = theme.color("green", "800").unwrap();
        assert!(status_class(Status::Done).contains(&format!("bg-{}", green.class_suffix())));
    }
}
