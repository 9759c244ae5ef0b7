//! Rendering options.

use serde::{Deserialize, Serialize};

/// How resolution problems show up in rendered markup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Diagnostics {
    /// Visible diagnostic blocks, including field dumps.
    #[default]
    Verbose,
    /// HTML comment placeholders only.
    Quiet,
}

/// Options shared by every render in a process.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub diagnostics: Diagnostics,
    /// URL prefix media paths are resolved against.
    pub media_base_url: String,
    /// Site name for titles and the default footer.
    pub site_name: String,
    /// Width of the layout grid.
    pub grid_columns: u16,
    /// Cache processed menus between requests.
    pub menu_cache: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            diagnostics: Diagnostics::Verbose,
            media_base_url: "/media".to_owned(),
            site_name: "Trellis".to_owned(),
            grid_columns: 12,
            menu_cache: true,
        }
    }
}

impl RenderOptions {
    /// Public URL of a media path.
    #[must_use]
    pub fn media_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.media_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_url_joins_once() {
        let options = RenderOptions {
            media_base_url: "https://cdn.example.com/media/".to_owned(),
            ..RenderOptions::default()
        };
        assert_eq!(
            options.media_url("/uploads/a.jpg"),
            "https://cdn.example.com/media/uploads/a.jpg"
        );
    }
}
