//! Explicit render context.

use std::collections::BTreeMap;

use serde::Serialize;
use trellis_store::{Page, Template, Theme};

use crate::menu::MenuTree;
use crate::theme::ResolvedAssets;

/// Everything cross-cutting a page render needs, resolved up front and passed
/// down explicitly.
#[derive(Clone, Debug, Serialize)]
pub struct PageRenderContext {
    pub theme: Theme,
    pub assets: ResolvedAssets,
    /// Processed menus by location.
    pub menus: BTreeMap<String, MenuTree>,
    pub page: Page,
    pub template: Template,
}

impl PageRenderContext {
    /// Menu at `location`, if one was processed.
    #[must_use]
    pub fn menu(&self, location: &str) -> Option<&MenuTree> {
        self.menus.get(location).filter(|menu| !menu.is_empty())
    }
}
