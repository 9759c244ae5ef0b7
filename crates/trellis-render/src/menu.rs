//! Navigation menu processing.
//!
//! Flat [`MenuItem`] rows become a tree with per-request `is_current` and
//! `has_active_child` flags. Results may be cached per
//! (selected menu, page, one-page) key. Entries are tagged with the store
//! revision; the first lookup after a write drops the whole bucket, so the
//! cache never holds more than one revision's worth of trees.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use trellis_cache::{Cache, CacheBucket, CacheBucketExt};
use trellis_store::{Id, LinkTarget, Menu, MenuItem, Page, Store, StoreError};

use crate::html::{escape_html, is_absolute_url};

/// Processed menu entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuNode {
    pub id: Id,
    pub label: String,
    /// Link as rendered. In one-page mode this is an in-page anchor.
    pub href: String,
    /// Item links to the page being rendered.
    pub is_current: bool,
    /// A direct child is current.
    pub has_active_child: bool,
    pub children: Vec<MenuNode>,
}

/// Processed menu for one location.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuTree {
    pub location: String,
    /// Id of the menu the tree was built from. `None` when no menu matched.
    pub menu_id: Option<Id>,
    pub items: Vec<MenuNode>,
}

impl MenuTree {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Render as nested `<ul>` lists.
    #[must_use]
    pub fn to_html(&self, class: &str) -> String {
        let mut out = String::new();
        write_list(&self.items, class, &mut out);
        out
    }
}

fn write_list(items: &[MenuNode], class: &str, out: &mut String) {
    if items.is_empty() {
        return;
    }
    write!(out, r#"<ul class="{}">"#, escape_html(class)).unwrap();
    for item in items {
        let mut classes = vec!["nav-item"];
        if item.is_current {
            classes.push("current");
        }
        if item.has_active_child {
            classes.push("active-parent");
        }
        if !item.children.is_empty() {
            classes.push("has-children");
        }
        let aria = if item.is_current {
            r#" aria-current="page""#
        } else {
            ""
        };
        write!(
            out,
            r#"<li class="{}"><a class="nav-link" href="{}"{aria}>{}</a>"#,
            classes.join(" "),
            escape_html(&item.href),
            escape_html(&item.label)
        )
        .unwrap();
        write_list(&item.children, "submenu", out);
        out.push_str("</li>");
    }
    out.push_str("</ul>");
}

/// Parameters of [`MenuProcessor::processed_menu`].
#[derive(Clone, Debug, Default)]
pub struct MenuQuery {
    /// Location key such as `header`.
    pub location: String,
    /// Page being rendered, for `is_current`.
    pub page_id: Option<Id>,
    /// Template of the page being rendered. Menus scoped to it win.
    pub template_id: Option<Id>,
    /// Rewrite links into in-page anchors.
    pub one_page: bool,
    /// Read and fill the menu cache.
    pub use_cache: bool,
}

impl MenuQuery {
    #[must_use]
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_owned(),
            ..Self::default()
        }
    }
}

/// Cache key of a tree. Locations and template scopes that resolve to the
/// same menu share entries; unknown pages never reach the cache.
fn cache_key(menu: &Menu, query: &MenuQuery) -> String {
    let page = query
        .page_id
        .map_or_else(|| "-".to_owned(), |id| id.to_string());
    format!("{}:{page}:{}", menu.id, query.one_page)
}

/// Builds menu trees from the store.
pub struct MenuProcessor {
    store: Arc<dyn Store>,
    bucket: Box<dyn CacheBucket>,
    /// Newest store revision seen by a cached lookup.
    cached_revision: AtomicU64,
}

impl MenuProcessor {
    pub fn new(store: Arc<dyn Store>, cache: &dyn Cache) -> Self {
        Self {
            store,
            bucket: cache.bucket("menus"),
            cached_revision: AtomicU64::new(0),
        }
    }

    /// Process the menu at `query.location`.
    ///
    /// A location without a menu yields an empty tree.
    pub fn processed_menu(&self, query: &MenuQuery) -> Result<MenuTree, StoreError> {
        // Read the revision first: a write racing the build only makes the entry stale
        let revision = self.store.revision();
        let Some(menu) = self.select_menu(query)? else {
            return Ok(MenuTree {
                location: query.location.clone(),
                menu_id: None,
                items: Vec::new(),
            });
        };
        if !query.use_cache {
            return self.build(query, &menu);
        }

        self.evict_older_than(revision);
        let etag = revision.to_string();
        let key = cache_key(&menu, query);
        if let Some(tree) = self.bucket.get_json::<MenuTree>(&key, &etag) {
            tracing::debug!(key = %key, "menu cache hit");
            return Ok(tree);
        }

        let tree = self.build(query, &menu)?;
        self.bucket.set_json(&key, &etag, &tree);
        Ok(tree)
    }

    fn evict_older_than(&self, revision: u64) {
        let previous = self.cached_revision.fetch_max(revision, Ordering::AcqRel);
        if revision > previous {
            self.bucket.clear();
            tracing::debug!(previous, revision, "menu cache cleared");
        }
    }

    fn build(&self, query: &MenuQuery, menu: &Menu) -> Result<MenuTree, StoreError> {
        let current_url = match query.page_id {
            Some(id) => Some(self.store.page(id)?.url()),
            None => None,
        };

        let mut rows = self.store.menu_items(menu.id)?;
        rows.sort_by_key(|item| (item.order, item.id));

        let pages: BTreeMap<Id, Page> = self
            .store
            .pages()?
            .into_iter()
            .map(|page| (page.id, page))
            .collect();

        let builder = TreeBuilder {
            rows: &rows,
            pages: &pages,
            current_url: current_url.as_deref(),
            one_page: query.one_page,
        };

        Ok(MenuTree {
            location: query.location.clone(),
            menu_id: Some(menu.id),
            items: builder.build(),
        })
    }

    fn select_menu(&self, query: &MenuQuery) -> Result<Option<Menu>, StoreError> {
        let candidates: Vec<Menu> = self
            .store
            .menus()?
            .into_iter()
            .filter(|menu| menu.location == query.location)
            .collect();

        let scoped = query.template_id.and_then(|template_id| {
            candidates
                .iter()
                .find(|menu| menu.template_id == Some(template_id))
        });
        Ok(scoped
            .or_else(|| candidates.iter().find(|menu| menu.template_id.is_none()))
            .cloned())
    }
}

struct TreeBuilder<'a> {
    rows: &'a [MenuItem],
    pages: &'a BTreeMap<Id, Page>,
    current_url: Option<&'a str>,
    one_page: bool,
}

impl TreeBuilder<'_> {
    fn build(&self) -> Vec<MenuNode> {
        let ids: HashSet<Id> = self.rows.iter().map(|item| item.id).collect();
        self.rows
            .iter()
            .filter(|item| item.parent_id.is_none_or(|parent| !ids.contains(&parent)))
            .filter(|item| item.active)
            .map(|item| self.node(item))
            .collect()
    }

    fn node(&self, item: &MenuItem) -> MenuNode {
        let children: Vec<MenuNode> = self
            .rows
            .iter()
            .filter(|child| child.parent_id == Some(item.id) && child.active)
            .map(|child| self.node(child))
            .collect();

        let url = self.url(&item.target);
        let is_current = self
            .current_url
            .is_some_and(|current| url.as_deref() == Some(current));

        MenuNode {
            id: item.id,
            label: item.label.clone(),
            href: if self.one_page {
                self.anchor(&item.target)
            } else {
                url.unwrap_or_else(|| "#".to_owned())
            },
            is_current,
            has_active_child: children.iter().any(|child| child.is_current),
            children,
        }
    }

    /// Full URL of a target. `None` for a page that no longer exists.
    fn url(&self, target: &LinkTarget) -> Option<String> {
        match target {
            LinkTarget::Page(id) => {
                let page = self.pages.get(id);
                if page.is_none() {
                    tracing::warn!(page_id = *id, "menu item links to a missing page");
                }
                page.map(Page::url)
            }
            LinkTarget::Url(url) => Some(url.clone()),
            LinkTarget::Anchor(anchor) => Some(format!("#{anchor}")),
        }
    }

    fn anchor(&self, target: &LinkTarget) -> String {
        match target {
            LinkTarget::Page(id) => match self.pages.get(id) {
                Some(page) if page.is_homepage => "#home".to_owned(),
                Some(page) => format!("#{}", page.slug),
                None => "#".to_owned(),
            },
            LinkTarget::Anchor(anchor) => format!("#{anchor}"),
            LinkTarget::Url(url) if is_absolute_url(url) || url.starts_with('#') => url.clone(),
            LinkTarget::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or_default();
                match path.trim_end_matches('/').rsplit('/').next() {
                    Some(segment) if !segment.is_empty() => format!("#{segment}"),
                    _ => "#home".to_owned(),
                }
            }
        }
    }
}
