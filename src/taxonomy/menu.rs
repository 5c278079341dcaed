//! Navigation menu derivation (§4.6 "Menus"): builds a flat, weight-sorted
//! menu from every page that carries a `menu` frontmatter hint. Rebuilt
//! only when the config changed or a page with a nav-affecting metadata
//! key changed (§4.8 D3, §6.5) — see [`crate::planner::NAV_AFFECTING_KEYS`].

use crate::content::page::PageHandle;
use crate::site::MenuItem;
use serde_json::Value;

/// Build the site's navigation tree from every page's `menu` hint, sorted
/// by `(weight asc, name asc)`.
pub fn build(pages: &[PageHandle]) -> Vec<MenuItem> {
    let mut items: Vec<MenuItem> = pages
        .iter()
        .enumerate()
        .filter_map(|(idx, page)| menu_hint(page).map(|hint| resolve(idx, page, hint)))
        .collect();
    items.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.name.cmp(&b.name)));
    items
}

fn menu_hint(page: &PageHandle) -> Option<&Value> {
    page.metadata().get("menu")
}

fn resolve(idx: usize, page: &PageHandle, hint: &Value) -> MenuItem {
    let core = page.core();
    let name = hint.get("name").and_then(Value::as_str).map(str::to_string).unwrap_or_else(|| core.title.clone());
    let weight = hint.get("weight").and_then(Value::as_i64).or(core.weight).unwrap_or(0);
    let url = format!("/{}", core.source_path.as_str());
    MenuItem {
        name,
        url,
        weight,
        page_index: Some(idx),
        children: Vec::new(),
    }
}

/// `true` iff the menu must be rebuilt this build: the config changed, or
/// any changed page carried a nav-affecting key.
pub fn should_rebuild(config_changed: bool, any_changed_page_has_nav_key: bool) -> bool {
    config_changed || any_changed_page_has_nav_key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::page::FileSystemLoader;
    use crate::content::page_core::PageCore;
    use crate::primitives::SourcePath;
    use std::sync::Arc;

    fn page_with_menu(path: &str, weight: i64, name: &str) -> PageHandle {
        let fm = serde_json::json!({"title": path, "menu": {"weight": weight, "name": name}});
        let core = PageCore::from_frontmatter(SourcePath::new(path), &fm, None);
        let mut handle = PageHandle::lazy(core, Arc::new(FileSystemLoader { site_root: "/tmp".into() }));
        if let Value::Object(map) = fm {
            *handle.metadata_mut() = map;
        }
        handle
    }

    #[test]
    fn pages_without_menu_hint_are_excluded() {
        let fm = serde_json::json!({"title": "no nav"});
        let core = PageCore::from_frontmatter(SourcePath::new("a.md"), &fm, None);
        let pages = vec![PageHandle::lazy(core, Arc::new(FileSystemLoader { site_root: "/tmp".into() }))];
        assert!(build(&pages).is_empty());
    }

    #[test]
    fn menu_sorted_by_weight() {
        let pages = vec![page_with_menu("b.md", 2, "B"), page_with_menu("a.md", 1, "A")];
        let menu = build(&pages);
        assert_eq!(menu.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn rebuild_triggered_by_config_change_alone() {
        assert!(should_rebuild(true, false));
        assert!(!should_rebuild(false, false));
    }
}
