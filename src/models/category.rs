//! Category tree with materialized paths.
//!
//! Categories form a strict tree. Every node carries a human-readable
//! breadcrumb (`path`, "Thuốc > Tim mạch") and a machine breadcrumb
//! (`path_slug`, "thuoc/tim-mach") that is unique across the whole tree.
//! Both are recomputed from the parent on every write, so descendant queries
//! reduce to a prefix match on `path_slug` instead of a recursive walk.
//!
//! [`CategoryTree`] is an explicit arena of nodes keyed by id. It backs the
//! in-memory catalog store and the bulk breadcrumb importer, and owns the
//! `recompute_subtree` pass that keeps descendant paths consistent after a
//! re-parent or re-slug.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Maximum stored slug length.
pub const MAX_SLUG_LEN: usize = 254;

/// A category node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,

    /// Human-readable name ("Tim mạch").
    pub name: String,

    /// URL-safe token, unique per parent. Derived from `name` when absent.
    pub slug: String,

    /// Parent node, `None` for roots.
    pub parent_id: Option<i64>,

    /// Depth in the tree, 0 for roots.
    pub level: i32,

    /// Human-readable breadcrumb ("Thuốc > Tim mạch").
    pub path: String,

    /// Machine breadcrumb ("thuoc/tim-mach"), globally unique.
    pub path_slug: String,

    /// Soft-deactivation flag; inactive nodes are invisible to the engine.
    pub active: bool,
}

impl Category {
    /// Slug clients address this category by: the full breadcrumb slug.
    pub fn public_slug(&self) -> &str {
        &self.path_slug
    }

    /// First segment of the machine breadcrumb (the root category's slug).
    pub fn root_slug(&self) -> &str {
        self.path_slug.split('/').next().unwrap_or(&self.slug)
    }

    /// Name clients see: the full breadcrumb, bare name when no path has
    /// been computed yet.
    pub fn display_name(&self) -> &str {
        if self.path.is_empty() {
            &self.name
        } else {
            &self.path
        }
    }
}

/// One `{name, slug}` pair of a breadcrumb trail, ordered root → leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreadcrumbEntry {
    pub name: String,
    pub slug: String,
}

/// Cache map shared across bulk breadcrumb imports, keyed by
/// `(parent_id, slug)`, so repeated trails don't hit storage per pair.
pub type BreadcrumbCache = HashMap<(Option<i64>, String), Category>;

/// Fold Vietnamese diacritics to ASCII ("thuốc" → "thuoc").
///
/// Input is expected lowercased; uppercase diacritics pass through to the
/// slugifier's non-alphanumeric handling.
fn fold_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'à' | 'á' | 'ạ' | 'ả' | 'ã' | 'â' | 'ầ' | 'ấ' | 'ậ' | 'ẩ' | 'ẫ' | 'ă' | 'ằ' | 'ắ'
            | 'ặ' | 'ẳ' | 'ẵ' => 'a',
            'è' | 'é' | 'ẹ' | 'ẻ' | 'ẽ' | 'ê' | 'ề' | 'ế' | 'ệ' | 'ể' | 'ễ' => 'e',
            'ì' | 'í' | 'ị' | 'ỉ' | 'ĩ' => 'i',
            'ò' | 'ó' | 'ọ' | 'ỏ' | 'õ' | 'ô' | 'ồ' | 'ố' | 'ộ' | 'ổ' | 'ỗ' | 'ơ' | 'ờ' | 'ớ'
            | 'ợ' | 'ở' | 'ỡ' => 'o',
            'ù' | 'ú' | 'ụ' | 'ủ' | 'ũ' | 'ư' | 'ừ' | 'ứ' | 'ự' | 'ử' | 'ữ' => 'u',
            'ỳ' | 'ý' | 'ỵ' | 'ỷ' | 'ỹ' => 'y',
            'đ' => 'd',
            other => other,
        })
        .collect()
}

/// Convert text into a URL-safe slug.
///
/// Lowercases, folds Vietnamese diacritics to ASCII, replaces remaining
/// non-alphanumeric characters with hyphens, collapses consecutive hyphens,
/// trims, and truncates to [`MAX_SLUG_LEN`].
pub fn slugify(text: &str) -> String {
    let folded = fold_diacritics(&text.to_lowercase());
    let mapped: String = folded
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();

    let mut result = String::with_capacity(mapped.len());
    let mut prev_was_hyphen = true; // start true to skip leading hyphens
    for c in mapped.chars() {
        if c == '-' {
            if !prev_was_hyphen {
                result.push('-');
            }
            prev_was_hyphen = true;
        } else {
            result.push(c);
            prev_was_hyphen = false;
        }
    }
    while result.ends_with('-') {
        result.pop();
    }

    if result.len() > MAX_SLUG_LEN {
        result.truncate(MAX_SLUG_LEN);
        while result.ends_with('-') {
            result.pop();
        }
    }

    result
}

/// Compute `(level, path, path_slug)` for a node under `parent`.
pub(crate) fn child_paths(parent: Option<&Category>, name: &str, slug: &str) -> (i32, String, String) {
    match parent {
        Some(p) => (
            p.level + 1,
            format!("{} > {}", p.path, name),
            format!("{}/{}", p.path_slug, slug),
        ),
        None => (0, name.to_string(), slug.to_string()),
    }
}

/// In-memory arena of category nodes keyed by id.
#[derive(Debug, Default)]
pub struct CategoryTree {
    nodes: HashMap<i64, Category>,
    next_id: i64,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn get(&self, id: i64) -> Option<&Category> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.nodes.values()
    }

    /// Get or create a node under `parent_id`, keyed by `(parent_id, slug)`.
    ///
    /// An existing node with the same parent and slug is reused (idempotent),
    /// keeping `path_slug` globally unique. An empty `slug` is derived from
    /// `name`.
    pub fn get_or_create(&mut self, parent_id: Option<i64>, name: &str, slug: &str) -> i64 {
        let slug = if slug.is_empty() {
            slugify(name)
        } else {
            slug.to_string()
        };

        if let Some(existing) = self
            .nodes
            .values()
            .find(|n| n.parent_id == parent_id && n.slug == slug)
        {
            return existing.id;
        }

        let parent = parent_id.and_then(|p| self.nodes.get(&p)).cloned();
        let (level, path, path_slug) = child_paths(parent.as_ref(), name, &slug);

        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            Category {
                id,
                name: name.to_string(),
                slug,
                parent_id: parent.map(|p| p.id),
                level,
                path,
                path_slug,
                active: true,
            },
        );
        id
    }

    /// Walk a root→leaf breadcrumb trail, reusing nodes via the shared
    /// `cache` map before touching the arena. Returns the leaf, or `None`
    /// for empty/fully-malformed input. Entries with an empty name or slug
    /// are skipped.
    pub fn get_or_create_from_breadcrumb(
        &mut self,
        trail: &[BreadcrumbEntry],
        cache: &mut BreadcrumbCache,
    ) -> Option<Category> {
        let mut parent: Option<Category> = None;

        for entry in trail {
            let name = entry.name.trim();
            let slug = entry.slug.trim();
            if name.is_empty() || slug.is_empty() {
                continue;
            }

            let key = (parent.as_ref().map(|p| p.id), slug.to_string());
            let node = match cache.get(&key) {
                Some(cached) => cached.clone(),
                None => {
                    let id = self.get_or_create(key.0, name, slug);
                    let node = self.nodes.get(&id).cloned()?;
                    cache.insert(key, node.clone());
                    node
                }
            };
            parent = Some(node);
        }

        parent
    }

    /// Look up an active category by exact `slug` or `path_slug`,
    /// case-insensitively. Full-path matches win over bare-slug matches;
    /// among ambiguous bare-slug matches the lowest id wins, matching the
    /// SQL store's ordering.
    pub fn resolve(&self, slug: &str) -> Option<&Category> {
        let mut by_slug: Option<&Category> = None;
        for node in self.nodes.values().filter(|n| n.active) {
            if node.path_slug.eq_ignore_ascii_case(slug) {
                return Some(node);
            }
            if node.slug.eq_ignore_ascii_case(slug)
                && by_slug.is_none_or(|current| node.id < current.id)
            {
                by_slug = Some(node);
            }
        }
        by_slug
    }

    /// Level-0 ancestor of `category`, resolved via the first `path_slug`
    /// segment rather than walking parent pointers.
    pub fn root_of(&self, category: &Category) -> Option<&Category> {
        if category.level == 0 {
            return self.nodes.get(&category.id);
        }
        let root_slug = category.root_slug();
        self.nodes
            .values()
            .find(|n| n.active && n.level == 0 && n.parent_id.is_none() && n.slug == root_slug)
    }

    /// `category` itself plus every active node whose `path_slug` extends it.
    pub fn descendants(&self, category: &Category) -> Vec<&Category> {
        let prefix = format!("{}/", category.path_slug);
        let mut out: Vec<&Category> = self
            .nodes
            .values()
            .filter(|n| n.active && (n.id == category.id || n.path_slug.starts_with(&prefix)))
            .collect();
        out.sort_by_key(|n| n.id);
        out
    }

    pub fn descendant_ids(&self, category: &Category) -> Vec<i64> {
        self.descendants(category).iter().map(|n| n.id).collect()
    }

    /// Direct active children of a node.
    pub fn children_of(&self, id: i64) -> Vec<&Category> {
        let mut out: Vec<&Category> = self
            .nodes
            .values()
            .filter(|n| n.active && n.parent_id == Some(id))
            .collect();
        out.sort_by_key(|n| n.id);
        out
    }

    /// Move a node under a new parent and recompute the whole subtree.
    ///
    /// Rejects unknown ids and moves that would create a cycle.
    pub fn set_parent(&mut self, id: i64, new_parent: Option<i64>) -> anyhow::Result<()> {
        anyhow::ensure!(self.nodes.contains_key(&id), "unknown category id {id}");
        if let Some(parent_id) = new_parent {
            anyhow::ensure!(
                self.nodes.contains_key(&parent_id),
                "unknown parent category id {parent_id}"
            );
            // Walk up from the new parent; hitting `id` means a cycle.
            let mut cursor = Some(parent_id);
            while let Some(current) = cursor {
                anyhow::ensure!(current != id, "cannot move category {id} under its own subtree");
                cursor = self.nodes.get(&current).and_then(|n| n.parent_id);
            }
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent_id = new_parent;
        }
        self.recompute_subtree(id);
        Ok(())
    }

    /// Replace a node's slug and recompute the subtree's paths.
    pub fn set_slug(&mut self, id: i64, slug: &str) -> anyhow::Result<()> {
        anyhow::ensure!(self.nodes.contains_key(&id), "unknown category id {id}");
        let slug = slugify(slug);
        anyhow::ensure!(!slug.is_empty(), "slug must not be empty");
        if let Some(node) = self.nodes.get_mut(&id) {
            node.slug = slug;
        }
        self.recompute_subtree(id);
        Ok(())
    }

    /// Recompute `level`/`path`/`path_slug` for a node and all descendants.
    ///
    /// Save-time hooks only see one node at a time; this pass is what keeps
    /// descendants from going stale when a parent is re-slugged or moved.
    pub fn recompute_subtree(&mut self, root: i64) {
        let mut queue = vec![root];
        while let Some(id) = queue.pop() {
            let parent = self
                .nodes
                .get(&id)
                .and_then(|n| n.parent_id)
                .and_then(|p| self.nodes.get(&p))
                .cloned();
            if let Some(node) = self.nodes.get_mut(&id) {
                let (level, path, path_slug) = child_paths(parent.as_ref(), &node.name, &node.slug);
                node.level = level;
                node.path = path;
                node.path_slug = path_slug;
            }
            queue.extend(
                self.nodes
                    .values()
                    .filter(|n| n.parent_id == Some(id))
                    .map(|n| n.id),
            );
        }
    }

    /// Soft-deactivate a node. The subtree below it stays active but becomes
    /// unreachable through scope queries rooted at this node.
    pub fn deactivate(&mut self, id: i64) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.active = false;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn slugify_folds_vietnamese_diacritics() {
        assert_eq!(slugify("Thuốc"), "thuoc");
        assert_eq!(slugify("Tim mạch"), "tim-mach");
        assert_eq!(slugify("Dược mĩ phẩm"), "duoc-mi-pham");
        assert_eq!(slugify("Thực phẩm chức năng"), "thuc-pham-chuc-nang");
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("  Hello --- World!  "), "hello-world");
        assert_eq!(slugify("a&b"), "a-b");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn slugify_truncates_long_names() {
        let long = "x".repeat(400);
        assert_eq!(slugify(&long).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn paths_recomputed_from_parent() {
        let mut tree = CategoryTree::new();
        let root = tree.get_or_create(None, "Thuốc", "thuoc");
        let child = tree.get_or_create(Some(root), "Tim mạch", "tim-mach");

        let node = tree.get(child).unwrap();
        assert_eq!(node.level, 1);
        assert_eq!(node.path, "Thuốc > Tim mạch");
        assert_eq!(node.path_slug, "thuoc/tim-mach");
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut tree = CategoryTree::new();
        let root = tree.get_or_create(None, "Thuốc", "thuoc");
        let a = tree.get_or_create(Some(root), "Tim mạch", "tim-mach");
        let b = tree.get_or_create(Some(root), "Tim mạch", "tim-mach");
        assert_eq!(a, b);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn breadcrumb_import_twice_creates_two_rows() {
        let mut tree = CategoryTree::new();
        let trail = vec![
            BreadcrumbEntry {
                name: "Thuốc".to_string(),
                slug: "thuoc".to_string(),
            },
            BreadcrumbEntry {
                name: "Tim mạch".to_string(),
                slug: "tim-mach".to_string(),
            },
        ];

        let mut cache = BreadcrumbCache::new();
        let first = tree.get_or_create_from_breadcrumb(&trail, &mut cache).unwrap();
        let second = tree.get_or_create_from_breadcrumb(&trail, &mut cache).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(tree.len(), 2);
        assert_eq!(first.path_slug, "thuoc/tim-mach");
    }

    #[test]
    fn breadcrumb_skips_malformed_entries() {
        let mut tree = CategoryTree::new();
        let trail = vec![
            BreadcrumbEntry {
                name: String::new(),
                slug: "ghost".to_string(),
            },
            BreadcrumbEntry {
                name: "Thuốc".to_string(),
                slug: "thuoc".to_string(),
            },
        ];
        let mut cache = BreadcrumbCache::new();
        let leaf = tree.get_or_create_from_breadcrumb(&trail, &mut cache).unwrap();
        assert_eq!(leaf.slug, "thuoc");
        assert_eq!(tree.len(), 1);

        assert!(
            tree.get_or_create_from_breadcrumb(&[], &mut cache)
                .is_none()
        );
    }

    #[test]
    fn resolve_matches_slug_and_path_slug_case_insensitively() {
        let mut tree = CategoryTree::new();
        let root = tree.get_or_create(None, "Thuốc", "thuoc");
        tree.get_or_create(Some(root), "Tim mạch", "tim-mach");

        assert_eq!(tree.resolve("THUOC").unwrap().id, root);
        assert_eq!(tree.resolve("thuoc/tim-mach").unwrap().level, 1);
        assert_eq!(tree.resolve("Tim-Mach").unwrap().level, 1);
        assert!(tree.resolve("missing").is_none());
    }

    #[test]
    fn ambiguous_bare_slug_resolves_to_lowest_id() {
        let mut tree = CategoryTree::new();
        let medicine = tree.get_or_create(None, "Thuốc", "thuoc");
        let cosmetics = tree.get_or_create(None, "Dược mĩ phẩm", "duoc-mi-pham");
        let first = tree.get_or_create(Some(medicine), "Chăm sóc da", "cham-soc-da");
        let second = tree.get_or_create(Some(cosmetics), "Chăm sóc da", "cham-soc-da");
        assert!(first < second);

        assert_eq!(tree.resolve("cham-soc-da").unwrap().id, first);
        // The full path still addresses either one.
        assert_eq!(
            tree.resolve("duoc-mi-pham/cham-soc-da").unwrap().id,
            second
        );
    }

    #[test]
    fn display_name_prefers_breadcrumb_path() {
        let mut tree = CategoryTree::new();
        let root = tree.get_or_create(None, "Thuốc", "thuoc");
        let child = tree.get_or_create(Some(root), "Tim mạch", "tim-mach");
        assert_eq!(tree.get(child).unwrap().display_name(), "Thuốc > Tim mạch");

        let bare = Category {
            id: 99,
            name: "Khác".to_string(),
            slug: "khac".to_string(),
            parent_id: None,
            level: 0,
            path: String::new(),
            path_slug: String::new(),
            active: true,
        };
        assert_eq!(bare.display_name(), "Khác");
    }

    #[test]
    fn descendants_include_self_and_are_closed_under_children() {
        let mut tree = CategoryTree::new();
        let root = tree.get_or_create(None, "Thuốc", "thuoc");
        let mid = tree.get_or_create(Some(root), "Tim mạch", "tim-mach");
        let leaf = tree.get_or_create(Some(mid), "Huyết áp", "huyet-ap");
        tree.get_or_create(None, "Khác", "khac");

        let root_node = tree.get(root).unwrap().clone();
        let ids = tree.descendant_ids(&root_node);
        assert!(ids.contains(&root));
        assert!(ids.contains(&mid));
        assert!(ids.contains(&leaf));
        assert_eq!(ids.len(), 3);

        // Closure: every member's children are members.
        for id in &ids {
            for child in tree.children_of(*id) {
                assert!(ids.contains(&child.id));
            }
        }
    }

    #[test]
    fn root_of_uses_path_slug_first_segment() {
        let mut tree = CategoryTree::new();
        let root = tree.get_or_create(None, "Thuốc", "thuoc");
        let mid = tree.get_or_create(Some(root), "Tim mạch", "tim-mach");
        let leaf = tree.get_or_create(Some(mid), "Huyết áp", "huyet-ap");

        let leaf_node = tree.get(leaf).unwrap().clone();
        assert_eq!(tree.root_of(&leaf_node).unwrap().id, root);

        let root_node = tree.get(root).unwrap().clone();
        assert_eq!(tree.root_of(&root_node).unwrap().id, root);
    }

    #[test]
    fn recompute_subtree_after_reparent() {
        let mut tree = CategoryTree::new();
        let a = tree.get_or_create(None, "A", "a");
        let b = tree.get_or_create(None, "B", "b");
        let child = tree.get_or_create(Some(a), "C", "c");
        let grand = tree.get_or_create(Some(child), "D", "d");

        tree.set_parent(child, Some(b)).unwrap();

        assert_eq!(tree.get(child).unwrap().path_slug, "b/c");
        assert_eq!(tree.get(grand).unwrap().path_slug, "b/c/d");
        assert_eq!(tree.get(grand).unwrap().level, 2);
        assert_eq!(tree.get(grand).unwrap().path, "B > C > D");
    }

    #[test]
    fn set_parent_rejects_cycles() {
        let mut tree = CategoryTree::new();
        let a = tree.get_or_create(None, "A", "a");
        let b = tree.get_or_create(Some(a), "B", "b");
        assert!(tree.set_parent(a, Some(b)).is_err());
        assert!(tree.set_parent(a, Some(a)).is_err());
    }

    #[test]
    fn set_slug_recomputes_descendant_paths() {
        let mut tree = CategoryTree::new();
        let a = tree.get_or_create(None, "A", "a");
        let b = tree.get_or_create(Some(a), "B", "b");

        tree.set_slug(a, "alpha").unwrap();
        assert_eq!(tree.get(b).unwrap().path_slug, "alpha/b");
    }

    #[test]
    fn path_slugs_stay_unique() {
        let mut tree = CategoryTree::new();
        let root = tree.get_or_create(None, "Thuốc", "thuoc");
        tree.get_or_create(Some(root), "Tim mạch", "tim-mach");
        tree.get_or_create(Some(root), "Tim mạch", "tim-mach");
        tree.get_or_create(None, "Thuốc", "thuoc");

        let mut slugs: Vec<&str> = tree.iter().map(|n| n.path_slug.as_str()).collect();
        let before = slugs.len();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), before);
    }

    #[test]
    fn deactivated_nodes_are_invisible() {
        let mut tree = CategoryTree::new();
        let root = tree.get_or_create(None, "Thuốc", "thuoc");
        let child = tree.get_or_create(Some(root), "Tim mạch", "tim-mach");

        tree.deactivate(child);
        assert!(tree.resolve("thuoc/tim-mach").is_none());

        let root_node = tree.get(root).unwrap().clone();
        assert!(tree.children_of(root_node.id).is_empty());
    }
}
