//! Path classification: what a namespace path *means*.
//!
//! ```text
//! /                              Root
//! /{category}                    Category
//! /{category}/{restaurant}       Restaurant   (restaurant filed under category)
//! /{category}/{restaurant}/menu  SyntheticFile(Menu)
//! anything else                  Other        (passthrough to the backing dir)
//! ```
//!
//! Classification is a pure function of the path string and the snapshot. A
//! path that only looks synthetic (e.g. a restaurant under a category it is
//! not filed in) falls through to `Other`.

use ordrfs_core::{CatalogSnapshot, MENU_FILE_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticKind {
    Menu,
}

impl SyntheticKind {
    pub fn file_name(self) -> &'static str {
        match self {
            SyntheticKind::Menu => MENU_FILE_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathClass {
    Root,
    Category(String),
    Restaurant {
        category: String,
        name: String,
    },
    SyntheticFile {
        category: String,
        restaurant: String,
        kind: SyntheticKind,
    },
    /// Path relative to the namespace root (no leading separator).
    Other(String),
}

impl PathClass {
    /// True for every class computed from the catalog rather than storage.
    pub fn is_synthetic(&self) -> bool {
        !matches!(self, PathClass::Root | PathClass::Other(_))
    }

    /// True for the synthetic directory classes.
    pub fn is_synthetic_dir(&self) -> bool {
        matches!(self, PathClass::Category(_) | PathClass::Restaurant { .. })
    }
}

/// Classify `path` against `snapshot`. Total and deterministic.
pub fn classify(path: &str, snapshot: &CatalogSnapshot) -> PathClass {
    let rel = path.strip_prefix('/').unwrap_or(path);
    if rel.is_empty() {
        return PathClass::Root;
    }

    let segments: Vec<&str> = rel.split('/').collect();
    match segments.as_slice() {
        [category] if snapshot.is_category(category) => {
            PathClass::Category((*category).to_string())
        }
        [category, name] if snapshot.restaurant_in(category, name).is_some() => {
            PathClass::Restaurant {
                category: (*category).to_string(),
                name: (*name).to_string(),
            }
        }
        [category, restaurant, file]
            if *file == MENU_FILE_NAME
                && snapshot.restaurant_in(category, restaurant).is_some() =>
        {
            PathClass::SyntheticFile {
                category: (*category).to_string(),
                restaurant: (*restaurant).to_string(),
                kind: SyntheticKind::Menu,
            }
        }
        _ => PathClass::Other(rel.to_string()),
    }
}

/// Join a parent path and an entry name into a namespace path.
///
/// `("/", "a")` → `/a`, `("/a", "b")` → `/a/b`
pub fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    format!("{parent}/{name}")
}

/// Split a namespace path into its parent and final component.
///
/// `/a/b` → `("/a", "b")`, `/a` → `("/", "a")`. The root has no parent.
pub fn split_parent(path: &str) -> Option<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    let name = &trimmed[idx + 1..];
    if name.is_empty() {
        return None;
    }
    let parent = if idx == 0 { "/" } else { &trimmed[..idx] };
    Some((parent, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordrfs_core::{MenuRecord, RestaurantRecord};
    use proptest::prelude::*;

    fn snapshot() -> CatalogSnapshot {
        let record = |id: &str, name: &str, cuisine: &[&str]| RestaurantRecord {
            id: id.into(),
            name: name.into(),
            cuisine: cuisine.iter().map(|c| c.to_string()).collect(),
            address: String::new(),
            city: String::new(),
            phone: String::new(),
            menu: MenuRecord::default(),
        };
        CatalogSnapshot::from_records(vec![
            record("1", "Luigi's", &["Italian"]),
            record("2", "A/B Grill", &["Italian", "American"]),
            record("3", "Wok", &["Chinese"]),
        ])
    }

    #[test]
    fn root_and_categories() {
        let snap = snapshot();
        assert_eq!(classify("/", &snap), PathClass::Root);
        assert_eq!(classify("", &snap), PathClass::Root);
        assert_eq!(classify("/Italian", &snap), PathClass::Category("Italian".into()));
        assert_eq!(classify("/Thai", &snap), PathClass::Other("Thai".into()));
    }

    #[test]
    fn restaurant_requires_membership() {
        let snap = snapshot();
        assert_eq!(
            classify("/Italian/Luigi's", &snap),
            PathClass::Restaurant {
                category: "Italian".into(),
                name: "Luigi's".into()
            }
        );
        // Wok exists, but is not Italian
        assert_eq!(classify("/Italian/Wok", &snap), PathClass::Other("Italian/Wok".into()));
        assert_eq!(classify("/Thai/Wok", &snap), PathClass::Other("Thai/Wok".into()));
    }

    #[test]
    fn substituted_slash_is_one_segment() {
        let snap = snapshot();
        assert_eq!(
            classify("/Italian/A\u{2215}B Grill", &snap),
            PathClass::Restaurant {
                category: "Italian".into(),
                name: "A\u{2215}B Grill".into()
            }
        );
        assert_eq!(
            classify("/American/A\u{2215}B Grill/menu", &snap),
            PathClass::SyntheticFile {
                category: "American".into(),
                restaurant: "A\u{2215}B Grill".into(),
                kind: SyntheticKind::Menu
            }
        );
        // The raw name would be three segments and matches nothing
        assert!(matches!(classify("/Italian/A/B Grill", &snap), PathClass::Other(_)));
    }

    #[test]
    fn menu_and_real_entries_below_restaurant() {
        let snap = snapshot();
        assert!(matches!(
            classify("/Italian/Luigi's/menu", &snap),
            PathClass::SyntheticFile { .. }
        ));
        assert_eq!(
            classify("/Italian/Luigi's/order.txt", &snap),
            PathClass::Other("Italian/Luigi's/order.txt".into())
        );
        assert_eq!(
            classify("/Italian/Luigi's/menu/x", &snap),
            PathClass::Other("Italian/Luigi's/menu/x".into())
        );
        assert!(matches!(classify("/Chinese/Luigi's/menu", &snap), PathClass::Other(_)));
    }

    #[test]
    fn trailing_and_doubled_separators_are_not_synthetic() {
        let snap = snapshot();
        assert!(matches!(classify("/Italian/", &snap), PathClass::Other(_)));
        assert!(matches!(classify("//Italian", &snap), PathClass::Other(_)));
    }

    #[test]
    fn class_predicates() {
        assert!(!PathClass::Root.is_synthetic());
        assert!(PathClass::Category("x".into()).is_synthetic_dir());
        assert!(!PathClass::Other("x".into()).is_synthetic());
    }

    #[test]
    fn path_joining_and_splitting() {
        assert_eq!(join_path("/", "Italian"), "/Italian");
        assert_eq!(join_path("/Italian", "Luigi's"), "/Italian/Luigi's");
        assert_eq!(split_parent("/Italian/Luigi's"), Some(("/Italian", "Luigi's")));
        assert_eq!(split_parent("/Italian"), Some(("/", "Italian")));
        assert_eq!(split_parent("/"), None);
    }

    proptest! {
        #[test]
        fn classify_is_total_and_deterministic(path in "(/?[A-Za-z'./ \u{2215}]{0,12}){0,5}") {
            let snap = snapshot();
            let first = classify(&path, &snap);
            let second = classify(&path, &snap);
            prop_assert_eq!(&first, &second);
            if let PathClass::Other(rel) = &first {
                prop_assert!(!rel.is_empty());
            }
        }

        #[test]
        fn synthetic_classes_name_known_entries(
            cat in prop::sample::select(vec!["Italian", "American", "Chinese", "Thai"]),
            name in prop::sample::select(vec!["Luigi's", "A\u{2215}B Grill", "Wok", "Nope"]),
        ) {
            let snap = snapshot();
            let class = classify(&format!("/{cat}/{name}"), &snap);
            let member = snap.restaurant_in(cat, name).is_some();
            prop_assert_eq!(matches!(class, PathClass::Restaurant { .. }), member);
        }
    }
}
