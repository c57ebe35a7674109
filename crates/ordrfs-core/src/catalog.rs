//! In-memory catalog snapshot: categories, restaurants, and menus.
//!
//! The snapshot is built once at mount time from a full catalog fetch and is
//! never mutated afterwards. A restaurant is filed under every category named
//! in its cuisine list, so the category → restaurant relation is many-to-many.
//!
//! All names stored here are filesystem-safe display names: a name can never
//! introduce an extra path segment or alias `.`/`..`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use tracing::warn;

/// Reserved name of the generated menu file inside every restaurant directory.
pub const MENU_FILE_NAME: &str = "menu";

/// Category used for restaurants that list no cuisine at all.
pub const UNCATEGORIZED: &str = "Other";

/// Stand-in for `/` in display names (U+2215 DIVISION SLASH).
pub const SLASH_SUBSTITUTE: char = '\u{2215}';

/// Stand-in for `.` when a whole name is `.` or `..` (U+2024 ONE DOT LEADER).
pub const DOT_SUBSTITUTE: char = '\u{2024}';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: String,
    pub id: String,
    pub description: String,
}

/// A labelled group of menu items ("Appetizers", "Pizza", ...).
///
/// Distinct from the top-level cuisine categories used for directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSection {
    pub label: String,
    pub items: Vec<MenuItem>,
}

/// Menu sections in the order the catalog returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuRecord {
    pub sections: Vec<MenuSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantRecord {
    pub id: String,
    pub name: String,
    pub cuisine: BTreeSet<String>,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub menu: MenuRecord,
}

impl RestaurantRecord {
    /// Returns true if this restaurant is filed under `category`.
    pub fn in_category(&self, category: &str) -> bool {
        self.cuisine.contains(category)
    }

    /// Render the menu file contents.
    ///
    /// Header lines, a blank line, then each section label followed by one
    /// indented line per item. Output is a pure function of the record.
    pub fn render_menu(&self) -> Vec<u8> {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(out, "Id: {}", self.id);
        let _ = writeln!(out, "Phone: {}", self.phone);
        let _ = writeln!(out, "Address: {}", self.address);
        let _ = writeln!(out, "City: {}", self.city);

        for section in &self.menu.sections {
            out.push('\n');
            let _ = writeln!(out, "{}", section.label);
            for item in &section.items {
                let _ = writeln!(out, "    {} - {} [{}]", item.name, item.price, item.id);
            }
        }
        out.into_bytes()
    }
}

/// Make `raw` usable as a single path component.
///
/// `/` becomes [`SLASH_SUBSTITUTE`], NUL bytes are dropped, and names that are
/// exactly `.` or `..` have their dots replaced by [`DOT_SUBSTITUTE`]. An
/// empty input stays empty; callers pick their own fallback.
pub fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| if c == '/' { SLASH_SUBSTITUTE } else { c })
        .collect();

    if cleaned == "." || cleaned == ".." {
        cleaned.chars().map(|_| DOT_SUBSTITUTE).collect()
    } else {
        cleaned
    }
}

/// Immutable catalog view shared by the classifier and synthesizer.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    categories: BTreeMap<String, BTreeSet<String>>,
    restaurants: HashMap<String, RestaurantRecord>,
}

impl CatalogSnapshot {
    /// Build a snapshot from raw restaurant records.
    ///
    /// Restaurant and cuisine names are sanitised before insertion, so the
    /// stored `name` of each record is its directory name. A later record
    /// whose name collides with an earlier one gets ` #{id}` appended.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RestaurantRecord>,
    {
        let mut snapshot = CatalogSnapshot::default();

        for mut record in records {
            let mut name = sanitize_name(record.name.trim());
            if name.is_empty() {
                name = sanitize_name(&format!("restaurant-{}", record.id));
            }
            if snapshot.restaurants.contains_key(&name) {
                let base = name.clone();
                name = sanitize_name(&format!("{base} #{}", record.id));
                let mut n = 2;
                while snapshot.restaurants.contains_key(&name) {
                    name = sanitize_name(&format!("{base} #{}-{n}", record.id));
                    n += 1;
                }
                warn!(original = %base, renamed = %name, "duplicate restaurant name");
            }

            let mut cuisine: BTreeSet<String> = record
                .cuisine
                .iter()
                .map(|c| sanitize_name(c.trim()))
                .filter(|c| !c.is_empty())
                .collect();
            if cuisine.is_empty() {
                cuisine.insert(UNCATEGORIZED.to_string());
            }

            for category in &cuisine {
                snapshot
                    .categories
                    .entry(category.clone())
                    .or_default()
                    .insert(name.clone());
            }

            record.name = name.clone();
            record.cuisine = cuisine;
            snapshot.restaurants.insert(name, record);
        }

        snapshot
    }

    /// Category names in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn is_category(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// Names of the restaurants filed under `category`, sorted.
    pub fn restaurants_in(&self, category: &str) -> impl Iterator<Item = &str> {
        self.categories
            .get(category)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    /// Look up a restaurant by display name.
    pub fn restaurant(&self, name: &str) -> Option<&RestaurantRecord> {
        self.restaurants.get(name)
    }

    /// Look up a restaurant that is actually filed under `category`.
    ///
    /// Membership comes from the record's cuisine set, not from the fact
    /// that the two names happen to appear together in a path.
    pub fn restaurant_in(&self, category: &str, name: &str) -> Option<&RestaurantRecord> {
        self.restaurants
            .get(name)
            .filter(|record| record.in_category(category))
    }

    /// All restaurants, in no particular order.
    pub fn restaurants(&self) -> impl Iterator<Item = &RestaurantRecord> {
        self.restaurants.values()
    }

    pub fn restaurant_count(&self) -> usize {
        self.restaurants.len()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restaurants.is_empty()
    }
}
