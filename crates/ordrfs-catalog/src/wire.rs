//! JSON wire format of the catalog service.
//!
//! ```text
//! {prefix}/restaurants.json        [{"id": 23, "na": "Luigi's"}, ...]
//! {prefix}/restaurants/{id}.json   {"restaurant_id": 23, "name": "Luigi's",
//!                                   "cuisine": ["Italian"], "addr": ..., "city": ...,
//!                                   "cs_contact_phone": ...,
//!                                   "menu": [{"name": "Appetizers",
//!                                             "children": [{"name", "price", "id", "descrip"}]}]}
//! ```
//!
//! Ids and prices arrive as either JSON numbers or strings.

use std::collections::BTreeSet;

use ordrfs_core::{MenuItem, MenuRecord, MenuSection, RestaurantRecord};
use serde::{Deserialize, Deserializer};

use crate::source::RestaurantSummary;

/// Label for menu entries that arrive without an enclosing section.
pub const LOOSE_ITEMS_LABEL: &str = "Menu";

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => format!("{f:.2}"),
        }
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Scalar::deserialize(d)?.into_string())
}

fn opt_scalar_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?.map(Scalar::into_string))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringList {
    List(Vec<String>),
    Joined(String),
}

/// Cuisine arrives as a list, or as one comma-separated string.
fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<StringList>::deserialize(d)? {
        Some(StringList::List(list)) => list,
        Some(StringList::Joined(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        None => Vec::new(),
    })
}

#[derive(Debug, Deserialize)]
pub struct SummaryWire {
    #[serde(deserialize_with = "scalar_string")]
    pub id: String,
    #[serde(alias = "na")]
    pub name: String,
}

impl From<SummaryWire> for RestaurantSummary {
    fn from(w: SummaryWire) -> Self {
        RestaurantSummary {
            id: w.id,
            name: w.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MenuNodeWire {
    pub name: String,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub descrip: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<MenuNodeWire>>,
}

impl MenuNodeWire {
    fn into_item(self) -> MenuItem {
        MenuItem {
            name: self.name,
            price: self.price.unwrap_or_default(),
            id: self.id.unwrap_or_default(),
            description: self.descrip.unwrap_or_default(),
        }
    }
}

/// Sections sharing a label collapse into the first one, items appended in
/// arrival order.
fn merge_section(sections: &mut Vec<MenuSection>, label: String, items: Vec<MenuItem>) {
    match sections.iter_mut().find(|s| s.label == label) {
        Some(existing) => existing.items.extend(items),
        None => sections.push(MenuSection { label, items }),
    }
}

#[derive(Debug, Deserialize)]
pub struct RestaurantDetailWire {
    #[serde(alias = "id", deserialize_with = "scalar_string")]
    pub restaurant_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "string_list")]
    pub cuisine: Vec<String>,
    #[serde(default)]
    pub addr: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, alias = "phone")]
    pub cs_contact_phone: String,
    #[serde(default)]
    pub menu: Vec<MenuNodeWire>,
}

impl From<RestaurantDetailWire> for RestaurantRecord {
    fn from(w: RestaurantDetailWire) -> Self {
        let mut sections = Vec::new();
        let mut loose = Vec::new();

        for node in w.menu {
            match node.children {
                Some(children) => merge_section(
                    &mut sections,
                    node.name,
                    children.into_iter().map(MenuNodeWire::into_item).collect(),
                ),
                None => loose.push(node.into_item()),
            }
        }
        if !loose.is_empty() {
            merge_section(&mut sections, LOOSE_ITEMS_LABEL.to_string(), loose);
        }

        RestaurantRecord {
            id: w.restaurant_id,
            name: w.name,
            cuisine: w.cuisine.into_iter().collect::<BTreeSet<_>>(),
            address: w.addr,
            city: w.city,
            phone: w.cs_contact_phone,
            menu: MenuRecord { sections },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_accept_numeric_ids_and_short_names() {
        let raw = r#"[{"id": 23, "na": "Luigi's"}, {"id": "24", "name": "Wok"}]"#;
        let rows: Vec<SummaryWire> = serde_json::from_str(raw).unwrap();
        let rows: Vec<RestaurantSummary> = rows.into_iter().map(Into::into).collect();
        assert_eq!(rows[0], RestaurantSummary { id: "23".into(), name: "Luigi's".into() });
        assert_eq!(rows[1].id, "24");
        assert_eq!(rows[1].name, "Wok");
    }

    #[test]
    fn detail_keeps_section_and_item_order() {
        let raw = r#"{
            "restaurant_id": 23,
            "name": "Luigi's",
            "cuisine": ["Italian", "Pizza"],
            "addr": "1 Main St",
            "city": "Springfield",
            "cs_contact_phone": "555-0100",
            "menu": [
                {"name": "Pizza", "children": [
                    {"name": "Margherita", "price": "12.00", "id": 201, "descrip": "classic"},
                    {"name": "Diavola", "price": 13.5, "id": "202"}
                ]},
                {"name": "Appetizers", "children": [
                    {"name": "Garlic Bread", "price": "4.50", "id": 101}
                ]},
                {"name": "Soda", "price": "2.00", "id": 900}
            ]
        }"#;
        let wire: RestaurantDetailWire = serde_json::from_str(raw).unwrap();
        let record: RestaurantRecord = wire.into();

        assert_eq!(record.id, "23");
        assert!(record.in_category("Italian"));
        assert!(record.in_category("Pizza"));
        assert_eq!(record.phone, "555-0100");

        let labels: Vec<_> = record.menu.sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["Pizza", "Appetizers", LOOSE_ITEMS_LABEL]);

        let pizza = &record.menu.sections[0].items;
        assert_eq!(pizza[0].name, "Margherita");
        assert_eq!(pizza[0].id, "201");
        assert_eq!(pizza[0].description, "classic");
        assert_eq!(pizza[1].price, "13.50");
        assert_eq!(record.menu.sections[2].items[0].name, "Soda");
    }

    #[test]
    fn repeated_section_labels_merge_into_first() {
        let raw = r#"{
            "id": 5,
            "name": "Luigi's",
            "menu": [
                {"name": "Pizza", "children": [{"name": "Margherita", "price": "12.00", "id": 1}]},
                {"name": "Drinks", "children": [{"name": "Espresso", "price": "2.50", "id": 2}]},
                {"name": "Pizza", "children": [{"name": "Diavola", "price": "14.50", "id": 3}]},
                {"name": "Water", "price": "1.00", "id": 4},
                {"name": "Menu", "children": [{"name": "Tiramisu", "price": "6.00", "id": 5}]}
            ]
        }"#;
        let record: RestaurantRecord = serde_json::from_str::<RestaurantDetailWire>(raw)
            .unwrap()
            .into();

        let labels: Vec<_> = record.menu.sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["Pizza", "Drinks", LOOSE_ITEMS_LABEL]);

        let names = |i: usize| -> Vec<&str> {
            record.menu.sections[i].items.iter().map(|it| it.name.as_str()).collect()
        };
        assert_eq!(names(0), ["Margherita", "Diavola"]);
        assert_eq!(names(2), ["Tiramisu", "Water"]);

        let rendered = String::from_utf8(record.render_menu()).unwrap();
        assert_eq!(rendered.matches("\nPizza\n").count(), 1);
    }

    #[test]
    fn detail_accepts_joined_cuisine_and_missing_fields() {
        let raw = r#"{"id": "7", "name": "Taqueria", "cuisine": "Mexican, Tex-Mex"}"#;
        let record: RestaurantRecord = serde_json::from_str::<RestaurantDetailWire>(raw)
            .unwrap()
            .into();
        assert_eq!(record.id, "7");
        assert!(record.in_category("Mexican"));
        assert!(record.in_category("Tex-Mex"));
        assert!(record.menu.sections.is_empty());
        assert_eq!(record.address, "");
    }
}
