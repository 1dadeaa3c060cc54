use std::collections::BTreeSet;

use crate::model::{Item, ItemType};

/// Active predicates over the item list. All of them must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Case-insensitive substring of name or content. Empty matches all.
    pub query: String,
    pub item_type: Option<ItemType>,
    /// An item matches when it carries any of these tags. Empty matches all.
    pub tag_ids: BTreeSet<String>,
}

impl ItemFilter {
    pub fn is_active(&self) -> bool {
        !self.query.is_empty() || self.item_type.is_some() || !self.tag_ids.is_empty()
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.matches_query(item) && self.matches_type(item) && self.matches_tags(item)
    }

    fn matches_query(&self, item: &Item) -> bool {
        if self.query.is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        item.name.to_lowercase().contains(&needle) || item.content.to_lowercase().contains(&needle)
    }

    fn matches_type(&self, item: &Item) -> bool {
        self.item_type.map_or(true, |t| t == item.item_type)
    }

    fn matches_tags(&self, item: &Item) -> bool {
        self.tag_ids.is_empty() || item.tags.iter().any(|t| self.tag_ids.contains(&t.id))
    }
}

/// Items passing `filter`, in their original order.
pub fn filter_items(items: &[Item], filter: &ItemFilter) -> Vec<Item> {
    items
        .iter()
        .filter(|item| filter.matches(item))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tag;

    fn tag(id: &str) -> Tag {
        Tag {
            id: id.into(),
            name: id.into(),
            color: "#000000".into(),
            is_system: false,
        }
    }

    fn item(name: &str, content: &str, item_type: ItemType, tags: &[&str]) -> Item {
        Item {
            id: name.to_lowercase(),
            name: name.into(),
            content: content.into(),
            item_type,
            created_at: String::new(),
            updated_at: String::new(),
            tags: tags.iter().map(|t| tag(t)).collect(),
        }
    }

    fn names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    fn sample() -> Vec<Item> {
        vec![
            item("Alpha", "Write tests first", ItemType::Skill, &["rust"]),
            item("Beta", "Prefer small commits", ItemType::Rule, &["git"]),
            item("Gamma", "Deploy with CARE", ItemType::Workflow, &["rust", "docker"]),
        ]
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = ItemFilter::default();
        assert!(!filter.is_active());
        assert_eq!(names(&filter_items(&sample(), &filter)), vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn query_matches_name_or_content_ignoring_case() {
        let filter = ItemFilter {
            query: "care".into(),
            ..Default::default()
        };
        assert_eq!(names(&filter_items(&sample(), &filter)), vec!["Gamma"]);

        let filter = ItemFilter {
            query: "BET".into(),
            ..Default::default()
        };
        assert_eq!(names(&filter_items(&sample(), &filter)), vec!["Beta"]);
    }

    #[test]
    fn type_filter() {
        let filter = ItemFilter {
            item_type: Some(ItemType::Rule),
            ..Default::default()
        };
        assert_eq!(names(&filter_items(&sample(), &filter)), vec!["Beta"]);
    }

    #[test]
    fn tag_filter_is_any_of() {
        let filter = ItemFilter {
            tag_ids: ["git".to_string(), "docker".to_string()].into(),
            ..Default::default()
        };
        assert_eq!(names(&filter_items(&sample(), &filter)), vec!["Beta", "Gamma"]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let filter = ItemFilter {
            query: "e".into(),
            item_type: Some(ItemType::Workflow),
            tag_ids: ["rust".to_string()].into(),
        };
        assert!(filter.is_active());
        assert_eq!(names(&filter_items(&sample(), &filter)), vec!["Gamma"]);

        let filter = ItemFilter {
            query: "tests".into(),
            item_type: Some(ItemType::Rule),
            ..Default::default()
        };
        assert!(filter_items(&sample(), &filter).is_empty());
    }
}
