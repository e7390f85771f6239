//! Conversions from content items and collections into [`Value`]s for
//! templating.

use gtmpl_value::Value;
use serde_yaml::Value as YamlValue;
use std::collections::HashMap;

use crate::collection::{is_reserved_tag, NamedCollections, SeriesGroup};
use crate::config::Site;
use crate::filters::{html_date_string, readable_date};
use crate::item::ContentItem;

impl From<&ContentItem> for Value {
    /// Converts a [`ContentItem`] into a [`Value::Object`]. `tags` holds only
    /// user-facing tags; `all_tags` holds every tag, reserved ones included.
    fn from(item: &ContentItem) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("url".to_owned(), Value::String(item.url.clone()));
        m.insert(
            "input_path".to_owned(),
            Value::String(item.input_path.display().to_string()),
        );
        m.insert("date".to_owned(), Value::String(item.date.to_rfc3339()));
        m.insert(
            "readable_date".to_owned(),
            Value::String(readable_date(&item.date)),
        );
        m.insert(
            "html_date".to_owned(),
            Value::String(html_date_string(&item.date)),
        );
        m.insert(
            "title".to_owned(),
            match item.title() {
                Some(title) => Value::String(title.to_owned()),
                None => Value::Nil,
            },
        );
        m.insert(
            "tags".to_owned(),
            strings(item.tags.iter().filter(|tag| !is_reserved_tag(tag))),
        );
        m.insert("all_tags".to_owned(), strings(item.tags.iter()));
        m.insert(
            "series".to_owned(),
            match &item.series {
                Some(series) => Value::String(series.clone()),
                None => Value::Nil,
            },
        );
        m.insert("content".to_owned(), Value::String(item.content.clone()));
        m.insert(
            "data".to_owned(),
            Value::Object(
                item.data
                    .iter()
                    .map(|(k, v)| (k.clone(), yaml_to_value(v)))
                    .collect(),
            ),
        );
        Value::Object(m)
    }
}

impl From<&SeriesGroup<'_>> for Value {
    /// Converts a [`SeriesGroup`] into a [`Value::Object`] with fields `name`
    /// and `items`.
    fn from(group: &SeriesGroup) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("name".to_owned(), Value::String(group.name.clone()));
        m.insert("items".to_owned(), items(&group.items));
        Value::Object(m)
    }
}

impl From<&NamedCollections<'_>> for Value {
    /// Exposes the named collections under the names templates use:
    /// `all`, `posts`, `recentPosts`, `tagList`, `seriesList`, and `byTag`.
    fn from(collections: &NamedCollections) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert(
            "all".to_owned(),
            Value::Array(collections.all.iter().map(Value::from).collect()),
        );
        m.insert("posts".to_owned(), items(&collections.posts));
        m.insert("recentPosts".to_owned(), items(&collections.recent_posts));
        m.insert("tagList".to_owned(), strings(collections.tag_list.iter()));
        m.insert(
            "seriesList".to_owned(),
            Value::Array(collections.series_list.iter().map(Value::from).collect()),
        );
        m.insert(
            "byTag".to_owned(),
            Value::Object(
                collections
                    .by_tag
                    .iter()
                    .map(|(tag, tagged)| (tag.clone(), items(tagged)))
                    .collect(),
            ),
        );
        Value::Object(m)
    }
}

impl From<&Site> for Value {
    fn from(site: &Site) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(site.title.clone()));
        m.insert("url".to_owned(), Value::String(site.url.to_string()));
        m.insert(
            "author".to_owned(),
            match &site.author {
                Some(author) => Value::String(author.name.clone()),
                None => Value::Nil,
            },
        );
        Value::Object(m)
    }
}

fn items(items: &[&ContentItem]) -> Value {
    Value::Array(items.iter().map(|item| Value::from(*item)).collect())
}

fn strings<'a>(strings: impl Iterator<Item = &'a String>) -> Value {
    Value::Array(strings.map(|s| Value::String(s.clone())).collect())
}

/// Converts front matter values. Numbers are exposed in their string form and
/// mappings with non-string keys drop those keys.
pub fn yaml_to_value(value: &YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Nil,
        YamlValue::Bool(b) => Value::Bool(*b),
        YamlValue::Number(n) => Value::String(n.to_string()),
        YamlValue::String(s) => Value::String(s.clone()),
        YamlValue::Sequence(seq) => Value::Array(seq.iter().map(yaml_to_value).collect()),
        YamlValue::Mapping(mapping) => Value::Object(
            mapping
                .iter()
                .filter_map(|(k, v)| k.as_str().map(|k| (k.to_owned(), yaml_to_value(v))))
                .collect(),
        ),
    }
}
