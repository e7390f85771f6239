//! Renders [`ContentItem`]s through their layout templates and writes the
//! resulting pages to disk.

use gtmpl::{Context, Template, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

use crate::item::ContentItem;

/// Responsible for templating and writing HTML pages to disk.
pub struct Writer<'a> {
    /// Parsed layout templates keyed by the layout name used in front matter.
    pub layouts: &'a HashMap<String, Template>,

    /// The named collections, made available to every page as `collections`.
    pub collections: &'a Value,

    /// Site metadata, made available to every page as `site`.
    pub site: &'a Value,

    /// Made available to every page as `path_prefix`, typically for building
    /// links to static assets.
    pub path_prefix: &'a str,
}

impl Writer<'_> {
    /// Renders and writes every item.
    pub fn write_items(&self, items: &[ContentItem]) -> Result<()> {
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        for item in items {
            if let Some(dir) = item.output_path.parent() {
                if seen_dirs.insert(dir.to_owned()) {
                    std::fs::create_dir_all(dir)?;
                }
            }
            self.write_item(item)?;
        }
        Ok(())
    }

    /// Takes a single [`ContentItem`], templates it, and writes it to disk.
    /// Items without a layout are written as their bare HTML content.
    fn write_item(&self, item: &ContentItem) -> Result<()> {
        match item.layout() {
            None => {
                File::create(&item.output_path)?.write_all(item.content.as_bytes())?;
            }
            Some(layout) => {
                let template = self
                    .layouts
                    .get(layout)
                    .ok_or_else(|| Error::MissingLayout(layout.to_owned()))?;
                let context = Context::from(self.page_value(item))
                    .map_err(|e| Error::Template(e.to_string()))?;
                template
                    .execute(&mut File::create(&item.output_path)?, &context)
                    .map_err(|e| Error::Template(e.to_string()))?;
            }
        }
        debug!(url = %item.url, path = %item.output_path.display(), "wrote page");
        Ok(())
    }

    /// Builds the template context for `item`: an object with fields `item`,
    /// `content`, `collections`, `site`, and `path_prefix`.
    fn page_value(&self, item: &ContentItem) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("item".to_owned(), Value::from(item));
        m.insert("content".to_owned(), Value::String(item.content.clone()));
        m.insert("collections".to_owned(), self.collections.clone());
        m.insert("site".to_owned(), self.site.clone());
        m.insert(
            "path_prefix".to_owned(),
            Value::String(self.path_prefix.to_owned()),
        );
        Value::Object(m)
    }
}

/// Returns the distinct layout names used by `items`.
pub fn layouts_used(items: &[ContentItem]) -> Vec<&str> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(ContentItem::layout)
        .filter(|layout| seen.insert(*layout))
        .collect()
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// Returned when an item names a layout that was never loaded.
    MissingLayout(String),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::MissingLayout(layout) => write!(f, "unknown layout `{}`", layout),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::MissingLayout(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_yaml::Value as YamlValue;
    use tempfile::TempDir;

    fn item(dir: &TempDir, name: &str, layout: Option<&str>) -> ContentItem {
        let mut item = ContentItem::new(
            format!("{}.md", name),
            Utc.ymd(2021, 4, 16).and_hms(0, 0, 0),
        );
        item.url = format!("/{}/", name);
        item.output_path = dir.path().join(name).join("index.html");
        item.content = String::from("<p>Hello</p>\n");
        if let Some(layout) = layout {
            item.data
                .insert("layout".to_owned(), YamlValue::String(layout.to_owned()));
        }
        item
    }

    #[test]
    fn test_layouts_used() {
        let dir = TempDir::new().unwrap();
        let items = vec![
            item(&dir, "a", Some("post")),
            item(&dir, "b", None),
            item(&dir, "c", Some("post")),
            item(&dir, "d", Some("page")),
        ];
        assert_eq!(vec!["post", "page"], layouts_used(&items));
    }

    #[test]
    fn test_write_items() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let mut template = Template::default();
        template.parse("<main>{{.item.readable_date}} {{.content}} {{.path_prefix}}</main>")?;
        let mut layouts = HashMap::new();
        layouts.insert(String::from("post"), template);

        let writer = Writer {
            layouts: &layouts,
            collections: &Value::Nil,
            site: &Value::Nil,
            path_prefix: "/",
        };
        writer.write_items(&[item(&dir, "bare", None), item(&dir, "laid-out", Some("post"))])?;

        assert_eq!(
            "<p>Hello</p>\n",
            std::fs::read_to_string(dir.path().join("bare/index.html"))?
        );
        let rendered = std::fs::read_to_string(dir.path().join("laid-out/index.html"))?;
        assert!(rendered.starts_with("<main>2021-04-16 "));
        assert!(rendered.ends_with(" /</main>"));
        Ok(())
    }

    #[test]
    fn test_missing_layout() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let layouts = HashMap::new();
        let writer = Writer {
            layouts: &layouts,
            collections: &Value::Nil,
            site: &Value::Nil,
            path_prefix: "/",
        };
        match writer.write_items(&[item(&dir, "a", Some("post"))]) {
            Err(Error::MissingLayout(layout)) => assert_eq!("post", layout),
            other => panic!("unexpected result: {:?}", other),
        }
        Ok(())
    }
}
