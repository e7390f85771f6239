//! Defines [`ContentItem`], the unit of site content, along with the logic for
//! splitting a source file into its YAML front matter and its Markdown body.
//!
//! Only three front matter fields are interpreted: `tags`, `series`, and
//! `date`. Every other key is kept verbatim in [`ContentItem::data`] and handed
//! to the templates untouched.

use std::{collections::BTreeMap, fmt, path::PathBuf};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_yaml::Value as YamlValue;

/// A single piece of site content, typically a blog post.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentItem {
    /// The path of the source file relative to the input directory.
    pub input_path: PathBuf,

    /// The site-relative URL of the rendered page, including the path prefix
    /// (e.g., `/posts/hello/`).
    pub url: String,

    /// The location of the rendered page on disk.
    pub output_path: PathBuf,

    /// The item's tags in source order. Empty when the front matter has none.
    pub tags: Vec<String>,

    /// The name of the series this item belongs to, if any.
    pub series: Option<String>,

    /// The item's date. Series members are ordered by this field.
    pub date: DateTime<Utc>,

    /// The rendered HTML body.
    pub content: String,

    /// All remaining front matter keys.
    pub data: BTreeMap<String, YamlValue>,
}

impl ContentItem {
    /// Creates an item with no tags, no series, no content, and no extra data.
    pub fn new<P: Into<PathBuf>>(input_path: P, date: DateTime<Utc>) -> ContentItem {
        ContentItem {
            input_path: input_path.into(),
            url: String::default(),
            output_path: PathBuf::default(),
            tags: Vec::new(),
            series: None,
            date,
            content: String::default(),
            data: BTreeMap::new(),
        }
    }

    /// Returns the `title` front matter value when it is a string.
    pub fn title(&self) -> Option<&str> {
        self.data.get("title").and_then(YamlValue::as_str)
    }

    /// Returns the `layout` front matter value when it is a string.
    pub fn layout(&self) -> Option<&str> {
        self.data.get("layout").and_then(YamlValue::as_str)
    }

    /// Returns true if the item carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// The parsed front matter of a source file.
#[derive(Deserialize, Default, Debug)]
pub struct Frontmatter {
    /// Either a list of strings or a single string. Anything else is treated
    /// as no tags at all.
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,

    /// The series name. Numbers are accepted and kept in their string form.
    #[serde(default, deserialize_with = "deserialize_series")]
    pub series: Option<String>,

    /// Either `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
    #[serde(default, deserialize_with = "deserialize_date")]
    pub date: Option<DateTime<Utc>>,

    /// Everything else.
    #[serde(flatten)]
    pub data: BTreeMap<String, YamlValue>,
}

fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match YamlValue::deserialize(deserializer)? {
        YamlValue::String(tag) => vec![tag],
        YamlValue::Sequence(tags) => tags
            .into_iter()
            .filter_map(|tag| match tag {
                YamlValue::String(tag) => Some(tag),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn deserialize_series<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match YamlValue::deserialize(deserializer)? {
        YamlValue::String(series) => Some(series),
        YamlValue::Number(series) => Some(series.to_string()),
        _ => None,
    })
}

fn deserialize_date<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match YamlValue::deserialize(deserializer)? {
        YamlValue::Null => Ok(None),
        YamlValue::String(date) => parse_date(&date)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date `{}`", date))),
        other => Err(D::Error::custom(format!("invalid date `{:?}`", other))),
    }
}

/// Parses a front matter date. Bare dates are taken to be midnight UTC.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Some(date.with_timezone(&Utc));
    }
    let naive = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Splits `input` into its front matter and its body. Front matter is
/// optional: a file that doesn't begin with `---` is all body.
pub fn parse(input: &str) -> Result<(Frontmatter, &str)> {
    match frontmatter_indices(input)? {
        None => Ok((Frontmatter::default(), input)),
        Some((yaml_start, yaml_stop, body_start)) => {
            let yaml = &input[yaml_start..yaml_stop];
            let frontmatter = if yaml.trim().is_empty() {
                Frontmatter::default()
            } else {
                serde_yaml::from_str(yaml)?
            };
            Ok((frontmatter, &input[body_start..]))
        }
    }
}

fn frontmatter_indices(input: &str) -> Result<Option<(usize, usize, usize)>> {
    const FENCE: &str = "---";
    if !input.starts_with(FENCE) {
        return Ok(None);
    }

    // The closing fence must start a line.
    match input[FENCE.len()..].find("\n---") {
        None => Err(Error::FrontmatterMissingEndFence),
        Some(offset) => {
            let yaml_stop = FENCE.len() + offset + 1;
            let fence_stop = yaml_stop + FENCE.len();
            let body_start = match input[fence_stop..].find('\n') {
                Some(newline) => fence_stop + newline + 1,
                None => input.len(),
            };
            Ok(Some((FENCE.len(), yaml_stop, body_start)))
        }
    }
}

/// Represents the result of parsing a source file.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a source file.
#[derive(Debug)]
pub enum Error {
    /// Returned when the opening fence (`---`) was found but the closing one
    /// was missing.
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the front matter as YAML.
    DeserializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}
