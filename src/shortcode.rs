//! Implements the `include_raw` shortcode, which pastes the contents of a file
//! below the resource directory into a post verbatim. Posts use it as
//! `{% include_raw "ansible_plugins/filter/basic.py" %}`, usually inside a
//! fenced code block.

use std::fmt;
use std::path::{Component, Path, PathBuf};

const OPEN: &str = "{%";
const CLOSE: &str = "%}";
const INCLUDE_RAW: &str = "include_raw";
const RAW: &str = "raw";
const END_RAW: &str = "endraw";

/// Reads `{resource_directory}/{path}`. `path` must be relative and may not
/// climb out of the resource directory.
pub fn include_raw(resource_directory: &Path, path: &str) -> Result<String> {
    let relative = Path::new(path);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.is_empty() || escapes {
        return Err(Error::InvalidPath(path.to_owned()));
    }

    let full_path = resource_directory.join(relative);
    std::fs::read_to_string(&full_path).map_err(|err| Error::Read {
        path: full_path,
        err,
    })
}

/// Replaces every `{% include_raw "path" %}` tag in `input` with the file's
/// contents. The markers of a `{% raw %}...{% endraw %}` block are removed and
/// its contents are copied untouched. Other `{% ... %}` tags are left as they
/// are.
pub fn expand(input: &str, resource_directory: &Path) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some((start, body, after)) = next_tag(rest) {
        let tag = tag_body(body);
        if tag == RAW {
            out.push_str(&rest[..start]);
            let (verbatim, after_raw) = split_raw(after).ok_or(Error::UnterminatedRaw)?;
            out.push_str(verbatim);
            rest = after_raw;
            continue;
        }

        match include_raw_argument(tag) {
            Some(path) => {
                out.push_str(&rest[..start]);
                out.push_str(&include_raw(resource_directory, path)?);
            }
            None => out.push_str(&rest[..rest.len() - after.len()]),
        }
        rest = after;
    }

    out.push_str(rest);
    Ok(out)
}

/// Finds the next complete `{% ... %}` tag. Returns the offset of its
/// opening delimiter, its body, and the input following it.
fn next_tag(input: &str) -> Option<(usize, &str, &str)> {
    let start = input.find(OPEN)?;
    let after_open = &input[start + OPEN.len()..];
    let end = after_open.find(CLOSE)?;
    Some((start, &after_open[..end], &after_open[end + CLOSE.len()..]))
}

/// Strips whitespace-control dashes (`{%- ... -%}`) and surrounding spaces.
fn tag_body(body: &str) -> &str {
    body.trim().trim_matches('-').trim()
}

/// Splits `input` at the first `{% endraw %}` tag into the raw contents and
/// the input following the tag.
fn split_raw(input: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    loop {
        let (start, body, after) = next_tag(&input[offset..])?;
        if tag_body(body) == END_RAW {
            return Some((&input[..offset + start], after));
        }
        offset = input.len() - after.len();
    }
}

/// Returns the quoted path of an `include_raw` tag body, or `None` if `tag` is
/// some other tag.
fn include_raw_argument(tag: &str) -> Option<&str> {
    let argument = tag.strip_prefix(INCLUDE_RAW)?.trim();
    let quote = argument.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    argument[1..].strip_suffix(quote)
}

/// The result of a shortcode operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error expanding a shortcode.
#[derive(Debug)]
pub enum Error {
    /// Returned when the requested path is empty, absolute, or contains `..`.
    InvalidPath(String),

    /// Returned when the requested file can't be read.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when a `{% raw %}` block has no `{% endraw %}`.
    UnterminatedRaw,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidPath(path) => {
                write!(f, "include_raw: invalid resource path `{}`", path)
            }
            Error::Read { path, err } => {
                write!(f, "include_raw: reading '{}': {}", path.display(), err)
            }
            Error::UnterminatedRaw => write!(f, "`{{% raw %}}` without `{{% endraw %}}`"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidPath(_) => None,
            Error::Read { path: _, err } => Some(err),
            Error::UnterminatedRaw => None,
        }
    }
}
