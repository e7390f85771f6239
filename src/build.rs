//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: loading content
//! ([`crate::loader`]), deriving the named collections
//! ([`crate::collection`]), rendering pages ([`crate::write`]), copying
//! passthrough files, and generating the feed ([`crate::feed`]).

use crate::collection::NamedCollections;
use crate::config::{resolve_path, Config};
use crate::feed::{write_feed, Error as FeedError, FEED_PATH};
use crate::loader::{Error as LoadError, Loader};
use crate::write::{layouts_used, Error as WriteError, Writer};
use gtmpl::{Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Builds the site from a [`Config`] object.
pub fn build_site(config: &Config) -> Result<()> {
    info!(input = %config.input_directory.display(), "loading content");
    let collection = Loader::new(config).load()?;
    let named = NamedCollections::new(&collection, config.recent_posts);
    info!(
        items = collection.get_all().len(),
        tags = named.tag_list.len(),
        series = named.series_list.len(),
        "derived collections"
    );

    // Parse only the layouts something actually uses.
    let mut layouts: HashMap<String, Template> = HashMap::new();
    for layout in layouts_used(collection.get_all()) {
        layouts.insert(layout.to_owned(), parse_template(&config.layout_path(layout))?);
    }

    // Clearing an output directory that contains the sources would delete
    // them. Both paths are resolved, so `_site/..` is the project root.
    let output = resolve_path(&config.output_directory)?;
    if resolve_path(&config.input_directory)?.starts_with(&output) {
        return Err(Error::UnsafeOutputDirectory(output));
    }
    rmdir(&config.output_directory)?;
    std::fs::create_dir_all(&config.output_directory)?;

    let collections = Value::from(&named);
    let site = Value::from(&config.site);
    let writer = Writer {
        layouts: &layouts,
        collections: &collections,
        site: &site,
        path_prefix: &config.path_prefix,
    };
    writer.write_items(collection.get_all())?;
    info!(output = %config.output_directory.display(), "wrote pages");

    passthrough_copy(config)?;

    let feed_path = config.output_directory.join(FEED_PATH);
    if let Some(dir) = feed_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    write_feed(&config.site, &named.posts, File::create(&feed_path)?)?;
    info!(posts = named.posts.len(), path = %feed_path.display(), "wrote feed");

    Ok(())
}

/// Copies each passthrough entry from the input directory into the same
/// relative location in the output directory. Missing entries are skipped.
fn passthrough_copy(config: &Config) -> Result<()> {
    for relative in &config.passthrough_copy {
        let src = config.input_directory.join(relative);
        let dst = config.output_directory.join(relative);
        if src.is_dir() {
            copy_dir(&src, &dst)?;
        } else if src.is_file() {
            if let Some(dir) = dst.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::copy(&src, &dst)?;
        } else {
            warn!(path = %src.display(), "passthrough copy source not found, skipping");
        }
    }
    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    for result in WalkDir::new(src) {
        let entry = result?;
        // strip_prefix can't fail since `src` is the walk root.
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Loads the template file and parses it into a template.
fn parse_template(template_file: &Path) -> Result<Template> {
    let contents = std::fs::read_to_string(template_file).map_err(|e| {
        Error::OpenTemplateFile {
            path: template_file.to_owned(),
            err: e,
        }
    })?;

    let mut template = Template::default();
    template
        .parse(&contents)
        .map_err(|e| Error::ParseTemplate {
            path: template_file.to_owned(),
            err: e.to_string(),
        })?;
    Ok(template)
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during loading, writing,
/// cleaning the output directory, parsing template files, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during loading.
    Load(LoadError),

    /// Returned for errors writing pages to disk.
    Write(WriteError),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate { path: PathBuf, err: String },

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned when the output directory contains the input directory.
    UnsafeOutputDirectory(PathBuf),

    /// Returned for errors walking a passthrough directory.
    WalkDir(walkdir::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Load(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate { path, err } => {
                write!(f, "Parsing template file '{}': {}", path.display(), err)
            }
            Error::Feed(err) => err.fmt(f),
            Error::UnsafeOutputDirectory(path) => write!(
                f,
                "Refusing to clear output directory '{}': it contains the input directory",
                path.display()
            ),
            Error::WalkDir(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Load(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate { .. } => None,
            Error::Feed(err) => Some(err),
            Error::UnsafeOutputDirectory(_) => None,
            Error::WalkDir(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts [`walkdir::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator while copying directories.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<LoadError> for Error {
    /// Converts [`LoadError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: LoadError) -> Error {
        Error::Load(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let src = dir.path().join("img");
        std::fs::create_dir_all(src.join("icons"))?;
        std::fs::write(src.join("logo.svg"), "<svg/>")?;
        std::fs::write(src.join("icons/rss.svg"), "<svg id=\"rss\"/>")?;

        let dst = dir.path().join("out/img");
        copy_dir(&src, &dst)?;
        assert_eq!("<svg/>", std::fs::read_to_string(dst.join("logo.svg"))?);
        assert_eq!(
            "<svg id=\"rss\"/>",
            std::fs::read_to_string(dst.join("icons/rss.svg"))?
        );
        Ok(())
    }

    #[test]
    fn test_rmdir_missing_directory() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        rmdir(&dir.path().join("does-not-exist"))?;
        Ok(())
    }

    #[test]
    fn test_parse_template_missing_file() {
        match parse_template(Path::new("/nonexistent/layout.html")) {
            Err(Error::OpenTemplateFile { path, .. }) => {
                assert_eq!(PathBuf::from("/nonexistent/layout.html"), path)
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
