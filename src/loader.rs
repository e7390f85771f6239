//! Defines the [`Loader`], which walks the input directory and turns every
//! Markdown source file into a [`ContentItem`].

use std::{
    fmt,
    fs::File,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::{
    collection::Collection,
    config::{resolve_path, Config},
    item,
    item::ContentItem,
    markdown, shortcode,
};

const MARKDOWN_EXTENSION: &str = "md";

/// Loads [`ContentItem`]s from the input directory.
pub struct Loader<'a> {
    config: &'a Config,
}

impl<'a> Loader<'a> {
    pub fn new(config: &'a Config) -> Loader<'a> {
        Loader { config }
    }

    /// Walks the input directory and loads every `.md` file, skipping hidden
    /// entries and the includes, data, and output directories. Items are
    /// ordered by date, then by source path.
    ///
    /// Each file is structured as follows:
    ///
    /// 1. Optional front matter between `---` fences
    /// 2. Markdown body, in which `{% include_raw "..." %}` tags are expanded
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// date: 2021-04-16
    /// tags: [posts, greet]
    /// layout: post
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    pub fn load(&self) -> Result<Collection> {
        let root = resolve_path(&self.config.input_directory)?;
        let excluded = [
            &self.config.includes_directory,
            &self.config.data_directory,
            &self.config.output_directory,
        ]
        .iter()
        .map(|dir| resolve_path(dir))
        .collect::<std::io::Result<Vec<PathBuf>>>()?;

        let mut items = Vec::new();
        let walker = WalkDir::new(&root)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter()
            .filter_entry(|entry| !is_excluded(entry, &excluded));

        for result in walker {
            let entry = result?;
            let is_markdown = entry
                .path()
                .extension()
                .map_or(false, |ext| ext == MARKDOWN_EXTENSION);
            if entry.file_type().is_file() && is_markdown {
                items.push(self.load_item(&root, entry.path())?);
            }
        }

        items.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.input_path.cmp(&b.input_path))
        });
        debug!(count = items.len(), input = %root.display(), "loaded content");
        Ok(Collection::new(items))
    }

    /// Loads a single item, annotating any error with the source path.
    fn load_item(&self, root: &Path, path: &Path) -> Result<ContentItem> {
        match self._load_item(root, path) {
            Ok(item) => Ok(item),
            Err(e) => Err(Error::Annotated(
                format!("loading `{}`", path.display()),
                Box::new(e),
            )),
        }
    }

    fn _load_item(&self, root: &Path, path: &Path) -> Result<ContentItem> {
        use std::io::Read;
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;

        let (frontmatter, body) = item::parse(&contents)?;
        let body = shortcode::expand(body, &self.config.resource_directory)?;

        let date = match frontmatter.date {
            Some(date) => date,
            None => DateTime::<Utc>::from(std::fs::metadata(path)?.modified()?),
        };

        // `path` always lives below `root` since it came from walking it.
        let relative = path.strip_prefix(root).unwrap_or(path);
        let (url, output_relative) = permalink(relative, &self.config.path_prefix);

        let mut item = ContentItem {
            input_path: relative.to_owned(),
            url,
            output_path: self.config.output_directory.join(output_relative),
            tags: frontmatter.tags,
            series: frontmatter.series,
            date,
            content: String::default(),
            data: frontmatter.data,
        };
        markdown::to_html(&mut item.content, &body);
        Ok(item)
    }
}

/// Skips hidden entries, `node_modules`, and the `excluded` directories. The
/// walk root is never skipped.
fn is_excluded(entry: &DirEntry, excluded: &[PathBuf]) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let hidden = entry
        .file_name()
        .to_str()
        .map_or(false, |name| name.starts_with('.') || name == "node_modules");
    hidden || excluded.iter().any(|dir| entry.path() == dir.as_path())
}

/// Maps a source path (relative to the input directory) to its URL and its
/// output path (relative to the output directory). `posts/foo.md` becomes
/// `{prefix}posts/foo/` and `posts/foo/index.html`; `posts/index.md` becomes
/// `{prefix}posts/` and `posts/index.html`.
pub fn permalink(relative: &Path, path_prefix: &str) -> (String, PathBuf) {
    let mut dir = relative.parent().map(Path::to_path_buf).unwrap_or_default();
    match relative.file_stem() {
        Some(stem) if stem != "index" => dir.push(stem),
        _ => {}
    }

    let mut url = path_prefix.to_owned();
    for component in dir.components() {
        url.push_str(&component.as_os_str().to_string_lossy());
        url.push('/');
    }
    (url, dir.join("index.html"))
}

/// Represents the result of loading content.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading content.
#[derive(Debug)]
pub enum Error {
    /// Returned when a source file's front matter is invalid.
    Item(item::Error),

    /// Returned when a shortcode can't be expanded.
    Shortcode(shortcode::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Item(err) => err.fmt(f),
            Error::Shortcode(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Item(err) => Some(err),
            Error::Shortcode(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<item::Error> for Error {
    fn from(err: item::Error) -> Error {
        Error::Item(err)
    }
}

impl From<shortcode::Error> for Error {
    fn from(err: shortcode::Error) -> Error {
        Error::Shortcode(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator while walking the input directory.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::item::parse_date;
    use std::fs;
    use tempfile::TempDir;

    fn site(dir: &Path) -> std::io::Result<Config> {
        fs::write(
            dir.join(crate::config::PROJECT_FILE),
            "site:\n  url: https://example.org/\n",
        )?;
        fs::create_dir_all(dir.join("posts"))?;
        fs::create_dir_all(dir.join("_includes/resources"))?;
        fs::create_dir_all(dir.join("_site"))?;
        fs::create_dir_all(dir.join(".git"))?;
        Config::from_project_file(&dir.join(crate::config::PROJECT_FILE), None)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    }

    #[test]
    fn test_permalink() {
        assert_eq!(
            (String::from("/posts/foo/"), PathBuf::from("posts/foo/index.html")),
            permalink(Path::new("posts/foo.md"), "/")
        );
        assert_eq!(
            (String::from("/blog/posts/"), PathBuf::from("posts/index.html")),
            permalink(Path::new("posts/index.md"), "/blog/")
        );
        assert_eq!(
            (String::from("/"), PathBuf::from("index.html")),
            permalink(Path::new("index.md"), "/")
        );
        assert_eq!(
            (String::from("/about/"), PathBuf::from("about/index.html")),
            permalink(Path::new("about.md"), "/")
        );
    }

    #[test]
    fn test_load() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let config = site(dir.path())?;
        fs::write(
            dir.path().join("_includes/resources/hello.py"),
            "print(42)\n",
        )?;
        fs::write(
            dir.path().join("posts/second.md"),
            "---\ntitle: Second\ndate: 2021-02-01\ntags: [posts, python]\n\
             series: Intro\n---\n{% include_raw \"hello.py\" %}",
        )?;
        fs::write(
            dir.path().join("posts/first.md"),
            "---\ntitle: First\ndate: 2021-01-01\ntags: posts\n---\nHello\n",
        )?;
        fs::write(dir.path().join("_includes/ignored.md"), "nope")?;
        fs::write(dir.path().join("_site/ignored.md"), "nope")?;
        fs::write(dir.path().join(".git/ignored.md"), "nope")?;

        let collection = Loader::new(&config).load()?;
        let items = collection.get_all();
        assert_eq!(2, items.len());

        let first = &items[0];
        assert_eq!(Some("First"), first.title());
        assert_eq!(PathBuf::from("posts/first.md"), first.input_path);
        assert_eq!("/posts/first/", first.url);
        assert_eq!(
            config.output_directory.join("posts/first/index.html"),
            first.output_path
        );
        assert_eq!(vec!["posts"], first.tags);
        assert_eq!(parse_date("2021-01-01").unwrap(), first.date);
        assert_eq!("<p>Hello</p>\n", first.content);

        let second = &items[1];
        assert_eq!(Some("Intro".to_owned()), second.series);
        assert!(second.content.contains("print(42)"));
        Ok(())
    }

    #[test]
    fn test_load_excludes_unnormalized_directories(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let mut config = site(dir.path())?;
        fs::write(dir.path().join("posts/kept.md"), "Kept\n")?;
        fs::write(dir.path().join("_site/ignored.md"), "nope")?;
        fs::write(dir.path().join("_includes/ignored.md"), "nope")?;
        config.output_directory = config.input_directory.join("posts/../_site");
        config.includes_directory = config.input_directory.join("./_includes/");

        let collection = Loader::new(&config).load()?;
        let paths: Vec<&Path> = collection
            .get_all()
            .iter()
            .map(|item| item.input_path.as_path())
            .collect();
        assert_eq!(vec![Path::new("posts/kept.md")], paths);
        Ok(())
    }

    #[test]
    fn test_load_without_date_uses_mtime() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let config = site(dir.path())?;
        fs::write(dir.path().join("about.md"), "About me\n")?;

        let before = Utc::now() - chrono::Duration::days(1);
        let collection = Loader::new(&config).load()?;
        let items = collection.get_all();
        assert_eq!(1, items.len());
        assert!(items[0].date > before);
        assert_eq!("/about/", items[0].url);
        Ok(())
    }

    #[test]
    fn test_load_annotates_errors() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let config = site(dir.path())?;
        fs::write(dir.path().join("posts/broken.md"), "---\ntitle: x\n")?;

        match Loader::new(&config).load() {
            Err(Error::Annotated(annotation, err)) => {
                assert!(annotation.contains("broken.md"));
                assert!(matches!(*err, Error::Item(item::Error::FrontmatterMissingEndFence)));
            }
            other => panic!("unexpected result: {:?}", other.map(|c| c.get_all().len())),
        }
        Ok(())
    }
}
