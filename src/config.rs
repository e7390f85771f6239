//! Loads the project file (`runestone.yaml`) and resolves it into a
//! [`Config`]. Every key except `site.url` is optional:
//!
//! ```yaml
//! site:
//!   title: Notes
//!   url: https://example.org/
//!   author:
//!     name: Jane Doe
//! dir:
//!   input: .
//!   includes: _includes
//!   data: _data
//!   output: _site
//! resource_path: _includes/resources/
//! passthrough_copy: [img, css, CNAME]
//! path_prefix: /
//! layouts:
//!   post: layouts/post.html
//! recent_posts: 3
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "runestone.yaml";

#[derive(Deserialize)]
struct RecentPosts(usize);
impl Default for RecentPosts {
    fn default() -> Self {
        RecentPosts(3)
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct Directories {
    input: PathBuf,
    includes: PathBuf,
    data: PathBuf,
    output: PathBuf,
}

impl Default for Directories {
    fn default() -> Self {
        Directories {
            input: PathBuf::from("."),
            includes: PathBuf::from("_includes"),
            data: PathBuf::from("_data"),
            output: PathBuf::from("_site"),
        }
    }
}

fn default_resource_path() -> PathBuf {
    PathBuf::from("_includes/resources/")
}

fn default_passthrough_copy() -> Vec<PathBuf> {
    vec![
        PathBuf::from("img"),
        PathBuf::from("css"),
        PathBuf::from("CNAME"),
    ]
}

fn default_path_prefix() -> String {
    String::from("/")
}

fn default_layouts() -> HashMap<String, PathBuf> {
    let mut layouts = HashMap::new();
    layouts.insert(String::from("post"), PathBuf::from("layouts/post.html"));
    layouts
}

#[derive(Deserialize)]
struct Project {
    site: Site,

    #[serde(default)]
    dir: Directories,

    #[serde(default = "default_resource_path")]
    resource_path: PathBuf,

    #[serde(default = "default_passthrough_copy")]
    passthrough_copy: Vec<PathBuf>,

    #[serde(default = "default_path_prefix")]
    path_prefix: String,

    #[serde(default = "default_layouts")]
    layouts: HashMap<String, PathBuf>,

    #[serde(default)]
    recent_posts: RecentPosts,
}

/// Site-wide metadata, available to templates as `site`.
#[derive(Deserialize, Clone, Debug)]
pub struct Site {
    #[serde(default)]
    pub title: String,

    /// The absolute URL the site is served from.
    pub url: Url,

    #[serde(default)]
    pub author: Option<Author>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

/// The resolved configuration for a build. All paths are absolute or relative
/// to the working directory, never to the project file.
pub struct Config {
    pub site: Site,
    pub input_directory: PathBuf,
    pub includes_directory: PathBuf,
    pub data_directory: PathBuf,
    pub output_directory: PathBuf,

    /// The directory `include_raw` reads from.
    pub resource_directory: PathBuf,

    /// Files and directories, relative to the input directory, copied
    /// unchanged into the output directory.
    pub passthrough_copy: Vec<PathBuf>,

    /// Always begins and ends with `/`.
    pub path_prefix: String,

    /// Layout aliases. Values are relative to the includes directory.
    pub layouts: HashMap<String, PathBuf>,

    pub recent_posts: usize,
}

impl Config {
    /// Searches `dir` and its ancestors for the project file and loads the
    /// first one found.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory)
                .with_context(|| format!("Loading configuration from `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    /// Loads the project file at `path`. `output_directory` overrides
    /// `dir.output` when given.
    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let file = File::open(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = serde_yaml::from_reader(file)?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;
        Config::from_project(project_root, project, output_directory)
    }

    fn from_project(
        project_root: &Path,
        project: Project,
        output_directory: Option<&Path>,
    ) -> Result<Config> {
        let resolve = |path: &Path| {
            resolve_path(path).with_context(|| format!("Resolving path `{}`", path.display()))
        };
        let project_root = resolve(project_root)?;
        let input_directory = resolve(&project_root.join(&project.dir.input))?;
        Ok(Config {
            site: project.site,
            includes_directory: resolve(&input_directory.join(&project.dir.includes))?,
            data_directory: resolve(&input_directory.join(&project.dir.data))?,
            output_directory: match output_directory {
                Some(dir) => resolve(dir)?,
                None => resolve(&project_root.join(&project.dir.output))?,
            },
            input_directory,
            resource_directory: resolve(&project_root.join(&project.resource_path))?,
            passthrough_copy: project.passthrough_copy,
            path_prefix: normalize_path_prefix(&project.path_prefix),
            layouts: project.layouts,
            recent_posts: project.recent_posts.0,
        })
    }

    /// Resolves a layout name through the aliases, falling back to treating it
    /// as a path below the includes directory.
    pub fn layout_path(&self, layout: &str) -> PathBuf {
        match self.layouts.get(layout) {
            Some(path) => self.includes_directory.join(path),
            None => self.includes_directory.join(layout),
        }
    }
}

/// Resolves `path` to an absolute path with symlinks, `.` and `..` resolved.
/// Relative paths are taken against the working directory. The path doesn't
/// need to exist: its nearest existing ancestor is canonicalized and the
/// missing components are appended lexically.
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_owned()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing: Vec<Component> = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                for component in missing.iter().rev() {
                    match component {
                        Component::ParentDir => {
                            resolved.pop();
                        }
                        Component::CurDir => {}
                        other => resolved.push(other.as_os_str()),
                    }
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match (existing.parent(), existing.components().next_back()) {
                    (Some(parent), Some(last)) => {
                        missing.push(last);
                        existing = parent;
                    }
                    _ => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Normalizes leading and trailing slashes away, so `blog`, `/blog`, and
/// `/blog/` all become `/blog/`, and an empty prefix becomes `/`.
pub fn normalize_path_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::from("/")
    } else {
        format!("/{}/", trimmed)
    }
}
