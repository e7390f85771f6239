//! Support for creating an Atom feed from the `posts` collection.

use crate::config::{Author, Site};
use crate::item::ContentItem;
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;
use std::io::Write;
use url::{ParseError as UrlParseError, Url};

/// Where the feed is written, relative to the output directory.
pub const FEED_PATH: &str = "feed/feed.xml";

/// Creates a feed for `site` from `posts` and writes the result to a
/// [`std::io::Write`]. Entries are ordered newest first.
pub fn write_feed<W: Write>(site: &Site, posts: &[&ContentItem], w: W) -> Result<()> {
    feed(site, posts)?.write_to(w)?;
    Ok(())
}

fn feed(site: &Site, posts: &[&ContentItem]) -> Result<Feed> {
    let mut entries = feed_entries(site, posts)?;
    entries.sort_by(|a, b| b.updated().cmp(a.updated()));

    let updated: DateTime<FixedOffset> = match entries.first() {
        Some(entry) => *entry.updated(),
        None => Utc::now().into(),
    };

    let mut feed = Feed::default();
    feed.set_title(Text::from(site.title.clone()));
    feed.set_id(site.url.to_string());
    feed.set_updated(updated);
    feed.set_authors(author_to_people(site.author.as_ref()));
    feed.set_links(vec![
        alternate_link(&site.url),
        self_link(&site.url.join(FEED_PATH)?),
    ]);
    feed.set_entries(entries);
    Ok(feed)
}

fn feed_entries(site: &Site, posts: &[&ContentItem]) -> Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = Vec::with_capacity(posts.len());
    for post in posts {
        let url = absolute_url(&site.url, &post.url)?;
        let date: DateTime<FixedOffset> = post.date.into();

        let mut entry = Entry::default();
        entry.set_id(url.to_string());
        entry.set_title(Text::from(post.title().unwrap_or_default().to_owned()));
        entry.set_updated(date);
        entry.set_published(Some(date));
        entry.set_authors(author_to_people(site.author.as_ref()));
        entry.set_links(vec![alternate_link(&url)]);
        entry.set_summary(Some(Text::from(post.content.clone())));
        entries.push(entry);
    }
    Ok(entries)
}

/// Joins a site-relative URL (which already carries the path prefix) onto the
/// site's absolute URL.
pub fn absolute_url(site_url: &Url, url: &str) -> Result<Url> {
    Ok(site_url.join(url)?)
}

fn alternate_link(url: &Url) -> Link {
    let mut link = Link::default();
    link.set_href(url.to_string());
    link.set_rel("alternate");
    link
}

fn self_link(url: &Url) -> Link {
    let mut link = Link::default();
    link.set_href(url.to_string());
    link.set_rel("self");
    link
}

fn author_to_people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => {
            let mut person = Person::default();
            person.set_name(author.name.clone());
            person.set_email(author.email.clone());
            vec![person]
        }
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include I/O, Atom, and URL
/// issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when a post URL can't be joined onto the site URL.
    UrlParse(UrlParseError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<UrlParseError> for Error {
    /// Converts [`UrlParseError`]s into [`Error`]. This allows us to use the
    /// `?` operator when joining URLs.
    fn from(err: UrlParseError) -> Error {
        Error::UrlParse(err)
    }
}
