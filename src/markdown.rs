//! Converts Markdown into HTML. Raw HTML passes through, single newlines
//! become `<br />`, bare URLs and email addresses become links, and
//! footnotes, tables, strikethrough, and task lists are enabled. Every heading
//! receives a unique `id` and a trailing permalink of the form
//! `<a class="direct-link" href="#id">#</a>`.

use linkify::{LinkFinder, LinkKind};
use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag};
use std::collections::HashSet;

/// The CSS class of heading permalinks.
pub const PERMALINK_CLASS: &str = "direct-link";

/// The text of heading permalinks.
pub const PERMALINK_SYMBOL: &str = "#";

/// Converts `markdown` to HTML, appending the result to `w`.
pub fn to_html(w: &mut String, markdown: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let events = Parser::new_ext(markdown, options).map(|ev| match ev {
        Event::SoftBreak => Event::HardBreak,
        _ => ev,
    });
    html::push_html(w, add_anchors(link_bare_urls(events).into_iter()).into_iter());
}

/// Turns URLs and email addresses in plain text into links. Text inside code
/// blocks and existing links is left alone.
fn link_bare_urls<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let finder = LinkFinder::new();
    let mut out = Vec::new();
    let mut text: Option<String> = None;
    let mut verbatim_depth = 0usize;

    for ev in events {
        if let Event::Text(s) = &ev {
            if verbatim_depth == 0 {
                // The parser may split a run of text; URLs can span the pieces.
                text.get_or_insert_with(String::new).push_str(s);
                continue;
            }
        }
        if let Some(pending) = text.take() {
            push_linked_text(&finder, &pending, &mut out);
        }
        match &ev {
            Event::Start(Tag::CodeBlock(_)) | Event::Start(Tag::Link(..)) => verbatim_depth += 1,
            Event::Html(html) if opens_anchor(html) => verbatim_depth += 1,
            Event::End(Tag::CodeBlock(_)) | Event::End(Tag::Link(..)) => {
                verbatim_depth = verbatim_depth.saturating_sub(1)
            }
            Event::Html(html) if html.trim_start().starts_with("</a") => {
                verbatim_depth = verbatim_depth.saturating_sub(1)
            }
            _ => {}
        }
        out.push(ev);
    }
    if let Some(pending) = text.take() {
        push_linked_text(&finder, &pending, &mut out);
    }
    out
}

fn opens_anchor(html: &str) -> bool {
    let html = html.trim_start();
    html.starts_with("<a ") || html.starts_with("<a>")
}

fn push_linked_text<'a>(finder: &LinkFinder, text: &str, out: &mut Vec<Event<'a>>) {
    for span in finder.spans(text) {
        let s = span.as_str().to_owned();
        let link_type = match span.kind() {
            Some(LinkKind::Url) => LinkType::Autolink,
            Some(LinkKind::Email) => LinkType::Email,
            _ => {
                out.push(Event::Text(CowStr::from(s)));
                continue;
            }
        };
        let tag = Tag::Link(link_type, CowStr::from(s.clone()), CowStr::from(""));
        out.push(Event::Start(tag.clone()));
        out.push(Event::Text(CowStr::from(s)));
        out.push(Event::End(tag));
    }
}

/// Hands out heading ids, suffixing `-1`, `-2`, ... on collisions.
#[derive(Default)]
struct HeadingIds {
    used: HashSet<String>,
}

impl HeadingIds {
    fn next(&mut self, text: &str) -> String {
        let mut base = slug::slugify(text);
        if base.is_empty() {
            base = String::from("section");
        }

        let mut id = base.clone();
        let mut suffix = 1;
        while self.used.contains(&id) {
            id = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        self.used.insert(id.clone());
        id
    }
}

/// Replaces each heading's start and end tags with raw HTML carrying an `id`
/// and a permalink. The heading's inner events are left alone.
fn add_anchors<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut ids = HeadingIds::default();
    let mut out = Vec::new();
    let mut heading: Option<(u32, Vec<Event<'a>>)> = None;

    for ev in events {
        heading = match (heading, ev) {
            (None, Event::Start(Tag::Heading(level))) => Some((level, Vec::new())),
            (Some((level, inner)), Event::End(Tag::Heading(_))) => {
                let id = ids.next(&heading_text(&inner));
                out.push(Event::Html(CowStr::from(format!(
                    "<h{} id=\"{}\">",
                    level, id
                ))));
                out.extend(inner);
                out.push(Event::Html(CowStr::from(format!(
                    " <a class=\"{}\" href=\"#{}\">{}</a></h{}>\n",
                    PERMALINK_CLASS, id, PERMALINK_SYMBOL, level
                ))));
                None
            }
            (Some((level, mut inner)), ev) => {
                inner.push(ev);
                Some((level, inner))
            }
            (None, ev) => {
                out.push(ev);
                None
            }
        };
    }
    out
}

fn heading_text(events: &[Event]) -> String {
    let mut text = String::new();
    for ev in events {
        match ev {
            Event::Text(s) | Event::Code(s) => text.push_str(s),
            _ => {}
        }
    }
    text
}
