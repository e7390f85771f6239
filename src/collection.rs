//! The derived views over the full set of content items: the tag list and the
//! series list, plus the generic [`group_by`] helper they are built on. These
//! are recomputed from scratch on every build and never fail; items missing a
//! field simply don't contribute to the views that need it.

use indexmap::{IndexMap, IndexSet};
use std::hash::Hash;

use crate::filters::head;
use crate::item::ContentItem;

/// Tags with structural meaning (navigation, the posts collection, layout
/// selection). They never show up in user-facing tag listings. Anything that
/// lists an item's tags must filter through [`is_reserved_tag`].
pub const RESERVED_TAGS: [&str; 4] = ["all", "nav", "post", "posts"];

/// The tag that puts an item in the `posts` collection.
pub const POSTS_TAG: &str = "posts";

/// Returns true if `tag` is one of [`RESERVED_TAGS`].
pub fn is_reserved_tag(tag: &str) -> bool {
    RESERVED_TAGS.contains(&tag)
}

/// The deduplicated user-facing tags, in the order they were first seen.
pub type TagList = IndexSet<String>;

/// A named series and its members, oldest first.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesGroup<'a> {
    pub name: String,
    pub items: Vec<&'a ContentItem>,
}

/// All content items for one build.
#[derive(Clone, Debug, Default)]
pub struct Collection {
    items: Vec<ContentItem>,
}

impl Collection {
    pub fn new(items: Vec<ContentItem>) -> Collection {
        Collection { items }
    }

    /// Returns every item, in load order.
    pub fn get_all(&self) -> &[ContentItem] {
        &self.items
    }

    /// Returns the items carrying `tag`, in load order.
    pub fn get_filtered_by_tag(&self, tag: &str) -> Vec<&ContentItem> {
        self.items.iter().filter(|item| item.has_tag(tag)).collect()
    }
}

/// Buckets `items` by `key`. Buckets appear in the order their key was first
/// produced, and each bucket keeps the input order of its members.
pub fn group_by<T, K, F>(items: impl IntoIterator<Item = T>, mut key: F) -> IndexMap<K, Vec<T>>
where
    K: Hash + Eq,
    F: FnMut(&T) -> K,
{
    let mut groups: IndexMap<K, Vec<T>> = IndexMap::new();
    for item in items {
        groups.entry(key(&item)).or_default().push(item);
    }
    groups
}

/// Collects every non-reserved tag across `items`.
pub fn collect_tags(items: &[ContentItem]) -> TagList {
    let mut tags = TagList::new();
    for item in items {
        for tag in item.tags.iter().filter(|tag| !is_reserved_tag(tag)) {
            tags.insert(tag.clone());
        }
    }
    tags
}

/// Groups the items that belong to a series by series name. Groups appear in
/// first-encounter order. Members are sorted by date with a stable sort, so
/// members sharing a date keep their input order.
pub fn group_by_series(items: &[ContentItem]) -> Vec<SeriesGroup<'_>> {
    group_by(
        items
            .iter()
            .filter_map(|item| item.series.as_deref().map(|name| (name, item))),
        |(name, _)| *name,
    )
    .into_iter()
    .map(|(name, members)| {
        let mut items: Vec<&ContentItem> = members.into_iter().map(|(_, item)| item).collect();
        items.sort_by(|a, b| a.date.cmp(&b.date));
        SeriesGroup {
            name: name.to_owned(),
            items,
        }
    })
    .collect()
}

/// The named views handed to templates.
pub struct NamedCollections<'a> {
    /// Every item.
    pub all: &'a [ContentItem],

    /// Items tagged [`POSTS_TAG`], oldest first.
    pub posts: Vec<&'a ContentItem>,

    /// The last few posts.
    pub recent_posts: Vec<&'a ContentItem>,

    pub tag_list: TagList,

    pub series_list: Vec<SeriesGroup<'a>>,

    /// The items for every tag in `tag_list`.
    pub by_tag: IndexMap<String, Vec<&'a ContentItem>>,
}

impl<'a> NamedCollections<'a> {
    /// Derives all named views from `collection`. `recent_posts` is the
    /// number of posts kept in [`NamedCollections::recent_posts`].
    pub fn new(collection: &'a Collection, recent_posts: usize) -> NamedCollections<'a> {
        let all = collection.get_all();
        let posts = collection.get_filtered_by_tag(POSTS_TAG);
        let recent_count = -(recent_posts.min(isize::MAX as usize) as isize);
        let recent_posts = head(&posts, recent_count).to_vec();
        let tag_list = collect_tags(all);
        let by_tag = tag_list
            .iter()
            .map(|tag| (tag.clone(), collection.get_filtered_by_tag(tag)))
            .collect();

        NamedCollections {
            all,
            posts,
            recent_posts,
            series_list: group_by_series(all),
            tag_list,
            by_tag,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(n: u32) -> DateTime<Utc> {
        Utc.ymd(2021, 1, n).and_hms(0, 0, 0)
    }

    fn tagged(path: &str, tags: &[&str]) -> ContentItem {
        let mut item = ContentItem::new(path, day(1));
        item.tags = tags.iter().map(|t| t.to_string()).collect();
        item
    }

    fn in_series(path: &str, series: &str, date: u32) -> ContentItem {
        let mut item = ContentItem::new(path, day(date));
        item.series = Some(series.to_owned());
        item
    }

    fn paths(items: &[&ContentItem]) -> Vec<String> {
        items
            .iter()
            .map(|item| item.input_path.display().to_string())
            .collect()
    }

    #[test]
    fn test_collect_tags_example() {
        let items = vec![
            tagged("1.md", &["a", "post"]),
            tagged("2.md", &["b", "all"]),
            tagged("3.md", &["a"]),
        ];
        let tags = collect_tags(&items);
        let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
        assert_eq!(vec!["a", "b"], tags);
    }

    #[test]
    fn test_collect_tags_excludes_every_reserved_name() {
        let items = vec![
            tagged("1.md", &["all", "nav", "post", "posts"]),
            tagged("2.md", &["posts", "rust", "nav"]),
            tagged("3.md", &["posts"]),
        ];
        let tags = collect_tags(&items);
        for reserved in RESERVED_TAGS.iter() {
            assert!(!tags.contains(*reserved), "{} leaked", reserved);
        }
        assert_eq!(1, tags.len());
        assert!(tags.contains("rust"));
    }

    #[test]
    fn test_collect_tags_is_complete_and_deduplicated() {
        let items = vec![
            tagged("1.md", &["ansible", "python"]),
            tagged("2.md", &[]),
            tagged("3.md", &["python", "azure", "ansible"]),
        ];
        let tags = collect_tags(&items);
        let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
        assert_eq!(vec!["ansible", "python", "azure"], tags);
    }

    #[test]
    fn test_collect_tags_is_repeatable() {
        let items = vec![tagged("1.md", &["b", "a"]), tagged("2.md", &["c"])];
        assert_eq!(collect_tags(&items), collect_tags(&items));
    }

    #[test]
    fn test_group_by_series_example() {
        let items = vec![
            in_series("s2.md", "S", 2),
            in_series("s1.md", "S", 1),
            in_series("t5.md", "T", 5),
        ];
        let groups = group_by_series(&items);
        assert_eq!(2, groups.len());
        assert_eq!("S", groups[0].name);
        assert_eq!(vec!["s1.md", "s2.md"], paths(&groups[0].items));
        assert_eq!("T", groups[1].name);
        assert_eq!(vec!["t5.md"], paths(&groups[1].items));
    }

    #[test]
    fn test_group_by_series_partitions_series_items() {
        let mut items = vec![
            in_series("a.md", "A", 3),
            tagged("loose.md", &["rust"]),
            in_series("b.md", "B", 1),
            in_series("a2.md", "A", 2),
            ContentItem::new("bare.md", day(4)),
        ];
        items.push(in_series("b2.md", "B", 9));

        let groups = group_by_series(&items);
        let mut members: Vec<String> = groups
            .iter()
            .flat_map(|group| paths(&group.items))
            .collect();
        members.sort();
        assert_eq!(vec!["a.md", "a2.md", "b.md", "b2.md"], members);

        for group in &groups {
            for pair in group.items.windows(2) {
                assert!(pair[0].date <= pair[1].date);
            }
        }
    }

    #[test]
    fn test_group_by_series_keeps_input_order_for_equal_dates() {
        let items = vec![
            in_series("first.md", "S", 7),
            in_series("second.md", "S", 7),
            in_series("earlier.md", "S", 3),
        ];
        let groups = group_by_series(&items);
        assert_eq!(
            vec!["earlier.md", "first.md", "second.md"],
            paths(&groups[0].items)
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(collect_tags(&[]).is_empty());
        assert!(group_by_series(&[]).is_empty());
    }

    #[test]
    fn test_group_by_preserves_key_and_member_order() {
        let groups = group_by(vec![5, 2, 8, 3, 9], |n| n % 3);
        let keys: Vec<i32> = groups.keys().copied().collect();
        assert_eq!(vec![2, 0], keys);
        assert_eq!(vec![5, 2, 8], groups[&2]);
        assert_eq!(vec![3, 9], groups[&0]);
        assert!(!groups.contains_key(&1));
    }

    #[test]
    fn test_named_collections() {
        let mut first = tagged("first.md", &["posts", "rust"]);
        first.date = day(1);
        let mut second = tagged("second.md", &["posts"]);
        second.date = day(2);
        let mut third = tagged("third.md", &["posts", "rust"]);
        third.date = day(3);
        let about = tagged("about.md", &["nav"]);
        let collection = Collection::new(vec![first, second, third, about]);

        let named = NamedCollections::new(&collection, 2);
        assert_eq!(4, named.all.len());
        assert_eq!(
            vec!["first.md", "second.md", "third.md"],
            paths(&named.posts)
        );
        assert_eq!(vec!["second.md", "third.md"], paths(&named.recent_posts));
        assert_eq!(1, named.tag_list.len());
        assert_eq!(vec!["first.md", "third.md"], paths(&named.by_tag["rust"]));
        assert!(named.series_list.is_empty());
    }
}
