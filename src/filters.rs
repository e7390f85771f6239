//! Small formatting and slicing helpers exposed to templates.

use chrono::{DateTime, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats `date` for display, e.g. `2021-04-16`.
pub fn readable_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Formats `date` as a valid HTML date string, suitable for the `datetime`
/// attribute of a `<time>` element.
///
/// See <https://html.spec.whatwg.org/multipage/common-microsyntaxes.html#valid-date-string>.
pub fn html_date_string(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Returns the first `n` items, or the last `-n` items when `n` is negative.
/// Never panics: `n` is clamped to the length of `items`.
pub fn head<T>(items: &[T], n: isize) -> &[T] {
    if n < 0 {
        let count = n.unsigned_abs().min(items.len());
        &items[items.len() - count..]
    } else {
        &items[..(n as usize).min(items.len())]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_readable_date() {
        let date = Utc.ymd(2021, 4, 6).and_hms(23, 59, 59);
        assert_eq!("2021-04-06", readable_date(&date));
    }

    #[test]
    fn test_html_date_string_uses_utc() {
        // 01:30 on the 7th in UTC+2 is still the 6th in UTC.
        let date = FixedOffset::east(2 * 3600)
            .ymd(2021, 4, 7)
            .and_hms(1, 30, 0)
            .with_timezone(&Utc);
        assert_eq!("2021-04-06", html_date_string(&date));
    }

    #[test]
    fn test_head() {
        let items = [1, 2, 3, 4, 5];
        assert_eq!(&[1, 2], head(&items, 2));
        assert_eq!(&[4, 5], head(&items, -2));
        assert!(head(&items, 0).is_empty());
        assert_eq!(&items, head(&items, 10));
        assert_eq!(&items, head(&items, -10));
        assert!(head::<i32>(&[], -3).is_empty());
    }
}
