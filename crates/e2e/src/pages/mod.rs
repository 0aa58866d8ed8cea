//! Page objects for the mobile site.
//!
//! Each page borrows a [`BasePage`](crate::page::BasePage) and exposes only
//! the verbs its screen needs. Every element carries an ordered list of
//! selectors, most specific first.

mod home;
mod search;
mod streamer;

pub use home::HomePage;
pub use search::SearchPage;
pub use streamer::{parse_viewer_count, StreamerPage};

use streamprobe_common::{LocatorStrategy, Target};
use tracing::warn;

/// Build a target from CSS selectors in priority order, then XPath fallbacks
pub(crate) fn target(name: &str, css: &[&str], xpath: &[&str]) -> Target {
    let mut strategies = css
        .iter()
        .map(|s| LocatorStrategy::css(*s))
        .chain(xpath.iter().map(|s| LocatorStrategy::xpath(*s)));
    // callers always pass at least one selector
    let first = strategies
        .next()
        .unwrap_or_else(|| LocatorStrategy::css("*"));
    strategies.fold(Target::new(name, first), Target::or)
}

/// Index into a list of `len` items, falling back to the first one
pub(crate) fn pick_index(len: usize, index: usize, what: &str) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if index >= len {
        warn!("{} index {} out of range ({} found), using the first", what, index, len);
        return Some(0);
    }
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamprobe_common::LocatorKind;

    #[test]
    fn test_target_orders_css_before_xpath() {
        let t = target("x", &["#a", ".b"], &["//c"]);
        let kinds: Vec<_> = t.candidates().iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![LocatorKind::Css, LocatorKind::Css, LocatorKind::XPath]);
        assert_eq!(t.primary().value(), "#a");
    }

    #[test]
    fn test_pick_index() {
        assert_eq!(pick_index(0, 0, "card"), None);
        assert_eq!(pick_index(3, 2, "card"), Some(2));
        assert_eq!(pick_index(3, 7, "card"), Some(0));
    }
}
