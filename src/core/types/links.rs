//! Ordered multimap from relation type to links.

use crate::core::protocol;
use crate::core::types::Link;
use std::collections::HashMap;
use url::Url;

/// All links of one representation, grouped by relation type.
///
/// Within a relation, links keep insertion order and [`Links::get`] returns
/// the first one added. Relations themselves iterate in first-seen order.
#[derive(Clone, Debug)]
pub struct Links {
    context: Url,
    store: HashMap<String, Vec<Link>>,
    order: Vec<String>,
}

impl Links {
    /// Empty set of links; `context` is the base for shorthand hrefs.
    pub fn new(context: Url) -> Self {
        Self {
            context,
            store: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn context(&self) -> &Url {
        &self.context
    }

    /// Append a link to its relation's bucket.
    pub fn add(&mut self, link: Link) {
        match self.store.get_mut(&link.rel) {
            Some(bucket) => bucket.push(link),
            None => {
                self.order.push(link.rel.clone());
                self.store.insert(link.rel.clone(), vec![link]);
            }
        }
    }

    /// Shorthand for [`Links::add`] with a relative or absolute href.
    pub fn add_rel(&mut self, rel: impl Into<String>, href: impl Into<String>) {
        let link = Link::new(rel, href, self.context.clone());
        self.add(link);
    }

    /// Replace every link of the relation with this one.
    pub fn set(&mut self, link: Link) {
        match self.store.get_mut(&link.rel) {
            Some(bucket) => {
                bucket.clear();
                bucket.push(link);
            }
            None => self.add(link),
        }
    }

    pub fn set_rel(&mut self, rel: impl Into<String>, href: impl Into<String>) {
        let link = Link::new(rel, href, self.context.clone());
        self.set(link);
    }

    /// First link added for `rel`.
    pub fn get(&self, rel: &str) -> Option<&Link> {
        self.store.get(rel).and_then(|bucket| bucket.first())
    }

    /// All links for `rel`; empty when the relation is absent.
    pub fn get_many(&self, rel: &str) -> &[Link] {
        self.store.get(rel).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline]
    pub fn has(&self, rel: &str) -> bool {
        self.store.get(rel).is_some_and(|bucket| !bucket.is_empty())
    }

    /// Remove links for `rel`.
    ///
    /// Without `href` the whole relation goes. With `href`, only links whose
    /// resolved target equals `href` resolved against this set's context.
    pub fn delete(&mut self, rel: &str, href: Option<&str>) {
        match href {
            None => {
                self.store.remove(rel);
            }
            Some(href) => {
                let Ok(target) = protocol::resolve(&self.context, href) else {
                    return;
                };
                if let Some(bucket) = self.store.get_mut(rel) {
                    bucket.retain(|link| link.resolve().map_or(true, |uri| uri != target));
                    if bucket.is_empty() {
                        self.store.remove(rel);
                    }
                }
            }
        }
        if !self.store.contains_key(rel) {
            self.order.retain(|r| r != rel);
        }
    }

    /// Every link, relation by relation.
    pub fn all(&self) -> Vec<&Link> {
        self.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.order
            .iter()
            .filter_map(|rel| self.store.get(rel))
            .flatten()
    }

    pub fn rels(&self) -> &[String] {
        &self.order
    }

    /// Number of links across all relations.
    pub fn len(&self) -> usize {
        self.store.values().map(Vec::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Extend<Link> for Links {
    fn extend<T: IntoIterator<Item = Link>>(&mut self, iter: T) {
        for link in iter {
            self.add(link);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> Links {
        Links::new(Url::parse("https://api.example.org/articles/").unwrap())
    }

    #[test]
    fn test_get_returns_first_added() {
        let mut l = links();
        l.add_rel("item", "1");
        l.add_rel("item", "2");
        assert_eq!(l.get("item").unwrap().href, "1");
        assert_eq!(l.get_many("item").len(), 2);
    }

    #[test]
    fn test_absent_relations_are_defensive() {
        let l = links();
        assert!(l.get("nope").is_none());
        assert!(l.get_many("nope").is_empty());
        assert!(!l.has("nope"));
    }

    #[test]
    fn test_set_replaces_bucket() {
        let mut l = links();
        l.add_rel("self", "a");
        l.add_rel("self", "b");
        l.set_rel("self", "c");
        assert_eq!(l.get_many("self").len(), 1);
        assert_eq!(l.get("self").unwrap().href, "c");
    }

    #[test]
    fn test_delete_whole_relation() {
        let mut l = links();
        l.add_rel("item", "1");
        l.add_rel("item", "2");
        l.delete("item", None);
        assert!(!l.has("item"));
        assert!(l.rels().is_empty());
    }

    #[test]
    fn test_delete_by_resolved_href() {
        let mut l = links();
        l.add_rel("item", "1");
        l.add_rel("item", "https://api.example.org/articles/2");
        l.delete("item", Some("/articles/2"));
        assert_eq!(l.get_many("item").len(), 1);
        assert_eq!(l.get("item").unwrap().href, "1");

        l.delete("item", Some("https://api.example.org/articles/1"));
        assert!(!l.has("item"));
    }

    #[test]
    fn test_iteration_order_and_len() {
        let mut l = links();
        l.add_rel("next", "2");
        l.add_rel("prev", "0");
        l.add_rel("next", "3");
        let hrefs: Vec<&str> = l.iter().map(|link| link.href.as_str()).collect();
        assert_eq!(hrefs, vec!["2", "3", "0"]);
        assert_eq!(l.len(), 3);
        assert_eq!(l.rels(), &["next".to_string(), "prev".to_string()]);
    }
}
