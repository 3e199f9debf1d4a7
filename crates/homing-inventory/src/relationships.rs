//! Relationship traversal over inventory records.
//!
//! A record's relationship groups point at related records and may carry
//! keyed side-data. [`related_links`] extracts the entries for one
//! related-to type. "No match" and "no relationships at all" both yield
//! exactly one placeholder entry with link and value absent, so callers
//! always have a first entry to inspect.

use crate::records::{HasRelationships, Relationship};

/// One dereferenced cross-reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipLink {
    pub link: Option<String>,
    pub value: Option<String>,
}

impl RelationshipLink {
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_placeholder(&self) -> bool {
        self.link.is_none() && self.value.is_none()
    }
}

/// What to extract from each matching relationship.
#[derive(Debug, Clone, Copy)]
pub enum LinkQuery<'a> {
    /// Only the related link.
    LinkOnly,
    /// Link plus the first side-data value under `key`. Relations without
    /// that key contribute nothing.
    SearchKey(&'a str),
    /// Like `SearchKey`, but only relations whose side-data also contains
    /// `match_key = match_value` contribute.
    Matching {
        search_key: &'a str,
        match_key: &'a str,
        match_value: &'a str,
    },
}

/// Collect the links of every relationship of type `related_to`.
pub fn related_links<R: HasRelationships + ?Sized>(
    record: &R,
    related_to: &str,
    query: LinkQuery<'_>,
) -> Vec<RelationshipLink> {
    let mut found = Vec::new();
    if let Some(groups) = record.relationship_groups() {
        for rel in groups.values().flatten() {
            if rel.related_to.as_deref() != Some(related_to) {
                continue;
            }
            if let Some(entry) = extract(rel, query) {
                found.push(entry);
            }
        }
    }
    if found.is_empty() {
        found.push(RelationshipLink::placeholder());
    }
    found
}

fn extract(rel: &Relationship, query: LinkQuery<'_>) -> Option<RelationshipLink> {
    let link = rel.related_link.clone();
    match query {
        LinkQuery::LinkOnly => Some(RelationshipLink { link, value: None }),
        LinkQuery::SearchKey(key) => datum_value(rel, key).map(|value| RelationshipLink {
            link,
            value: Some(value),
        }),
        LinkQuery::Matching {
            search_key,
            match_key,
            match_value,
        } => {
            let matched = rel.relationship_data.iter().any(|d| {
                d.relationship_key.as_deref() == Some(match_key)
                    && d.relationship_value.as_deref() == Some(match_value)
            });
            matched.then(|| RelationshipLink {
                link,
                value: datum_value(rel, search_key),
            })
        }
    }
}

fn datum_value(rel: &Relationship, key: &str) -> Option<String> {
    rel.relationship_data
        .iter()
        .find(|d| d.relationship_key.as_deref() == Some(key))
        .and_then(|d| d.relationship_value.clone())
}

/// The first related link of type `related_to`, if any.
pub fn first_related_link<R: HasRelationships + ?Sized>(record: &R, related_to: &str) -> Option<String> {
    record
        .relationship_groups()?
        .values()
        .flatten()
        .find(|rel| rel.related_to.as_deref() == Some(related_to))
        .and_then(|rel| rel.related_link.clone())
}

/// True when every entry carries the same value (trivially true for 0 or 1).
pub fn group_agree(links: &[RelationshipLink]) -> bool {
    match links.split_first() {
        Some((first, rest)) => rest.iter().all(|l| l.value == first.value),
        None => true,
    }
}
