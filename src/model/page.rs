use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Id, PageContent, PageMedia, PageMeta, PageTemplate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Draft,
    Published,
}

/// A stored page row. Contents, metadata and media live in their own
/// tables and are assembled into a [`PageResource`] for responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Id,
    pub title: String,
    pub slug: String,
    pub uri: String,
    pub parent_id: Option<Id>,
    pub template_id: Id,
    pub order: i64,
    pub is_stand_alone: bool,
    pub has_fixed_template: bool,
    pub has_fixed_uri: bool,
    pub is_deletable: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Full hierarchical path: the parent's stored uri joined with our slug,
    /// or the bare slug at the root or under a parent without a uri yet.
    pub fn generate_uri(&self, parent: Option<&Page>) -> String {
        match parent {
            Some(parent) if !parent.uri.is_empty() => format!("{}/{}", parent.uri, self.slug),
            _ => self.slug.clone(),
        }
    }

    pub fn status(&self) -> PublishStatus {
        if self.published_at.is_some() {
            PublishStatus::Published
        } else {
            PublishStatus::Draft
        }
    }

    pub fn is_published(&self) -> bool {
        self.status() == PublishStatus::Published
    }

    pub fn is_draft(&self) -> bool {
        self.status() == PublishStatus::Draft
    }

    pub fn publish(&mut self) {
        self.publish_at(Utc::now());
    }

    pub fn publish_at(&mut self, at: DateTime<Utc>) {
        self.published_at = Some(at);
    }

    pub fn draft(&mut self) {
        self.published_at = None;
    }
}

/// Fields needed to insert a page; the store assigns id and rank.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPage {
    pub title: String,
    pub slug: String,
    pub parent_id: Option<Id>,
    pub template_id: Id,
    pub is_stand_alone: bool,
    pub has_fixed_template: bool,
    pub has_fixed_uri: bool,
    pub is_deletable: bool,
}

impl NewPage {
    pub fn new(title: String, slug: String, parent_id: Option<Id>, template_id: Id) -> Self {
        Self {
            title,
            slug,
            parent_id,
            template_id,
            is_stand_alone: false,
            has_fixed_template: false,
            has_fixed_uri: false,
            is_deletable: true,
        }
    }
}

/// Columns an update request may change.
#[derive(Debug, Clone, PartialEq)]
pub struct PageChanges {
    pub title: String,
    pub slug: String,
    pub parent_id: Option<Id>,
    pub template_id: Id,
    pub is_stand_alone: bool,
}

/// Page as returned by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct PageResource {
    pub id: Id,
    pub title: String,
    pub slug: String,
    pub uri: String,
    pub parent_id: Option<Id>,
    pub template: Option<PageTemplate>,
    pub order: i64,
    pub is_stand_alone: bool,
    pub has_fixed_template: bool,
    pub has_fixed_uri: bool,
    pub is_deletable: bool,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub meta: PageMeta,
    pub contents: Vec<PageContent>,
    pub media: Vec<PageMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_count: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PageResource {
    pub fn new(
        page: Page,
        template: Option<PageTemplate>,
        meta: PageMeta,
        contents: Vec<PageContent>,
        media: Vec<PageMedia>,
    ) -> Self {
        Self {
            is_published: page.is_published(),
            id: page.id,
            title: page.title,
            slug: page.slug,
            uri: page.uri,
            parent_id: page.parent_id,
            template,
            order: page.order,
            is_stand_alone: page.is_stand_alone,
            has_fixed_template: page.has_fixed_template,
            has_fixed_uri: page.has_fixed_uri,
            is_deletable: page.is_deletable,
            published_at: page.published_at,
            meta,
            contents,
            media,
            children_count: None,
            created_at: page.created_at,
            updated_at: page.updated_at,
        }
    }

    pub fn with_children_count(mut self, count: i64) -> Self {
        self.children_count = Some(count);
        self
    }

    pub fn has_content(&self, key: &str) -> bool {
        has_content(&self.contents, key)
    }

    pub fn content(&self, key: &str) -> Option<&str> {
        content(&self.contents, key)
    }
}

/// A content key counts as present only when its value is non-empty.
pub fn has_content(contents: &[PageContent], key: &str) -> bool {
    contents
        .iter()
        .any(|content| content.key == key && !content.value.is_empty())
}

pub fn content<'a>(contents: &'a [PageContent], key: &str) -> Option<&'a str> {
    contents
        .iter()
        .find(|content| content.key == key && !content.value.is_empty())
        .map(|content| content.value.as_str())
}

#[cfg(test)]
pub(crate) fn test_page(id: Id, slug: &str, uri: &str, parent_id: Option<Id>) -> Page {
    let now = Utc::now();
    Page {
        id,
        title: slug.to_string(),
        slug: slug.to_string(),
        uri: uri.to_string(),
        parent_id,
        template_id: 1,
        order: id,
        is_stand_alone: false,
        has_fixed_template: false,
        has_fixed_uri: false,
        is_deletable: true,
        published_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uri_at_root() {
        let page = test_page(1, "about", "", None);
        assert_eq!(page.generate_uri(None), "about");
    }

    #[test]
    fn test_generate_uri_under_parent() {
        let parent = test_page(1, "about", "about", None);
        let child = test_page(2, "team", "", Some(1));
        assert_eq!(child.generate_uri(Some(&parent)), "about/team");

        let grandchild = test_page(3, "alice", "", Some(2));
        let child = Page {
            uri: child.generate_uri(Some(&parent)),
            ..child
        };
        assert_eq!(grandchild.generate_uri(Some(&child)), "about/team/alice");
    }

    #[test]
    fn test_generate_uri_parent_without_uri() {
        let parent = test_page(1, "about", "", None);
        let child = test_page(2, "team", "", Some(1));
        assert_eq!(child.generate_uri(Some(&parent)), "team");
    }

    #[test]
    fn test_publish_and_draft_transitions() {
        let mut page = test_page(1, "about", "about", None);
        assert_eq!(page.status(), PublishStatus::Draft);
        assert!(page.is_draft());

        page.publish();
        assert_eq!(page.status(), PublishStatus::Published);
        assert!(page.published_at.is_some());

        page.draft();
        assert_eq!(page.status(), PublishStatus::Draft);
        assert!(page.published_at.is_none());
    }

    #[test]
    fn test_content_lookup_treats_empty_as_absent() {
        let contents = vec![
            PageContent::new("body", "<p>Hello</p>"),
            PageContent::new("intro", ""),
        ];

        assert!(has_content(&contents, "body"));
        assert_eq!(content(&contents, "body"), Some("<p>Hello</p>"));
        assert!(!has_content(&contents, "intro"));
        assert_eq!(content(&contents, "intro"), None);
        assert!(!has_content(&contents, "missing"));
    }
}
