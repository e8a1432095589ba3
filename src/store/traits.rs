use crate::model::{
    Id, NewPage, NewPageTemplate, Page, PageChanges, PageContent, PageFilter, PageMedia, PageMeta,
    PageTemplate,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[async_trait::async_trait]
pub trait PageStore: Send + Sync {
    /// Get a page by id, drafts included
    async fn get_page(&self, id: Id) -> Result<Option<Page>>;
    /// Get a published page by its stored uri
    async fn get_published_page_by_uri(&self, uri: &str) -> Result<Option<Page>>;
    /// List pages (drafts included) ordered by rank, then id
    async fn list_pages(&self, filter: &PageFilter) -> Result<Vec<Page>>;
    /// Direct children of a page, ordered by rank, then id
    async fn list_children(&self, parent_id: Id) -> Result<Vec<Page>>;
    /// Number of direct children per parent id
    async fn count_children(&self, parent_ids: &[Id]) -> Result<BTreeMap<Id, i64>>;
    /// Insert a page with rank = current max + 1, assigned atomically
    async fn insert_page(&self, page: NewPage) -> Result<Page>;
    async fn update_page(&self, id: Id, changes: PageChanges) -> Result<Option<Page>>;
    async fn set_page_uri(&self, id: Id, uri: &str) -> Result<bool>;
    async fn set_published_at(&self, id: Id, published_at: Option<DateTime<Utc>>) -> Result<bool>;
    /// Assign ranks 1..N to the given ids in order
    async fn reorder_pages(&self, ids: &[Id]) -> Result<()>;
    /// Delete a page and everything it owns; children are re-rooted
    async fn delete_page(&self, id: Id) -> Result<bool>;
    /// Ids from the list that exist
    async fn existing_page_ids(&self, ids: &[Id]) -> Result<Vec<Id>>;
}

#[async_trait::async_trait]
pub trait SlugStore: Send + Sync {
    /// True if a page other than `exclude` already uses `slug` under `parent_id`
    async fn slug_exists(&self, slug: &str, parent_id: Option<Id>, exclude: Option<Id>) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_template(&self, id: Id) -> Result<Option<PageTemplate>>;
    async fn list_templates(&self) -> Result<Vec<PageTemplate>>;
    async fn insert_template(&self, template: NewPageTemplate) -> Result<PageTemplate>;
}

#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_contents(&self, page_id: Id) -> Result<Vec<PageContent>>;
    /// Contents of many pages in one lookup; every requested id has an entry
    async fn get_contents_for(&self, page_ids: &[Id]) -> Result<BTreeMap<Id, Vec<PageContent>>>;
    /// Bulk insert content rows; an existing key is overwritten
    async fn add_contents(&self, page_id: Id, contents: Vec<PageContent>) -> Result<()>;
    async fn delete_contents(&self, page_id: Id) -> Result<()>;
}

#[async_trait::async_trait]
pub trait MetaStore: Send + Sync {
    async fn get_meta(&self, page_id: Id) -> Result<PageMeta>;
    async fn get_meta_for(&self, page_ids: &[Id]) -> Result<BTreeMap<Id, PageMeta>>;
    /// Store a value only if the key is not set yet
    async fn set_meta(&self, page_id: Id, key: &str, value: Option<String>) -> Result<()>;
    /// Upsert every provided key
    async fn sync_meta(&self, page_id: Id, meta: PageMeta) -> Result<()>;
}

#[async_trait::async_trait]
pub trait MediaStore: Send + Sync {
    async fn get_media(&self, page_id: Id) -> Result<Vec<PageMedia>>;
    async fn get_media_for(&self, page_ids: &[Id]) -> Result<BTreeMap<Id, Vec<PageMedia>>>;
    async fn attach_media(&self, page_id: Id, media: PageMedia) -> Result<()>;
    async fn detach_media(&self, page_id: Id) -> Result<()>;
}

/// The slice of the store a template handler writes to.
pub trait TemplateStorage: ContentStore + MediaStore {}
impl<T: ContentStore + MediaStore> TemplateStorage for T {}

pub trait Store:
    PageStore + SlugStore + TemplateStore + ContentStore + MetaStore + MediaStore + Send + Sync
{
}
