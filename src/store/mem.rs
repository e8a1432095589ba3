use anyhow::Result;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::model::{
    Id, NewPage, NewPageTemplate, Page, PageChanges, PageContent, PageFilter, PageMedia, PageMeta,
    PageTemplate,
};
use crate::store::traits::{
    ContentStore, MediaStore, MetaStore, PageStore, SlugStore, Store, TemplateStore,
};

#[derive(Debug, Default)]
struct MemoryState {
    next_page_id: Id,
    next_template_id: Id,
    pages: BTreeMap<Id, Page>,
    templates: BTreeMap<Id, PageTemplate>,
    contents: HashMap<Id, Vec<PageContent>>,
    meta: HashMap<Id, PageMeta>,
    media: HashMap<Id, Vec<PageMedia>>,
}

/// In-memory store for tests and local development. All state sits behind
/// one lock, so every operation is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_count(&self) -> usize {
        self.state.read().pages.len()
    }
}

fn sorted_pages<'a>(pages: impl Iterator<Item = &'a Page>) -> Vec<Page> {
    pages
        .sorted_by_key(|page| (page.order, page.id))
        .cloned()
        .collect()
}

#[async_trait::async_trait]
impl PageStore for MemoryStore {
    async fn get_page(&self, id: Id) -> Result<Option<Page>> {
        Ok(self.state.read().pages.get(&id).cloned())
    }

    async fn get_published_page_by_uri(&self, uri: &str) -> Result<Option<Page>> {
        let state = self.state.read();
        Ok(state
            .pages
            .values()
            .find(|page| page.uri == uri && page.is_published())
            .cloned())
    }

    async fn list_pages(&self, filter: &PageFilter) -> Result<Vec<Page>> {
        let state = self.state.read();
        Ok(sorted_pages(
            state.pages.values().filter(|page| filter.matches(page.parent_id)),
        ))
    }

    async fn list_children(&self, parent_id: Id) -> Result<Vec<Page>> {
        let state = self.state.read();
        Ok(sorted_pages(
            state
                .pages
                .values()
                .filter(|page| page.parent_id == Some(parent_id)),
        ))
    }

    async fn count_children(&self, parent_ids: &[Id]) -> Result<BTreeMap<Id, i64>> {
        let state = self.state.read();
        let mut counts: BTreeMap<Id, i64> = parent_ids.iter().map(|id| (*id, 0)).collect();
        for parent_id in state.pages.values().filter_map(|page| page.parent_id) {
            if let Some(count) = counts.get_mut(&parent_id) {
                *count += 1;
            }
        }
        Ok(counts)
    }

    async fn insert_page(&self, page: NewPage) -> Result<Page> {
        let mut state = self.state.write();
        state.next_page_id += 1;
        let id = state.next_page_id;
        let order = state.pages.values().map(|p| p.order).max().unwrap_or(0) + 1;
        let now = Utc::now();

        let page = Page {
            id,
            title: page.title,
            slug: page.slug,
            uri: String::new(),
            parent_id: page.parent_id,
            template_id: page.template_id,
            order,
            is_stand_alone: page.is_stand_alone,
            has_fixed_template: page.has_fixed_template,
            has_fixed_uri: page.has_fixed_uri,
            is_deletable: page.is_deletable,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        state.pages.insert(id, page.clone());
        Ok(page)
    }

    async fn update_page(&self, id: Id, changes: PageChanges) -> Result<Option<Page>> {
        let mut state = self.state.write();
        let Some(page) = state.pages.get_mut(&id) else {
            return Ok(None);
        };

        page.title = changes.title;
        page.slug = changes.slug;
        page.parent_id = changes.parent_id;
        page.template_id = changes.template_id;
        page.is_stand_alone = changes.is_stand_alone;
        page.updated_at = Utc::now();
        Ok(Some(page.clone()))
    }

    async fn set_page_uri(&self, id: Id, uri: &str) -> Result<bool> {
        let mut state = self.state.write();
        match state.pages.get_mut(&id) {
            Some(page) => {
                page.uri = uri.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_published_at(&self, id: Id, published_at: Option<DateTime<Utc>>) -> Result<bool> {
        let mut state = self.state.write();
        match state.pages.get_mut(&id) {
            Some(page) => {
                page.published_at = published_at;
                page.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reorder_pages(&self, ids: &[Id]) -> Result<()> {
        let mut state = self.state.write();
        for (rank, id) in ids.iter().enumerate() {
            if let Some(page) = state.pages.get_mut(id) {
                page.order = rank as i64 + 1;
            }
        }
        Ok(())
    }

    async fn delete_page(&self, id: Id) -> Result<bool> {
        let mut state = self.state.write();
        if state.pages.remove(&id).is_none() {
            return Ok(false);
        }

        state.contents.remove(&id);
        state.meta.remove(&id);
        state.media.remove(&id);
        for page in state.pages.values_mut() {
            if page.parent_id == Some(id) {
                page.parent_id = None;
            }
        }
        Ok(true)
    }

    async fn existing_page_ids(&self, ids: &[Id]) -> Result<Vec<Id>> {
        let state = self.state.read();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| state.pages.contains_key(id))
            .unique()
            .collect())
    }
}

#[async_trait::async_trait]
impl SlugStore for MemoryStore {
    async fn slug_exists(&self, slug: &str, parent_id: Option<Id>, exclude: Option<Id>) -> Result<bool> {
        let state = self.state.read();
        Ok(state.pages.values().any(|page| {
            page.slug == slug && page.parent_id == parent_id && Some(page.id) != exclude
        }))
    }
}

#[async_trait::async_trait]
impl TemplateStore for MemoryStore {
    async fn get_template(&self, id: Id) -> Result<Option<PageTemplate>> {
        Ok(self.state.read().templates.get(&id).cloned())
    }

    async fn list_templates(&self) -> Result<Vec<PageTemplate>> {
        let state = self.state.read();
        Ok(state
            .templates
            .values()
            .sorted_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)))
            .cloned()
            .collect())
    }

    async fn insert_template(&self, template: NewPageTemplate) -> Result<PageTemplate> {
        let mut state = self.state.write();
        state.next_template_id += 1;
        let template = PageTemplate {
            id: state.next_template_id,
            name: template.name,
            component_name: template.component_name,
            is_selectable: template.is_selectable,
            handler: template.handler,
        };
        state.templates.insert(template.id, template.clone());
        Ok(template)
    }
}

#[async_trait::async_trait]
impl ContentStore for MemoryStore {
    async fn get_contents(&self, page_id: Id) -> Result<Vec<PageContent>> {
        Ok(self
            .state
            .read()
            .contents
            .get(&page_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_contents_for(&self, page_ids: &[Id]) -> Result<BTreeMap<Id, Vec<PageContent>>> {
        let state = self.state.read();
        Ok(page_ids
            .iter()
            .map(|id| (*id, state.contents.get(id).cloned().unwrap_or_default()))
            .collect())
    }

    async fn add_contents(&self, page_id: Id, contents: Vec<PageContent>) -> Result<()> {
        let mut state = self.state.write();
        let existing = state.contents.entry(page_id).or_default();
        for content in contents {
            match existing.iter_mut().find(|c| c.key == content.key) {
                Some(current) => current.value = content.value,
                None => existing.push(content),
            }
        }
        Ok(())
    }

    async fn delete_contents(&self, page_id: Id) -> Result<()> {
        self.state.write().contents.remove(&page_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl MetaStore for MemoryStore {
    async fn get_meta(&self, page_id: Id) -> Result<PageMeta> {
        Ok(self
            .state
            .read()
            .meta
            .get(&page_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_meta_for(&self, page_ids: &[Id]) -> Result<BTreeMap<Id, PageMeta>> {
        let state = self.state.read();
        Ok(page_ids
            .iter()
            .map(|id| (*id, state.meta.get(id).cloned().unwrap_or_default()))
            .collect())
    }

    async fn set_meta(&self, page_id: Id, key: &str, value: Option<String>) -> Result<()> {
        let mut state = self.state.write();
        let meta = state.meta.entry(page_id).or_default();
        if !meta.contains_key(key) {
            meta.insert(key, value);
        }
        Ok(())
    }

    async fn sync_meta(&self, page_id: Id, meta: PageMeta) -> Result<()> {
        let mut state = self.state.write();
        let current = state.meta.entry(page_id).or_default();
        for (key, value) in meta.0 {
            current.insert(key, value);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MediaStore for MemoryStore {
    async fn get_media(&self, page_id: Id) -> Result<Vec<PageMedia>> {
        Ok(self
            .state
            .read()
            .media
            .get(&page_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_media_for(&self, page_ids: &[Id]) -> Result<BTreeMap<Id, Vec<PageMedia>>> {
        let state = self.state.read();
        Ok(page_ids
            .iter()
            .map(|id| (*id, state.media.get(id).cloned().unwrap_or_default()))
            .collect())
    }

    async fn attach_media(&self, page_id: Id, media: PageMedia) -> Result<()> {
        let mut state = self.state.write();
        let attached = state.media.entry(page_id).or_default();
        if !attached.contains(&media) {
            attached.push(media);
        }
        Ok(())
    }

    async fn detach_media(&self, page_id: Id) -> Result<()> {
        self.state.write().media.remove(&page_id);
        Ok(())
    }
}

impl Store for MemoryStore {}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_page(title: &str, parent_id: Option<Id>) -> NewPage {
        NewPage::new(title.to_string(), title.to_lowercase(), parent_id, 1)
    }

    #[tokio::test]
    async fn test_batched_lookups_cover_every_requested_page() {
        let store = MemoryStore::new();
        let about = store.insert_page(new_page("About", None)).await.unwrap();
        let team = store.insert_page(new_page("Team", None)).await.unwrap();
        store
            .add_contents(about.id, vec![PageContent::new("content", "<p>About</p>")])
            .await
            .unwrap();
        store.set_meta(team.id, "title", Some("Team".into())).await.unwrap();
        store
            .attach_media(
                about.id,
                PageMedia {
                    media_id: 7,
                    group: "image".into(),
                },
            )
            .await
            .unwrap();

        let ids = [about.id, team.id, 99];
        let contents = store.get_contents_for(&ids).await.unwrap();
        let meta = store.get_meta_for(&ids).await.unwrap();
        let media = store.get_media_for(&ids).await.unwrap();

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[&about.id].len(), 1);
        assert!(contents[&team.id].is_empty());
        assert_eq!(meta[&team.id].get("title"), Some("Team"));
        assert_eq!(meta[&about.id], PageMeta::default());
        assert_eq!(media[&about.id][0].media_id, 7);
        assert!(media[&99].is_empty());
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ranks() {
        let store = MemoryStore::new();
        let first = store.insert_page(new_page("First", None)).await.unwrap();
        let second = store.insert_page(new_page("Second", None)).await.unwrap();

        assert_eq!(first.order, 1);
        assert_eq!(second.order, 2);
        assert!(first.is_draft());

        store.reorder_pages(&[second.id]).await.unwrap();
        let third = store.insert_page(new_page("Third", None)).await.unwrap();
        assert_eq!(third.order, 2);
    }

    #[tokio::test]
    async fn test_slug_exists_is_scoped_to_siblings() {
        let store = MemoryStore::new();
        let about = store.insert_page(new_page("About", None)).await.unwrap();
        let team = store.insert_page(new_page("Team", Some(about.id))).await.unwrap();

        assert!(store.slug_exists("team", Some(about.id), None).await.unwrap());
        assert!(!store.slug_exists("team", None, None).await.unwrap());
        assert!(!store.slug_exists("team", Some(about.id), Some(team.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_cascades_and_reroots_children() {
        let store = MemoryStore::new();
        let about = store.insert_page(new_page("About", None)).await.unwrap();
        let team = store.insert_page(new_page("Team", Some(about.id))).await.unwrap();

        store
            .add_contents(about.id, vec![PageContent::new("body", "hello")])
            .await
            .unwrap();
        store.set_meta(about.id, "title", Some("About".into())).await.unwrap();

        assert!(store.delete_page(about.id).await.unwrap());
        assert!(!store.delete_page(about.id).await.unwrap());

        assert!(store.get_contents(about.id).await.unwrap().is_empty());
        assert!(store.get_meta(about.id).await.unwrap().0.is_empty());
        let team = store.get_page(team.id).await.unwrap().unwrap();
        assert_eq!(team.parent_id, None);
    }

    #[tokio::test]
    async fn test_set_meta_keeps_existing_and_sync_overwrites() {
        let store = MemoryStore::new();
        let page = store.insert_page(new_page("About", None)).await.unwrap();

        store.set_meta(page.id, "title", Some("First".into())).await.unwrap();
        store.set_meta(page.id, "title", Some("Second".into())).await.unwrap();
        assert_eq!(store.get_meta(page.id).await.unwrap().get("title"), Some("First"));

        let mut meta = PageMeta::default();
        meta.insert("title", Some("Synced".into()));
        meta.insert("description", None);
        store.sync_meta(page.id, meta).await.unwrap();

        let meta = store.get_meta(page.id).await.unwrap();
        assert_eq!(meta.get("title"), Some("Synced"));
        assert!(meta.contains_key("description"));
        assert_eq!(meta.get("description"), None);
    }
}
