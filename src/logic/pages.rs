use std::collections::HashMap;

use serde_json::Value;

use crate::logic::error::{PageError, PageResult};
use crate::logic::jobs::UriJobQueue;
use crate::logic::slug::SlugGenerator;
use crate::logic::templates::TemplateRegistry;
use crate::logic::validate::{validate_page, validate_reorder};
use crate::model::{
    Id, NewPage, Page, PageChanges, PageFilter, PageMeta, PageRequest, PageResource, PageTemplate,
};
use crate::store::traits::Store;

/// Page workflows behind the admin API: validation, template delegation,
/// uri scheduling, metadata and publish state.
pub struct PageService<'a, S: Store> {
    store: &'a S,
    templates: &'a TemplateRegistry,
    jobs: &'a dyn UriJobQueue,
}

impl<'a, S: Store> PageService<'a, S> {
    pub fn new(store: &'a S, templates: &'a TemplateRegistry, jobs: &'a dyn UriJobQueue) -> Self {
        Self {
            store,
            templates,
            jobs,
        }
    }

    /// All pages including drafts, ordered by rank, with child counts.
    pub async fn index(&self, filter: &PageFilter) -> PageResult<Vec<PageResource>> {
        let pages = self.store.list_pages(filter).await?;
        let ids: Vec<Id> = pages.iter().map(|page| page.id).collect();
        let counts = self.store.count_children(&ids).await?;
        let mut meta = self.store.get_meta_for(&ids).await?;
        let mut contents = self.store.get_contents_for(&ids).await?;
        let mut media = self.store.get_media_for(&ids).await?;
        let templates: HashMap<Id, PageTemplate> = self
            .store
            .list_templates()
            .await?
            .into_iter()
            .map(|template| (template.id, template))
            .collect();

        Ok(pages
            .into_iter()
            .map(|page| {
                let id = page.id;
                let template = templates.get(&page.template_id).cloned();
                PageResource::new(
                    page,
                    template,
                    meta.remove(&id).unwrap_or_default(),
                    contents.remove(&id).unwrap_or_default(),
                    media.remove(&id).unwrap_or_default(),
                )
                .with_children_count(counts.get(&id).copied().unwrap_or(0))
            })
            .collect())
    }

    pub async fn create(&self, request: &PageRequest) -> PageResult<PageResource> {
        let input = validate_page(self.store, request, None).await?;

        let template = self.template(input.template_id).await?;
        let handler = self.templates.resolve(&template)?;
        handler.validate(request)?;

        let slug = SlugGenerator::new(self.store)
            .generate(input.slug.as_deref(), &input.title, input.parent_id, None)
            .await?;

        let mut new_page = NewPage::new(input.title, slug, input.parent_id, template.id);
        new_page.is_stand_alone = input.is_stand_alone;
        let mut page = self.store.insert_page(new_page).await?;
        log::info!("created page {} '{}' (rank {})", page.id, page.slug, page.order);

        self.jobs.dispatch(page.id);

        self.store.set_meta(page.id, "title", input.meta_title).await?;
        self.store
            .set_meta(page.id, "description", input.meta_description)
            .await?;

        handler.save(&page, request, self.store).await?;

        if input.is_published {
            self.publish(&mut page).await?;
        }

        self.resource(page).await
    }

    pub async fn show(&self, id: Id) -> PageResult<PageResource> {
        let page = self.find(id).await?;
        self.resource(page).await
    }

    pub async fn update(&self, id: Id, request: &PageRequest) -> PageResult<PageResource> {
        let page = self.find(id).await?;

        let input = validate_page(self.store, request, Some(page.id)).await?;

        let template = if page.has_fixed_template {
            self.template(page.template_id).await?
        } else {
            self.template(input.template_id).await?
        };
        let handler = self.templates.resolve(&template)?;
        handler.validate(request)?;

        let slug = if page.has_fixed_uri {
            page.slug.clone()
        } else {
            SlugGenerator::new(self.store)
                .generate(input.slug.as_deref(), &input.title, input.parent_id, Some(page.id))
                .await?
        };

        let changes = PageChanges {
            title: input.title,
            slug,
            parent_id: input.parent_id,
            template_id: template.id,
            is_stand_alone: input.is_stand_alone,
        };
        let mut page = self
            .store
            .update_page(page.id, changes)
            .await?
            .ok_or_else(|| PageError::not_found(format!("Page {}", id)))?;
        log::info!("updated page {} '{}'", page.id, page.slug);

        if !page.has_fixed_uri {
            self.jobs.dispatch(page.id);
        }

        let mut meta = PageMeta::default();
        meta.insert("title", input.meta_title);
        meta.insert("description", input.meta_description);
        self.store.sync_meta(page.id, meta).await?;

        self.store.detach_media(page.id).await?;
        self.store.delete_contents(page.id).await?;

        handler.save(&page, request, self.store).await?;

        if page.is_draft() && input.is_published {
            self.publish(&mut page).await?;
        } else if page.is_published() && !input.is_published {
            self.draft(&mut page).await?;
        }

        self.resource(page).await
    }

    /// Assign ranks 1..N in the given order. Unlisted pages keep their rank.
    pub async fn reorder(&self, pages: Option<&Value>) -> PageResult<()> {
        let ids = validate_reorder(self.store, pages).await?;
        self.store.reorder_pages(&ids).await?;
        log::info!("reordered {} pages", ids.len());
        Ok(())
    }

    /// Delete a deletable page. Missing and protected pages are both
    /// reported as not found.
    pub async fn destroy(&self, id: Id) -> PageResult<()> {
        let page = match self.store.get_page(id).await? {
            Some(page) if page.is_deletable => page,
            _ => return Err(PageError::not_found(format!("Page {}", id))),
        };

        let children = self.store.list_children(page.id).await?;
        if !self.store.delete_page(page.id).await? {
            return Err(PageError::not_found(format!("Page {}", id)));
        }
        log::info!("deleted page {} '{}'", page.id, page.uri);

        // children are re-rooted by the store, so their uris change
        for child in children {
            self.jobs.dispatch(child.id);
        }
        Ok(())
    }

    pub async fn templates(&self) -> PageResult<Vec<PageTemplate>> {
        Ok(self.store.list_templates().await?)
    }

    /// Public lookup used for rendering: published pages only.
    pub async fn find_published_by_uri(&self, uri: &str) -> PageResult<PageResource> {
        let uri = uri.trim_matches('/');
        match self.store.get_published_page_by_uri(uri).await? {
            Some(page) => self.resource(page).await,
            None => Err(PageError::not_found(format!("Page '{}'", uri))),
        }
    }

    async fn find(&self, id: Id) -> PageResult<Page> {
        self.store
            .get_page(id)
            .await?
            .ok_or_else(|| PageError::not_found(format!("Page {}", id)))
    }

    async fn template(&self, id: Id) -> PageResult<PageTemplate> {
        self.store
            .get_template(id)
            .await?
            .ok_or_else(|| PageError::not_found(format!("Template {}", id)))
    }

    async fn publish(&self, page: &mut Page) -> PageResult<()> {
        page.publish();
        self.store.set_published_at(page.id, page.published_at).await?;
        log::info!("published page {}", page.id);
        Ok(())
    }

    async fn draft(&self, page: &mut Page) -> PageResult<()> {
        page.draft();
        self.store.set_published_at(page.id, None).await?;
        log::info!("moved page {} back to draft", page.id);
        Ok(())
    }

    async fn resource(&self, page: Page) -> PageResult<PageResource> {
        let template = self.store.get_template(page.template_id).await?;
        let meta = self.store.get_meta(page.id).await?;
        let contents = self.store.get_contents(page.id).await?;
        let media = self.store.get_media(page.id).await?;
        Ok(PageResource::new(page, template, meta, contents, media))
    }
}
