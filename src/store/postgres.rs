use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use std::collections::BTreeMap;

use crate::model::{
    Id, NewPage, NewPageTemplate, Page, PageChanges, PageContent, PageFilter, PageMedia, PageMeta,
    PageTemplate, ParentFilter,
};
use crate::store::traits::{
    ContentStore, MediaStore, MetaStore, PageStore, SlugStore, Store, TemplateStore,
};

/// Advisory lock key serialising rank assignment on insert
const PAGE_RANK_LOCK: i64 = 0x7061_6765_7261_6e6b;

const PAGE_COLUMNS: &str = "id, title, slug, uri, parent_id, template_id, sort_order, \
     is_stand_alone, has_fixed_template, has_fixed_uri, is_deletable, published_at, \
     created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn page_from_row(row: &PgRow) -> Page {
    Page {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        uri: row.get("uri"),
        parent_id: row.get("parent_id"),
        template_id: row.get("template_id"),
        order: row.get("sort_order"),
        is_stand_alone: row.get("is_stand_alone"),
        has_fixed_template: row.get("has_fixed_template"),
        has_fixed_uri: row.get("has_fixed_uri"),
        is_deletable: row.get("is_deletable"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn template_from_row(row: &PgRow) -> PageTemplate {
    PageTemplate {
        id: row.get("id"),
        name: row.get("name"),
        component_name: row.get("component_name"),
        is_selectable: row.get("is_selectable"),
        handler: row.get("handler"),
    }
}

#[async_trait::async_trait]
impl PageStore for PostgresStore {
    async fn get_page(&self, id: Id) -> Result<Option<Page>> {
        let row = sqlx::query(&format!("SELECT {} FROM pages WHERE id = $1", PAGE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch page")?;

        Ok(row.as_ref().map(page_from_row))
    }

    async fn get_published_page_by_uri(&self, uri: &str) -> Result<Option<Page>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM pages WHERE uri = $1 AND published_at IS NOT NULL AND published_at <= NOW() \
             ORDER BY id LIMIT 1",
            PAGE_COLUMNS
        ))
        .bind(uri)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch page by uri")?;

        Ok(row.as_ref().map(page_from_row))
    }

    async fn list_pages(&self, filter: &PageFilter) -> Result<Vec<Page>> {
        let rows = match filter.parent {
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM pages ORDER BY sort_order, id",
                    PAGE_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
            Some(ParentFilter::Root) => {
                sqlx::query(&format!(
                    "SELECT {} FROM pages WHERE parent_id IS NULL ORDER BY sort_order, id",
                    PAGE_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
            Some(ParentFilter::Parent(parent_id)) => {
                sqlx::query(&format!(
                    "SELECT {} FROM pages WHERE parent_id = $1 ORDER BY sort_order, id",
                    PAGE_COLUMNS
                ))
                .bind(parent_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to list pages")?;

        Ok(rows.iter().map(page_from_row).collect())
    }

    async fn list_children(&self, parent_id: Id) -> Result<Vec<Page>> {
        self.list_pages(&PageFilter {
            parent: Some(ParentFilter::Parent(parent_id)),
        })
        .await
    }

    async fn count_children(&self, parent_ids: &[Id]) -> Result<BTreeMap<Id, i64>> {
        let rows = sqlx::query(
            "SELECT parent_id, COUNT(*) AS children_count FROM pages \
             WHERE parent_id = ANY($1) GROUP BY parent_id",
        )
        .bind(parent_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to count page children")?;

        let mut counts: BTreeMap<Id, i64> = parent_ids.iter().map(|id| (*id, 0)).collect();
        for row in rows {
            counts.insert(row.get("parent_id"), row.get("children_count"));
        }
        Ok(counts)
    }

    async fn insert_page(&self, page: NewPage) -> Result<Page> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(PAGE_RANK_LOCK)
            .execute(&mut *tx)
            .await
            .context("Failed to acquire page rank lock")?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO pages (title, slug, parent_id, template_id, sort_order, is_stand_alone,
                               has_fixed_template, has_fixed_uri, is_deletable)
            SELECT $1, $2, $3, $4, COALESCE(MAX(sort_order), 0) + 1, $5, $6, $7, $8 FROM pages
            RETURNING {}
            "#,
            PAGE_COLUMNS
        ))
        .bind(&page.title)
        .bind(&page.slug)
        .bind(page.parent_id)
        .bind(page.template_id)
        .bind(page.is_stand_alone)
        .bind(page.has_fixed_template)
        .bind(page.has_fixed_uri)
        .bind(page.is_deletable)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert page")?;

        tx.commit().await.context("Failed to commit page insert")?;

        Ok(page_from_row(&row))
    }

    async fn update_page(&self, id: Id, changes: PageChanges) -> Result<Option<Page>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE pages SET
                title = $2,
                slug = $3,
                parent_id = $4,
                template_id = $5,
                is_stand_alone = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PAGE_COLUMNS
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.slug)
        .bind(changes.parent_id)
        .bind(changes.template_id)
        .bind(changes.is_stand_alone)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update page")?;

        Ok(row.as_ref().map(page_from_row))
    }

    async fn set_page_uri(&self, id: Id, uri: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE pages SET uri = $2 WHERE id = $1")
            .bind(id)
            .bind(uri)
            .execute(&self.pool)
            .await
            .context("Failed to update page uri")?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_published_at(&self, id: Id, published_at: Option<DateTime<Utc>>) -> Result<bool> {
        let result =
            sqlx::query("UPDATE pages SET published_at = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(published_at)
                .execute(&self.pool)
                .await
                .context("Failed to update page publish state")?;

        Ok(result.rows_affected() > 0)
    }

    async fn reorder_pages(&self, ids: &[Id]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for (rank, id) in ids.iter().enumerate() {
            sqlx::query("UPDATE pages SET sort_order = $2 WHERE id = $1")
                .bind(id)
                .bind(rank as i64 + 1)
                .execute(&mut *tx)
                .await
                .context("Failed to reorder page")?;
        }

        tx.commit().await.context("Failed to commit page reorder")?;
        Ok(())
    }

    async fn delete_page(&self, id: Id) -> Result<bool> {
        // contents, meta and media cascade; children are re-rooted by the FK
        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete page")?;

        Ok(result.rows_affected() > 0)
    }

    async fn existing_page_ids(&self, ids: &[Id]) -> Result<Vec<Id>> {
        let rows = sqlx::query("SELECT id FROM pages WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .context("Failed to check page ids")?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }
}

#[async_trait::async_trait]
impl SlugStore for PostgresStore {
    async fn slug_exists(&self, slug: &str, parent_id: Option<Id>, exclude: Option<Id>) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM pages
                WHERE slug = $1
                  AND parent_id IS NOT DISTINCT FROM $2
                  AND id <> $3
            ) AS taken
            "#,
        )
        .bind(slug)
        .bind(parent_id)
        .bind(exclude.unwrap_or(0))
        .fetch_one(&self.pool)
        .await
        .context("Failed to check slug")?;

        Ok(row.get("taken"))
    }
}

#[async_trait::async_trait]
impl TemplateStore for PostgresStore {
    async fn get_template(&self, id: Id) -> Result<Option<PageTemplate>> {
        let row = sqlx::query(
            "SELECT id, name, component_name, is_selectable, handler FROM page_templates WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch page template")?;

        Ok(row.as_ref().map(template_from_row))
    }

    async fn list_templates(&self) -> Result<Vec<PageTemplate>> {
        let rows = sqlx::query(
            "SELECT id, name, component_name, is_selectable, handler FROM page_templates ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list page templates")?;

        Ok(rows.iter().map(template_from_row).collect())
    }

    async fn insert_template(&self, template: NewPageTemplate) -> Result<PageTemplate> {
        let row = sqlx::query(
            r#"
            INSERT INTO page_templates (name, component_name, is_selectable, handler)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, component_name, is_selectable, handler
            "#,
        )
        .bind(&template.name)
        .bind(&template.component_name)
        .bind(template.is_selectable)
        .bind(&template.handler)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert page template")?;

        Ok(template_from_row(&row))
    }
}

#[async_trait::async_trait]
impl ContentStore for PostgresStore {
    async fn get_contents(&self, page_id: Id) -> Result<Vec<PageContent>> {
        let rows = sqlx::query("SELECT key, value FROM page_contents WHERE page_id = $1 ORDER BY id")
            .bind(page_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch page contents")?;

        Ok(rows
            .iter()
            .map(|row| PageContent {
                key: row.get("key"),
                value: row.get("value"),
            })
            .collect())
    }

    async fn get_contents_for(&self, page_ids: &[Id]) -> Result<BTreeMap<Id, Vec<PageContent>>> {
        let rows = sqlx::query(
            "SELECT page_id, key, value FROM page_contents WHERE page_id = ANY($1) ORDER BY id",
        )
        .bind(page_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch contents for pages")?;

        let mut contents: BTreeMap<Id, Vec<PageContent>> =
            page_ids.iter().map(|id| (*id, Vec::new())).collect();
        for row in rows {
            contents
                .entry(row.get("page_id"))
                .or_default()
                .push(PageContent {
                    key: row.get("key"),
                    value: row.get("value"),
                });
        }
        Ok(contents)
    }

    async fn add_contents(&self, page_id: Id, contents: Vec<PageContent>) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for content in contents {
            sqlx::query(
                r#"
                INSERT INTO page_contents (page_id, key, value)
                VALUES ($1, $2, $3)
                ON CONFLICT (page_id, key) DO UPDATE SET value = EXCLUDED.value
                "#,
            )
            .bind(page_id)
            .bind(&content.key)
            .bind(&content.value)
            .execute(&mut *tx)
            .await
            .context("Failed to insert page content")?;
        }

        tx.commit().await.context("Failed to commit page contents")?;
        Ok(())
    }

    async fn delete_contents(&self, page_id: Id) -> Result<()> {
        sqlx::query("DELETE FROM page_contents WHERE page_id = $1")
            .bind(page_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete page contents")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MetaStore for PostgresStore {
    async fn get_meta(&self, page_id: Id) -> Result<PageMeta> {
        let rows = sqlx::query("SELECT key, value FROM page_meta WHERE page_id = $1")
            .bind(page_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch page meta")?;

        let mut meta = PageMeta::default();
        for row in rows {
            let key: String = row.get("key");
            meta.insert(key, row.get("value"));
        }
        Ok(meta)
    }

    async fn get_meta_for(&self, page_ids: &[Id]) -> Result<BTreeMap<Id, PageMeta>> {
        let rows = sqlx::query("SELECT page_id, key, value FROM page_meta WHERE page_id = ANY($1)")
            .bind(page_ids)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch meta for pages")?;

        let mut meta: BTreeMap<Id, PageMeta> =
            page_ids.iter().map(|id| (*id, PageMeta::default())).collect();
        for row in rows {
            let key: String = row.get("key");
            meta.entry(row.get("page_id"))
                .or_default()
                .insert(key, row.get("value"));
        }
        Ok(meta)
    }

    async fn set_meta(&self, page_id: Id, key: &str, value: Option<String>) -> Result<()> {
        sqlx::query(
            "INSERT INTO page_meta (page_id, key, value) VALUES ($1, $2, $3) ON CONFLICT (page_id, key) DO NOTHING",
        )
        .bind(page_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .context("Failed to set page meta")?;
        Ok(())
    }

    async fn sync_meta(&self, page_id: Id, meta: PageMeta) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for (key, value) in meta.0 {
            sqlx::query(
                r#"
                INSERT INTO page_meta (page_id, key, value)
                VALUES ($1, $2, $3)
                ON CONFLICT (page_id, key) DO UPDATE SET value = EXCLUDED.value
                "#,
            )
            .bind(page_id)
            .bind(&key)
            .bind(value)
            .execute(&mut *tx)
            .await
            .context("Failed to sync page meta")?;
        }

        tx.commit().await.context("Failed to commit page meta")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MediaStore for PostgresStore {
    async fn get_media(&self, page_id: Id) -> Result<Vec<PageMedia>> {
        let rows = sqlx::query(
            "SELECT media_id, media_group FROM page_media WHERE page_id = $1 ORDER BY attached_at, media_id",
        )
        .bind(page_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch page media")?;

        Ok(rows
            .iter()
            .map(|row| PageMedia {
                media_id: row.get("media_id"),
                group: row.get("media_group"),
            })
            .collect())
    }

    async fn get_media_for(&self, page_ids: &[Id]) -> Result<BTreeMap<Id, Vec<PageMedia>>> {
        let rows = sqlx::query(
            "SELECT page_id, media_id, media_group FROM page_media \
             WHERE page_id = ANY($1) ORDER BY attached_at, media_id",
        )
        .bind(page_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch media for pages")?;

        let mut media: BTreeMap<Id, Vec<PageMedia>> =
            page_ids.iter().map(|id| (*id, Vec::new())).collect();
        for row in rows {
            media.entry(row.get("page_id")).or_default().push(PageMedia {
                media_id: row.get("media_id"),
                group: row.get("media_group"),
            });
        }
        Ok(media)
    }

    async fn attach_media(&self, page_id: Id, media: PageMedia) -> Result<()> {
        sqlx::query(
            "INSERT INTO page_media (page_id, media_id, media_group) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(page_id)
        .bind(media.media_id)
        .bind(&media.group)
        .execute(&self.pool)
        .await
        .context("Failed to attach page media")?;
        Ok(())
    }

    async fn detach_media(&self, page_id: Id) -> Result<()> {
        sqlx::query("DELETE FROM page_media WHERE page_id = $1")
            .bind(page_id)
            .execute(&self.pool)
            .await
            .context("Failed to detach page media")?;
        Ok(())
    }
}

impl Store for PostgresStore {}
