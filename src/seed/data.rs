use crate::logic::{DefaultTemplate, EmptyTemplate, UriUpdater};
use crate::model::{NewPage, NewPageTemplate, PageContent, PageTemplate};
use crate::store::traits::Store;
use anyhow::Result;
use chrono::Utc;

/// Install the built-in templates and a protected home page. Does nothing
/// when templates already exist.
pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    if !store.list_templates().await?.is_empty() {
        log::info!("templates already present, skipping seed data");
        return Ok(());
    }

    let default_template = create_templates(store).await?;
    create_home_page(store, &default_template).await?;

    Ok(())
}

async fn create_templates<S: Store>(store: &S) -> Result<PageTemplate> {
    let default_template = store
        .insert_template(NewPageTemplate {
            name: "Default".to_string(),
            component_name: "default-template".to_string(),
            is_selectable: true,
            handler: DefaultTemplate::HANDLER.to_string(),
        })
        .await?;

    store
        .insert_template(NewPageTemplate {
            name: "Stand-alone".to_string(),
            component_name: "stand-alone-template".to_string(),
            is_selectable: false,
            handler: EmptyTemplate::HANDLER.to_string(),
        })
        .await?;

    Ok(default_template)
}

async fn create_home_page<S: Store>(store: &S, template: &PageTemplate) -> Result<()> {
    let mut home = NewPage::new("Home".to_string(), "home".to_string(), None, template.id);
    home.has_fixed_template = true;
    home.has_fixed_uri = true;
    home.is_deletable = false;

    let home = store.insert_page(home).await?;
    store.set_meta(home.id, "title", Some("Home".to_string())).await?;
    store.set_meta(home.id, "description", None).await?;
    store
        .add_contents(home.id, vec![PageContent::new("content", "<p>Welcome</p>")])
        .await?;
    store.set_published_at(home.id, Some(Utc::now())).await?;

    UriUpdater::run(store, home.id).await?;
    log::info!("seeded home page {}", home.id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageFilter;
    use crate::store::{MemoryStore, PageStore, TemplateStore};

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();
        load_seed_data(&store).await.unwrap();
        load_seed_data(&store).await.unwrap();

        assert_eq!(store.list_templates().await.unwrap().len(), 2);
        let pages = store.list_pages(&PageFilter::default()).await.unwrap();
        assert_eq!(pages.len(), 1);

        let home = &pages[0];
        assert_eq!(home.uri, "home");
        assert!(home.is_published());
        assert!(home.has_fixed_uri && home.has_fixed_template && !home.is_deletable);
    }
}
