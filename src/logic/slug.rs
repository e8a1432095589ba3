use crate::model::{slugify, Id};
use crate::store::traits::SlugStore;

/// Used when neither the requested slug nor the title yield any
/// URL-safe characters.
const FALLBACK_SLUG: &str = "page";

/// Derives slugs that are unique among a page's siblings.
pub struct SlugGenerator<'a, S: SlugStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SlugStore + ?Sized> SlugGenerator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Slugify the requested slug, or the title when none was requested,
    /// then append `-1`, `-2`, ... until no sibling under `parent_id`
    /// (other than `page_id` itself) uses it.
    pub async fn generate(
        &self,
        requested: Option<&str>,
        title: &str,
        parent_id: Option<Id>,
        page_id: Option<Id>,
    ) -> anyhow::Result<String> {
        let base = base_slug(requested, title);

        if !self.store.slug_exists(&base, parent_id, page_id).await? {
            return Ok(base);
        }

        let mut suffix = 1u32;
        loop {
            let candidate = format!("{}-{}", base, suffix);
            if !self.store.slug_exists(&candidate, parent_id, page_id).await? {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }
}

fn base_slug(requested: Option<&str>, title: &str) -> String {
    let from_request = requested.map(slugify).unwrap_or_default();
    if !from_request.is_empty() {
        return from_request;
    }

    let from_title = slugify(title);
    if from_title.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        from_title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewPage;
    use crate::store::{MemoryStore, PageStore};

    #[test]
    fn test_base_slug_prefers_requested_slug() {
        assert_eq!(base_slug(Some("Custom Slug"), "About"), "custom-slug");
        assert_eq!(base_slug(None, "About Us"), "about-us");
        assert_eq!(base_slug(Some("  "), "About Us"), "about-us");
        assert_eq!(base_slug(None, "???"), "page");
    }

    #[tokio::test]
    async fn test_generate_appends_suffix_among_siblings() {
        let store = MemoryStore::new();
        let generator = SlugGenerator::new(&store);

        let first = generator.generate(None, "About", None, None).await.unwrap();
        assert_eq!(first, "about");
        store
            .insert_page(NewPage::new("About".into(), first, None, 1))
            .await
            .unwrap();

        let second = generator.generate(None, "About", None, None).await.unwrap();
        assert_eq!(second, "about-1");
        store
            .insert_page(NewPage::new("About".into(), second, None, 1))
            .await
            .unwrap();

        let third = generator.generate(None, "About", None, None).await.unwrap();
        assert_eq!(third, "about-2");
    }

    #[tokio::test]
    async fn test_generate_ignores_other_parents_and_self() {
        let store = MemoryStore::new();
        let generator = SlugGenerator::new(&store);

        let about = store
            .insert_page(NewPage::new("About".into(), "about".into(), None, 1))
            .await
            .unwrap();
        let team = store
            .insert_page(NewPage::new("Team".into(), "team".into(), Some(about.id), 1))
            .await
            .unwrap();

        // a root level "team" does not collide with the child
        assert_eq!(generator.generate(None, "Team", None, None).await.unwrap(), "team");
        // the page keeps its own slug when regenerated
        assert_eq!(
            generator
                .generate(None, "Team", Some(about.id), Some(team.id))
                .await
                .unwrap(),
            "team"
        );
    }
}
