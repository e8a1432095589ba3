use std::collections::{HashSet, VecDeque};

use anyhow::Result;

use crate::model::{Id, Page};
use crate::store::traits::PageStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriUpdateReport {
    /// Pages visited, including the starting page
    pub visited: usize,
    /// Pages whose stored uri actually changed
    pub updated: Vec<Id>,
}

/// Recomputes stored uris after slug or parent changes.
pub struct UriUpdater;

impl UriUpdater {
    /// Recompute the page's uri, then walk its descendants breadth first so
    /// that every child is derived from its parent's fresh uri.
    ///
    /// Running it again on an unchanged tree writes nothing. Pages with a
    /// fixed uri keep it once set, but their own children are still visited.
    pub async fn run<S: PageStore + ?Sized>(store: &S, page_id: Id) -> Result<UriUpdateReport> {
        let mut report = UriUpdateReport::default();

        let Some(page) = store.get_page(page_id).await? else {
            log::debug!("uri update skipped, page {} no longer exists", page_id);
            return Ok(report);
        };

        let parent = match page.parent_id {
            Some(parent_id) => store.get_page(parent_id).await?,
            None => None,
        };

        let mut seen: HashSet<Id> = HashSet::new();
        let mut queue: VecDeque<(Page, Option<Page>)> = VecDeque::new();
        queue.push_back((page, parent));

        while let Some((mut page, parent)) = queue.pop_front() {
            if !seen.insert(page.id) {
                log::warn!("page {} reached twice while updating uris, skipping", page.id);
                continue;
            }
            report.visited += 1;

            // a fixed uri is assigned once, then never recomputed
            if page.uri.is_empty() || !page.has_fixed_uri {
                let uri = page.generate_uri(parent.as_ref());
                if uri != page.uri {
                    store.set_page_uri(page.id, &uri).await?;
                    log::debug!("page {} uri '{}' -> '{}'", page.id, page.uri, uri);
                    page.uri = uri;
                    report.updated.push(page.id);
                }
            }

            for child in store.list_children(page.id).await? {
                queue.push_back((child, Some(page.clone())));
            }
        }

        Ok(report)
    }
}
