use std::collections::HashSet;

use serde_json::Value;

use crate::logic::error::{PageError, PageResult};
use crate::model::{value_as_id, Id, PageInput, PageRequest, ValidationErrors};
use crate::store::traits::{PageStore, TemplateStore};

/// Validate the core page fields shared by every template. `page_id` is set
/// on update so that a page cannot become its own ancestor.
pub async fn validate_page<S: PageStore + TemplateStore + ?Sized>(
    store: &S,
    request: &PageRequest,
    page_id: Option<Id>,
) -> PageResult<PageInput> {
    let mut errors = ValidationErrors::new();

    let title = match request.input("title") {
        Some(Value::String(title)) if !title.trim().is_empty() => Some(title.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        None | Some(Value::Null) => {
            errors.add("title", "The title field is required.");
            None
        }
        Some(Value::String(_)) => {
            errors.add("title", "The title field is required.");
            None
        }
        Some(_) => {
            errors.add("title", "The title must be a string.");
            None
        }
    };

    let slug = match request.input("slug") {
        None | Some(Value::Null) => None,
        Some(Value::String(slug)) => Some(slug.clone()),
        Some(_) => {
            errors.add("slug", "The slug must be a string.");
            None
        }
    };

    let template_id = if !request.filled("template_id") {
        errors.add("template_id", "The template_id field is required.");
        None
    } else {
        match request.integer("template_id") {
            Some(id) if store.get_template(id).await?.is_some() => Some(id),
            _ => {
                errors.add("template_id", "The selected template_id is invalid.");
                None
            }
        }
    };

    let parent_id = match request.input("parent_id") {
        None | Some(Value::Null) => None,
        Some(raw) => match value_as_id(raw) {
            Some(id) if store.get_page(id).await?.is_some() => {
                if let Some(page_id) = page_id {
                    if is_self_or_descendant(store, id, page_id).await? {
                        errors.add(
                            "parent_id",
                            "A page cannot be moved below itself or one of its descendants.",
                        );
                    }
                }
                Some(id)
            }
            _ => {
                errors.add("parent_id", "The selected parent_id is invalid.");
                None
            }
        },
    };

    let is_stand_alone = required_boolean(request, "is_stand_alone", &mut errors);
    let is_published = required_boolean(request, "is_published", &mut errors);
    let meta_title = optional_string(request, "meta.title", &mut errors);
    let meta_description = optional_string(request, "meta.description", &mut errors);

    if !errors.is_empty() {
        return Err(PageError::Validation(errors));
    }

    match (title, template_id, is_stand_alone, is_published) {
        (Some(title), Some(template_id), Some(is_stand_alone), Some(is_published)) => {
            Ok(PageInput {
                title,
                slug,
                template_id,
                parent_id,
                is_stand_alone,
                is_published,
                meta_title,
                meta_description,
            })
        }
        _ => Err(PageError::Validation(errors)),
    }
}

/// Ids listed for reordering: a non-empty array of existing page ids.
pub async fn validate_reorder<S: PageStore + ?Sized>(
    store: &S,
    pages: Option<&Value>,
) -> PageResult<Vec<Id>> {
    let mut errors = ValidationErrors::new();

    let items = match pages {
        None | Some(Value::Null) => {
            errors.add("pages", "The pages field is required.");
            return Err(PageError::Validation(errors));
        }
        Some(Value::Array(items)) if items.is_empty() => {
            errors.add("pages", "The pages field is required.");
            return Err(PageError::Validation(errors));
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.add("pages", "The pages must be an array.");
            return Err(PageError::Validation(errors));
        }
    };

    let ids: Vec<Option<Id>> = items.iter().map(value_as_id).collect();
    let candidates: Vec<Id> = ids.iter().flatten().copied().collect();
    let existing: HashSet<Id> = store.existing_page_ids(&candidates).await?.into_iter().collect();

    for (index, id) in ids.iter().enumerate() {
        match id {
            Some(id) if existing.contains(id) => {}
            _ => errors.add(
                format!("pages.{}", index),
                format!("The selected pages.{} is invalid.", index),
            ),
        }
    }

    if errors.is_empty() {
        Ok(ids.into_iter().flatten().collect())
    } else {
        Err(PageError::Validation(errors))
    }
}

fn required_boolean(request: &PageRequest, field: &str, errors: &mut ValidationErrors) -> Option<bool> {
    if !request.has(field) {
        errors.add(field, format!("The {} field must be present.", field));
        return None;
    }
    match request.boolean(field) {
        Some(value) => Some(value),
        None => {
            errors.add(field, format!("The {} field must be true or false.", field));
            None
        }
    }
}

fn optional_string(request: &PageRequest, field: &str, errors: &mut ValidationErrors) -> Option<String> {
    match request.input(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(value)) => Some(value.clone()),
        Some(_) => {
            errors.add(field, format!("The {} must be a string.", field));
            None
        }
    }
}

/// Walk up from `candidate` and report whether `page_id` is on the way.
async fn is_self_or_descendant<S: PageStore + ?Sized>(
    store: &S,
    candidate: Id,
    page_id: Id,
) -> anyhow::Result<bool> {
    let mut seen = HashSet::new();
    let mut current = Some(candidate);
    while let Some(id) = current {
        if id == page_id {
            return Ok(true);
        }
        if !seen.insert(id) {
            return Ok(false);
        }
        current = store.get_page(id).await?.and_then(|page| page.parent_id);
    }
    Ok(false)
}
