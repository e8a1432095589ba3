//! Template handlers validate and persist the template-specific part of a
//! page request. The page service looks the handler up by the template's
//! `handler` identifier and delegates to it without knowing the variant.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::logic::error::{PageError, PageResult};
use crate::model::{Page, PageContent, PageMedia, PageRequest, PageTemplate, ValidationErrors};
use crate::store::traits::TemplateStorage;

#[async_trait::async_trait]
pub trait TemplateHandler: Send + Sync {
    /// Reject the request before anything is persisted
    fn validate(&self, request: &PageRequest) -> PageResult<()>;

    /// Write the template's contents and media for a saved page
    async fn save(
        &self,
        page: &Page,
        request: &PageRequest,
        storage: &dyn TemplateStorage,
    ) -> PageResult<()>;
}

/// Handlers keyed by the identifier stored on [`PageTemplate::handler`].
#[derive(Clone, Default)]
pub struct TemplateRegistry {
    handlers: HashMap<String, Arc<dyn TemplateHandler>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `default` and `empty` handlers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DefaultTemplate::HANDLER, DefaultTemplate);
        registry.register(EmptyTemplate::HANDLER, EmptyTemplate);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, handler: impl TemplateHandler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn resolve(&self, template: &PageTemplate) -> PageResult<Arc<dyn TemplateHandler>> {
        self.handlers.get(&template.handler).cloned().ok_or_else(|| {
            PageError::template(
                template.name.clone(),
                ValidationErrors::single(
                    "template_id",
                    format!("The template handler '{}' is not registered.", template.handler),
                ),
            )
        })
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("TemplateRegistry")
            .field("handlers", &names)
            .finish()
    }
}

/// Rich text page: a required `content` body and an optional `image_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTemplate;

impl DefaultTemplate {
    pub const HANDLER: &'static str = "default";
}

#[async_trait::async_trait]
impl TemplateHandler for DefaultTemplate {
    fn validate(&self, request: &PageRequest) -> PageResult<()> {
        let mut errors = ValidationErrors::new();

        if !request.filled("content") {
            errors.add("content", "The content field is required.");
        } else if request.string("content").is_none() {
            errors.add("content", "The content must be a string.");
        }

        if request.filled("image_id") && request.integer("image_id").is_none() {
            errors.add("image_id", "The image_id must be an integer.");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PageError::template(Self::HANDLER, errors))
        }
    }

    async fn save(
        &self,
        page: &Page,
        request: &PageRequest,
        storage: &dyn TemplateStorage,
    ) -> PageResult<()> {
        let content = request.string("content").unwrap_or_default();
        storage
            .add_contents(page.id, vec![PageContent::new("content", content)])
            .await?;

        if let Some(media_id) = request.integer("image_id") {
            storage
                .attach_media(
                    page.id,
                    PageMedia {
                        media_id,
                        group: "image".to_string(),
                    },
                )
                .await?;
        }
        Ok(())
    }
}

/// Template whose content lives elsewhere; accepts and stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyTemplate;

impl EmptyTemplate {
    pub const HANDLER: &'static str = "empty";
}

#[async_trait::async_trait]
impl TemplateHandler for EmptyTemplate {
    fn validate(&self, _request: &PageRequest) -> PageResult<()> {
        Ok(())
    }

    async fn save(
        &self,
        _page: &Page,
        _request: &PageRequest,
        _storage: &dyn TemplateStorage,
    ) -> PageResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateField {
    pub key: String,
    pub required: bool,
}

impl TemplateField {
    pub fn required(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            required: true,
        }
    }

    pub fn optional(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            required: false,
        }
    }
}

/// A template described by a list of string fields, each stored as its own
/// content key.
#[derive(Debug, Clone)]
pub struct FieldsTemplate {
    name: String,
    fields: Vec<TemplateField>,
}

impl FieldsTemplate {
    pub fn new(name: impl Into<String>, fields: Vec<TemplateField>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

#[async_trait::async_trait]
impl TemplateHandler for FieldsTemplate {
    fn validate(&self, request: &PageRequest) -> PageResult<()> {
        let mut errors = ValidationErrors::new();

        for field in &self.fields {
            match request.input(&field.key) {
                None | Some(Value::Null) if field.required => {
                    errors.add(&field.key, format!("The {} field is required.", field.key));
                }
                None | Some(Value::Null) => {}
                Some(Value::String(s)) if field.required && s.trim().is_empty() => {
                    errors.add(&field.key, format!("The {} field is required.", field.key));
                }
                Some(Value::String(_)) => {}
                Some(_) => {
                    errors.add(&field.key, format!("The {} must be a string.", field.key));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PageError::template(self.name.clone(), errors))
        }
    }

    async fn save(
        &self,
        page: &Page,
        request: &PageRequest,
        storage: &dyn TemplateStorage,
    ) -> PageResult<()> {
        let contents: Vec<PageContent> = self
            .fields
            .iter()
            .filter_map(|field| {
                request
                    .string(&field.key)
                    .map(|value| PageContent::new(field.key.clone(), value))
            })
            .collect();

        if !contents.is_empty() {
            storage.add_contents(page.id, contents).await?;
        }
        Ok(())
    }
}
