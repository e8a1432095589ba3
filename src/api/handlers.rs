use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::logic::{PageError, PageService, TemplateRegistry, UriJobQueue};
use crate::model::{
    Id, PageFilter, PageMeta, PageRequest, PageResource, PageTemplate, ValidationErrors,
};
use crate::store::traits::Store;

/// Shared state for every handler: the store plus the pieces the page
/// service needs besides it.
pub struct AppContext<S: Store> {
    pub store: Arc<S>,
    pub templates: TemplateRegistry,
    pub jobs: Arc<dyn UriJobQueue>,
}

impl<S: Store> AppContext<S> {
    pub fn new(store: Arc<S>, templates: TemplateRegistry, jobs: Arc<dyn UriJobQueue>) -> Self {
        Self {
            store,
            templates,
            jobs,
        }
    }

    pub fn pages(&self) -> PageService<'_, S> {
        PageService::new(&*self.store, &self.templates, &*self.jobs)
    }
}

pub type AppState<S> = Arc<AppContext<S>>;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Deserialize)]
pub struct PagesQuery {
    pub parent: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
            errors: None,
        }
    }

    pub fn with_errors(message: &str, errors: ValidationErrors) -> Self {
        Self {
            error: message.to_string(),
            errors: Some(errors),
        }
    }
}

impl From<PageError> for ErrorResponse {
    fn from(err: PageError) -> Self {
        match err {
            PageError::Validation(errors) | PageError::Template { errors, .. } => {
                let message = errors
                    .first_message()
                    .unwrap_or("The given data was invalid.")
                    .to_string();
                Self::with_errors(&message, errors)
            }
            other => Self::new(&other.to_string()),
        }
    }
}

/// Map domain errors onto HTTP: field errors are 422, misses are 404.
fn api_error(err: PageError) -> ApiError {
    let status = match &err {
        PageError::Validation(_) | PageError::Template { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PageError::NotFound(_) => StatusCode::NOT_FOUND,
        PageError::Store(e) => {
            log::error!("page store failure: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::from(err)))
}

/// Page as seen by the site renderer
#[derive(Debug, Serialize)]
pub struct RenderedPage {
    pub id: Id,
    pub title: String,
    pub uri: String,
    pub component_name: Option<String>,
    pub meta: PageMeta,
    pub contents: BTreeMap<String, String>,
}

impl From<PageResource> for RenderedPage {
    fn from(page: PageResource) -> Self {
        let contents = page
            .contents
            .iter()
            .filter(|content| page.has_content(&content.key))
            .map(|content| (content.key.clone(), content.value.clone()))
            .collect();

        Self {
            id: page.id,
            title: page.title,
            uri: page.uri,
            component_name: page.template.map(|template| template.component_name),
            meta: page.meta,
            contents,
        }
    }
}

/// GET /api/pages
pub async fn list_pages<S: Store>(
    State(ctx): State<AppState<S>>,
    Query(query): Query<PagesQuery>,
) -> Result<Json<ListResponse<PageResource>>, ApiError> {
    let filter = PageFilter::from_query(query.parent.as_deref()).map_err(|message| {
        api_error(PageError::Validation(ValidationErrors::single("parent", message)))
    })?;

    let pages = ctx.pages().index(&filter).await.map_err(api_error)?;
    Ok(Json(ListResponse::new(pages)))
}

/// POST /api/pages
pub async fn create_page<S: Store>(
    State(ctx): State<AppState<S>>,
    RequestJson(body): RequestJson<Value>,
) -> Result<(StatusCode, Json<PageResource>), ApiError> {
    let request = PageRequest::from_value(body);
    let page = ctx.pages().create(&request).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(page)))
}

/// GET /api/pages/:id
pub async fn get_page<S: Store>(
    State(ctx): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Json<PageResource>, ApiError> {
    let page = ctx.pages().show(id).await.map_err(api_error)?;
    Ok(Json(page))
}

/// PUT|PATCH /api/pages/:id
pub async fn update_page<S: Store>(
    State(ctx): State<AppState<S>>,
    Path(id): Path<Id>,
    RequestJson(body): RequestJson<Value>,
) -> Result<Json<PageResource>, ApiError> {
    let request = PageRequest::from_value(body);
    let page = ctx.pages().update(id, &request).await.map_err(api_error)?;
    Ok(Json(page))
}

/// PUT /api/pages/reorder
pub async fn reorder_pages<S: Store>(
    State(ctx): State<AppState<S>>,
    RequestJson(body): RequestJson<Value>,
) -> Result<StatusCode, ApiError> {
    ctx.pages()
        .reorder(body.get("pages"))
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/pages/:id
pub async fn delete_page<S: Store>(
    State(ctx): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    ctx.pages().destroy(id).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/page-templates
pub async fn list_templates<S: Store>(
    State(ctx): State<AppState<S>>,
) -> Result<Json<ListResponse<PageTemplate>>, ApiError> {
    let templates = ctx.pages().templates().await.map_err(api_error)?;
    Ok(Json(ListResponse::new(templates)))
}

/// GET /site/*uri
pub async fn render_page<S: Store>(
    State(ctx): State<AppState<S>>,
    Path(uri): Path<String>,
) -> Result<Json<RenderedPage>, ApiError> {
    let page = ctx
        .pages()
        .find_published_by_uri(&uri)
        .await
        .map_err(api_error)?;
    Ok(Json(RenderedPage::from(page)))
}
