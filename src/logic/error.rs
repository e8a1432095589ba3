use thiserror::Error;

use crate::model::ValidationErrors;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("The given data was invalid")]
    Validation(ValidationErrors),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Template '{template}' rejected the request")]
    Template {
        template: String,
        errors: ValidationErrors,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl PageError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn template(template: impl Into<String>, errors: ValidationErrors) -> Self {
        Self::Template {
            template: template.into(),
            errors,
        }
    }

    /// Field errors carried by validation and template failures
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) | Self::Template { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

pub type PageResult<T> = Result<T, PageError>;
