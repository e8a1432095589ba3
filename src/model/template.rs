use serde::{Deserialize, Serialize};

use crate::model::Id;

/// A page template. `handler` names the entry in the template handler
/// registry that validates and saves this template's fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTemplate {
    pub id: Id,
    pub name: String,
    pub component_name: String,
    pub is_selectable: bool,
    #[serde(skip_serializing)]
    pub handler: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPageTemplate {
    pub name: String,
    pub component_name: String,
    pub is_selectable: bool,
    pub handler: String,
}
