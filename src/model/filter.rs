use serde::{Deserialize, Serialize};

use crate::model::Id;

/// Parent filter for page listings: `?parent=root` or `?parent=<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentFilter {
    Root,
    Parent(Id),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFilter {
    pub parent: Option<ParentFilter>,
}

impl PageFilter {
    /// Parse the raw `parent` query value. Empty means no filter; anything
    /// other than `root` or an integer id is rejected.
    pub fn from_query(parent: Option<&str>) -> Result<Self, String> {
        let parent = match parent.map(str::trim) {
            None | Some("") => None,
            Some("root") => Some(ParentFilter::Root),
            Some(raw) => Some(ParentFilter::Parent(
                raw.parse::<Id>()
                    .map_err(|_| format!("Invalid parent filter '{}'", raw))?,
            )),
        };
        Ok(Self { parent })
    }

    pub fn matches(&self, parent_id: Option<Id>) -> bool {
        match self.parent {
            None => true,
            Some(ParentFilter::Root) => parent_id.is_none(),
            Some(ParentFilter::Parent(id)) => parent_id == Some(id),
        }
    }
}
