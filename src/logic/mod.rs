pub mod error;
pub mod jobs;
pub mod pages;
pub mod slug;
pub mod templates;
pub mod uri;
pub mod validate;

pub use error::*;
pub use jobs::*;
pub use pages::*;
pub use slug::*;
pub use templates::*;
pub use uri::*;
pub use validate::*;
