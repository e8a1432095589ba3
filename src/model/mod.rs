pub mod common;
pub mod content;
pub mod filter;
pub mod page;
pub mod request;
pub mod template;

pub use common::*;
pub use content::*;
pub use filter::*;
pub use page::*;
pub use request::*;
pub use template::*;
