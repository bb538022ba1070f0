pub mod json;
#[cfg(feature = "umya")]
pub mod umya;

pub use json::{JsonDocument, JsonTemplate};
#[cfg(feature = "umya")]
pub use umya::{UmyaDocument, UmyaTemplate};
