pub mod json_extract;
pub mod logging;

pub use json_extract::extract_first_json_object;
