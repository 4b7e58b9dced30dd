pub mod rows_loader;

pub use rows_loader::load_rows_file;
