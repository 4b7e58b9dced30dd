pub mod article;
pub mod criteria;
pub mod loaders;
pub mod verdict;

pub use article::{ArticleRecord, OriginalRow};
pub use criteria::CriteriaSet;
pub use loaders::load_rows_file;
pub use verdict::{ClassifiedRecord, Verdict, PLACEHOLDER_CRITERION, PLACEHOLDER_REASON};
