pub mod domain_list;
pub mod summary;

pub use domain_list::read_domains;
pub use summary::{write_summary, SUMMARY_HEADER};
