// Business domains
pub mod emails;
