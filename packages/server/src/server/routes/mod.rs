// HTTP routes
pub mod find_emails;
pub mod health;
pub mod stream;

pub use find_emails::*;
pub use health::*;
pub use stream::*;
