// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Verification and orchestration live in domains/emails and use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseMxResolver)

use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// Mail Exchanger Lookup Trait (Infrastructure - DNS)
// =============================================================================

#[async_trait]
pub trait BaseMxResolver: Send + Sync {
    /// Mail exchanger hosts for a domain, in resolver response order.
    ///
    /// An empty list means no MX records were found (NODATA or NXDOMAIN).
    /// Timeouts and server failures are errors.
    async fn mail_exchangers(&self, domain: &str) -> Result<Vec<String>>;
}
