//! Seed-data factories: registered on the registry, run by the engine after
//! migration.

use async_trait::async_trait;
use sqlx::PgPool;

/// A seed-data factory. Implementations insert bootstrap or development rows
/// for one concern (users, reference data, ...).
///
/// Factories run in registration order with a log-and-continue failure
/// policy: one failing factory never stops the ones after it.
#[async_trait]
pub trait SeedFactory: Send + Sync {
    /// Short name used in logs when the factory fails.
    fn name(&self) -> &str;

    async fn seed(&self, pool: &PgPool) -> Result<(), sqlx::Error>;
}
