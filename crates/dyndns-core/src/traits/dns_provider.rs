// # DNS Provider Trait
//
// Defines the interface the reconciler uses to observe and mutate record sets
// at an authoritative DNS provider.
//
// ## Implementations
//
// - Route 53: `dyndns-provider-route53` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::record::{ChangeBatch, RecordSetQuery, RecordType, ResourceRecordSet};
//
// let sets = provider
//     .list_record_sets(&RecordSetQuery {
//         zone_id: "Z0243863".into(),
//         start_name: "home.example.com.".into(),
//         start_type: RecordType::A,
//         max_items: 2,
//     })
//     .await?;
//
// let record = ResourceRecordSet::a_record("home.example.com.", ip, 180);
// provider.change_record_sets("Z0243863", &ChangeBatch::upsert(record, None)).await?;
// ```

use crate::record::{ChangeBatch, ChangeInfo, RecordSetQuery, ResourceRecordSet};
use async_trait::async_trait;

/// Trait for DNS provider implementations
///
/// Implementations must be thread-safe; one instance is shared by every
/// in-flight request.
///
/// # Trust Level: Untrusted
///
/// Providers are thin API clients:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (a failed request is reported; the client re-invokes)
/// - ❌ Decide whether an update is needed (owned by `Reconciler`)
/// - ❌ Filter listings by name (owned by `Reconciler`)
/// - ❌ Cache state between requests
/// - ❌ Spawn tasks or threads
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List record sets in provider order, starting at the query's name/type
    ///
    /// # Parameters
    ///
    /// - `query`: Zone, starting name and type, and page size
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<ResourceRecordSet>)`: Up to `max_items` record sets; may
    ///   include names other than `start_name`
    /// - `Err(Error)`: Transport, authentication or API failure
    async fn list_record_sets(
        &self,
        query: &RecordSetQuery,
    ) -> Result<Vec<ResourceRecordSet>, crate::Error>;

    /// Submit a change batch to a hosted zone
    ///
    /// # Parameters
    ///
    /// - `zone_id`: Hosted zone identifier
    /// - `batch`: Changes to apply atomically
    ///
    /// # Returns
    ///
    /// - `Ok(ChangeInfo)`: The provider accepted the batch
    /// - `Err(Error)`: The batch was rejected or the call failed
    async fn change_record_sets(
        &self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<ChangeInfo, crate::Error>;

    /// Get the provider name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the provider (e.g., "route53")
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    ///
    /// # Returns
    ///
    /// A boxed DnsProvider trait object
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
