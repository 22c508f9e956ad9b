//! Pass orchestration and the per-mapping diff.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mirador_connector::resolver::{CredentialResolver, StoredCredentials};
use mirador_connector::types::{SourceKind, SourceRow};
use mirador_connector::{ConnectorFactory, SourceConnector};
use mirador_db::models::{FieldMap, FieldMapping, SourceConnection};

use crate::error::{Result, SyncError};
use crate::store::SyncStore;
use crate::types::{MappingSyncOutcome, PassStatus, SyncPassResponse};

/// Upper bound on rows fetched per mapping in one pass.
///
/// The fetch is deliberately unpaginated; sources with more rows than this
/// are only partially reconciled.
pub const FETCH_LIMIT: u32 = 10_000;

/// Counts produced by one mapping's reconciliation.
struct MappingCounts {
    inserted: usize,
    updated: usize,
    deactivated: usize,
    total_external: usize,
    total_mapped: usize,
}

/// Reconciles the local mirror against live external sources.
pub struct SyncReconciler {
    store: Arc<dyn SyncStore>,
    resolver: CredentialResolver,
    factory: Arc<dyn ConnectorFactory>,
}

impl SyncReconciler {
    /// Create a reconciler.
    pub fn new(
        store: Arc<dyn SyncStore>,
        resolver: CredentialResolver,
        factory: Arc<dyn ConnectorFactory>,
    ) -> Self {
        Self {
            store,
            resolver,
            factory,
        }
    }

    /// Run one sync pass for a connection.
    ///
    /// At most one pass runs per connection: a second caller gets
    /// [`SyncError::AlreadyRunning`] immediately and nothing is written.
    /// The claim is released on every path out of this function, including
    /// pass-level failures before the mapping loop.
    pub async fn sync_connection(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
    ) -> Result<SyncPassResponse> {
        let connection = self
            .store
            .find_connection(tenant_id, connection_id)
            .await?
            .ok_or(SyncError::ConnectionNotFound { connection_id })?;

        if !self.store.try_begin_sync(tenant_id, connection_id).await? {
            return Err(SyncError::AlreadyRunning { connection_id });
        }

        debug!(
            tenant_id = %tenant_id,
            connection_id = %connection_id,
            "Claimed connection for sync pass"
        );

        match self.run_pass(tenant_id, &connection).await {
            Ok(results) => {
                let last_synced_at = Utc::now();
                let next_sync_at = connection
                    .sync_frequency_minutes
                    .filter(|_| connection.auto_sync_enabled)
                    .map(|minutes| last_synced_at + Duration::minutes(i64::from(minutes)));

                if let Err(err) = self
                    .store
                    .complete_sync(tenant_id, connection_id, last_synced_at, next_sync_at)
                    .await
                {
                    // The claim must not survive the pass even when the
                    // bookkeeping write fails.
                    self.release_claim(tenant_id, connection_id).await;
                    return Err(err.into());
                }

                let status = if results.iter().all(|r| r.success) {
                    PassStatus::Success
                } else {
                    PassStatus::Partial
                };

                info!(
                    tenant_id = %tenant_id,
                    connection_id = %connection_id,
                    status = %status,
                    mappings = results.len(),
                    "Sync pass finished"
                );

                Ok(SyncPassResponse {
                    ok: true,
                    status,
                    last_synced_at,
                    next_sync_at,
                    results,
                })
            }
            Err(err) => {
                self.release_claim(tenant_id, connection_id).await;
                Err(err)
            }
        }
    }

    async fn release_claim(&self, tenant_id: Uuid, connection_id: Uuid) {
        if let Err(err) = self.store.release_sync(tenant_id, connection_id).await {
            warn!(
                tenant_id = %tenant_id,
                connection_id = %connection_id,
                error = %err,
                "Failed to release sync claim"
            );
        }
    }

    /// Process every mapping sequentially. A failure in one mapping is
    /// recorded in its outcome and does not stop the rest.
    async fn run_pass(
        &self,
        tenant_id: Uuid,
        connection: &SourceConnection,
    ) -> Result<Vec<MappingSyncOutcome>> {
        let mappings = self.store.list_mappings(tenant_id, connection.id).await?;

        let mut results = Vec::with_capacity(mappings.len());
        for mapping in &mappings {
            match self.sync_mapping(tenant_id, connection, mapping).await {
                Ok(counts) => results.push(MappingSyncOutcome {
                    mapping_id: mapping.id,
                    resource: mapping.resource.clone(),
                    inserted: counts.inserted,
                    updated: counts.updated,
                    deactivated: counts.deactivated,
                    total_external: counts.total_external,
                    total_mapped: counts.total_mapped,
                    success: true,
                    error: None,
                }),
                Err(err) => {
                    warn!(
                        tenant_id = %tenant_id,
                        mapping_id = %mapping.id,
                        resource = %mapping.resource,
                        error = %err,
                        "Mapping sync failed; continuing with remaining mappings"
                    );
                    results.push(MappingSyncOutcome::failed(
                        mapping.id,
                        mapping.resource.clone(),
                        err.to_string(),
                    ));
                }
            }
        }

        Ok(results)
    }

    /// Reconcile one mapping. Opens its own connector and closes it on
    /// every path out.
    async fn sync_mapping(
        &self,
        tenant_id: Uuid,
        connection: &SourceConnection,
        mapping: &FieldMapping,
    ) -> Result<MappingCounts> {
        let resolved = self
            .resolver
            .resolve(&stored_credentials(connection))
            .map_err(SyncError::connector)?;
        let connector = self
            .factory
            .connect(&resolved)
            .await
            .map_err(SyncError::connector)?;

        let result = self
            .reconcile_with(connector.as_ref(), tenant_id, connection, mapping)
            .await;

        if let Err(err) = connector.close().await {
            warn!(
                tenant_id = %tenant_id,
                mapping_id = %mapping.id,
                error = %err,
                "Failed to close connector after mapping sync"
            );
        }

        result
    }

    async fn reconcile_with(
        &self,
        connector: &dyn SourceConnector,
        tenant_id: Uuid,
        connection: &SourceConnection,
        mapping: &FieldMapping,
    ) -> Result<MappingCounts> {
        connector
            .test_connection()
            .await
            .map_err(SyncError::connector)?;

        let field_map = &mapping.fields.0;
        let pk_field = field_map.pk_field();
        let columns = field_map.fetch_columns();

        let rows = connector
            .query(&mapping.resource, &columns, &SourceRow::new(), FETCH_LIMIT)
            .await
            .map_err(SyncError::connector)?;

        debug!(
            tenant_id = %tenant_id,
            mapping_id = %mapping.id,
            resource = %mapping.resource,
            fetched = rows.len(),
            limit = FETCH_LIMIT,
            "Fetched external rows for reconciliation"
        );

        let existing = self
            .store
            .load_mirror(tenant_id, connection.id, mapping.id)
            .await?;
        let existing_ids: HashMap<&str, bool> = existing
            .iter()
            .map(|record| (record.external_id.as_str(), record.is_active))
            .collect();

        // Rows without a usable primary-key value are never mirrored.
        let mut external_map: HashMap<String, SourceRow> = HashMap::with_capacity(rows.len());
        for row in rows {
            let key = external_key(&row, pk_field);
            if key.is_empty() {
                continue;
            }
            external_map.insert(key, row);
        }

        let now = Utc::now();
        let mut inserted = 0usize;
        let mut updated = 0usize;

        for (external_id, row) in &external_map {
            let data = project_record(row, field_map);
            self.store
                .upsert_record(tenant_id, connection.id, mapping.id, external_id, &data, now)
                .await?;

            if existing_ids.contains_key(external_id.as_str()) {
                updated += 1;
            } else {
                inserted += 1;
            }
        }

        let stale: Vec<String> = existing
            .iter()
            .filter(|record| record.is_active && !external_map.contains_key(&record.external_id))
            .map(|record| record.external_id.clone())
            .collect();
        let deactivated = self
            .store
            .deactivate_records(tenant_id, connection.id, mapping.id, &stale, now)
            .await? as usize;

        Ok(MappingCounts {
            inserted,
            updated,
            deactivated,
            total_external: external_map.len(),
            total_mapped: existing.len() + inserted - deactivated,
        })
    }
}

/// String identity of an external row: the configured pk value, falling
/// back to `id`. Empty means the row cannot be mirrored.
fn external_key(row: &SourceRow, pk_field: &str) -> String {
    let value = match row.get(pk_field) {
        Some(Value::Null) | None => row.get("id"),
        value => value,
    };

    match value {
        Some(Value::Null) | None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Canonical payload for one external row: mapped fields that exist in the
/// row (nulls included), plus the raw row under `_raw`.
fn project_record(row: &SourceRow, field_map: &FieldMap) -> Value {
    let mut data = serde_json::Map::new();

    for (field, column) in field_map.entries() {
        if let Some(value) = row.get(column) {
            data.insert(field.as_str().to_string(), value.clone());
        }
    }
    data.insert("_raw".to_string(), Value::Object(row.clone()));

    Value::Object(data)
}

/// View of a connection's encrypted credential material for the resolver.
fn stored_credentials(connection: &SourceConnection) -> StoredCredentials {
    use mirador_db::models::SourceKind as DbSourceKind;

    StoredCredentials {
        tenant_id: connection.tenant_id,
        kind: match connection.source_kind {
            DbSourceKind::Postgres => SourceKind::Postgres,
            DbSourceKind::Mysql => SourceKind::Mysql,
            DbSourceKind::Supabase => SourceKind::Supabase,
        },
        host: connection.host.clone(),
        port: connection.port.map(|p| p as u16),
        database: connection.database_name.clone(),
        username: connection.username.clone(),
        password_encrypted: connection.password_encrypted.clone(),
        config: connection.config.clone(),
    }
}
