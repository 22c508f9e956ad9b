//! The mapping validation flow.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mirador_connector::resolver::{CredentialResolver, StoredCredentials};
use mirador_connector::types::{SourceKind, SourceRow};
use mirador_connector::{ConnectorFactory, SourceConnector};
use mirador_db::models::{FieldMap, SourceConnection};

use crate::error::{MappingError, Result};
use crate::quality::{parse_timestamp, score_sample};
use crate::store::{ConnectionStore, MappingStore};
use crate::types::{
    MappingHealth, MappingPreview, MappingSummary, PreviewRow, ValidateMappingRequest,
    ValidationIssue, ValidationResponse,
};

/// Validates proposed field mappings against live sources.
pub struct MappingValidator {
    connections: Arc<dyn ConnectionStore>,
    mappings: Arc<dyn MappingStore>,
    resolver: CredentialResolver,
    factory: Arc<dyn ConnectorFactory>,
}

/// Outcome of the connector-facing half of validation.
enum Inspection {
    Issues(Vec<ValidationIssue>),
    Preview(MappingPreview),
}

impl MappingValidator {
    /// Create a validator.
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        mappings: Arc<dyn MappingStore>,
        resolver: CredentialResolver,
        factory: Arc<dyn ConnectorFactory>,
    ) -> Self {
        Self {
            connections,
            mappings,
            resolver,
            factory,
        }
    }

    /// Validate a proposed mapping and optionally persist it.
    ///
    /// Domain problems come back as issues inside the response; `Err` is
    /// reserved for the platform's own storage failing. Whatever happens,
    /// a connector that was opened is closed before this returns.
    pub async fn validate(
        &self,
        tenant_id: Uuid,
        request: ValidateMappingRequest,
    ) -> Result<ValidationResponse> {
        debug!(
            tenant_id = %tenant_id,
            resource = %request.resource,
            validate_only = request.validate_only,
            "Validating field mapping"
        );

        // Required fields first; nothing else is worth checking without them.
        let missing = request.fields.missing_required();
        if !missing.is_empty() {
            let issues = missing
                .into_iter()
                .map(ValidationIssue::required_field)
                .collect();
            return Ok(ValidationResponse::failure(issues));
        }

        let field_map = request
            .fields
            .clone()
            .into_field_map()
            .ok_or_else(|| MappingError::Internal("required fields vanished".to_string()))?;

        let Some(connection_id) = request.connection_id else {
            return Ok(ValidationResponse::failure(vec![
                ValidationIssue::connection_not_found(None),
            ]));
        };

        let Some(connection) = self
            .connections
            .find_connection(tenant_id, connection_id)
            .await?
        else {
            return Ok(ValidationResponse::failure(vec![
                ValidationIssue::connection_not_found(Some(connection_id)),
            ]));
        };

        let resolved = match self.resolver.resolve(&stored_credentials(&connection)) {
            Ok(resolved) => resolved,
            Err(err) => {
                return Ok(ValidationResponse::failure(vec![
                    ValidationIssue::validation_error(err),
                ]))
            }
        };

        let connector = match self.factory.connect(&resolved).await {
            Ok(connector) => connector,
            Err(err) => {
                return Ok(ValidationResponse::failure(vec![
                    ValidationIssue::validation_error(err),
                ]))
            }
        };

        let inspection = self
            .inspect_source(connector.as_ref(), tenant_id, &connection, &request, &field_map)
            .await;

        if let Err(err) = connector.close().await {
            warn!(
                tenant_id = %tenant_id,
                connection_id = %connection.id,
                error = %err,
                "Failed to close connector after validation"
            );
        }

        let preview = match inspection? {
            Inspection::Issues(issues) => return Ok(ValidationResponse::failure(issues)),
            Inspection::Preview(preview) => preview,
        };

        if request.validate_only {
            return Ok(ValidationResponse::preview(preview));
        }

        let mapping = self
            .mappings
            .upsert_mapping(
                tenant_id,
                Some(connection_id),
                &request.resource,
                &field_map,
                preview.health.last_validated,
            )
            .await?;

        let metrics_snapshot = serde_json::to_value(&preview.metrics)
            .map_err(|e| MappingError::Internal(format!("metrics serialization: {e}")))?;
        self.mappings
            .record_validation(
                mapping.id,
                true,
                preview.metrics.row_count as i64,
                &metrics_snapshot,
            )
            .await?;

        info!(
            tenant_id = %tenant_id,
            mapping_id = %mapping.id,
            resource = %request.resource,
            sample_rows = preview.metrics.row_count,
            "Field mapping validated and saved"
        );

        Ok(ValidationResponse::saved(
            mapping.id,
            MappingSummary {
                resource: request.resource,
                fields: field_map,
                metrics: preview.metrics,
            },
        ))
    }

    /// Everything that needs the live connector: connectivity, schema
    /// check, sampling, scoring. Source-side failures are returned as
    /// issues; only platform storage failures become `Err`.
    async fn inspect_source(
        &self,
        connector: &dyn SourceConnector,
        tenant_id: Uuid,
        connection: &SourceConnection,
        request: &ValidateMappingRequest,
        field_map: &FieldMap,
    ) -> Result<Inspection> {
        if let Err(err) = connector.test_connection().await {
            self.connections
                .record_connection_test(tenant_id, connection.id, Some(&err.to_string()))
                .await?;
            return Ok(Inspection::Issues(vec![ValidationIssue::connection_failed(
                err,
            )]));
        }
        self.connections
            .record_connection_test(tenant_id, connection.id, None)
            .await?;

        let columns = match connector.list_columns(&request.resource).await {
            Ok(columns) => columns,
            Err(err) => {
                return Ok(Inspection::Issues(vec![ValidationIssue::validation_error(
                    err,
                )]))
            }
        };
        let known: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();

        let issues: Vec<ValidationIssue> = field_map
            .entries()
            .filter(|(_, column)| !known.contains(column))
            .map(|(field, column)| {
                ValidationIssue::invalid_column(field, column, &request.resource)
            })
            .collect();
        if !issues.is_empty() {
            return Ok(Inspection::Issues(issues));
        }

        let sample = match connector
            .sample_data(&request.resource, &field_map.columns())
            .await
        {
            Ok(sample) => sample,
            Err(err) => {
                return Ok(Inspection::Issues(vec![ValidationIssue::validation_error(
                    err,
                )]))
            }
        };

        let metrics = score_sample(&sample, field_map);
        let rows = sample
            .iter()
            .map(|row| project_preview_row(row, field_map))
            .collect::<Vec<_>>();

        Ok(Inspection::Preview(MappingPreview {
            health: MappingHealth {
                resource_exists: true,
                columns_mapped: true,
                sample_rows_found: rows.len(),
                last_validated: Utc::now(),
            },
            rows,
            metrics,
        }))
    }
}

/// Project one sampled row onto the canonical preview shape.
fn project_preview_row(row: &SourceRow, field_map: &FieldMap) -> PreviewRow {
    let date = parse_timestamp(row.get(&field_map.date))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();

    PreviewRow {
        pk: display_value(row.get(field_map.pk_field())),
        status: display_value(row.get(&field_map.status)),
        date,
        contact: display_value(row.get(&field_map.contact)),
        last_touch: field_map
            .last_touch
            .as_deref()
            .map(|column| display_value(row.get(column)))
            .unwrap_or_default(),
    }
}

/// Render a sampled value for display; missing and null become empty.
fn display_value(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use mirador_connector::error::{ConnectorError, ConnectorResult};
    use mirador_connector::resolver::ResolvedSource;
    use mirador_connector::types::ColumnInfo;
    use mirador_connector::CredentialEncryption;
    use mirador_db::models::{FieldMapping, MappingValidation, SourceKind as DbSourceKind};
    use mirador_db::DbError;

    use crate::types::{IssueCode, ProposedFields};

    const MASTER_KEY: [u8; 32] = [0x31u8; 32];

    fn encryption() -> CredentialEncryption {
        CredentialEncryption::new(MASTER_KEY)
    }

    fn connection(tenant_id: Uuid) -> SourceConnection {
        SourceConnection {
            id: Uuid::new_v4(),
            tenant_id,
            name: "warehouse".to_string(),
            source_kind: DbSourceKind::Postgres,
            host: "db.acme.test".to_string(),
            port: None,
            database_name: "crm".to_string(),
            username: "svc".to_string(),
            password_encrypted: encryption().encrypt_string(tenant_id, "pw").unwrap(),
            credentials_key_version: 1,
            config: json!({}),
            sync_frequency_minutes: None,
            auto_sync_enabled: false,
            last_synced_at: None,
            next_sync_at: None,
            is_syncing: false,
            last_connection_test: None,
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // Scripted connector behavior shared between factory and assertions.
    #[derive(Clone, Default)]
    struct Script {
        fail_test: bool,
        columns: Vec<String>,
        sample: Vec<SourceRow>,
        fail_sample: bool,
    }

    struct FakeConnector {
        script: Script,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl SourceConnector for FakeConnector {
        fn kind(&self) -> SourceKind {
            SourceKind::Postgres
        }

        fn display_name(&self) -> &str {
            "fake"
        }

        async fn test_connection(&self) -> ConnectorResult<()> {
            if self.script.fail_test {
                Err(ConnectorError::connection_failed("refused"))
            } else {
                Ok(())
            }
        }

        async fn list_columns(&self, _resource: &str) -> ConnectorResult<Vec<ColumnInfo>> {
            Ok(self
                .script
                .columns
                .iter()
                .map(|c| ColumnInfo::untyped(c.clone()))
                .collect())
        }

        async fn sample_data(
            &self,
            _resource: &str,
            _columns: &[String],
        ) -> ConnectorResult<Vec<SourceRow>> {
            if self.script.fail_sample {
                Err(ConnectorError::query_failed("sample exploded"))
            } else {
                Ok(self.script.sample.clone())
            }
        }

        async fn query(
            &self,
            _resource: &str,
            _columns: &[String],
            _filter: &SourceRow,
            _limit: u32,
        ) -> ConnectorResult<Vec<SourceRow>> {
            Ok(vec![])
        }

        async fn close(&self) -> ConnectorResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeFactory {
        script: Script,
        closed: Arc<AtomicBool>,
        connected: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ConnectorFactory for FakeFactory {
        async fn connect(
            &self,
            _source: &ResolvedSource,
        ) -> ConnectorResult<Box<dyn SourceConnector>> {
            self.connected.store(true, Ordering::SeqCst);
            Ok(Box::new(FakeConnector {
                script: self.script.clone(),
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    #[derive(Default)]
    struct FakeCatalog {
        connection: Option<SourceConnection>,
        saved: Mutex<Vec<(Option<Uuid>, String, FieldMap)>>,
        validations: Mutex<Vec<(Uuid, bool, i64, serde_json::Value)>>,
        connection_tests: Mutex<Vec<Option<String>>>,
        mapping_id: Uuid,
    }

    #[async_trait]
    impl ConnectionStore for FakeCatalog {
        async fn find_connection(
            &self,
            _tenant_id: Uuid,
            connection_id: Uuid,
        ) -> std::result::Result<Option<SourceConnection>, DbError> {
            Ok(self
                .connection
                .clone()
                .filter(|c| c.id == connection_id))
        }

        async fn record_connection_test(
            &self,
            _tenant_id: Uuid,
            _connection_id: Uuid,
            error: Option<&str>,
        ) -> std::result::Result<(), DbError> {
            self.connection_tests
                .lock()
                .unwrap()
                .push(error.map(str::to_string));
            Ok(())
        }
    }

    #[async_trait]
    impl MappingStore for FakeCatalog {
        async fn upsert_mapping(
            &self,
            tenant_id: Uuid,
            connection_id: Option<Uuid>,
            resource: &str,
            fields: &FieldMap,
            validated_at: DateTime<Utc>,
        ) -> std::result::Result<FieldMapping, DbError> {
            self.saved.lock().unwrap().push((
                connection_id,
                resource.to_string(),
                fields.clone(),
            ));
            Ok(FieldMapping {
                id: self.mapping_id,
                tenant_id,
                connection_id,
                resource: resource.to_string(),
                fields: sqlx::types::Json(fields.clone()),
                validated_at: Some(validated_at),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
        }

        async fn record_validation(
            &self,
            mapping_id: Uuid,
            passed: bool,
            row_count: i64,
            metrics: &serde_json::Value,
        ) -> std::result::Result<(), DbError> {
            self.validations
                .lock()
                .unwrap()
                .push((mapping_id, passed, row_count, metrics.clone()));
            Ok(())
        }
    }

    struct Harness {
        validator: MappingValidator,
        catalog: Arc<FakeCatalog>,
        closed: Arc<AtomicBool>,
        connected: Arc<AtomicBool>,
        connection_id: Uuid,
        tenant_id: Uuid,
    }

    fn harness(script: Script) -> Harness {
        let tenant_id = Uuid::new_v4();
        let conn = connection(tenant_id);
        let connection_id = conn.id;

        let catalog = Arc::new(FakeCatalog {
            connection: Some(conn),
            mapping_id: Uuid::new_v4(),
            ..FakeCatalog::default()
        });
        let closed = Arc::new(AtomicBool::new(false));
        let connected = Arc::new(AtomicBool::new(false));
        let factory = Arc::new(FakeFactory {
            script,
            closed: Arc::clone(&closed),
            connected: Arc::clone(&connected),
        });

        let validator = MappingValidator::new(
            Arc::clone(&catalog) as Arc<dyn ConnectionStore>,
            Arc::clone(&catalog) as Arc<dyn MappingStore>,
            CredentialResolver::new(encryption()),
            factory,
        );

        Harness {
            validator,
            catalog,
            closed,
            connected,
            connection_id,
            tenant_id,
        }
    }

    fn good_fields() -> ProposedFields {
        ProposedFields {
            status: Some("state".to_string()),
            date: Some("closed_on".to_string()),
            contact: Some("email".to_string()),
            pk: None,
            last_touch: None,
        }
    }

    fn request(h: &Harness, fields: ProposedFields, validate_only: bool) -> ValidateMappingRequest {
        ValidateMappingRequest {
            connection_id: Some(h.connection_id),
            resource: "deals".to_string(),
            fields,
            validate_only,
        }
    }

    fn good_script() -> Script {
        let mut row = SourceRow::new();
        row.insert("id".to_string(), json!(7));
        row.insert("state".to_string(), json!("won"));
        row.insert("closed_on".to_string(), json!("2026-01-15"));
        row.insert("email".to_string(), json!("a@acme.test"));

        Script {
            fail_test: false,
            columns: vec![
                "id".to_string(),
                "state".to_string(),
                "closed_on".to_string(),
                "email".to_string(),
            ],
            sample: vec![row],
            fail_sample: false,
        }
    }

    #[tokio::test]
    async fn test_missing_required_fields_rejected_before_any_connection() {
        let h = harness(good_script());
        let fields = ProposedFields {
            status: Some("state".to_string()),
            ..ProposedFields::default()
        };

        let response = h
            .validator
            .validate(h.tenant_id, request(&h, fields, true))
            .await
            .unwrap();

        let issues = response.issues();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.code == IssueCode::RequiredField));
        assert!(!h.connected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_null_connection_is_not_found() {
        let h = harness(good_script());
        let mut req = request(&h, good_fields(), true);
        req.connection_id = None;

        let response = h.validator.validate(h.tenant_id, req).await.unwrap();

        assert_eq!(response.issues().len(), 1);
        assert_eq!(response.issues()[0].code, IssueCode::ConnectionNotFound);
    }

    #[tokio::test]
    async fn test_unknown_connection_is_not_found() {
        let h = harness(good_script());
        let mut req = request(&h, good_fields(), true);
        req.connection_id = Some(Uuid::new_v4());

        let response = h.validator.validate(h.tenant_id, req).await.unwrap();

        assert_eq!(response.issues()[0].code, IssueCode::ConnectionNotFound);
        assert!(!h.connected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_connection_failure_short_circuits_and_closes_connector() {
        let mut script = good_script();
        script.fail_test = true;
        let h = harness(script);

        let response = h
            .validator
            .validate(h.tenant_id, request(&h, good_fields(), true))
            .await
            .unwrap();

        let issues = response.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::ConnectionFailed);
        assert!(h.closed.load(Ordering::SeqCst));

        let tests = h.catalog.connection_tests.lock().unwrap();
        assert_eq!(tests.len(), 1);
        assert!(tests[0].is_some());
    }

    #[tokio::test]
    async fn test_unknown_columns_yield_one_issue_each() {
        let mut script = good_script();
        script.columns = vec!["id".to_string(), "state".to_string()];
        let h = harness(script);

        let response = h
            .validator
            .validate(h.tenant_id, request(&h, good_fields(), true))
            .await
            .unwrap();

        let issues = response.issues();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.code == IssueCode::InvalidColumn));
        assert!(issues.iter().any(|i| i.field == "date" && i.message.contains("closed_on")));
        assert!(issues.iter().any(|i| i.field == "contact" && i.message.contains("deals")));
        assert!(h.closed.load(Ordering::SeqCst));
        assert!(h.catalog.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preview_projects_rows_and_skips_persistence() {
        let h = harness(good_script());

        let response = h
            .validator
            .validate(h.tenant_id, request(&h, good_fields(), true))
            .await
            .unwrap();

        let ValidationResponse::Preview { ok, preview } = response else {
            panic!("expected preview response");
        };
        assert!(ok);
        assert!(preview.health.resource_exists);
        assert!(preview.health.columns_mapped);
        assert_eq!(preview.health.sample_rows_found, 1);

        let row = &preview.rows[0];
        assert_eq!(row.pk, "7");
        assert_eq!(row.status, "won");
        assert_eq!(row.contact, "a@acme.test");
        assert!(row.date.starts_with("2026-01-15T"));
        assert_eq!(row.last_touch, "");

        assert!(h.closed.load(Ordering::SeqCst));
        assert!(h.catalog.saved.lock().unwrap().is_empty());
        assert!(h.catalog.validations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persist_upserts_mapping_and_appends_audit() {
        let h = harness(good_script());

        let response = h
            .validator
            .validate(h.tenant_id, request(&h, good_fields(), false))
            .await
            .unwrap();

        let ValidationResponse::Saved {
            ok,
            mapping_id,
            summary,
        } = response
        else {
            panic!("expected saved response");
        };
        assert!(ok);
        assert_eq!(mapping_id, h.catalog.mapping_id);
        assert_eq!(summary.resource, "deals");
        assert_eq!(summary.fields.status, "state");
        assert_eq!(summary.metrics.row_count, 1);

        let saved = h.catalog.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, Some(h.connection_id));

        let validations = h.catalog.validations.lock().unwrap();
        assert_eq!(validations.len(), 1);
        let (recorded_id, passed, row_count, metrics) = &validations[0];
        assert_eq!(*recorded_id, h.catalog.mapping_id);
        assert!(*passed);
        assert_eq!(*row_count, 1);
        assert_eq!(metrics["contact_non_null"], json!(1.0));
    }

    #[tokio::test]
    async fn test_sample_failure_normalizes_to_validation_error() {
        let mut script = good_script();
        script.fail_sample = true;
        let h = harness(script);

        let response = h
            .validator
            .validate(h.tenant_id, request(&h, good_fields(), false))
            .await
            .unwrap();

        let issues = response.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::ValidationError);
        assert!(h.closed.load(Ordering::SeqCst));
        assert!(h.catalog.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undecryptable_credentials_fail_before_connecting() {
        let h = harness(good_script());
        // Re-point the validator at a resolver with the wrong master key.
        let validator = MappingValidator::new(
            Arc::clone(&h.catalog) as Arc<dyn ConnectionStore>,
            Arc::clone(&h.catalog) as Arc<dyn MappingStore>,
            CredentialResolver::new(CredentialEncryption::new([0x99u8; 32])),
            Arc::new(FakeFactory {
                script: good_script(),
                closed: Arc::clone(&h.closed),
                connected: Arc::clone(&h.connected),
            }),
        );

        let response = validator
            .validate(h.tenant_id, request(&h, good_fields(), true))
            .await
            .unwrap();

        assert_eq!(response.issues()[0].code, IssueCode::ValidationError);
        assert!(!h.connected.load(Ordering::SeqCst));
    }

    #[test]
    fn test_display_value_rendering() {
        assert_eq!(display_value(Some(&json!("won"))), "won");
        assert_eq!(display_value(Some(&json!(12))), "12");
        assert_eq!(display_value(Some(&json!(true))), "true");
        assert_eq!(display_value(Some(&json!(null))), "");
        assert_eq!(display_value(None), "");
    }

    #[test]
    fn test_project_preview_row_unparseable_date_is_empty() {
        let mut row = SourceRow::new();
        row.insert("id".to_string(), json!("x-1"));
        row.insert("state".to_string(), json!("open"));
        row.insert("closed_on".to_string(), json!("whenever"));
        row.insert("email".to_string(), json!(null));

        let map = FieldMap {
            status: "state".to_string(),
            date: "closed_on".to_string(),
            contact: "email".to_string(),
            pk: None,
            last_touch: None,
        };

        let preview = project_preview_row(&row, &map);
        assert_eq!(preview.pk, "x-1");
        assert_eq!(preview.date, "");
        assert_eq!(preview.contact, "");
    }
}
