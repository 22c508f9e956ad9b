//! Data quality scoring over sampled rows.
//!
//! Quality results are advisory: a mapping is never rejected for low
//! ratios, but ratios under [`WARNING_THRESHOLD`] produce warnings shown in
//! the preview.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mirador_connector::types::SourceRow;
use mirador_db::models::FieldMap;

/// Ratio below which a field earns a warning.
pub const WARNING_THRESHOLD: f64 = 0.3;

/// Ratio above which date/status are reported as healthy.
pub const HEALTHY_THRESHOLD: f64 = 0.5;

/// Quality metrics computed over a sample.
///
/// The shape is asymmetric on purpose: `contact_non_null` is the raw ratio
/// while `date_parse_success` and `status_valid` collapse to booleans.
/// Downstream consumers depend on exactly this shape, so it is kept even
/// though a uniform representation would be cleaner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Number of sampled rows the ratios were computed over.
    pub row_count: usize,
    /// Fraction of rows with a non-blank contact value.
    pub contact_non_null: f64,
    /// Whether more than half the rows carry a parseable date.
    pub date_parse_success: bool,
    /// Whether more than half the rows carry a non-blank status.
    pub status_valid: bool,
    /// Advisory warnings for fields under the warning threshold.
    pub warnings: Vec<String>,
}

/// Score a sample against the mapping's canonical fields.
pub fn score_sample(rows: &[SourceRow], fields: &FieldMap) -> QualityMetrics {
    let row_count = rows.len();

    let contact_ratio = ratio(rows, |row| is_non_blank(row.get(fields.contact.as_str())));
    let date_ratio = ratio(rows, |row| {
        parse_timestamp(row.get(fields.date.as_str())).is_some()
    });
    let status_ratio = ratio(rows, |row| is_non_blank(row.get(fields.status.as_str())));

    let mut warnings = Vec::new();
    if row_count > 0 {
        if contact_ratio < WARNING_THRESHOLD {
            warnings.push(low_quality_warning("contact", &fields.contact, contact_ratio));
        }
        if date_ratio < WARNING_THRESHOLD {
            warnings.push(low_quality_warning("date", &fields.date, date_ratio));
        }
        if status_ratio < WARNING_THRESHOLD {
            warnings.push(low_quality_warning("status", &fields.status, status_ratio));
        }
    }

    QualityMetrics {
        row_count,
        contact_non_null: contact_ratio,
        date_parse_success: date_ratio > HEALTHY_THRESHOLD,
        status_valid: status_ratio > HEALTHY_THRESHOLD,
        warnings,
    }
}

fn ratio(rows: &[SourceRow], predicate: impl Fn(&SourceRow) -> bool) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let hits = rows.iter().filter(|row| predicate(row)).count();
    hits as f64 / rows.len() as f64
}

fn low_quality_warning(field: &str, column: &str, ratio: f64) -> String {
    format!(
        "Only {}% of sampled rows have a usable {field} value in column '{column}'",
        (ratio * 100.0).round() as i64
    )
}

/// Whether a sampled value is present and non-blank once stringified.
fn is_non_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Parse a sampled value as a timestamp.
///
/// Accepts RFC 3339, common date and datetime layouts, and numeric epochs
/// (seconds or milliseconds).
pub fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => {
            let epoch = n.as_i64()?;
            // Values this large can only be millisecond epochs.
            if epoch.abs() >= 100_000_000_000 {
                Utc.timestamp_millis_opt(epoch).single()
            } else {
                Utc.timestamp_opt(epoch, 0).single()
            }
        }
        _ => None,
    }
}

fn parse_timestamp_str(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed.and_utc());
        }
    }

    for format in ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, format) {
            return parsed.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields() -> FieldMap {
        FieldMap {
            status: "state".to_string(),
            date: "closed_on".to_string(),
            contact: "email".to_string(),
            pk: None,
            last_touch: None,
        }
    }

    fn row(state: &str, closed_on: &str, email: &str) -> SourceRow {
        let mut row = SourceRow::new();
        row.insert("state".to_string(), json!(state));
        row.insert("closed_on".to_string(), json!(closed_on));
        row.insert("email".to_string(), json!(email));
        row
    }

    #[test]
    fn test_healthy_sample_has_no_warnings() {
        let rows = vec![
            row("won", "2026-01-15", "a@acme.test"),
            row("lost", "2026-02-01", "b@acme.test"),
        ];

        let metrics = score_sample(&rows, &fields());
        assert_eq!(metrics.row_count, 2);
        assert_eq!(metrics.contact_non_null, 1.0);
        assert!(metrics.date_parse_success);
        assert!(metrics.status_valid);
        assert!(metrics.warnings.is_empty());
    }

    #[test]
    fn test_sparse_contact_reports_ratio_and_warning() {
        // 1 of 10 rows has a non-blank email.
        let mut rows = vec![row("open", "2026-01-01", "only@acme.test")];
        for _ in 0..9 {
            rows.push(row("open", "2026-01-01", " "));
        }

        let metrics = score_sample(&rows, &fields());
        assert!((metrics.contact_non_null - 0.1).abs() < f64::EPSILON);
        assert_eq!(metrics.warnings.len(), 1);
        assert!(metrics.warnings[0].contains("10%"));
        assert!(metrics.warnings[0].contains("contact"));
        assert!(metrics.warnings[0].contains("email"));
    }

    #[test]
    fn test_date_and_status_collapse_to_booleans() {
        let rows = vec![
            row("won", "not a date", "a@acme.test"),
            row("", "2026-03-01", "b@acme.test"),
            row("open", "2026-03-02", "c@acme.test"),
        ];

        let metrics = score_sample(&rows, &fields());
        // 2/3 dates parse, 2/3 statuses non-blank
        assert!(metrics.date_parse_success);
        assert!(metrics.status_valid);
        assert!(metrics.warnings.is_empty());
    }

    #[test]
    fn test_exactly_half_is_not_healthy() {
        let rows = vec![
            row("won", "2026-03-01", "a@acme.test"),
            row("", "nope", "b@acme.test"),
        ];

        let metrics = score_sample(&rows, &fields());
        assert!(!metrics.date_parse_success);
        assert!(!metrics.status_valid);
    }

    #[test]
    fn test_empty_sample_is_quiet() {
        let metrics = score_sample(&[], &fields());
        assert_eq!(metrics.row_count, 0);
        assert_eq!(metrics.contact_non_null, 0.0);
        assert!(!metrics.date_parse_success);
        assert!(!metrics.status_valid);
        assert!(metrics.warnings.is_empty());
    }

    #[test]
    fn test_non_string_values_count_as_present() {
        let mut row = SourceRow::new();
        row.insert("state".to_string(), json!(3));
        row.insert("closed_on".to_string(), json!("2026-01-01"));
        row.insert("email".to_string(), json!(false));

        let metrics = score_sample(&[row], &fields());
        assert_eq!(metrics.contact_non_null, 1.0);
        assert!(metrics.status_valid);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp(Some(&json!("2026-01-15T10:30:00Z"))).is_some());
        assert!(parse_timestamp(Some(&json!("2026-01-15 10:30:00"))).is_some());
        assert!(parse_timestamp(Some(&json!("2026-01-15"))).is_some());
        assert!(parse_timestamp(Some(&json!("01/15/2026"))).is_some());
        assert!(parse_timestamp(Some(&json!(1_767_225_600))).is_some());
        assert!(parse_timestamp(Some(&json!(1_767_225_600_000_i64))).is_some());

        assert!(parse_timestamp(Some(&json!("soon"))).is_none());
        assert!(parse_timestamp(Some(&json!(""))).is_none());
        assert!(parse_timestamp(Some(&json!(null))).is_none());
        assert!(parse_timestamp(None).is_none());
    }

    #[test]
    fn test_parse_timestamp_epoch_units() {
        let seconds = parse_timestamp(Some(&json!(1_767_225_600))).unwrap();
        let millis = parse_timestamp(Some(&json!(1_767_225_600_000_i64))).unwrap();
        assert_eq!(seconds, millis);
    }
}
