//! Tests for the comparison setup models.

use super::*;

fn oracle_endpoint() -> EndpointConfig {
    EndpointConfig::new(
        Dialect::Oracle,
        "ora.example.com",
        "ORCLPDB1",
        Credentials::new("scott", "tiger"),
    )
}

#[test]
fn test_dialect_from_str_accepts_aliases() {
    assert_eq!("postgres".parse::<Dialect>().unwrap(), Dialect::PostgreSql);
    assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::PostgreSql);
    assert_eq!("mssql".parse::<Dialect>().unwrap(), Dialect::SqlServer);
    assert_eq!(" oracle ".parse::<Dialect>().unwrap(), Dialect::Oracle);
    assert!("db2".parse::<Dialect>().is_err());
}

#[test]
fn test_dialect_serde_uses_wire_names() {
    for dialect in Dialect::ALL {
        let json = serde_json::to_string(&dialect).unwrap();
        assert_eq!(json, format!("\"{}\"", dialect.as_str()));
    }
}

#[test]
fn test_default_port_never_overwrites_user_port() {
    let config = oracle_endpoint().with_port(1600).with_default_port();
    assert_eq!(config.port, Some(1600));

    let config = oracle_endpoint().with_default_port().with_default_port();
    assert_eq!(config.port, Some(1521));
}

#[test]
fn test_resolved_port_falls_back_to_dialect_default() {
    let config = EndpointConfig::new(
        Dialect::SqlServer,
        "mssql",
        "sales",
        Credentials::new("sa", "pw"),
    );
    assert_eq!(config.port, None);
    assert_eq!(config.resolved_port(), 1433);
}

#[test]
fn test_oracle_requires_schema_filter() {
    let err = oracle_endpoint().validate().unwrap_err();
    assert!(matches!(err, DbCompareError::Validation { .. }));
    assert!(err.to_string().contains("schema filter is required"));

    let err = oracle_endpoint()
        .with_schema_filter("   ")
        .validate()
        .unwrap_err();
    assert!(matches!(err, DbCompareError::Validation { .. }));

    assert!(oracle_endpoint().with_schema_filter("hr").validate().is_ok());
}

#[test]
fn test_oracle_rejects_malformed_filter() {
    let err = oracle_endpoint()
        .with_schema_filter("HR' OR '1'='1")
        .validate()
        .unwrap_err();
    assert!(err.to_string().contains("not a valid owner name"));
}

#[test]
fn test_non_oracle_filter_is_optional() {
    let config = EndpointConfig::new(
        Dialect::MySql,
        "mysql",
        "shop",
        Credentials::new("root", "pw"),
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_missing_fields() {
    let mut config = oracle_endpoint().with_schema_filter("HR");
    config.host = String::new();
    assert!(config.validate().is_err());

    let config = oracle_endpoint().with_schema_filter("HR").with_port(0);
    assert!(config.validate().is_err());

    let mut config = oracle_endpoint().with_schema_filter("HR");
    config.database = " ".to_string();
    assert!(config.validate().is_err());

    let mut config = oracle_endpoint().with_schema_filter("HR");
    config.credentials = Credentials::new("", "pw");
    assert!(config.validate().is_err());
}

#[test]
fn test_normalized_filter_trims_and_uppercases() {
    let config = oracle_endpoint().with_schema_filter("  hr_app ");
    assert_eq!(config.normalized_filter().as_deref(), Some("HR_APP"));
}

#[test]
fn test_endpoint_display_omits_credentials() {
    let config = oracle_endpoint().with_schema_filter("HR").with_default_port();
    let shown = config.to_string();
    assert_eq!(shown, "oracle://ora.example.com:1521/ORCLPDB1");
    assert!(!shown.contains("tiger"));
    assert!(!format!("{config:?}").contains("tiger"));
}

#[test]
fn test_endpoint_deserializes_from_camel_case() {
    let json = r#"{
        "dbType": "postgres",
        "host": "pg.local",
        "database": "app",
        "username": "reader",
        "password": "pw",
        "schemaFilter": "public"
    }"#;
    let config: EndpointConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.dialect, Dialect::PostgreSql);
    assert_eq!(config.port, None);
    assert_eq!(config.credentials.username(), "reader");
    assert!(config.credentials.has_secret());
    assert_eq!(config.schema_filter.as_deref(), Some("public"));
}

#[test]
fn test_table_list_normalizes_and_dedupes() {
    let tables = TableList::from_names(["Users", " ORDERS ", "", "users", "Orders", "items"]);
    assert_eq!(tables.as_slice(), ["users", "orders", "items"]);
    assert_eq!(tables.len(), 3);
}

#[test]
fn test_probe_result_accessors() {
    let ok = ProbeResult::success(EndpointRole::Source);
    assert!(ok.is_success());
    assert!(ok.failure_reason().is_none());

    let failed = ProbeResult::failure(
        EndpointRole::Target,
        FailureReason::Timeout {
            operation: Operation::Probe,
            bound: Duration::from_secs(30),
        },
    );
    assert!(!failed.is_success());
    assert_eq!(failed.role(), EndpointRole::Target);
    assert!(failed.failure_reason().is_some_and(FailureReason::is_timeout));
}

#[test]
fn test_failure_reason_messages() {
    let probe_timeout = FailureReason::Timeout {
        operation: Operation::Probe,
        bound: Duration::from_secs(30),
    };
    assert_eq!(
        probe_timeout.to_string(),
        "Connection timed out. Please check your settings or try again later."
    );

    let listing_timeout = FailureReason::Timeout {
        operation: Operation::TableListing,
        bound: Duration::from_secs(30),
    };
    assert!(listing_timeout.to_string().starts_with("Loading tables timed out"));
}

#[test]
fn test_failure_reason_from_error() {
    let reason = FailureReason::from_error(&DbCompareError::validation("host cannot be empty"));
    assert_eq!(
        reason,
        FailureReason::Validation {
            detail: "host cannot be empty".to_string()
        }
    );

    let reason = FailureReason::from_error(&DbCompareError::discovery_failed(
        EndpointRole::Source,
        "fallback failed",
    ));
    assert!(matches!(reason, FailureReason::DiscoveryFailed { .. }));
}

#[test]
fn test_column_mapping_parses_legacy_key_flag() {
    let json = r#"{"sourceColumn":"ID","targetColumn":"id","iskey":true}"#;
    let mapping: ColumnMapping = serde_json::from_str(json).unwrap();
    assert!(mapping.is_key);
    assert_eq!(mapping.transformation, Transformation::None);
}

#[test]
fn test_column_mapping_custom_requires_expression() {
    let json = r#"{"sourceColumn":"a","targetColumn":"b","transformationType":"custom"}"#;
    assert!(serde_json::from_str::<ColumnMapping>(json).is_err());

    let json = r#"{"sourceColumn":"a","targetColumn":"b","transformationType":"custom","customTransformation":"SUBSTR(a,1,4)"}"#;
    let mapping: ColumnMapping = serde_json::from_str(json).unwrap();
    assert_eq!(mapping.transformation.expression(), Some("SUBSTR(a,1,4)"));

    let value = serde_json::to_value(&mapping).unwrap();
    assert_eq!(value["transformationType"], "custom");
    assert_eq!(value["customTransformation"], "SUBSTR(a,1,4)");
}

#[test]
fn test_column_mapping_rejects_unknown_transformation() {
    let json = r#"{"sourceColumn":"a","targetColumn":"b","transformationType":"reverse"}"#;
    assert!(serde_json::from_str::<ColumnMapping>(json).is_err());
}

#[test]
fn test_column_mapping_validate() {
    assert!(ColumnMapping::key("id", "id").validate().is_ok());
    assert!(ColumnMapping::new("", "id").validate().is_err());
    let blank = ColumnMapping::new("a", "b").with_transformation(Transformation::Custom(" ".into()));
    assert!(matches!(
        blank.validate(),
        Err(DbCompareError::Assembly { .. })
    ));
}

#[test]
fn test_table_mapping_keys() {
    let mapping = TableMapping::new("orders", "orders")
        .with_column(ColumnMapping::key("order_id", "id"))
        .with_column(ColumnMapping::new("total", "amount"));
    assert!(mapping.has_key());
    assert_eq!(mapping.key_columns(), vec!["order_id"]);
    assert!(!TableMapping::new("a", "a").has_key());
}

#[test]
fn test_policy_defaults() {
    let policy = ComparisonPolicy::default();
    assert!(!policy.case_sensitive());
    assert!(policy.ignore_whitespace());
    assert!(policy.ignore_nulls());
    assert!((policy.similarity_threshold() - 0.8).abs() < f64::EPSILON);
    assert!((policy.numeric_tolerance() - 0.001).abs() < f64::EPSILON);
}

#[test]
fn test_policy_rejects_out_of_range_values() {
    assert!(ComparisonPolicy::new(false, true, true, -0.1, 0.0).is_err());
    assert!(ComparisonPolicy::new(false, true, true, f64::NAN, 0.0).is_err());
    assert!(ComparisonPolicy::new(false, true, true, 0.5, -1.0).is_err());
    assert!(ComparisonPolicy::new(false, true, true, 0.5, f64::INFINITY).is_err());
    assert!(ComparisonPolicy::new(false, true, true, 0.0, 0.0).is_ok());
    assert!(ComparisonPolicy::new(false, true, true, 1.0, 10.0).is_ok());
}

#[test]
fn test_policy_deserializes_with_defaults() {
    let policy: ComparisonPolicy =
        serde_json::from_str(r#"{"caseSensitive":true,"stringSimilarityThreshold":0.95}"#)
            .unwrap();
    assert!(policy.case_sensitive());
    assert!(policy.ignore_nulls());
    assert!((policy.similarity_threshold() - 0.95).abs() < f64::EPSILON);

    assert!(serde_json::from_str::<ComparisonPolicy>(r#"{"numericTolerance":-2}"#).is_err());
}

#[test]
fn test_ticket_accepts_id_alias() {
    let ticket: ComparisonTicket = serde_json::from_str(r#"{"id":"cmp-42"}"#).unwrap();
    assert_eq!(ticket.comparison_id, "cmp-42");
}

#[test]
fn test_comparison_request_gets_unique_id() {
    let source = oracle_endpoint().with_schema_filter("HR");
    let first = ComparisonRequest::new(
        source.clone(),
        source.clone(),
        ComparisonPolicy::default(),
        vec![],
    );
    let second = ComparisonRequest::new(source.clone(), source, ComparisonPolicy::default(), vec![]);
    assert_ne!(first.request_id(), second.request_id());
}
