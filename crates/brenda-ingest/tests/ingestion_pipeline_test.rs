//! End-to-end tests for the BRENDA mirror rebuild

use brenda_ingest::brenda::{IngestError, IngestionPipeline, IngestionReport, SourceKind};
use brenda_ingest::config::IngestConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn sample_config(target: &Path) -> IngestConfig {
    IngestConfig::new(
        fixture_path().join("sample_release.json"),
        fixture_path().join("sample_release.txt"),
        target,
    )
}

async fn rebuild(config: IngestConfig) -> IngestionReport {
    IngestionPipeline::new(config)
        .run()
        .await
        .expect("Rebuild failed")
}

async fn connect(path: &Path) -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().filename(path))
        .await
        .expect("Failed to open mirror")
}

fn gzip(source: &Path, target: &Path) {
    let mut encoder = flate2::write::GzEncoder::new(
        std::fs::File::create(target).unwrap(),
        flate2::Compression::fast(),
    );
    encoder.write_all(&std::fs::read(source).unwrap()).unwrap();
    encoder.finish().unwrap();
}

// ============================================================================
// FULL REBUILD
// ============================================================================

#[tokio::test]
async fn test_rebuild_from_sample_release() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("processed").join("brenda.db");

    let report = rebuild(sample_config(&target)).await;

    assert_eq!(report.table_counts.enzymes, 2);
    assert_eq!(report.table_counts.proteins, 3);
    assert_eq!(report.table_counts.enzyme_facts, 11);
    assert_eq!(report.table_counts.text_facts, 8);
    assert_eq!(report.rows_written.enzyme_facts, 11);

    // "3.1.1.1" is not an object; one null cofactor entry
    assert_eq!(report.skipped_records, 1);
    assert_eq!(report.skipped_entries, 1);
    assert_eq!(report.duplicate_records, 0);

    assert_eq!(report.category_counts.get("inhibitor"), Some(&3));
    assert_eq!(report.field_code_counts.get("KM"), Some(&2));
    assert_eq!(report.unknown_field_codes, ["XX"]);
}

#[tokio::test]
async fn test_enzyme_with_protein_and_three_inhibitors() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("brenda.db");
    rebuild(sample_config(&target)).await;
    let pool = connect(&target).await;

    let (name, protein_count, inhibitor_count, km_count, reaction_summary): (
        Option<String>,
        i64,
        i64,
        i64,
        Option<String>,
    ) = sqlx::query_as(
        "SELECT recommended_name, protein_count, inhibitor_count, km_count, reaction_summary \
         FROM enzymes WHERE ec_number = '1.1.1.1'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(name.as_deref(), Some("alcohol dehydrogenase"));
    assert_eq!(protein_count, 1);
    assert_eq!(inhibitor_count, 3);
    assert_eq!(km_count, 2);
    assert_eq!(
        reaction_summary.as_deref(),
        Some("a primary alcohol + NAD+ = an aldehyde + NADH + H+")
    );

    let organism: Option<String> =
        sqlx::query_scalar("SELECT organism FROM proteins WHERE ec_number = '1.1.1.1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(organism.as_deref(), Some("Homo sapiens"));

    let (low, high): (Option<f64>, Option<f64>) = sqlx::query_as(
        "SELECT value_numeric_low, value_numeric_high FROM enzyme_facts \
         WHERE ec_number = '1.1.1.1' AND category = 'inhibitor' AND value = 'more'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!((low, high), (None, None));
}

#[tokio::test]
async fn test_numeric_extraction_in_mirror() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("brenda.db");
    rebuild(sample_config(&target)).await;
    let pool = connect(&target).await;

    let rows: Vec<(String, Option<f64>, Option<f64>, Option<String>, Option<String>)> =
        sqlx::query_as(
            "SELECT value, value_numeric_low, value_numeric_high, unit, context \
             FROM enzyme_facts WHERE category IN ('km_value', 'turnover_number') ORDER BY id",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

    assert_eq!(
        rows[0],
        (
            "0.1-0.5 mM {25°C}".to_string(),
            Some(0.1),
            Some(0.5),
            Some("mM".to_string()),
            Some("25°C".to_string())
        )
    );
    // sentinel passes through unchanged
    assert_eq!(rows[1].1, Some(-999.0));
    assert_eq!(rows[1].2, None);
    assert_eq!(rows[1].4.as_deref(), Some("ethanol"));

    assert_eq!((rows[2].1, rows[2].2), (Some(12.0), Some(15.0)));

    let violations: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM enzyme_facts \
         WHERE value_numeric_high IS NOT NULL AND value_numeric_high <= value_numeric_low",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(violations, 0);
}

#[tokio::test]
async fn test_enzyme_counts_match_detail_tables() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("brenda.db");
    rebuild(sample_config(&target)).await;
    let pool = connect(&target).await;

    let mismatches: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM enzymes e
        WHERE e.protein_count != (SELECT COUNT(*) FROM proteins p WHERE p.ec_number = e.ec_number)
           OR e.synonym_count != (SELECT COUNT(*) FROM enzyme_facts f
                                  WHERE f.ec_number = e.ec_number AND f.category = 'synonyms')
           OR e.reaction_count != (SELECT COUNT(*) FROM enzyme_facts f
                                   WHERE f.ec_number = e.ec_number AND f.category = 'reaction')
           OR e.km_count != (SELECT COUNT(*) FROM enzyme_facts f
                             WHERE f.ec_number = e.ec_number AND f.category = 'km_value')
           OR e.turnover_count != (SELECT COUNT(*) FROM enzyme_facts f
                                   WHERE f.ec_number = e.ec_number AND f.category = 'turnover_number')
           OR e.inhibitor_count != (SELECT COUNT(*) FROM enzyme_facts f
                                    WHERE f.ec_number = e.ec_number AND f.category = 'inhibitor')
        "#,
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(mismatches, 0);
}

#[tokio::test]
async fn test_protein_without_organism_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("brenda.db");
    rebuild(sample_config(&target)).await;
    let pool = connect(&target).await;

    let proteins: Vec<(Option<String>, Option<String>, Option<String>)> = sqlx::query_as(
        "SELECT protein_id, organism, comment FROM proteins WHERE ec_number = '2.7.1.1' ORDER BY id",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(proteins.len(), 2);
    assert_eq!(proteins[0].1, None);
    assert_eq!(proteins[0].2.as_deref(), Some("no organism recorded"));
    assert_eq!(proteins[1].1.as_deref(), Some("Saccharomyces cerevisiae"));
}

#[tokio::test]
async fn test_text_facts_from_flat_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("brenda.db");
    rebuild(sample_config(&target)).await;
    let pool = connect(&target).await;

    let inline: (String, String, String, Option<String>) = sqlx::query_as(
        "SELECT ec_number, field_name, value_text, qualifiers FROM text_facts \
         WHERE field_code = 'KM' AND value_raw = '0.5 {pH 7.0}'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(
        inline,
        (
            "1.1.1.1".to_string(),
            "Km value".to_string(),
            "0.5".to_string(),
            Some("pH 7.0".to_string())
        )
    );

    let unknown: (String, String, Option<String>) = sqlx::query_as(
        "SELECT field_name, value_text, reference_tokens FROM text_facts WHERE field_code = 'XX'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(unknown.0, "XX");
    assert_eq!(unknown.1, "annotation with an unlisted code");
    assert_eq!(unknown.2.as_deref(), Some("4"));

    let continued: (String, Option<String>, Option<String>) = sqlx::query_as(
        "SELECT value_text, protein_tokens, reference_tokens FROM text_facts \
         WHERE field_code = 'IN' AND value_raw LIKE '%pyrazole%'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(
        continued,
        ("pyrazole".to_string(), Some("1".to_string()), Some("4".to_string()))
    );

    let indexes: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(indexes, 6);
}

// ============================================================================
// REBUILD SEMANTICS
// ============================================================================

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("brenda.db");

    let first = rebuild(sample_config(&target)).await;
    let second = rebuild(sample_config(&target)).await;

    assert_eq!(first.table_counts, second.table_counts);
    assert_eq!(first.category_counts, second.category_counts);
    assert_eq!(first.field_code_counts, second.field_code_counts);
}

#[tokio::test]
async fn test_duplicate_ec_number_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("duplicates.json");
    std::fs::write(
        &json,
        r#"{"data": {
            "1.1.1.1": {"recommended_name": "first", "inhibitor": [{"value": "EDTA"}]},
            "1.1.1.1": {"recommended_name": "second"}
        }}"#,
    )
    .unwrap();

    let target = dir.path().join("brenda.db");
    let config = IngestConfig::new(&json, fixture_path().join("sample_release.txt"), &target);
    let report = rebuild(config).await;

    assert_eq!(report.table_counts.enzymes, 1);
    assert_eq!(report.duplicate_records, 1);

    let pool = connect(&target).await;
    let name: Option<String> = sqlx::query_scalar("SELECT recommended_name FROM enzymes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_enzyme_larger_than_one_batch() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("large.json");
    let km: Vec<serde_json::Value> = (0..3000)
        .map(|i| serde_json::json!({"value": format!("{i}.5"), "substrate": "ethanol"}))
        .collect();
    let proteins: serde_json::Map<String, serde_json::Value> = (0..6000)
        .map(|i| (i.to_string(), serde_json::json!({"organism": "Homo sapiens"})))
        .collect();
    let release = serde_json::json!({"data": {
        "1.1.1.1": {"km_value": km, "protein": proteins}
    }});
    std::fs::write(&json, release.to_string()).unwrap();

    let target = dir.path().join("brenda.db");
    let config = IngestConfig::new(&json, fixture_path().join("sample_release.txt"), &target);
    let report = rebuild(config).await;

    assert_eq!(report.table_counts.enzymes, 1);
    assert_eq!(report.table_counts.enzyme_facts, 3000);
    assert_eq!(report.table_counts.proteins, 6000);

    let pool = connect(&target).await;
    let km_count: i64 = sqlx::query_scalar("SELECT km_count FROM enzymes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(km_count, 3000);
}

#[tokio::test]
async fn test_gzip_sources_give_same_mirror() {
    let dir = tempfile::tempdir().unwrap();
    let json_gz = dir.path().join("release.json.gz");
    let text_gz = dir.path().join("release.txt.gz");
    gzip(&fixture_path().join("sample_release.json"), &json_gz);
    gzip(&fixture_path().join("sample_release.txt"), &text_gz);

    let plain = rebuild(sample_config(&dir.path().join("plain.db"))).await;
    let compressed = rebuild(IngestConfig::new(
        &json_gz,
        &text_gz,
        dir.path().join("compressed.db"),
    ))
    .await;

    assert_eq!(plain.table_counts, compressed.table_counts);
}

// ============================================================================
// FATAL ERRORS
// ============================================================================

#[tokio::test]
async fn test_missing_source_leaves_target_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("brenda.db");
    std::fs::write(&target, b"previous mirror").unwrap();

    let config = IngestConfig::new(
        dir.path().join("missing.json"),
        fixture_path().join("sample_release.txt"),
        &target,
    );
    let err = IngestionPipeline::new(config).run().await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::SourceNotFound {
            kind: SourceKind::Json,
            ..
        }
    ));
    assert_eq!(std::fs::read(&target).unwrap(), b"previous mirror");
}

#[tokio::test]
async fn test_missing_text_source_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = IngestConfig::new(
        fixture_path().join("sample_release.json"),
        dir.path().join("missing.txt"),
        dir.path().join("brenda.db"),
    );
    let err = IngestionPipeline::new(config).run().await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::SourceNotFound {
            kind: SourceKind::Text,
            ..
        }
    ));
    assert!(!dir.path().join("brenda.db").exists());
}

#[tokio::test]
async fn test_non_object_json_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("list.json");
    std::fs::write(&json, r#"[{"id": "1.1.1.1"}]"#).unwrap();

    let config = IngestConfig::new(
        &json,
        fixture_path().join("sample_release.txt"),
        dir.path().join("brenda.db"),
    );
    let err = IngestionPipeline::new(config).run().await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::SourceFormat {
            kind: SourceKind::Json,
            ..
        }
    ));
}

#[tokio::test]
async fn test_empty_text_file_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let text = dir.path().join("empty.txt");
    std::fs::write(&text, "").unwrap();

    let config = IngestConfig::new(
        fixture_path().join("sample_release.json"),
        &text,
        dir.path().join("brenda.db"),
    );
    let err = IngestionPipeline::new(config).run().await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::SourceFormat {
            kind: SourceKind::Text,
            ..
        }
    ));
}

#[tokio::test]
async fn test_invalid_batch_size_is_rejected_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let config = sample_config(&dir.path().join("brenda.db")).with_batch_size(0);
    let err = IngestionPipeline::new(config).run().await.unwrap_err();

    assert!(matches!(err, IngestError::Config(_)));
}
