use httpmock::prelude::*;
use sales_etl::config::{EtlConfig, TomlConfig};
use sales_etl::core::normalizer::{default_mapping, Normalizer};
use sales_etl::core::writer::BatchWriter;
use sales_etl::{EtlEngine, ImportPipeline, PostgrestClient};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_csv(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn config_for(server: &MockServer) -> EtlConfig {
    let mut config = EtlConfig::default();
    config.apply_file(&TomlConfig::default());
    config.destination.url = server.base_url();
    config.destination.key = "test-key".to_string();
    config.import.delay_ms = 0;
    config
}

#[tokio::test]
async fn test_end_to_end_import_with_real_http() {
    let server = MockServer::start();

    let insert_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/sales_transactions")
            .header("apikey", "test-key");
        then.status(201);
    });

    // Row two is dropped: empty address and price below the threshold.
    let csv = write_csv(
        "Street Address,Sale Price,Sale Date,Grantor\n\
         10 MAIN ST,150,01/02/2023,A\n\
         ,50,01/02/2023,\n",
    );

    let config = config_for(&server);
    let client = PostgrestClient::new(&config.destination.url, &config.destination.key);
    let engine = EtlEngine::new(client);

    let source =
        sales_etl::source::open_source(csv.path().to_str().unwrap(), config.import.chunk_size)
            .unwrap();
    let pipeline = ImportPipeline::new(
        source,
        Normalizer::new(default_mapping(), config.import.policy.clone()),
        BatchWriter::new(config.writer_config()),
    );

    let summary = engine.run_import(pipeline, None).await.unwrap();

    insert_mock.assert();
    assert_eq!(summary.rows_read, 2);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.attempted, summary.imported + summary.failed);
}

#[tokio::test]
async fn test_rejected_batch_of_50_still_completes() {
    let server = MockServer::start();

    // Destination rejects every insert.
    let insert_mock = server.mock(|when, then| {
        when.method(POST).path("/rest/v1/sales_transactions");
        then.status(400).body("schema cache out of date");
    });

    let mut csv_body = String::from("Street Address,Sale Price,Sale Date,Grantor\n");
    for i in 0..50 {
        csv_body.push_str(&format!("{} MAIN ST,150,01/02/2023,SELLER {}\n", i, i));
    }
    let csv = write_csv(&csv_body);

    let config = config_for(&server);
    let client = PostgrestClient::new(&config.destination.url, &config.destination.key);
    let engine = EtlEngine::new(client);

    let source =
        sales_etl::source::open_source(csv.path().to_str().unwrap(), config.import.chunk_size)
            .unwrap();
    let pipeline = ImportPipeline::new(
        source,
        Normalizer::new(default_mapping(), config.import.policy.clone()),
        BatchWriter::new(config.writer_config()),
    );

    // The run completes (no error propagates, so the process would exit 0).
    let summary = engine.run_import(pipeline, None).await.unwrap();

    insert_mock.assert();
    assert_eq!(summary.attempted, 50);
    assert_eq!(summary.imported, 0);
    assert_eq!(summary.failed, 50);
    assert_eq!(summary.failed_batches, 1);
}

#[tokio::test]
async fn test_batch_boundaries_ignore_chunk_boundaries() {
    let server = MockServer::start();

    // With 7 valid rows, chunk_size 3 and batch_size 5: two inserts, 5 + 2.
    let record = |i: usize| {
        serde_json::json!({
            "street_address": format!("{} OAK AVE", i),
            "sale_price": 200.0,
            "sale_date": "2023-03-04",
            "grantor": format!("SELLER {}", i),
        })
    };
    let five_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/sales_transactions")
            .json_body(serde_json::Value::Array((0..5).map(record).collect()));
        then.status(201);
    });
    let two_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/sales_transactions")
            .json_body(serde_json::Value::Array((5..7).map(record).collect()));
        then.status(201);
    });

    let mut csv_body = String::from("Street Address,Sale Price,Sale Date,Grantor\n");
    for i in 0..7 {
        csv_body.push_str(&format!("{} OAK AVE,200,03/04/2023,SELLER {}\n", i, i));
    }
    let csv = write_csv(&csv_body);

    let mut config = config_for(&server);
    config.import.chunk_size = 3;
    config.import.batch_size = 5;

    let client = PostgrestClient::new(&config.destination.url, &config.destination.key);
    let engine = EtlEngine::new(client);

    let source = sales_etl::source::open_source(csv.path().to_str().unwrap(), 3).unwrap();
    let pipeline = ImportPipeline::new(
        source,
        Normalizer::new(default_mapping(), config.import.policy.clone()),
        BatchWriter::new(config.writer_config()),
    );

    let summary = engine.run_import(pipeline, None).await.unwrap();

    five_mock.assert();
    two_mock.assert();
    assert_eq!(summary.imported, 7);
}

#[tokio::test]
async fn test_fallback_single_rescues_good_records() {
    let server = MockServer::start();

    // The two-record batch insert fails; the per-record retries succeed for
    // the first record and fail for the second.
    let good = serde_json::json!({
        "street_address": "10 MAIN ST",
        "sale_price": 150.0,
        "sale_date": "2023-01-02",
        "grantor": "A",
    });
    let bad = serde_json::json!({
        "street_address": "22 OAK AVE",
        "sale_price": 900.0,
        "sale_date": "2023-01-03",
        "grantor": "B",
    });
    let batch_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/sales_transactions")
            .json_body(serde_json::json!([good.clone(), bad.clone()]));
        then.status(400).body("one bad row");
    });
    let good_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/sales_transactions")
            .json_body(serde_json::json!([good.clone()]));
        then.status(201);
    });
    let bad_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/sales_transactions")
            .json_body(serde_json::json!([bad.clone()]));
        then.status(400).body("invalid value");
    });

    let csv = write_csv(
        "Street Address,Sale Price,Sale Date,Grantor\n\
         10 MAIN ST,150,01/02/2023,A\n\
         22 OAK AVE,900,01/03/2023,B\n",
    );

    let mut config = config_for(&server);
    config.import.batch_size = 2;
    config.import.fallback_single = true;

    let client = PostgrestClient::new(&config.destination.url, &config.destination.key);
    let engine = EtlEngine::new(client);

    let source = sales_etl::source::open_source(csv.path().to_str().unwrap(), 100).unwrap();
    let pipeline = ImportPipeline::new(
        source,
        Normalizer::new(default_mapping(), config.import.policy.clone()),
        BatchWriter::new(config.writer_config()),
    );

    let summary = engine.run_import(pipeline, None).await.unwrap();

    batch_mock.assert();
    // The good record is retried alone and lands; the bad one is counted.
    good_mock.assert();
    bad_mock.assert();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.attempted, summary.imported + summary.failed);
}

#[tokio::test]
async fn test_write_probe_inserts_then_deletes_marker() {
    let server = MockServer::start();

    let insert_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/rest/v1/sales_transactions")
            .json_body(serde_json::json!([{
                "street_address": "TEST IMPORT",
                "sale_date": "2024-01-01",
                "sale_price": 1.0,
                "grantor": "TEST"
            }]));
        then.status(201);
    });
    let delete_mock = server.mock(|when, then| {
        when.method(httpmock::Method::DELETE)
            .path("/rest/v1/sales_transactions")
            .query_param("street_address", "eq.TEST IMPORT");
        then.status(204);
    });

    let client = PostgrestClient::new(&server.base_url(), "test-key");
    let engine = EtlEngine::new(client);

    engine.write_probe("sales_transactions").await.unwrap();

    insert_mock.assert();
    delete_mock.assert();
}

#[tokio::test]
async fn test_write_probe_failure_is_fatal() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/rest/v1/sales_transactions");
        then.status(401).body("row-level security policy violation");
    });

    let client = PostgrestClient::new(&server.base_url(), "test-key");
    let engine = EtlEngine::new(client);

    let err = engine.write_probe("sales_transactions").await.unwrap_err();
    assert!(matches!(err, sales_etl::EtlError::Unwritable(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_missing_source_fails_before_any_writes() {
    let server = MockServer::start();
    let insert_mock = server.mock(|when, then| {
        when.method(POST).path("/rest/v1/sales_transactions");
        then.status(201);
    });

    let err = sales_etl::source::open_source("no/such/file.csv", 100).unwrap_err();
    assert!(matches!(err, sales_etl::EtlError::SourceNotFound { .. }));
    assert_eq!(err.exit_code(), 1);
    insert_mock.assert_hits(0);
}
