//! End-to-end loads against a real PostgreSQL
//!
//! Run with: `cargo test -p tabload --test loader_integration_test -- --ignored`

mod common;

use common::{init_test_tracing, row_count, table_columns, write_csv, TestPostgres};
use tabload::{
    ForeignKey, LoadError, LoadStage, Manifest, Reference, TableLoader, TableSource,
};

fn cities_source(dir: &std::path::Path) -> TableSource {
    let file = write_csv(
        dir,
        "t_cities.csv",
        ",id,name\n0,1,Novosibirsk\n1,2,Omsk\n2,3,Tomsk\n",
    );
    TableSource::new(file, "cities").with_primary_key("id")
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_load_creates_table_and_inserts_rows() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let mut conn = pg.connect().await.expect("Failed to connect");
    let dir = tempfile::tempdir().unwrap();

    let report = TableLoader::load(&mut conn, &cities_source(dir.path()))
        .await
        .expect("Load failed");

    assert!(report.table_created);
    assert_eq!(report.rows_inserted, 3);
    assert_eq!(row_count(&mut conn, "cities").await.unwrap(), 3);

    let columns = table_columns(&mut conn, "cities").await.unwrap();
    assert_eq!(
        columns,
        vec![
            ("id".to_string(), "integer".to_string(), None),
            ("name".to_string(), "character varying".to_string(), Some(11)),
        ]
    );

    let pk: String = sqlx::query_scalar(
        "SELECT constraint_type::text FROM information_schema.table_constraints \
         WHERE table_name = 'cities' AND constraint_type = 'PRIMARY KEY'",
    )
    .fetch_one(&mut conn)
    .await
    .unwrap();
    assert_eq!(pk, "PRIMARY KEY");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_rerun_without_primary_key_appends() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let mut conn = pg.connect().await.expect("Failed to connect");
    let dir = tempfile::tempdir().unwrap();

    let file = write_csv(dir.path(), "t_log.csv", ",event,qty\n0,open,1\n1,close,2\n");
    let source = TableSource::new(file, "events");

    let first = TableLoader::load(&mut conn, &source).await.unwrap();
    let second = TableLoader::load(&mut conn, &source).await.unwrap();

    assert!(first.table_created);
    assert!(!second.table_created);
    assert_eq!(second.rows_inserted, 2);
    assert_eq!(row_count(&mut conn, "events").await.unwrap(), 4);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_rerun_with_primary_key_rolls_back() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let mut conn = pg.connect().await.expect("Failed to connect");
    let dir = tempfile::tempdir().unwrap();
    let source = cities_source(dir.path());

    TableLoader::load(&mut conn, &source).await.unwrap();
    let err = TableLoader::load(&mut conn, &source).await.unwrap_err();

    assert!(matches!(err, LoadError::Insert { .. }));
    assert_eq!(row_count(&mut conn, "cities").await.unwrap(), 3);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_run_isolates_failures() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let mut conn = pg.connect().await.expect("Failed to connect");
    let dir = tempfile::tempdir().unwrap();

    // Existing table whose column type the file cannot satisfy
    sqlx::query("CREATE TABLE sales (qty integer)")
        .execute(&mut conn)
        .await
        .unwrap();
    let sales = write_csv(dir.path(), "t_sales.csv", ",qty\n0,1\n1,many\n");

    let sources = vec![
        TableSource::new(dir.path().join("t_missing.csv"), "missing"),
        TableSource::new(sales, "sales"),
        cities_source(dir.path()),
    ];

    let report = TableLoader::run(&mut conn, &sources).await;

    assert!(!report.is_success());
    let stages: Vec<_> = report.outcomes.iter().map(|o| o.stage).collect();
    assert_eq!(
        stages,
        vec![LoadStage::Failed, LoadStage::Failed, LoadStage::Inserted]
    );
    assert!(matches!(
        report.outcomes[0].result,
        Err(LoadError::FileNotFound(_))
    ));
    assert!(matches!(
        report.outcomes[1].result,
        Err(LoadError::Insert { .. })
    ));

    assert_eq!(row_count(&mut conn, "sales").await.unwrap(), 0);
    assert_eq!(row_count(&mut conn, "cities").await.unwrap(), 3);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_foreign_keys_across_manifest() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let dir = tempfile::tempdir().unwrap();

    write_csv(
        dir.path(),
        "t_cities.csv",
        ",Ссылка,Наименование\n0,c1,Москва\n1,c2,Омск\n",
    );
    write_csv(
        dir.path(),
        "t_branches.csv",
        ",Ссылка,Город\n0,b1,c1\n1,b2,c2\n",
    );
    write_csv(dir.path(), "t_orphans.csv", ",Ссылка,Город\n0,o1,c9\n");

    let manifest_path = dir.path().join("tables.yml");
    std::fs::write(
        &manifest_path,
        r#"
tables:
  - file: t_cities.csv
    table: cities
    primary_key: Ссылка
  - file: t_branches.csv
    table: branches
    primary_key: Ссылка
    foreign_keys:
      - column: Город
        references:
          - { table: cities, column: Ссылка }
  - file: t_orphans.csv
    table: orphans
    foreign_keys:
      - column: Город
        references:
          - { table: cities, column: Ссылка }
"#,
    )
    .unwrap();

    let manifest = Manifest::load(&manifest_path).unwrap();
    let report = TableLoader::run_manifest(pg.config(), &manifest)
        .await
        .expect("Run failed");

    let loaded: Vec<_> = report.succeeded().map(|r| r.table.as_str()).collect();
    assert_eq!(loaded, vec!["cities", "branches"]);
    let failed: Vec<_> = report.failed().map(|(t, _)| t).collect();
    assert_eq!(failed, vec!["orphans"]);

    let mut conn = pg.connect().await.unwrap();
    assert_eq!(row_count(&mut conn, "branches").await.unwrap(), 2);

    let columns = table_columns(&mut conn, "branches").await.unwrap();
    assert_eq!(columns[1].0, "Город");

    let fk_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.table_constraints \
         WHERE table_name = 'branches' AND constraint_type = 'FOREIGN KEY'",
    )
    .fetch_one(&mut conn)
    .await
    .unwrap();
    assert_eq!(fk_count, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_nulls_and_timestamps() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let mut conn = pg.connect().await.expect("Failed to connect");
    let dir = tempfile::tempdir().unwrap();

    let file = write_csv(
        dir.path(),
        "t_sales.csv",
        ",sold_at,qty,note,flag\n\
         0,2023-01-05 09:30:00,1,,True\n\
         1,2023-02-30 10:00:00,NA,x,False\n",
    );
    let source = TableSource::new(file, "sales");

    let report = TableLoader::load(&mut conn, &source).await.unwrap();
    assert_eq!(report.rows_inserted, 2);

    let types: Vec<String> = table_columns(&mut conn, "sales")
        .await
        .unwrap()
        .into_iter()
        .map(|(_, data_type, _)| data_type)
        .collect();
    assert_eq!(
        types,
        vec![
            "timestamp without time zone",
            "text",
            "text",
            "boolean",
        ]
    );

    let null_dates: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE sold_at IS NULL")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert_eq!(null_dates, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_large_batch_spans_statements() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let mut conn = pg.connect().await.expect("Failed to connect");
    let dir = tempfile::tempdir().unwrap();

    let mut contents = String::from(",a,b,c\n");
    for i in 0..50_000 {
        contents.push_str(&format!("{i},{i},{},v{i}\n", i % 7));
    }
    let file = write_csv(dir.path(), "t_big.csv", &contents);

    let report = TableLoader::load(&mut conn, &TableSource::new(file, "big"))
        .await
        .unwrap();

    assert_eq!(report.rows_inserted, 50_000);
    assert_eq!(row_count(&mut conn, "big").await.unwrap(), 50_000);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_empty_file_creates_table_only() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let mut conn = pg.connect().await.expect("Failed to connect");
    let dir = tempfile::tempdir().unwrap();

    let file = write_csv(dir.path(), "t_empty.csv", ",id,name\n");
    let report = TableLoader::load(&mut conn, &TableSource::new(file, "empty"))
        .await
        .unwrap();

    assert!(report.table_created);
    assert_eq!(report.rows_inserted, 0);
    assert_eq!(row_count(&mut conn, "empty").await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_foreign_key_reference_builder() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let mut conn = pg.connect().await.expect("Failed to connect");
    let dir = tempfile::tempdir().unwrap();

    TableLoader::load(&mut conn, &cities_source(dir.path()))
        .await
        .unwrap();

    let file = write_csv(dir.path(), "t_streets.csv", ",id,city\n0,10,1\n1,11,3\n");
    let source = TableSource::new(file, "streets").with_foreign_key(ForeignKey {
        column: "city".into(),
        references: vec![Reference {
            table: "cities".into(),
            column: "id".into(),
        }],
    });

    let report = TableLoader::load(&mut conn, &source).await.unwrap();
    assert_eq!(report.rows_inserted, 2);
}
