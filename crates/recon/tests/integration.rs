use statmirror_core::{Row, Table, Value};
use statmirror_recon::{
    reconcile, LoadReport, ReconError, SqliteStore, StoreError, TableInfo, TableStore,
};

fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
    Table::with_rows(columns.iter().map(|c| c.to_string()).collect(), rows)
}

fn countries(rows: &[(&str, &str)]) -> Table {
    table(
        &["code", "name"],
        rows.iter().map(|(c, n)| vec![Value::from(*c), Value::from(*n)]).collect(),
    )
}

fn persisted_codes(store: &SqliteStore, table: &str) -> Vec<String> {
    let mut codes: Vec<String> = store
        .fetch_keys(table, &["code"])
        .unwrap()
        .into_iter()
        .map(|r| r[0].canonical())
        .collect();
    codes.sort();
    codes
}

/// Store that fails the test if anything touches it.
struct UntouchableStore;

impl TableStore for UntouchableStore {
    fn table_exists(&self, _: &str) -> Result<bool, StoreError> {
        panic!("table_exists called")
    }
    fn columns(&self, _: &str) -> Result<Vec<String>, StoreError> {
        panic!("columns called")
    }
    fn fetch_keys(&self, _: &str, _: &[&str]) -> Result<Vec<Row>, StoreError> {
        panic!("fetch_keys called")
    }
    fn insert_rows(&mut self, _: &str, _: &Table, _: &[&str]) -> Result<usize, StoreError> {
        panic!("insert_rows called")
    }
    fn describe(&self, _: &str) -> Result<Option<TableInfo>, StoreError> {
        panic!("describe called")
    }
}

/// Store whose every call fails, as an unreachable database would.
struct BrokenStore;

impl TableStore for BrokenStore {
    fn table_exists(&self, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::Sql("disk I/O error".into()))
    }
    fn columns(&self, _: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Sql("disk I/O error".into()))
    }
    fn fetch_keys(&self, _: &str, _: &[&str]) -> Result<Vec<Row>, StoreError> {
        Err(StoreError::Sql("disk I/O error".into()))
    }
    fn insert_rows(&mut self, _: &str, _: &Table, _: &[&str]) -> Result<usize, StoreError> {
        Err(StoreError::Sql("disk I/O error".into()))
    }
    fn describe(&self, _: &str) -> Result<Option<TableInfo>, StoreError> {
        Err(StoreError::Sql("disk I/O error".into()))
    }
}

// -------------------------------------------------------------------------
// Core properties
// -------------------------------------------------------------------------

#[test]
fn countries_scenario_inserts_only_new_code() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    reconcile(&mut store, "countries", &["code"], countries(&[("170", "Colombia")])).unwrap();

    let batch = countries(&[("170", "Colombia"), ("076", "Brazil")]);
    let report = reconcile(&mut store, "countries", &["code"], batch).unwrap();

    assert_eq!(report.inserted, 1);
    assert_eq!(report.existing_matches, 1);
    assert!(!report.created_table);
    assert_eq!(persisted_codes(&store, "countries"), vec!["076", "170"]);
}

#[test]
fn reconcile_is_idempotent() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let batch = countries(&[("170", "Colombia"), ("076", "Brazil"), ("032", "Argentina")]);

    let first = reconcile(&mut store, "countries", &["code"], batch.clone()).unwrap();
    let second = reconcile(&mut store, "countries", &["code"], batch).unwrap();

    assert_eq!(first.inserted, 3);
    assert!(first.created_table);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.existing_matches, 3);
    assert_eq!(store.describe("countries").unwrap().unwrap().rows, 3);
}

#[test]
fn batch_duplicates_collapse_to_first_seen_on_first_load() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let batch = countries(&[("170", "Colombia"), ("170", "Republica de Colombia")]);

    let report = reconcile(&mut store, "countries", &["code"], batch).unwrap();

    assert_eq!(report.inserted, 1);
    assert_eq!(report.batch_duplicates, 1);
    let names = store.fetch_keys("countries", &["name"]).unwrap();
    assert_eq!(names, vec![vec![Value::Text("Colombia".into())]]);
}

#[test]
fn missing_key_column_fails_and_inserts_nothing() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let batch = countries(&[("170", "Colombia")]);

    let err = reconcile(&mut store, "countries", &["code", "anio", "mes"], batch).unwrap_err();

    match err {
        ReconError::MissingKeyColumns { table, missing } => {
            assert_eq!(table, "countries");
            assert_eq!(missing, vec!["anio".to_string(), "mes".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!store.table_exists("countries").unwrap());
}

#[test]
fn empty_key_is_rejected() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let err = reconcile(&mut store, "countries", &[], countries(&[("170", "Colombia")])).unwrap_err();
    assert!(matches!(err, ReconError::EmptyKey { .. }));
}

#[test]
fn partial_existing_table_inserts_three_of_five() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    reconcile(
        &mut store,
        "countries",
        &["code"],
        countries(&[("170", "Colombia"), ("076", "Brazil"), ("032", "Argentina")]),
    )
    .unwrap();

    let batch = countries(&[
        ("170", "Colombia"),
        ("218", "Ecuador"),
        ("032", "Argentina"),
        ("604", "Peru"),
        ("862", "Venezuela"),
    ]);
    let report = reconcile(&mut store, "countries", &["code"], batch).unwrap();

    assert_eq!(report.inserted, 3);
    assert_eq!(report.existing_matches, 2);
    assert_eq!(persisted_codes(&store, "countries"), vec!["032", "076", "170", "218", "604", "862"]);
}

#[test]
fn empty_batch_touches_no_store() {
    let report = reconcile(&mut UntouchableStore, "countries", &["code"], countries(&[])).unwrap();
    assert_eq!(
        report,
        LoadReport {
            table: "countries".into(),
            candidates: 0,
            batch_duplicates: 0,
            existing_matches: 0,
            inserted: 0,
            key_used: vec!["code".into()],
            created_table: false,
        }
    );
}

#[test]
fn existing_but_empty_table_takes_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirror.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE countries (code TEXT, name TEXT)").unwrap();
    }

    let mut store = SqliteStore::open(&path).unwrap();
    let report = reconcile(&mut store, "countries", &["code"], countries(&[("170", "Colombia"), ("076", "Brazil")]))
        .unwrap();

    assert_eq!(report.inserted, 2);
    assert!(!report.created_table);
    // loaded_at added to the pre-existing table
    assert!(store.columns("countries").unwrap().contains(&"loaded_at".to_string()));
}

#[test]
fn numeric_and_text_keys_match_across_loads() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let first = table(&["anio", "mes"], vec![vec![Value::Int(2024), "Enero".into()]]);
    reconcile(&mut store, "visitantes", &["anio", "mes"], first).unwrap();

    let again = table(
        &["anio", "mes"],
        vec![
            vec![Value::Float(2024.0), "Enero".into()],
            vec![Value::Text("2024".into()), "Enero".into()],
            vec![Value::Int(2024), "Febrero".into()],
        ],
    );
    let report = reconcile(&mut store, "visitantes", &["anio", "mes"], again).unwrap();

    assert_eq!(report.batch_duplicates, 1);
    assert_eq!(report.existing_matches, 1);
    assert_eq!(report.inserted, 1);
}

#[test]
fn leading_zero_key_is_not_coerced_on_later_loads() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let dep = |v: Value| table(&["dep", "nombre"], vec![vec![v, "Antioquia".into()]]);

    let r1 = reconcile(&mut store, "departamentos", &["dep"], dep(Value::Int(5))).unwrap();
    assert_eq!(r1.inserted, 1);
    let info = store.describe("departamentos").unwrap().unwrap();
    assert_eq!(info.columns[0].sql_type, "TEXT");

    // "05" is a different key from 5; once stored it must match itself
    let r2 = reconcile(&mut store, "departamentos", &["dep"], dep(Value::Text("05".into()))).unwrap();
    let r3 = reconcile(&mut store, "departamentos", &["dep"], dep(Value::Text("05".into()))).unwrap();
    let r4 = reconcile(&mut store, "departamentos", &["dep"], dep(Value::Text("05".into()))).unwrap();
    assert_eq!((r2.inserted, r3.inserted, r4.inserted), (1, 0, 0));

    let mut deps: Vec<String> = store
        .fetch_keys("departamentos", &["dep"])
        .unwrap()
        .into_iter()
        .map(|r| r[0].canonical())
        .collect();
    deps.sort();
    assert_eq!(deps, vec!["05", "5"]);
}

#[test]
fn decimal_key_keeps_trailing_zero() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let batch = || table(&["tasa"], vec![vec![Value::Float(1.5)], vec![Value::Text("1.50".into())]]);

    assert_eq!(reconcile(&mut store, "tasas", &["tasa"], batch()).unwrap().inserted, 2);
    assert_eq!(reconcile(&mut store, "tasas", &["tasa"], batch()).unwrap().inserted, 0);
}

#[test]
fn rows_keep_transform_order() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let batch = countries(&[("862", "Venezuela"), ("032", "Argentina"), ("170", "Colombia")]);
    reconcile(&mut store, "countries", &["code"], batch).unwrap();

    let codes: Vec<String> = store
        .fetch_keys("countries", &["code"])
        .unwrap()
        .into_iter()
        .map(|r| r[0].canonical())
        .collect();
    assert_eq!(codes, vec!["862", "032", "170"]);
}

// -------------------------------------------------------------------------
// Failure atomicity
// -------------------------------------------------------------------------

#[test]
fn failed_insert_rolls_back_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirror.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE countries (code TEXT, name TEXT UNIQUE, loaded_at TEXT)")
            .unwrap();
        conn.execute("INSERT INTO countries (code, name) VALUES ('170', 'Colombia')", [])
            .unwrap();
    }

    let mut store = SqliteStore::open(&path).unwrap();
    // The third row is new by key but violates the name constraint
    let batch = countries(&[("076", "Brazil"), ("032", "Argentina"), ("999", "Colombia")]);
    let err = reconcile(&mut store, "countries", &["code"], batch).unwrap_err();

    assert!(matches!(err, ReconError::Store(_)));
    assert_eq!(persisted_codes(&store, "countries"), vec!["170"]);
}

#[test]
fn unreachable_store_is_a_store_error() {
    let err = reconcile(&mut BrokenStore, "countries", &["code"], countries(&[("170", "Colombia")])).unwrap_err();
    assert!(matches!(err, ReconError::Store(StoreError::Sql(_))));
    assert!(err.to_string().contains("disk I/O error"));
}

// -------------------------------------------------------------------------
// Degraded key (lenient on purpose)
// -------------------------------------------------------------------------

#[test]
fn key_column_missing_from_table_degrades_to_available_subset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirror.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE servicios (codigo TEXT, valor REAL)").unwrap();
        conn.execute("INSERT INTO servicios (codigo, valor) VALUES ('A1', 10.0)", []).unwrap();
    }

    let mut store = SqliteStore::open(&path).unwrap();
    let batch = table(
        &["codigo", "pais", "valor"],
        vec![
            // Same codigo, different pais: a genuinely new record that the
            // narrowed key cannot tell apart from the persisted one.
            vec!["A1".into(), "Brasil".into(), Value::Float(5.0)],
            vec!["B2".into(), "Peru".into(), Value::Float(7.0)],
        ],
    );
    let report = reconcile(&mut store, "servicios", &["codigo", "pais"], batch).unwrap();

    assert_eq!(report.key_used, vec!["codigo".to_string()]);
    assert_eq!(report.existing_matches, 1);
    assert_eq!(report.inserted, 1);
    // pais was added on insert, so the next load compares the full key
    assert!(store.columns("servicios").unwrap().contains(&"pais".to_string()));
}

#[test]
fn no_key_column_in_table_treats_every_row_as_new() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirror.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE legacy (other TEXT)").unwrap();
        conn.execute("INSERT INTO legacy (other) VALUES ('x')", []).unwrap();
    }

    let mut store = SqliteStore::open(&path).unwrap();
    let report = reconcile(&mut store, "legacy", &["code"], countries(&[("170", "Colombia")])).unwrap();

    assert!(report.key_used.is_empty());
    assert_eq!(report.inserted, 1);
}
