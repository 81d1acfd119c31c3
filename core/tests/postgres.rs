//! 需要真实数据库，未设置 DATABASE_URL 时直接跳过

use chrono::{NaiveDate, NaiveTime};
use pgdal::{
    row, ColumnPolicy, DalError, Database, MappingMode, PgConfig, Postgres, Record, Row, Value,
};

#[derive(Debug, Default, Record)]
struct Item {
    #[column(skip_insert)]
    id: i64,
    #[column]
    name: String,
    #[column]
    qty: i32,
    #[column]
    note: Option<String>,
    #[column]
    meta: serde_json::Value,
}

const ITEM_COLUMNS: &str = "id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    qty INT NOT NULL DEFAULT 0,
    note TEXT,
    meta JSONB NOT NULL DEFAULT '{}'::jsonb";

async fn connect(table: &str) -> Option<Postgres> {
    connect_with(table, ITEM_COLUMNS).await
}

async fn connect_with(table: &str, columns: &str) -> Option<Postgres> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let mut db = Postgres::new(PgConfig::from_url(url));
    db.connect().await.expect("connect");

    db.execute(&format!("DROP TABLE IF EXISTS {}", table), &[])
        .await
        .expect("drop table");
    db.execute(&format!("CREATE TABLE {} ({})", table, columns), &[])
        .await
        .expect("create table");
    Some(db)
}

async fn cleanup(mut db: Postgres, table: &str) {
    db.execute(&format!("DROP TABLE IF EXISTS {}", table), &[])
        .await
        .expect("drop table");
    db.close().await;
    assert!(!db.is_connected());
}

#[tokio::test]
async fn test_create_and_select() {
    let table = "pgdal_it_create";
    let Some(db) = connect(table).await else {
        return;
    };

    let created = db
        .create(
            table,
            &row! {
                "name" => "a",
                "qty" => 3,
                "note" => Value::Null,
                "meta" => row! { "tags" => vec![Value::from("x")] },
            },
        )
        .await
        .unwrap();
    assert_eq!(created.get("name"), Some(&Value::from("a")));
    assert_eq!(created.get("qty"), Some(&Value::Int(3)));
    assert_eq!(created.get("note"), Some(&Value::Null));
    assert_eq!(
        created.get("meta"),
        Some(&Value::Json(serde_json::json!({"tags": ["x"]})))
    );

    let rows = db.get_all_to_map(table, -1, 0).await.unwrap();
    assert_eq!(rows.len(), 1);

    let rows = db.get_all_to_map(table, 0, 0).await.unwrap();
    assert!(rows.is_empty());

    cleanup(db, table).await;
}

#[tokio::test]
async fn test_batch_with_missing_columns() {
    let table = "pgdal_it_batch";
    let Some(db) = connect(table).await else {
        return;
    };

    let rows = vec![
        row! { "name" => "a", "note" => "n" },
        row! { "name" => "b", "qty" => 7 },
    ];
    let result = db.create_batch(table, &rows).await.unwrap();
    assert_eq!(result.rows_affected, 2);

    let rows = db
        .execute_select_to_map(
            &format!("SELECT name, qty, note FROM {} ORDER BY name", table),
            &[],
        )
        .await
        .unwrap();
    assert_eq!(rows[0].get("qty"), Some(&Value::Int(0)));
    assert_eq!(rows[1].get("qty"), Some(&Value::Int(7)));
    assert_eq!(rows[1].get("note"), Some(&Value::Null));

    cleanup(db, table).await;
}

#[tokio::test]
async fn test_upsert_update_delete() {
    let table = "pgdal_it_upsert";
    let Some(db) = connect(table).await else {
        return;
    };

    db.create_batch(table, &[row! { "name" => "a", "qty" => 1 }])
        .await
        .unwrap();
    db.create_or_update_batch(table, &[row! { "name" => "a", "qty" => 5 }], "name")
        .await
        .unwrap();

    let item = Item {
        name: "a".to_string(),
        qty: 9,
        ..Default::default()
    };
    let row = db.create_or_update(table, &item, &["name"]).await.unwrap();
    assert_eq!(row.get("qty"), Some(&Value::Int(9)));

    let result = db
        .update(table, &row! { "note" => "x" }, &row! { "name" => "a" })
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 1);

    let result = db.delete(table, &row! { "name" => "a" }).await.unwrap();
    assert_eq!(result.rows_affected, 1);

    cleanup(db, table).await;
}

#[tokio::test]
async fn test_records() {
    let table = "pgdal_it_records";
    let Some(db) = connect(table).await else {
        return;
    };

    let item = Item {
        name: "a".to_string(),
        qty: 2,
        meta: serde_json::json!({"k": 1}),
        ..Default::default()
    };
    db.create_with_record(table, &item).await.unwrap();

    let mapped = db.get_all_to_record::<Item>(table, -1, 0).await.unwrap();
    assert_eq!(mapped.len(), 1);
    assert!(mapped.records[0].id > 0);
    assert_eq!(mapped.records[0].qty, 2);
    assert_eq!(mapped.records[0].meta, serde_json::json!({"k": 1}));
    assert!(mapped.unmapped_columns.is_empty());

    // qty 是 int，赋给 String 字段会类型不匹配
    let sql = format!("SELECT qty AS name FROM {}", table);
    let mapped = db.execute_select_to_record::<Item>(&sql, &[]).await.unwrap();
    assert_eq!(mapped.skipped.len(), 1);

    let strict = Postgres::from_pool(db.pool().unwrap().clone())
        .with_mapping_mode(MappingMode::Strict);
    let err = strict
        .execute_select_to_record::<Item>(&sql, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DalError::TypeMismatch { .. }));

    cleanup(db, table).await;
}

#[tokio::test]
async fn test_strict_batch_and_driver_errors() {
    let table = "pgdal_it_errors";
    let Some(db) = connect(table).await else {
        return;
    };

    let strict = Postgres::from_pool(db.pool().unwrap().clone())
        .with_column_policy(ColumnPolicy::Strict);
    let rows = vec![row! { "name" => "a" }, row! { "qty" => 1 }];
    let err = strict.create_batch(table, &rows).await.unwrap_err();
    assert!(matches!(err, DalError::InconsistentBatch { row: 1, .. }));

    let err = db
        .create(table, &row! { "missing_column" => 1 })
        .await
        .unwrap_err();
    assert!(matches!(err, DalError::Database(_)));

    let rows: Vec<Row> = db
        .execute_select_to_map("SELECT $1::int8 + 1 AS n", &[Value::Int(1)])
        .await
        .unwrap();
    assert_eq!(rows[0].get("n"), Some(&Value::Int(2)));

    cleanup(db, table).await;
}

#[tokio::test]
async fn test_upsert_batch_keeps_unlisted_columns() {
    let table = "pgdal_it_upsert_keep";
    let Some(db) = connect(table).await else {
        return;
    };

    db.create(table, &row! { "name" => "a", "qty" => 3, "note" => "keep" })
        .await
        .unwrap();

    // 列集合不一致的批次直接拒绝，不会用 DEFAULT 覆盖 note
    let rows = vec![
        row! { "name" => "a", "qty" => 5 },
        row! { "name" => "b", "note" => "n" },
    ];
    let err = db
        .create_or_update_batch(table, &rows, "name")
        .await
        .unwrap_err();
    assert!(matches!(err, DalError::InconsistentBatch { row: 1, .. }));

    let rows = vec![
        row! { "name" => "a", "qty" => 5 },
        row! { "name" => "b", "qty" => 1 },
    ];
    let result = db.create_or_update_batch(table, &rows, "name").await.unwrap();
    assert_eq!(result.rows_affected, 2);

    let rows = db
        .execute_select_to_map(
            &format!("SELECT qty, note FROM {} WHERE name = $1", table),
            &[Value::from("a")],
        )
        .await
        .unwrap();
    assert_eq!(rows[0].get("qty"), Some(&Value::Int(5)));
    assert_eq!(rows[0].get("note"), Some(&Value::from("keep")));

    cleanup(db, table).await;
}

#[tokio::test]
async fn test_decode_arrays_and_other_types() {
    let table = "pgdal_it_types";
    let columns = "id INT PRIMARY KEY,
        tags TEXT[],
        nums INT4[],
        grid INT4[],
        at TIME,
        flag \"char\",
        span INTERVAL,
        addr INET";
    let Some(db) = connect_with(table, columns).await else {
        return;
    };

    db.execute(
        &format!(
            "INSERT INTO {} VALUES (1, ARRAY['a', NULL], ARRAY[1, 2], ARRAY[[1, 2], [3, 4]], \
             '12:30:00', 'y', '1 day 2 hours', '10.0.0.1')",
            table
        ),
        &[],
    )
    .await
    .unwrap();
    db.create(table, &row! { "id" => 2 }).await.unwrap();

    let rows = db
        .execute_select_to_map(&format!("SELECT * FROM {} ORDER BY id", table), &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let row = &rows[0];
    assert_eq!(
        row.get("tags"),
        Some(&Value::Array(vec![Value::from("a"), Value::Null]))
    );
    assert_eq!(
        row.get("nums"),
        Some(&Value::Array(vec![Value::Int(1), Value::Int(2)]))
    );
    // 多维数组与 INET 退回原始字节
    assert!(matches!(row.get("grid"), Some(Value::Bytes(_))));
    assert!(matches!(row.get("addr"), Some(Value::Bytes(b)) if b.ends_with(&[10, 0, 0, 1])));
    assert_eq!(
        row.get("at"),
        Some(&Value::Time(NaiveTime::from_hms_opt(12, 30, 0).unwrap()))
    );
    assert_eq!(row.get("flag"), Some(&Value::from("y")));
    assert_eq!(row.get("span"), Some(&Value::from("P1DT2H")));

    assert!(rows[1].iter().skip(1).all(|(_, v)| v.is_null()));

    let all = db.get_all_to_map(table, -1, 0).await.unwrap();
    assert_eq!(all.len(), 2);

    cleanup(db, table).await;
}

#[tokio::test]
async fn test_text_and_typed_dates() {
    let table = "pgdal_it_dates";
    let Some(db) = connect_with(table, "id INT PRIMARY KEY, d DATE").await else {
        return;
    };

    let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let created = db
        .create(table, &row! { "id" => 1, "d" => date })
        .await
        .unwrap();
    assert_eq!(created.get("d"), Some(&Value::Date(date)));

    // 字符串按 TEXT 绑定，写入 DATE 列由服务端拒绝
    let err = db
        .create(table, &row! { "id" => 2, "d" => "2024-01-02" })
        .await
        .unwrap_err();
    assert!(matches!(err, DalError::Database(_)));

    // 原始 SQL 中显式转换即可使用字符串
    let result = db
        .execute(
            &format!("INSERT INTO {} VALUES ($1, $2::date)", table),
            &[Value::Int(3), Value::from("2024-01-02")],
        )
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 1);

    let result = db
        .update(table, &row! { "id" => 4 }, &row! { "d" => date, "id" => 3 })
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 1);

    cleanup(db, table).await;
}
