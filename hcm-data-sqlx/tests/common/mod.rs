#![allow(dead_code)]

use hcm_core::{init_tracing, LogConfig};
use hcm_data::{Column, Table};
use hcm_data_sqlx::{DatabaseConfig, Orm};
use hcm_filter::{ColumnType, SqlArg};
use tempfile::TempDir;

/// A file-backed SQLite database; dropped with the returned directory.
pub async fn setup() -> (TempDir, Orm) {
    setup_with(|orm| orm).await
}

pub async fn setup_with(customize: impl FnOnce(Orm) -> Orm) -> (TempDir, Orm) {
    init_tracing(&LogConfig {
        level: "warn".to_string(),
        ..LogConfig::default()
    });
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("hcm.db").display());
    let config = DatabaseConfig {
        url,
        max_connections: 4,
        ..DatabaseConfig::default()
    };
    let orm = customize(Orm::connect(&config).await.unwrap());

    for ddl in [
        "CREATE TABLE security_group (
            id TEXT PRIMARY KEY,
            vendor TEXT NOT NULL,
            name TEXT NOT NULL,
            memo TEXT
        )",
        "CREATE TABLE tcloud_security_group_rule (
            id TEXT PRIMARY KEY,
            security_group_id TEXT NOT NULL,
            port INTEGER NOT NULL
        )",
        "CREATE TABLE aws_security_group_rule (
            id TEXT PRIMARY KEY,
            security_group_id TEXT NOT NULL,
            port INTEGER NOT NULL
        )",
        "CREATE TABLE security_group_cvm_rel (
            id TEXT PRIMARY KEY,
            security_group_id TEXT NOT NULL,
            cvm_id TEXT NOT NULL
        )",
    ] {
        sqlx::query(ddl).execute(orm.pool()).await.unwrap();
    }
    (dir, orm)
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SecurityGroup {
    pub id: String,
    #[sqlx(default)]
    pub vendor: String,
    #[sqlx(default)]
    pub name: String,
    #[sqlx(default)]
    pub memo: Option<String>,
}

impl SecurityGroup {
    pub fn new(vendor: &str, name: &str) -> Self {
        Self {
            id: String::new(),
            vendor: vendor.to_string(),
            name: name.to_string(),
            memo: None,
        }
    }
}

impl Table for SecurityGroup {
    fn table_name() -> &'static str {
        "security_group"
    }

    fn columns() -> &'static [Column] {
        const COLS: &[Column] = &[
            Column::new("id", ColumnType::String),
            Column::new("vendor", ColumnType::String),
            Column::new("name", ColumnType::String),
            Column::new("memo", ColumnType::String),
        ];
        COLS
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlArg> {
        vec![
            self.id.as_str().into(),
            self.vendor.as_str().into(),
            self.name.as_str().into(),
            self.memo.clone().into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SgRule {
    pub id: String,
    pub security_group_id: String,
    pub port: Option<i64>,
}

impl Table for SgRule {
    fn table_name() -> &'static str {
        "tcloud_security_group_rule"
    }

    fn columns() -> &'static [Column] {
        const COLS: &[Column] = &[
            Column::new("id", ColumnType::String),
            Column::new("security_group_id", ColumnType::String),
            Column::new("port", ColumnType::Numeric),
        ];
        COLS
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlArg> {
        vec![
            self.id.as_str().into(),
            self.security_group_id.as_str().into(),
            self.port.into(),
        ]
    }
}

pub async fn insert_sg(orm: &Orm, id: &str, vendor: &str, name: &str) {
    sqlx::query("INSERT INTO security_group (id, vendor, name) VALUES (?, ?, ?)")
        .bind(id)
        .bind(vendor)
        .bind(name)
        .execute(orm.pool())
        .await
        .unwrap();
}

pub async fn count_rows(orm: &Orm, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(orm.pool())
        .await
        .unwrap()
}
