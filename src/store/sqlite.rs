use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{ApkRecord, PipelineResult, PromptBundle};
use crate::store::{RecordStore, StoreConnector};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS apk_records (
        app_id            TEXT PRIMARY KEY,
        version           TEXT,
        update_date       TEXT,
        min_platform      TEXT,
        apk_flag          INTEGER,
        download_url      TEXT,
        apk_name          TEXT,
        apk_download_date TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS prompt_bundles (
        app_id      TEXT PRIMARY KEY,
        global      TEXT NOT NULL,
        component   TEXT NOT NULL,
        adjacent    TEXT NOT NULL,
        restrictive TEXT NOT NULL,
        guiding     TEXT NOT NULL,
        update_date TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pipeline_results (
        app_id           TEXT NOT NULL,
        model            TEXT NOT NULL,
        prompt_structure INTEGER NOT NULL,
        seq              INTEGER NOT NULL,
        update_date      TEXT NOT NULL,
        texts            TEXT NOT NULL,
        val              INTEGER,
        PRIMARY KEY (app_id, model, prompt_structure, seq)
    )
    "#,
];

/// SQLite 存储
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// 连接数据库并建表
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        debug!("正在连接数据库: {}", database_url);
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::store_connect_failed(database_url, e))?
            .create_if_missing(true);

        // 内存库只在单连接内可见
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| AppError::store_connect_failed(database_url, e))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn close(&self) {
        self.pool.close().await;
    }

    async fn claim_next_pending(&self) -> AppResult<Option<ApkRecord>> {
        let record = sqlx::query_as::<_, ApkRecord>(
            r#"
            SELECT app_id, version, update_date, min_platform, apk_flag,
                   download_url, apk_name, apk_download_date
            FROM apk_records
            WHERE version IS NULL
            ORDER BY app_id
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn upsert_record(&self, record: &ApkRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO apk_records (
                app_id, version, update_date, min_platform, apk_flag,
                download_url, apk_name, apk_download_date
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(app_id) DO UPDATE SET
                version = excluded.version,
                update_date = excluded.update_date,
                min_platform = excluded.min_platform,
                apk_flag = excluded.apk_flag,
                download_url = excluded.download_url,
                apk_name = excluded.apk_name,
                apk_download_date = excluded.apk_download_date
            "#,
        )
        .bind(&record.app_id)
        .bind(&record.version)
        .bind(record.update_date)
        .bind(&record.min_platform)
        .bind(record.apk_flag)
        .bind(&record.download_url)
        .bind(&record.apk_name)
        .bind(record.apk_download_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_result(&self, result: &PipelineResult) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_results (
                app_id, model, prompt_structure, seq, update_date, texts, val
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(app_id, model, prompt_structure, seq) DO UPDATE SET
                update_date = excluded.update_date,
                texts = excluded.texts,
                val = excluded.val
            "#,
        )
        .bind(&result.app_id)
        .bind(&result.model)
        .bind(result.prompt_structure)
        .bind(result.seq)
        .bind(result.update_date)
        .bind(&result.texts)
        .bind(result.val)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_results(&self, app_id: &str) -> AppResult<Vec<PipelineResult>> {
        let rows = sqlx::query_as::<_, PipelineResult>(
            r#"
            SELECT app_id, model, prompt_structure, seq, update_date, texts, val
            FROM pipeline_results
            WHERE app_id = ?
            ORDER BY model, prompt_structure, seq
            "#,
        )
        .bind(app_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_prompt_bundle(&self, app_id: &str) -> AppResult<Option<PromptBundle>> {
        let bundle = sqlx::query_as::<_, PromptBundle>(
            r#"
            SELECT app_id, global, component, adjacent, restrictive, guiding, update_date
            FROM prompt_bundles
            WHERE app_id = ?
            "#,
        )
        .bind(app_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(bundle)
    }

    async fn upsert_prompt_bundle(&self, bundle: &PromptBundle) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO prompt_bundles (
                app_id, global, component, adjacent, restrictive, guiding, update_date
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(app_id) DO UPDATE SET
                global = excluded.global,
                component = excluded.component,
                adjacent = excluded.adjacent,
                restrictive = excluded.restrictive,
                guiding = excluded.guiding,
                update_date = excluded.update_date
            "#,
        )
        .bind(&bundle.app_id)
        .bind(&bundle.global)
        .bind(&bundle.component)
        .bind(&bundle.adjacent)
        .bind(&bundle.restrictive)
        .bind(&bundle.guiding)
        .bind(bundle.update_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_app_ids(&self) -> AppResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT app_id FROM apk_records WHERE apk_name IS NOT NULL ORDER BY app_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

/// 每轮外层循环打开一个新的连接池
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    database_url: String,
}

impl SqliteConnector {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

#[async_trait]
impl StoreConnector for SqliteConnector {
    async fn open(&self) -> AppResult<Arc<dyn RecordStore>> {
        let store = SqliteStore::connect(&self.database_url).await?;
        info!("✓ 数据库会话已打开");
        Ok(Arc::new(store))
    }
}
