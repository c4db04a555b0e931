use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, FromRow, Result as SqlxResult};
use std::sync::Arc;

/// Analysis to be stored.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub video_id: String,
    pub video_title: String,
    pub total_comments: i64,
    pub positive_count: i64,
    pub negative_count: i64,
    pub results: serde_json::Value,
}

/// Stored analysis without its result payload.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct AnalysisSummary {
    pub id: i64,
    pub video_id: String,
    pub video_title: Option<String>,
    pub total_comments: Option<i64>,
    pub positive_count: Option<i64>,
    pub negative_count: Option<i64>,
    pub analysis_date: String,
}

#[derive(Debug, FromRow)]
struct AnalysisRow {
    id: i64,
    video_id: String,
    video_title: Option<String>,
    total_comments: Option<i64>,
    positive_count: Option<i64>,
    negative_count: Option<i64>,
    analysis_date: String,
    results: Option<String>,
}

/// Stored analysis including the full result document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRecord {
    pub id: i64,
    pub video_id: String,
    pub video_title: Option<String>,
    pub total_comments: Option<i64>,
    pub positive_count: Option<i64>,
    pub negative_count: Option<i64>,
    pub analysis_date: String,
    pub results: serde_json::Value,
}

impl TryFrom<AnalysisRow> for AnalysisRecord {
    type Error = sqlx::Error;

    fn try_from(row: AnalysisRow) -> Result<Self, Self::Error> {
        let results = match row.results.as_deref() {
            Some(raw) => {
                serde_json::from_str(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            }
            None => serde_json::Value::Null,
        };
        Ok(Self {
            id: row.id,
            video_id: row.video_id,
            video_title: row.video_title,
            total_comments: row.total_comments,
            positive_count: row.positive_count,
            negative_count: row.negative_count,
            analysis_date: row.analysis_date,
            results,
        })
    }
}

#[derive(Clone)]
pub struct Repository {
    pool: Arc<SqlitePool>,
}

impl Repository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub async fn save_analysis(&self, analysis: &NewAnalysis) -> SqlxResult<i64> {
        let analysis_date = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let results = serde_json::to_string(&analysis.results)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO analyses (video_id, video_title, total_comments, positive_count, negative_count, analysis_date, results)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&analysis.video_id)
        .bind(&analysis.video_title)
        .bind(analysis.total_comments)
        .bind(analysis.positive_count)
        .bind(analysis.negative_count)
        .bind(&analysis_date)
        .bind(&results)
        .execute(&*self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_analysis(&self, id: i64) -> SqlxResult<Option<AnalysisRecord>> {
        let row = sqlx::query_as::<_, AnalysisRow>(
            r#"
            SELECT id, video_id, video_title, total_comments, positive_count, negative_count, analysis_date, results
            FROM analyses WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        row.map(AnalysisRecord::try_from).transpose()
    }

    pub async fn list_analyses(&self) -> SqlxResult<Vec<AnalysisSummary>> {
        sqlx::query_as::<_, AnalysisSummary>(
            r#"
            SELECT id, video_id, video_title, total_comments, positive_count, negative_count, analysis_date
            FROM analyses
            ORDER BY analysis_date DESC, id DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
    }

    pub async fn delete_analysis(&self, id: i64) -> SqlxResult<bool> {
        let result = sqlx::query("DELETE FROM analyses WHERE id = ?1")
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_analyses(&self) -> SqlxResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM analyses")
            .fetch_one(&*self.pool)
            .await?;
        Ok(count)
    }
}
