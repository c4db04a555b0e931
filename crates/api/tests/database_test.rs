use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tubesense_api::database::{NewAnalysis, Repository, MIGRATOR};

async fn setup_test_repo() -> Result<Repository, Box<dyn std::error::Error>> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    MIGRATOR.run(&pool).await?;
    Ok(Repository::new(Arc::new(pool)))
}

fn sample_analysis(video_id: &str, positive: i64, negative: i64) -> NewAnalysis {
    NewAnalysis {
        video_id: video_id.to_string(),
        video_title: format!("Video {}", video_id),
        total_comments: positive + negative,
        positive_count: positive,
        negative_count: negative,
        results: serde_json::json!({
            "statistics": {"total_comments": positive + negative},
            "comments": []
        }),
    }
}

#[tokio::test]
async fn test_save_and_get_analysis() -> Result<(), Box<dyn std::error::Error>> {
    let repo = setup_test_repo().await?;

    let id = repo.save_analysis(&sample_analysis("abc", 3, 1)).await?;
    assert!(id > 0);

    let record = repo.get_analysis(id).await?.expect("analysis should exist");
    assert_eq!(record.video_id, "abc");
    assert_eq!(record.video_title.as_deref(), Some("Video abc"));
    assert_eq!(record.total_comments, Some(4));
    assert_eq!(record.results["statistics"]["total_comments"], 4);
    assert!(!record.analysis_date.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_get_missing_analysis_is_none() -> Result<(), Box<dyn std::error::Error>> {
    let repo = setup_test_repo().await?;
    assert!(repo.get_analysis(42).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_list_analyses_newest_first() -> Result<(), Box<dyn std::error::Error>> {
    let repo = setup_test_repo().await?;

    let first = repo.save_analysis(&sample_analysis("one", 1, 0)).await?;
    let second = repo.save_analysis(&sample_analysis("two", 0, 1)).await?;

    let summaries = repo.list_analyses().await?;
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].id, second);
    assert_eq!(summaries[1].id, first);
    assert_eq!(repo.count_analyses().await?, 2);

    Ok(())
}

#[tokio::test]
async fn test_delete_analysis() -> Result<(), Box<dyn std::error::Error>> {
    let repo = setup_test_repo().await?;

    let id = repo.save_analysis(&sample_analysis("gone", 2, 2)).await?;
    assert!(repo.delete_analysis(id).await?);
    assert!(!repo.delete_analysis(id).await?);
    assert!(repo.get_analysis(id).await?.is_none());

    Ok(())
}
