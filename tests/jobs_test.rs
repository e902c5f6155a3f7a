//! Analysis job lifecycle with a scripted LLM.

mod fixtures;
mod helpers;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use uuid::Uuid;

use fixtures::{fenced_llm_reply, llm_reply, numbered_tracks, PROSE_REPLY, SHOEGAZE, UNESCAPED_QUOTE_REPLY};
use helpers::{wait_for_terminal, Reply, ScriptedModel};
use playlist_curator::models::job::JobStatus;
use playlist_curator::services::jobs::{AnalysisJobManager, InMemoryJobStore, JobOptions, NewJob};
use playlist_curator::services::llm::LanguageModel;

fn manager(model: Arc<dyn LanguageModel>, options: JobOptions) -> AnalysisJobManager {
    AnalysisJobManager::new(Arc::new(InMemoryJobStore::new()), model, options)
}

fn new_job() -> NewJob {
    NewJob {
        source_tracks: numbered_tracks("s", 3),
        analysis_tracks: Vec::new(),
        playlist_name: "Fuzz".to_string(),
        playlist_description: "Loud and dreamy".to_string(),
        recommendation_count: 5,
        total_count: 8,
    }
}

#[tokio::test]
async fn test_unknown_job_does_not_exist() {
    let jobs = manager(Arc::new(ScriptedModel::text("{}")), JobOptions::default());

    let view = jobs.status(Uuid::new_v4()).await;

    assert!(!view.exists);
    assert!(view.status.is_none());
    assert!(jobs.job(Uuid::new_v4()).await.is_none());
}

#[tokio::test]
async fn test_job_processing_until_model_answers() {
    let gate = Arc::new(Notify::new());
    let model = ScriptedModel::gated(Reply::Text(llm_reply("Fuzz Mix", SHOEGAZE)), Arc::clone(&gate));
    let jobs = manager(Arc::new(model), JobOptions::default());

    let id = jobs.create_job(new_job()).await;
    let view = jobs.status(id).await;
    assert!(view.exists);
    assert_eq!(view.status, Some(JobStatus::Processing));
    assert!(!view.completed);
    assert!(view.recommendations.is_none());

    gate.notify_one();
    let view = wait_for_terminal(&jobs, id).await;

    assert_eq!(view.status, Some(JobStatus::Completed));
    assert!(view.completed);
    assert!(view.error.is_none());
    assert_eq!(view.analysis.unwrap().playlist_name, "Fuzz Mix");
    let recs = view.recommendations.unwrap();
    assert_eq!(recs.len(), SHOEGAZE.len());
    assert_eq!(recs[0].title, "Only Shallow");
    assert_eq!(view.source_tracks.unwrap().len(), 3);
}

#[tokio::test]
async fn test_prompt_carries_tracks_and_counts() {
    let model = Arc::new(ScriptedModel::text(llm_reply("Fuzz", SHOEGAZE)));
    let jobs = manager(model.clone(), JobOptions::default());

    let id = jobs.create_job(new_job()).await;
    wait_for_terminal(&jobs, id).await;

    let prompts = model.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Song s0"));
    assert!(prompts[0].contains("Fuzz"));
    assert!(prompts[0].contains('5'));
}

#[tokio::test]
async fn test_prompt_covers_whole_selection() {
    let model = Arc::new(ScriptedModel::text(llm_reply("Fuzz", SHOEGAZE)));
    let jobs = manager(model.clone(), JobOptions::default());
    let selection = numbered_tracks("sel", 30);

    let id = jobs
        .create_job(NewJob {
            source_tracks: selection[..12].to_vec(),
            analysis_tracks: selection.clone(),
            ..new_job()
        })
        .await;
    let view = wait_for_terminal(&jobs, id).await;

    let prompt = model.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("Song sel29"));
    assert!(prompt.contains("I have selected 30 songs"));
    let source_ids: Vec<String> = view.source_tracks.unwrap().into_iter().map(|t| t.id).collect();
    assert_eq!(source_ids.len(), 12);
    assert!(!source_ids.contains(&"sel29".to_string()));
}

#[tokio::test]
async fn test_fenced_reply_completes() {
    let jobs = manager(
        Arc::new(ScriptedModel::text(fenced_llm_reply("Fuzz", SHOEGAZE))),
        JobOptions::default(),
    );

    let id = jobs.create_job(new_job()).await;
    let view = wait_for_terminal(&jobs, id).await;

    assert_eq!(view.status, Some(JobStatus::Completed));
    assert_eq!(view.recommendations.unwrap().len(), SHOEGAZE.len());
}

#[tokio::test]
async fn test_unescaped_quotes_repaired() {
    let jobs = manager(Arc::new(ScriptedModel::text(UNESCAPED_QUOTE_REPLY)), JobOptions::default());

    let id = jobs.create_job(new_job()).await;
    let view = wait_for_terminal(&jobs, id).await;

    assert_eq!(view.status, Some(JobStatus::Completed));
    let recs = view.recommendations.unwrap();
    assert_eq!(recs[0].title, "Imagine");
    assert_eq!(recs[0].reason, r#"The song "Imagine" is iconic."#);
}

#[tokio::test]
async fn test_model_error_fails_job() {
    let jobs = manager(
        Arc::new(ScriptedModel::new(Reply::ApiError(503, "overloaded".to_string()))),
        JobOptions::default(),
    );

    let id = jobs.create_job(new_job()).await;
    let view = wait_for_terminal(&jobs, id).await;

    assert_eq!(view.status, Some(JobStatus::Error));
    assert!(view.completed);
    assert!(view.error.unwrap().starts_with("AI service unavailable"));
    assert!(view.recommendations.is_none());
}

#[tokio::test]
async fn test_prose_reply_fails_parse() {
    let jobs = manager(Arc::new(ScriptedModel::text(PROSE_REPLY)), JobOptions::default());

    let id = jobs.create_job(new_job()).await;
    let view = wait_for_terminal(&jobs, id).await;

    assert_eq!(view.status, Some(JobStatus::Error));
    assert!(view.error.unwrap().starts_with("Could not parse AI response"));
}

#[tokio::test]
async fn test_model_timeout_fails_job() {
    let options = JobOptions {
        llm_timeout: Duration::from_millis(50),
        ..JobOptions::default()
    };
    let jobs = manager(Arc::new(ScriptedModel::new(Reply::Hang)), options);

    let id = jobs.create_job(new_job()).await;
    let view = wait_for_terminal(&jobs, id).await;

    assert_eq!(view.status, Some(JobStatus::Error));
    assert!(view.error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_job_expires_after_retention() {
    let options = JobOptions {
        retention: Duration::from_millis(50),
        ..JobOptions::default()
    };
    let jobs = manager(Arc::new(ScriptedModel::text(llm_reply("Fuzz", SHOEGAZE))), options);

    let id = jobs.create_job(new_job()).await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(!jobs.status(id).await.exists);
    assert!(jobs.job(id).await.is_none());
}

#[tokio::test]
async fn test_result_after_expiry_is_dropped() {
    let gate = Arc::new(Notify::new());
    let model = ScriptedModel::gated(Reply::Text(llm_reply("Fuzz", SHOEGAZE)), Arc::clone(&gate));
    let options = JobOptions {
        retention: Duration::from_millis(30),
        ..JobOptions::default()
    };
    let jobs = manager(Arc::new(model), options);

    let id = jobs.create_job(new_job()).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!jobs.status(id).await.exists);
    assert_eq!(jobs.active_jobs().await, 0);
}

#[tokio::test]
async fn test_concurrent_jobs_are_independent() {
    let jobs = Arc::new(manager(
        Arc::new(ScriptedModel::text(llm_reply("Fuzz", SHOEGAZE))),
        JobOptions::default(),
    ));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let jobs = Arc::clone(&jobs);
            async move { jobs.create_job(new_job()).await }
        })
        .collect();
    let ids = futures::future::join_all(tasks).await;

    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), 8);
    for id in ids {
        let view = wait_for_terminal(&jobs, id).await;
        assert_eq!(view.status, Some(JobStatus::Completed));
    }
}
