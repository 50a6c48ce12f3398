use std::collections::{HashMap, HashSet};

use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::metrics::{
    ACCESS_DENIED_TOTAL, DATA_INTEGRITY_TOTAL, LOCKED_TOTAL, REVIEWS_TOTAL, SUBMISSIONS_TOTAL,
};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{
    Category, CategoryModule, Submission, Task, TaskCompletion, User, Video, VideoCompletion,
};
use crate::db::types::{EventSubject, SubmissionStatus, TaskType};
use crate::repositories::events::NewEvent;
use crate::repositories::submissions::CreateSubmission;
use crate::services::content_graph::{CategoryNode, ContentGraph, VideoNode};
use crate::services::entitlements::{
    access_status, has_access, AccessStatus, AccessTarget, Entitlement,
};
use crate::services::grading::{
    self, GradingError, ReviewDecision, SubmissionPayload, TransitionError,
};
use crate::services::progress::{self, CategoryProgress, CompletionSnapshot, TaskScore};
use crate::services::unlock_policy::{self, GraphDefect, UnlockDecision};

#[derive(Debug, Error)]
pub(crate) enum EngineError {
    #[error("no effective entitlement for category {category_id}")]
    AccessDenied { category_id: String, status: AccessStatus },
    #[error("content is locked")]
    Locked { waiting_on: Vec<String> },
    #[error("content graph defect: {0}")]
    DataIntegrity(GraphDefect),
    #[error("{} question(s) left unanswered", .missing.len())]
    IncompleteAnswer { missing: Vec<String> },
    #[error("{0}")]
    InvalidPayload(String),
    #[error("resubmission is not allowed for this task")]
    DuplicateSubmission,
    #[error("{0}")]
    InvalidTransition(String),
    #[error("another submission for this task is being processed")]
    SubmissionInProgress,
    #[error("too many submissions, try again later")]
    RateLimited,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<GradingError> for EngineError {
    fn from(err: GradingError) -> Self {
        match err {
            GradingError::IncompleteAnswer { missing } => EngineError::IncompleteAnswer { missing },
            other => EngineError::InvalidPayload(other.to_string()),
        }
    }
}

impl From<TransitionError> for EngineError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::DuplicateSubmission => EngineError::DuplicateSubmission,
            other => EngineError::InvalidTransition(other.to_string()),
        }
    }
}

/// A task the caller may work on, with the videos it hangs off.
#[derive(Debug, Clone)]
pub(crate) struct TaskAccess {
    pub(crate) task: Task,
    pub(crate) linked_video_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct VideoCompletionOutcome {
    pub(crate) video_id: String,
    pub(crate) newly_completed: bool,
    pub(crate) completed_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct TaskOutline {
    pub(crate) task: Task,
    pub(crate) unlocked: bool,
    pub(crate) completed: bool,
    pub(crate) score: Option<TaskScore>,
}

#[derive(Debug, Clone)]
pub(crate) struct VideoOutline {
    pub(crate) video: Video,
    pub(crate) entitled: bool,
    pub(crate) unlocked: bool,
    pub(crate) completed: bool,
    pub(crate) tasks: Vec<TaskOutline>,
}

#[derive(Debug, Clone)]
pub(crate) struct ModuleOutline {
    pub(crate) module: CategoryModule,
    pub(crate) access: AccessStatus,
}

#[derive(Debug, Clone)]
pub(crate) struct CategoryOutline {
    pub(crate) category: Category,
    pub(crate) access: AccessStatus,
    pub(crate) progress: CategoryProgress,
    pub(crate) modules: Vec<ModuleOutline>,
    pub(crate) videos: Vec<VideoOutline>,
}

#[derive(Debug, Clone)]
pub(crate) struct ProgressSnapshot {
    pub(crate) videos: Vec<VideoCompletion>,
    pub(crate) tasks: Vec<TaskCompletion>,
}

fn access_denied(user_id: &str, category_id: &str, status: AccessStatus) -> EngineError {
    metrics::counter!(ACCESS_DENIED_TOTAL).increment(1);
    tracing::info!(user_id, category_id, status = ?status, "Access denied without entitlement");
    EngineError::AccessDenied { category_id: category_id.to_string(), status }
}

fn report_defect(defect: &GraphDefect) {
    metrics::counter!(DATA_INTEGRITY_TOTAL).increment(1);
    tracing::error!(defect = %defect, "Content graph inconsistency");
}

fn enforce(decision: UnlockDecision, user_id: &str, subject_id: &str) -> Result<(), EngineError> {
    match decision {
        UnlockDecision::Unlocked => Ok(()),
        UnlockDecision::Locked { waiting_on } => {
            metrics::counter!(LOCKED_TOTAL).increment(1);
            tracing::info!(user_id, subject_id, waiting_on = ?waiting_on, "Content is locked");
            Err(EngineError::Locked { waiting_on })
        }
        UnlockDecision::Broken(defect) => {
            report_defect(&defect);
            Err(EngineError::DataIntegrity(defect))
        }
    }
}

fn target_for<'a>(video: &'a Video, category: &CategoryNode) -> AccessTarget<'a> {
    AccessTarget {
        category_id: &video.category_id,
        module_id: video.module_id.as_deref(),
        category_is_modular: category.is_modular,
    }
}

async fn load_graph(
    state: &AppState,
    category_ids: &[String],
) -> Result<(ContentGraph, Vec<Category>, Vec<Video>), sqlx::Error> {
    let categories =
        crate::repositories::catalog::list_categories_by_ids(state.db(), category_ids).await?;
    let videos =
        crate::repositories::catalog::list_videos_for_categories(state.db(), category_ids).await?;
    let links =
        crate::repositories::catalog::list_task_links_for_categories(state.db(), category_ids)
            .await?;

    let graph = ContentGraph::build(
        categories.iter().map(CategoryNode::from),
        videos.iter().map(VideoNode::from),
        links,
    );
    Ok((graph, categories, videos))
}

async fn load_snapshot(state: &AppState, user_id: &str) -> Result<CompletionSnapshot, sqlx::Error> {
    let videos = crate::repositories::progress::list_video_completions(state.db(), user_id).await?;
    let tasks = crate::repositories::progress::list_task_completions(state.db(), user_id).await?;
    Ok(CompletionSnapshot::from_records(&videos, &tasks))
}

/// Entitlement first, then sequencing. Admins pass both gates.
pub(crate) async fn ensure_video_access(
    state: &AppState,
    user: &User,
    video_id: &str,
) -> Result<Video, EngineError> {
    let video = crate::repositories::catalog::find_video(state.db(), video_id)
        .await?
        .ok_or(EngineError::NotFound("video"))?;

    if user.is_admin() {
        return Ok(video);
    }

    let category_ids = vec![video.category_id.clone()];
    let (graph, _, _) = load_graph(state, &category_ids).await?;
    let category = graph.category(&video.category_id).ok_or(EngineError::NotFound("category"))?;

    let entitlements =
        crate::repositories::entitlements::list_for_user_categories(state.db(), &user.id, &category_ids)
            .await?;
    let status = access_status(&entitlements, target_for(&video, category), primitive_now_utc());
    if status != AccessStatus::Owned {
        return Err(access_denied(&user.id, &video.category_id, status));
    }

    let snapshot = load_snapshot(state, &user.id).await?;
    enforce(unlock_policy::can_access_video(&graph, &snapshot, &video.id), &user.id, &video.id)?;

    Ok(video)
}

/// A task is entitled when every linked video is, and unlocked per the gating mode.
pub(crate) async fn ensure_task_access(
    state: &AppState,
    user: &User,
    task_id: &str,
) -> Result<TaskAccess, EngineError> {
    let task = crate::repositories::tasks::find_by_id(state.db(), task_id)
        .await?
        .ok_or(EngineError::NotFound("task"))?;
    let linked_video_ids =
        crate::repositories::tasks::list_linked_video_ids(state.db(), task_id).await?;

    if user.is_admin() {
        return Ok(TaskAccess { task, linked_video_ids });
    }

    let videos = crate::repositories::catalog::list_videos_by_ids(state.db(), &linked_video_ids).await?;
    let category_ids: Vec<String> = videos
        .iter()
        .map(|video| video.category_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let categories =
        crate::repositories::catalog::list_categories_by_ids(state.db(), &category_ids).await?;
    let entitlements =
        crate::repositories::entitlements::list_for_user_categories(state.db(), &user.id, &category_ids)
            .await?;

    let graph = ContentGraph::build(
        categories.iter().map(CategoryNode::from),
        videos.iter().map(VideoNode::from),
        linked_video_ids.iter().map(|video_id| (task.id.clone(), video_id.clone())),
    );

    let now = primitive_now_utc();
    for video in &videos {
        let Some(category) = graph.category(&video.category_id) else {
            continue;
        };
        let status = access_status(&entitlements, target_for(video, category), now);
        if status != AccessStatus::Owned {
            return Err(access_denied(&user.id, &video.category_id, status));
        }
    }

    let snapshot = load_snapshot(state, &user.id).await?;
    let gating = state.settings().engine().task_gating;
    enforce(unlock_policy::can_access_task(&graph, &snapshot, &task.id, gating), &user.id, &task.id)?;

    Ok(TaskAccess { task, linked_video_ids })
}

pub(crate) async fn mark_video_completed(
    state: &AppState,
    user: &User,
    video_id: &str,
) -> Result<VideoCompletionOutcome, EngineError> {
    let video = ensure_video_access(state, user, video_id).await?;
    let now = primitive_now_utc();

    let mut tx = state.db().begin().await?;
    let newly_completed =
        crate::repositories::progress::upsert_video_completion(&mut *tx, &user.id, &video.id, now)
            .await?;
    crate::repositories::events::append(
        &mut *tx,
        NewEvent {
            user_id: &user.id,
            subject: EventSubject::VideoCompletion,
            subject_id: &video.id,
            submission_id: None,
            old_state: (!newly_completed).then_some("completed"),
            new_state: "completed",
            created_at: now,
        },
    )
    .await?;
    tx.commit().await?;

    state.progress_cache().invalidate(&user.id).await;
    tracing::info!(user_id = %user.id, video_id = %video.id, newly_completed, "Video marked as watched");

    Ok(VideoCompletionOutcome { video_id: video.id, newly_completed, completed_at: now })
}

/// Per-learner fixed window. A Redis outage lets the submission through.
pub(crate) async fn check_submit_rate(
    state: &AppState,
    user: &User,
    task_id: &str,
) -> Result<(), EngineError> {
    let limit = state.settings().engine().submit_rate_limit_per_minute;
    match state.redis().rate_limit(&format!("submit:{}", user.id), limit, 60).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::info!(user_id = %user.id, task_id, "Submission rate limit exceeded");
            Err(EngineError::RateLimited)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Submission rate limiter unavailable");
            Ok(())
        }
    }
}

/// Grades and stores one attempt. Tests resolve immediately; other kinds may wait for review.
pub(crate) async fn submit(
    state: &AppState,
    user: &User,
    task_id: &str,
    payload: SubmissionPayload,
) -> Result<Submission, EngineError> {
    check_submit_rate(state, user, task_id).await?;
    let access = ensure_task_access(state, user, task_id).await?;
    submit_with_access(state, user, &access, payload).await
}

/// Second half of [`submit`] for callers that already passed the rate limit
/// and [`ensure_task_access`].
pub(crate) async fn submit_with_access(
    state: &AppState,
    user: &User,
    access: &TaskAccess,
    payload: SubmissionPayload,
) -> Result<Submission, EngineError> {
    let task = &access.task;
    grading::validate_payload(task.task_type, &payload)?;

    let grade = match &payload {
        SubmissionPayload::Answers(answers) => {
            let questions = crate::repositories::tasks::list_questions(state.db(), &task.id).await?;
            Some(grading::grade_test(&questions, answers)?)
        }
        _ => None,
    };
    let status = grading::initial_status(task.task_type, task.requires_approval);
    let now = primitive_now_utc();

    let mut tx = state.db().begin().await?;
    let prior = crate::repositories::submissions::lock_current(&mut *tx, &user.id, &task.id).await?;
    if let Err(err) = grading::check_resubmission(prior.as_ref(), task.allow_resubmission) {
        tracing::info!(user_id = %user.id, task_id = %task.id, "Resubmission rejected");
        return Err(err.into());
    }
    if let Some(prior) = &prior {
        crate::repositories::submissions::retire(&mut *tx, &prior.id, now).await?;
    }

    let submission_id = Uuid::new_v4().to_string();
    let (answers, text_content, file) = match &payload {
        SubmissionPayload::Answers(answers) => (Some(answers), None, None),
        SubmissionPayload::Text(text) => (None, Some(text.as_str()), None),
        SubmissionPayload::File(file) => (None, None, Some(file)),
    };
    let inserted = crate::repositories::submissions::insert(
        &mut *tx,
        CreateSubmission {
            id: &submission_id,
            user_id: &user.id,
            task_id: &task.id,
            attempt_number: prior.as_ref().map_or(1, |prior| prior.attempt_number + 1),
            status,
            answers,
            text_content,
            file_key: file.map(|file| file.key.as_str()),
            file_name: file.map(|file| file.name.as_str()),
            file_size: file.map(|file| file.size),
            file_sha256: file.map(|file| file.sha256.as_str()),
            mime_type: file.map(|file| file.mime_type.as_str()),
            score: grade.map(|grade| grade.score),
            total: grade.map(|grade| grade.total),
            submitted_at: now,
        },
    )
    .await;
    let submission = match inserted {
        Ok(submission) => submission,
        Err(err) if crate::db::is_unique_violation(&err) => {
            tracing::info!(user_id = %user.id, task_id = %task.id, "Concurrent submission lost the race");
            return Err(if task.allow_resubmission {
                EngineError::SubmissionInProgress
            } else {
                EngineError::DuplicateSubmission
            });
        }
        Err(err) => return Err(err.into()),
    };

    crate::repositories::events::append(
        &mut *tx,
        NewEvent {
            user_id: &user.id,
            subject: EventSubject::Submission,
            subject_id: &task.id,
            submission_id: Some(&submission.id),
            old_state: prior.as_ref().map(|prior| prior.status.as_str()),
            new_state: status.as_str(),
            created_at: now,
        },
    )
    .await?;

    if status == SubmissionStatus::Approved {
        record_task_completion(&mut tx, &user.id, &task.id, &submission, now).await?;
    }
    if task.task_type == TaskType::Test {
        for video_id in &access.linked_video_ids {
            let newly_completed = crate::repositories::progress::upsert_video_completion(
                &mut *tx, &user.id, video_id, now,
            )
            .await?;
            crate::repositories::events::append(
                &mut *tx,
                NewEvent {
                    user_id: &user.id,
                    subject: EventSubject::VideoCompletion,
                    subject_id: video_id,
                    submission_id: Some(&submission.id),
                    old_state: (!newly_completed).then_some("completed"),
                    new_state: "completed",
                    created_at: now,
                },
            )
            .await?;
        }
    }
    tx.commit().await?;

    state.progress_cache().invalidate(&user.id).await;
    metrics::counter!(
        SUBMISSIONS_TOTAL,
        "task_type" => task.task_type.as_str(),
        "status" => status.as_str()
    )
    .increment(1);
    tracing::info!(
        user_id = %user.id,
        task_id = %task.id,
        submission_id = %submission.id,
        attempt = submission.attempt_number,
        status = status.as_str(),
        score = ?submission.score,
        total = ?submission.total,
        "Submission accepted"
    );

    Ok(submission)
}

async fn record_task_completion(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: &str,
    task_id: &str,
    submission: &Submission,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    let newly_completed = crate::repositories::progress::upsert_task_completion(
        &mut **tx,
        user_id,
        task_id,
        submission.score,
        submission.total,
        now,
    )
    .await?;
    crate::repositories::events::append(
        &mut **tx,
        NewEvent {
            user_id,
            subject: EventSubject::TaskCompletion,
            subject_id: task_id,
            submission_id: Some(&submission.id),
            old_state: (!newly_completed).then_some("completed"),
            new_state: "completed",
            created_at: now,
        },
    )
    .await?;
    Ok(())
}

pub(crate) async fn review(
    state: &AppState,
    reviewer: &User,
    submission_id: &str,
    decision: ReviewDecision,
    feedback: Option<&str>,
) -> Result<Submission, EngineError> {
    let now = primitive_now_utc();
    let mut tx = state.db().begin().await?;

    let current = crate::repositories::submissions::lock_by_id(&mut *tx, submission_id)
        .await?
        .ok_or(EngineError::NotFound("submission"))?;
    let status = grading::review_transition(&current, decision)?;

    let updated = crate::repositories::submissions::record_review(
        &mut *tx,
        &current.id,
        status,
        feedback,
        &reviewer.id,
        now,
    )
    .await?;
    crate::repositories::events::append(
        &mut *tx,
        NewEvent {
            user_id: &updated.user_id,
            subject: EventSubject::Submission,
            subject_id: &updated.task_id,
            submission_id: Some(&updated.id),
            old_state: Some(current.status.as_str()),
            new_state: status.as_str(),
            created_at: now,
        },
    )
    .await?;
    if status == SubmissionStatus::Approved {
        record_task_completion(&mut tx, &updated.user_id, &updated.task_id, &updated, now).await?;
    }
    tx.commit().await?;

    state.progress_cache().invalidate(&updated.user_id).await;
    let decision_label = match decision {
        ReviewDecision::Approve => "approve",
        ReviewDecision::Reject => "reject",
    };
    metrics::counter!(REVIEWS_TOTAL, "decision" => decision_label).increment(1);
    tracing::info!(
        reviewer_id = %reviewer.id,
        submission_id = %updated.id,
        user_id = %updated.user_id,
        task_id = %updated.task_id,
        decision = decision_label,
        "Submission reviewed"
    );

    Ok(updated)
}

/// Read-through: served from the cache when present, recomputed from completions otherwise.
pub(crate) async fn category_progress(
    state: &AppState,
    user: &User,
    category_id: &str,
) -> Result<CategoryProgress, EngineError> {
    if let Some(cached) = state.progress_cache().get(&user.id, category_id).await {
        return Ok(cached);
    }

    crate::repositories::catalog::find_category(state.db(), category_id)
        .await?
        .ok_or(EngineError::NotFound("category"))?;

    let generation = state.progress_cache().generation(&user.id).await;
    let category_ids = vec![category_id.to_string()];
    let (graph, _, _) = load_graph(state, &category_ids).await?;
    let snapshot = load_snapshot(state, &user.id).await?;
    let computed = progress::category_progress(&graph, &snapshot, category_id);

    state.progress_cache().put(&user.id, category_id, computed, generation).await;
    Ok(computed)
}

pub(crate) async fn progress_snapshot(
    state: &AppState,
    user: &User,
) -> Result<ProgressSnapshot, EngineError> {
    let videos = crate::repositories::progress::list_video_completions(state.db(), &user.id).await?;
    let tasks = crate::repositories::progress::list_task_completions(state.db(), &user.id).await?;
    Ok(ProgressSnapshot { videos, tasks })
}

/// Everything a learner sees on a category page, evaluated against one clock read.
pub(crate) async fn category_outline(
    state: &AppState,
    user: &User,
    category_id: &str,
) -> Result<CategoryOutline, EngineError> {
    let category = crate::repositories::catalog::find_category(state.db(), category_id)
        .await?
        .ok_or(EngineError::NotFound("category"))?;
    let modules = crate::repositories::catalog::list_modules(state.db(), category_id).await?;

    let category_ids = vec![category.id.clone()];
    let (mut graph, _, videos) = load_graph(state, &category_ids).await?;

    let video_ids: Vec<String> = videos.iter().map(|video| video.id.clone()).collect();
    let linked_tasks = crate::repositories::tasks::list_for_videos(state.db(), &video_ids).await?;

    // Tasks may also hang off videos of other categories; their entitlement counts too.
    let foreign_video_ids: Vec<String> = linked_tasks
        .iter()
        .flat_map(|linked| graph.linked_videos(&linked.task.id).to_vec())
        .filter(|video_id| graph.video(video_id).is_none())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let mut all_videos = videos.clone();
    if !foreign_video_ids.is_empty() {
        let foreign =
            crate::repositories::catalog::list_videos_by_ids(state.db(), &foreign_video_ids).await?;
        let mut all_category_ids = category_ids.clone();
        all_category_ids.extend(foreign.iter().map(|video| video.category_id.clone()));
        all_category_ids.sort();
        all_category_ids.dedup();
        let categories =
            crate::repositories::catalog::list_categories_by_ids(state.db(), &all_category_ids)
                .await?;
        all_videos.extend(foreign);
        let links: Vec<(String, String)> = linked_tasks
            .iter()
            .flat_map(|linked| {
                graph
                    .linked_videos(&linked.task.id)
                    .iter()
                    .map(|video_id| (linked.task.id.clone(), video_id.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        graph = ContentGraph::build(
            categories.iter().map(CategoryNode::from),
            all_videos.iter().map(VideoNode::from),
            links,
        );
    }

    let entitlements: Vec<Entitlement> =
        crate::repositories::entitlements::list_for_user(state.db(), &user.id).await?;
    let generation = state.progress_cache().generation(&user.id).await;
    let snapshot = load_snapshot(state, &user.id).await?;
    let now = primitive_now_utc();
    let admin = user.is_admin();

    let status_for = |category_id: &str, module_id: Option<&str>| -> AccessStatus {
        if admin {
            return AccessStatus::Owned;
        }
        let modular = graph.category(category_id).is_some_and(|category| category.is_modular);
        access_status(
            &entitlements,
            AccessTarget { category_id, module_id, category_is_modular: modular },
            now,
        )
    };

    let access = status_for(&category.id, None);
    let modules = modules
        .into_iter()
        .map(|module| {
            let access = status_for(&category.id, Some(&module.id));
            ModuleOutline { module, access }
        })
        .collect();

    let entitled_by_video: HashMap<&str, bool> = all_videos
        .iter()
        .map(|video| {
            let modular = graph
                .category(&video.category_id)
                .is_some_and(|category| category.is_modular);
            let target = AccessTarget {
                category_id: &video.category_id,
                module_id: video.module_id.as_deref(),
                category_is_modular: modular,
            };
            (video.id.as_str(), admin || has_access(&entitlements, target, now))
        })
        .collect();

    let gating = state.settings().engine().task_gating;
    let mut tasks_by_video: HashMap<String, Vec<TaskOutline>> = HashMap::new();
    for linked in linked_tasks {
        let linked_videos = graph.linked_videos(&linked.task.id);
        let entitled = !linked_videos.is_empty()
            && linked_videos
                .iter()
                .all(|video_id| entitled_by_video.get(video_id.as_str()).copied().unwrap_or(false));
        let unlocked = admin
            || (entitled
                && settle(unlock_policy::can_access_task(&graph, &snapshot, &linked.task.id, gating)));
        let outline = TaskOutline {
            unlocked,
            completed: snapshot.is_task_completed(&linked.task.id),
            score: snapshot.task_score(&linked.task.id),
            task: linked.task,
        };
        tasks_by_video.entry(linked.video_id).or_default().push(outline);
    }

    let videos = videos
        .into_iter()
        .map(|video| {
            let entitled = entitled_by_video.get(video.id.as_str()).copied().unwrap_or(false);
            let unlocked = admin
                || (entitled
                    && settle(unlock_policy::can_access_video(&graph, &snapshot, &video.id)));
            VideoOutline {
                entitled,
                unlocked,
                completed: snapshot.is_video_completed(&video.id),
                tasks: tasks_by_video.remove(&video.id).unwrap_or_default(),
                video,
            }
        })
        .collect();

    let progress = progress::category_progress(&graph, &snapshot, &category.id);
    state.progress_cache().put(&user.id, &category.id, progress, generation).await;

    Ok(CategoryOutline { category, access, progress, modules, videos })
}

/// Listing views show defects as plain locks after reporting them.
fn settle(decision: UnlockDecision) -> bool {
    match decision {
        UnlockDecision::Unlocked => true,
        UnlockDecision::Locked { .. } => false,
        UnlockDecision::Broken(defect) => {
            report_defect(&defect);
            false
        }
    }
}

pub(crate) struct PaymentRequest<'a> {
    pub(crate) user_id: &'a str,
    pub(crate) category_id: &'a str,
    pub(crate) module_id: Option<&'a str>,
    pub(crate) amount_cents: i64,
    pub(crate) expires_at: PrimitiveDateTime,
}

async fn check_grant_target(
    state: &AppState,
    user_id: &str,
    category_id: &str,
    module_id: Option<&str>,
) -> Result<(), EngineError> {
    if !crate::repositories::users::exists(state.db(), user_id).await? {
        return Err(EngineError::NotFound("user"));
    }
    let category = crate::repositories::catalog::find_category(state.db(), category_id)
        .await?
        .ok_or(EngineError::NotFound("category"))?;

    if let Some(module_id) = module_id {
        if !category.is_modular {
            return Err(EngineError::InvalidPayload(format!(
                "category {category_id} is not modular"
            )));
        }
        crate::repositories::catalog::find_module(state.db(), category_id, module_id)
            .await?
            .ok_or(EngineError::NotFound("module"))?;
    }
    Ok(())
}

pub(crate) async fn record_payment(
    state: &AppState,
    admin: &User,
    request: PaymentRequest<'_>,
) -> Result<Entitlement, EngineError> {
    check_grant_target(state, request.user_id, request.category_id, request.module_id).await?;
    if request.amount_cents < 0 {
        return Err(EngineError::InvalidPayload("amount must not be negative".to_string()));
    }

    let entitlement = crate::repositories::entitlements::create_payment(
        state.db(),
        crate::repositories::entitlements::CreatePayment {
            user_id: request.user_id,
            category_id: request.category_id,
            module_id: request.module_id,
            amount_cents: request.amount_cents,
            expires_at: request.expires_at,
            recorded_by: &admin.id,
            created_at: primitive_now_utc(),
        },
    )
    .await?;

    tracing::info!(
        admin_id = %admin.id,
        user_id = request.user_id,
        category_id = request.category_id,
        module_id = ?request.module_id,
        entitlement_id = %entitlement.id,
        "Payment recorded"
    );
    Ok(entitlement)
}

pub(crate) async fn grant_gift(
    state: &AppState,
    admin: &User,
    user_id: &str,
    category_id: &str,
    module_id: Option<&str>,
) -> Result<(Entitlement, bool), EngineError> {
    check_grant_target(state, user_id, category_id, module_id).await?;

    let (entitlement, created) = crate::repositories::entitlements::grant_gift(
        state.db(),
        crate::repositories::entitlements::GrantGift {
            user_id,
            category_id,
            module_id,
            granted_by: &admin.id,
            created_at: primitive_now_utc(),
        },
    )
    .await?;

    tracing::info!(
        admin_id = %admin.id,
        user_id,
        category_id,
        module_id = ?module_id,
        created,
        "Gift granted"
    );
    Ok((entitlement, created))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_answers_keep_their_own_kind() {
        let err: EngineError =
            GradingError::IncompleteAnswer { missing: vec!["q2".to_string()] }.into();
        assert!(matches!(err, EngineError::IncompleteAnswer { ref missing } if missing == &["q2"]));

        let err: EngineError = GradingError::UnknownQuestion("zz".to_string()).into();
        assert!(matches!(err, EngineError::InvalidPayload(ref message) if message.contains("zz")));
    }

    #[test]
    fn transition_errors_split_duplicate_from_invalid() {
        assert!(matches!(
            EngineError::from(TransitionError::DuplicateSubmission),
            EngineError::DuplicateSubmission
        ));
        assert!(matches!(
            EngineError::from(TransitionError::NotPending("approved")),
            EngineError::InvalidTransition(_)
        ));
        assert!(matches!(
            EngineError::from(TransitionError::Superseded),
            EngineError::InvalidTransition(_)
        ));
    }

    #[test]
    fn listing_views_treat_defects_as_locked() {
        assert!(settle(UnlockDecision::Unlocked));
        assert!(!settle(UnlockDecision::Locked { waiting_on: vec!["v1".to_string()] }));
        assert!(!settle(UnlockDecision::Broken(GraphDefect::UnlinkedTask {
            task_id: "t".to_string()
        })));
    }

    #[test]
    fn enforce_maps_decisions_to_errors() {
        assert!(enforce(UnlockDecision::Unlocked, "u", "v").is_ok());
        assert!(matches!(
            enforce(UnlockDecision::Locked { waiting_on: vec!["v1".to_string()] }, "u", "v2"),
            Err(EngineError::Locked { .. })
        ));
        assert!(matches!(
            enforce(
                UnlockDecision::Broken(GraphDefect::UnknownVideo { video_id: "v".to_string() }),
                "u",
                "v"
            ),
            Err(EngineError::DataIntegrity(_))
        ));
    }
}
