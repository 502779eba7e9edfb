use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use finpilot_core::domain::plan::InvestmentPlan;
use finpilot_core::domain::profile::{ChatMessage, MessageRole, UserAnswers};
use finpilot_core::engine;
use finpilot_core::llm::{keyword, ExtractorClient, OracleInput};
use finpilot_core::storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = finpilot_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    // Without an API key the interview still works off the scripted
    // questions; only the free-form phrasing is lost.
    let oracle: Option<Arc<finpilot_core::llm::anthropic::AnthropicClient>> =
        match finpilot_core::llm::anthropic::AnthropicClient::from_settings(&settings) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "oracle unavailable; using scripted interview questions");
                None
            }
        };

    let state = AppState { pool, oracle };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/next-question", post(next_question))
        .route("/api/save-profile", post(save_profile))
        .route("/api/generate-plan", post(generate_plan))
        .route("/api/save-plan", post(save_plan))
        .route("/api/plan/:plan_id", get(get_plan))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    pool: Option<PgPool>,
    oracle: Option<Arc<finpilot_core::llm::anthropic::AnthropicClient>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextQuestionRequest {
    chat_history: Vec<ChatMessage>,
    answers: UserAnswers,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    session_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NextQuestionResponse {
    message: String,
    options: Option<Vec<String>>,
    is_complete: bool,
    updated_answers: UserAnswers,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<Uuid>,
}

async fn next_question(
    State(state): State<AppState>,
    Json(req): Json<NextQuestionRequest>,
) -> Json<NextQuestionResponse> {
    // A newer request supersedes any in-flight turn on the same session.
    if let (Some(pool), Some(session_id), Some(request_id)) =
        (&state.pool, req.session_id, req.request_id.as_deref())
    {
        if let Err(e) = storage::sessions::begin_turn(pool, session_id, request_id).await {
            sentry_anyhow::capture_anyhow(&e);
            tracing::warn!(%session_id, error = %e, "failed to mark chat turn");
        }
    }

    // Local extraction runs on every turn; the oracle only fills gaps.
    let mut answers = req.answers.clone();
    if let Some(last) = req.chat_history.last() {
        if last.role == MessageRole::User {
            answers = keyword::extract_answers(&last.message, &answers);
        }
    }

    let no_conversation_yet = req.chat_history.is_empty() && answers == UserAnswers::default();

    let message = if answers.is_complete() {
        keyword::COMPLETION_MESSAGE.to_string()
    } else if no_conversation_yet {
        keyword::INITIAL_QUESTION.to_string()
    } else {
        match &state.oracle {
            Some(oracle) => {
                let input = OracleInput {
                    chat_history: req.chat_history.clone(),
                    answers: answers.clone(),
                };
                match oracle.next_turn(input).await {
                    Ok(reply) => {
                        answers = reply.updated_answers;
                        reply.message
                    }
                    Err(e) => {
                        sentry_anyhow::capture_anyhow(&e);
                        tracing::warn!(error = %e, "oracle turn failed; using scripted question");
                        keyword::fallback_question(&answers).to_string()
                    }
                }
            }
            None => keyword::fallback_question(&answers).to_string(),
        }
    };

    // The oracle may have filled the last gap, so completion is judged on
    // the final answer set.
    let is_complete = answers.is_complete();

    let session_id =
        persist_session(&state, &req, &answers, is_complete).await;

    Json(NextQuestionResponse {
        message,
        options: None,
        is_complete,
        updated_answers: answers,
        session_id,
    })
}

/// Best-effort session write: a storage failure degrades to a stateless
/// conversation rather than failing the turn.
async fn persist_session(
    state: &AppState,
    req: &NextQuestionRequest,
    answers: &UserAnswers,
    is_complete: bool,
) -> Option<Uuid> {
    let pool = state.pool.as_ref()?;

    match (req.session_id, req.request_id.as_deref()) {
        (Some(session_id), Some(request_id)) => {
            match storage::sessions::commit_turn(
                pool,
                session_id,
                request_id,
                &req.chat_history,
                answers,
                is_complete,
            )
            .await
            {
                Ok(true) => Some(session_id),
                Ok(false) => {
                    tracing::info!(%session_id, request_id, "chat turn superseded; result discarded");
                    Some(session_id)
                }
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::warn!(%session_id, error = %e, "failed to commit chat turn");
                    Some(session_id)
                }
            }
        }
        _ => {
            match storage::sessions::create_session(
                pool,
                req.request_id.as_deref(),
                &req.chat_history,
                answers,
                is_complete,
            )
            .await
            {
                Ok(session_id) => Some(session_id),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::warn!(error = %e, "failed to store chat session");
                    None
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveProfileRequest {
    monthly_investment: String,
    investment_preference: String,
    risk_tolerance: String,
    goal: String,
    #[serde(default)]
    age: Option<String>,
    #[serde(default)]
    income: Option<String>,
    #[serde(default)]
    experience: Option<String>,
    #[serde(default)]
    time_horizon: Option<String>,
    #[serde(default)]
    session_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveProfileResponse {
    success: bool,
    message: String,
    profile_id: Uuid,
}

async fn save_profile(
    State(state): State<AppState>,
    Json(req): Json<SaveProfileRequest>,
) -> Result<Json<SaveProfileResponse>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let answers = UserAnswers {
        monthly_investment: Some(req.monthly_investment),
        preference: Some(req.investment_preference),
        risk_tolerance: Some(req.risk_tolerance),
        goal: Some(req.goal),
        age: req.age,
        income: req.income,
        experience: req.experience,
        time_horizon: req.time_horizon,
    };

    let profile_id = storage::profiles::insert_profile(pool, &answers)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if let Some(session_id) = req.session_id {
        if let Err(e) = storage::sessions::link_profile(pool, session_id, profile_id).await {
            sentry_anyhow::capture_anyhow(&e);
            tracing::warn!(%session_id, %profile_id, error = %e, "failed to link session to profile");
        }
    }

    tracing::info!(%profile_id, "profile saved");

    Ok(Json(SaveProfileResponse {
        success: true,
        message: "Investment profile created successfully! Welcome to FinPilot!".to_string(),
        profile_id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratePlanRequest {
    profile_id: Uuid,
    #[serde(default)]
    feedback: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    success: bool,
    plan: InvestmentPlan,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan_id: Option<Uuid>,
}

async fn generate_plan(
    State(state): State<AppState>,
    Json(req): Json<GeneratePlanRequest>,
) -> Result<Json<PlanResponse>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let answers = storage::profiles::fetch_profile(pool, req.profile_id)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let inputs = engine::normalize(&answers, req.feedback.as_deref());
    let plan = engine::build_plan(&inputs);

    // The plan itself never depends on storage; a failed insert only costs
    // the saved copy.
    let plan_id = match storage::plans::insert_plan(pool, Some(req.profile_id), &plan).await {
        Ok(id) => Some(id),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::warn!(profile_id = %req.profile_id, error = %e, "failed to store generated plan");
            None
        }
    };

    let message = match &req.feedback {
        Some(feedback) => {
            format!("I've adjusted your investment plan based on your feedback: '{feedback}'")
        }
        None => "I've created your personalized investment plan based on your profile.".to_string(),
    };

    tracing::info!(profile_id = %req.profile_id, plan_id = ?plan_id, "investment plan generated");

    Ok(Json(PlanResponse {
        success: true,
        plan,
        message,
        plan_id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavePlanRequest {
    profile_id: Uuid,
    plan: InvestmentPlan,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavePlanResponse {
    success: bool,
    message: String,
    plan_id: Uuid,
}

async fn save_plan(
    State(state): State<AppState>,
    Json(req): Json<SavePlanRequest>,
) -> Result<Json<SavePlanResponse>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let plan_id = storage::plans::insert_plan(pool, Some(req.profile_id), &req.plan)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::info!(%plan_id, profile_id = %req.profile_id, "investment plan saved");

    Ok(Json(SavePlanResponse {
        success: true,
        message: "Your investment plan has been successfully saved! You can access it anytime from your dashboard.".to_string(),
        plan_id,
    }))
}

#[derive(Debug, Serialize)]
struct GetPlanResponse {
    plan: InvestmentPlan,
}

async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Json<GetPlanResponse>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let plan_id = Uuid::parse_str(&plan_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    let plan = storage::plans::fetch_plan(pool, plan_id)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(GetPlanResponse { plan }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &finpilot_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
