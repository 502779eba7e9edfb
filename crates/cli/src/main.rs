use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finpilot_core::domain::profile::UserAnswers;
use finpilot_core::engine;

/// Generate an investment plan straight from profile text, without the API
/// or the chat flow. This is the engine's offline path: malformed input
/// degrades to defaults instead of failing.
#[derive(Debug, Parser)]
#[command(name = "finpilot_cli")]
struct Args {
    /// Monthly investment amount, free text (e.g. "$1000").
    #[arg(long)]
    monthly_investment: Option<String>,

    /// Stated risk tolerance (e.g. "aggressive", "low risk").
    #[arg(long)]
    risk_tolerance: Option<String>,

    /// Instrument preference hint (e.g. "index funds", "stocks", "crypto").
    #[arg(long)]
    preference: Option<String>,

    /// Financial goal; recorded with the profile, not used for allocation.
    #[arg(long)]
    goal: Option<String>,

    /// Feedback on a previous plan (e.g. "safer", "more growth").
    #[arg(long)]
    feedback: Option<String>,

    /// Persist the generated plan (requires DATABASE_URL).
    #[arg(long)]
    save: bool,

    /// Do everything except writing to the database.
    #[arg(long)]
    dry_run: bool,
}

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

    let args = Args::parse();

    let answers = UserAnswers {
        monthly_investment: args.monthly_investment,
        preference: args.preference,
        risk_tolerance: args.risk_tolerance,
        goal: args.goal,
        ..Default::default()
    };

    let inputs = engine::normalize(&answers, args.feedback.as_deref());
    let plan = engine::build_plan(&inputs);

    println!("{}", serde_json::to_string_pretty(&plan)?);

    if !args.save || args.dry_run {
        tracing::info!(
            total_amount = plan.total_amount,
            options = plan.options.len(),
            dry_run = args.dry_run,
            "plan generated"
        );
        return Ok(());
    }

    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    finpilot_core::storage::migrate(&pool).await?;

    match finpilot_core::storage::plans::insert_plan(&pool, None, &plan).await {
        Ok(plan_id) => {
            tracing::info!(%plan_id, total_amount = plan.total_amount, "persisted investment plan");
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "failed to persist investment plan");
            return Err(err);
        }
    }

    Ok(())
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
