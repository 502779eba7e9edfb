use crate::domain::plan::InvestmentPlan;
use anyhow::Context;

pub async fn insert_plan(
    pool: &sqlx::PgPool,
    profile_id: Option<uuid::Uuid>,
    plan: &InvestmentPlan,
) -> anyhow::Result<uuid::Uuid> {
    let plan_id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO investment_plans (profile_id, plan) VALUES ($1, $2) RETURNING id",
    )
    .bind(profile_id)
    .bind(serde_json::to_value(plan).context("serialize plan failed")?)
    .fetch_one(pool)
    .await
    .context("insert investment_plans failed")?;

    Ok(plan_id)
}

pub async fn fetch_plan(
    pool: &sqlx::PgPool,
    plan_id: uuid::Uuid,
) -> anyhow::Result<Option<InvestmentPlan>> {
    let row = sqlx::query_scalar::<_, serde_json::Value>(
        "SELECT plan FROM investment_plans WHERE id = $1",
    )
    .bind(plan_id)
    .fetch_optional(pool)
    .await
    .context("select investment_plans failed")?;

    let Some(value) = row else {
        return Ok(None);
    };

    let plan = serde_json::from_value(value)
        .with_context(|| format!("invalid plan document in DB for plan_id={plan_id}"))?;
    Ok(Some(plan))
}
