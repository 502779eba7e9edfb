use crate::domain::profile::UserAnswers;
use anyhow::Context;

pub async fn insert_profile(
    pool: &sqlx::PgPool,
    answers: &UserAnswers,
) -> anyhow::Result<uuid::Uuid> {
    anyhow::ensure!(
        answers.is_complete(),
        "profile must have all core answers before saving"
    );

    let profile_id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO user_profiles \
         (monthly_investment, preference, risk_tolerance, goal, age, income, experience, time_horizon) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id",
    )
    .bind(&answers.monthly_investment)
    .bind(&answers.preference)
    .bind(&answers.risk_tolerance)
    .bind(&answers.goal)
    .bind(&answers.age)
    .bind(&answers.income)
    .bind(&answers.experience)
    .bind(&answers.time_horizon)
    .fetch_one(pool)
    .await
    .context("insert user_profiles failed")?;

    Ok(profile_id)
}

pub async fn fetch_profile(
    pool: &sqlx::PgPool,
    profile_id: uuid::Uuid,
) -> anyhow::Result<Option<UserAnswers>> {
    let row = sqlx::query_as::<
        _,
        (
            String,
            String,
            String,
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        ),
    >(
        "SELECT monthly_investment, preference, risk_tolerance, goal, age, income, experience, time_horizon \
         FROM user_profiles \
         WHERE id = $1",
    )
    .bind(profile_id)
    .fetch_optional(pool)
    .await
    .context("select user_profiles failed")?;

    let Some((monthly_investment, preference, risk_tolerance, goal, age, income, experience, time_horizon)) =
        row
    else {
        return Ok(None);
    };

    Ok(Some(UserAnswers {
        monthly_investment: Some(monthly_investment),
        preference: Some(preference),
        risk_tolerance: Some(risk_tolerance),
        goal: Some(goal),
        age,
        income,
        experience,
        time_horizon,
    }))
}
