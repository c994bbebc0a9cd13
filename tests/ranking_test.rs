use quiz_backend::services::profile_service::ProfileService;
use quiz_backend::services::rank_service::RankService;
use sqlx::PgPool;

/// These tests need a live Postgres; without DATABASE_URL they are skipped.
async fn setup() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    }
    std::env::set_var("SCHEDULER_AUTOSTART", "false");
    let _ = quiz_backend::config::init_config();

    let pool = quiz_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    Some(pool)
}

fn unique(prefix: &str) -> String {
    format!(
        "{}_{}",
        prefix,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

async fn seed_user(pool: &PgPool, prefix: &str) -> i64 {
    sqlx::query_scalar(r#"INSERT INTO users (username) VALUES ($1) RETURNING id"#)
        .bind(unique(prefix))
        .fetch_one(pool)
        .await
        .expect("seed user")
}

/// Inserts a completed attempt against a fresh quiz shell, bypassing the
/// submission path, and returns the attempt id.
async fn seed_completed_attempt(
    pool: &PgPool,
    user_id: i64,
    score: i32,
    total_points: i32,
    is_ai: bool,
) -> i64 {
    let quiz_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (title, description, is_active, is_ai_generated)
        VALUES ($1, '', FALSE, $2)
        RETURNING id
        "#,
    )
    .bind(unique("seeded_quiz"))
    .bind(is_ai)
    .fetch_one(pool)
    .await
    .expect("seed quiz");

    sqlx::query_scalar(
        r#"
        INSERT INTO quiz_attempts (user_id, quiz_id, score, total_points, is_completed, completed_at)
        VALUES ($1, $2, $3, $4, TRUE, NOW())
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(score)
    .bind(total_points)
    .fetch_one(pool)
    .await
    .expect("seed attempt")
}

async fn rank_of(pool: &PgPool, user_id: i64) -> i32 {
    sqlx::query_scalar(r#"SELECT rank FROM user_profiles WHERE user_id = $1"#)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("rank lookup")
}

#[tokio::test]
async fn aggregates_use_ratio_of_means() {
    let Some(pool) = setup().await else { return };
    let profiles = ProfileService::new(pool.clone());

    let user_id = seed_user(&pool, "ratio").await;
    seed_completed_attempt(&pool, user_id, 5, 10, false).await;
    seed_completed_attempt(&pool, user_id, 3, 5, false).await;

    let profile = profiles.update_stats(user_id).await.unwrap();
    assert_eq!(profile.total_quizzes_completed, 2);
    assert_eq!(profile.total_score, 8);
    // mean(5,3)/mean(10,5)*100, not the 55.0 a mean of percentages would give.
    assert_eq!(profile.average_score_percentage, 53.33);
}

#[tokio::test]
async fn ai_attempts_never_count_toward_aggregates() {
    let Some(pool) = setup().await else { return };
    let profiles = ProfileService::new(pool.clone());

    let user_id = seed_user(&pool, "ai_excluded").await;
    seed_completed_attempt(&pool, user_id, 4, 4, false).await;
    seed_completed_attempt(&pool, user_id, 10, 10, true).await;

    let profile = profiles.update_stats(user_id).await.unwrap();
    assert_eq!(profile.total_quizzes_completed, 1);
    assert_eq!(profile.total_score, 4);
    assert_eq!(profile.average_score_percentage, 100.0);
}

#[tokio::test]
async fn update_stats_is_idempotent() {
    let Some(pool) = setup().await else { return };
    let profiles = ProfileService::new(pool.clone());

    let user_id = seed_user(&pool, "idem").await;
    seed_completed_attempt(&pool, user_id, 6, 7, false).await;

    let first = profiles.update_stats(user_id).await.unwrap();
    let second = profiles.update_stats(user_id).await.unwrap();
    assert_eq!(first.total_score, second.total_score);
    assert_eq!(
        first.total_quizzes_completed,
        second.total_quizzes_completed
    );
    assert_eq!(
        first.average_score_percentage,
        second.average_score_percentage
    );
}

#[tokio::test]
async fn ranks_are_dense_and_ties_break_on_user_id() {
    let Some(pool) = setup().await else { return };
    let profiles = ProfileService::new(pool.clone());
    let ranks = RankService::new(pool.clone());

    // Two users with identical totals and averages.
    let first = seed_user(&pool, "tie_a").await;
    let second = seed_user(&pool, "tie_b").await;
    assert!(first < second);
    seed_completed_attempt(&pool, first, 5, 10, false).await;
    seed_completed_attempt(&pool, second, 5, 10, false).await;
    profiles.update_stats(first).await.unwrap();
    profiles.update_stats(second).await.unwrap();

    let ranked = ranks.recompute_all().await.unwrap();
    assert!(ranked >= 2);

    let rank_first = rank_of(&pool, first).await;
    let rank_second = rank_of(&pool, second).await;
    assert!(rank_first > 0 && rank_second > 0);
    assert!(
        rank_first < rank_second,
        "lower user id must win the tiebreak: {} vs {}",
        rank_first,
        rank_second
    );

    // Dense: the assigned ranks are exactly 1..N with no gaps.
    let all_ranks: Vec<i32> =
        sqlx::query_scalar(r#"SELECT rank FROM user_profiles WHERE rank > 0 ORDER BY rank"#)
            .fetch_all(&pool)
            .await
            .unwrap();
    let expected: Vec<i32> = (1..=all_ranks.len() as i32).collect();
    assert_eq!(all_ranks, expected);
}

#[tokio::test]
async fn repeated_recomputes_preserve_the_ordering() {
    let Some(pool) = setup().await else { return };
    let profiles = ProfileService::new(pool.clone());
    let ranks = RankService::new(pool.clone());

    let strong = seed_user(&pool, "det_strong").await;
    let weak = seed_user(&pool, "det_weak").await;
    seed_completed_attempt(&pool, strong, 9, 10, false).await;
    seed_completed_attempt(&pool, weak, 2, 10, false).await;
    profiles.update_stats(strong).await.unwrap();
    profiles.update_stats(weak).await.unwrap();

    ranks.recompute_all().await.unwrap();
    let first_pass = (rank_of(&pool, strong).await, rank_of(&pool, weak).await);
    ranks.recompute_all().await.unwrap();
    let second_pass = (rank_of(&pool, strong).await, rank_of(&pool, weak).await);

    assert!(first_pass.0 < first_pass.1);
    assert!(second_pass.0 < second_pass.1);
}

#[tokio::test]
async fn live_rank_matches_the_ordering_rule() {
    let Some(pool) = setup().await else { return };
    let profiles = ProfileService::new(pool.clone());
    let ranks = RankService::new(pool.clone());

    let nobody = seed_user(&pool, "live_nobody").await;
    assert_eq!(ranks.live_rank(nobody).await.unwrap(), 0);

    let contender = seed_user(&pool, "live_contender").await;
    seed_completed_attempt(&pool, contender, 7, 7, false).await;
    profiles.update_stats(contender).await.unwrap();

    let live = ranks.live_rank(contender).await.unwrap();
    assert!(live >= 1);

    // The live rank agrees with a full recompute over the same snapshot.
    ranks.recompute_all().await.unwrap();
    let persisted = rank_of(&pool, contender).await;
    assert!(persisted >= 1);
}

#[tokio::test]
async fn cleaned_up_profile_loses_its_rank() {
    let Some(pool) = setup().await else { return };
    let profiles = ProfileService::new(pool.clone());
    let ranks = RankService::new(pool.clone());
    let attempts =
        quiz_backend::services::attempt_service::AttemptService::new(pool.clone());

    let user_id = seed_user(&pool, "dropout").await;
    let attempt_id = seed_completed_attempt(&pool, user_id, 6, 7, false).await;
    // Backdate so an old cutoff removes this attempt and nothing else.
    sqlx::query(r#"UPDATE quiz_attempts SET started_at = '2000-06-01T00:00:00Z' WHERE id = $1"#)
        .bind(attempt_id)
        .execute(&pool)
        .await
        .unwrap();

    profiles.update_stats(user_id).await.unwrap();
    ranks.recompute_all().await.unwrap();
    assert!(rank_of(&pool, user_id).await > 0);

    let cutoff = chrono::DateTime::parse_from_rfc3339("2001-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let (deleted_attempts, _deleted_answers) =
        attempts.delete_started_before(cutoff).await.unwrap();
    assert!(deleted_attempts >= 1);

    profiles.update_stats(user_id).await.unwrap();
    ranks.recompute_all().await.unwrap();

    let profile = profiles.get_or_create(user_id).await.unwrap();
    assert_eq!(profile.total_quizzes_completed, 0);
    assert_eq!(profile.total_score, 0);
    assert_eq!(profile.average_score_percentage, 0.0);
    assert_eq!(profile.rank, 0);
}
