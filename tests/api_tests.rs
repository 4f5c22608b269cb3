// tests/api_tests.rs
//
// End-to-end tests against a live Postgres instance. Run them with a
// database available:
//
//   DATABASE_URL=postgres://... cargo test -- --ignored

use std::sync::Arc;

use lxp_backend::{
    config::Config, routes, services::certificate::PgCertificateIssuer, state::AppState,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345") and a pool handle.
async fn spawn_app() -> (String, PgPool) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        issuer: Arc::new(PgCertificateIssuer::new(pool.clone())),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

/// Registers a fresh user and returns (username, token).
async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    role: Option<&str>,
    pool: &PgPool,
) -> (String, String) {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    let response = client
        .post(format!("{address}/api/auth/register"))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("register failed");
    assert_eq!(response.status().as_u16(), 201);

    if let Some(role) = role {
        sqlx::query("UPDATE users SET role = $1 WHERE username = $2")
            .bind(role)
            .bind(&username)
            .execute(pool)
            .await
            .unwrap();
    }

    let response = client
        .post(format!("{address}/api/auth/login"))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("login failed");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    (username, token)
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    token: &str,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(url)
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("request failed")
}

/// Builds a published course with one module, `lesson_titles.len()` lessons,
/// and returns (course_id, lesson_ids).
async fn build_course(
    client: &reqwest::Client,
    address: &str,
    staff_token: &str,
    lesson_count: usize,
) -> (i64, Vec<i64>) {
    let response = post_json(
        client,
        &format!("{address}/api/authoring/courses"),
        staff_token,
        serde_json::json!({ "title": "Onboarding", "hours": 8, "published": true }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);
    let course_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = post_json(
        client,
        &format!("{address}/api/authoring/courses/{course_id}/modules"),
        staff_token,
        serde_json::json!({ "title": "Module 1", "position": 1 }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);
    let module_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let mut lesson_ids = Vec::new();
    for i in 0..lesson_count {
        let response = post_json(
            client,
            &format!("{address}/api/authoring/modules/{module_id}/lessons"),
            staff_token,
            serde_json::json!({ "title": format!("Lesson {i}"), "position": i }),
        )
        .await;
        assert_eq!(response.status().as_u16(), 201);
        lesson_ids.push(
            response.json::<serde_json::Value>().await.unwrap()["id"]
                .as_i64()
                .unwrap(),
        );
    }

    (course_id, lesson_ids)
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn unknown_route_is_404() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn authoring_requires_staff_role() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, student_token) = register_and_login(&client, &address, None, &pool).await;

    let response = post_json(
        &client,
        &format!("{address}/api/authoring/courses"),
        &student_token,
        serde_json::json!({ "title": "Nope" }),
    )
    .await;

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn evaluation_attempt_ceiling_is_enforced() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, staff_token) = register_and_login(&client, &address, Some("teacher"), &pool).await;
    let (_, student_token) = register_and_login(&client, &address, None, &pool).await;

    let (course_id, lesson_ids) = build_course(&client, &address, &staff_token, 1).await;

    let response = post_json(
        &client,
        &format!("{address}/api/authoring/evaluations"),
        &staff_token,
        serde_json::json!({
            "lesson_id": lesson_ids[0],
            "title": "Checkpoint",
            "kind": "quiz",
            "passing_score": 60.0,
            "attempts": 2,
            "published": true
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);
    let evaluation_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = post_json(
        &client,
        &format!("{address}/api/authoring/evaluations/{evaluation_id}/questions"),
        &staff_token,
        serde_json::json!({
            "type": "multiple_choice",
            "prompt": "2 + 2?",
            "options": ["3", "4"],
            "answer": "4",
            "points": 10
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);
    let question_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    post_json(
        &client,
        &format!("{address}/api/courses/{course_id}/enroll"),
        &student_token,
        serde_json::json!({}),
    )
    .await;

    // The taking view must not leak answers or explanations.
    let response = client
        .get(format!("{address}/api/evaluations/{evaluation_id}"))
        .bearer_auth(&student_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(!body.contains("\"answer\""));
    assert!(!body.contains("explanation"));

    // Attempt 1: wrong answer, fails.
    let submit_url = format!("{address}/api/evaluations/{evaluation_id}/submit");
    let response = post_json(
        &client,
        &submit_url,
        &student_token,
        serde_json::json!({ "answers": { question_id.to_string(): "3" } }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["passed"], false);
    assert_eq!(body["attemptNumber"], 1);

    // Attempt 2.
    let response = post_json(
        &client,
        &submit_url,
        &student_token,
        serde_json::json!({ "answers": { question_id.to_string(): "3" } }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);

    // Attempt 3 exceeds the ceiling: structured 422, no new row.
    let response = post_json(
        &client,
        &submit_url,
        &student_token,
        serde_json::json!({ "answers": { question_id.to_string(): "3" } }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 422);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["attemptsLeft"], 0);
    assert_eq!(body["maxAttempts"], 2);

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM evaluation_submissions WHERE evaluation_id = $1",
    )
    .bind(evaluation_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn draft_evaluation_rejects_student_submissions() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, staff_token) = register_and_login(&client, &address, Some("teacher"), &pool).await;
    let (_, student_token) = register_and_login(&client, &address, None, &pool).await;

    let (course_id, lesson_ids) = build_course(&client, &address, &staff_token, 1).await;

    let response = post_json(
        &client,
        &format!("{address}/api/authoring/evaluations"),
        &staff_token,
        serde_json::json!({
            "lesson_id": lesson_ids[0],
            "title": "Draft checkpoint",
            "kind": "quiz",
            "passing_score": 60.0,
            "attempts": 3,
            "published": false
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);
    let evaluation_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = post_json(
        &client,
        &format!("{address}/api/authoring/evaluations/{evaluation_id}/questions"),
        &staff_token,
        serde_json::json!({
            "type": "multiple_choice",
            "prompt": "2 + 2?",
            "options": ["3", "4"],
            "answer": "4",
            "points": 10
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);
    let question_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    post_json(
        &client,
        &format!("{address}/api/courses/{course_id}/enroll"),
        &student_token,
        serde_json::json!({}),
    )
    .await;

    // A student who knows the id still cannot grade against a draft,
    // on the taking view or on the submit path.
    let response = client
        .get(format!("{address}/api/evaluations/{evaluation_id}"))
        .bearer_auth(&student_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = post_json(
        &client,
        &format!("{address}/api/evaluations/{evaluation_id}/submit"),
        &student_token,
        serde_json::json!({ "answers": { question_id.to_string(): "4" } }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 404);

    // No attempt row burned.
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM evaluation_submissions WHERE evaluation_id = $1",
    )
    .bind(evaluation_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 0);

    // Staff can still dry-run their own draft.
    let response = post_json(
        &client,
        &format!("{address}/api/evaluations/{evaluation_id}/submit"),
        &staff_token,
        serde_json::json!({ "answers": { question_id.to_string(): "4" } }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn manual_review_overrides_pass_flag_only() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, staff_token) = register_and_login(&client, &address, Some("teacher"), &pool).await;
    let (_, student_token) = register_and_login(&client, &address, None, &pool).await;

    let (course_id, lesson_ids) = build_course(&client, &address, &staff_token, 1).await;

    let response = post_json(
        &client,
        &format!("{address}/api/authoring/evaluations"),
        &staff_token,
        serde_json::json!({
            "lesson_id": lesson_ids[0],
            "title": "Essay",
            "kind": "quiz",
            "passing_score": 60.0,
            "attempts": 3,
            "published": true
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);
    let evaluation_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = post_json(
        &client,
        &format!("{address}/api/authoring/evaluations/{evaluation_id}/questions"),
        &staff_token,
        serde_json::json!({
            "type": "open_text",
            "prompt": "Explain the onboarding flow.",
            "options": [],
            "points": 10
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);
    let question_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    post_json(
        &client,
        &format!("{address}/api/courses/{course_id}/enroll"),
        &student_token,
        serde_json::json!({}),
    )
    .await;

    // Open-text answers never auto-pass: two attempts, both 0%.
    let submit_url = format!("{address}/api/evaluations/{evaluation_id}/submit");
    let mut submission_ids = Vec::new();
    for essay in ["First draft.", "Second draft."] {
        let response = post_json(
            &client,
            &submit_url,
            &student_token,
            serde_json::json!({ "answers": { question_id.to_string(): essay } }),
        )
        .await;
        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["passed"], false);
        assert_eq!(body["percentage"], 0.0);
        submission_ids.push(body["submissionId"].as_i64().unwrap());
    }

    // Students may not review.
    let response = post_json(
        &client,
        &format!("{}/api/submissions/{}/review", address, submission_ids[0]),
        &student_token,
        serde_json::json!({ "approve": true }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 403);

    // Approval flips the verdict; the automatic score stays as graded.
    let response = post_json(
        &client,
        &format!("{}/api/submissions/{}/review", address, submission_ids[0]),
        &staff_token,
        serde_json::json!({ "approve": true, "feedback": "Well argued." }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);

    let (passed, score, percentage, feedback): (bool, i32, f64, Option<String>) =
        sqlx::query_as(
            "SELECT passed, score, percentage, feedback FROM evaluation_submissions WHERE id = $1",
        )
        .bind(submission_ids[0])
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(passed);
    assert_eq!(score, 0);
    assert_eq!(percentage, 0.0);
    assert_eq!(feedback.as_deref(), Some("Well argued."));

    // A non-approving review records the reviewer but leaves the verdict.
    let response = post_json(
        &client,
        &format!("{}/api/submissions/{}/review", address, submission_ids[1]),
        &staff_token,
        serde_json::json!({ "approve": false, "feedback": "Too thin." }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);

    let (passed, reviewed): (bool, bool) = sqlx::query_as(
        "SELECT passed, reviewed_at IS NOT NULL FROM evaluation_submissions WHERE id = $1",
    )
    .bind(submission_ids[1])
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(!passed);
    assert!(reviewed);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn progress_cascades_to_completion_and_certificate() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, staff_token) = register_and_login(&client, &address, Some("teacher"), &pool).await;
    let (_, student_token) = register_and_login(&client, &address, None, &pool).await;

    let (course_id, lesson_ids) = build_course(&client, &address, &staff_token, 4).await;

    post_json(
        &client,
        &format!("{address}/api/courses/{course_id}/enroll"),
        &student_token,
        serde_json::json!({}),
    )
    .await;

    // Complete 2 of 4 lessons -> 50%.
    for lesson_id in &lesson_ids[..2] {
        let response = post_json(
            &client,
            &format!("{address}/api/lessons/{lesson_id}/progress"),
            &student_token,
            serde_json::json!({ "completed": true, "time_spent_seconds": 60 }),
        )
        .await;
        assert_eq!(response.status().as_u16(), 200);
    }

    let progress: f64 = sqlx::query_scalar(
        "SELECT progress FROM enrollments WHERE course_id = $1",
    )
    .bind(course_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(progress, 50.0);

    // Complete the rest -> 100%, COMPLETED, certificate issued.
    for lesson_id in &lesson_ids[2..] {
        let response = post_json(
            &client,
            &format!("{address}/api/lessons/{lesson_id}/progress"),
            &student_token,
            serde_json::json!({ "completed": true, "time_spent_seconds": 60 }),
        )
        .await;
        assert_eq!(response.status().as_u16(), 200);
    }

    let (status, progress): (String, f64) = sqlx::query_as(
        "SELECT status, progress FROM enrollments WHERE course_id = $1",
    )
    .bind(course_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "COMPLETED");
    assert_eq!(progress, 100.0);

    let certificates: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM certificates WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(certificates, 1);

    // Re-reporting progress after completion must not mint another one.
    post_json(
        &client,
        &format!("{}/api/lessons/{}/progress", address, lesson_ids[0]),
        &student_token,
        serde_json::json!({ "completed": true, "time_spent_seconds": 10 }),
    )
    .await;

    let certificates: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM certificates WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(certificates, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn diagnostic_retake_overwrites_single_result() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, staff_token) = register_and_login(&client, &address, Some("teacher"), &pool).await;
    let (username, student_token) = register_and_login(&client, &address, None, &pool).await;

    let response = post_json(
        &client,
        &format!("{address}/api/authoring/diagnostics"),
        &staff_token,
        serde_json::json!({ "title": "Placement", "published": true }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);
    let diagnostic_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let mut question_ids = Vec::new();
    for answer in ["a", "a"] {
        let response = post_json(
            &client,
            &format!("{address}/api/authoring/diagnostics/{diagnostic_id}/questions"),
            &staff_token,
            serde_json::json!({
                "prompt": "Pick one",
                "options": ["a", "b"],
                "answer": answer,
                "points": 10
            }),
        )
        .await;
        assert_eq!(response.status().as_u16(), 201);
        question_ids.push(
            response.json::<serde_json::Value>().await.unwrap()["id"]
                .as_i64()
                .unwrap(),
        );
    }

    let submit_url = format!("{address}/api/diagnostics/{diagnostic_id}/submit");

    // First take: 1 of 2 -> 50% -> INTERMEDIATE.
    let response = post_json(
        &client,
        &submit_url,
        &student_token,
        serde_json::json!({ "answers": {
            question_ids[0].to_string(): "a",
            question_ids[1].to_string(): "b",
        }}),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["percentage"], 50.0);
    assert_eq!(body["level"], "INTERMEDIATE");

    // Retake: 2 of 2 -> 100% -> EXPERT, overwriting the previous row.
    let response = post_json(
        &client,
        &submit_url,
        &student_token,
        serde_json::json!({ "answers": {
            question_ids[0].to_string(): "a",
            question_ids[1].to_string(): "a",
        }}),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["level"], "EXPERT");

    let (rows, level): (i64, String) = sqlx::query_as(
        r#"
        SELECT COUNT(*) OVER (), r.level
        FROM diagnostic_results r
        JOIN users u ON r.user_id = u.id
        WHERE r.diagnostic_id = $1 AND u.username = $2
        "#,
    )
    .bind(diagnostic_id)
    .bind(&username)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(level, "EXPERT");
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn lessons_unlock_sequentially() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, staff_token) = register_and_login(&client, &address, Some("teacher"), &pool).await;
    let (_, student_token) = register_and_login(&client, &address, None, &pool).await;

    let (course_id, lesson_ids) = build_course(&client, &address, &staff_token, 2).await;

    post_json(
        &client,
        &format!("{address}/api/courses/{course_id}/enroll"),
        &student_token,
        serde_json::json!({}),
    )
    .await;

    let detail_url = format!("{address}/api/courses/{course_id}");
    let locked_flags = |body: &serde_json::Value| -> Vec<bool> {
        body["modules"][0]["lessons"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["locked"].as_bool().unwrap())
            .collect()
    };

    // Nothing done: lesson 0 open, lesson 1 locked.
    let body: serde_json::Value = client
        .get(&detail_url)
        .bearer_auth(&student_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(locked_flags(&body), vec![false, true]);

    // Complete lesson 0: lesson 1 unlocks (no evaluation gate).
    post_json(
        &client,
        &format!("{}/api/lessons/{}/progress", address, lesson_ids[0]),
        &student_token,
        serde_json::json!({ "completed": true }),
    )
    .await;

    let body: serde_json::Value = client
        .get(&detail_url)
        .bearer_auth(&student_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(locked_flags(&body), vec![false, false]);
}
