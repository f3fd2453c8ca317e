// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end task, occurrence and progress flows through the HTTP API.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{authed_request, body_json, create_test_app, send};

const USER: u64 = 1001;
const OTHER_USER: u64 = 2002;

async fn create_task(app: &axum::Router, body: serde_json::Value) -> String {
    let response = send(app, authed_request("POST", "/api/tasks", USER, Some(body))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_and_list_tasks() {
    let (app, _, _) = create_test_app();

    create_task(
        &app,
        json!({"activity_name": "Read", "repeat": "daily", "counter": 20}),
    )
    .await;
    create_task(
        &app,
        json!({"activity_name": "Taxes", "deadline_date": "2024-04-15"}),
    )
    .await;

    let response = send(&app, authed_request("GET", "/api/tasks", USER, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let tasks = body_json(response).await;
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    // Tasks with a deadline sort first
    assert_eq!(tasks[0]["activity_name"], "Taxes");
    assert_eq!(tasks[0]["repeat"], "none");
    assert_eq!(tasks[1]["repeat"], "daily");

    // Another user sees nothing
    let response = send(&app, authed_request("GET", "/api/tasks", OTHER_USER, None)).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_task_validation() {
    let (app, _, _) = create_test_app();

    for body in [
        json!({"activity_name": ""}),
        json!({"activity_name": "Run", "repeat": "hourly"}),
        json!({"activity_name": "Run", "timer_minutes": 0}),
        json!({"activity_name": "Run", "deadline_date": "tomorrow"}),
    ] {
        let response = send(&app, authed_request("POST", "/api/tasks", USER, Some(body))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "bad_request");
    }
}

#[tokio::test]
async fn test_foreign_task_is_not_found() {
    let (app, _, _) = create_test_app();
    let task_id = create_task(&app, json!({"activity_name": "Stretch", "repeat": "daily"})).await;

    let uri = format!("/api/tasks/{}", task_id);
    let response = send(&app, authed_request("GET", &uri, OTHER_USER, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, authed_request("DELETE", &uri, OTHER_USER, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let uri = format!("/api/tasks/{}/occurrences/2024-01-01", task_id);
    let response = send(
        &app,
        authed_request("PUT", &uri, OTHER_USER, Some(json!({"completed": true}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_task_keeps_identity() {
    let (app, _, _) = create_test_app();
    let task_id = create_task(&app, json!({"activity_name": "Walk", "repeat": "daily"})).await;

    let uri = format!("/api/tasks/{}", task_id);
    let response = send(
        &app,
        authed_request(
            "PUT",
            &uri,
            USER,
            Some(json!({"activity_name": "Long walk", "repeat": "weekly", "timer_minutes": 90})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let task = body_json(response).await;
    assert_eq!(task["id"], task_id.as_str());
    assert_eq!(task["repeat"], "weekly");
    assert_eq!(task["metric"]["timer_minutes"], 90);
}

#[tokio::test]
async fn test_generate_weekly_occurrences_twice() {
    let (app, _, _) = create_test_app();
    let task_id = create_task(&app, json!({"activity_name": "Review", "repeat": "weekly"})).await;

    let uri = format!("/api/tasks/{}/occurrences/generate", task_id);
    let body = json!({"anchor": "2024-01-01", "horizon_days": 21});

    let response = send(&app, authed_request("POST", &uri, USER, Some(body.clone()))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["candidates"], 4);
    assert_eq!(report["inserted"], 4);

    let response = send(&app, authed_request("POST", &uri, USER, Some(body))).await;
    let report = body_json(response).await;
    assert_eq!(report["inserted"], 0);

    let list_uri = format!("/api/tasks/{}/occurrences", task_id);
    let response = send(&app, authed_request("GET", &list_uri, USER, None)).await;
    let occurrences = body_json(response).await;
    let dates: Vec<&str> = occurrences
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["occurred_on"].as_str().unwrap())
        .collect();
    assert_eq!(
        dates,
        vec!["2024-01-01", "2024-01-08", "2024-01-15", "2024-01-22"]
    );
}

#[tokio::test]
async fn test_generate_rejects_bad_horizon() {
    let (app, _, _) = create_test_app();
    let task_id = create_task(&app, json!({"activity_name": "Read", "repeat": "daily"})).await;

    let uri = format!("/api/tasks/{}/occurrences/generate", task_id);
    for horizon in [-1, 100_000] {
        let response = send(
            &app,
            authed_request("POST", &uri, USER, Some(json!({"horizon_days": horizon}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_generate_all_tasks() {
    let (app, _, _) = create_test_app();
    create_task(&app, json!({"activity_name": "A", "repeat": "daily"})).await;
    create_task(&app, json!({"activity_name": "B", "repeat": "monthly"})).await;

    let response = send(
        &app,
        authed_request(
            "POST",
            "/api/occurrences/generate",
            USER,
            Some(json!({"horizon_days": 7})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["reports"].as_array().unwrap().len(), 2);
    assert_eq!(report["failed_task_ids"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_completion_flow() {
    let (app, _, _) = create_test_app();
    let task_id = create_task(&app, json!({"activity_name": "Meditate", "repeat": "daily"})).await;
    let uri = format!("/api/tasks/{}/occurrences/2024-03-01", task_id);

    let response = send(
        &app,
        authed_request(
            "PUT",
            &uri,
            USER,
            Some(json!({"completed": true, "seconds_logged": 600})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let occ = body_json(response).await;
    assert_eq!(occ["completed"], true);
    assert_eq!(occ["seconds_logged"], 600);
    assert!(occ["completed_at"].is_string());

    // Smaller seconds never lower the stored value
    let response = send(
        &app,
        authed_request(
            "PUT",
            &uri,
            USER,
            Some(json!({"completed": true, "seconds_logged": 100})),
        ),
    )
    .await;
    assert_eq!(body_json(response).await["seconds_logged"], 600);

    // Unmarking clears the completion time
    let response = send(
        &app,
        authed_request("PUT", &uri, USER, Some(json!({"completed": false}))),
    )
    .await;
    let occ = body_json(response).await;
    assert_eq!(occ["completed"], false);
    assert!(occ["completed_at"].is_null());
    assert_eq!(occ["seconds_logged"], 600);
}

#[tokio::test]
async fn test_completion_rejects_bad_input() {
    let (app, _, store) = create_test_app();
    let task_id = create_task(&app, json!({"activity_name": "Meditate", "repeat": "daily"})).await;

    let uri = format!("/api/tasks/{}/occurrences/03-01-2024", task_id);
    let response = send(
        &app,
        authed_request("PUT", &uri, USER, Some(json!({"completed": true}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let uri = format!("/api/tasks/{}/occurrences/2024-03-01", task_id);
    let response = send(
        &app,
        authed_request(
            "PUT",
            &uri,
            USER,
            Some(json!({"completed": true, "seconds_logged": -5})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was written
    use habit_streaks::db::HabitStore;
    let rows = store.list_occurrences(&task_id, None, None).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_progress_and_window() {
    let (app, _, _) = create_test_app();
    let task_id = create_task(
        &app,
        json!({"activity_name": "Push-ups", "repeat": "daily", "counter": 20}),
    )
    .await;

    let uri = format!("/api/tasks/{}/progress", task_id);
    for value in [8, 4] {
        let response = send(
            &app,
            authed_request("POST", &uri, USER, Some(json!({"kind": "count", "value": value}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // Untracked metric and negative values are rejected
    let response = send(
        &app,
        authed_request("POST", &uri, USER, Some(json!({"kind": "minutes", "value": 5}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = send(
        &app,
        authed_request("POST", &uri, USER, Some(json!({"kind": "count", "value": -1}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let window_uri = format!("/api/tasks/{}/window", task_id);
    let response = send(&app, authed_request("GET", &window_uri, USER, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let progress = body_json(response).await;
    assert_eq!(progress["sums"]["count"], 12);
    assert_eq!(progress["percent"], 60.0);
    assert_eq!(progress["success"], false);

    let response = send(
        &app,
        authed_request("POST", &uri, USER, Some(json!({"kind": "count", "value": 10}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, authed_request("GET", &window_uri, USER, None)).await;
    let progress = body_json(response).await;
    assert_eq!(progress["percent"], 100.0);
    assert_eq!(progress["success"], true);

    let streak_uri = format!("/api/tasks/{}/streak", task_id);
    let response = send(&app, authed_request("GET", &streak_uri, USER, None)).await;
    let streak = body_json(response).await;
    assert_eq!(streak["current"], 1);
    assert_eq!(streak["best"], 1);
}

#[tokio::test]
async fn test_named_time_zone_and_timestamp_bounds() {
    let (app, _, _) = create_test_app();
    let task_id = create_task(
        &app,
        json!({"activity_name": "Stretch", "repeat": "daily", "timer_minutes": 10}),
    )
    .await;

    let uri = format!("/api/tasks/{}/window?tz=America/Santiago", task_id);
    let response = send(&app, authed_request("GET", &uri, USER, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/api/tasks/{}/window?tz=Atlantis/Lost_City", task_id);
    let response = send(&app, authed_request("GET", &uri, USER, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");

    let response = send(
        &app,
        authed_request("GET", "/api/streaks?tz=Europe/Berlin", USER, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Progress stamped far in the future is rejected
    let uri = format!("/api/tasks/{}/progress", task_id);
    let response = send(
        &app,
        authed_request(
            "POST",
            &uri,
            USER,
            Some(json!({"kind": "minutes", "value": 10, "at": "2099-01-01T00:00:00Z"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_task_removes_occurrences() {
    let (app, _, store) = create_test_app();
    let task_id = create_task(&app, json!({"activity_name": "Floss", "repeat": "daily"})).await;

    let uri = format!("/api/tasks/{}/occurrences/generate", task_id);
    send(
        &app,
        authed_request(
            "POST",
            &uri,
            USER,
            Some(json!({"anchor": "2024-01-01", "horizon_days": 2})),
        ),
    )
    .await;

    let uri = format!("/api/tasks/{}", task_id);
    let response = send(&app, authed_request("DELETE", &uri, USER, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deleted"], 4);

    let response = send(&app, authed_request("GET", &uri, USER, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    use habit_streaks::db::HabitStore;
    assert!(store.list_occurrences(&task_id, None, None).await.unwrap().is_empty());
}
