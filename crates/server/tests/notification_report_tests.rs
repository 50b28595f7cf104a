mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, TestUser};

async fn team(app: &TestApp) -> (TestUser, TestUser, String, String) {
    let ann = app.register("Ann", "ann@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let (ws, code) = app.workspace(&ann, "Acme").await;
    app.join(&bob, &ws, &code).await;
    let project = app.project(&ann, &ws, "Website").await;
    (ann, bob, ws, project)
}

#[tokio::test]
async fn test_notification_read_lifecycle() {
    let app = TestApp::new();
    let (ann, bob, ws, project) = team(&app).await;
    for name in ["One", "Two", "Three"] {
        app.task(&ann, &ws, &project, json!({ "name": name, "assignee_id": bob.id }))
            .await;
    }

    let (_, body) = app.get("/api/notifications/unread-count", &bob).await;
    assert_eq!(body["data"]["count"], 3);

    let (_, body) = app.get("/api/notifications?limit=2", &bob).await;
    let items = body["data"].as_array().unwrap().clone();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["is_read"], false);

    let first = items[0]["id"].as_str().unwrap();
    let (status, _) = app
        .patch(&format!("/api/notifications/{first}/read"), &bob, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/api/notifications?unread_only=true", &bob).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Someone else's notification is invisible.
    let (status, _) = app
        .patch(&format!("/api/notifications/{first}/read"), &ann, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.post("/api/notifications/read-all", &bob, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 2);
    let (_, body) = app.get("/api/notifications/unread-count", &bob).await;
    assert_eq!(body["data"]["count"], 0);

    let (status, _) = app.delete(&format!("/api/notifications/{first}"), &bob).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&format!("/api/notifications/{first}"), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_weekly_report_draft_then_submit() {
    let app = TestApp::new();
    let (ann, bob, ws, _) = team(&app).await;

    let (status, body) = app
        .post(
            "/api/weekly-reports",
            &bob,
            json!({
                "workspace_id": ws,
                "from_date": "2024-07-01",
                "to_date": "2024-07-05",
                "summary": "Sprint work",
                "task_details": [{ "task": "Login", "hours": 6 }],
                "is_draft": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["is_draft"], true);
    assert_eq!(body["data"]["task_details"][0]["task"], "Login");

    // Drafts do not notify.
    let (_, body) = app.get("/api/notifications/unread-count", &ann).await;
    assert_eq!(body["data"]["count"], 0);

    let (status, _) = app
        .patch(&format!("/api/weekly-reports/{id}"), &ann, json!({ "summary": "edited" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .patch(&format!("/api/weekly-reports/{id}"), &bob, json!({ "is_draft": false }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["is_draft"], false);

    let (_, body) = app.get("/api/notifications", &ann).await;
    assert_eq!(body["data"][0]["kind"], "WEEKLY_REPORT_SUBMITTED");
    assert_eq!(body["data"][0]["metadata"]["report_id"], id.as_str());

    let (status, _) = app
        .patch(&format!("/api/weekly-reports/{id}"), &bob, json!({ "summary": "late edit" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_weekly_report_period_and_visibility() {
    let app = TestApp::new();
    let (ann, bob, ws, _) = team(&app).await;

    let (status, _) = app
        .post(
            "/api/weekly-reports",
            &bob,
            json!({ "workspace_id": ws, "from_date": "2024-07-01", "to_date": "2024-07-09" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post(
            "/api/weekly-reports",
            &bob,
            json!({ "workspace_id": ws, "from_date": "2024-07-05", "to_date": "2024-07-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/weekly-reports",
            &ann,
            json!({ "workspace_id": ws, "from_date": "2024-07-01", "to_date": "2024-07-07" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["is_draft"], false);
    let ann_report = body["data"]["id"].as_str().unwrap().to_string();
    app.post(
        "/api/weekly-reports",
        &bob,
        json!({ "workspace_id": ws, "from_date": "2024-07-01", "to_date": "2024-07-07" }),
    )
    .await;

    let (_, body) = app.get(&format!("/api/weekly-reports?workspace_id={ws}"), &ann).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let (_, body) = app.get(&format!("/api/weekly-reports?workspace_id={ws}"), &bob).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.get(&format!("/api/weekly-reports/{ann_report}"), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/api/weekly-reports/{ann_report}"), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/api/weekly-reports/{ann_report}"), &ann).await;
    assert_eq!(status, StatusCode::OK);
}
