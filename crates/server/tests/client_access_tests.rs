mod common;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use common::{TestApp, TestUser};

struct Setup {
    ann: TestUser,
    ws: String,
    project: String,
    other_project: String,
}

async fn setup(app: &TestApp) -> Setup {
    let ann = app.register("Ann", "ann@example.com").await;
    let (ws, _) = app.workspace(&ann, "Agency").await;
    let project = app.project(&ann, &ws, "Client site").await;
    let other_project = app.project(&ann, &ws, "Internal").await;
    Setup {
        ann,
        ws,
        project,
        other_project,
    }
}

async fn invite(app: &TestApp, admin: &TestUser, project: &str, email: &str) -> Value {
    let (status, body) = app
        .post(
            &format!("/api/projects/{project}/client-invitations"),
            admin,
            json!({ "email": email }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

async fn verify(app: &TestApp, token: &str) -> Value {
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/client-invitations/verify?token={token}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn test_client_invitation_flow() {
    let app = TestApp::new();
    let s = setup(&app).await;
    let invitation = invite(&app, &s.ann, &s.project, "Client@Example.com").await;
    assert_eq!(invitation["status"], "PENDING");
    assert_eq!(invitation["email"], "client@example.com");
    let token = invitation["token"].as_str().unwrap().to_string();

    let preview = verify(&app, &token).await;
    assert_eq!(preview["valid"], true);
    assert_eq!(preview["project_name"], "Client site");
    assert_eq!(preview["workspace_name"], "Agency");

    let client = app.register("Cli", "client@example.com").await;
    let (status, body) = app
        .post("/api/client-invitations/accept", &client, json!({ "token": token }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["role"], "CLIENT");
    assert_eq!(body["data"]["project_id"], s.project.as_str());

    let preview = verify(&app, &token).await;
    assert_eq!(preview["valid"], false);
    assert_eq!(preview["reason"], "already_accepted");

    let (_, body) = app.get("/api/notifications", &s.ann).await;
    assert_eq!(body["data"][0]["kind"], "CLIENT_JOINED");
}

#[tokio::test]
async fn test_client_sees_only_granted_projects() {
    let app = TestApp::new();
    let s = setup(&app).await;
    app.task(&s.ann, &s.ws, &s.project, json!({ "name": "Visible" })).await;
    let hidden = app
        .task(&s.ann, &s.ws, &s.other_project, json!({ "name": "Hidden" }))
        .await;

    let token = invite(&app, &s.ann, &s.project, "client@example.com").await["token"]
        .as_str()
        .unwrap()
        .to_string();
    let client = app.register("Cli", "client@example.com").await;
    app.post("/api/client-invitations/accept", &client, json!({ "token": token }))
        .await;

    let (_, body) = app.get(&format!("/api/projects?workspace_id={}", s.ws), &client).await;
    let projects = body["data"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["id"], s.project.as_str());

    let (status, _) = app.get(&format!("/api/projects/{}", s.other_project), &client).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get(&format!("/api/tasks?workspace_id={}", s.ws), &client).await;
    let tasks = body["data"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["name"], "Visible");
    let (status, _) = app
        .get(&format!("/api/tasks/{}", hidden["id"].as_str().unwrap()), &client)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Read-only on the board, but may file bugs.
    let (status, _) = app
        .post(
            "/api/tasks",
            &client,
            json!({ "workspace_id": s.ws, "project_id": s.project, "name": "Nope" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .post(
            "/api/bugs",
            &client,
            json!({ "workspace_id": s.ws, "project_id": s.project, "title": "Logo is blurry" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .get(&format!("/api/reports?workspace_id={}", s.ws), &client)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app
        .get(&format!("/api/workspaces/{}/analytics", s.ws), &client)
        .await;
    assert_eq!(body["data"]["task_count"]["count"], 1);
}

#[tokio::test]
async fn test_expired_invitation_is_gone() {
    let app = TestApp::new();
    let s = setup(&app).await;
    let invitation = invite(&app, &s.ann, &s.project, "client@example.com").await;
    let token = invitation["token"].as_str().unwrap();
    app.exec(&format!(
        "UPDATE client_invitations SET expires_at = '2000-01-01 00:00:00' WHERE id = '{}'",
        invitation["id"].as_str().unwrap()
    ));

    let preview = verify(&app, token).await;
    assert_eq!(preview["valid"], false);
    assert_eq!(preview["reason"], "expired");

    let client = app.register("Cli", "client@example.com").await;
    let (status, _) = app
        .post("/api/client-invitations/accept", &client, json!({ "token": token }))
        .await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn test_reinvite_after_expiry() {
    let app = TestApp::new();
    let s = setup(&app).await;
    let first = invite(&app, &s.ann, &s.project, "client@example.com").await;
    app.exec(&format!(
        "UPDATE client_invitations SET expires_at = '2000-01-01 00:00:00' WHERE id = '{}'",
        first["id"].as_str().unwrap()
    ));

    let second = invite(&app, &s.ann, &s.project, "client@example.com").await;
    assert_ne!(second["token"], first["token"]);
    assert_eq!(verify(&app, second["token"].as_str().unwrap()).await["valid"], true);
}

#[tokio::test]
async fn test_invitation_guards() {
    let app = TestApp::new();
    let s = setup(&app).await;
    let invitation = invite(&app, &s.ann, &s.project, "client@example.com").await;
    let token = invitation["token"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(
            &format!("/api/projects/{}/client-invitations", s.project),
            &s.ann,
            json!({ "email": "client@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let stranger = app.register("Str", "stranger@example.com").await;
    let (status, _) = app
        .post("/api/client-invitations/accept", &stranger, json!({ "token": token }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/api/client-invitations/accept", &stranger, json!({ "token": "bogus" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(verify(&app, "bogus").await["reason"], "not_found");

    let (_, body) = app
        .get(&format!("/api/projects/{}/client-invitations", s.project), &s.ann)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .delete(
            &format!("/api/client-invitations/{}", invitation["id"].as_str().unwrap()),
            &s.ann,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verify(&app, &token).await["reason"], "revoked");
}

#[tokio::test]
async fn test_existing_member_keeps_role_on_accept() {
    let app = TestApp::new();
    let s = setup(&app).await;
    let (_, body) = app.get(&format!("/api/workspaces/{}", s.ws), &s.ann).await;
    let code = body["data"]["invite_code"].as_str().unwrap().to_string();
    let bob = app.register("Bob", "bob@example.com").await;
    app.join(&bob, &s.ws, &code).await;

    let token = invite(&app, &s.ann, &s.project, "bob@example.com").await["token"]
        .as_str()
        .unwrap()
        .to_string();
    let (status, body) = app
        .post("/api/client-invitations/accept", &bob, json!({ "token": token }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["role"], "MEMBER");
}

#[tokio::test]
async fn test_task_report_and_analytics() {
    let app = TestApp::new();
    let s = setup(&app).await;
    app.task(&s.ann, &s.ws, &s.project, json!({ "name": "A", "status": "DONE" }))
        .await;
    app.task(
        &s.ann,
        &s.ws,
        &s.project,
        json!({ "name": "B", "status": "IN_PROGRESS", "assignee_id": s.ann.id }),
    )
    .await;
    app.task(
        &s.ann,
        &s.ws,
        &s.other_project,
        json!({ "name": "C", "due_date": "2020-01-01" }),
    )
    .await;

    let (status, body) = app
        .get(&format!("/api/reports?workspace_id={}", s.ws), &s.ann)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let totals = &body["data"]["totals"];
    assert_eq!(totals["total"], 3);
    assert_eq!(totals["completed"], 1);
    assert_eq!(totals["in_progress"], 1);
    assert_eq!(totals["overdue"], 1);
    assert_eq!(body["data"]["burndown"].as_array().unwrap().len(), 14);

    let (_, body) = app
        .get(
            &format!("/api/reports?workspace_id={}&project_id={}", s.ws, s.project),
            &s.ann,
        )
        .await;
    assert_eq!(body["data"]["totals"]["total"], 2);
    assert_eq!(body["data"]["totals"]["completion_rate"], 50.0);

    let (status, _) = app
        .get(
            &format!("/api/reports?workspace_id={}&from=2024-05-10&to=2024-05-01", s.ws),
            &s.ann,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .get(&format!("/api/projects/{}/analytics", s.project), &s.ann)
        .await;
    assert_eq!(body["data"]["task_count"]["count"], 2);
    assert_eq!(body["data"]["assigned_task_count"]["count"], 1);
    assert_eq!(body["data"]["completed_task_count"]["count"], 1);

    let (_, body) = app
        .get(&format!("/api/workspaces/{}/analytics", s.ws), &s.ann)
        .await;
    assert_eq!(body["data"]["task_count"]["count"], 3);
    assert_eq!(body["data"]["overdue_task_count"]["count"], 1);
}
