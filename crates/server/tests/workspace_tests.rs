mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn test_create_workspace_makes_creator_admin() {
    let app = TestApp::new();
    let ann = app.register("Ann", "ann@example.com").await;
    let (ws, code) = app.workspace(&ann, "Acme").await;
    assert_eq!(code.len(), 10);

    let (status, body) = app.get(&format!("/api/workspaces/{ws}"), &ann).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Acme");
    assert_eq!(body["data"]["member_count"], 1);
    assert_eq!(body["data"]["role"], "ADMIN");

    let (_, body) = app.get("/api/workspaces", &ann).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_non_member_cannot_see_workspace() {
    let app = TestApp::new();
    let ann = app.register("Ann", "ann@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let (ws, _) = app.workspace(&ann, "Acme").await;

    let (status, _) = app.get(&format!("/api/workspaces/{ws}"), &bob).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = app.get("/api/workspaces", &bob).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_join_with_invite_code() {
    let app = TestApp::new();
    let ann = app.register("Ann", "ann@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let (ws, code) = app.workspace(&ann, "Acme").await;

    let (status, _) = app
        .post(
            &format!("/api/workspaces/{ws}/join"),
            &bob,
            json!({ "invite_code": "WRONGCODE1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.join(&bob, &ws, &code).await;
    let (status, _) = app
        .post(
            &format!("/api/workspaces/{ws}/join"),
            &bob,
            json!({ "invite_code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get(&format!("/api/workspaces/{ws}/members"), &ann).await;
    let members = body["data"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    let bob_row = members.iter().find(|m| m["user_id"] == bob.id.as_str()).unwrap();
    assert_eq!(bob_row["role"], "MEMBER");
}

#[tokio::test]
async fn test_reset_invite_code_invalidates_old_code() {
    let app = TestApp::new();
    let ann = app.register("Ann", "ann@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let (ws, old_code) = app.workspace(&ann, "Acme").await;

    let (status, body) = app
        .post(&format!("/api/workspaces/{ws}/reset-invite-code"), &ann, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let new_code = body["data"]["invite_code"].as_str().unwrap().to_string();
    assert_ne!(new_code, old_code);

    let (status, _) = app
        .post(
            &format!("/api/workspaces/{ws}/join"),
            &bob,
            json!({ "invite_code": old_code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    app.join(&bob, &ws, &new_code).await;
}

#[tokio::test]
async fn test_only_admin_updates_and_deletes_workspace() {
    let app = TestApp::new();
    let ann = app.register("Ann", "ann@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let (ws, code) = app.workspace(&ann, "Acme").await;
    app.join(&bob, &ws, &code).await;

    let (status, _) = app
        .patch(&format!("/api/workspaces/{ws}"), &bob, json!({ "name": "Hijack" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .patch(
            &format!("/api/workspaces/{ws}"),
            &ann,
            json!({ "name": "Acme Corp", "description": "Widgets" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["name"], "Acme Corp");
    assert_eq!(body["data"]["description"], "Widgets");

    let (status, body) = app
        .patch(&format!("/api/workspaces/{ws}"), &ann, json!({ "description": null }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["description"].is_null());

    let (status, _) = app.delete(&format!("/api/workspaces/{ws}"), &bob).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&format!("/api/workspaces/{ws}"), &ann).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/workspaces/{ws}"), &ann).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_last_admin_is_protected() {
    let app = TestApp::new();
    let ann = app.register("Ann", "ann@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let (ws, code) = app.workspace(&ann, "Acme").await;
    app.join(&bob, &ws, &code).await;

    let (_, body) = app.get(&format!("/api/workspaces/{ws}/members"), &ann).await;
    let members = body["data"].as_array().unwrap().clone();
    let member_id = |user_id: &str| {
        members
            .iter()
            .find(|m| m["user_id"] == user_id)
            .and_then(|m| m["id"].as_str())
            .unwrap()
            .to_string()
    };
    let ann_member = member_id(&ann.id);
    let bob_member = member_id(&bob.id);

    let (status, body) = app
        .patch(&format!("/api/members/{ann_member}"), &ann, json!({ "role": "MEMBER" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = app.delete(&format!("/api/members/{ann_member}"), &ann).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A plain member cannot change roles.
    let (status, _) = app
        .patch(&format!("/api/members/{ann_member}"), &bob, json!({ "role": "MEMBER" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Promote Bob; now Ann can step down.
    let (status, body) = app
        .patch(&format!("/api/members/{bob_member}"), &ann, json!({ "role": "ADMIN" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "ADMIN");
    let (status, _) = app
        .patch(&format!("/api/members/{ann_member}"), &ann, json!({ "role": "MEMBER" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_member_can_leave_but_not_remove_others() {
    let app = TestApp::new();
    let ann = app.register("Ann", "ann@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let cat = app.register("Cat", "cat@example.com").await;
    let (ws, code) = app.workspace(&ann, "Acme").await;
    app.join(&bob, &ws, &code).await;
    app.join(&cat, &ws, &code).await;

    let (_, body) = app.get(&format!("/api/workspaces/{ws}/members"), &ann).await;
    let members = body["data"].as_array().unwrap().clone();
    let id_of = |user_id: &str| {
        members
            .iter()
            .find(|m| m["user_id"] == user_id)
            .and_then(|m| m["id"].as_str())
            .unwrap()
            .to_string()
    };

    let (status, _) = app.delete(&format!("/api/members/{}", id_of(&cat.id)), &bob).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&format!("/api/members/{}", id_of(&bob.id)), &bob).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/workspaces/{ws}"), &bob).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_workspace_name_is_validated() {
    let app = TestApp::new();
    let ann = app.register("Ann", "ann@example.com").await;
    let (status, _) = app.post("/api/workspaces", &ann, json!({ "name": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post("/api/workspaces", &ann, json!({ "name": "x".repeat(101) }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
