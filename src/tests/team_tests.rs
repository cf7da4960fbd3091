use super::{bearer, TestContext};
use crate::models::Id;
use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{json, Value};

#[actix_rt::test]
async fn team_roles_gate_project_access() {
    let ctx = TestContext::new();
    let (alice_id, alice) = ctx.user("alice").await;
    let (bob_id, bob) = ctx.user("bob").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "P", "isPrivate": true }))
        .to_request();
    let project: Value = test::call_and_read_body_json(&app, req).await;
    let p1 = project["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/teams")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "T1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let team: Value = test::read_body_json(resp).await;
    let t1 = team["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/teams/{}/members", t1))
        .insert_header(bearer(&alice))
        .set_json(json!({ "userId": bob_id.to_string(), "role": "viewer" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/api/teams/{}/projects", t1))
        .insert_header(bearer(&alice))
        .set_json(json!({ "projectId": p1 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // Viewer: read yes, write no
    let req = test::TestRequest::get()
        .uri(&format!("/api/projects/{}", p1))
        .insert_header(bearer(&bob))
        .to_request();
    let seen: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(seen["teamId"], t1.as_str());

    let req = test::TestRequest::put()
        .uri(&format!("/api/projects/{}", p1))
        .insert_header(bearer(&bob))
        .set_json(json!({ "name": "X" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    // Viewers cannot add members either
    let req = test::TestRequest::post()
        .uri(&format!("/api/teams/{}/members", t1))
        .insert_header(bearer(&bob))
        .set_json(json!({ "userId": Id::new().to_string(), "role": "viewer" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    // Upgrade to editor: remove, then add back
    let req = test::TestRequest::delete()
        .uri(&format!("/api/teams/{}/members/{}", t1, bob_id))
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/api/teams/{}/members", t1))
        .insert_header(bearer(&alice))
        .set_json(json!({ "userId": bob_id.to_string(), "role": "editor" }))
        .to_request();
    let team: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(team["members"][0]["role"], "editor");

    let req = test::TestRequest::put()
        .uri(&format!("/api/projects/{}", p1))
        .insert_header(bearer(&bob))
        .set_json(json!({ "name": "X" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let renamed: Value = test::read_body_json(resp).await;
    assert_eq!(renamed["name"], "X");
    assert_eq!(renamed["owner"], alice_id.to_string());

    // Deleting takes ownership, not team write
    let req = test::TestRequest::delete()
        .uri(&format!("/api/projects/{}", p1))
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    // Nor may an editor move the project to another team
    let req = test::TestRequest::put()
        .uri(&format!("/api/projects/{}", p1))
        .insert_header(bearer(&bob))
        .set_json(json!({ "teamId": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&format!("/api/teams/{}/projects/{}/viewer", t1, p1))
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn membership_is_mirrored_onto_users() {
    let ctx = TestContext::new();
    let (alice_id, alice) = ctx.user("alice").await;
    let (bob_id, bob) = ctx.user("bob").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/teams")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "Crew", "description": "Friday practice" }))
        .to_request();
    let team: Value = test::call_and_read_body_json(&app, req).await;
    let team_id: Id = team["id"].as_str().unwrap().parse().unwrap();

    let alice_doc = ctx.services.identity.find_by_id(alice_id).await.unwrap();
    assert!(alice_doc.teams.contains(&team_id));

    let req = test::TestRequest::post()
        .uri(&format!("/api/teams/{}/members", team_id))
        .insert_header(bearer(&alice))
        .set_json(json!({ "userId": bob_id.to_string(), "role": "editor" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let bob_doc = ctx.services.identity.find_by_id(bob_id).await.unwrap();
    assert!(bob_doc.teams.contains(&team_id));

    // Adding twice is refused
    let req = test::TestRequest::post()
        .uri(&format!("/api/teams/{}/members", team_id))
        .insert_header(bearer(&alice))
        .set_json(json!({ "userId": bob_id.to_string(), "role": "viewer" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    // The owner can never be removed, not even by an editor
    let req = test::TestRequest::delete()
        .uri(&format!("/api/teams/{}/members/{}", team_id, alice_id))
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    // Team listing and search see the membership
    let req = test::TestRequest::get()
        .uri("/api/teams")
        .insert_header(bearer(&bob))
        .to_request();
    let teams: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(teams.len(), 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users?search=bob&teamId={}", team_id))
        .insert_header(bearer(&bob))
        .to_request();
    let found: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["username"], "bob");

    // Bob leaves on his own
    let req = test::TestRequest::delete()
        .uri(&format!("/api/teams/{}/members/{}", team_id, bob_id))
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let bob_doc = ctx.services.identity.find_by_id(bob_id).await.unwrap();
    assert!(!bob_doc.teams.contains(&team_id));

    let req = test::TestRequest::get()
        .uri(&format!("/api/teams/{}", team_id))
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn deleting_a_team_unlinks_everything() {
    let ctx = TestContext::new();
    let (alice_id, alice) = ctx.user("alice").await;
    let (bob_id, _) = ctx.user("bob").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/teams")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "Short-lived" }))
        .to_request();
    let team: Value = test::call_and_read_body_json(&app, req).await;
    let team_id: Id = team["id"].as_str().unwrap().parse().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "Shared", "teamId": team_id.to_string() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let project: Value = test::read_body_json(resp).await;
    assert_eq!(project["teamId"], team_id.to_string());
    let project_id: Id = project["id"].as_str().unwrap().parse().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/teams/{}/members", team_id))
        .insert_header(bearer(&alice))
        .set_json(json!({ "userId": bob_id.to_string(), "role": "viewer" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/teams/{}", team_id))
        .insert_header(bearer(&alice))
        .to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["projectObjects"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/teams/{}", team_id))
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let project = ctx.services.projects.get(alice_id, project_id).await.unwrap();
    assert_eq!(project.team_id, None);
    for user in [alice_id, bob_id] {
        let doc = ctx.services.identity.find_by_id(user).await.unwrap();
        assert!(!doc.teams.contains(&team_id));
    }
}

#[actix_rt::test]
async fn rejected_project_update_leaves_team_link_alone() {
    let ctx = TestContext::new();
    let (alice_id, alice) = ctx.user("alice").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "Solo" }))
        .to_request();
    let project: Value = test::call_and_read_body_json(&app, req).await;
    let project_id: Id = project["id"].as_str().unwrap().parse().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/teams")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "Crew" }))
        .to_request();
    let team: Value = test::call_and_read_body_json(&app, req).await;
    let team_id: Id = team["id"].as_str().unwrap().parse().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/projects/{}", project_id))
        .insert_header(bearer(&alice))
        .set_json(json!({ "teamId": team_id.to_string(), "name": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let stored = ctx.services.projects.get(alice_id, project_id).await.unwrap();
    assert_eq!(stored.team_id, None);
    assert_eq!(stored.name, "Solo");
    let detail = ctx.services.teams.get(alice_id, team_id).await.unwrap();
    assert!(detail.team.projects.is_empty());
}

#[actix_rt::test]
async fn null_team_id_unlinks_project() {
    let ctx = TestContext::new();
    let (alice_id, alice) = ctx.user("alice").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/teams")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "Crew" }))
        .to_request();
    let team: Value = test::call_and_read_body_json(&app, req).await;
    let team_id: Id = team["id"].as_str().unwrap().parse().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "Shared", "teamId": team_id.to_string() }))
        .to_request();
    let project: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(project["teamId"], team_id.to_string());
    let project_id: Id = project["id"].as_str().unwrap().parse().unwrap();

    // Omitting the field keeps the link
    let req = test::TestRequest::put()
        .uri(&format!("/api/projects/{}", project_id))
        .insert_header(bearer(&alice))
        .set_json(json!({ "description": "still shared" }))
        .to_request();
    let kept: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(kept["teamId"], team_id.to_string());

    let req = test::TestRequest::put()
        .uri(&format!("/api/projects/{}", project_id))
        .insert_header(bearer(&alice))
        .set_json(json!({ "teamId": null }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let unlinked: Value = test::read_body_json(resp).await;
    assert!(unlinked["teamId"].is_null());

    let stored = ctx.services.projects.get(alice_id, project_id).await.unwrap();
    assert_eq!(stored.team_id, None);
    let detail = ctx.services.teams.get(alice_id, team_id).await.unwrap();
    assert!(!detail.team.projects.contains(&project_id));
}
