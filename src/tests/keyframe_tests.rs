use super::{bearer, TestContext};
use crate::models::Id;
use actix_web::http::StatusCode;
use actix_web::test;
use futures::future::join_all;
use serde_json::{json, Value};

#[actix_rt::test]
async fn element_keyframes_merge_per_element() {
    let ctx = TestContext::new();
    let (_, alice) = ctx.user("alice").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "P" }))
        .to_request();
    let project: Value = test::call_and_read_body_json(&app, req).await;
    let p1 = project["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/direct-keyframes/{}", p1))
        .insert_header(bearer(&alice))
        .set_json(json!({ "elementId": "e1", "keyframes": [1, 2, 3] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["updated"]["elementId"], "e1");
    assert_eq!(body["updated"]["keyframeCount"], 3);
    assert_eq!(body["verification"]["totalKeyframes"], 3);

    let req = test::TestRequest::post()
        .uri(&format!("/api/direct-keyframes/{}", p1))
        .insert_header(bearer(&alice))
        .set_json(json!({ "elementId": "e2", "keyframes": [9] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["verification"]["totalKeyframes"], 4);

    let req = test::TestRequest::get()
        .uri(&format!("/api/projects/{}", p1))
        .insert_header(bearer(&alice))
        .to_request();
    let project: Value = test::call_and_read_body_json(&app, req).await;
    let stored: Value = serde_json::from_str(project["keyframesJson"].as_str().unwrap()).unwrap();
    assert_eq!(stored, json!({ "e1": [1, 2, 3], "e2": [9] }));

    // Replacing one element leaves the other alone
    let req = test::TestRequest::post()
        .uri(&format!("/api/direct-keyframes/{}", p1))
        .insert_header(bearer(&alice))
        .set_json(json!({ "elementId": "e1", "keyframes": [{ "t": 0.5 }] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/projects/{}", p1))
        .insert_header(bearer(&alice))
        .to_request();
    let project: Value = test::call_and_read_body_json(&app, req).await;
    let stored: Value = serde_json::from_str(project["keyframesJson"].as_str().unwrap()).unwrap();
    assert_eq!(stored, json!({ "e1": [{ "t": 0.5 }], "e2": [9] }));
}

#[actix_rt::test]
async fn merge_needs_write_access() {
    let ctx = TestContext::new();
    let (_, alice) = ctx.user("alice").await;
    let (_, bob) = ctx.user("bob").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "Public but mine" }))
        .to_request();
    let project: Value = test::call_and_read_body_json(&app, req).await;
    let id = project["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/direct-keyframes/{}", id))
        .insert_header(bearer(&bob))
        .set_json(json!({ "elementId": "e1", "keyframes": [1] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/api/direct-keyframes/{}", id))
        .insert_header(bearer(&alice))
        .set_json(json!({ "elementId": "", "keyframes": [1] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri(&format!("/api/direct-keyframes/{}", id))
        .insert_header(bearer(&alice))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn concurrent_merges_keep_every_element() {
    let ctx = TestContext::new();
    let (alice_id, _) = ctx.user("alice").await;

    let project = ctx
        .services
        .projects
        .create(
            alice_id,
            serde_json::from_value(json!({ "name": "Busy" })).unwrap(),
        )
        .await
        .unwrap();

    let project_id = project.id;
    let projects = &ctx.services.projects;
    let merges = (0..8).map(|i| {
        let element = format!("e{}", i);
        async move {
            projects
                .update_element_keyframes(alice_id, project_id, &element, vec![json!(i)])
                .await
        }
    });
    for result in join_all(merges).await {
        assert!(result.is_ok());
    }

    let stored = ctx.services.projects.get(alice_id, project_id).await.unwrap();
    let map: Value = serde_json::from_str(&stored.keyframes_json).unwrap();
    assert_eq!(map.as_object().unwrap().len(), 8);
}

#[actix_rt::test]
async fn keyframe_documents_stay_in_sync_with_project() {
    let ctx = TestContext::new();
    let (alice_id, alice) = ctx.user("alice").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(bearer(&alice))
        .set_json(json!({ "name": "Turns" }))
        .to_request();
    let project: Value = test::call_and_read_body_json(&app, req).await;
    let project_id: Id = project["id"].as_str().unwrap().parse().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/direct-keyframes")
        .insert_header(bearer(&alice))
        .set_json(json!({
            "projectId": project_id.to_string(),
            "timestamp": 1.5,
            "label": "intro",
            "poseData": { "joints": [] }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let keyframe: Value = test::read_body_json(resp).await;
    let keyframe_id = keyframe["id"].as_str().unwrap().to_string();

    let stored = ctx.services.projects.get(alice_id, project_id).await.unwrap();
    assert_eq!(stored.keyframes.len(), 1);
    assert_eq!(stored.keyframes[0].label, "intro");

    let req = test::TestRequest::get()
        .uri(&format!("/api/direct-keyframes/project/{}", project_id))
        .insert_header(bearer(&alice))
        .to_request();
    let listed: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.len(), 1);

    let req = test::TestRequest::put()
        .uri(&format!("/api/direct-keyframes/{}", keyframe_id))
        .insert_header(bearer(&alice))
        .set_json(json!({ "label": "outro" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["label"], "outro");
    let stored = ctx.services.projects.get(alice_id, project_id).await.unwrap();
    assert_eq!(stored.keyframes[0].label, "outro");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/direct-keyframes/{}", keyframe_id))
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let stored = ctx.services.projects.get(alice_id, project_id).await.unwrap();
    assert!(stored.keyframes.is_empty());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/direct-keyframes/{}", keyframe_id))
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
