use super::{bearer, TestContext};
use actix_web::http::{header, StatusCode};
use actix_web::test;
use serde_json::Value;

const BOUNDARY: &str = "dance-flow-test-boundary";

// (field name, filename, content); a missing filename makes a plain text field
fn multipart(parts: &[(&str, Option<&str>, &str)]) -> (String, String) {
    let mut body = String::new();
    for (name, filename, content) in parts {
        body.push_str(&format!("--{}\r\n", BOUNDARY));
        match filename {
            Some(filename) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                name, filename
            )),
            None => body.push_str(&format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

#[actix_rt::test]
async fn video_uploads_are_whitelisted() {
    let ctx = TestContext::new();
    let (_, alice) = ctx.user("alice").await;
    let app = test_app!(ctx);

    let (content_type, body) = multipart(&[("video", Some("routine.MP4"), "fake video")]);
    let req = test::TestRequest::post()
        .uri("/api/upload/video")
        .insert_header(bearer(&alice))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let uploaded: Value = test::read_body_json(resp).await;
    assert_eq!(uploaded["success"], true);
    let filename = uploaded["filename"].as_str().unwrap();
    assert!(filename.ends_with(".mp4"));
    assert_eq!(uploaded["url"], format!("/uploads/videos/{}", filename));
    assert!(ctx.services.upload_root.join("videos").join(filename).exists());

    let (content_type, body) = multipart(&[("video", Some("notes.txt"), "not a video")]);
    let req = test::TestRequest::post()
        .uri("/api/upload/video")
        .insert_header(bearer(&alice))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn general_uploads_pick_a_directory() {
    let ctx = TestContext::new();
    let (_, alice) = ctx.user("alice").await;
    let app = test_app!(ctx);

    let (content_type, body) = multipart(&[("file", Some("beat.mp3"), "fake audio")]);
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header(bearer(&alice))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let uploaded: Value = test::call_and_read_body_json(&app, req).await;
    assert!(uploaded["url"].as_str().unwrap().starts_with("/uploads/audio/"));

    let (content_type, body) = multipart(&[("file", Some("script.exe"), "nope")]);
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header(bearer(&alice))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let (content_type, body) = multipart(&[("other", Some("beat.mp3"), "misnamed field")]);
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header(bearer(&alice))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn model_lifecycle() {
    let ctx = TestContext::new();
    let (_, alice) = ctx.user("alice").await;
    let (_, bob) = ctx.user("bob").await;
    let app = test_app!(ctx);

    let (content_type, body) = multipart(&[
        ("model", Some("lead.glb"), "glTF binary"),
        ("name", None, "Lead dancer"),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/models/upload")
        .insert_header(bearer(&alice))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let model: Value = test::read_body_json(resp).await;
    assert_eq!(model["name"], "Lead dancer");
    assert_eq!(model["originalName"], "lead.glb");
    let id = model["id"].as_str().unwrap().to_string();
    let filename = model["filename"].as_str().unwrap().to_string();
    assert_eq!(model["url"], format!("/api/models/file/{}", filename));

    // The advertised url is served, without a token
    let req = test::TestRequest::get()
        .uri(model["url"].as_str().unwrap())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "model/gltf-binary");
    assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "public, max-age=3600");
    let bytes = test::read_body(resp).await;
    assert_eq!(&bytes[..], b"glTF binary");

    // Metadata is owner-only
    let req = test::TestRequest::get()
        .uri(&format!("/api/models/{}", id))
        .insert_header(bearer(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/models")
        .insert_header(bearer(&bob))
        .to_request();
    let listed: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(listed.is_empty());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/models/{}", id))
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/models/file/{}", filename))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn models_must_be_glb() {
    let ctx = TestContext::new();
    let (_, alice) = ctx.user("alice").await;
    let app = test_app!(ctx);

    let (content_type, body) = multipart(&[("model", Some("lead.obj"), "mesh")]);
    let req = test::TestRequest::post()
        .uri("/api/models/upload")
        .insert_header(bearer(&alice))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    // The asset travels in the "model" part
    let (content_type, body) = multipart(&[("file", Some("lead.glb"), "glTF binary")]);
    let req = test::TestRequest::post()
        .uri("/api/models/upload")
        .insert_header(bearer(&alice))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/models/file/..secret")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}
