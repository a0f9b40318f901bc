use std::io::Cursor;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use design_backend::{create_app, AppState, Settings};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    create_app(AppState::new(Settings::default()))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_project(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/projects", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["project_id"].as_str().unwrap().to_string()
}

/// White canvas with one red block, as base64 PNG.
fn sample_png_base64() -> String {
    let mut img = RgbImage::from_pixel(80, 80, Rgb([255, 255, 255]));
    for y in 10..30 {
        for x in 10..40 {
            img.put_pixel(x, y, Rgb([220, 30, 30]));
        }
    }
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    general_purpose::STANDARD.encode(bytes)
}

#[tokio::test]
async fn test_health_and_root() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().starts_with("Welcome to"));
}

#[tokio::test]
async fn test_create_and_get_project() {
    let app = app();
    let project_id = create_project(&app).await;

    let (status, body) = send(&app, Method::GET, &format!("/projects/{}", project_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project_id"], project_id.as_str());

    let (status, body) = send(&app, Method::GET, "/projects/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_object_catalog_routes() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/objects/types", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["types"].as_array().unwrap().len(), 7);

    let (status, body) = send(&app, Method::GET, "/objects/models/sofa", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, Method::GET, "/objects/bed/002", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"]["name"], "King Bed");

    let (status, _) = send(&app, Method::GET, "/objects/models/piano", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, "/objects/bed/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_extract_regions_color_mode() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/extract/regions",
        Some(json!({ "image": sample_png_base64() })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "color");
    assert_eq!(body["total_regions"], 1);
    let region = &body["regions"][0];
    assert_eq!(region["bbox_pixels"]["x1"], 10);
    assert_eq!(region["bbox_pixels"]["y2"], 30);
    assert_eq!(region["area_pixels"], 600);
}

#[tokio::test]
async fn test_extract_regions_with_mask() {
    let app = app();
    let mut values = vec![0.0f32; 80 * 80];
    for y in 40..70 {
        for x in 40..70 {
            values[y * 80 + x] = 0.9;
        }
    }

    let (status, body) = send(
        &app,
        Method::POST,
        "/extract/regions",
        Some(json!({
            "image": sample_png_base64(),
            "masks": [{ "values": values, "width": 80, "height": 80, "score": 0.8 }],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "mask");
    assert_eq!(body["total_regions"], 1);
    assert_eq!(body["regions"][0]["mask_index"], 0);
}

#[tokio::test]
async fn test_extract_regions_rejects_bad_input() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/extract/regions",
        Some(json!({ "image": "not base64 at all!!" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("INVALID"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/extract/regions",
        Some(json!({ "image": sample_png_base64(), "config": { "max_size_ratio": 2.0 } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_CONFIG");
}

#[tokio::test]
async fn test_floorplan_editing_flow() {
    let app = app();
    let project_id = create_project(&app).await;

    let (status, _) = send(&app, Method::GET, &format!("/floorplan/{}", project_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/floorplan/construct",
        Some(json!({
            "project_id": project_id,
            "objects": [{
                "object_id": "obj_1",
                "type": "sofa",
                "model_id": "001",
                "position": { "x": 10.0, "y": 20.0 },
                "dimensions": { "x": 200.0, "y": 90.0 },
            }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["objects"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/floorplan/{}/move-object", project_id),
        Some(json!({ "object_id": "obj_1", "position": { "x": 55.0, "y": 65.0 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["objects"][0]["position"]["x"], 55.0);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/floorplan/{}/move-object", project_id),
        Some(json!({ "object_id": "ghost", "position": { "x": 1.0, "y": 1.0 } })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/floorplan/{}/change-model", project_id),
        Some(json!({ "object_id": "obj_1", "model_id": "002" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["objects"][0]["model_id"], "002");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/floorplan/{}/change-model", project_id),
        Some(json!({ "object_id": "obj_1", "model_id": "777" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "UNKNOWN_MODEL");

    let (status, body) = send(
        &app,
        Method::POST,
        "/floorplan/generate-object",
        Some(json!({ "project_id": project_id, "prompt": "a small side table" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let objects = body["objects"].as_array().unwrap();
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[1]["type"], "table");
    assert_eq!(objects[1]["model_id"], "001");

    let (status, body) = send(&app, Method::GET, &format!("/floorplan/{}", project_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["objects"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_construct_rejects_unknown_model() {
    let app = app();
    let project_id = create_project(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/floorplan/construct",
        Some(json!({
            "project_id": project_id,
            "objects": [{
                "object_id": "obj_1",
                "type": "piano",
                "model_id": "001",
                "position": { "x": 0.0, "y": 0.0 },
                "dimensions": { "x": 1.0, "y": 1.0 },
            }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "UNKNOWN_MODEL");
}

#[tokio::test]
async fn test_scene_export_and_generate() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/scene/export",
        Some(json!([{
            "id": "obj_1",
            "type": "bed",
            "model_id": "001",
            "position": { "x": 100.0, "y": 250.0 },
            "dimensions": { "x": 160.0, "y": 200.0 },
        }])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let obj = &body["unity_scene"]["objects"][0];
    assert_eq!(obj["position"]["z"], 250.0);
    assert_eq!(obj["scale"]["x"], 1.6);
    assert_eq!(obj["modelId"], "001");

    let project_id = create_project(&app).await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/scene/generate",
        Some(json!({ "project_id": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &app,
        Method::POST,
        "/floorplan/construct",
        Some(json!({
            "project_id": project_id,
            "objects": [{
                "object_id": "obj_1",
                "type": "desk",
                "model_id": "002",
                "position": { "x": 30.0, "y": 40.0 },
                "dimensions": { "x": 120.0, "y": 60.0 },
            }],
        })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/scene/generate",
        Some(json!({ "project_id": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unity_scene"]["objects"][0]["type"], "desk");

    let (_, project) = send(&app, Method::GET, &format!("/projects/{}", project_id), None).await;
    assert_eq!(project["scene_data"]["objects"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ai_routes_without_keys() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/ai/llm",
        Some(json!({ "prompt": "hi", "messages": [{ "role": "user", "content": "hi" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REQUEST");

    let (status, body) = send(&app, Method::POST, "/ai/llm", Some(json!({ "prompt": "hi" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "SERVICE_UNAVAILABLE");

    let project_id = create_project(&app).await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/floorplan/generate-base",
        Some(json!({ "project_id": project_id, "image_url": sample_png_base64() })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_extract_furniture_without_classifier_falls_back() {
    let app = app();
    let project_id = create_project(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/floorplan/extract-furniture",
        Some(json!({ "project_id": project_id, "image": sample_png_base64() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "furniture_extracted");
    assert_eq!(body["data"]["total_objects"], 1);
    assert_eq!(body["data"]["objects"][0]["type"], "other");
}

#[tokio::test]
async fn test_render_routes_without_key() {
    let app = app();
    let project_id = create_project(&app).await;

    let (status, body) = send(&app, Method::GET, &format!("/image/{}", project_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Image not generated yet");

    let (status, _) = send(
        &app,
        Method::POST,
        "/image/generate",
        Some(json!({ "project_id": "missing", "sketch_data": sample_png_base64() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/image/generate",
        Some(json!({ "project_id": project_id, "sketch_data": sample_png_base64() })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(
        &app,
        Method::POST,
        "/image/revise",
        Some(json!({ "project_id": project_id, "image_url": sample_png_base64(), "prompt": " " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REQUEST");

    let (_, project) = send(&app, Method::GET, &format!("/projects/{}", project_id), None).await;
    assert!(project["image_url"].is_null());
}

#[tokio::test]
async fn test_add_markers_requires_project_then_key() {
    let app = app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/floorplan/add-markers",
        Some(json!({ "project_id": "missing", "image_url": sample_png_base64() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let project_id = create_project(&app).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/floorplan/add-markers",
        Some(json!({ "project_id": project_id, "image_url": sample_png_base64() })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "SERVICE_UNAVAILABLE");
}
