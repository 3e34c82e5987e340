use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use hcm_core::prelude::*;

async fn response_parts(resp: impl IntoResponse) -> (StatusCode, serde_json::Value) {
    let resp = resp.into_response();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn invalid_parameter_envelope() {
    let err = ApiError::invalid_parameter("page.limit is required");
    assert_eq!(err.to_string(), "code: 2000000, message: page.limit is required");

    let (status, body) = response_parts(err).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 2000000);
    assert_eq!(body["message"], "page.limit is required");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn not_found_envelope() {
    let (status, body) = response_parts(ApiError::not_found("security group not found")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], ErrorCode::RecordNotFound.as_i32());
}

#[tokio::test]
async fn ok_envelope_carries_data() {
    let resp = BaseResp::ok(serde_json::json!({"count": 0, "details": [{"id": "7"}]}));
    let (status, body) = response_parts(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["message"], "");
    assert_eq!(body["data"]["details"][0]["id"], "7");
}

#[test]
fn envelope_round_trips_into_result() {
    let raw = r#"{"code":2000002,"message":"record not found"}"#;
    let resp: BaseResp<serde_json::Value> = serde_json::from_str(raw).unwrap();
    let err = resp.into_result().unwrap_err();
    assert_eq!(err.code, ErrorCode::RecordNotFound);

    let ok: BaseResp<u32> = serde_json::from_str(r#"{"code":0,"data":3}"#).unwrap();
    assert_eq!(ok.into_result().unwrap(), Some(3));
}

#[test]
fn unknown_codes_collapse_to_unknown() {
    assert_eq!(ErrorCode::from_i32(42), ErrorCode::Unknown);
    assert_eq!(ErrorCode::Unknown.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
