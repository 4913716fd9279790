use satlens_io::remote::{
    ClientConfig, Credentials, Polygon, ProcessClient, RemoteError, TileRequest, TimeRange,
};
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tile_request() -> TileRequest {
    TileRequest::true_color(
        Polygon::from_center(-49.3759, -20.8111, 0.005).unwrap(),
        TimeRange::parse("2023-01-01", "2023-01-31").unwrap(),
        4,
        2,
    )
}

fn png_payload() -> Vec<u8> {
    let pixels = (0..4 * 2 * 3).map(|v| (v * 10) as u8).collect::<Vec<_>>();
    let image = image::RgbImage::from_raw(4, 2, pixels).unwrap();
    let mut buf = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn client(server: &MockServer) -> ProcessClient {
    ProcessClient::new(ClientConfig::with_base_url(&server.uri())).unwrap()
}

async fn mount_token(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=my-id"))
        .and(body_string_contains("client_secret=my-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetch_image_success() {
    let server = MockServer::start().await;
    mount_token(&server, serde_json::json!({"access_token": "tok-123"})).await;

    let request = tile_request();
    Mock::given(method("POST"))
        .and(path("/api/v1/process"))
        .and(header("Authorization", "Bearer tok-123"))
        .and(body_json(request.to_json().unwrap()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let image = client(&server)
        .fetch_image(&request, &Credentials::new("my-id", "my-secret"))
        .await
        .unwrap();

    assert_eq!(image.width(), 4);
    assert_eq!(image.height(), 2);
    // canonical channel order is RGB
    assert_eq!(&image.as_slice()[..6], &[0, 10, 20, 30, 40, 50]);
}

#[tokio::test]
async fn missing_access_token_is_auth_error() {
    let server = MockServer::start().await;
    mount_token(&server, serde_json::json!({"token_type": "Bearer"})).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/process"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_payload()))
        .expect(0)
        .mount(&server)
        .await;

    let result = client(&server)
        .fetch_image(&tile_request(), &Credentials::new("my-id", "my-secret"))
        .await;

    assert!(matches!(result, Err(RemoteError::Auth(_))));
}

#[tokio::test]
async fn rejected_credentials_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "invalid_client"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/process"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = client(&server)
        .fetch_image(&tile_request(), &Credentials::new("my-id", "wrong"))
        .await;

    match result {
        Err(RemoteError::Auth(message)) => assert!(message.contains("401")),
        other => panic!("expected an auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_token_response_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .fetch_image(&tile_request(), &Credentials::new("my-id", "my-secret"))
        .await;

    assert!(matches!(result, Err(RemoteError::Auth(_))));
}

#[tokio::test]
async fn bad_request_is_remote_fetch_error() {
    let server = MockServer::start().await;
    mount_token(&server, serde_json::json!({"access_token": "tok-123"})).await;

    let error_body = serde_json::json!({
        "error": {"status": 400, "reason": "Bad Request", "message": "Invalid evalscript"}
    });
    Mock::given(method("POST"))
        .and(path("/api/v1/process"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .fetch_image(&tile_request(), &Credentials::new("my-id", "my-secret"))
        .await;

    match result {
        Err(RemoteError::RemoteFetch { status, payload }) => {
            assert_eq!(status, 400);
            assert!(payload.contains("Invalid evalscript"));
        }
        other => panic!("expected a remote fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_payload_is_decode_error() {
    let server = MockServer::start().await;
    mount_token(&server, serde_json::json!({"access_token": "tok-123"})).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/process"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not an image"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .fetch_image(&tile_request(), &Credentials::new("my-id", "my-secret"))
        .await;

    assert!(matches!(result, Err(RemoteError::Decode(_))));
}

#[tokio::test]
async fn invalid_request_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut request = tile_request();
    request.width = 0;

    let result = client(&server)
        .fetch_image(&request, &Credentials::new("my-id", "my-secret"))
        .await;

    assert!(matches!(result, Err(RemoteError::InvalidRequest(_))));
}
