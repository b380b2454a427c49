use httpmock::prelude::*;
use integral_calculator::api::{
  extract_detail, ApiError, IntegralBackend, IntegralClient, IntegralRequest,
  SamplePoint, GENERIC_ERROR_MESSAGE,
};
use integral_calculator::{calculate, CalculatorError, ValidationError};
use serde_json::json;

fn request(function: &str, start_x: f64, end_x: f64) -> IntegralRequest {
  IntegralRequest {
    function_string: function.to_string(),
    start_x,
    end_x,
  }
}

mod api_tests {
  use super::*;

  // ── Connectivity probe ──

  #[tokio::test]
  async fn probe_succeeds_on_2xx() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/test");
        then.status(204);
      })
      .await;

    let client = IntegralClient::new(&server.base_url()).unwrap();
    assert!(client.test_connection().await);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn probe_fails_on_server_error() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/test");
        then.status(500);
      })
      .await;

    let client = IntegralClient::new(&server.base_url()).unwrap();
    assert!(!client.test_connection().await);
  }

  #[tokio::test]
  async fn probe_fails_when_unreachable() {
    let client = IntegralClient::new("http://127.0.0.1:1").unwrap();
    assert!(!client.test_connection().await);
  }

  #[tokio::test]
  async fn trailing_slash_is_trimmed() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/test");
        then.status(200);
      })
      .await;

    let client =
      IntegralClient::new(&format!("{}/", server.base_url())).unwrap();
    assert_eq!(client.base_url(), server.base_url());
    assert!(client.test_connection().await);
    mock.assert_async().await;
  }

  // ── Calculation ──

  #[tokio::test]
  async fn calculate_posts_the_request_body() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when
          .method(POST)
          .path("/calculate-integral")
          .json_body(json!({
            "function_string": "x^2",
            "start_x": -1.0,
            "end_x": 1.0
          }));
        then.status(200).json_body(json!({
          "latex_expression": "x^{2}",
          "area": 0.6666666666666666,
          "function_points": [
            {"x": -1.0, "y": 1.0},
            {"x": 0.0, "y": 0.0},
            {"x": 1.0, "y": 1.0}
          ]
        }));
      })
      .await;

    let client = IntegralClient::new(&server.base_url()).unwrap();
    let response = client
      .calculate_integral(request("x^2", -1.0, 1.0))
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(response.latex_expression, "x^{2}");
    assert!((response.area - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(response.function_points.len(), 3);
    assert_eq!(response.function_points[1], SamplePoint { x: 0.0, y: 0.0 });
    assert_eq!(response.error, None);
  }

  #[tokio::test]
  async fn domain_error_comes_back_inside_the_response() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/calculate-integral");
        then.status(200).json_body(json!({
          "latex_expression": "\\frac{1}{x}",
          "area": 0.0,
          "function_points": [],
          "error": "Integral diverges"
        }));
      })
      .await;

    let client = IntegralClient::new(&server.base_url()).unwrap();
    let response = client
      .calculate_integral(request("1/x", -1.0, 1.0))
      .await
      .unwrap();
    assert_eq!(response.error.as_deref(), Some("Integral diverges"));
    assert!(response.function_points.is_empty());
  }

  #[tokio::test]
  async fn http_error_carries_the_detail() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/calculate-integral");
        then
          .status(400)
          .json_body(json!({"detail": "Invalid function: x^^2"}));
      })
      .await;

    let client = IntegralClient::new(&server.base_url()).unwrap();
    let err = client
      .calculate_integral(request("x^^2", 0.0, 1.0))
      .await
      .unwrap_err();

    assert_eq!(
      err,
      ApiError::Http {
        status: 400,
        detail: Some("Invalid function: x^^2".to_string()),
      }
    );
    assert_eq!(err.user_message(), "Invalid function: x^^2");
  }

  #[tokio::test]
  async fn http_error_without_detail_uses_generic_message() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/calculate-integral");
        then.status(500).body("Internal Server Error");
      })
      .await;

    let client = IntegralClient::new(&server.base_url()).unwrap();
    let err = client
      .calculate_integral(request("x", 0.0, 1.0))
      .await
      .unwrap_err();

    assert_eq!(
      err,
      ApiError::Http {
        status: 500,
        detail: None
      }
    );
    assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
  }

  #[tokio::test]
  async fn malformed_success_body_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/calculate-integral");
        then.status(200).body("not json");
      })
      .await;

    let client = IntegralClient::new(&server.base_url()).unwrap();
    let err = client
      .calculate_integral(request("x", 0.0, 1.0))
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
    assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
  }

  #[tokio::test]
  async fn unreachable_backend_is_a_network_error() {
    let client = IntegralClient::new("http://127.0.0.1:1").unwrap();
    let err = client
      .calculate_integral(request("x", 0.0, 1.0))
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
  }

  // ── One-shot calculate ──

  #[tokio::test]
  async fn invalid_input_never_reaches_the_backend() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when.method(POST).path("/calculate-integral");
        then.status(200);
      })
      .await;

    let client = IntegralClient::new(&server.base_url()).unwrap();
    let err = calculate(&client, "x^2", 1.0, 1.0).await.unwrap_err();
    assert!(matches!(
      err,
      CalculatorError::Validation(ValidationError::InvalidRange)
    ));
    let err = calculate(&client, "(x", 0.0, 1.0).await.unwrap_err();
    assert!(matches!(
      err,
      CalculatorError::Validation(ValidationError::UnbalancedParentheses)
    ));
    mock.assert_hits_async(0).await;
  }

  // ── Error body parsing ──

  #[test]
  fn detail_string_is_taken_verbatim() {
    assert_eq!(
      extract_detail(r#"{"detail": "Bad input"}"#),
      Some("Bad input".to_string())
    );
  }

  #[test]
  fn structured_detail_is_kept_as_json() {
    assert_eq!(
      extract_detail(r#"{"detail": [{"loc": ["body"], "msg": "missing"}]}"#),
      Some(r#"[{"loc":["body"],"msg":"missing"}]"#.to_string())
    );
  }

  #[test]
  fn missing_or_empty_detail_is_none() {
    assert_eq!(extract_detail(r#"{"detail": ""}"#), None);
    assert_eq!(extract_detail(r#"{"detail": null}"#), None);
    assert_eq!(extract_detail(r#"{"message": "x"}"#), None);
    assert_eq!(extract_detail("<html>"), None);
  }
}
