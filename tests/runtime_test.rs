use s3_notify_runtime::{
    DecodedEvent, Handler, InvocationContext, MemorySink, NoopProcessor, Runtime, RuntimeConfig,
    RuntimeError, S3EventHandler, S3SnsEventHandler,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

const NEXT_PATH: &str = "/2018-06-01/runtime/invocation/next";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";

fn response_path(id: &str) -> String {
    format!("/2018-06-01/runtime/invocation/{}/response", id)
}

fn error_path(id: &str) -> String {
    format!("/2018-06-01/runtime/invocation/{}/error", id)
}

fn invocation(id: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header(REQUEST_ID_HEADER, id)
        .set_body_string(body)
}

fn runtime<H: Handler>(server: &MockServer, handler: H, sink: &MemorySink) -> Runtime<H> {
    Runtime::builder(handler)
        .config(RuntimeConfig::new(server.uri()))
        .logger(Arc::new(sink.clone()))
        .build()
        .unwrap()
}

fn summaries(sink: &MemorySink) -> Vec<String> {
    sink.lines()
        .into_iter()
        .filter(|l| l.starts_with("S3 Event |"))
        .collect()
}

/// Hands out a different poll response on each call, repeating the last one.
struct Sequence {
    calls: AtomicUsize,
    responses: Vec<ResponseTemplate>,
}

impl Sequence {
    fn new(responses: Vec<ResponseTemplate>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            responses,
        }
    }
}

impl Respond for Sequence {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses[n.min(self.responses.len() - 1)].clone()
    }
}

// ---------------------------------------------------------------------------
// Success path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_direct_event_is_logged_and_reported_with_null_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(NEXT_PATH))
        .respond_with(invocation(
            "req-1",
            r#"{"Records":[{"eventName":"ObjectCreated:Put","s3":{"bucket":{"name":"my-bucket"},"object":{"key":"a%20b.txt","size":42}}}]}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(response_path("req-1")))
        .and(header("Content-Type", "application/json"))
        .and(body_string("null"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(error_path("req-1")))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let rt = runtime(&server, S3EventHandler::new(NoopProcessor), &sink);

    let done = rt.run_once().await.unwrap();

    assert!(done.outcome.is_success());
    assert!(done.delivered);
    let lines = summaries(&sink);
    assert_eq!(lines.len(), 1);
    for expected in ["ObjectCreated:Put", "my-bucket", "a%20b.txt", "42"] {
        assert!(lines[0].contains(expected), "{} missing from {}", expected, lines[0]);
    }
}

#[tokio::test]
async fn test_relayed_event_with_empty_inner_records_succeeds() {
    let server = MockServer::start().await;

    let payload = json!({
        "Records": [{
            "EventSource": "aws:sns",
            "Sns": {"MessageId": "msg-1", "Message": "{\"Records\":[]}"}
        }]
    });

    Mock::given(method("GET"))
        .and(path(NEXT_PATH))
        .respond_with(invocation("req-2", &payload.to_string()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(response_path("req-2")))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let rt = runtime(&server, S3SnsEventHandler::new(NoopProcessor), &sink);

    let done = rt.run_once().await.unwrap();

    assert!(done.outcome.is_success());
    assert!(summaries(&sink).is_empty());
    assert!(sink.contents().contains("Processing SNS message: msg-1"));
}

#[tokio::test]
async fn test_relayed_event_logs_flattened_inner_records() {
    let server = MockServer::start().await;

    let inner = |keys: &[&str]| {
        json!({
            "Records": keys.iter().map(|k| json!({
                "eventName": "ObjectCreated:Copy",
                "s3": {"bucket": {"name": "photos"}, "object": {"key": k, "size": 1}}
            })).collect::<Vec<_>>()
        })
        .to_string()
    };
    let payload = json!({
        "Records": [
            {"Sns": {"MessageId": "a", "Message": inner(&["1.jpg", "2.jpg"])}},
            {"Sns": {"MessageId": "b", "Message": inner(&["3.jpg"])}}
        ]
    });

    Mock::given(method("GET"))
        .and(path(NEXT_PATH))
        .respond_with(invocation("req-3", &payload.to_string()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(response_path("req-3")))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let rt = runtime(&server, S3SnsEventHandler::new(NoopProcessor), &sink);

    rt.run_once().await.unwrap();

    assert_eq!(summaries(&sink).len(), 3);
}

// ---------------------------------------------------------------------------
// Failure path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_key_reports_single_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(NEXT_PATH))
        .respond_with(invocation(
            "req-4",
            r#"{"Records":[{"eventName":"ObjectCreated:Put","s3":{"bucket":{"name":"b"},"object":{"size":1}}}]}"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(error_path("req-4")))
        .and(header("Content-Type", "application/json"))
        .and(header("Lambda-Runtime-Function-Error-Type", "RuntimeException"))
        .and(body_json(json!({
            "errorType": "DecodeError",
            "errorMessage": "missing required field `s3.object.key`"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(response_path("req-4")))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let rt = runtime(&server, S3EventHandler::new(NoopProcessor), &sink);

    let done = rt.run_once().await.unwrap();

    assert!(!done.outcome.is_success());
    assert!(done.delivered);
}

#[tokio::test]
async fn test_invalid_json_reports_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(NEXT_PATH))
        .respond_with(invocation("req-5", "this is not json"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(error_path("req-5")))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let rt = runtime(&server, S3EventHandler::new(NoopProcessor), &sink);

    let done = rt.run_once().await.unwrap();

    let report = done.outcome.failure().unwrap();
    assert_eq!(report.error_type, "DecodeError");

    let requests = server.received_requests().await.unwrap();
    let error_request = requests
        .iter()
        .find(|r| r.url.path() == error_path("req-5"))
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&error_request.body).unwrap();
    assert_eq!(body["errorType"], "DecodeError");
}

#[tokio::test]
async fn test_relayed_inner_failure_names_the_sns_message() {
    let server = MockServer::start().await;

    let payload = json!({
        "Records": [{"Sns": {"MessageId": "msg-broken", "Message": "{\"Records\":[{}]}"}}]
    });

    Mock::given(method("GET"))
        .and(path(NEXT_PATH))
        .respond_with(invocation("req-6", &payload.to_string()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(error_path("req-6")))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let rt = runtime(&server, S3SnsEventHandler::new(NoopProcessor), &sink);

    let done = rt.run_once().await.unwrap();

    let report = done.outcome.failure().unwrap();
    assert_eq!(report.error_type, "HandlerError");
    assert!(report
        .error_message
        .starts_with("failed to process S3 event from SNS message: msg-broken"));
    assert!(report.error_message.contains("missing required field `eventName`"));
}

// ---------------------------------------------------------------------------
// Protocol problems
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_request_id_header_skips_report_and_polls_again() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(NEXT_PATH))
        .respond_with(Sequence::new(vec![
            ResponseTemplate::new(200).set_body_string("{}"),
            invocation("req-7", "{}"),
        ]))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(response_path("req-7")))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let rt = runtime(&server, S3EventHandler::new(NoopProcessor), &sink);

    let err = rt.run_once().await.unwrap_err();
    assert!(matches!(err, RuntimeError::Protocol(_)));

    let posts = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .count();
    assert_eq!(posts, 0);

    let done = rt.run_once().await.unwrap();
    assert_eq!(done.request_id, "req-7");
}

#[tokio::test]
async fn test_non_success_poll_is_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(NEXT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let rt = runtime(&server, S3EventHandler::new(NoopProcessor), &sink);

    let err = rt.run_once().await.unwrap_err();
    assert!(matches!(err, RuntimeError::Protocol(_)));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_rejected_report_is_logged_not_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(NEXT_PATH))
        .respond_with(Sequence::new(vec![
            invocation("req-8", "{}"),
            invocation("req-9", "{}"),
        ]))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let rt = runtime(&server, S3EventHandler::new(NoopProcessor), &sink);

    let first = rt.run_once().await.unwrap();
    let second = rt.run_once().await.unwrap();

    assert!(!first.delivered);
    assert!(first.outcome.is_success());
    assert_eq!(second.request_id, "req-9");
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CapturingHandler {
    seen: Mutex<Vec<(String, String, bool)>>,
}

#[async_trait::async_trait]
impl Handler for CapturingHandler {
    async fn handle(&self, _event: DecodedEvent, ctx: &InvocationContext) -> s3_notify_runtime::Result<()> {
        self.seen.lock().unwrap().push((
            ctx.request_id().to_string(),
            ctx.invoked_function_arn().to_string(),
            ctx.deadline().is_some(),
        ));
        Ok(())
    }
}

#[tokio::test]
async fn test_context_is_built_from_poll_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(NEXT_PATH))
        .respond_with(
            invocation("req-10", "{}")
                .insert_header("Lambda-Runtime-Invoked-Function-Arn", "arn:aws:lambda:us-east-1:1:function:f")
                .insert_header("Lambda-Runtime-Deadline-Ms", "1893456000000"),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(response_path("req-10")))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let handler = Arc::new(CapturingHandler::default());
    let sink = MemorySink::new();
    let rt = runtime(&server, handler.clone(), &sink);

    rt.run_once().await.unwrap();

    let seen = handler.seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![(
            "req-10".to_string(),
            "arn:aws:lambda:us-east-1:1:function:f".to_string(),
            true
        )]
    );
}
