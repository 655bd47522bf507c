//! Tests for the span consumer

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

use super::*;
use crate::data::bulk::{BulkError, BulkOperation};
use crate::domain::spans::JsonV2Encoder;

// ============================================================================
// FIXTURES
// ============================================================================

/// 2020-09-13T12:26:40Z
const TS_MICROS: u64 = 1_600_000_000_000_000;
const TS_MILLIS: u64 = 1_600_000_000_000;

#[derive(Default)]
struct RecordingTransport {
    requests: Mutex<Vec<(&'static str, Vec<BulkOperation>)>>,
    fail: AtomicBool,
}

impl RecordingTransport {
    fn failing() -> Self {
        let transport = Self::default();
        transport.fail.store(true, Ordering::SeqCst);
        transport
    }

    fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn requests(&self) -> Vec<(&'static str, Vec<BulkOperation>)> {
        self.requests.lock().unwrap().clone()
    }

    fn operations(&self) -> Vec<BulkOperation> {
        self.requests()
            .into_iter()
            .flat_map(|(_, ops)| ops)
            .collect()
    }

    fn autocomplete_operations(&self) -> Vec<BulkOperation> {
        self.operations()
            .into_iter()
            .filter(|op| op.doc_type == AUTOCOMPLETE_DOC_TYPE)
            .collect()
    }
}

#[async_trait]
impl BulkTransport for RecordingTransport {
    async fn submit(
        &self,
        tag: &'static str,
        operations: Vec<BulkOperation>,
    ) -> Result<(), BulkError> {
        self.requests.lock().unwrap().push((tag, operations));
        if self.fail.load(Ordering::SeqCst) {
            return Err(BulkError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Fails for spans whose id is `bad`
struct SelectiveFailingEncoder;

impl SpanEncoder for SelectiveFailingEncoder {
    fn encode(&self, span: &Span) -> Result<Vec<u8>, serde_json::Error> {
        if span.id == "bad" {
            return Err(serde_json::from_str::<u8>("not json").unwrap_err());
        }
        JsonV2Encoder.encode(span)
    }
}

fn search_config(keys: &[&str]) -> SearchConfig {
    SearchConfig {
        enabled: true,
        autocomplete_keys: keys.iter().map(|k| k.to_string()).collect(),
        ..SearchConfig::default()
    }
}

fn consumer_with(
    transport: Arc<RecordingTransport>,
    encoder: Arc<dyn SpanEncoder>,
    search: &SearchConfig,
) -> SpanConsumer {
    SpanConsumer::new(transport, encoder, IndexNameFormatter::default(), search)
}

fn consumer(transport: Arc<RecordingTransport>, keys: &[&str]) -> SpanConsumer {
    consumer_with(transport, Arc::new(JsonV2Encoder), &search_config(keys))
}

fn status_span(id: &str, status: &str) -> Span {
    Span::new("463ac35c9f6413ad", id)
        .with_timestamp(TS_MICROS)
        .with_tag("http.status_code", status)
}

fn parse(bytes: &[u8]) -> JsonValue {
    serde_json::from_slice(bytes).unwrap()
}

fn autocomplete_key(id: &str) -> AutocompleteKey {
    AutocompleteKey::new(TS_MILLIS, id)
}

// ============================================================================
// ACCEPT
// ============================================================================

#[tokio::test]
async fn test_accept_writes_span_and_autocomplete() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &["http.status_code"]);
    let span = status_span("a", "500");

    consumer.accept(std::slice::from_ref(&span)).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "index-span");

    let ops = &requests[0].1;
    assert_eq!(ops.len(), 2);

    assert_eq!(ops[0].index, "zipkin:span-2020-09-13");
    assert_eq!(ops[0].doc_type, "span");
    assert_eq!(ops[0].id, None);
    let mut expected = parse(&JsonV2Encoder.encode(&span).unwrap());
    expected["timestamp_millis"] = json!(TS_MILLIS);
    expected["_q"] = json!(["http.status_code", "http.status_code=500"]);
    assert_eq!(parse(&ops[0].document), expected);
    assert!(ops[0].document.starts_with(br#"{"timestamp_millis":1600000000000,"_q":["#));

    assert_eq!(ops[1].index, "zipkin:autocomplete-2020-09-13");
    assert_eq!(ops[1].doc_type, "autocomplete");
    assert_eq!(ops[1].id.as_deref(), Some("http.status_code=500"));
    assert_eq!(
        ops[1].document,
        br#"{"tagKey":"http.status_code","tagValue":"500"}"#
    );
}

#[tokio::test]
async fn test_accept_empty_skips_transport() {
    let transport = Arc::new(RecordingTransport::failing());
    let consumer = consumer(transport.clone(), &["http.status_code"]);

    consumer.accept(&[]).await.unwrap();

    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_accept_sends_one_request_per_call() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &[]);
    let spans: Vec<_> = (0..5)
        .map(|i| Span::new("t", format!("s{}", i)).with_timestamp(TS_MICROS))
        .collect();

    consumer.accept(&spans).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1.len(), 5);
}

// ============================================================================
// INDEX SELECTION
// ============================================================================

#[tokio::test]
async fn test_index_from_first_annotation_without_stored_timestamp() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &[]);
    // 2017-08-11T00:00:00Z and 2017-08-12T00:00:00Z
    let span = Span::new("t", "s")
        .with_annotation(1_502_409_600_000_000, "cs")
        .with_annotation(1_502_496_000_000_000, "cr");

    consumer.accept(&[span]).await.unwrap();

    let ops = transport.operations();
    assert_eq!(ops[0].index, "zipkin:span-2017-08-11");
    let document = parse(&ops[0].document);
    assert!(document.get("timestamp_millis").is_none());
    assert_eq!(document["_q"], json!(["cs", "cr"]));
}

#[tokio::test]
async fn test_index_from_clock_when_span_has_no_time() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &[]);
    let span = Span::new("t", "s");

    let today = IndexNameFormatter::default()
        .format_type_and_timestamp(SPAN_DOC_TYPE, crate::utils::time::now_millis());
    consumer.accept(&[span.clone()]).await.unwrap();

    let ops = transport.operations();
    // allow for the test straddling midnight UTC
    let tomorrow = IndexNameFormatter::default().format_type_and_timestamp(
        SPAN_DOC_TYPE,
        crate::utils::time::now_millis(),
    );
    assert!(ops[0].index == today || ops[0].index == tomorrow);
    assert_eq!(ops[0].document, JsonV2Encoder.encode(&span).unwrap());
}

#[tokio::test]
async fn test_custom_index_name_formatter() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = SpanConsumer::new(
        transport.clone(),
        Arc::new(JsonV2Encoder),
        IndexNameFormatter::new("traces", '.', '-'),
        &search_config(&["http.status_code"]),
    );

    consumer.accept(&[status_span("a", "200")]).await.unwrap();

    let indexes: Vec<_> = transport.operations().into_iter().map(|op| op.index).collect();
    assert_eq!(
        indexes,
        vec!["traces-span-2020.09.13", "traces-autocomplete-2020.09.13"]
    );
}

// ============================================================================
// AUTOCOMPLETE
// ============================================================================

#[tokio::test]
async fn test_duplicate_fact_suppressed_across_batches() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &["http.status_code"]);

    consumer.accept(&[status_span("a", "500")]).await.unwrap();
    consumer.accept(&[status_span("b", "500")]).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].1.len(), 2);
    assert_eq!(requests[1].1.len(), 1);
    assert_eq!(requests[1].1[0].doc_type, "span");
}

#[tokio::test]
async fn test_duplicate_fact_within_one_batch_written_once() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &["http.status_code"]);

    consumer
        .accept(&[status_span("a", "500"), status_span("b", "500"), status_span("c", "404")])
        .await
        .unwrap();

    let ids: Vec<_> = transport
        .autocomplete_operations()
        .into_iter()
        .filter_map(|op| op.id)
        .collect();
    assert_eq!(ids, vec!["http.status_code=500", "http.status_code=404"]);
}

#[tokio::test]
async fn test_same_fact_on_different_days_written_per_day() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &["http.status_code"]);
    let next_day = Span::new("t", "b")
        .with_timestamp(TS_MICROS + 86_400_000_000)
        .with_tag("http.status_code", "500");

    consumer
        .accept(&[status_span("a", "500"), next_day])
        .await
        .unwrap();

    let indexes: Vec<_> = transport
        .autocomplete_operations()
        .into_iter()
        .map(|op| op.index)
        .collect();
    assert_eq!(
        indexes,
        vec!["zipkin:autocomplete-2020-09-13", "zipkin:autocomplete-2020-09-14"]
    );
}

#[tokio::test]
async fn test_failed_batch_releases_autocomplete_keys() {
    let transport = Arc::new(RecordingTransport::failing());
    let consumer = consumer(transport.clone(), &["http.status_code"]);

    let result = consumer.accept(&[status_span("a", "500")]).await;
    assert!(matches!(
        result,
        Err(IndexError::Bulk(BulkError::Status { status: 503, .. }))
    ));

    transport.set_failing(false);
    consumer.accept(&[status_span("b", "500")]).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    let retried: Vec<_> = requests[1]
        .1
        .iter()
        .filter(|op| op.doc_type == "autocomplete")
        .collect();
    assert_eq!(retried.len(), 1);
    assert_eq!(retried[0].id.as_deref(), Some("http.status_code=500"));
}

#[tokio::test]
async fn test_failed_batch_keeps_earlier_acceptances() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &["http.status_code"]);

    consumer.accept(&[status_span("a", "500")]).await.unwrap();

    transport.set_failing(true);
    assert!(consumer.accept(&[status_span("b", "500")]).await.is_err());

    // the failed batch never took the key, so it must not release it
    assert!(!consumer.limiter().should_invoke(&autocomplete_key("http.status_code=500")));
}

#[tokio::test]
async fn test_oversized_tag_excluded_everywhere() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &["http.url"]);
    let span = Span::new("t", "s")
        .with_timestamp(TS_MICROS)
        .with_tag("http.url", "x".repeat(300));

    consumer.accept(&[span]).await.unwrap();

    let ops = transport.operations();
    assert_eq!(ops.len(), 1);
    assert_eq!(parse(&ops[0].document)["_q"], json!([]));
}

#[tokio::test]
async fn test_non_whitelisted_tag_only_in_query() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &["environment"]);
    let span = Span::new("t", "s")
        .with_timestamp(TS_MICROS)
        .with_tag("http.method", "GET");

    consumer.accept(&[span]).await.unwrap();

    let ops = transport.operations();
    assert_eq!(ops.len(), 1);
    assert_eq!(
        parse(&ops[0].document)["_q"],
        json!(["http.method", "http.method=GET"])
    );
    assert!(consumer.limiter().should_invoke(&autocomplete_key("http.method=GET")));
}

#[tokio::test]
async fn test_search_disabled_writes_canonical_only() {
    let transport = Arc::new(RecordingTransport::default());
    let search = SearchConfig {
        enabled: false,
        ..search_config(&["http.status_code"])
    };
    let consumer = consumer_with(transport.clone(), Arc::new(JsonV2Encoder), &search);
    let span = status_span("a", "500");

    consumer.accept(std::slice::from_ref(&span)).await.unwrap();

    let ops = transport.operations();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].document, JsonV2Encoder.encode(&span).unwrap());
    assert!(consumer.limiter().should_invoke(&autocomplete_key("http.status_code=500")));
}

// ============================================================================
// ENCODING FAILURES
// ============================================================================

#[tokio::test]
async fn test_encode_failure_aborts_batch_and_releases_keys() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer_with(
        transport.clone(),
        Arc::new(SelectiveFailingEncoder),
        &search_config(&["http.status_code"]),
    );

    let result = consumer
        .accept(&[status_span("good", "500"), status_span("bad", "404")])
        .await;

    assert!(matches!(result, Err(IndexError::Encode(_))));
    assert!(transport.requests().is_empty());
    assert!(consumer.limiter().should_invoke(&autocomplete_key("http.status_code=500")));
}

#[test]
fn test_prepare_stages_without_submitting() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &["http.status_code"]);

    let batch = consumer
        .prepare(&[status_span("a", "500"), status_span("b", "500")])
        .unwrap();

    assert_eq!(batch.span_count(), 2);
    assert_eq!(batch.autocomplete_count(), 1);
    assert!(transport.requests().is_empty());
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test]
async fn test_concurrent_accepts_write_fact_once() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = consumer(transport.clone(), &["http.status_code"]);
    let first = [status_span("a", "500")];
    let second = [status_span("b", "500")];

    let (r1, r2) = tokio::join!(consumer.accept(&first), consumer.accept(&second));
    r1.unwrap();
    r2.unwrap();

    assert_eq!(transport.requests().len(), 2);
    assert_eq!(transport.autocomplete_operations().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_tasks_write_fact_once() {
    let transport = Arc::new(RecordingTransport::default());
    let consumer = Arc::new(consumer(transport.clone(), &["http.status_code"]));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let consumer = consumer.clone();
            tokio::spawn(async move {
                consumer
                    .accept(&[status_span(&format!("s{}", i), "500")])
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(transport.requests().len(), 16);
    assert_eq!(transport.autocomplete_operations().len(), 1);
}
