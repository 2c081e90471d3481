use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use opsbuddy_bus::memory::InMemoryLogBus;
use opsbuddy_ingest::pb::{IngestEventRequest, LogEntry};
use opsbuddy_ingest::{IngestError, IngestionProcessor, ProductDirectory, TokenCache};

/// Directory with a fixed token table, standing in for the store.
struct StubDirectory {
    tokens: HashMap<String, i64>,
}

impl StubDirectory {
    fn with_product(token: &str, id: i64) -> Arc<Self> {
        let mut tokens = HashMap::new();
        tokens.insert(token.to_string(), id);
        Arc::new(Self { tokens })
    }
}

#[async_trait]
impl ProductDirectory for StubDirectory {
    async fn product_id_for_token(
        &self,
        token: &str,
    ) -> opsbuddy_ingest::Result<Option<i64>> {
        Ok(self.tokens.get(token).copied())
    }
}

fn processor(
    directory: Arc<StubDirectory>,
    bus: &InMemoryLogBus,
) -> IngestionProcessor {
    IngestionProcessor::new(directory, TokenCache::disabled(), Arc::new(bus.clone()))
}

fn request(auth_token: &str, service_id: &str) -> IngestEventRequest {
    IngestEventRequest {
        auth_token: auth_token.to_string(),
        service_id: service_id.to_string(),
        logs: vec![LogEntry {
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            message: "hello".to_string(),
        }],
    }
}

#[tokio::test]
async fn valid_batch_is_published_with_decimal_key() {
    let bus = InMemoryLogBus::new();
    let processor = processor(StubDirectory::with_product("AAA", 7), &bus);

    processor.process(request("AAA", "7")).await.unwrap();

    let batches = bus.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].key(), "7");
    assert_eq!(batches[0].logs.len(), 1);
    assert_eq!(batches[0].logs[0].message, "hello");
    assert_eq!(batches[0].logs[0].timestamp, "2024-01-01T00:00:00Z");
}

#[tokio::test]
async fn unknown_token_is_rejected_and_nothing_is_published() {
    let bus = InMemoryLogBus::new();
    let processor = processor(StubDirectory::with_product("AAA", 7), &bus);

    let error = processor.process(request("BBB", "7")).await.unwrap_err();

    assert!(matches!(error, IngestError::InvalidAuthToken));
    assert!(bus.batches().is_empty());
}

#[tokio::test]
async fn mismatched_service_id_is_rejected_and_nothing_is_published() {
    let bus = InMemoryLogBus::new();
    let processor = processor(StubDirectory::with_product("AAA", 7), &bus);

    let error = processor.process(request("AAA", "8")).await.unwrap_err();

    assert!(matches!(
        error,
        IngestError::ServiceIdMismatch { ref service_id } if service_id == "8"
    ));
    assert!(bus.batches().is_empty());
}

#[tokio::test]
async fn empty_batch_from_valid_product_still_succeeds() {
    let bus = InMemoryLogBus::new();
    let processor = processor(StubDirectory::with_product("AAA", 7), &bus);

    let request = IngestEventRequest {
        auth_token: "AAA".to_string(),
        service_id: "7".to_string(),
        logs: vec![],
    };

    processor.process(request).await.unwrap();
    assert_eq!(bus.batches().len(), 1);
    assert!(bus.batches()[0].logs.is_empty());
}
