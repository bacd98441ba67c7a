//! # Integration Tests
//!
//! End-to-end tests across crates, driven by the in-process mock broker:
//! MockBroker -> Subscriber -> bounded queue -> WorkerPool -> MemoryStore.
//! No broker or database is needed.

#[cfg(test)]
mod contract_tests {
    use contracts::{IngestConfig, SourceAddress, DEFAULT_TOPICS};

    #[test]
    fn test_default_config_is_valid_with_memory_store() {
        let mut config = IngestConfig::default();
        config.store.kind = contracts::StoreKind::Memory;
        config_loader::validate(&config).unwrap();
        assert_eq!(config.topics.len(), DEFAULT_TOPICS.len());
    }

    #[test]
    fn test_canonical_addresses() {
        assert_eq!(SourceAddress::packet_gateway("42"), "pws_42");
        assert_eq!(SourceAddress::mesh_gateway("AA:BB"), "wirepas_AA:BB");
        assert_eq!(SourceAddress::gateway_envelope("7"), "hetic_7");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{IdentityPolicy, InboundMessage, IngestConfig};
    use dispatcher::{DispatchMetrics, MemoryStore, MessageProcessor, ShutdownReport, WorkerPool};
    use transport::{
        Backoff, MockBroker, MockClient, MockEvents, Subscriber, SubscriberHandle,
        SubscriberOptions,
    };

    const WAIT: Duration = Duration::from_secs(5);

    /// Running router against a mock broker and an in-memory store
    struct Harness {
        broker: MockBroker,
        store: Arc<MemoryStore>,
        subscriber: SubscriberHandle<MockClient, MockEvents>,
        pool: WorkerPool,
        metrics: Arc<DispatchMetrics>,
    }

    impl Harness {
        async fn start(store: MemoryStore, workers: usize) -> Self {
            Self::start_with_policy(store, workers, IdentityPolicy::default()).await
        }

        async fn start_with_policy(
            store: MemoryStore,
            workers: usize,
            policy: IdentityPolicy,
        ) -> Self {
            let broker = MockBroker::new();
            let store = Arc::new(store);

            let (queue_tx, queue_rx) = async_channel::bounded::<InboundMessage>(64);
            let processor = Arc::new(MessageProcessor::new(Arc::clone(&store), policy));
            let pool = WorkerPool::spawn(processor, queue_rx, workers);
            let metrics = Arc::clone(pool.metrics());

            let mut options = SubscriberOptions::from_config(&IngestConfig::default());
            options.backoff = Backoff::new(Duration::from_millis(5), Duration::from_millis(20));
            let (client, events) = broker.session();
            let subscriber = Subscriber::connect(client, events, options, queue_tx)
                .await
                .unwrap();

            Self {
                broker,
                store,
                subscriber,
                pool,
                metrics,
            }
        }

        /// Wait until `count` messages went through the workers
        async fn wait_processed(&self, count: u64) {
            tokio::time::timeout(WAIT, async {
                while self.metrics.processed() < count {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("messages not processed in time");
        }

        async fn shutdown(self) -> (Arc<MemoryStore>, MockBroker, ShutdownReport) {
            self.subscriber.stop().await;
            let report = self.pool.shutdown(WAIT).await;
            self.subscriber.disconnect().await.unwrap();
            (self.store, self.broker, report)
        }
    }

    #[tokio::test]
    async fn test_ruuvitag_data_sets_exactly_given_fields() {
        let h = Harness::start(MemoryStore::new(), 2).await;
        h.broker.inject(
            "sensors/ruuvitag/C4:64:E3:4A:5B:1C/data",
            r#"{"temperature": 22.5, "pressure": 1009.3, "battery": 2.9}"#,
        );
        h.broker.inject("sensor/D1:D2:D3/data", r#"{"humidity": 55.0}"#);
        h.wait_processed(2).await;
        let (store, _, _) = h.shutdown().await;

        let sensor = store.sensor("C4:64:E3:4A:5B:1C").unwrap();
        let rows = store.measurements_for("C4:64:E3:4A:5B:1C");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sensor_id, sensor.id);
        assert_eq!(rows[0].fields.temperature, Some(22.5));
        assert_eq!(rows[0].fields.pressure, Some(1009.3));
        assert_eq!(rows[0].fields.humidity, None);

        let alt = store.measurements_for("D1:D2:D3");
        assert_eq!(alt[0].fields.humidity, Some(55.0));
        assert_eq!(alt[0].fields.temperature, None);
        assert_eq!(alt[0].fields.pressure, None);
    }

    #[tokio::test]
    async fn test_identity_never_duplicated_under_concurrency() {
        let h = Harness::start(MemoryStore::with_latency(Duration::from_millis(20)), 8).await;
        for i in 0..8 {
            h.broker.inject("pws-packet/1000/5/42", format!(r#"{{"temperature": {i}.0}}"#));
        }
        // same sensor seen again later, sequentially
        h.wait_processed(8).await;
        h.broker.inject("pws-packet/1001/5/42", r#"{"humidity": 40}"#);
        h.wait_processed(9).await;
        let (store, _, _) = h.shutdown().await;

        assert_eq!(store.sensor_count(), 1);
        assert_eq!(store.upsert_calls(), 1);
        let rows = store.measurements_for("pws_42");
        assert_eq!(rows.len(), 9);
        assert!(rows.windows(2).all(|w| w[0].sensor_id == w[1].sensor_id));
    }

    #[tokio::test]
    async fn test_packet_fallback_on_malformed_json() {
        let h = Harness::start(MemoryStore::new(), 1).await;
        h.broker.inject("pws-packet/1000/5/42", r#""temp":23.5,"hum":60"#);
        h.wait_processed(1).await;
        let (store, _, _) = h.shutdown().await;

        let sensor = store.sensor("pws_42").unwrap();
        assert_eq!(sensor.display_name, "PWS Sensor 42");
        let rows = store.measurements_for("pws_42");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields.temperature, Some(23.5));
        assert_eq!(rows[0].fields.humidity, Some(60.0));
        assert_eq!(rows[0].fields.pressure, None);
    }

    #[tokio::test]
    async fn test_empty_payload_is_silent_on_every_topic() {
        let h = Harness::start(MemoryStore::new(), 2).await;
        let topics = [
            "sensors/ruuvitag/AA/data",
            "sensor/AA/data",
            "gw-event/received_data",
            "pws-packet/1/2/3",
            "wirepas-json-event/packet/1/AA/9",
        ];
        for topic in topics {
            h.broker.inject(topic, "");
        }
        h.wait_processed(topics.len() as u64).await;
        let metrics = Arc::clone(&h.metrics);
        let (store, _, _) = h.shutdown().await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.skipped, topics.len() as u64);
        assert_eq!(snapshot.errors(), 0);
        assert_eq!(store.sensor_count(), 0);
        assert_eq!(store.measurement_count(), 0);
    }

    #[tokio::test]
    async fn test_mesh_trace_options_is_a_no_op() {
        let h = Harness::start(MemoryStore::new(), 1).await;
        h.broker.inject(
            "wirepas-json-event/packet/1/AA:BB/9",
            r#"{"rssi": -60, "data": {"trace_options": {"hops": 2}, "temperature": 20.0}}"#,
        );
        h.broker.inject(
            "wirepas-json-event/packet/1/AA:BB/9",
            r#"{"rssi": -60, "data": {"temperature": 20.0}}"#,
        );
        h.wait_processed(2).await;
        let metrics = Arc::clone(&h.metrics);
        let (store, _, _) = h.shutdown().await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.skipped, 1);
        assert_eq!(snapshot.stored, 1);
        assert_eq!(snapshot.errors(), 0);
        let rows = store.measurements_for("wirepas_AA:BB");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields.rssi, Some(-60));
    }

    #[tokio::test]
    async fn test_zero_temperature_is_persisted() {
        let h = Harness::start(MemoryStore::new(), 1).await;
        h.broker.inject("sensors/ruuvitag/AA:01/data", r#"{"temperature": 0.0}"#);
        h.wait_processed(1).await;
        let (store, _, _) = h.shutdown().await;

        let rows = store.measurements_for("AA:01");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields.temperature, Some(0.0));
        assert_eq!(rows[0].fields.humidity, None);
        assert_eq!(rows[0].fields.pressure, None);
    }

    #[tokio::test]
    async fn test_gateway_envelope() {
        let h = Harness::start(MemoryStore::new(), 1).await;
        h.broker.inject(
            "gw-event/received_data",
            r#"{"source_endpoint":"7","data":{"temperature":21.0},"rx_time_ms_epoch":12345}"#,
        );
        h.wait_processed(1).await;
        let (store, _, _) = h.shutdown().await;

        let sensor = store.sensor("hetic_7").unwrap();
        let rows = store.measurements_for("hetic_7");
        assert_eq!(rows[0].sensor_id, sensor.id);
        assert_eq!(rows[0].fields.temperature, Some(21.0));
        assert_eq!(rows[0].fields.rssi, Some(12345));
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_router() {
        let store = MemoryStore::new();
        store.fail_next_appends(1);
        let h = Harness::start(store, 1).await;

        h.broker.inject("sensor/AA/data", "not json");
        h.broker.inject("sensor/AA/data", vec![0xff, 0xfe]);
        h.broker.inject("pws-packet/1/2/3", r#"["array"]"#);
        h.broker.inject("sensor/AA/data", r#"{"temperature": 19.0}"#);
        h.broker.inject("sensor/AA/data", r#"{"temperature": 19.5}"#);
        h.wait_processed(5).await;
        let metrics = Arc::clone(&h.metrics);
        let (store, _, _) = h.shutdown().await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ingestion_errors, 3);
        assert_eq!(snapshot.persistence_errors, 1);
        assert_eq!(snapshot.stored, 1);
        assert_eq!(store.measurements_for("AA")[0].fields.temperature, Some(19.5));
    }

    #[tokio::test]
    async fn test_store_outage_keeps_identities_and_recovers() {
        let h = Harness::start(MemoryStore::new(), 1).await;
        h.store.set_fail_appends(true);
        for i in 1..=3 {
            h.broker.inject(format!("pws-packet/1000/5/{i}"), r#"{"temperature": 20.0}"#);
        }
        h.wait_processed(3).await;

        h.store.set_fail_appends(false);
        h.broker.inject("pws-packet/1001/5/2", r#"{"temperature": 21.0}"#);
        h.wait_processed(4).await;
        let metrics = Arc::clone(&h.metrics);
        let (store, _, _) = h.shutdown().await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.persistence_errors, 3);
        assert_eq!(snapshot.stored, 1);

        let names: Vec<_> = store.sensors().into_iter().map(|s| s.display_name).collect();
        assert_eq!(names, ["PWS Sensor 1", "PWS Sensor 2", "PWS Sensor 3"]);
        assert_eq!(store.upsert_calls(), 3);
        let rows = store.measurements();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields.temperature, Some(21.0));
    }

    #[tokio::test]
    async fn test_reserved_and_unknown_topics_skipped() {
        let h = Harness::start(MemoryStore::new(), 1).await;
        h.broker.inject("gw-req/get_configs/res", r#"{"configs": []}"#);
        h.broker.inject("sensors/ruuvitag/AA/acceleration", "0.98");
        h.wait_processed(2).await;
        let metrics = Arc::clone(&h.metrics);
        let (store, _, _) = h.shutdown().await;

        assert_eq!(metrics.snapshot().errors(), 0);
        assert_eq!(store.measurement_count(), 0);
    }

    #[tokio::test]
    async fn test_policy_without_fields_skips_identity() {
        let h = Harness::start_with_policy(
            MemoryStore::new(),
            1,
            IdentityPolicy {
                create_without_fields: false,
            },
        )
        .await;
        h.broker.inject("pws-packet/1/2/9", r#"{"rssi": -80}"#);
        h.wait_processed(1).await;
        let (store, _, _) = h.shutdown().await;

        assert_eq!(store.sensor_count(), 0);
    }

    #[tokio::test]
    async fn test_resubscribes_and_keeps_processing_after_reconnect() {
        let h = Harness::start(MemoryStore::new(), 1).await;
        let topics = contracts::DEFAULT_TOPICS.len();
        h.broker.inject("sensor/AA/data", r#"{"temperature": 1.0}"#);
        h.wait_processed(1).await;

        h.broker.drop_connection();
        tokio::time::timeout(WAIT, async {
            while h.broker.subscriptions().len() < topics * 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("no resubscription after reconnect");

        h.broker.inject("sensor/AA/data", r#"{"temperature": 2.0}"#);
        h.wait_processed(2).await;
        let (store, broker, _) = h.shutdown().await;

        assert_eq!(broker.connect_count(), 2);
        assert_eq!(broker.subscriptions().len(), topics * 2);
        assert_eq!(store.measurements_for("AA").len(), 2);
        assert_eq!(store.sensor_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_messages() {
        let h = Harness::start(MemoryStore::with_latency(Duration::from_millis(10)), 2).await;
        for i in 0..10 {
            h.broker.inject(format!("pws-packet/1000/5/{i}"), r#"{"humidity": 50}"#);
        }
        // every message has left the broker once workers are busy
        h.wait_processed(2).await;
        let (store, broker, report) = h.shutdown().await;

        assert!(report.drained);
        assert_eq!(broker.pending(), 0);
        assert_eq!(store.measurement_count(), 10);
        assert!(broker.is_closed());
    }
}
