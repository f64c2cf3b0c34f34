//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 手动喂数的会话 e2e 测试（无需真实设备）
//! - 会话 -> 分发器 -> sink 全链路

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigVersion, OutgoingSnapshot};

    #[test]
    fn test_contracts_compile() {
        let _ = ConfigVersion::V1;
    }

    #[test]
    fn test_snapshot_wire_names() {
        let snapshot = OutgoingSnapshot {
            timestamp: 1,
            acc_x: 0,
            acc_y: 0,
            acc_z: 1000,
            ppg_green: 0,
            ppg_ir: 0,
            ppg_red: 0,
            hr: 72,
            ibi: None,
            skin_temp: 33.5,
            eda: 0.8,
            ecg: 0.0,
            spo2: None,
            bvp: None,
            respiration_rate: None,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        for key in ["accX", "ppgGreen", "skinTemp", "respirationRate"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::f64::consts::TAU;
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        ChannelKind, DataPoint, DataValue, EngineConfig, OutgoingSnapshot, SinkConfig, SinkType,
        SourceConfig, ValueKey,
    };
    use dispatcher::create_dispatcher;
    use signal_engine::{EngineError, ManualClock, Session, StartOutcome};
    use tokio::sync::mpsc;
    use tracking::MockTrackingService;

    fn fast_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.timing.snapshot_interval_ms = 10;
        config.timing.processing_interval_ms = 20;
        config.simulation.seed = Some(42);
        config
    }

    fn manual_session() -> (
        Session<MockTrackingService>,
        mpsc::Receiver<OutgoingSnapshot>,
        Arc<MockTrackingService>,
    ) {
        let service = Arc::new(MockTrackingService::manual());
        let (tx, rx) = mpsc::channel(256);
        (Session::new(fast_config(), service.clone(), tx), rx, service)
    }

    /// Poll `check` until it holds or two seconds pass
    async fn eventually<F, Fut>(mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if check().await {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .is_ok()
    }

    fn ppg_point(i: usize) -> DataPoint {
        // 4 full periods over 100 samples keeps the window mean at the DC level
        let phase = (i as f64 / 25.0 * TAU).sin();
        DataPoint::new(i as i64 * 40)
            .with(ValueKey::PpgGreen, DataValue::Float(1000.0 + 50.0 * phase))
            .with(ValueKey::PpgRed, DataValue::Float(2000.0 + 40.0 * phase))
            .with(ValueKey::PpgIr, DataValue::Float(1500.0 + 30.0 * phase))
    }

    /// 100 PPG triples fill the window, derive SpO2, and stop clears it all
    #[tokio::test]
    async fn test_e2e_ppg_window_then_stop_clears_state() {
        let (mut session, _rx, service) = manual_session();
        session.start(&[ChannelKind::Ppg]).await.unwrap();

        let feed = service.feed(ChannelKind::Ppg);
        let batch: Vec<DataPoint> = (0..100).map(ppg_point).collect();
        assert!(feed.emit(batch));

        let state = session.state();
        assert!(eventually(|| async { state.windows.fill().ppg == 100 }).await);

        // 100 of 125 meets the 0.8 fill ratio
        assert!(eventually(|| async { state.derived.load().spo2.is_some() }).await);
        let derived = state.derived.load();
        let spo2 = derived.spo2.unwrap();
        assert!((spo2 - 85.0).abs() < 1.0, "spo2 = {spo2}");
        assert!(derived.bvp.is_some());

        let latest = state.latest.snapshot();
        assert!(latest.ppg_green.is_some_and(|green| (950..=1050).contains(&green)));
        assert!(latest.has_observed(ValueKey::PpgIr));

        session.stop().await;
        assert!(state.windows.is_empty());
        assert!(state.latest.snapshot().is_empty());
        assert_eq!(state.derived.load().spo2, None);
    }

    /// A malformed point is skipped; the rest of its batch still lands
    #[tokio::test]
    async fn test_e2e_decode_error_does_not_stop_batch() {
        let (mut session, _rx, service) = manual_session();
        session.start(&[ChannelKind::Eda]).await.unwrap();

        let feed = service.feed(ChannelKind::Eda);
        assert!(feed.emit(vec![
            DataPoint::new(0).with(ValueKey::SkinConductance, DataValue::Float(1.0)),
            DataPoint::new(1),
            DataPoint::new(2).with(ValueKey::SkinConductance, DataValue::Float(3.0)),
        ]));

        let state = session.state();
        assert!(eventually(|| async { state.latest.snapshot().eda == Some(3.0) }).await);

        let metrics = session.ingestion_metrics().unwrap();
        assert_eq!(metrics.points_received, 3);
        assert_eq!(metrics.decode_errors, 1);
        assert_eq!(metrics.samples_forwarded, 2);

        session.stop().await;
    }

    /// A refused channel is reported and its fields come from the simulator
    #[tokio::test]
    async fn test_e2e_unavailable_channel_is_simulated() {
        let service = Arc::new(MockTrackingService::manual());
        service.set_unavailable(ChannelKind::SkinTemperature);
        let (tx, mut rx) = mpsc::channel(256);
        let mut session = Session::new(fast_config(), service, tx);

        let outcome = session
            .start(&[ChannelKind::HeartRate, ChannelKind::SkinTemperature])
            .await
            .unwrap();
        let StartOutcome::Started(report) = outcome else {
            panic!("session should start");
        };
        assert_eq!(report.subscribed, vec![ChannelKind::HeartRate]);
        assert_eq!(report.unavailable.len(), 1);

        let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!((30.0..=36.5).contains(&snapshot.skin_temp));
        assert!((50..=110).contains(&snapshot.hr));
        assert!(snapshot.eda >= 0.1);

        session.stop().await;
    }

    /// A disconnected service fails the start and nothing is emitted
    #[tokio::test]
    async fn test_e2e_disconnected_start_emits_nothing() {
        let service = Arc::new(MockTrackingService::synthetic(SourceConfig {
            connected: false,
            ..SourceConfig::default()
        }));
        let (tx, mut rx) = mpsc::channel(16);
        let mut session = Session::new(fast_config(), service, tx);

        let result = session.start(&ChannelKind::ALL).await;
        assert!(matches!(result, Err(EngineError::TrackingUnavailable(_))));
        assert!(!session.is_active());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    /// Starting an active session changes nothing
    #[tokio::test]
    async fn test_e2e_start_twice_is_ignored() {
        let (mut session, _rx, _service) = manual_session();

        assert!(matches!(
            session.start(&[ChannelKind::Eda]).await.unwrap(),
            StartOutcome::Started(_)
        ));
        assert_eq!(
            session.start(&ChannelKind::ALL).await.unwrap(),
            StartOutcome::AlreadyActive
        );
        assert_eq!(session.report().unwrap().subscribed, vec![ChannelKind::Eda]);

        session.stop().await;
    }

    /// Heart rate 0 means off-wrist: no snapshot goes out
    #[tokio::test]
    async fn test_e2e_off_wrist_suppresses_snapshots() {
        let (mut session, mut rx, service) = manual_session();
        session.start(&[ChannelKind::HeartRate]).await.unwrap();

        // Snapshots flow while on the wrist
        assert!(tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .is_some());

        let feed = service.feed(ChannelKind::HeartRate);
        assert!(feed.emit_one(DataPoint::new(0).with(ValueKey::HeartRate, DataValue::Int(0))));

        let state = session.state();
        assert!(eventually(|| async { state.latest.snapshot().heart_rate == Some(0) }).await);

        // Let in-flight ticks settle, then expect silence
        tokio::time::sleep(Duration::from_millis(30)).await;
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(rx.try_recv().is_err());

        // Back on the wrist
        assert!(feed.emit_one(DataPoint::new(1).with(ValueKey::HeartRate, DataValue::Int(64))));
        let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.hr, 64);

        session.stop().await;
    }

    async fn first_matching(
        rx: &mut mpsc::Receiver<OutgoingSnapshot>,
        predicate: impl Fn(&OutgoingSnapshot) -> bool,
    ) -> OutgoingSnapshot {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let snapshot = rx.recv().await.unwrap();
                if predicate(&snapshot) {
                    break snapshot;
                }
            }
        })
        .await
        .unwrap()
    }

    /// Observed values older than the threshold read as their default
    #[tokio::test]
    async fn test_e2e_stale_field_falls_back_to_default() {
        let clock = Arc::new(ManualClock::new(0));
        let service = Arc::new(MockTrackingService::manual());
        let (tx, mut rx) = mpsc::channel(256);
        let mut session = Session::new(fast_config(), service.clone(), tx).with_clock(clock.clone());
        session.start(&[ChannelKind::Eda]).await.unwrap();

        let feed = service.feed(ChannelKind::Eda);
        assert!(feed.emit_one(
            DataPoint::new(0).with(ValueKey::SkinConductance, DataValue::Float(2.5))
        ));

        let live = first_matching(&mut rx, |s| s.eda == 2.5).await;
        assert_eq!(live.timestamp, 0);

        clock.set(59_000);
        let still_live = first_matching(&mut rx, |s| s.timestamp == 59_000).await;
        assert_eq!(still_live.eda, 2.5);

        clock.set(61_000);
        let stale = first_matching(&mut rx, |s| s.timestamp == 61_000).await;
        assert_eq!(stale.eda, 0.0);

        session.stop().await;
    }

    /// Session output fanned out to a JSON-lines file through the dispatcher
    #[tokio::test]
    async fn test_e2e_session_to_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.jsonl");

        let (sink_tx, sink_rx) = mpsc::channel(64);
        let dispatcher = create_dispatcher(
            vec![
                SinkConfig {
                    name: "file".to_string(),
                    sink_type: SinkType::File,
                    queue_capacity: 64,
                    params: HashMap::from([(
                        "path".to_string(),
                        path.display().to_string(),
                    )]),
                },
                SinkConfig {
                    name: "log".to_string(),
                    sink_type: SinkType::Log,
                    queue_capacity: 64,
                    params: HashMap::from([("every".to_string(), "10".to_string())]),
                },
            ],
            sink_rx,
        )
        .await
        .unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let (mut session, mut rx, _service) = manual_session();
        session.start(&ChannelKind::ALL).await.unwrap();

        let target = 5;
        for _ in 0..target {
            let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            sink_tx.send(snapshot).await.unwrap();
        }
        session.stop().await;
        drop(sink_tx);

        let metrics = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
            .await
            .unwrap()
            .unwrap();
        assert!(metrics.iter().all(|(_, m)| m.write_count == target));

        let content = std::fs::read_to_string(&path).unwrap();
        let snapshots: Vec<OutgoingSnapshot> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(snapshots.len(), target as usize);
        assert!(snapshots.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    /// Synthetic watch drives every channel; the aggregator sees live data
    #[tokio::test]
    async fn test_e2e_synthetic_source_stats() {
        let service = Arc::new(MockTrackingService::synthetic(SourceConfig {
            seed: Some(3),
            ..SourceConfig::default()
        }));
        let (tx, mut rx) = mpsc::channel(256);
        let mut session = Session::new(fast_config(), service, tx);
        session.start(&ChannelKind::ALL).await.unwrap();

        let mut stats = observability::SnapshotStatsAggregator::new();
        for _ in 0..20 {
            let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            stats.update(&snapshot);
        }
        session.stop().await;

        let summary = stats.summary();
        assert_eq!(summary.total_snapshots, 20);
        assert!(summary.heart_rate.min > 0.0);
        assert!(session.ingestion_metrics().is_none());
    }
}

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ChannelKind, ContractError, SinkType};

    #[test]
    fn test_full_session_config_loads() {
        let toml = r#"
            outbox_capacity = 32

            [session]
            channels = ["ppg", "heart_rate", "eda"]

            [timing]
            snapshot_interval_ms = 100
            processing_interval_ms = 1000

            [simulation]
            seed = 9

            [source]
            unavailable = ["eda"]
            decode_error_every = 50

            [[sinks]]
            name = "jsonl"
            sink_type = "file"
            params = { path = "out/snapshots.jsonl" }

            [[sinks]]
            name = "companion"
            sink_type = "network"
            params = { addr = "127.0.0.1:9100", format = "json" }
        "#;

        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.outbox_capacity, 32);
        assert_eq!(blueprint.session.channels.len(), 3);
        assert_eq!(
            blueprint.live_channels().collect::<Vec<_>>(),
            vec![ChannelKind::Ppg, ChannelKind::HeartRate]
        );
        assert_eq!(blueprint.sinks[1].sink_type, SinkType::Network);
        assert_eq!(blueprint.to_engine_config().simulation.seed, Some(9));
    }

    #[test]
    fn test_network_sink_without_addr_rejected() {
        let toml = r#"
            [[sinks]]
            name = "companion"
            sink_type = "network"
        "#;

        let err = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_bad_respiration_band_rejected() {
        let toml = r#"
            [windows]
            respiration_band_hz = [0.4, 0.2]
        "#;

        let err = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap_err();
        match err {
            ContractError::ConfigValidation { field, .. } => {
                assert_eq!(field, "windows.respiration_band_hz")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
