//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> 调度器 -> session 的端到端测试
//! - 延迟派发性质测试 (FIFO、延迟区间、恰好一次)

#[cfg(test)]
mod contract_tests {
    use contracts::{DispatchBlueprint, SchedulerConfig, ShutdownPolicy};
    use std::time::Duration;

    #[test]
    fn test_default_blueprint_snapshot() {
        let bp = DispatchBlueprint::default();
        assert_eq!(bp.version, contracts::ConfigVersion::V1);
        assert_eq!(bp.scheduler.delay_threshold(), Duration::from_millis(5000));
        assert_eq!(bp.scheduler.tick_interval(), bp.scheduler.delay_threshold());
        assert_eq!(bp.scheduler.shutdown_policy, ShutdownPolicy::Drain);
        assert!(bp.sessions.is_empty());
    }

    #[test]
    fn test_scheduler_config_json_shape() {
        let config = SchedulerConfig {
            delay_threshold_ms: 1200,
            tick_interval_ms: None,
            shutdown_policy: ShutdownPolicy::Retain,
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["delay_threshold_ms"], 1200);
        assert_eq!(json["shutdown_policy"], "retain");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::net::UdpSocket;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ControlMessage, SharedSession, ShutdownPolicy};
    use dispatcher::{
        create_sessions, ChannelSession, Clock, DelayedDispatcher, DispatcherBuilder,
        EnqueueOutcome, SystemClock,
    };

    /// End-to-end test: TOML config -> sessions -> DelayedDispatcher -> UDP peer
    ///
    /// 验证完整的数据流：
    /// 1. ConfigLoader 解析并校验配置
    /// 2. create_sessions 创建 log / udp session
    /// 3. 调度器在阈值之后把消息送到对端
    #[tokio::test]
    async fn test_e2e_config_to_udp_peer() {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        peer.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let addr = peer.local_addr().unwrap();

        let toml = format!(
            r#"
[scheduler]
delay_threshold_ms = 40
shutdown_policy = "drain"

[[sessions]]
id = "log"

[[sessions]]
id = "peer"
kind = "udp"
params = {{ addr = "{addr}" }}

[sessions.contact]
id = "peer@example.com"
presence = "online"
"#
        );
        let bp = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let sessions = create_sessions(&bp.sessions).await.unwrap();
        assert_eq!(sessions[1].endpoint().unwrap().id, "peer@example.com");

        let mut dispatcher =
            DelayedDispatcher::<ControlMessage>::spawn(bp.scheduler.clone()).unwrap();
        let started = std::time::Instant::now();

        dispatcher.submit(Arc::clone(&sessions[0]), ControlMessage::new(1, "text/plain", "hello"));
        dispatcher.submit(Arc::clone(&sessions[1]), ControlMessage::new(2, "text/plain", "INVITE"));

        let received = tokio::task::spawn_blocking(move || {
            let mut buf = [0u8; 64];
            let n = peer.recv(&mut buf).unwrap();
            buf[..n].to_vec()
        })
        .await
        .unwrap();
        assert_eq!(received, b"INVITE");
        assert!(started.elapsed() >= Duration::from_millis(40));

        let report = dispatcher.shutdown(bp.scheduler.shutdown_policy).await.unwrap();
        assert_eq!(report.metrics.dispatched_count, 2);
        assert_eq!(report.metrics.failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_retained_entries_survive_shutdown() {
        let bp = ConfigLoader::load_from_str(
            r#"
[scheduler]
delay_threshold_ms = 1000
shutdown_policy = "retain"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let mut dispatcher = DispatcherBuilder::new(bp.scheduler.clone())
            .with_clock(Arc::clone(&clock))
            .build::<String>()
            .unwrap();
        let (session, mut rx) = ChannelSession::with_clock("peer", Arc::clone(&clock));
        let session: SharedSession<String> = Arc::new(session);

        dispatcher.submit(Arc::clone(&session), "early".to_string());
        tokio::time::sleep(Duration::from_millis(600)).await;
        dispatcher.submit(Arc::clone(&session), "late".to_string());

        let report = dispatcher.shutdown_default().await.unwrap();
        assert_eq!(report.policy, ShutdownPolicy::Retain);
        assert_eq!(report.pending, 2);
        assert_eq!(
            dispatcher.submit(session, "after".to_string()),
            EnqueueOutcome::Ignored(dispatcher::IgnoreReason::Stopped)
        );

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(dispatcher.drain_due().unwrap().dispatched, 1);
        assert_eq!(rx.try_recv().unwrap().message, "early");
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(dispatcher.drain_due().unwrap().dispatched, 1);
        assert_eq!(rx.try_recv().unwrap().message, "late");
    }
}

#[cfg(test)]
mod property_tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use contracts::{SchedulerConfig, SessionId, SharedSession, ShutdownPolicy};
    use dispatcher::{ChannelSession, Clock, DispatcherBuilder, SystemClock};
    use observability::LatencyAggregator;
    use tokio::sync::mpsc;

    /// Interleave several producers over several sessions and check, for
    /// every delivered message, the latency window and global FIFO order.
    #[tokio::test(start_paused = true)]
    async fn test_latency_window_and_fifo_under_interleaving() {
        let threshold = Duration::from_millis(500);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let mut dispatcher = DispatcherBuilder::new(SchedulerConfig::with_threshold(threshold))
            .with_clock(Arc::clone(&clock))
            .build::<(usize, u32)>()
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let sessions: Vec<SharedSession<(usize, u32)>> = ["a", "b", "c"]
            .into_iter()
            .map(|id| -> SharedSession<(usize, u32)> {
                Arc::new(ChannelSession::from_sender(id, tx.clone(), Arc::clone(&clock)))
            })
            .collect();

        // (producer, index) -> enqueue time; order of acceptance across producers.
        let mut enqueued_at: HashMap<(usize, u32), Instant> = HashMap::new();
        let mut accepted_order = Vec::new();

        for round in 0..60u32 {
            for producer in 0..3usize {
                let key = (producer, round);
                let session = Arc::clone(&sessions[(producer + round as usize) % sessions.len()]);
                enqueued_at.insert(key, clock.now());
                assert!(dispatcher.submit(session, key).is_accepted());
                accepted_order.push(key);
            }
            tokio::time::sleep(Duration::from_millis(37)).await;
        }

        let report = dispatcher.shutdown(ShutdownPolicy::Drain).await.unwrap();
        assert_eq!(report.metrics.dispatched_count, 180);

        let mut aggregator = LatencyAggregator::new(threshold);
        let mut delivered_order = Vec::new();
        while let Ok(delivery) = rx.try_recv() {
            let latency = delivery.delivered_at - enqueued_at[&delivery.message];
            aggregator.record(&delivery.session, latency);
            delivered_order.push(delivery.message);
        }

        assert_eq!(delivered_order, accepted_order);

        let summary = aggregator.summary();
        assert_eq!(summary.total_dispatched, 180);
        assert_eq!(summary.below_threshold, 0, "{summary}");
        assert!(summary.within_bound(), "{summary}");
        assert_eq!(summary.sessions.len(), 3);
        assert!(summary
            .sessions
            .iter()
            .any(|(id, _)| *id == SessionId::new("b")));
    }

    /// Many OS threads enqueue at once; every message is sent exactly once.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_exactly_once_with_thread_producers() {
        const THREADS: u32 = 6;
        const PER_THREAD: u32 = 500;

        let mut dispatcher = DispatcherBuilder::new(SchedulerConfig::with_threshold(
            Duration::from_millis(15),
        ))
        .build::<u32>()
        .unwrap();
        let (session, mut rx) = ChannelSession::<u32>::new("sink");
        let session: SharedSession<u32> = Arc::new(session);

        let threads: Vec<_> = (0..THREADS)
            .map(|t| {
                let handle = dispatcher.handle();
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        handle.submit(Arc::clone(&session), t * PER_THREAD + i);
                        if i % 100 == 0 {
                            std::thread::sleep(Duration::from_millis(2));
                        }
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let report = dispatcher.shutdown(ShutdownPolicy::Drain).await.unwrap();
        assert_eq!(report.metrics.dispatched_count, (THREADS * PER_THREAD) as u64);
        assert_eq!(report.metrics.settled(), report.metrics.enqueued_count);

        let mut seen = vec![false; (THREADS * PER_THREAD) as usize];
        let mut per_thread_last: HashMap<u32, u32> = HashMap::new();
        while let Ok(delivery) = rx.try_recv() {
            let value = delivery.message;
            assert!(!seen[value as usize], "{value} delivered twice");
            seen[value as usize] = true;

            // Messages from one producer keep their relative order.
            let thread = value / PER_THREAD;
            if let Some(prev) = per_thread_last.insert(thread, value) {
                assert!(prev < value, "thread {thread}: {prev} before {value}");
            }
        }
        assert!(seen.into_iter().all(|s| s));
    }
}
