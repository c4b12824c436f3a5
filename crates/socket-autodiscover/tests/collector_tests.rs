//! Tests for the raw socket metrics collector

use serde_json::Value;
use socket_autodiscover::{
    ChannelReporter, Error, Reporter, SocketCollector, collector::METRICSET,
};
use socket_monitor::{ReplayMonitor, TcpState};

mod common;
use common::*;

#[smol_potat::test]
async fn test_every_transition_reported() {
    let monitor = ReplayMonitor::from_records(vec![
        listen("nginx", 42, 8080),
        transition("nginx", 42, 8080, TcpState::SynRecv, TcpState::Established),
        transition("nginx", 42, 8080, TcpState::Established, TcpState::CloseWait),
        unlisten("nginx", 42, 8080),
    ]);
    let collector = SocketCollector::new(Box::new(monitor));
    let (reporter, events) = ChannelReporter::new();

    let reported = collector.run(&reporter).await.unwrap();
    assert_eq!(reported, 4);

    let states: Vec<(Value, Value)> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|event| {
            assert_eq!(event.metricset, METRICSET);
            (event.fields["old_state"].clone(), event.fields["new_state"].clone())
        })
        .collect();
    assert_eq!(
        states,
        vec![
            (Value::from("CLOSE"), Value::from("LISTEN")),
            (Value::from("SYN_RECV"), Value::from("ESTABLISHED")),
            (Value::from("ESTABLISHED"), Value::from("CLOSE_WAIT")),
            (Value::from("LISTEN"), Value::from("CLOSE")),
        ]
    );
}

#[smol_potat::test]
async fn test_collector_start_failure() {
    let collector = SocketCollector::new(Box::new(BrokenMonitor));
    let (reporter, _events) = ChannelReporter::new();

    assert!(matches!(
        collector.run(&reporter).await,
        Err(Error::MonitorStart(_))
    ));
}

#[smol_potat::test]
async fn test_reporter_done_stops_collection() {
    let monitor =
        ReplayMonitor::from_records(vec![listen("redis-server", 1, 6379)]).hold_open(true);
    let collector = SocketCollector::new(Box::new(monitor));
    let (reporter, events) = ChannelReporter::new();
    let done = reporter.done();

    let task = smol::spawn(async move { collector.run(&reporter).await });
    let first = events.recv().await.unwrap();
    assert_eq!(first.fields["comm"], Value::from("redis-server"));

    done.trigger();
    assert_eq!(task.await.unwrap(), 1);
}
