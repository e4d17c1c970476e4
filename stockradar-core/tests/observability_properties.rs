//! Property tests for observability invariants.
//!
//! Uses proptest to verify:
//! 1. Edges between registered nodes are counted and queryable
//! 2. Edges touching an unknown id are rejected without mutating the graph
//! 3. Re-registering a node id never changes the node count
//! 4. Severity filtering returns exactly the matching history subset
//! 5. Every record_* call appends exactly one point, in call order
//! 6. Retention bounds the log and counts every eviction

use proptest::prelude::*;
use serde_json::json;
use stockradar_core::observability::{
    AlertManager, DataNode, LineageGraph, Metadata, MetricsCollector, Operation, OperationType,
    Retention, Severity,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Info),
        Just(Severity::Warning),
        Just(Severity::Error),
        Just(Severity::Critical),
    ]
}

fn arb_op() -> impl Strategy<Value = OperationType> {
    prop_oneof![
        Just(OperationType::Read),
        Just(OperationType::Write),
        Just(OperationType::Transform),
        Just(OperationType::Validate),
        Just(OperationType::Clean),
    ]
}

/// One metrics call: 0 = latency, 1 = quality, 2 = volume.
fn arb_record() -> impl Strategy<Value = (u8, u32)> {
    (0u8..3, 0u32..10_000)
}

fn graph_with(n: usize) -> LineageGraph {
    let mut graph = LineageGraph::new();
    for i in 0..n {
        graph.add_node(DataNode::new(format!("n{i}"), format!("node {i}"), "table"));
    }
    graph
}

// ── 1–3. Lineage ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn edges_between_registered_nodes_are_queryable(
        n in 2usize..8,
        pairs in prop::collection::vec((0usize..8, 0usize..8, arb_op()), 1..20),
    ) {
        let mut graph = graph_with(n);
        let mut expected = 0;
        for (s, t, op) in pairs {
            let (s, t) = (s % n, t % n);
            let (sid, tid) = (format!("n{s}"), format!("n{t}"));
            graph.add_edge(&sid, &tid, Operation::now(op, "prop")).unwrap();
            expected += 1;

            prop_assert_eq!(graph.edge_count(), expected);
            prop_assert!(graph.get_downstream_nodes(&sid).iter().any(|x| x.id == tid));
            prop_assert!(graph.get_upstream_nodes(&tid).iter().any(|x| x.id == sid));
        }
    }

    #[test]
    fn edges_to_unknown_ids_leave_graph_unchanged(
        n in 1usize..6,
        existing in 0usize..6,
        ghost in "[a-z]{1,6}",
        ghost_is_source in any::<bool>(),
    ) {
        let mut graph = graph_with(n);
        let known = format!("n{}", existing % n);
        let before = graph.export_graph();

        let result = if ghost_is_source {
            graph.add_edge(&ghost, &known, Operation::now(OperationType::Read, "prop"))
        } else {
            graph.add_edge(&known, &ghost, Operation::now(OperationType::Read, "prop"))
        };

        prop_assert!(result.is_err());
        prop_assert_eq!(graph.edge_count(), 0);
        prop_assert_eq!(graph.node_count(), before.nodes.len());
    }

    #[test]
    fn re_adding_ids_keeps_node_count(ids in prop::collection::vec(0usize..5, 1..30)) {
        let mut graph = LineageGraph::new();
        let mut distinct = std::collections::BTreeSet::new();
        for (round, id) in ids.into_iter().enumerate() {
            graph.add_node(DataNode::new(format!("n{id}"), format!("v{round}"), "file"));
            distinct.insert(id);
            prop_assert_eq!(graph.node_count(), distinct.len());
            let latest = graph.node(&format!("n{id}")).unwrap();
            prop_assert_eq!(&latest.name, &format!("v{round}"));
        }
    }
}

// ── 4. Alert filtering ───────────────────────────────────────────────

proptest! {
    #[test]
    fn severity_filter_is_exact_subset(
        alerts in prop::collection::vec((arb_severity(), 0u8..3), 0..30),
        wanted in arb_severity(),
    ) {
        let mut manager = AlertManager::new();
        for (i, (severity, source)) in alerts.iter().enumerate() {
            manager.trigger_alert(
                format!("alert {i}"),
                "msg",
                *severity,
                format!("src{source}"),
                Metadata::new(),
            );
        }

        let filtered = manager.get_alerts(Some(wanted), None);
        let expected: Vec<&str> = manager
            .history()
            .iter()
            .filter(|a| a.severity == wanted)
            .map(|a| a.title.as_str())
            .collect();
        let got: Vec<&str> = filtered.iter().map(|a| a.title.as_str()).collect();
        prop_assert_eq!(got, expected);

        let both = manager.get_alerts(Some(wanted), Some("src0"));
        prop_assert!(both.iter().all(|a| a.severity == wanted && a.source == "src0"));
        prop_assert_eq!(manager.get_alerts(None, None).len(), alerts.len());
    }
}

// ── 5–6. Metrics log ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn each_record_appends_one_point_in_order(calls in prop::collection::vec(arb_record(), 0..40)) {
        let mut metrics = MetricsCollector::new();
        for (i, (kind, value)) in calls.iter().enumerate() {
            match kind {
                0 => metrics.record_latency(&format!("op{i}"), *value as f64),
                1 => metrics.record_data_quality(
                    &format!("check{i}"),
                    value % 2 == 0,
                    &json!({"i": i}),
                ),
                _ => metrics.record_data_volume(&format!("src{i}"), *value as usize),
            }
            prop_assert_eq!(metrics.len(), i + 1);
        }

        let names: Vec<&str> = metrics.get_metrics().iter().map(|p| p.name.as_str()).collect();
        let expected: Vec<&str> = calls
            .iter()
            .map(|(kind, _)| match kind {
                0 => "operation_latency",
                1 => "data_quality_check",
                _ => "data_volume",
            })
            .collect();
        prop_assert_eq!(names, expected);
    }

    #[test]
    fn retention_bounds_log_and_counts_evictions(keep in 1usize..10, total in 0usize..40) {
        let mut metrics = MetricsCollector::with_retention(Retention::KeepLast(keep));
        for i in 0..total {
            metrics.record_data_volume("src", i);
        }

        prop_assert_eq!(metrics.len(), total.min(keep));
        prop_assert_eq!(metrics.evicted() as usize, total.saturating_sub(keep));
        if total > 0 {
            // The newest point always survives.
            let last = metrics.get_metrics().back().unwrap();
            prop_assert_eq!(last.value, (total - 1) as f64);
        }
    }
}
