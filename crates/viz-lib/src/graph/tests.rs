//! End-to-end tests for graph building
//!
//! These tests feed Prometheus-shaped query results through the full
//! pipeline with a fixed timestamp.

#[cfg(test)]
mod snapshot_tests {
    use crate::error::{GraphError, SampleError};
    use crate::graph::{
        assemble, build_graph, build_graph_at, normalize_samples, Annotation, GraphOptions,
        RenderMode, SamplePolicy, TrafficMetrics,
    };
    use crate::query::QueryResponse;
    use serde_json::{json, Value};
    use std::collections::BTreeSet;

    const NOW: i64 = 1_700_000_000_000;

    fn response(result: Value) -> QueryResponse {
        serde_json::from_value(json!({
            "status": "success",
            "data": {"resultType": "vector", "result": result}
        }))
        .unwrap()
    }

    fn counter(src: &str, src_ns: &str, dst: &str, code: &str, count: &str) -> Value {
        json!({
            "metric": {
                "source": src,
                "source_ns": src_ns,
                "destination": dst,
                "destination_ns": "prod",
                "response_code": code,
                "destination_port": "8080"
            },
            "value": [1700000000.0, count]
        })
    }

    fn bucket(dst: &str, code: &str, le: &str, port: &str, count: &str) -> Value {
        json!({
            "metric": {
                "source": "web",
                "source_ns": "prod",
                "destination": dst,
                "destination_ns": "prod",
                "response_code": code,
                "destination_port": port,
                "le": le
            },
            "value": [1700000000.0, count]
        })
    }

    #[test]
    fn test_unknown_source_edge() {
        let resp = response(json!([counter("", "", "checkout", "200", "5")]));
        let graph = build_graph_at(&resp, &GraphOptions::default(), NOW)
            .unwrap()
            .graph;

        let names: Vec<_> = graph.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["UNKNOWN", "checkout.prod"]);
        assert_eq!(graph.connections.len(), 1);
        assert_eq!(graph.connections[0].source, "UNKNOWN");
        assert_eq!(graph.connections[0].target, "checkout.prod");
    }

    #[test]
    fn test_counter_scenario() {
        let resp = response(json!([
            counter("a", "prod", "b", "200", "10"),
            counter("a", "prod", "b", "404", "3"),
        ]));
        let graph = build_graph_at(&resp, &GraphOptions::default(), NOW)
            .unwrap()
            .graph;

        assert_eq!(graph.connections.len(), 1);
        assert_eq!(
            graph.connections[0].metrics,
            TrafficMetrics {
                normal: 10,
                danger: 3,
                warning: 0
            }
        );
        assert_eq!(graph.max_volume, None);
    }

    #[test]
    fn test_missing_result_yields_empty_graph() {
        for body in [json!({}), json!({"data": {}}), json!({"status": "success"})] {
            let resp: QueryResponse = serde_json::from_value(body).unwrap();
            let graph = build_graph_at(&resp, &GraphOptions::default(), NOW)
                .unwrap()
                .graph;

            assert!(graph.nodes.is_empty());
            assert!(graph.connections.is_empty());
            assert_eq!(graph.max_volume, None);
            assert_eq!(graph.server_update_time, NOW);
        }
    }

    #[test]
    fn test_empty_result_yields_empty_graph() {
        let graph = build_graph_at(&response(json!([])), &GraphOptions::default(), NOW)
            .unwrap()
            .graph;

        assert!(graph.nodes.is_empty());
        assert!(graph.connections.is_empty());
        assert_eq!(graph.max_volume, None);
    }

    #[test]
    fn test_histogram_scenario() {
        let resp = response(json!([
            bucket("api", "200", "0.1", "80", "7"),
            bucket("api", "200", "0.25", "80", "12"),
            bucket("api", "200", "+Inf", "80", "12"),
        ]));
        let graph = build_graph_at(&resp, &GraphOptions::default(), NOW)
            .unwrap()
            .graph;

        let connection = &graph.connections[0];
        let annotations = connection.annotations.as_ref().unwrap();
        assert_eq!(annotations["0.1 - 0.25s"], Annotation::Count(5));
        assert_eq!(annotations["HTTP 200"], Annotation::Count(12));
        assert_eq!(connection.metrics.normal, 12);
        assert_eq!(graph.max_volume, Some(12 * 2 + 20));
    }

    #[test]
    fn test_histogram_scenario_with_inconsistent_bucket() {
        let resp = response(json!([
            bucket("api", "200", "0.1", "80", "7"),
            bucket("api", "200", "0.25", "80", "4"),
            bucket("api", "200", "+Inf", "80", "12"),
        ]));
        let graph = build_graph_at(&resp, &GraphOptions::default(), NOW)
            .unwrap()
            .graph;

        let annotations = graph.connections[0].annotations.as_ref().unwrap();
        assert!(!annotations.contains_key("0.1 - 0.25s"));
        for (key, value) in annotations {
            if key.ends_with('s') && key.contains(" - ") {
                assert!(matches!(value, Annotation::Count(n) if *n > 0));
            }
        }
    }

    #[test]
    fn test_histogram_max_volume_across_connections() {
        let resp = response(json!([
            bucket("api", "200", "+Inf", "80", "30"),
            bucket("api", "503", "+Inf", "80", "5"),
            bucket("db", "200", "+Inf", "5432", "50"),
            bucket("db", "200", "0.005", "5432", "49"),
        ]));
        let graph = build_graph_at(&resp, &GraphOptions::default(), NOW)
            .unwrap()
            .graph;

        assert_eq!(graph.connections.len(), 2);
        assert_eq!(graph.max_volume, Some(50 * 2 + 20));
    }

    #[test]
    fn test_metrics_sum_matches_classified_counts() {
        let resp = response(json!([
            bucket("api", "200", "+Inf", "80", "30"),
            bucket("api", "201", "+Inf", "80", "2"),
            bucket("api", "404", "+Inf", "80", "4"),
            bucket("api", "502", "+Inf", "80", "1"),
            bucket("api", "502", "0.5", "80", "1"),
        ]));
        let graph = build_graph_at(&resp, &GraphOptions::default(), NOW)
            .unwrap()
            .graph;

        assert_eq!(graph.connections[0].metrics.total(), 37);
    }

    #[test]
    fn test_node_set_is_union_of_identifiers() {
        let resp = response(json!([
            counter("web", "prod", "api", "200", "1"),
            counter("api", "prod", "db", "200", "1"),
            counter("web", "prod", "db", "500", "1"),
        ]));
        let graph = build_graph_at(&resp, &GraphOptions::default(), NOW)
            .unwrap()
            .graph;

        let nodes: BTreeSet<_> = graph.nodes.iter().map(|n| n.name.clone()).collect();
        let expected: BTreeSet<String> = ["web.prod", "api.prod", "db.prod"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(nodes, expected);
        assert_eq!(graph.nodes.len(), 3);
        assert!(graph.nodes.iter().all(|n| n.display_name == n.name));
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let resp = response(json!([
            bucket("api", "200", "+Inf", "80", "30"),
            bucket("db", "404", "+Inf", "5432", "3"),
            counter("", "", "api", "200", "1"),
        ]));
        let options = GraphOptions::default();

        let first = build_graph_at(&resp, &options, NOW).unwrap();
        let second = build_graph_at(&resp, &options, NOW).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_graph_uses_wall_clock() {
        let before = chrono::Utc::now().timestamp_millis();
        let graph = build_graph(&response(json!([])), &GraphOptions::default())
            .unwrap()
            .graph;
        let after = chrono::Utc::now().timestamp_millis();

        assert!(graph.server_update_time >= before);
        assert!(graph.server_update_time <= after);
    }

    #[test]
    fn test_view_sets_node_renderer() {
        let resp = response(json!([counter("web", "prod", "api", "200", "1")]));
        let options = GraphOptions {
            view: RenderMode::FocusedChild,
            ..GraphOptions::default()
        };
        let graph = build_graph_at(&resp, &options, NOW).unwrap().graph;

        assert!(graph
            .nodes
            .iter()
            .all(|n| n.renderer == RenderMode::FocusedChild));
        assert_eq!(graph.renderer, "region");
    }

    #[test]
    fn test_strict_policy_rejects_malformed_sample() {
        let resp = response(json!([
            counter("web", "prod", "api", "200", "1"),
            counter("web", "prod", "api", "bogus", "1"),
        ]));
        let err = build_graph_at(&resp, &GraphOptions::default(), NOW).unwrap_err();

        assert!(matches!(
            err,
            GraphError::Sample {
                index: 1,
                source: SampleError::InvalidResponseCode(_)
            }
        ));
    }

    #[test]
    fn test_lenient_policy_skips_malformed_sample() {
        let resp = response(json!([
            counter("web", "prod", "api", "200", "1"),
            counter("web", "prod", "api", "200", "many"),
            json!({"metric": {"source": "web"}, "value": [0, "1"]}),
        ]));
        let options = GraphOptions {
            policy: SamplePolicy::Lenient,
            ..GraphOptions::default()
        };
        let build = build_graph_at(&resp, &options, NOW).unwrap();

        assert_eq!(build.skipped_samples(), 2);
        assert_eq!(build.skipped[0].index, 1);
        assert_eq!(
            build.skipped[0].error,
            SampleError::InvalidValue("many".to_string())
        );
        assert_eq!(
            build.skipped[1].error,
            SampleError::MissingLabel("destination")
        );
        assert_eq!(build.graph.connections.len(), 1);
        assert_eq!(build.graph.connections[0].metrics.normal, 1);
    }

    #[test]
    fn test_normalize_samples_counts_skips() {
        let resp = response(json!([counter("web", "prod", "api", "200", "x")]));
        let raw = resp.samples().unwrap();

        let (samples, skipped) = normalize_samples(raw, SamplePolicy::Lenient).unwrap();
        assert!(samples.is_empty());
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].index, 0);
        assert!(normalize_samples(raw, SamplePolicy::Strict).is_err());
    }

    #[test]
    fn test_document_field_names() {
        let resp = response(json!([bucket("api", "200", "+Inf", "80", "3")]));
        let build = build_graph_at(&resp, &GraphOptions::default(), NOW).unwrap();
        let json = serde_json::to_value(&build.graph).unwrap();

        assert_eq!(json["renderer"], "region");
        assert_eq!(json["name"], "graph");
        assert_eq!(json["serverUpdateTime"], NOW);
        assert_eq!(json["maxVolume"], 26);
        assert_eq!(json["nodes"][0]["displayName"], "api.prod");
        assert_eq!(json["nodes"][0]["renderer"], "region");
        assert_eq!(json["nodes"][0]["class"], "normal");
        assert!(json["nodes"][0]["metadata"].as_object().unwrap().is_empty());
        assert_eq!(json["connections"][0]["annotations"]["ports"], "80");
        assert_eq!(json["connections"][0]["annotations"]["HTTP 200"], 3);
    }

    #[test]
    fn test_empty_document_omits_max_volume() {
        let graph = assemble(&[], &GraphOptions::default(), NOW);
        let json = serde_json::to_value(&graph).unwrap();

        assert!(json.get("maxVolume").is_none());
        assert_eq!(json["nodes"], json!([]));
        assert_eq!(json["connections"], json!([]));
    }

    #[test]
    fn test_huge_counts_do_not_overflow() {
        let resp = response(json!([bucket("api", "200", "+Inf", "80", "18446744073709551615")]));
        let build = build_graph_at(&resp, &GraphOptions::default(), NOW).unwrap();

        assert_eq!(build.graph.connections[0].metrics.normal, u64::MAX);
        assert_eq!(build.graph.max_volume, Some(u64::MAX));

        let resp = response(json!([
            counter("web", "prod", "api", "200", "10000000000000000000"),
            counter("web", "prod", "api", "200", "10000000000000000000"),
        ]));
        let build = build_graph_at(&resp, &GraphOptions::default(), NOW).unwrap();

        assert_eq!(build.graph.connections[0].metrics.normal, u64::MAX);
    }
}
