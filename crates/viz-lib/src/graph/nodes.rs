//! Node set derivation

use super::sample::MetricSample;
use std::collections::BTreeSet;

/// Distinct combined source and destination identifiers, sorted
pub fn derive_nodes(samples: &[MetricSample]) -> BTreeSet<String> {
    samples
        .iter()
        .flat_map(|s| [s.source.clone(), s.destination.clone()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(source: &str, destination: &str) -> MetricSample {
        MetricSample {
            source: source.into(),
            destination: destination.into(),
            response_code: 200,
            destination_port: "80".into(),
            bucket_bound: None,
            count: 1,
        }
    }

    #[test]
    fn test_union_of_sources_and_destinations() {
        let samples = vec![
            sample("web.prod", "api.prod"),
            sample("api.prod", "db.prod"),
            sample("UNKNOWN", "web.prod"),
            sample("web.prod", "api.prod"),
        ];

        let nodes: Vec<_> = derive_nodes(&samples).into_iter().collect();
        assert_eq!(nodes, vec!["UNKNOWN", "api.prod", "db.prod", "web.prod"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(derive_nodes(&[]).is_empty());
    }
}
