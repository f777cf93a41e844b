//! Null sampling, p-values and scope queries through the public API.

use pathrank::{
    p_value, GraphModel, NullScoreSampler, NullScoreTable, SamplerConfig, SamplingStrategy, ScopeConfig,
    ScopeEngine,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// 1000 evenly spaced samples 0.00 .. 9.99 per length
fn linear_table(max_length: usize) -> NullScoreTable {
    let column: Vec<f64> = (0..1000).map(|i| i as f64 * 0.01).collect();
    NullScoreTable::from_columns(vec![column; max_length]).unwrap()
}

/// Source fans out to two genes that both feed the sink. `hit` is nearly
/// free to reach, `miss` scores above 90% of the null samples.
fn fan_graph() -> GraphModel {
    let mut b = GraphModel::builder();
    b.add_edge("s", "hit", 0.0001, "c_hit").unwrap();
    b.add_edge("s", "miss", 9.005, "c_miss").unwrap();
    b.add_edge("hit", "t", 1.0, "").unwrap();
    b.add_edge("miss", "t", 1.0, "").unwrap();
    b.build()
}

#[test]
fn test_one_significant_one_not() {
    let g = fan_graph();
    let config = ScopeConfig {
        alpha: 0.05,
        ..ScopeConfig::default()
    };
    let result = ScopeEngine::new(&g, config).run(&linear_table(4)).unwrap();

    assert_eq!(result.scope, vec!["hit"]);
    assert_eq!(result.paths.len(), 1);

    let report = &result.paths[0];
    assert_eq!(report.genes, vec!["hit"]);
    assert_eq!(report.weights, vec![0.0001]);
    assert!(report.pvalue.unwrap() < 0.05);
}

#[test]
fn test_scope_result_json_shape() {
    let g = fan_graph();
    let result = ScopeEngine::new(&g, ScopeConfig::default())
        .run(&linear_table(4))
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["scope"], serde_json::json!(["hit"]));
    let path = &json["paths"][0];
    for key in ["genes", "compounds", "weights", "distance", "pvalue"] {
        assert!(path.get(key).is_some(), "missing {}", key);
    }
}

#[test]
fn test_table_survives_json() {
    let g = fan_graph();
    let config = SamplerConfig {
        max_path_length: 2,
        sample_count: 200,
        warmup_steps: 3,
        strategy: SamplingStrategy::RandomEdges,
        ..SamplerConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let table = NullScoreSampler::new(&g, config).sample(&mut rng).unwrap();

    let json = serde_json::to_string(&table).unwrap();
    let back: NullScoreTable = serde_json::from_str(&json).unwrap();
    assert_eq!(back, table);
    assert_eq!(back.max_length(), 2);
    assert_eq!(back.sample_count(), 200);
}

#[test]
fn test_sampled_table_drives_pvalues() {
    // Metropolis on a complete digraph: every length-L walk uses L of the
    // available weights, so a path cheaper than every edge is significant
    let mut b = GraphModel::builder();
    let names = ["a", "b", "c", "d", "e"];
    for name in names {
        b.add_vertex(name).unwrap();
    }
    for (i, from) in names.iter().enumerate() {
        for (j, to) in names.iter().enumerate() {
            if i != j {
                b.add_edge(from, to, 1.0 + ((i * 7 + j * 3) % 5) as f64, "").unwrap();
            }
        }
    }
    let g = b.build();

    let config = SamplerConfig {
        max_path_length: 3,
        sample_count: 1000,
        warmup_steps: 4,
        strategy: SamplingStrategy::Metropolis,
        ..SamplerConfig::default()
    };
    let table = NullScoreSampler::new(&g, config).sample_par().unwrap();

    for length in 1..=3 {
        let samples = table.samples(length).unwrap();
        assert_eq!(samples.len(), 1000);
        assert!(samples.windows(2).all(|w| w[0] <= w[1]));

        let floor = length as f64;
        assert_eq!(p_value(floor * 0.5, samples).unwrap(), 0.0);
        let top = p_value(floor * 100.0, samples).unwrap();
        assert!((top - 0.999).abs() < 1e-12);
    }
}
