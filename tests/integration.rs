//! End-to-end tests: dataset loading, walk sampling, learning and rule files.

use rand::SeedableRng;

use chronorule::bandit::RecencyBucket;
use chronorule::config::LearnConfig;
use chronorule::export::{load_rules, rules_file_stem, save_rules, save_rules_verbalized};
use chronorule::graph::{Dataset, EdgeIndex, InverseRelations, Quad};
use chronorule::learn::learn;
use chronorule::rules::{ConfidenceEstimator, Rule};
use chronorule::walk::{TemporalWalker, TransitionDistr};

fn seeded_rng() -> rand::rngs::StdRng {
    rand::rngs::StdRng::seed_from_u64(42)
}

/// Disjoint chains `x -a-> y` at t, `y -b-> z` at t+1, `x -h-> z` at t+2.
fn chain_dataset() -> Dataset {
    let names: Vec<[String; 3]> = (0..15)
        .map(|i| [format!("x{i}"), format!("y{i}"), format!("z{i}")])
        .collect();
    let mut facts = Vec::new();
    for (i, [x, y, z]) in names.iter().enumerate() {
        let t = 10 * i as i64;
        facts.push((x.as_str(), "a", y.as_str(), t));
        facts.push((y.as_str(), "b", z.as_str(), t + 1));
        facts.push((x.as_str(), "h", z.as_str(), t + 2));
    }
    Dataset::from_named(facts).unwrap()
}

#[test]
fn future_triangle_never_closes() {
    let mut inv = InverseRelations::new();
    for r in 0..3 {
        inv.insert_pair(r, r + 3);
    }
    let base = [Quad::new(0, 0, 1, 10), Quad::new(1, 1, 2, 20), Quad::new(2, 2, 0, 30)];
    let mut facts = Vec::new();
    for q in base {
        facts.push(q);
        facts.push(q.reversed(inv.inverse_of(q.relation).unwrap()));
    }
    let index = EdgeIndex::build(&facts);
    let mut rng = seeded_rng();

    for distr in [TransitionDistr::Uniform, TransitionDistr::Exponential] {
        let walker = TemporalWalker::new(&index, &inv, distr);
        for bucket in RecencyBucket::ALL {
            for _ in 0..50 {
                assert!(walker.sample_walk(3, 0, bucket, &mut rng).is_none());
            }
        }
    }
}

#[test]
fn ordered_chains_have_full_confidence() {
    let data = chain_dataset();
    let index = data.index();
    let rel = |name: &str| data.vocab.relation2id[name];
    let rule = Rule {
        head_rel: rel("h"),
        body_rels: vec![rel("a"), rel("b")],
        var_constraints: vec![],
        body_timestamp_order: vec![0, 1],
        conf: 0.0,
        rule_supp: 0,
        body_supp: 0,
    };

    let estimate = ConfidenceEstimator::new(&index, 200)
        .estimate(&rule, &mut seeded_rng())
        .unwrap();
    assert_eq!(estimate.conf, 1.0);
    assert!(estimate.body_supp > 0);
    assert_eq!(estimate.rule_supp, estimate.body_supp);
}

#[test]
fn learns_chain_rule_end_to_end() {
    let data = chain_dataset();
    let index = data.index();
    let head = data.vocab.relation2id["h"];
    let config = LearnConfig {
        rule_lengths: vec![1, 2],
        num_walks: 50,
        seed: Some(7),
        relations: Some(vec![head]),
        ..Default::default()
    };

    let report = learn(&index, &data.vocab.inverse, &config).unwrap();
    let rules = report.store.get(head);
    assert_eq!(rules.len(), 1);
    assert_eq!(
        rules[0].body_rels,
        vec![data.vocab.relation2id["a"], data.vocab.relation2id["b"]]
    );
    assert_eq!(rules[0].body_timestamp_order, vec![0, 1]);
    assert_eq!(rules[0].conf, 1.0);
    assert_eq!(report.stats.walk_attempts, 2 * 50);
    assert_eq!(report.stats.walk_successes, 50);
}

#[test]
fn dataset_directory_to_rule_files() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut train = String::new();
    for i in 0..15 {
        let t = 10 * i;
        train.push_str(&format!("x{i}\ta\ty{i}\t{t}\n"));
        train.push_str(&format!("y{i}\tb\tz{i}\t{}\n", t + 1));
        train.push_str(&format!("x{i}\th\tz{i}\t{}\n", t + 2));
    }
    std::fs::write(tmp.path().join("train.txt"), train).unwrap();

    let data = Dataset::load(tmp.path()).unwrap();
    assert_eq!(data.vocab.num_entities(), 45);
    assert_eq!(data.vocab.num_relations(), 6);
    assert_eq!(data.facts.len(), 90);

    let config = LearnConfig {
        rule_lengths: vec![1, 2, 3],
        num_walks: 30,
        num_workers: 2,
        seed: Some(3),
        num_samples: 100,
        ..Default::default()
    };
    let report = learn(&data.index(), &data.vocab.inverse, &config).unwrap();
    assert!(!report.store.is_empty());
    for rule in report.store.iter() {
        assert!(rule.conf > 0.0 && rule.conf <= 1.0);
        assert!(rule.rule_supp <= rule.body_supp);
    }

    let out = tmp.path().join("rules");
    let stem = rules_file_stem("run", &config);
    assert_eq!(stem, "run_r[1,2,3]_n30_unif_s3_rules");
    let json = out.join(format!("{stem}.json"));
    let txt = out.join(format!("{stem}.txt"));
    save_rules(&report.store, &json).unwrap();
    save_rules_verbalized(&report.store, &data.vocab, &txt).unwrap();

    assert_eq!(load_rules(&json).unwrap(), report.store);
    let text = std::fs::read_to_string(&txt).unwrap();
    assert_eq!(text.lines().count(), report.store.len());
    assert!(text.contains("h(X0,X2,T2) <- a(X0,X1,T0), b(X1,X2,T1)"));
}
