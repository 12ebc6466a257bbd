use links_cluster::similarity::{cosine, population_threshold};
use links_cluster::LinksCluster;
use quickcheck::{quickcheck, TestResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_unit_vector(rng: &mut impl Rng, dims: usize) -> Vec<f64> {
    loop {
        let v: Vec<f64> = (0..dims).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 1e-6 {
            return v.into_iter().map(|x| x / norm).collect();
        }
    }
}

quickcheck! {
    fn threshold_is_symmetric(k: u8, k_prime: u8) -> TestResult {
        let k = k as usize + 1;
        let k_prime = k_prime as usize + 1;
        let a = population_threshold(k, k_prime, 0.6, 0.95);
        let b = population_threshold(k_prime, k, 0.6, 0.95);
        TestResult::from_bool((a - b).abs() < 1e-9)
    }

    fn threshold_stays_between_s_squared_and_m(k: u8, k_prime: u8) -> TestResult {
        let k = k as usize + 1;
        let k_prime = k_prime as usize + 1;
        let s = 0.6_f64;
        let m = 0.95_f64;
        let t = population_threshold(k, k_prime, s, m);
        TestResult::from_bool(t >= s * s - 1e-9 && t <= m + 1e-9)
    }

    fn cosine_is_symmetric(seed: u64) -> TestResult {
        let mut rng = StdRng::seed_from_u64(seed);
        let a = random_unit_vector(&mut rng, 5);
        let b = random_unit_vector(&mut rng, 5);
        let ab = cosine(&a, &b).unwrap();
        let ba = cosine(&b, &a).unwrap();
        TestResult::from_bool((ab - ba).abs() < 1e-9)
    }

    fn cosine_of_a_vector_with_itself_is_one(seed: u64) -> TestResult {
        let mut rng = StdRng::seed_from_u64(seed);
        let a = random_unit_vector(&mut rng, 8);
        let sim = cosine(&a, &a).unwrap();
        TestResult::from_bool((sim - 1.0).abs() < 1e-6)
    }
}

#[test]
fn clusters_stay_single_component_across_a_random_stream() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut engine = LinksCluster::new(0.5, 0.85, 0.97, false).unwrap();

    for _ in 0..300 {
        let v = random_unit_vector(&mut rng, 6);
        engine.predict(v, None).unwrap();
    }

    for cluster in engine.clusters() {
        assert!(cluster.is_single_component());
    }
}

#[test]
fn locality_every_edge_stays_within_its_cluster() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut engine = LinksCluster::new(0.5, 0.85, 0.97, false).unwrap();

    for _ in 0..300 {
        let v = random_unit_vector(&mut rng, 6);
        engine.predict(v, None).unwrap();
    }

    for cluster in engine.clusters() {
        for sub in &cluster.subclusters {
            for neighbor in &sub.neighbors {
                assert!(cluster.index_of(*neighbor).is_some());
            }
        }
    }
}

#[test]
fn symmetry_every_neighbor_relation_is_mutual() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut engine = LinksCluster::new(0.5, 0.85, 0.97, false).unwrap();

    for _ in 0..300 {
        let v = random_unit_vector(&mut rng, 6);
        engine.predict(v, None).unwrap();
    }

    for cluster in engine.clusters() {
        for sub in &cluster.subclusters {
            for &neighbor_id in &sub.neighbors {
                let neighbor = cluster.get(neighbor_id).expect("neighbor present");
                assert!(neighbor.neighbors.contains(&sub.id));
            }
        }
    }
}

#[test]
fn determinism_same_stream_same_parameters_yields_same_graph() {
    use links_cluster::id::DeterministicIdGenerator;

    let mut rng = StdRng::seed_from_u64(123);
    let stream: Vec<Vec<f64>> = (0..150).map(|_| random_unit_vector(&mut rng, 5)).collect();

    let run = |stream: &[Vec<f64>]| {
        let mut engine =
            LinksCluster::with_id_generator(0.5, 0.85, 0.97, false, Box::new(DeterministicIdGenerator::new())).unwrap();
        for v in stream {
            engine.predict(v.clone(), None).unwrap();
        }
        engine
            .clusters()
            .iter()
            .map(|c| c.subclusters.iter().map(|s| s.vector_count()).collect::<Vec<_>>())
            .collect::<Vec<_>>()
    };

    assert_eq!(run(&stream), run(&stream));
}

#[test]
fn population_arithmetic_centroid_matches_mean_of_inputs() {
    let mut engine = LinksCluster::new(0.5, 0.9, 0.99, true).unwrap();
    let inputs = vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.8, 0.2]];
    for v in &inputs {
        engine.predict(v.clone(), None).unwrap();
    }

    assert_eq!(engine.clusters().len(), 1);
    let sub = &engine.clusters()[0].subclusters[0];
    assert_eq!(sub.vector_count(), inputs.len());

    let mean: Vec<f64> = (0..2)
        .map(|dim| inputs.iter().map(|v| v[dim]).sum::<f64>() / inputs.len() as f64)
        .collect();

    for (actual, expected) in sub.centroid().iter().zip(mean.iter()) {
        assert!((actual - expected).abs() < 1e-9);
    }
}
