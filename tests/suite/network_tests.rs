//! Network parsing, planning and launching.

use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use symtensor::{
    Bond, BondType, ContractionStrategy, CostModel, ErrorKind, Network, NetworkConfig, Qnum, Tensor, TensorError,
    contract, contract_network, create_plan, parse_network,
};

const CHAIN: &str = "\
# three matrices in a row
A: 1; 2
B: 2; 3
C: 3; 4
TOUT: 1; 4
";

fn spin_matrix(seed: u64) -> Tensor<f64> {
    let bi = Bond::from_qnums(BondType::In, &[Qnum::new(1), Qnum::new(0), Qnum::new(-1)]).unwrap();
    let bo = bi.dummy_change(BondType::Out);
    let mut t = Tensor::new(vec![bi, bo]).unwrap();
    t.randomize(&mut StdRng::seed_from_u64(seed));
    t
}

fn assert_close(a: &Tensor<f64>, b: &Tensor<f64>) {
    assert_eq!(a.labels(), b.labels());
    assert_eq!(a.bonds(), b.bonds());
    for (x, y) in a.raw_elem().iter().zip(b.raw_elem()) {
        assert!((x - y).abs() < 1e-10, "{x} != {y}");
    }
}

#[test]
fn test_symmetric_chain_matches_manual_contraction() {
    let (a, b, c) = (spin_matrix(1), spin_matrix(2), spin_matrix(3));

    let mut la = a.clone();
    la.set_labels(&[1, 2]).unwrap();
    let mut lb = b.clone();
    lb.set_labels(&[2, 3]).unwrap();
    let mut lc = c.clone();
    lc.set_labels(&[3, 4]).unwrap();
    let expected = contract(&contract(&la, &lb).unwrap(), &lc).unwrap();
    assert_eq!(expected.block_count(), 3);

    for strategy in [
        ContractionStrategy::Sequential,
        ContractionStrategy::Greedy,
        ContractionStrategy::Optimal,
        ContractionStrategy::Auto,
    ] {
        let mut net = Network::parse(CHAIN, NetworkConfig::new().with_strategy(strategy)).unwrap();
        net.put_tensor("A", a.clone()).unwrap();
        net.put_tensor("B", b.clone()).unwrap();
        net.put_tensor("C", c.clone()).unwrap();
        let out = net.launch().unwrap();
        assert_eq!(out.name(), "TOUT");
        assert_close(&out, &expected);
    }
}

#[test]
fn test_order_line_overrides_strategy() {
    let (a, b, c) = (spin_matrix(4), spin_matrix(5), spin_matrix(6));
    let plain = contract_network(&parse_network(CHAIN).unwrap(), &[&a, &b, &c], None).unwrap();

    let ordered = parse_network(&format!("{CHAIN}ORDER: (A (B C))")).unwrap();
    let shapes: [&[usize]; 3] = [&[3, 3], &[3, 3], &[3, 3]];
    let plan = create_plan(&ordered, &shapes, ContractionStrategy::Sequential, &CostModel::default()).unwrap();
    // B and C sit at positions 1 and 2 before anything is contracted.
    match &plan.steps()[0] {
        symtensor::ExecutionStep::Contraction { inputs, .. } => assert_eq!(*inputs, (1, 2)),
        other => panic!("unexpected first step {other:?}"),
    }

    let out = contract_network(&ordered, &[&a, &b, &c], None).unwrap();
    assert_close(&out, &plain);
}

#[test]
fn test_five_tensor_plans_have_four_contractions() {
    let desc = parse_network("A: 1; 2\nB: 2; 3\nC: 3; 4\nD: 4; 5\nE: 5; 6\nTOUT: 1; 6").unwrap();
    let shapes: [&[usize]; 5] = [&[2, 40], &[40, 3], &[3, 50], &[50, 4], &[4, 2]];
    for strategy in [ContractionStrategy::Greedy, ContractionStrategy::Optimal] {
        let plan = create_plan(&desc, &shapes, strategy, &CostModel::default()).unwrap();
        assert_eq!(plan.num_contractions(), 4, "{strategy:?}");
        assert_eq!(plan.num_steps(), 5, "{strategy:?}");
        assert_eq!(plan.output_shape(), &[2, 2]);
    }
    let greedy = create_plan(&desc, &shapes, ContractionStrategy::Greedy, &CostModel::default()).unwrap();
    let optimal = create_plan(&desc, &shapes, ContractionStrategy::Optimal, &CostModel::default()).unwrap();
    let total = |plan: &symtensor::ExecutionPlan| plan.total_flops() + 8 * plan.total_memory();
    assert!(total(&optimal) <= total(&greedy));
}

#[test]
fn test_scalar_output_skips_permutation() {
    let a = spin_matrix(7);
    let desc = parse_network("A: 1; 2\nB: 2; 1\nTOUT:").unwrap();
    let shapes: [&[usize]; 2] = [&[3, 3], &[3, 3]];
    let plan = create_plan(&desc, &shapes, ContractionStrategy::Auto, &CostModel::default()).unwrap();
    assert_eq!(plan.num_steps(), 1);

    let out = contract_network(&desc, &[&a, &a], None).unwrap();
    assert_eq!(out.bond_num(), 0);
    let expected: f64 = (0..3)
        .flat_map(|i| (0..3).map(move |j| (i, j)))
        .map(|(i, j)| a.at(&[i, j]).unwrap() * a.at(&[j, i]).unwrap())
        .sum();
    assert!((out.at(&[]).unwrap() - expected).abs() < 1e-10);
}

#[test]
fn test_parse_errors_carry_line_numbers() {
    let cases = [
        ("A: 1; 2\nB 2; 3\nTOUT: 1; 3", 2),
        ("A: 1; x\nTOUT: 1", 1),
        ("A: 1; 2\nB: 2; 3", 2),
        ("A: 1; 2\nTOUT: 1; 2\nTOUT: 1; 2", 3),
        ("A: 1; 2\nB: 2; 3\nTOUT: 1; 3\nORDER: (A B", 4),
        ("A: 1; 2\nB: 2; 3\nTOUT: 1; 3\nORDER: (A X)", 4),
    ];
    for (text, expected_line) in cases {
        match parse_network(text) {
            Err(TensorError::Parse { line, .. }) => assert_eq!(line, expected_line, "{text:?}"),
            other => panic!("expected parse error for {text:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_invalid_networks_rejected() {
    let texts = [
        // label 2 used three times
        "A: 1; 2\nB: 2; 3\nC: 2; 4\nTOUT: 1; 3, 4",
        // TOUT misses an open label
        "A: 1; 2\nB: 2; 3\nTOUT: 1",
        // TOUT names a contracted label
        "A: 1; 2\nB: 2; 3\nTOUT: 1, 2; 3",
        // duplicate tensor name
        "A: 1; 2\nA: 2; 3\nTOUT: 1; 3",
        // ORDER misses C
        "A: 1; 2\nB: 2; 3\nC: 3; 4\nTOUT: 1; 4\nORDER: (A B)",
    ];
    for text in texts {
        let err = Network::<f64>::parse(text, NetworkConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration, "{text:?}");
    }
}

#[test]
fn test_replacing_tensor_keeps_network_usable() {
    let mut net = Network::<f64>::parse(CHAIN, NetworkConfig::fast()).unwrap();
    for name in ["A", "B", "C"] {
        net.put_tensor(name, spin_matrix(8)).unwrap();
    }
    let first = net.launch().unwrap();

    net.put_tensor("B", spin_matrix(9)).unwrap();
    let second = net.launch().unwrap();
    assert_eq!(first.bonds(), second.bonds());
    assert_ne!(first.raw_elem(), second.raw_elem());
}

#[test]
fn test_empty_tensor_cannot_launch() {
    let mut net = Network::<f64>::parse("A: 1; 2\nTOUT: 1; 2", NetworkConfig::default()).unwrap();
    let bonds = spin_matrix(0).bonds().to_vec();
    net.put_tensor("A", Tensor::new(bonds).unwrap()).unwrap();
    assert!(net.is_complete());
    assert!(net.plan().is_ok());
    assert!(net.launch().is_err());
}
