//! Properties of grouping, permute, contract and partial trace.

use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use symtensor::{Bond, BondType, Parity, Qnum, Tensor, TensorError, contract, partial_trace, permute};

fn u1_bond(ty: BondType, runs: &[(i32, usize)]) -> Bond {
    let runs: Vec<(Qnum, usize)> = runs.iter().map(|&(q, d)| (Qnum::new(q), d)).collect();
    Bond::from_degeneracies(ty, &runs).unwrap()
}

fn counting(bonds: Vec<Bond>, labels: Vec<i32>) -> Tensor<f64> {
    let mut t = Tensor::with_labels(bonds, labels).unwrap();
    let total: usize = t.shape().iter().product();
    let raw: Vec<f64> = (1..=total).map(|x| x as f64).collect();
    t.set_raw_elem(&raw).unwrap();
    t
}

/// All multi-indices of `dims`, last index fastest.
fn multi_indices(dims: &[usize]) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new()];
    for &d in dims {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                (0..d).map(move |i| {
                    let mut idx = prefix.clone();
                    idx.push(i);
                    idx
                })
            })
            .collect();
    }
    out
}

#[test]
fn test_grouping_completeness() {
    let bonds = vec![
        u1_bond(BondType::In, &[(1, 1), (0, 2), (-1, 1)]),
        u1_bond(BondType::In, &[(1, 2), (-1, 1)]),
        u1_bond(BondType::Out, &[(2, 1), (0, 3), (-2, 1)]),
        u1_bond(BondType::Out, &[(0, 2), (1, 1)]),
    ];
    let states: Vec<Vec<Qnum>> = bonds.iter().map(Bond::states).collect();
    let dims: Vec<usize> = bonds.iter().map(Bond::dim).collect();

    let allowed = multi_indices(&dims)
        .into_iter()
        .filter(|idx| {
            let row = states[0][idx[0]] * states[1][idx[1]];
            let col = states[2][idx[2]] * states[3][idx[3]];
            row == col
        })
        .count();

    let t = counting(bonds, vec![0, 1, 2, 3]);
    let stored: usize = t.layout().blocks().iter().map(|b| b.rows() * b.cols()).sum();
    assert_eq!(stored, allowed);
    assert_eq!(t.elem_num(), allowed);

    // every allowed raw entry lands in exactly one stored slot
    let mut values: Vec<f64> = t.elem().to_vec();
    values.sort_by(f64::total_cmp);
    values.dedup();
    assert_eq!(values.len(), allowed);
    assert!(values.iter().all(|&v| v > 0.0));
}

#[test]
fn test_permute_identity() {
    let t = counting(
        vec![
            u1_bond(BondType::In, &[(1, 1), (-1, 2)]),
            u1_bond(BondType::In, &[(1, 2), (-1, 1)]),
            u1_bond(BondType::Out, &[(0, 2), (2, 1), (-2, 1)]),
        ],
        vec![5, 6, 7],
    );
    let p = permute(&t, &[5, 6, 7], 2).unwrap();
    assert_eq!(p, t);
}

#[test]
fn test_permute_round_trip_is_exact() {
    let bonds = vec![
        u1_bond(BondType::In, &[(1, 1), (0, 2), (-1, 1)]),
        u1_bond(BondType::In, &[(1, 2), (-1, 1)]),
        u1_bond(BondType::Out, &[(2, 1), (0, 3), (-2, 1)]),
        u1_bond(BondType::Out, &[(0, 2), (1, 1)]),
    ];
    let mut t = Tensor::<f64>::new(bonds).unwrap();
    t.randomize(&mut StdRng::seed_from_u64(7));

    for (order, row_num) in [(vec![2, 0, 3, 1], 1), (vec![3, 2, 1, 0], 2), (vec![1, 3, 0, 2], 3)] {
        let there = t.permute(&order, row_num).unwrap();
        let back = there.permute(&[0, 1, 2, 3], 2).unwrap();
        assert_eq!(back.elem(), t.elem(), "{order:?}");
        assert_eq!(back, t);
    }
}

#[test]
fn test_permute_is_a_bijection() {
    let t = counting(
        vec![
            u1_bond(BondType::In, &[(1, 1), (0, 2), (-1, 1)]),
            u1_bond(BondType::Out, &[(1, 2), (-1, 1)]),
            u1_bond(BondType::Out, &[(0, 3), (2, 1)]),
        ],
        vec![0, 1, 2],
    );
    let p = t.permute(&[2, 0, 1], 2).unwrap();

    let mut before = t.elem().to_vec();
    let mut after = p.elem().to_vec();
    before.sort_by(f64::total_cmp);
    after.sort_by(f64::total_cmp);
    assert_eq!(before, after);

    // each entry moves to the permuted multi-index
    for idx in multi_indices(&t.shape()) {
        let moved = [idx[2], idx[0], idx[1]];
        assert_eq!(p.at(&moved).unwrap(), t.at(&idx).unwrap(), "{idx:?}");
    }
}

#[test]
fn test_rank_three_round_trip_via_at() {
    let bonds = vec![
        Bond::new(BondType::In, 2).unwrap(),
        Bond::new(BondType::Out, 3).unwrap(),
        Bond::new(BondType::Out, 4).unwrap(),
    ];
    let t = counting(bonds, vec![0, 1, 2]);

    let moved = t.permute(&[1, 2, 0], 1).unwrap();
    assert_eq!(moved.shape(), vec![3, 4, 2]);
    let back = moved.permute(&[0, 1, 2], 1).unwrap();
    for idx in multi_indices(&[2, 3, 4]) {
        assert_eq!(back.at(&idx).unwrap(), t.at(&idx).unwrap());
        assert_eq!(moved.at(&[idx[1], idx[2], idx[0]]).unwrap(), t.at(&idx).unwrap());
    }
    assert_eq!(back.raw_elem(), t.raw_elem());
}

#[test]
fn test_matrix_transpose_and_product() {
    let bonds = vec![Bond::new(BondType::In, 2).unwrap(), Bond::new(BondType::Out, 2).unwrap()];
    let mut m = Tensor::<f64>::with_labels(bonds, vec![0, 1]).unwrap();
    m.set_raw_elem(&[1.0, 2.0, 3.0, 4.0]).unwrap();

    let mt = m.transpose().unwrap();
    assert_eq!(mt.raw_elem(), vec![1.0, 3.0, 2.0, 4.0]);
    assert_eq!(mt.transpose().unwrap(), m);

    let mut m2 = m.clone();
    m2.set_labels(&[1, 2]).unwrap();
    let p = contract(&m, &m2).unwrap();
    assert_eq!(p.labels(), &[0, 2]);
    assert_eq!(p.raw_elem(), vec![7.0, 10.0, 15.0, 22.0]);
}

#[test]
fn test_contract_associativity() {
    let b1 = u1_bond(BondType::In, &[(1, 1), (0, 2), (-1, 1)]);
    let b2 = u1_bond(BondType::Out, &[(1, 2), (0, 1), (-1, 2)]);
    let b3 = u1_bond(BondType::Out, &[(1, 1), (-1, 3)]);
    let b4 = u1_bond(BondType::Out, &[(0, 2), (1, 1), (-1, 1)]);

    let a = counting(vec![b1.clone(), b2.clone()], vec![0, 1]);
    let b = counting(vec![b2.dummy_change(BondType::In), b3.clone()], vec![1, 2]);
    let c = counting(vec![b3.dummy_change(BondType::In), b4], vec![2, 3]);

    let left = a.contract(&b).unwrap().contract(&c).unwrap();
    let right = a.contract(&b.contract(&c).unwrap()).unwrap();
    assert_eq!(left.labels(), right.labels());
    for (x, y) in left.raw_elem().iter().zip(right.raw_elem()) {
        assert!((x - y).abs() < 1e-9, "{x} vs {y}");
    }
}

#[test]
fn test_contract_missing_blocks_are_zero() {
    // `a` stores only the charge-0 block; the result also allows charge 1
    let a = counting(
        vec![u1_bond(BondType::In, &[(0, 2), (1, 1)]), u1_bond(BondType::Out, &[(0, 2)])],
        vec![0, 1],
    );
    let b = counting(
        vec![u1_bond(BondType::In, &[(0, 2)]), u1_bond(BondType::Out, &[(0, 1), (1, 2)])],
        vec![1, 2],
    );
    let c = a.contract(&b).unwrap();
    assert_eq!(c.block_count(), 2);

    let charged = c.get_block(&Qnum::new(1)).unwrap();
    assert!(charged.elem().iter().all(|&x| x == 0.0));
    let neutral = c.get_block(&Qnum::new(0)).unwrap();
    // [[1, 2], [3, 4]] times [[1], [4]]
    assert_eq!(neutral.elem(), &[9.0, 19.0]);
}

#[test]
fn test_self_contraction_matches_deep_copy() {
    // parity charges are their own conjugates
    let odd = Qnum::with_parity(0, Parity::Odd);
    let b = Bond::from_degeneracies(BondType::In, &[(Qnum::default(), 2), (odd, 1)]).unwrap();
    let mut t = Tensor::<f64>::new(vec![b.clone(), b.dummy_change(BondType::Out)]).unwrap();
    t.randomize(&mut StdRng::seed_from_u64(3));
    assert_eq!(t.block_count(), 2);

    let copy = t.clone();
    let aliased = contract(&t, &t).unwrap();
    let separate = contract(&t, &copy).unwrap();
    assert_eq!(aliased, separate);

    let norm_sqr: f64 = t.elem().iter().map(|x| x * x).sum();
    assert!((aliased.at(&[]).unwrap() - norm_sqr).abs() < 1e-12);
    // inputs untouched
    assert_eq!(t, copy);
}

#[test]
fn test_partial_trace_of_identity_product() {
    let bi = u1_bond(BondType::In, &[(1, 1), (0, 2)]);
    let bo = bi.dummy_change(BondType::Out);
    let mut left = Tensor::<f64>::with_labels(vec![bi.clone(), bo.clone()], vec![0, 1]).unwrap();
    let mut right = Tensor::<f64>::with_labels(vec![bi, bo], vec![2, 3]).unwrap();
    left.identity();
    right.identity();

    let product = left.otimes(&right).unwrap();
    let traced = partial_trace(&product, 0, 1).unwrap();
    assert_eq!(traced.labels(), &[2, 3]);

    let mut total = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            let expected = if i == j { 3.0 } else { 0.0 };
            assert_eq!(traced.at(&[i, j]).unwrap(), expected);
        }
        total += traced.at(&[i, i]).unwrap();
    }
    assert_eq!(total, 9.0);
}

#[test]
fn test_fermion_swap_and_double_transpose() {
    let odd = Qnum::fermionic(Parity::Odd, 0, Parity::Even);
    let b = Bond::from_qnums(BondType::In, &[Qnum::default(), odd]).unwrap();
    let mut pair = Tensor::<f64>::new(vec![b.clone(), b.clone()]).unwrap();
    pair.set_raw_elem(&[1.0, 0.0, 0.0, 2.0]).unwrap();

    let swapped = pair.permute(&[1, 0], 2).unwrap();
    assert_eq!(swapped.at(&[0, 0]).unwrap(), 1.0);
    assert_eq!(swapped.at(&[1, 1]).unwrap(), -2.0);
    assert_eq!(swapped.permute(&[0, 1], 2).unwrap(), pair);

    let mut op = Tensor::<f64>::new(vec![b.clone(), b.dummy_change(BondType::Out)]).unwrap();
    op.randomize(&mut StdRng::seed_from_u64(11));
    assert_eq!(op.transpose().unwrap().transpose().unwrap(), op);
}

#[test]
fn test_errors_leave_inputs_untouched() {
    let bonds = vec![Bond::new(BondType::In, 2).unwrap(), Bond::new(BondType::Out, 3).unwrap()];
    let t = counting(bonds, vec![0, 1]);
    let before = t.clone();

    assert!(matches!(t.permute(&[0, 0], 1), Err(TensorError::InvalidPermutation { .. })));
    assert!(t.permute(&[1, 0], 3).is_err());
    let other = counting(
        vec![Bond::new(BondType::In, 2).unwrap(), Bond::new(BondType::Out, 2).unwrap()],
        vec![1, 2],
    );
    assert!(matches!(
        t.contract(&other),
        Err(TensorError::BondDimensionMismatch { label: 1, left: 3, right: 2 })
    ));
    assert_eq!(t, before);
}

fn assert_close(a: &Tensor<f64>, b: &Tensor<f64>) {
    assert_eq!(a.labels(), b.labels());
    assert_eq!(a.bonds(), b.bonds());
    for (x, y) in a.raw_elem().iter().zip(b.raw_elem()) {
        assert!((x - y).abs() < 1e-12, "{x} != {y}");
    }
}

#[test]
fn test_diagonal_operands_match_dense() {
    let bi = u1_bond(BondType::In, &[(0, 2), (1, 3)]);
    let bo = bi.dummy_change(BondType::Out);
    let mut d = Tensor::<f64>::diagonal(vec![bi.clone(), bo.clone()]).unwrap();
    d.randomize(&mut StdRng::seed_from_u64(21));
    assert_eq!(d.elem_num(), 5);
    let dense = d.to_dense();

    let mut m = Tensor::<f64>::with_labels(vec![bi, bo], vec![1, 2]).unwrap();
    m.randomize(&mut StdRng::seed_from_u64(22));

    // diagonal x dense
    assert_close(&contract(&d, &m).unwrap(), &contract(&dense, &m).unwrap());

    // dense x diagonal
    let mut left = m.clone();
    left.set_labels(&[2, 0]).unwrap();
    assert_close(&contract(&left, &d).unwrap(), &contract(&left, &dense).unwrap());

    // no shared label
    let mut apart = m.clone();
    apart.set_labels(&[2, 3]).unwrap();
    let outer = contract(&d, &apart).unwrap();
    assert_eq!(outer.labels(), &[0, 1, 2, 3]);
    assert_close(&outer, &contract(&dense, &apart).unwrap());
}

#[test]
fn test_partial_trace_label_order() {
    let bi = u1_bond(BondType::In, &[(1, 1), (0, 2)]);
    let bo = bi.dummy_change(BondType::Out);
    let mut t = Tensor::<f64>::new(vec![bi.clone(), bi, bo.clone(), bo]).unwrap();
    t.randomize(&mut StdRng::seed_from_u64(31));

    let forward = t.partial_trace(1, 3).unwrap();
    let backward = t.partial_trace(3, 1).unwrap();
    assert_close(&backward, &forward);
    assert_eq!(forward.labels(), &[0, 2]);
    for i in 0..3 {
        for j in 0..3 {
            let expected: f64 = (0..3).map(|k| t.at(&[i, k, j, k]).unwrap()).sum();
            assert!((forward.at(&[i, j]).unwrap() - expected).abs() < 1e-12);
        }
    }

    // both incoming with charges that do not pair up
    assert!(matches!(t.partial_trace(0, 1), Err(TensorError::BondMismatch { .. })));
}

#[test]
fn test_charge_overflow_is_rejected() {
    let big = Bond::from_qnums(BondType::In, &[Qnum::new(i32::MAX)]).unwrap();
    let out = big.dummy_change(BondType::Out);
    let err = Tensor::<f64>::new(vec![big.clone(), big, out.clone(), out]).unwrap_err();
    assert_eq!(err.kind(), symtensor::ErrorKind::Configuration);
}
