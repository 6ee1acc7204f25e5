//! Tensor files and serde round trips.

use num_complex::Complex64;
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use symtensor::{Bond, BondType, ErrorKind, Parity, Qnum, Tensor};

fn spin_bonds() -> Vec<Bond> {
    let bi = Bond::from_qnums(BondType::In, &[Qnum::new(1), Qnum::new(-1)]).unwrap();
    let bo = bi.dummy_change(BondType::Out);
    vec![bi.clone(), bi, bo.clone(), bo]
}

#[test]
fn test_file_round_trip() {
    let mut t = Tensor::<f64>::with_labels(spin_bonds(), vec![-1, 3, 7, 9]).unwrap();
    t.set_name("H");
    t.randomize(&mut StdRng::seed_from_u64(1));

    let path = std::env::temp_dir().join(format!("symtensor-{}-round-trip.bin", std::process::id()));
    t.save_file(&path).unwrap();
    let back = Tensor::<f64>::load_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(back.name(), "H");
    assert_eq!(back.labels(), &[-1, 3, 7, 9]);
    assert_eq!(back, t);
}

#[test]
fn test_fermionic_complex_round_trip() {
    let odd = Qnum::fermionic(Parity::Odd, 1, Parity::Even);
    let b = Bond::from_degeneracies(BondType::In, &[(Qnum::default(), 2), (odd, 1)]).unwrap();
    let mut t = Tensor::<Complex64>::new(vec![b.clone(), b.dummy_change(BondType::Out)]).unwrap();
    t.randomize(&mut StdRng::seed_from_u64(5));

    let mut buf = Vec::new();
    t.save(&mut buf).unwrap();
    let back = Tensor::<Complex64>::load(&mut buf.as_slice()).unwrap();
    assert_eq!(back, t);
    assert!(back.symmetry().is_fermionic());
}

#[test]
fn test_missing_file_is_io_error() {
    let err = Tensor::<f64>::load_file("/nonexistent/symtensor/tensor.bin").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_bond_serde_round_trip() {
    let bond = spin_bonds().remove(2);
    let json = serde_json::to_string(&bond).unwrap();
    let back: Bond = serde_json::from_str(&json).unwrap();
    assert_eq!(back, bond);

    let q = Qnum::fermionic(Parity::Odd, -2, Parity::Odd);
    let back: Qnum = serde_json::from_str(&serde_json::to_string(&q).unwrap()).unwrap();
    assert_eq!(back, q);
}
