use dqmc_lattice::{BondDirection, MomentumProduct, SiteIndexing, SquareLattice};
use proptest::prelude::*;

#[test]
fn index_layout_is_row_major_in_x() {
    let lattice = SquareLattice::new(4).unwrap();
    assert_eq!(lattice.site_index([2, 3]), 14);
    assert_eq!(lattice.site_coords(11), [3, 2]);
    assert_eq!(lattice.num_sites(), 16);
}

#[test]
fn tiny_lattices_are_rejected() {
    let err = SquareLattice::new(1).unwrap_err();
    assert_eq!(err.info().code, "invalid-parameter");
}

#[test]
fn hopping_matrix_is_symmetric_with_four_neighbours() {
    for side in [2, 3, 4, 6] {
        let lattice = SquareLattice::new(side).unwrap();
        let hopping = lattice.hopping_matrix();
        assert_eq!(hopping, hopping.transpose());
        for row in 0..lattice.num_sites() {
            assert_eq!(hopping.row(row).sum(), 4.0);
            assert_eq!(hopping[(row, row)], 0.0);
        }
    }
}

#[test]
fn checkerboard_groups_partition_bonds_into_disjoint_sets() {
    let lattice = SquareLattice::new(4).unwrap();
    let groups = lattice.checkerboard_groups().unwrap();
    let total: usize = groups.iter().map(Vec::len).sum();
    assert_eq!(total, 2 * lattice.num_sites());
    for group in &groups {
        let mut touched = vec![false; lattice.num_sites()];
        for bond in group {
            assert!(!touched[bond.from] && !touched[bond.to]);
            touched[bond.from] = true;
            touched[bond.to] = true;
        }
    }
    assert!(groups[0].iter().all(|b| b.direction == BondDirection::X));
    assert!(groups[3].iter().all(|b| b.direction == BondDirection::Y));
}

#[test]
fn checkerboard_requires_even_side() {
    let lattice = SquareLattice::new(3).unwrap();
    assert!(lattice.checkerboard_groups().is_err());
}

#[test]
fn momentum_product_is_euclidean() {
    let lattice = SquareLattice::new(4).unwrap();
    let value = lattice.product([1.0, 2.0], [std::f64::consts::PI, 0.5]);
    assert!((value - (std::f64::consts::PI + 1.0)).abs() < 1e-12);
}

proptest! {
    #[test]
    fn coords_roundtrip(side in 2usize..12, raw in any::<usize>()) {
        let lattice = SquareLattice::new(side).unwrap();
        let index = raw % lattice.num_sites();
        prop_assert_eq!(lattice.site_index(lattice.site_coords(index)), index);
    }

    #[test]
    fn shift_by_side_is_identity(side in 2usize..12, raw in any::<usize>(), dx in 0usize..12, dy in 0usize..12) {
        let lattice = SquareLattice::new(side).unwrap();
        let index = raw % lattice.num_sites();
        let moved = lattice.shift(index, dx, dy);
        prop_assert_eq!(lattice.shift(moved, side - dx % side, side - dy % side), index);
    }
}
