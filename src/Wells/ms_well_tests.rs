use super::errors::WellError;
use super::ms_well_equations::{MultisegmentWellEquations, WellSystemState};
use super::segment_topology::{MultisegmentWellTopology, Segment};
use nalgebra::{SMatrix, SVector};

const NUM_EQ: usize = 2;
const NUM_WELL_EQ: usize = 3;
const NUM_CELLS: usize = 5;

type WellEquations = MultisegmentWellEquations<NUM_EQ, NUM_WELL_EQ>;

/// top segment 1 with the two children 2 and 3, one perforation each
fn three_segment_topology() -> MultisegmentWellTopology {
    MultisegmentWellTopology::new(vec![
        Segment::new(1, 0, vec![0]),
        Segment::new(2, 1, vec![1]),
        Segment::new(3, 1, vec![2]),
    ])
    .unwrap()
}

const CELLS: [usize; 3] = [4, 1, 2];

fn initialized() -> WellEquations {
    let mut eqs = WellEquations::new(three_segment_topology());
    eqs.init(NUM_CELLS, 3, &CELLS).unwrap();
    eqs
}

fn block<const R: usize, const C: usize>(seed: f64) -> SMatrix<f64, R, C> {
    SMatrix::<f64, R, C>::from_fn(|i, j| ((seed + 1.7 * i as f64 - 0.9 * j as f64) * 0.37).sin())
}

fn assemble(eqs: &mut WellEquations) {
    let d_entries = [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (2, 0), (2, 2)];
    for (k, &(row, col)) in d_entries.iter().enumerate() {
        let mut value = 0.3 * block::<NUM_WELL_EQ, NUM_WELL_EQ>(k as f64);
        if row == col {
            value += SMatrix::<f64, NUM_WELL_EQ, NUM_WELL_EQ>::identity() * 4.0;
        }
        eqs.add_d(row, col, &value).unwrap();
    }
    for (seg, &cell) in CELLS.iter().enumerate() {
        eqs.add_b(seg, cell, &block::<NUM_WELL_EQ, NUM_EQ>(10.0 + seg as f64)).unwrap();
        eqs.add_c(seg, cell, &block::<NUM_WELL_EQ, NUM_EQ>(20.0 + seg as f64)).unwrap();
        eqs.add_residual(seg, &SVector::<f64, NUM_WELL_EQ>::from_fn(|i, _| 0.5 - 0.2 * (seg + i) as f64))
            .unwrap();
    }
}

fn reservoir_vector(seed: f64) -> Vec<SVector<f64, NUM_EQ>> {
    (0..NUM_CELLS)
        .map(|cell| SVector::<f64, NUM_EQ>::from_fn(|i, _| seed * (cell as f64 + 1.0) - 0.4 * i as f64))
        .collect()
}

fn flat(v: &[SVector<f64, NUM_EQ>]) -> nalgebra::DVector<f64> {
    crate::Numerics::block_sparse::flatten(v)
}

#[test]
fn topology_builds_inlets_and_outlets() {
    let topology = three_segment_topology();
    assert_eq!(topology.number_of_segments(), 3);
    assert_eq!(topology.number_of_perforations(), 3);
    assert_eq!(topology.segment_inlets()[0], vec![1, 2]);
    assert!(topology.segment_inlets()[1].is_empty());
    assert_eq!(topology.outlet_index(0), None);
    assert_eq!(topology.outlet_index(2), Some(0));
    assert_eq!(topology.segment_number_to_index(3), Some(2));
    assert_eq!(topology.segment_perforations(1), &[1]);
}

#[test]
fn invalid_topologies_are_rejected() {
    let cases = vec![
        vec![],
        vec![Segment::new(2, 0, vec![])],
        vec![Segment::new(1, 0, vec![]), Segment::new(2, 5, vec![])],
        vec![Segment::new(1, 0, vec![]), Segment::new(1, 1, vec![])],
        vec![Segment::new(1, 0, vec![]), Segment::new(2, 0, vec![])],
        vec![Segment::new(1, 0, vec![]), Segment::new(2, 3, vec![]), Segment::new(3, 2, vec![])],
        vec![Segment::new(1, 0, vec![0]), Segment::new(2, 1, vec![0])],
    ];
    for segments in cases {
        assert!(matches!(
            MultisegmentWellTopology::new(segments),
            Err(WellError::Topology(_))
        ));
    }
}

#[test]
fn sparsity_follows_the_segment_tree() {
    let eqs = initialized();
    assert_eq!(eqs.state(), WellSystemState::Initialized);
    // one block per segment plus two per inlet relation
    assert_eq!(eqs.d().nnz(), 3 + 2 * 2);
    assert_eq!(eqs.d().row_pattern(0), &[0, 1, 2]);
    assert_eq!(eqs.d().row_pattern(1), &[0, 1]);
    assert_eq!(eqs.d().row_pattern(2), &[0, 2]);
    assert_eq!(eqs.b().row_pattern(0), &[4]);
    assert_eq!(eqs.c().row_pattern(1), &[1]);
    assert_eq!(eqs.b().num_cols(), NUM_CELLS);
}

#[test]
fn init_checks_perforation_cells() {
    let mut eqs = WellEquations::new(three_segment_topology());
    assert!(matches!(eqs.init(NUM_CELLS, 3, &[0, 1]), Err(WellError::DimensionMismatch(_))));
    assert!(matches!(eqs.init(NUM_CELLS, 3, &[0, 1, 7]), Err(WellError::DimensionMismatch(_))));
    assert_eq!(eqs.state(), WellSystemState::Uninitialized);
    assert!(eqs.clear().is_err());
}

#[test]
fn writes_outside_the_pattern_fail() {
    let mut eqs = initialized();
    let d = SMatrix::<f64, NUM_WELL_EQ, NUM_WELL_EQ>::identity();
    let b = SMatrix::<f64, NUM_WELL_EQ, NUM_EQ>::zeros();
    assert_eq!(
        eqs.add_d(1, 2, &d),
        Err(WellError::PatternViolation { matrix: "D", row: 1, col: 2 })
    );
    assert_eq!(
        eqs.add_b(0, 1, &b),
        Err(WellError::PatternViolation { matrix: "B", row: 0, col: 1 })
    );
    assert!(eqs.add_residual(3, &SVector::zeros()).is_err());
}

#[cfg(feature = "direct-solver")]
mod direct {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn apply_matches_the_exact_schur_complement() {
        let mut eqs = initialized();
        assemble(&mut eqs);
        assert_eq!(eqs.state(), WellSystemState::Assembled);
        eqs.create_solver().unwrap();
        assert_eq!(eqs.state(), WellSystemState::Factorized);

        let d_inv = eqs.d().to_dense().try_inverse().unwrap();
        let b = eqs.b().to_dense();
        let c = eqs.c().to_dense();

        let x = reservoir_vector(0.3);
        let mut ax = reservoir_vector(-1.1);
        let expected = flat(&ax) - c.transpose() * &d_inv * &b * flat(&x);
        eqs.apply(&x, &mut ax).unwrap();
        assert_relative_eq!(flat(&ax), expected, epsilon = 1e-12);

        let mut r = reservoir_vector(0.7);
        let res_well = crate::Numerics::block_sparse::flatten(eqs.residual());
        let expected = flat(&r) - c.transpose() * &d_inv * &res_well;
        eqs.apply_residual(&mut r).unwrap();
        assert_relative_eq!(flat(&r), expected, epsilon = 1e-12);
        // cells without perforations are untouched
        assert_eq!(r[0], reservoir_vector(0.7)[0]);
        assert_eq!(r[3], reservoir_vector(0.7)[3]);
    }

    #[test]
    fn solve_and_recover_well_solution() {
        let mut eqs = initialized();
        assemble(&mut eqs);
        eqs.create_solver().unwrap();
        let d_inv = eqs.d().to_dense().try_inverse().unwrap();
        let b = eqs.b().to_dense();
        let res_well = crate::Numerics::block_sparse::flatten(eqs.residual());

        let x = reservoir_vector(0.25);
        let recovered = eqs.recover_solution_well(&x).unwrap();
        let expected = &d_inv * (&res_well - &b * flat(&x));
        assert_relative_eq!(crate::Numerics::block_sparse::flatten(&recovered), expected, epsilon = 1e-12);

        let dx_well = eqs.solve().unwrap();
        assert_relative_eq!(
            crate::Numerics::block_sparse::flatten(&dx_well),
            &d_inv * &res_well,
            epsilon = 1e-12
        );
        assert_eq!(eqs.state(), WellSystemState::Solved);
    }

    #[test]
    fn lifecycle_is_enforced() {
        let mut eqs = initialized();
        assemble(&mut eqs);
        let x = reservoir_vector(1.0);
        let mut ax = reservoir_vector(0.0);
        assert!(matches!(eqs.apply(&x, &mut ax), Err(WellError::InvalidState { .. })));

        eqs.create_solver().unwrap();
        // second call keeps the factorization
        eqs.create_solver().unwrap();
        assert!(matches!(
            eqs.add_d(0, 0, &SMatrix::identity()),
            Err(WellError::InvalidState { .. })
        ));
        assert!(matches!(
            eqs.apply(&x[..2], &mut ax),
            Err(WellError::DimensionMismatch(_))
        ));

        eqs.clear().unwrap();
        assert_eq!(eqs.state(), WellSystemState::Initialized);
        assert!(eqs.residual().iter().all(|r| r.iter().all(|v| *v == 0.0)));
        assert_eq!(eqs.d().block(0, 0).unwrap(), &SMatrix::<f64, NUM_WELL_EQ, NUM_WELL_EQ>::zeros());
        assert!(matches!(eqs.apply_residual(&mut ax), Err(WellError::InvalidState { .. })));
        // zero D cannot be factorized
        assert_eq!(eqs.create_solver(), Err(WellError::SingularMatrix));

        assemble(&mut eqs);
        eqs.create_solver().unwrap();
        assert!(eqs.apply(&x, &mut ax).is_ok());
    }
}

#[cfg(not(feature = "direct-solver"))]
#[test]
fn factorization_requires_the_direct_solver() {
    let mut eqs = initialized();
    assemble(&mut eqs);
    assert_eq!(eqs.create_solver(), Err(WellError::MissingDirectSolver));
}
