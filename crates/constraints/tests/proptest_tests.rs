//! Property-based tests of constraint values and sensitivities using the `proptest` crate.

use proptest::prelude::*;

use dvcon_constraints::{
    ConstraintOptions, DvConstraints, LeTeSpec, LinearParameterization, LocalShapeGroup,
    Sensitivity,
};
use dvcon_kernel::{Point3d, TriangleSoup, Vec3};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Values of the `thick`, `bend` and `shear` global variables.
fn arb_design() -> impl Strategy<Value = [f64; 3]> {
    (-0.4f64..0.4, -0.5f64..0.5, -0.5f64..0.5).prop_map(|(a, b, c)| [a, b, c])
}

/// Sampling resolution of the 2-D grids.
fn arb_grid_size() -> impl Strategy<Value = (usize, usize)> {
    (2usize..5, 2usize..5)
}

/// Two planes `y = top` and `y = bottom` over x, z in [-1.3, 3.1] x [-2.2, 2.3].
fn slab(top: f64, bottom: f64) -> TriangleSoup {
    let mut p0 = Vec::new();
    let mut v1 = Vec::new();
    let mut v2 = Vec::new();
    for y in [top, bottom] {
        let a = Point3d::new(-1.3, y, -2.2);
        let b = Point3d::new(3.1, y, -2.2);
        let c = Point3d::new(-1.3, y, 2.3);
        let d = Point3d::new(3.1, y, 2.3);
        p0.extend([a, d]);
        v1.extend([b - a, c - d]);
        v2.extend([c - a, b - d]);
    }
    TriangleSoup::from_parts(p0, v1, v2).unwrap()
}

fn parameterization() -> LinearParameterization {
    let mut geo = LinearParameterization::new();
    geo.add_global_var("thick", |p: &Point3d| Vec3::new(0.0, p.y, 0.0))
        .add_global_var("bend", |p: &Point3d| {
            Vec3::new(0.1 * p.z, 0.2 * p.x * p.y + 0.05 * p.z * p.z, 0.1 * p.x)
        })
        .add_global_var("shear", |p: &Point3d| Vec3::new(0.3 * p.y, 0.0, -0.1 * p.y));
    geo
}

const NAMES: [&str; 3] = ["thick", "bend", "shear"];

fn set_design(dvcon: &mut DvConstraints<LinearParameterization>, x: [f64; 3]) {
    let geo = dvcon.geometry_mut().unwrap();
    for (name, v) in NAMES.iter().zip(x) {
        geo.set_design_vars(name, &[v]).unwrap();
    }
}

/// A registry holding one set of every geometric kind.
fn populated(
    top: f64,
    bottom: f64,
    n_span: usize,
    n_chord: usize,
) -> DvConstraints<LinearParameterization> {
    let le = vec![Point3d::new(0.0, 0.0, 0.0), Point3d::new(0.2, 0.0, 1.0)];
    let te = vec![Point3d::new(1.0, 0.0, 0.0), Point3d::new(0.9, 0.0, 1.0)];
    let opts = ConstraintOptions::default();

    let mut dvcon = DvConstraints::new();
    dvcon.set_surface(slab(top, bottom));
    dvcon.set_geometry(parameterization());
    dvcon.add_thickness_constraints_2d(&le, &te, n_span, n_chord, &opts).unwrap();
    dvcon
        .add_thickness_constraints_1d(&te, n_span, Vec3::Y, &opts.clone().unscaled())
        .unwrap();
    dvcon
        .add_thickness_to_chord_constraints_1d(&le, n_chord, Vec3::Y, Vec3::X, &opts)
        .unwrap();
    dvcon.add_volume_constraint(&le, &te, n_span, n_chord, &opts).unwrap();
    dvcon
}

// ---------------------------------------------------------------------------
// 1. Analytic sensitivities match central differences at random designs
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn sensitivities_match_central_differences(
        x in arb_design(),
        (n_span, n_chord) in arb_grid_size(),
        top in 0.2f64..0.8,
        bottom in -0.8f64..-0.2,
    ) {
        let mut dvcon = populated(top, bottom, n_span, n_chord);
        set_design(&mut dvcon, x);
        let sens = dvcon.evaluate_all_sensitivities(false).unwrap();
        prop_assert_eq!(sens.len(), 4);

        let h = 1e-6;
        for k in 0..3 {
            let mut xp = x;
            xp[k] += h;
            set_design(&mut dvcon, xp);
            let plus = dvcon.evaluate_all(false).unwrap();
            let mut xm = x;
            xm[k] -= h;
            set_design(&mut dvcon, xm);
            let minus = dvcon.evaluate_all(false).unwrap();

            for (name, s) in &sens {
                let Sensitivity::Dense(m) = s else {
                    return Err(TestCaseError::fail(format!("{name} is not dense")));
                };
                prop_assert_eq!(m.ncols(), 3);
                for row in 0..m.nrows() {
                    let fd = (plus[name][row] - minus[name][row]) / (2.0 * h);
                    let g = m[(row, k)];
                    prop_assert!(
                        (g - fd).abs() <= 1e-6 * g.abs().max(1.0),
                        "{}[{}] wrt {}: analytic {} vs fd {}", name, row, NAMES[k], g, fd
                    );
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Scaled sets start at one for any slab and resolution
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn scaled_sets_start_at_one(
        (n_span, n_chord) in arb_grid_size(),
        top in 0.2f64..0.8,
        bottom in -0.8f64..-0.2,
    ) {
        let dvcon = populated(top, bottom, n_span, n_chord);
        let values = dvcon.evaluate_all(false).unwrap();
        for name in [
            "thickness_constraints_0",
            "thickness_to_chord_constraints_2",
            "volume_constraint_0",
        ] {
            for v in &values[name] {
                prop_assert_eq!(*v, 1.0, "{} starts at {}", name, v);
            }
        }
        for v in &values["thickness_constraints_1"] {
            prop_assert!((v - (top - bottom)).abs() < 1e-12);
        }
    }
}

// ---------------------------------------------------------------------------
// 3. LE/TE values are the pairwise sums of the local variables
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn lete_values_are_pair_sums(
        values in prop::collection::vec(-1.0f64..1.0, 6),
    ) {
        let mut dvcon = DvConstraints::new();
        dvcon.set_surface(slab(0.5, -0.5));
        let mut geo = LinearParameterization::new();
        geo.add_local_group(LocalShapeGroup::new("shape", vec![10, 11, 12, 13, 14, 15]));
        geo.set_design_vars("shape", &values).unwrap();
        dvcon.set_geometry(geo);

        let spec = LeTeSpec::IndexSets { a: vec![10, 12, 14], b: vec![11, 13, 15] };
        let name = dvcon.add_lete_constraints(&spec, None).unwrap().to_string();
        let got = &dvcon.evaluate_all(true).unwrap()[&name];
        prop_assert_eq!(got.len(), 3);
        for (row, v) in got.iter().enumerate() {
            let expected = values[2 * row] + values[2 * row + 1];
            prop_assert!((v - expected).abs() < 1e-15);
        }
    }
}
