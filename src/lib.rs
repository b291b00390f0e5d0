//! An adaptively-subdivided octree over weighted point elements, with
//! nearest-neighbor lookup, radius-bounded enumeration, and a
//! Barnes-Hut-style scale-dependent convolution walk suitable for fast
//! N-body-style summations (electrostatic potential, gravity, and
//! similar pairwise fields).
//!
//! The tree itself knows nothing about what a "field" or "force" is:
//! [`Convolution`] is generic over both the accumulator type and the
//! visitor callable, so any pairwise summation that can be expressed as
//! `target, source_center, source_mass -> R` can ride the same
//! acceptance criterion and work-list walk.
//!
//! See `tests/octree_tests.rs` and `tests/convolution_tests.rs` for
//! worked examples of both kinds of query.

mod convolution;
mod element;
mod error;
mod node;
mod scale;
mod subdivision;
mod tree;

pub use convolution::{Convolution, Visitor};
pub use element::Element;
pub use error::OctreeError;
pub use node::{DistToNode, Node};
pub use scale::{DiscreteScale, LinearScale, ScaleConfig};
pub use subdivision::SubdivisionKey;
pub use tree::{MassUpdatingGuard, Tree};

/// The tree's position/vector primitive.
pub type Position = lin_alg::f64::Vec3;

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn basic_subdivision_matches_scenario_2() {
        let mut tree = Tree::new(Position::new(0.0, 0.0, 0.0), 2.0).unwrap();

        let a = Element::new(Position::new(-0.01, -0.01, -0.01), 1.0);
        let b = Element::new(Position::new(0.01, 0.01, 0.01), 1.0);
        tree.add(a).unwrap();
        tree.add(b).unwrap();

        let root = tree.root().unwrap();
        let root = root.borrow();
        assert!(root.children[0].is_some());
        assert!(root.children[7].is_some());
        for i in 1..7 {
            assert!(root.children[i].is_none());
        }
        drop(root);

        let c = Element::new(Position::new(-0.011, -0.011, -0.011), 1.0);
        tree.add(c).unwrap();
        assert_eq!(tree.count(), 3);

        let root = tree.root().unwrap();
        let child0 = root.borrow().children[0].clone().unwrap();
        let child0 = child0.borrow();
        assert!(child0.children[7].is_some());
        for i in 0..7 {
            assert!(child0.children[i].is_none());
        }
    }

    #[test]
    fn coincident_points_are_rejected_and_tree_stays_consistent() {
        let mut tree = Tree::new(Position::new(0.0, 0.0, 0.0), 2.0).unwrap();
        let a = Element::new(Position::new(0.1, 0.1, 0.1), 1.0);
        tree.add(a).unwrap();

        let b = Element::new(Position::new(0.1, 0.1, 0.1), 2.0);
        let err = tree.add(b).unwrap_err();
        assert!(matches!(err, OctreeError::CoincidentPoints(_)));
        assert_eq!(tree.count(), 1);
    }

    #[test]
    fn root_growth_matches_scenario_3() {
        let mut tree = Tree::new(Position::new(0.0, 0.0, 0.0), 2.0).unwrap();
        let e = Element::new(Position::new(2.0, 2.0, 2.0), 1.0);
        tree.add(e).unwrap();

        assert_eq!(tree.count(), 1);
        let root = tree.root().unwrap();
        let root = root.borrow();
        assert_eq!(root.center, Position::new(1.0, 1.0, 1.0));
        assert!(root.children[0].is_some());
        assert!(root.children[7].is_some());
        for i in 1..7 {
            assert!(root.children[i].is_none());
        }
    }

    #[test]
    fn mass_centers_match_scenario_4() {
        let mut tree = Tree::new(Position::new(0.0, 0.0, 0.0), 100.0).unwrap();
        tree.add(Element::new(Position::new(2.0, 2.0, -8.0), 1.0)).unwrap();
        tree.add(Element::new(Position::new(0.0, 0.0, 0.0), 1.0)).unwrap();
        tree.add(Element::new(Position::new(7.0, 10.0, -4.0), 1.0)).unwrap();
        assert_eq!(tree.mass_center().unwrap(), Position::new(3.0, 4.0, -4.0));

        let mut tree2 = Tree::new(Position::new(0.0, 0.0, 0.0), 100.0).unwrap();
        tree2.add(Element::new(Position::new(2.0, 3.0, -8.0), 3.0)).unwrap();
        tree2.add(Element::new(Position::new(0.0, 0.0, 0.0), 1.0)).unwrap();
        tree2.add(Element::new(Position::new(7.0, 10.0, -4.0), 1.0)).unwrap();
        let c = tree2.mass_center().unwrap();
        assert!((c.x - 2.6).abs() < 1e-10);
        assert!((c.y - 3.8).abs() < 1e-10);
        assert!((c.z - (-5.6)).abs() < 1e-10);
    }

    #[test]
    fn guard_idempotence_matches_scenario_8() {
        let mut tree = Tree::new(Position::new(0.0, 0.0, 0.0), 1.0).unwrap();
        {
            let guard = tree.mute_mass_updating();
            drop(guard);
        }

        let mut tree_muted = Tree::with_size(20.0).unwrap();
        {
            let guard = tree_muted.mute_mass_updating();
            let n = 10;
            for i in 0..n {
                for j in 0..n {
                    for k in 0..n {
                        let p = Position::new(
                            -0.5 + 1.0 / (n as f64 - 1.0) * i as f64,
                            -0.5 + 1.0 / (n as f64 - 1.0) * j as f64,
                            -0.5 + 1.0 / (n as f64 - 1.0) * k as f64,
                        );
                        tree_muted.add(Element::new(p, 1.0)).unwrap();
                    }
                }
            }
            guard.unmute();
        }
        assert_eq!(tree_muted.count(), 1000);
        assert!((tree_muted.mass() - 1000.0).abs() < 1e-6);
        let c = tree_muted.mass_center().unwrap();
        assert!(c.x.abs() < 1e-10);
        assert!(c.y.abs() < 1e-10);
        assert!(c.z.abs() < 1e-10);

        // Double-release must be a no-op: dropping after an explicit unmute
        // should not attempt a second full recompute.
        let mut tree_double = Tree::new(Position::new(0.0, 0.0, 0.0), 1.0).unwrap();
        tree_double.add(Element::new(Position::new(0.1, 0.1, 0.1), 1.0)).unwrap();
        let guard = tree_double.mute_mass_updating();
        guard.unmute();
    }

    #[test]
    fn clear_drops_tree_side_element_handles() {
        let mut tree = Tree::new(Position::new(0.0, 0.0, 0.0), 2.0).unwrap();
        let e = Element::new(Position::new(0.1, 0.1, 0.1), 1.0);
        tree.add(e.clone()).unwrap();
        assert_eq!(Rc::strong_count(&e), 2);

        tree.clear();
        assert_eq!(Rc::strong_count(&e), 1);
        assert_eq!(tree.count(), 0);
    }

    #[test]
    fn empty_tree_nearest_is_an_error() {
        let tree = Tree::new(Position::new(0.0, 0.0, 0.0), 2.0).unwrap();
        assert!(matches!(
            tree.get_nearest(Position::new(0.0, 0.0, 0.0)),
            Err(OctreeError::EmptyTree)
        ));
    }

    #[test]
    fn invalid_size_is_rejected() {
        assert!(matches!(
            Tree::new(Position::new(0.0, 0.0, 0.0), 0.0),
            Err(OctreeError::InvalidConfig(_))
        ));
        assert!(matches!(Tree::with_size(-1.0), Err(OctreeError::InvalidConfig(_))));
    }
}
