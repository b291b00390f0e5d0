//! Shared test helpers: a regular point-grid generator and brute-force
//! nearest/Coulomb oracles.

use octree_bh::{Element, Position, Tree};

/// Fill `tree` with an `n`-per-side grid of unit-mass points spanning
/// `size` on each axis, centered at the origin. Inserts under a
/// [`octree_bh::MassUpdatingGuard`] so the bulk insert pays for one
/// aggregate recompute instead of `n^3`.
pub fn add_grid(n: usize, size: f64, tree: &mut Tree, positions: &mut Vec<Position>) {
    let guard = tree.mute_mass_updating();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let p = Position::new(
                    -size / 2.0 + size / (n as f64 - 1.0) * i as f64,
                    -size / 2.0 + size / (n as f64 - 1.0) * j as f64,
                    -size / 2.0 + size / (n as f64 - 1.0) * k as f64,
                );
                tree.add(Element::new(p, 1.0)).unwrap();
                positions.push(p);
            }
        }
    }
    guard.unmute();
}

pub fn find_nearest_brute_force(pos: Position, positions: &[Position]) -> Position {
    let mut best = positions[0];
    let mut best_dist = (best - pos).magnitude();
    for &p in &positions[1..] {
        let d = (p - pos).magnitude();
        if d < best_dist {
            best_dist = d;
            best = p;
        }
    }
    best
}

pub fn coulomb_brute_force(target: Position, positions: &[Position]) -> f64 {
    positions.iter().map(|&p| 1.0 / (target - p).magnitude()).sum()
}
