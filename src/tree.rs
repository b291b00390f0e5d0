use std::cell::RefCell;
use std::rc::Rc;

use crate::element::Element;
use crate::error::OctreeError;
use crate::node::{DistToNode, Node};
use crate::subdivision::SubdivisionKey;
use crate::Position;

/// The octree itself. Owns the root [`Node`] (if any), grows it on
/// demand, and delegates the nearest-neighbor and radius queries.
#[derive(Debug)]
pub struct Tree {
    root: Option<Rc<RefCell<Node>>>,
    center: Position,
    initial_size: f64,
    center_is_set: bool,
    mass_updating_enabled: bool,
}

impl Tree {
    /// Construct an empty tree with a fixed center.
    pub fn new(center: Position, initial_size: f64) -> Result<Self, OctreeError> {
        if initial_size <= 0.0 {
            return Err(OctreeError::InvalidConfig("initial_size must be positive"));
        }
        Ok(Self {
            root: None,
            center,
            initial_size,
            center_is_set: true,
            mass_updating_enabled: true,
        })
    }

    /// Construct an empty tree whose center is chosen from the first
    /// inserted element's position.
    pub fn with_size(initial_size: f64) -> Result<Self, OctreeError> {
        if initial_size <= 0.0 {
            return Err(OctreeError::InvalidConfig("initial_size must be positive"));
        }
        Ok(Self {
            root: None,
            center: Position::new_zero(),
            initial_size,
            center_is_set: false,
            mass_updating_enabled: true,
        })
    }

    pub fn add(&mut self, e: Rc<Element>) -> Result<(), OctreeError> {
        if self.root.is_none() {
            if !self.center_is_set {
                // Offset the auto-selected center away from the first point so it
                // never lands exactly on a future subdivision plane.
                let mut c = e.position;
                c.x -= self.initial_size * 0.13;
                c.y -= self.initial_size * 0.13;
                c.z -= self.initial_size * 0.13;
                self.center = c;
                self.center_is_set = true;
            }
            self.root = Some(Node::new_root(self.center, self.initial_size));
            log::trace!("octree root created at {:?}, size {}", self.center, self.initial_size);
        }

        while !self.root.as_ref().unwrap().borrow().is_inside(e.position) {
            self.enlarge_root(e.position);
        }

        let root = self.root.as_ref().unwrap().clone();
        Node::add_element(&root, e, self.mass_updating_enabled)
    }

    fn enlarge_root(&mut self, p: Position) {
        let old_root = self.root.take().expect("enlarge_root requires an existing root");
        let (old_center, old_size, old_level) = {
            let r = old_root.borrow();
            (r.center, r.size, r.level)
        };

        let dcx = old_size / 2.0;
        let new_center = Position::new(
            old_center.x + if p.x > old_center.x { dcx } else { -dcx },
            old_center.y + if p.y > old_center.y { dcx } else { -dcx },
            old_center.z + if p.z > old_center.z { dcx } else { -dcx },
        );

        let key = SubdivisionKey::new(new_center, old_center);
        let new_root = Node::new_root(new_center, old_size * 2.0);
        {
            let mut nr = new_root.borrow_mut();
            nr.level = old_level - 1;
            nr.children[key.index()] = Some(old_root.clone());
        }
        {
            let mut old = old_root.borrow_mut();
            old.subdivision_key = key;
        }
        Node::reparent(&old_root, &new_root);

        if self.mass_updating_enabled {
            // The new root has exactly one non-empty child; fold its aggregate up.
            Node::update_mass_center_recursive_up(&new_root);
        }

        log::debug!("octree root enlarged to size {}", old_size * 2.0);
        self.root = Some(new_root);
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.center_is_set = false;
    }

    pub fn count(&self) -> usize {
        self.root.as_ref().map(|r| r.borrow().elements_count()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<Rc<RefCell<Node>>> {
        self.root.clone()
    }

    pub fn mass(&self) -> f64 {
        self.root.as_ref().map(|r| r.borrow().mass).unwrap_or(0.0)
    }

    pub fn mass_center(&self) -> Option<Position> {
        self.root.as_ref().map(|r| r.borrow().mass_center)
    }

    /// Best-first nearest-neighbor search with live pruning (see
    /// the crate-level docs for the two-phase-per-iteration contract).
    pub fn get_nearest(&self, p: Position) -> Result<Rc<Element>, OctreeError> {
        let root = self.root.clone().ok_or(OctreeError::EmptyTree)?;
        let root_dist = root.borrow().dists_to_node(p);
        let mut frontier: Vec<(Rc<RefCell<Node>>, DistToNode)> = vec![(root, root_dist)];

        loop {
            if frontier.len() == 1 && frontier[0].0.borrow().element.is_some() {
                let found = frontier[0].0.borrow().element.clone().unwrap();
                return Ok(found);
            }

            let min_farthest = frontier
                .iter()
                .map(|(_, d)| d.farthest)
                .fold(f64::INFINITY, f64::min);
            frontier.retain(|(_, d)| d.nearest <= min_farthest);

            let mut next = Vec::with_capacity(frontier.len() * 2);
            for (node, dist) in frontier {
                let is_leaf = node.borrow().element.is_some();
                if is_leaf {
                    next.push((node, dist));
                    continue;
                }
                let children: Vec<_> = node.borrow().children.iter().flatten().cloned().collect();
                for child in children {
                    let d = child.borrow().dists_to_node(p);
                    next.push((child, d));
                }
            }
            frontier = next;
        }
    }

    /// Enumerate every element within `r` of `p`.
    pub fn get_close(&self, p: Position, r: f64) -> Vec<Rc<Element>> {
        let mut result = Vec::new();
        let root = match &self.root {
            Some(root) => root.clone(),
            None => return result,
        };

        let mut worklist = Vec::with_capacity(200);
        worklist.push(root);
        let mut i = 0;
        while i < worklist.len() {
            let node = worklist[i].clone();
            i += 1;
            let n = node.borrow();
            let d = n.dists_to_node(p);
            if d.nearest > r {
                continue;
            }
            if d.farthest <= r {
                n.push_back_all_elements(&mut result);
                continue;
            }
            n.push_back_subnodes(&mut worklist);
        }
        result
    }

    pub(crate) fn mass_updating_enabled(&self) -> bool {
        self.mass_updating_enabled
    }

    pub(crate) fn set_mass_updating_enabled(&mut self, enabled: bool) {
        self.mass_updating_enabled = enabled;
    }

    /// Suspend aggregate recomputation for the scope of the returned
    /// guard; releasing it (explicitly or by drop) forces one full
    /// bottom-up recompute.
    pub fn mute_mass_updating(&mut self) -> MassUpdatingGuard<'_> {
        MassUpdatingGuard::new(self)
    }

    pub fn dbg_out_coords(&self, sink: &mut impl std::io::Write) -> std::io::Result<()> {
        if let Some(root) = &self.root {
            root.borrow().dbg_out_coords(sink)?;
        }
        Ok(())
    }
}

impl Node {
    /// Re-point `child`'s parent back-ref to `parent` after `child` is
    /// installed as one of `parent`'s octants (used only by root growth,
    /// where the prior root becomes a child of the freshly grown one).
    fn reparent(child: &Rc<RefCell<Node>>, parent: &Rc<RefCell<Node>>) {
        child.borrow_mut().set_parent(Rc::downgrade(parent));
    }
}

/// RAII scope that suspends aggregate-mass recomputation on a [`Tree`].
/// Dropping it (or calling [`MassUpdatingGuard::unmute`] explicitly)
/// re-enables recomputation and performs one full bottom-up sweep from
/// the root, unless it was already released.
pub struct MassUpdatingGuard<'a> {
    tree: &'a mut Tree,
    released: bool,
}

impl<'a> MassUpdatingGuard<'a> {
    fn new(tree: &'a mut Tree) -> Self {
        tree.set_mass_updating_enabled(false);
        Self {
            tree,
            released: false,
        }
    }

    /// Explicitly end the mute scope early. Idempotent: a second call
    /// (or the eventual drop) is a no-op.
    pub fn unmute(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if !self.tree.mass_updating_enabled() {
            self.tree.set_mass_updating_enabled(true);
            if let Some(root) = self.tree.root() {
                Node::update_mass_center_recursive_down(&root);
            }
        }
    }
}

impl<'a> Drop for MassUpdatingGuard<'a> {
    fn drop(&mut self) {
        self.release();
    }
}
