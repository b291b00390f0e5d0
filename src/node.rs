use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::{Rc, Weak};

use crate::element::Element;
use crate::error::OctreeError;
use crate::subdivision::SubdivisionKey;
use crate::Position;

/// Nearest and farthest distance from a point to some node's extent.
/// For a leaf these coincide (a point has zero extent); otherwise they
/// bound the node's cube.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistToNode {
    pub nearest: f64,
    pub farthest: f64,
}

/// A cube in the tree: holds no element and no children (`Empty`), one
/// element and no children (`Leaf`), or no element and at least one
/// child (`Internal`). Never both.
#[derive(Debug)]
pub struct Node {
    pub center: Position,
    pub size: f64,
    pub diameter: f64,
    pub element: Option<Rc<Element>>,
    pub children: [Option<Rc<RefCell<Node>>>; 8],
    pub mass: f64,
    pub mass_center: Position,
    /// The key the parent used to address this node among its eight
    /// children. Meaningless on the root.
    pub subdivision_key: SubdivisionKey,
    pub level: i32,
    parent: Weak<RefCell<Node>>,
    corners: [Position; 8],
}

impl Node {
    pub fn new_root(center: Position, size: f64) -> Rc<RefCell<Node>> {
        let corners = Self::calculate_corners(center, size);
        Rc::new(RefCell::new(Node {
            center,
            size,
            diameter: size * 3f64.sqrt(),
            element: None,
            children: Default::default(),
            mass: 0.0,
            mass_center: center,
            subdivision_key: SubdivisionKey::UNSET,
            level: 0,
            parent: Weak::new(),
            corners,
        }))
    }

    pub fn new_child(parent_rc: &Rc<RefCell<Node>>, key: SubdivisionKey) -> Rc<RefCell<Node>> {
        let (center, size, level) = {
            let parent = parent_rc.borrow();
            let size = parent.size * 0.5;
            let hs = size * 0.5;
            let mut center = parent.center;
            for i in 0..3 {
                let delta = if key.s[i] == 0 { -hs } else { hs };
                match i {
                    0 => center.x += delta,
                    1 => center.y += delta,
                    _ => center.z += delta,
                }
            }
            (center, size, parent.level + 1)
        };
        let corners = Self::calculate_corners(center, size);
        Rc::new(RefCell::new(Node {
            center,
            size,
            diameter: size * 3f64.sqrt(),
            element: None,
            children: Default::default(),
            mass: 0.0,
            mass_center: center,
            subdivision_key: key,
            level,
            parent: Rc::downgrade(parent_rc),
            corners,
        }))
    }

    fn calculate_corners(center: Position, size: f64) -> [Position; 8] {
        let hs = size * 0.5;
        let mut corners = [center; 8];
        let mut i = 0;
        for &sx in &[-1.0, 1.0] {
            for &sy in &[-1.0, 1.0] {
                for &sz in &[-1.0, 1.0] {
                    corners[i] = Position::new(center.x + sx * hs, center.y + sy * hs, center.z + sz * hs);
                    i += 1;
                }
            }
        }
        corners
    }

    fn update_diameter(&mut self) {
        self.diameter = if self.element.is_some() {
            0.0
        } else {
            self.size * 3f64.sqrt()
        };
    }

    pub fn is_inside(&self, p: Position) -> bool {
        let hs = self.size * 0.5;
        (p.x >= self.center.x - hs && p.x < self.center.x + hs)
            && (p.y >= self.center.y - hs && p.y < self.center.y + hs)
            && (p.z >= self.center.z - hs && p.z < self.center.z + hs)
    }

    pub fn elements_count(&self) -> usize {
        if self.element.is_some() {
            return 1;
        }
        self.children
            .iter()
            .flatten()
            .map(|c| c.borrow().elements_count())
            .sum()
    }

    pub fn dists_to_node(&self, p: Position) -> DistToNode {
        if let Some(e) = &self.element {
            let d = (e.position - p).magnitude();
            return DistToNode {
                nearest: d,
                farthest: d,
            };
        }

        if self.is_inside(p) {
            let farthest = self
                .corners
                .iter()
                .map(|c| (*c - p).magnitude())
                .fold(f64::MIN, f64::max);
            return DistToNode {
                nearest: 0.0,
                farthest,
            };
        }

        let mut nearest = f64::MAX;
        let mut farthest = f64::MIN;
        for c in &self.corners {
            let d = (*c - p).magnitude();
            nearest = nearest.min(d);
            farthest = farthest.max(d);
        }
        DistToNode { nearest, farthest }
    }

    pub fn min_dist(&self, p: Position) -> f64 {
        if let Some(e) = &self.element {
            return (e.position - p).magnitude();
        }
        self.corners
            .iter()
            .map(|c| (*c - p).magnitude())
            .fold(f64::MAX, f64::min)
    }

    pub fn dist_to_center(&self, p: Position) -> f64 {
        (p - self.center).magnitude()
    }

    fn update_mass_center(&mut self) {
        if let Some(e) = &self.element {
            self.mass_center = e.position;
            self.mass = e.mass();
            return;
        }

        let mut mass = 0.0;
        let mut center = Position::new_zero();
        for child in self.children.iter().flatten() {
            let c = child.borrow();
            mass += c.mass;
            center += c.mass_center * c.mass;
        }
        if mass != 0.0 {
            center /= mass;
        } else {
            center = self.center;
        }
        self.mass = mass;
        self.mass_center = center;
    }

    pub(crate) fn update_mass_center_recursive_up(node_rc: &Rc<RefCell<Node>>) {
        node_rc.borrow_mut().update_mass_center();
        let parent = node_rc.borrow().parent.upgrade();
        if let Some(parent) = parent {
            Node::update_mass_center_recursive_up(&parent);
        }
    }

    pub(crate) fn update_mass_center_recursive_down(node_rc: &Rc<RefCell<Node>>) {
        let children: Vec<_> = node_rc.borrow().children.iter().flatten().cloned().collect();
        for child in &children {
            Node::update_mass_center_recursive_down(child);
        }
        node_rc.borrow_mut().update_mass_center();
    }

    pub fn push_back_subnodes(&self, container: &mut Vec<Rc<RefCell<Node>>>) {
        for child in self.children.iter().flatten() {
            container.push(child.clone());
        }
    }

    pub fn push_back_all_elements(&self, container: &mut Vec<Rc<Element>>) {
        if let Some(e) = &self.element {
            container.push(e.clone());
            return;
        }
        for child in self.children.iter().flatten() {
            child.borrow().push_back_all_elements(container);
        }
    }

    pub fn dbg_out_coords(&self, sink: &mut impl Write) -> io::Result<()> {
        let hs = self.size * 0.5;
        for &sx in &[-1.0, 1.0] {
            for &sy in &[-1.0, 1.0] {
                for &sz in &[-1.0, 1.0] {
                    writeln!(
                        sink,
                        "{},{},{}",
                        self.center.x + sx * hs,
                        self.center.y + sy * hs,
                        self.center.z + sz * hs
                    )?;
                }
            }
        }
        for child in self.children.iter().flatten() {
            child.borrow().dbg_out_coords(sink)?;
        }
        Ok(())
    }

    /// Insert `e` into the subtree rooted at `node_rc`, possibly
    /// splitting a leaf or descending into (and creating) a child.
    pub(crate) fn add_element(
        node_rc: &Rc<RefCell<Node>>,
        e: Rc<Element>,
        mass_updating_enabled: bool,
    ) -> Result<(), OctreeError> {
        let existing = node_rc.borrow().element.clone();

        if existing.is_none() && !Self::has_subnodes(node_rc) {
            e.set_parent(Rc::downgrade(node_rc));
            {
                let mut node = node_rc.borrow_mut();
                node.element = Some(e);
            }
            if mass_updating_enabled {
                Node::update_mass_center_recursive_up(node_rc);
            }
            node_rc.borrow_mut().update_diameter();
            return Ok(());
        }

        if let Some(e0) = existing {
            if e0.position == e.position {
                return Err(OctreeError::CoincidentPoints(e.position));
            }
            e0.clear_parent();
            node_rc.borrow_mut().element = None;
            Node::give_element_to_subnodes(node_rc, e0, mass_updating_enabled)?;
            Node::give_element_to_subnodes(node_rc, e, mass_updating_enabled)?;
            node_rc.borrow_mut().update_diameter();
            return Ok(());
        }

        Node::give_element_to_subnodes(node_rc, e, mass_updating_enabled)?;
        node_rc.borrow_mut().update_diameter();
        Ok(())
    }

    pub(crate) fn set_parent(&mut self, parent: Weak<RefCell<Node>>) {
        self.parent = parent;
    }

    fn has_subnodes(node_rc: &Rc<RefCell<Node>>) -> bool {
        node_rc.borrow().children.iter().any(|c| c.is_some())
    }

    fn give_element_to_subnodes(
        node_rc: &Rc<RefCell<Node>>,
        e: Rc<Element>,
        mass_updating_enabled: bool,
    ) -> Result<(), OctreeError> {
        let center = node_rc.borrow().center;
        let key = SubdivisionKey::new(center, e.position);
        let idx = key.index();

        let existing_child = node_rc.borrow().children[idx].clone();
        let child = match existing_child {
            Some(c) => c,
            None => {
                let new_child = Node::new_child(node_rc, key);
                node_rc.borrow_mut().children[idx] = Some(new_child.clone());
                new_child
            }
        };

        Node::add_element(&child, e, mass_updating_enabled)
    }
}
