use std::ops::AddAssign;
use std::rc::Rc;

use crate::element::Element;
use crate::scale::ScaleConfig;
use crate::tree::Tree;
use crate::Position;

/// A pure function `(target, source_center, source_mass) -> R` applied
/// to every element or accepted aggregate node during a convolution.
pub type Visitor<'v, R> = dyn Fn(Position, Position, f64) -> R + 'v;

/// Walks a tree from its root, treating whole subtrees as a single
/// point-mass at their center-of-mass whenever their diameter fits the
/// configured scale at their distance — the Barnes-Hut acceptance
/// criterion applied to an arbitrary accumulator and visitor.
pub struct Convolution<'a, S: ScaleConfig> {
    scale_config: &'a S,
}

impl<'a, S: ScaleConfig> Convolution<'a, S> {
    pub fn new(scale_config: &'a S) -> Self {
        Self { scale_config }
    }

    /// Sum `visitor(target, m_i.center, m_i.mass)` over the whole tree.
    pub fn convolute<R, F>(&self, tree: &Tree, target: Position, visitor: F) -> R
    where
        R: Default + AddAssign,
        F: Fn(Position, Position, f64) -> R,
    {
        self.walk(tree, target, None, visitor)
    }

    /// Same as [`Self::convolute`], but the leaf holding `excluded` is
    /// skipped by pointer identity — useful for evaluating a source's
    /// own field without self-interaction.
    pub fn convolute_excluding<R, F>(
        &self,
        tree: &Tree,
        excluded: &Rc<Element>,
        visitor: F,
    ) -> R
    where
        R: Default + AddAssign,
        F: Fn(Position, Position, f64) -> R,
    {
        self.walk(tree, excluded.position, Some(excluded), visitor)
    }

    fn walk<R, F>(
        &self,
        tree: &Tree,
        target: Position,
        excluded: Option<&Rc<Element>>,
        visitor: F,
    ) -> R
    where
        R: Default + AddAssign,
        F: Fn(Position, Position, f64) -> R,
    {
        let mut result = R::default();
        let root = match tree.root() {
            Some(root) => root,
            None => return result,
        };

        let mut worklist = Vec::with_capacity(200);
        worklist.push(root);
        let mut i = 0;
        while i < worklist.len() {
            let node = worklist[i].clone();
            i += 1;
            let n = node.borrow();

            if let (Some(ex), Some(e)) = (excluded, &n.element) {
                if Rc::ptr_eq(e, ex) {
                    continue;
                }
            }

            if n.element.is_some() {
                // A leaf's diameter is 0: it is always an exact, unconditional hit.
                result += visitor(target, n.mass_center, n.mass);
                continue;
            }

            let dist = n.dist_to_center(target) - n.diameter * 0.5;
            let scale = self.scale_config.find_scale(dist);
            if n.diameter <= scale {
                result += visitor(target, n.mass_center, n.mass);
            } else {
                n.push_back_subnodes(&mut worklist);
            }
        }

        result
    }
}
