use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layer::Layer;

/// LIFO history of one tab. Index 0 is the root screen; the last element is
/// the one showing.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NavigationStack {
    layers: Vec<Layer>,
}

impl NavigationStack {
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Pushes, then drops frames from the bottom until at most `max_depth`
    /// remain. Returns how many were dropped.
    pub fn push_bounded(&mut self, layer: Layer, max_depth: usize) -> usize {
        self.layers.push(layer);
        let excess = self.layers.len().saturating_sub(max_depth.max(1));
        if excess > 0 {
            debug!(dropped = excess, max_depth, "history too deep; dropping oldest frames");
            self.layers.drain(..excess);
        }
        excess
    }

    pub fn pop(&mut self) -> Option<Layer> {
        self.layers.pop()
    }

    pub fn top(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// Swaps in a new top frame and hands back the old one. Does nothing on
    /// an empty stack.
    pub fn replace_top(&mut self, layer: Layer) -> Option<Layer> {
        let top = self.layers.last_mut()?;
        Some(std::mem::replace(top, layer))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.layers.iter_mut()
    }
}
