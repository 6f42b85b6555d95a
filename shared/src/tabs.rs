//! Per-tab navigation histories and the registry of operations in flight.
//!
//! New intents address a tab explicitly; completions carry the [`Ticket`]
//! issued when their operation started, so they find their way back to the
//! owning tab no matter where the user has moved since.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::layer::{Layer, LayerKey, OperationKind};
use crate::model::EntityId;
use crate::stack::NavigationStack;
use crate::{FeedError, FeedResult};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Home,
    Explore,
    Places,
    Activity,
    Profile,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Self::Home, Self::Explore, Self::Places, Self::Activity, Self::Profile];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Explore => "explore",
            Self::Places => "places",
            Self::Activity => "activity",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TicketId(pub Uuid);

impl TicketId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Captured when an operation starts: which tab owns it and which screen it
/// was started from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub id: TicketId,
    pub owner: Tab,
    pub key: LayerKey,
    pub op: OperationKind,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Tabs {
    stacks: BTreeMap<Tab, NavigationStack>,
    current: Tab,
    in_flight: Vec<Ticket>,
}

impl Default for Tabs {
    fn default() -> Self {
        Self {
            stacks: Tab::ALL
                .into_iter()
                .map(|tab| (tab, NavigationStack::default()))
                .collect(),
            current: Tab::default(),
            in_flight: Vec::new(),
        }
    }
}

impl Tabs {
    // --- navigation ---

    #[must_use]
    pub const fn current_tab(&self) -> Tab {
        self.current
    }

    /// Only changes where the view points; work in flight keeps its owner.
    pub fn set_current_tab(&mut self, tab: Tab) {
        self.current = tab;
    }

    pub fn stack(&self, tab: Tab) -> Option<&NavigationStack> {
        self.stacks.get(&tab)
    }

    fn stack_mut(&mut self, tab: Tab) -> &mut NavigationStack {
        self.stacks.entry(tab).or_default()
    }

    pub fn depth(&self, tab: Tab) -> usize {
        self.stack(tab).map_or(0, NavigationStack::len)
    }

    pub fn top_layer_of(&self, tab: Tab) -> Option<&Layer> {
        self.stack(tab).and_then(NavigationStack::top)
    }

    pub fn push_layer(&mut self, tab: Tab, layer: Layer, max_depth: usize) -> usize {
        self.stack_mut(tab).push_bounded(layer, max_depth)
    }

    pub fn pop_layer(&mut self, tab: Tab) -> Option<Layer> {
        self.stack_mut(tab).pop()
    }

    /// Empties one tab and forgets everything it had in flight.
    pub fn clear_tab(&mut self, tab: Tab) {
        self.stack_mut(tab).clear();
        self.in_flight.retain(|ticket| ticket.owner != tab);
    }

    pub fn reset_all(&mut self) {
        for stack in self.stacks.values_mut() {
            stack.clear();
        }
        self.in_flight.clear();
    }

    // --- in-flight registry ---

    pub fn begin(&mut self, owner: Tab, key: LayerKey, op: OperationKind) -> Ticket {
        let ticket = Ticket {
            id: TicketId::new(),
            owner,
            key,
            op,
        };
        self.in_flight.push(ticket.clone());
        ticket
    }

    /// Owner of the most recently started operation still outstanding.
    pub fn pending_owner_tab(&self) -> Option<Tab> {
        self.in_flight.last().map(|ticket| ticket.owner)
    }

    pub fn in_flight(&self) -> &[Ticket] {
        &self.in_flight
    }

    /// Whether `owner` still waits on an `op` started against `key`.
    pub fn has_outstanding(&self, owner: Tab, key: &LayerKey, op: OperationKind) -> bool {
        self.in_flight
            .iter()
            .any(|t| t.owner == owner && t.op == op && &t.key == key)
    }

    /// Removes the ticket. `false` if it was never issued or already settled.
    pub fn settle(&mut self, ticket: &Ticket) -> bool {
        let before = self.in_flight.len();
        self.in_flight.retain(|t| t.id != ticket.id);
        before != self.in_flight.len()
    }

    pub fn forget(&mut self, owner: Tab, key: &LayerKey, op: OperationKind) {
        self.in_flight
            .retain(|t| !(t.owner == owner && t.op == op && &t.key == key));
    }

    // --- clone-then-replace updates ---

    /// Applies `f` to a copy of the tab's top layer and writes it back only
    /// if `f` succeeds. An empty tab is `NotFound`.
    pub fn update_top<T>(&mut self, tab: Tab, f: impl FnOnce(&mut Layer) -> FeedResult<T>) -> FeedResult<T> {
        let stack = self.stack_mut(tab);
        let mut layer = stack
            .top()
            .cloned()
            .ok_or_else(|| FeedError::not_found(format!("no screen open in the {tab} tab")))?;
        let out = f(&mut layer)?;
        stack.replace_top(layer);
        Ok(out)
    }

    /// Routes a completion to the layer its operation started on. Settles the
    /// ticket; if the owner's top layer is gone or shows something else the
    /// completion is refused with `ScopeMismatch` and nothing changes.
    pub fn resolve<T>(&mut self, ticket: &Ticket, f: impl FnOnce(&mut Layer) -> T) -> FeedResult<T> {
        if !self.settle(ticket) {
            debug!(ticket = %ticket.id, op = %ticket.op, "completion for an unknown ticket");
            return Err(FeedError::scope_mismatch().with_internal("ticket not outstanding"));
        }
        let matches = self
            .top_layer_of(ticket.owner)
            .is_some_and(|layer| layer.key() == ticket.key);
        if !matches {
            debug!(
                ticket = %ticket.id,
                tab = %ticket.owner,
                layer = %ticket.key,
                op = %ticket.op,
                "screen moved on; dropping completion"
            );
            return Err(FeedError::scope_mismatch());
        }
        self.update_top(ticket.owner, |layer| Ok(f(layer)))
    }

    /// Adjusts the child counter of the record a layer hangs off, in every
    /// frame beneath the top of `owner`'s history that lists it.
    pub fn adjust_parent_counts(&mut self, owner: Tab, key: &LayerKey, delta: i32) -> usize {
        let parent = EntityId::from(&key.scope);
        let mut updated = self.stack_mut(owner).clone();
        let below_top = updated.len().saturating_sub(1);
        let adjusted = updated
            .iter_mut()
            .take(below_top)
            .map(|layer| layer.adjust_child_count(&parent, delta))
            .filter(|hit| *hit)
            .count();
        if adjusted > 0 {
            *self.stack_mut(owner) = updated;
        }
        adjusted
    }
}
