//! Per-session navigation state of the composite router.
//!
//! Two variables that must stay consistent:
//!
//! - [`Selection`]: whether the router shows its own root (the provider list)
//!   or delegates to one active provider
//! - [`Breadcrumbs`]: the collections visited from the root to the current
//!   position, used to infer whether a navigation goes up or down

use std::fmt;

use crate::collection::CollectionDescriptor;
use crate::locator::LocatorPath;

/// Which provider, if any, the router currently delegates to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selection {
    /// Root view: operations are answered from the registry itself.
    #[default]
    Unselected,
    /// Delegating to the provider at this registry index.
    Selected(usize),
}

impl Selection {
    pub fn index(&self) -> Option<usize> {
        match self {
            Selection::Unselected => None,
            Selection::Selected(i) => Some(*i),
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, Selection::Selected(_))
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Unselected => write!(f, "unselected"),
            Selection::Selected(i) => write!(f, "selected({})", i),
        }
    }
}

/// Stack of visited collections. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumbs {
    entries: Vec<CollectionDescriptor>,
}

impl Breadcrumbs {
    /// Start with the synthetic "up one level" entry for `root_key`.
    pub fn new(root_key: &str) -> Self {
        Self {
            entries: vec![CollectionDescriptor::parent_of(root_key)],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self) -> &CollectionDescriptor {
        // Invariant: the root entry is never popped.
        &self.entries[self.entries.len() - 1]
    }

    /// The entry two from the top, if the stack is deep enough.
    pub fn second_from_top(&self) -> Option<&CollectionDescriptor> {
        self.entries.len().checked_sub(2).map(|i| &self.entries[i])
    }

    pub fn push(&mut self, collection: CollectionDescriptor) {
        self.entries.push(collection);
    }

    /// Pop the top entry. The root entry is the floor.
    pub fn pop(&mut self) -> Option<CollectionDescriptor> {
        if self.entries.len() > 1 {
            self.entries.pop()
        } else {
            None
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CollectionDescriptor> {
        self.entries.iter()
    }

    pub fn to_locator(&self) -> LocatorPath {
        self.entries.iter().map(CollectionDescriptor::to_segment).collect()
    }
}

/// Direction inferred for a `set_collection_base` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMove {
    /// Navigating up/back: drop the top breadcrumb.
    Pop,
    /// Navigating down: push the incoming collection.
    Push,
}

/// Selection plus breadcrumbs for one navigation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    pub selection: Selection,
    pub breadcrumbs: Breadcrumbs,
}

impl NavigationState {
    pub fn new(root_key: &str) -> Self {
        Self {
            selection: Selection::Unselected,
            breadcrumbs: Breadcrumbs::new(root_key),
        }
    }

    /// Infer up/down purely from key comparison.
    ///
    /// The look-back breadcrumb is checked before the selected provider's
    /// reported parent. That precedence is observable and must not change.
    pub fn stack_move(&self, key: &str, selected_parent_key: Option<&str>) -> StackMove {
        let depth = self.breadcrumbs.len();
        let matches_lookback =
            depth > 2 && self.breadcrumbs.second_from_top().is_some_and(|c| c.key == key);
        let matches_parent = depth > 1
            && self.selection.is_selected()
            && selected_parent_key.is_some_and(|parent| parent == key);

        if matches_lookback || matches_parent {
            StackMove::Pop
        } else {
            StackMove::Push
        }
    }

    pub fn apply(&mut self, movement: StackMove, collection: &CollectionDescriptor) {
        match movement {
            StackMove::Pop => {
                self.breadcrumbs.pop();
            }
            StackMove::Push => self.breadcrumbs.push(collection.clone()),
        }
    }
}
