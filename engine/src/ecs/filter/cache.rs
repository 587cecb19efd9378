//! The shared view cache.
//!
//! One mapping from canonical rules to `{view, refcount}`. At most one live
//! view exists per distinct rules value; every consumer requesting that value
//! shares it.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ecs::filter::rules::Rules;
use crate::ecs::filter::view::Filter;

struct Entry {
    filter: Rc<Filter>,
    refs: usize,
}

/// What a release did to the cache entry.
pub(crate) enum Release {
    /// Other consumers remain; the view stays live.
    Retained,
    /// The last consumer left; the caller must close the view.
    Closed,
    /// The view was not (or no longer) the cached one for its rules. The
    /// caller closes it if it is still open.
    NotCached,
}

#[derive(Default)]
pub(crate) struct Cache {
    entries: HashMap<Rules, Entry>,
}

impl Cache {
    /// Claim the live view for `rules`, if one exists, bumping its refcount.
    pub(crate) fn acquire(&mut self, rules: &Rules) -> Option<Rc<Filter>> {
        let entry = self.entries.get_mut(rules)?;
        entry.refs += 1;
        Some(Rc::clone(&entry.filter))
    }

    /// Insert a freshly opened view with one claim on it.
    pub(crate) fn insert(&mut self, rules: Rules, filter: Rc<Filter>) {
        self.entries.insert(rules, Entry { filter, refs: 1 });
    }

    /// Drop one claim on the view for `rules`. The identity check guards
    /// against a stale handle decrementing a newer view that reused the same
    /// rules after a teardown.
    pub(crate) fn release(&mut self, rules: &Rules, filter: &Rc<Filter>) -> Release {
        let Some(entry) = self.entries.get_mut(rules) else {
            return Release::NotCached;
        };
        if !Rc::ptr_eq(&entry.filter, filter) {
            return Release::NotCached;
        }

        entry.refs -= 1;
        if entry.refs == 0 {
            self.entries.remove(rules);
            Release::Closed
        } else {
            Release::Retained
        }
    }

    /// Current number of claims on the view for `rules`.
    pub(crate) fn refs(&self, rules: &Rules) -> usize {
        self.entries.get(rules).map_or(0, |entry| entry.refs)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
