//! Immutable match rules.

use crate::ecs::component::{Kind, registry::Registry};
use crate::ecs::entity::Record;

/// How a tag condition reads the entity's tag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagMatch {
    /// The entity carries at least one of the group's tags.
    Any,
    /// The entity carries every tag in the group.
    All,
    /// The entity carries none of the group's tags.
    None,
}

/// One tag condition: a tag name and the group it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagRule {
    tag: String,
    mode: TagMatch,
}

impl TagRule {
    /// Build a tag condition. Blank tags are not valid conditions and yield
    /// `None`.
    pub fn new(tag: impl Into<String>, mode: TagMatch) -> Option<Self> {
        let tag = tag.into();
        if tag.is_empty() {
            return None;
        }
        Some(Self { tag, mode })
    }

    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[inline]
    pub fn mode(&self) -> TagMatch {
        self.mode
    }
}

/// One component condition: the kind must be present and, if
/// `must_be_enabled`, currently enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentRule {
    kind: Kind,
    must_be_enabled: bool,
}

impl ComponentRule {
    pub fn new(kind: Kind, must_be_enabled: bool) -> Self {
        Self {
            kind,
            must_be_enabled,
        }
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[inline]
    pub fn must_be_enabled(&self) -> bool {
        self.must_be_enabled
    }
}

/// An immutable predicate over an entity: tag conditions plus component
/// conditions.
///
/// Conditions are stored in canonical form (sorted and deduplicated), so
/// equality and hashing are set-equality regardless of the order conditions
/// were added in, and a `Rules` value keys the view cache directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rules {
    tags: Vec<TagRule>,
    components: Vec<ComponentRule>,
}

impl Rules {
    /// Rules with no conditions at all. Note the tag verdict of an empty
    /// rule set is true for every entity, so this matches the whole
    /// population.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rules matching entities that carry at least one of the given tags.
    pub fn any_of<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_tags(tags, TagMatch::Any)
    }

    /// Rules matching entities that carry every one of the given tags.
    pub fn all_of<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_tags(tags, TagMatch::All)
    }

    /// Rules matching entities that carry none of the given tags.
    pub fn none_of<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_tags(tags, TagMatch::None)
    }

    fn with_tags<I, S>(tags: I, mode: TagMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_conditions(
            tags.into_iter()
                .filter_map(|t| TagRule::new(t, mode))
                .collect(),
            Vec::new(),
        )
    }

    /// Build rules from raw condition lists, normalizing to canonical form.
    pub(crate) fn from_conditions(
        mut tags: Vec<TagRule>,
        mut components: Vec<ComponentRule>,
    ) -> Self {
        tags.sort();
        tags.dedup();
        components.sort();
        components.dedup();
        Self { tags, components }
    }

    /// The tag conditions, in canonical order.
    #[inline]
    pub fn tag_rules(&self) -> &[TagRule] {
        &self.tags
    }

    /// The component conditions, in canonical order.
    #[inline]
    pub fn component_rules(&self) -> &[ComponentRule] {
        &self.components
    }

    /// Whether this rule set has no conditions.
    pub fn is_unconditional(&self) -> bool {
        self.tags.is_empty() && self.components.is_empty()
    }

    /// Evaluate the rules against one entity's record.
    ///
    /// Tag conditions are partitioned into their Any/All/None groups and the
    /// groups are evaluated in that order; each non-empty group overwrites
    /// the tag verdict, so the last non-empty group decides it. A false tag
    /// verdict fails the entity without looking at component conditions.
    /// Component conditions are a conjunction with short-circuit.
    pub(crate) fn matches(&self, record: &Record, kinds: &Registry) -> bool {
        let mut any = Vec::new();
        let mut all = Vec::new();
        let mut none = Vec::new();
        for rule in &self.tags {
            match rule.mode {
                TagMatch::Any => any.push(rule.tag.as_str()),
                TagMatch::All => all.push(rule.tag.as_str()),
                TagMatch::None => none.push(rule.tag.as_str()),
            }
        }

        let mut verdict = true;
        if !any.is_empty() {
            verdict = record.has_any_tag(&any);
        }
        if !all.is_empty() {
            verdict = record.has_all_tags(&all);
        }
        if !none.is_empty() {
            verdict = !record.has_any_tag(&none);
        }
        if !verdict {
            return false;
        }

        for rule in &self.components {
            let Some(info) = kinds.info(rule.kind) else {
                return false;
            };
            if !record.has_component(info.type_id(), !rule.must_be_enabled) {
                return false;
            }
        }

        true
    }
}
