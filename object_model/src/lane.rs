use hash::Ref;
use serde::{Deserialize, Serialize};

use crate::component_id::ComponentId;

/// Names a lane may never take -- the default lane and its predecessor name
/// (kept for compatibility with repositories created before the default
/// lane was renamed).
pub const RESERVED_LANE_NAMES: &[&str] = &["main", "master"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneLog {
    pub date: chrono::DateTime<chrono::Utc>,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneComponent {
    pub id: ComponentId,
    pub head: Ref,
}

/// A named, mutable set of `(componentId -> head Ref)` bindings.
///
/// `hash` is assigned once at creation from a random source and never
/// changes; it is the lane's stable identity even though its `components`
/// list is mutable. Two in-memory flags, `is_new` and `has_changed`, track
/// whether the record needs to be persisted; neither is part of the
/// serialized form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub name: String,
    pub scope: String,
    pub hash: Ref,
    pub log: LaneLog,
    pub components: Vec<LaneComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme_component: Option<ComponentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forked_from: Option<ComponentId>,

    #[serde(skip)]
    pub is_new: bool,
    #[serde(skip)]
    pub has_changed: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LaneError {
    #[error("lane name {0:?} is reserved")]
    ReservedName(String),
    #[error("duplicate component id in lane: {0}")]
    DuplicateComponent(String),
    #[error("lane component head must be a snap, not a tag: {0}")]
    HeadIsTag(String),
}

impl Lane {
    /// Creates a fresh lane with a random identity hash. Rejects reserved
    /// names up front.
    pub fn create(
        name: impl Into<String>,
        scope: impl Into<String>,
        forked_from: Option<ComponentId>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, LaneError> {
        let name = name.into();
        if RESERVED_LANE_NAMES.contains(&name.as_str()) {
            return Err(LaneError::ReservedName(name));
        }
        let identity = uuid::Uuid::new_v4();
        let hash = Ref::of(identity.as_bytes());
        Ok(Lane {
            name,
            scope: scope.into(),
            hash,
            log: LaneLog {
                date: chrono::Utc::now(),
                username: username.into(),
                email: email.into(),
                profile_image: None,
            },
            components: Vec::new(),
            readme_component: None,
            forked_from,
            is_new: true,
            has_changed: true,
        })
    }

    pub fn id(&self) -> (String, String) {
        (self.scope.clone(), self.name.clone())
    }

    /// Replaces an existing entry with an equal id-without-version; marks
    /// `has_changed` only if the head actually differs.
    pub fn add_component(&mut self, id: ComponentId, head: Ref) {
        if let Some(existing) = self
            .components
            .iter_mut()
            .find(|c| c.id.eq_without_version(&id))
        {
            if existing.head != head {
                existing.head = head;
                existing.id = id;
                self.has_changed = true;
            }
        } else {
            self.components.push(LaneComponent { id, head });
            self.has_changed = true;
        }
    }

    pub fn remove_component(&mut self, id: &ComponentId) -> bool {
        let before = self.components.len();
        self.components.retain(|c| !c.id.eq_without_version(id));
        let removed = self.components.len() != before;
        if removed {
            self.has_changed = true;
        }
        removed
    }

    pub fn set_readme_component(&mut self, id: Option<ComponentId>) {
        self.readme_component = id;
        self.has_changed = true;
    }

    pub fn component_head(&self, id: &ComponentId) -> Option<Ref> {
        self.components
            .iter()
            .find(|c| c.id.eq_without_version(id))
            .map(|c| c.head)
    }

    /// `validate`: no duplicate ids, every head is a snap, name not
    /// reserved. `is_snap` is supplied by the caller (callers know whether
    /// a given `Ref` is the identity of a persisted snap, as opposed to
    /// having been resolved from a tag name).
    pub fn validate(&self, is_snap: impl Fn(Ref) -> bool) -> Result<(), LaneError> {
        if RESERVED_LANE_NAMES.contains(&self.name.as_str()) {
            return Err(LaneError::ReservedName(self.name.clone()));
        }
        let mut seen = std::collections::HashSet::new();
        for c in &self.components {
            let key = (c.id.scope.clone(), c.id.name.clone());
            if !seen.insert(key) {
                return Err(LaneError::DuplicateComponent(c.id.to_string()));
            }
            if !is_snap(c.head) {
                return Err(LaneError::HeadIsTag(c.id.to_string()));
            }
        }
        Ok(())
    }

    /// Same `id()` and same sorted set of `(id, head)` pairs.
    pub fn is_equal(&self, other: &Lane) -> bool {
        if self.id() != other.id() {
            return false;
        }
        let mut mine: Vec<_> = self
            .components
            .iter()
            .map(|c| (c.id.clone(), c.head))
            .collect();
        let mut theirs: Vec<_> = other
            .components
            .iter()
            .map(|c| (c.id.clone(), c.head))
            .collect();
        mine.sort();
        theirs.sort();
        mine == theirs
    }
}
