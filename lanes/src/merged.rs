use history::is_ref_part_of_history;
use object_model::{ComponentId, Lane, ModelComponent, VersionHistory};

/// `isFullyMerged`: for every component bound in the lane, the
/// corresponding `ModelComponent.head` must reach the lane's recorded head
/// for that component via traversal. A component with no `ModelComponent`
/// yet, or whose head doesn't reach the lane's head, makes the whole lane
/// unmerged.
///
/// `lookup` resolves a component id to its `ModelComponent` and
/// `VersionHistory`, if known; callers typically back this with an
/// in-memory cache populated from the object store.
pub fn is_fully_merged<'a>(
    lane: &Lane,
    mut lookup: impl FnMut(&ComponentId) -> Option<(&'a ModelComponent, &'a VersionHistory)>,
) -> bool {
    lane.components.iter().all(|bound| match lookup(&bound.id) {
        None => false,
        Some((model, history)) => is_ref_part_of_history(history, model.head, bound.head),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hash::Ref;
    use object_model::VersionParents;
    use std::collections::BTreeMap;

    fn entry(hash: Ref, parents: Vec<Ref>) -> VersionParents {
        VersionParents {
            hash,
            parents,
            unrelated: None,
            squashed: vec![],
        }
    }

    #[test]
    fn fully_merged_when_every_head_reachable_from_model_head() {
        let mut lane = Lane::create("feature", "org", None, "a", "a@example.com").unwrap();
        let id = ComponentId::new("org", "button");
        lane.add_component(id.clone(), Ref::of(b"v1"));

        let mut history = VersionHistory::new("org", "button");
        history.record(entry(Ref::of(b"v1"), vec![]));
        history.record(entry(Ref::of(b"v2"), vec![Ref::of(b"v1")]));
        let model = ModelComponent::new("org", "button", Ref::of(b"v2"));

        let mut index: BTreeMap<ComponentId, (ModelComponent, VersionHistory)> = BTreeMap::new();
        index.insert(id.clone(), (model, history));

        assert!(is_fully_merged(&lane, |cid| index
            .get(cid)
            .map(|(m, h)| (m, h))));
    }

    #[test]
    fn unmerged_when_model_component_missing() {
        let mut lane = Lane::create("feature", "org", None, "a", "a@example.com").unwrap();
        lane.add_component(ComponentId::new("org", "button"), Ref::of(b"v1"));
        assert!(!is_fully_merged(&lane, |_| None));
    }

    #[test]
    fn unmerged_when_head_does_not_reach_lane_head() {
        let mut lane = Lane::create("feature", "org", None, "a", "a@example.com").unwrap();
        let id = ComponentId::new("org", "button");
        lane.add_component(id.clone(), Ref::of(b"v2"));

        let mut history = VersionHistory::new("org", "button");
        history.record(entry(Ref::of(b"v1"), vec![]));
        // model head v1 never reaches lane's recorded head v2
        let model = ModelComponent::new("org", "button", Ref::of(b"v1"));

        let mut index: BTreeMap<ComponentId, (ModelComponent, VersionHistory)> = BTreeMap::new();
        index.insert(id, (model, history));

        assert!(!is_fully_merged(&lane, |cid| index
            .get(cid)
            .map(|(m, h)| (m, h))));
    }
}
