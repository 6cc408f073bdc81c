//! Reachability, divergence, and merge-pending queries over a component's
//! `VersionHistory` DAG cache.

use std::collections::{BTreeSet, VecDeque};

use hash::Ref;
use object_model::VersionHistory;

/// Result of a DFS over `parents` edges starting from a given ref.
/// `unrelated` is never followed; `squashed` contributes only to membership
/// queries, not to this walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reachability {
    pub found: BTreeSet<Ref>,
    pub missing: BTreeSet<Ref>,
}

/// `allHashesFrom`: DFS from `start` following `parents`, stopping at
/// entries missing from the cache and reporting them as `missing` rather
/// than following them further.
pub fn all_hashes_from(history: &VersionHistory, start: Ref) -> Reachability {
    let mut found = BTreeSet::new();
    let mut missing = BTreeSet::new();
    let mut queue = VecDeque::from([start]);
    let mut visited = BTreeSet::new();

    while let Some(hash) = queue.pop_front() {
        if !visited.insert(hash) {
            continue;
        }
        match history.entry(hash) {
            Some(entry) => {
                found.insert(hash);
                for parent in &entry.parents {
                    if !visited.contains(parent) {
                        queue.push_back(*parent);
                    }
                }
            }
            None => {
                missing.insert(hash);
            }
        }
    }

    Reachability { found, missing }
}

/// `isRefPartOfHistory`: does `candidate` appear in `allHashesFrom(start)`?
pub fn is_ref_part_of_history(history: &VersionHistory, start: Ref, candidate: Ref) -> bool {
    all_hashes_from(history, start).found.contains(&candidate)
}

/// All refs reachable via `squashed` membership, in addition to ordinary
/// ancestry -- used only for "did this older hash already land" queries,
/// never for the default walk.
fn squashed_membership(history: &VersionHistory, start: Ref) -> BTreeSet<Ref> {
    let mut members = BTreeSet::new();
    if let Some(entry) = history.entry(start) {
        for s in &entry.squashed {
            members.insert(*s);
        }
    }
    members
}

/// `isGraphCompleteSince`: true iff a full DFS from `ref` has no missing
/// parents. Memoized in `history.graph_complete_refs`; a second call
/// without intervening deletion returns true without re-walking.
pub fn is_graph_complete_since(history: &mut VersionHistory, start: Ref) -> bool {
    if history.is_marked_graph_complete(start) {
        return true;
    }
    let complete = all_hashes_from(history, start).missing.is_empty();
    if complete {
        history.mark_graph_complete(start);
    }
    complete
}

/// Read-only variant of `isGraphCompleteSince` for callers that only have a
/// shared reference (e.g. read-only status checks that must not mutate the
/// cache).
pub fn is_graph_complete_since_readonly(history: &VersionHistory, start: Ref) -> bool {
    history.is_marked_graph_complete(start) || all_hashes_from(history, start).missing.is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivergeData {
    pub common_ancestor: Option<Ref>,
    pub local_only: Vec<Ref>,
    pub remote_only: Vec<Ref>,
    pub diverged: bool,
}

/// `divergeData`: standard LCA over parent edges. If no common ancestor
/// exists but either side lists the other in `unrelated`/`squashed`, report
/// `diverged = false` with empty ahead/behind -- a grafted-in or squashed
/// history join is not a real divergence.
///
/// Tie-break when multiple LCAs exist: the one with the greatest number of
/// descendants in `local ∪ remote`; on tie, the lexicographically greatest
/// hash.
pub fn diverge_data(history: &VersionHistory, local: Ref, remote: Ref) -> DivergeData {
    if local == remote {
        return DivergeData {
            common_ancestor: Some(local),
            local_only: vec![],
            remote_only: vec![],
            diverged: false,
        };
    }

    let local_reach = all_hashes_from(history, local);
    let remote_reach = all_hashes_from(history, remote);

    if let Some(lca) = pick_lca(history, &local_reach.found, &remote_reach.found) {
        let local_only: Vec<Ref> = local_reach
            .found
            .iter()
            .filter(|h| !remote_reach.found.contains(*h) && **h != lca)
            .copied()
            .collect();
        let remote_only: Vec<Ref> = remote_reach
            .found
            .iter()
            .filter(|h| !local_reach.found.contains(*h) && **h != lca)
            .copied()
            .collect();
        let diverged = !local_only.is_empty() && !remote_only.is_empty();
        return DivergeData {
            common_ancestor: Some(lca),
            local_only,
            remote_only,
            diverged,
        };
    }

    // No common ancestor via parent-ancestry. Check unrelated/squashed
    // membership hints before declaring divergence.
    let local_knows_remote = squashed_membership(history, local).contains(&remote)
        || history.entry(local).and_then(|e| e.unrelated) == Some(remote);
    let remote_knows_local = squashed_membership(history, remote).contains(&local)
        || history.entry(remote).and_then(|e| e.unrelated) == Some(local);

    if local_knows_remote || remote_knows_local {
        return DivergeData {
            common_ancestor: None,
            local_only: vec![],
            remote_only: vec![],
            diverged: false,
        };
    }

    DivergeData {
        common_ancestor: None,
        local_only: local_reach.found.into_iter().collect(),
        remote_only: remote_reach.found.into_iter().collect(),
        diverged: true,
    }
}

/// Picks the common ancestor to report when several exist, using the
/// deterministic tie-break rule.
fn pick_lca(history: &VersionHistory, local: &BTreeSet<Ref>, remote: &BTreeSet<Ref>) -> Option<Ref> {
    let union: BTreeSet<Ref> = local.union(remote).copied().collect();
    let candidates: Vec<Ref> = local.intersection(remote).copied().collect();
    if candidates.is_empty() {
        return None;
    }

    // Narrow to the true (lowest) common ancestors: a candidate that is
    // itself an ancestor of another candidate is not minimal and is
    // discarded before tie-breaking.
    let minimal: Vec<Ref> = candidates
        .iter()
        .copied()
        .filter(|&c| {
            !candidates
                .iter()
                .any(|&other| other != c && is_ref_part_of_history(history, other, c))
        })
        .collect();

    minimal
        .into_iter()
        .map(|candidate| {
            let descendants = union
                .iter()
                .filter(|h| is_ref_part_of_history(history, **h, candidate))
                .count();
            (descendants, candidate)
        })
        .max_by(|(a_count, a_hash), (b_count, b_hash)| {
            a_count.cmp(b_count).then_with(|| a_hash.cmp(b_hash))
        })
        .map(|(_, hash)| hash)
}

/// Merge-pending for a local head `h`: true iff there is a recorded remote
/// head `r` such that `divergeData(h, r).diverged`.
pub fn is_merge_pending(history: &VersionHistory, local_head: Ref, remote_head: Option<Ref>) -> bool {
    match remote_head {
        Some(r) => diverge_data(history, local_head, r).diverged,
        None => false,
    }
}
