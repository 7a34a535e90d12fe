//! Connected components of the closeness graph.
//!
//! The graph only contains events that have at least one qualifying edge;
//! isolated events never become nodes. Connectivity is computed with a
//! union-find over dense node indices once every edge has been added.

use std::collections::HashMap;

use shotdedup_event_model::{EventId, GroupId};

use crate::closeness::Edge;

/// A maximal connected set of events: one physical event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub group_id: GroupId,

    /// Member ids, ascending. Always at least two.
    pub members: Vec<EventId>,
}

impl Component {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.members.binary_search(&id).is_ok()
    }
}

/// Disjoint-set forest with path halving and union by rank.
#[derive(Debug, Default, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a singleton set and return its index.
    pub fn push(&mut self) -> usize {
        let idx = self.parent.len();
        self.parent.push(idx);
        self.rank.push(0);
        idx
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Merge the sets of `i` and `j`. Returns false if already joined.
    pub fn union(&mut self, i: usize, j: usize) -> bool {
        let ri = self.find(i);
        let rj = self.find(j);
        if ri == rj {
            return false;
        }
        match self.rank[ri].cmp(&self.rank[rj]) {
            std::cmp::Ordering::Less => self.parent[ri] = rj,
            std::cmp::Ordering::Greater => self.parent[rj] = ri,
            std::cmp::Ordering::Equal => {
                self.parent[rj] = ri;
                self.rank[ri] = self.rank[ri].saturating_add(1);
            }
        }
        true
    }
}

/// Accumulates edges, then splits the graph into components.
///
/// Group ids are assigned `-1, -2, ...` in ascending order of each
/// component's smallest member id. The counter lives only as long as the
/// grouper.
#[derive(Debug, Default)]
pub struct ComponentGrouper {
    sets: UnionFind,
    node_of: HashMap<EventId, usize>,
    ids: Vec<EventId>,
    edge_count: usize,
}

impl ComponentGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a complete edge set in one call.
    pub fn group<'e>(edges: impl IntoIterator<Item = &'e Edge>) -> Vec<Component> {
        let mut grouper = Self::new();
        for edge in edges {
            grouper.add_edge(edge);
        }
        grouper.into_components()
    }

    fn node(&mut self, id: EventId) -> usize {
        if let Some(&idx) = self.node_of.get(&id) {
            return idx;
        }
        let idx = self.sets.push();
        self.node_of.insert(id, idx);
        self.ids.push(id);
        idx
    }

    pub fn add_edge(&mut self, edge: &Edge) {
        let a = self.node(edge.a());
        let b = self.node(edge.b());
        self.sets.union(a, b);
        self.edge_count += 1;
    }

    /// Number of distinct events with at least one edge.
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn into_components(mut self) -> Vec<Component> {
        let mut order: Vec<usize> = (0..self.ids.len()).collect();
        order.sort_unstable_by_key(|&i| self.ids[i]);

        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut members: Vec<Vec<EventId>> = Vec::new();
        for i in order {
            let root = self.sets.find(i);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                members.push(Vec::new());
                members.len() - 1
            });
            members[slot].push(self.ids[i]);
        }

        let components: Vec<Component> = members
            .into_iter()
            .enumerate()
            .map(|(ordinal, members)| Component {
                group_id: GroupId::from_ordinal(ordinal),
                members,
            })
            .collect();

        tracing::debug!(
            nodes = self.ids.len(),
            edges = self.edge_count,
            components = components.len(),
            "components_grouped"
        );
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn edges(pairs: &[(EventId, EventId)]) -> BTreeSet<Edge> {
        pairs
            .iter()
            .filter_map(|&(a, b)| Edge::new(a, b))
            .collect()
    }

    #[test]
    fn test_union_find_basics() {
        let mut uf = UnionFind::new();
        let a = uf.push();
        let b = uf.push();
        let c = uf.push();
        assert_eq!(uf.len(), 3);
        assert!(uf.union(a, b));
        assert!(!uf.union(b, a));
        assert_eq!(uf.find(a), uf.find(b));
        assert_ne!(uf.find(a), uf.find(c));
    }

    #[test]
    fn test_chain_merges_transitively() {
        // 1-2 and 2-3 close, 1-3 not directly.
        let components = ComponentGrouper::group(&edges(&[(1, 2), (2, 3)]));
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].members, vec![1, 2, 3]);
        assert_eq!(components[0].group_id.get(), -1);
    }

    #[test]
    fn test_group_ids_follow_smallest_member() {
        let components = ComponentGrouper::group(&edges(&[(40, 41), (7, 30), (30, 8), (2, 99)]));
        let summary: Vec<(i64, Vec<EventId>)> = components
            .iter()
            .map(|c| (c.group_id.get(), c.members.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (-1, vec![2, 99]),
                (-2, vec![7, 8, 30]),
                (-3, vec![40, 41]),
            ]
        );
    }

    #[test]
    fn test_late_bridge_joins_two_groups() {
        let mut grouper = ComponentGrouper::new();
        for edge in edges(&[(1, 2), (3, 4)]) {
            grouper.add_edge(&edge);
        }
        grouper.add_edge(&Edge::new(2, 3).unwrap());
        assert_eq!(grouper.node_count(), 4);
        assert_eq!(grouper.edge_count(), 3);

        let components = grouper.into_components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), 4);
        assert!(components[0].contains(4));
        assert!(!components[0].contains(5));
    }

    #[test]
    fn test_no_edges_no_components() {
        assert!(ComponentGrouper::group(&BTreeSet::<Edge>::new()).is_empty());
    }

    #[test]
    fn test_insertion_order_does_not_change_partition() {
        let pairs = [(5, 6), (1, 9), (6, 9), (11, 12), (3, 4)];
        let forward = ComponentGrouper::group(&edges(&pairs));

        let mut grouper = ComponentGrouper::new();
        for &(a, b) in pairs.iter().rev() {
            grouper.add_edge(&Edge::new(b, a).unwrap());
        }
        assert_eq!(grouper.into_components(), forward);
    }
}
