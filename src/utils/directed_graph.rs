use std::collections::{BTreeMap, BTreeSet};

/// A directed graph over ordered vertex values.
///
/// Vertices are stored by value; edge sets are ordered so iteration over the
/// graph is deterministic. The graph offers the two closure operations the
/// plan decoder relies on: transitive insertion and transitive reduction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectedGraph<V>
where
    V: Ord + Clone,
{
    edges_from: BTreeMap<V, BTreeSet<V>>,
    edges_to: BTreeMap<V, BTreeSet<V>>,
}

impl<V> DirectedGraph<V>
where
    V: Ord + Clone,
{
    /// Builds a new, empty directed graph.
    pub fn new() -> Self {
        Self {
            edges_from: BTreeMap::new(),
            edges_to: BTreeMap::new(),
        }
    }

    /// Adds an edge to this graph.
    ///
    /// Adding an edge twice has no effect.
    pub fn add_edge(&mut self, source: V, dest: V) {
        self.edges_from
            .entry(source.clone())
            .or_default()
            .insert(dest.clone());
        self.edges_to.entry(dest).or_default().insert(source);
    }

    /// Removes an edge from this graph, if present.
    pub fn remove_edge(&mut self, source: &V, dest: &V) {
        if let Some(set) = self.edges_from.get_mut(source) {
            set.remove(dest);
        }
        if let Some(set) = self.edges_to.get_mut(dest) {
            set.remove(source);
        }
    }

    /// Returns `true` iff the edge is present.
    pub fn contains_edge(&self, source: &V, dest: &V) -> bool {
        self.edges_from
            .get(source)
            .map(|set| set.contains(dest))
            .unwrap_or(false)
    }

    /// Iterates over the successors of a vertex.
    pub fn edges_from(&self, source: &V) -> impl Iterator<Item = &V> {
        self.edges_from.get(source).into_iter().flatten()
    }

    /// Iterates over the predecessors of a vertex.
    pub fn edges_to(&self, dest: &V) -> impl Iterator<Item = &V> {
        self.edges_to.get(dest).into_iter().flatten()
    }

    /// Iterates over all the edges, in vertex order.
    pub fn iter_edges(&self) -> impl Iterator<Item = (&V, &V)> {
        self.edges_from
            .iter()
            .flat_map(|(src, dests)| dests.iter().map(move |d| (src, d)))
    }

    /// Returns the number of edges.
    pub fn n_edges(&self) -> usize {
        self.edges_from.values().map(BTreeSet::len).sum()
    }

    /// Adds an edge and immediately restores transitive closure.
    ///
    /// If the graph was transitively closed before the call, it is closed
    /// after it: every predecessor of the source is linked to the destination
    /// and to all its successors, and symmetrically.
    pub fn add_and_close_transitive(&mut self, source: V, dest: V) {
        let mut sources: Vec<V> = self.edges_to(&source).cloned().collect();
        sources.push(source);
        let mut dests: Vec<V> = self.edges_from(&dest).cloned().collect();
        dests.push(dest);
        for s in &sources {
            for d in &dests {
                self.add_edge(s.clone(), d.clone());
            }
        }
    }

    /// Removes every edge implied by a longer path.
    ///
    /// The graph must be transitively closed and acyclic when this is called;
    /// the result is its unique transitive reduction. Implication is checked
    /// against the closed relation, so removals are order-independent.
    pub fn transitive_reduction(&mut self) {
        let closed = self.clone();
        for (s, d) in closed.iter_edges() {
            let implied = closed
                .edges_from(s)
                .any(|m| m != d && closed.contains_edge(m, d));
            if implied {
                self.remove_edge(s, d);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_contains() {
        let mut g = DirectedGraph::new();
        g.add_edge(0, 1);
        assert!(g.contains_edge(&0, &1));
        assert!(!g.contains_edge(&1, &0));
        assert_eq!(1, g.n_edges());
    }

    #[test]
    fn test_add_twice() {
        let mut g = DirectedGraph::new();
        g.add_edge(0, 1);
        g.add_edge(0, 1);
        assert_eq!(1, g.n_edges());
    }

    #[test]
    fn test_add_and_close() {
        let mut g = DirectedGraph::new();
        g.add_and_close_transitive(0, 1);
        g.add_and_close_transitive(1, 2);
        assert!(g.contains_edge(&0, &2));
        g.add_and_close_transitive(2, 3);
        assert!(g.contains_edge(&0, &3));
        assert!(g.contains_edge(&1, &3));
        assert_eq!(6, g.n_edges());
    }

    #[test]
    fn test_reduction_removes_closure_edges() {
        let mut g = DirectedGraph::new();
        g.add_and_close_transitive(0, 1);
        g.add_and_close_transitive(1, 2);
        g.add_and_close_transitive(2, 3);
        g.transitive_reduction();
        let edges: Vec<(usize, usize)> = g.iter_edges().map(|(s, d)| (*s, *d)).collect();
        assert_eq!(vec![(0, 1), (1, 2), (2, 3)], edges);
    }

    #[test]
    fn test_reduction_keeps_required_edges() {
        let mut g = DirectedGraph::new();
        g.add_edge(0, 1);
        g.add_edge(2, 3);
        g.transitive_reduction();
        assert_eq!(2, g.n_edges());
    }

    #[test]
    fn test_iter_edges_sorted() {
        let mut g = DirectedGraph::new();
        g.add_edge(1, 2);
        g.add_edge(0, 2);
        g.add_edge(0, 1);
        let edges: Vec<(usize, usize)> = g.iter_edges().map(|(s, d)| (*s, *d)).collect();
        assert_eq!(vec![(0, 1), (0, 2), (1, 2)], edges);
    }
}
