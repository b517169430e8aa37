use std::collections::BTreeSet;

/// A vertex-colored undirected graph.
///
/// Vertices are numbered from 0 in creation order; colors partition the
/// vertices into the classes an automorphism must preserve.
#[derive(Clone, Debug, Default)]
pub struct ColoredGraph {
    colors: Vec<usize>,
    adjacency: Vec<BTreeSet<usize>>,
}

impl ColoredGraph {
    /// Builds a new, empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex with the given color and returns its index.
    pub fn add_vertex(&mut self, color: usize) -> usize {
        self.colors.push(color);
        self.adjacency.push(BTreeSet::new());
        self.colors.len() - 1
    }

    /// Adds an undirected edge between two vertices.
    ///
    /// # Panics
    ///
    /// Panics if one of the vertices does not exist.
    pub fn add_edge(&mut self, v1: usize, v2: usize) {
        if v1 >= self.colors.len() || v2 >= self.colors.len() {
            panic!("no such vertex: {}", usize::max(v1, v2));
        }
        self.adjacency[v1].insert(v2);
        self.adjacency[v2].insert(v1);
    }

    /// Returns the number of vertices.
    pub fn n_vertices(&self) -> usize {
        self.colors.len()
    }

    /// Returns the number of edges.
    pub fn n_edges(&self) -> usize {
        self.adjacency.iter().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Returns the color of a vertex.
    pub fn color(&self, vertex: usize) -> usize {
        self.colors[vertex]
    }

    /// Iterates over the neighbors of a vertex, in increasing order.
    pub fn neighbors(&self, vertex: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[vertex].iter().copied()
    }

    /// Iterates over the edges as ordered pairs `(low, high)`.
    pub fn iter_edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(v, ns)| ns.iter().filter(move |n| **n > v).map(move |n| (v, *n)))
    }
}
