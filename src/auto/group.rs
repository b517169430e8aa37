use anyhow::{anyhow, Result};

/// A total bijection over the vertex index range `[0, n)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation {
    image: Vec<usize>,
}

impl Permutation {
    /// Builds a permutation from the list of vertex images.
    ///
    /// The list must be a bijection on `[0, image.len())`.
    pub fn new(image: Vec<usize>) -> Result<Self> {
        let mut seen = vec![false; image.len()];
        for i in &image {
            if *i >= image.len() || seen[*i] {
                return Err(anyhow!("not a bijection on [0, {})", image.len()));
            }
            seen[*i] = true;
        }
        Ok(Self { image })
    }

    /// Returns the size of the domain.
    pub fn domain_size(&self) -> usize {
        self.image.len()
    }

    /// Returns the image of a vertex.
    pub fn apply(&self, vertex: usize) -> usize {
        self.image[vertex]
    }

    /// Returns `true` iff the permutation moves no vertex.
    pub fn is_identity(&self) -> bool {
        self.image.iter().enumerate().all(|(i, v)| i == *v)
    }

    /// Iterates over the vertices the permutation moves.
    pub fn moved_vertices(&self) -> impl Iterator<Item = usize> + '_ {
        self.image
            .iter()
            .enumerate()
            .filter(|(i, v)| i != *v)
            .map(|(i, _)| i)
    }
}

/// A list of permutations generating an automorphism group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Group {
    permutations: Vec<Permutation>,
}

impl Group {
    /// Builds a group from its generator list.
    pub fn new(permutations: Vec<Permutation>) -> Self {
        Self { permutations }
    }

    /// Returns the generator permutations.
    pub fn permutations(&self) -> &[Permutation] {
        &self.permutations
    }
}

/// The answer of an automorphism oracle: the generator group, the vertex
/// orbits, and the group order.
///
/// The orbit and group-order figures feed the symmetry indices; they are
/// reporting material and never constrain the encoding.
#[derive(Clone, Debug)]
pub struct AutomorphismResult {
    group: Group,
    orbits: Vec<Vec<usize>>,
    group_size: f64,
    n_vertices: usize,
}

impl AutomorphismResult {
    /// Builds a new result.
    pub fn new(group: Group, orbits: Vec<Vec<usize>>, group_size: f64, n_vertices: usize) -> Self {
        Self {
            group,
            orbits,
            group_size,
            n_vertices,
        }
    }

    /// Returns the generator group.
    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Returns the vertex orbits.
    pub fn orbits(&self) -> &[Vec<usize>] {
        &self.orbits
    }

    /// Returns the order of the automorphism group.
    pub fn group_size(&self) -> f64 {
        self.group_size
    }

    /// Returns the number of vertices of the underlying graph.
    pub fn n_vertices(&self) -> usize {
        self.n_vertices
    }

    /// Returns the orbit entropy of the graph.
    pub fn graph_entropy(&self) -> f64 {
        -self
            .orbits
            .iter()
            .map(|o| o.len() as f64 / self.n_vertices as f64)
            .map(|nov| nov * nov.log2())
            .sum::<f64>()
    }

    /// Returns the Mowshowitz symmetry index.
    pub fn mowshowitz_index(&self) -> f64 {
        let orbit_part = self
            .orbits
            .iter()
            .map(|o| o.len() as f64 * (o.len() as f64).log2())
            .sum::<f64>()
            / self.n_vertices as f64;
        orbit_part + self.group_size.log2()
    }

    /// Returns the vertex symmetry index: the relative size of the largest
    /// orbit.
    pub fn vertex_symmetry_index(&self) -> f64 {
        self.largest_orbit() as f64 / self.n_vertices as f64
    }

    /// Returns the ratio between the smallest and the largest orbit.
    pub fn orbit_homogeneity_index(&self) -> f64 {
        let min = self.orbits.iter().map(Vec::len).min().unwrap_or(0);
        min as f64 / self.largest_orbit() as f64
    }

    /// Returns the mean orbit size relative to the largest orbit.
    pub fn orbit_deviation_index(&self) -> f64 {
        let max = self.largest_orbit() as f64;
        self.orbits.iter().map(|o| o.len() as f64 / max).sum::<f64>() / self.orbits.len() as f64
    }

    fn largest_orbit(&self) -> usize {
        self.orbits.iter().map(Vec::len).max().unwrap_or(1)
    }
}
