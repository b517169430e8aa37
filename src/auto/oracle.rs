use super::{AutomorphismResult, ColoredGraph, Group, Permutation};
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::process::{Command, Stdio};

/// A trait for graph automorphism oracles.
///
/// The core never depends on a concrete tool, only on this contract: an
/// oracle consumes a vertex-colored graph and returns a generator group,
/// the vertex orbits and the group order. Closures over a graph implement
/// the trait, which gives tests and embedders a zero-cost way to inject
/// precomputed groups.
pub trait AutomorphismOracle {
    /// Computes the automorphisms of the given graph.
    fn automorphisms(&mut self, graph: &ColoredGraph) -> Result<AutomorphismResult>;
}

impl<F> AutomorphismOracle for F
where
    F: FnMut(&ColoredGraph) -> Result<AutomorphismResult>,
{
    fn automorphisms(&mut self, graph: &ColoredGraph) -> Result<AutomorphismResult> {
        self(graph)
    }
}

/// An automorphism oracle which execution is made by a system command.
///
/// The graph is written to the program's standard input as a header line
/// `p auto <nVertices> <nEdges>`, one `c <vertex> <color>` line per vertex
/// and one `e <v1> <v2>` line per edge. The program must answer on its
/// standard output with a `g <order>` line, one `o <v1> <v2> ...` line per
/// orbit and one `p <img0> <img1> ...` line per generator permutation;
/// comment lines starting with `c` are skipped.
pub struct ExternalAutomorphismOracle {
    program: String,
    options: Vec<String>,
}

impl ExternalAutomorphismOracle {
    /// Builds a new external oracle.
    pub fn new(program: String, options: Vec<String>) -> Self {
        Self { program, options }
    }

    fn render_graph(graph: &ColoredGraph) -> String {
        let mut out = format!("p auto {} {}\n", graph.n_vertices(), graph.n_edges());
        for v in 0..graph.n_vertices() {
            out.push_str(&format!("c {} {}\n", v, graph.color(v)));
        }
        for (v1, v2) in graph.iter_edges() {
            out.push_str(&format!("e {} {}\n", v1, v2));
        }
        out
    }
}

impl AutomorphismOracle for ExternalAutomorphismOracle {
    fn automorphisms(&mut self, graph: &ColoredGraph) -> Result<AutomorphismResult> {
        let context = || format!("while executing the automorphism oracle {}", self.program);
        let mut child = Command::new(&self.program)
            .args(&self.options)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(context)?;
        let mut stdin = child.stdin.take().with_context(context)?;
        let instance = Self::render_graph(graph);
        let writer = std::thread::spawn(move || {
            use std::io::Write;
            stdin.write_all(instance.as_bytes())
        });
        let mut output = String::new();
        child
            .stdout
            .take()
            .with_context(context)?
            .read_to_string(&mut output)
            .with_context(context)?;
        child.wait().with_context(context)?;
        writer
            .join()
            .map_err(|_| anyhow!("oracle input writer panicked"))?
            .with_context(context)?;
        parse_oracle_output(&output, graph.n_vertices()).with_context(context)
    }
}

fn parse_oracle_output(output: &str, n_vertices: usize) -> Result<AutomorphismResult> {
    let mut group_size = None;
    let mut orbits = Vec::new();
    let mut permutations = Vec::new();
    for line in output.lines() {
        let mut words = line.split_ascii_whitespace();
        let parse_all = |words: std::str::SplitAsciiWhitespace| {
            words
                .map(|w| {
                    w.parse::<usize>()
                        .map_err(|_| anyhow!(r#""{}" is not a vertex"#, w))
                })
                .collect::<Result<Vec<usize>>>()
        };
        match words.next() {
            Some("g") => {
                let order = words
                    .next()
                    .ok_or_else(|| anyhow!("missing group order"))?
                    .parse::<f64>()
                    .map_err(|_| anyhow!("invalid group order"))?;
                if group_size.replace(order).is_some() {
                    return Err(anyhow!("multiple group order lines"));
                }
            }
            Some("o") => orbits.push(parse_all(words)?),
            Some("p") => {
                let image = parse_all(words)?;
                if image.len() != n_vertices {
                    return Err(anyhow!(
                        "permutation over {} vertices, expected {}",
                        image.len(),
                        n_vertices
                    ));
                }
                permutations.push(Permutation::new(image)?);
            }
            Some("c") | None => continue,
            Some(w) => return Err(anyhow!(r#"unexpected line "{}""#, w)),
        }
    }
    let group_size = group_size.ok_or_else(|| anyhow!("no group order in oracle output"))?;
    Ok(AutomorphismResult::new(
        Group::new(permutations),
        orbits,
        group_size,
        n_vertices,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> ColoredGraph {
        let mut g = ColoredGraph::new();
        let a = g.add_vertex(0);
        let b = g.add_vertex(0);
        let c = g.add_vertex(1);
        g.add_edge(a, b);
        g.add_edge(b, c);
        g.add_edge(a, c);
        g
    }

    #[test]
    fn test_render_graph() {
        let rendered = ExternalAutomorphismOracle::render_graph(&triangle());
        assert_eq!(
            "p auto 3 3\nc 0 0\nc 1 0\nc 2 1\ne 0 1\ne 0 2\ne 1 2\n",
            rendered
        );
    }

    #[test]
    fn test_parse_output_ok() {
        let output = "c comment\ng 2\no 0 1\no 2\np 1 0 2\n";
        let result = parse_oracle_output(output, 3).unwrap();
        assert_eq!(2.0, result.group_size());
        assert_eq!(2, result.orbits().len());
        assert_eq!(1, result.group().permutations().len());
        assert_eq!(1, result.group().permutations()[0].apply(0));
    }

    #[test]
    fn test_parse_output_no_group_order() {
        assert!(parse_oracle_output("o 0 1 2\n", 3).is_err());
    }

    #[test]
    fn test_parse_output_wrong_permutation_size() {
        assert!(parse_oracle_output("g 1\np 1 0\n", 3).is_err());
    }

    #[test]
    fn test_parse_output_unexpected_line() {
        assert!(parse_oracle_output("g 1\nfoo\n", 3).is_err());
    }

    #[test]
    fn test_external_oracle() {
        if !cfg!(target_family = "unix") {
            return;
        }
        let mut oracle = ExternalAutomorphismOracle::new(
            "echo".to_string(),
            vec!["g 2\no 0 1\no 2\np 1 0 2".to_string()],
        );
        let result = oracle.automorphisms(&triangle()).unwrap();
        assert_eq!(2.0, result.group_size());
    }

    #[test]
    fn test_fn_oracle() {
        let mut oracle = |g: &ColoredGraph| {
            Ok(AutomorphismResult::new(
                Group::default(),
                vec![],
                1.0,
                g.n_vertices(),
            ))
        };
        let result = AutomorphismOracle::automorphisms(&mut oracle, &triangle()).unwrap();
        assert_eq!(3, result.n_vertices());
    }
}
