//! Fragmentation cost of a (partial) assignment.
//!
//! Applying an assignment renames every matched copy pair to a synthetic
//! identity shared by exactly one left and one right copy. Bins linked by a
//! shared identity form a bipartite graph; within each connected component a
//! bin's contigs are split according to which neighbour they are shared with,
//! and each split is charged with [`partition_cost`]. Left-side splits are
//! "cuts", right-side splits are "joins".

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::trace;

use crate::matching::Matching;
use crate::types::{BinId, ContigId, Registry, Side};

/// Synthetic identity `contig#k` of the `k`-th matched pair of a contig.
/// Distinct contigs never share an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenamedContig {
    pub contig: ContigId,
    pub k: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenamedCopy {
    pub id: RenamedContig,
    pub bin: BinId,
    pub position: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SplitCosts {
    pub cuts: f64,
    pub joins: f64,
}

impl SplitCosts {
    pub fn total(&self) -> f64 {
        self.cuts + self.joins
    }
}

/// Renames the copies selected by each contig's matching. Unmatched copies
/// are dropped.
pub fn rename_by_matching(
    registry: &Registry,
    assignment: &[(ContigId, Matching)],
) -> (Vec<RenamedCopy>, Vec<RenamedCopy>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (contig, matching) in assignment {
        let entry = registry.contig(*contig);
        for (k, (l, r)) in matching.pairs().enumerate() {
            let id = RenamedContig {
                contig: *contig,
                k,
            };
            let lc = entry.left_copies[l];
            let rc = entry.right_copies[r];
            left.push(RenamedCopy {
                id,
                bin: lc.bin,
                position: lc.position,
            });
            right.push(RenamedCopy {
                id,
                bin: rc.bin,
                position: rc.position,
            });
        }
    }
    (left, right)
}

/// `Σ len(S)^p - max len(S)^p` over the parts of a partition, where `len(S)`
/// sums the original contig lengths in the part. Never negative for `p > 0`.
pub fn partition_cost<'a, I>(parts: I, registry: &Registry, exponent: f64) -> f64
where
    I: IntoIterator<Item = &'a BTreeSet<RenamedContig>>,
{
    let mut total = 0.0;
    let mut largest = 0.0f64;
    for part in parts {
        let len: f64 = part
            .iter()
            .map(|c| registry.contig(c.contig).length as f64)
            .sum();
        let cost = len.powf(exponent);
        total += cost;
        largest = largest.max(cost);
    }
    total - largest
}

/// Refines `parts` against `shared`: a part straddling the boundary is
/// replaced by its intersection and difference, any other part is kept.
fn refine(
    parts: Vec<BTreeSet<RenamedContig>>,
    shared: &BTreeSet<RenamedContig>,
) -> Vec<BTreeSet<RenamedContig>> {
    let mut refined = Vec::with_capacity(parts.len() + 1);
    for part in parts {
        let (inside, outside): (BTreeSet<_>, BTreeSet<_>) =
            part.iter().copied().partition(|c| shared.contains(c));
        if inside.is_empty() || outside.is_empty() {
            refined.push(part);
        } else {
            refined.push(inside);
            refined.push(outside);
        }
    }
    refined
}

/// Union-find with path halving and union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Bins touched by the renamed copies, linked when they share an identity.
struct BinGraph {
    /// Side tag of each node, recorded when the node is created.
    sides: Vec<Side>,
    /// Renamed contigs held by each node.
    contents: Vec<BTreeSet<RenamedContig>>,
    /// Per node: `(neighbour, identities shared with it)`.
    adjacency: Vec<Vec<(usize, BTreeSet<RenamedContig>)>>,
}

impl BinGraph {
    fn build(left: &[RenamedCopy], right: &[RenamedCopy]) -> Self {
        let mut index: HashMap<(Side, BinId), usize> = HashMap::new();
        let mut sides = Vec::new();
        let mut contents: Vec<BTreeSet<RenamedContig>> = Vec::new();

        for (side, copies) in [(Side::Left, left), (Side::Right, right)] {
            for copy in copies {
                let node = *index.entry((side, copy.bin)).or_insert_with(|| {
                    sides.push(side);
                    contents.push(BTreeSet::new());
                    sides.len() - 1
                });
                contents[node].insert(copy.id);
            }
        }

        let mut holders: HashMap<RenamedContig, Vec<usize>> = HashMap::new();
        for copy in right {
            holders
                .entry(copy.id)
                .or_default()
                .push(index[&(Side::Right, copy.bin)]);
        }

        let mut shared: BTreeMap<(usize, usize), BTreeSet<RenamedContig>> = BTreeMap::new();
        for copy in left {
            let l = index[&(Side::Left, copy.bin)];
            for &r in holders.get(&copy.id).into_iter().flatten() {
                shared.entry((l, r)).or_default().insert(copy.id);
            }
        }

        let mut adjacency = vec![Vec::new(); sides.len()];
        for ((l, r), ids) in shared {
            adjacency[l].push((r, ids.clone()));
            adjacency[r].push((l, ids));
        }

        Self {
            sides,
            contents,
            adjacency,
        }
    }

    /// Connected components, each as a list of node indices in node order.
    fn components(&self) -> Vec<Vec<usize>> {
        let mut uf = UnionFind::new(self.sides.len());
        for (a, neighbours) in self.adjacency.iter().enumerate() {
            for (b, _) in neighbours {
                uf.union(a, *b);
            }
        }

        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut order = Vec::new();
        for node in 0..self.sides.len() {
            let root = uf.find(node);
            let members = by_root.entry(root).or_default();
            if members.is_empty() {
                order.push(root);
            }
            members.push(node);
        }
        order
            .into_iter()
            .filter_map(|root| by_root.remove(&root))
            .collect()
    }

    /// Splits a component into its left-like and right-like nodes by
    /// two-colouring from the side tag of its first node.
    fn split_component(&self, component: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let mut colour: HashMap<usize, Side> = HashMap::with_capacity(component.len());
        let mut stack = Vec::new();
        if let Some(&seed) = component.first() {
            colour.insert(seed, self.sides[seed]);
            stack.push(seed);
        }
        while let Some(node) = stack.pop() {
            let next = colour[&node].opposite();
            for (neighbour, _) in &self.adjacency[node] {
                if !colour.contains_key(neighbour) {
                    colour.insert(*neighbour, next);
                    stack.push(*neighbour);
                }
            }
        }
        debug_assert!(colour.iter().all(|(n, s)| self.sides[*n] == *s));

        component
            .iter()
            .copied()
            .partition(|n| colour.get(n).copied().unwrap_or(self.sides[*n]) == Side::Left)
    }

    /// Partition of a node's contigs induced by its neighbours.
    fn node_partition(&self, node: usize) -> Vec<BTreeSet<RenamedContig>> {
        let mut parts = vec![self.contents[node].clone()];
        for (_, shared) in &self.adjacency[node] {
            parts = refine(parts, shared);
        }
        parts
    }
}

/// Evaluates the cuts and joins cost of assignments over one registry.
pub struct CostEvaluator<'a> {
    registry: &'a Registry,
    exponent: f64,
}

impl<'a> CostEvaluator<'a> {
    pub fn new(registry: &'a Registry, exponent: f64) -> Self {
        Self { registry, exponent }
    }

    /// Cost of every contig matched so far in `assignment`.
    pub fn evaluate(&self, assignment: &[(ContigId, Matching)]) -> SplitCosts {
        let (left, right) = rename_by_matching(self.registry, assignment);
        self.match_cost(&left, &right)
    }

    pub fn match_cost(&self, left: &[RenamedCopy], right: &[RenamedCopy]) -> SplitCosts {
        let graph = BinGraph::build(left, right);
        let components = graph.components();
        trace!(
            "{} bins in {} connected components",
            graph.sides.len(),
            components.len()
        );

        let mut costs = SplitCosts::default();
        for component in &components {
            let (left_nodes, right_nodes) = graph.split_component(component);
            costs.cuts += self.splits_cost(&graph, &left_nodes);
            costs.joins += self.splits_cost(&graph, &right_nodes);
        }
        costs
    }

    fn splits_cost(&self, graph: &BinGraph, nodes: &[usize]) -> f64 {
        nodes
            .iter()
            .map(|&node| {
                let parts = graph.node_partition(node);
                partition_cost(&parts, self.registry, self.exponent)
            })
            .sum()
    }
}
