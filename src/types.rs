use std::collections::HashMap;

/// Dense index of a contig in the [`Registry`].
pub type ContigId = usize;

/// Dense index of a bin within one side.
pub type BinId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// One occurrence of a contig inside a bin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContigCopy {
    pub contig: ContigId,
    pub bin: BinId,
    /// 1-based position of the contig within its bin.
    pub position: usize,
}

#[derive(Clone, Debug)]
pub struct ContigEntry {
    pub name: String,
    pub length: u64,
    pub left_copies: Vec<ContigCopy>,
    pub right_copies: Vec<ContigCopy>,
}

impl ContigEntry {
    pub fn new(name: String, length: u64) -> Self {
        Self {
            name,
            length,
            left_copies: Vec::new(),
            right_copies: Vec::new(),
        }
    }

    pub fn copies(&self, side: Side) -> &[ContigCopy] {
        match side {
            Side::Left => &self.left_copies,
            Side::Right => &self.right_copies,
        }
    }

    /// A contig is common when both sides hold at least one copy of it.
    pub fn is_common(&self) -> bool {
        !self.left_copies.is_empty() && !self.right_copies.is_empty()
    }
}

/// Bijection between dense bin indices and external bin names for one side.
#[derive(Clone, Debug, Default)]
pub struct BinIndex {
    names: Vec<String>,
    ids: HashMap<String, BinId>,
    sizes: Vec<usize>,
}

impl BinIndex {
    /// Returns the index of `name`, registering it if it is new.
    pub fn get_or_insert(&mut self, name: &str) -> BinId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        self.sizes.push(0);
        id
    }

    /// Records one more member in bin `id` and returns its 1-based position.
    fn push_member(&mut self, id: BinId) -> usize {
        self.sizes[id] += 1;
        self.sizes[id]
    }

    pub fn id(&self, name: &str) -> Option<BinId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: BinId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Contig table plus the per-side bin bijections. Built once by the loader,
/// read-only for the comparison.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    contigs: Vec<ContigEntry>,
    by_name: HashMap<String, ContigId>,
    pub left_bins: BinIndex,
    pub right_bins: BinIndex,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a copy of `contig` to `bin` on `side`. The first length seen
    /// for a contig is kept; returns `false` when `length` disagrees with it.
    pub fn add_copy(&mut self, side: Side, bin: &str, contig: &str, length: u64) -> bool {
        let contig_id = match self.by_name.get(contig) {
            Some(&id) => id,
            None => {
                let id = self.contigs.len();
                self.contigs.push(ContigEntry::new(contig.to_string(), length));
                self.by_name.insert(contig.to_string(), id);
                id
            }
        };
        let bins = self.bins_mut(side);
        let bin_id = bins.get_or_insert(bin);
        let position = bins.push_member(bin_id);

        let entry = &mut self.contigs[contig_id];
        let copy = ContigCopy {
            contig: contig_id,
            bin: bin_id,
            position,
        };
        match side {
            Side::Left => entry.left_copies.push(copy),
            Side::Right => entry.right_copies.push(copy),
        }
        entry.length == length
    }

    pub fn bins(&self, side: Side) -> &BinIndex {
        match side {
            Side::Left => &self.left_bins,
            Side::Right => &self.right_bins,
        }
    }

    fn bins_mut(&mut self, side: Side) -> &mut BinIndex {
        match side {
            Side::Left => &mut self.left_bins,
            Side::Right => &mut self.right_bins,
        }
    }

    pub fn contig(&self, id: ContigId) -> &ContigEntry {
        &self.contigs[id]
    }

    pub fn contig_id(&self, name: &str) -> Option<ContigId> {
        self.by_name.get(name).copied()
    }

    pub fn contigs(&self) -> impl Iterator<Item = (ContigId, &ContigEntry)> {
        self.contigs.iter().enumerate()
    }

    pub fn common_contigs(&self) -> Vec<ContigId> {
        self.contigs()
            .filter(|(_, c)| c.is_common())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.contigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }
}

/// A named bin of contig ids, as used by evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bin {
    pub name: String,
    pub contigs: Vec<String>,
}

/// Bins of one set in input order, with the length of every contig seen.
#[derive(Clone, Debug, Default)]
pub struct BinSet {
    pub bins: Vec<Bin>,
    pub lengths: HashMap<String, u64>,
}
