//! Case index
//!
//! A tree with one level per descriptor in `Descriptor::ORDER`. Each
//! root-to-leaf path is the exact descriptor tuple of a non-empty group of
//! cases, and the leaf holds that group's area-weighted unit price:
//! `sum(price) / sum(surface)`.
//!
//! The index does not support incremental updates. Leaving a case out means
//! building a new index from a new case base.

use std::collections::HashMap;

use crate::casebase::CaseBase;
use crate::types::{Case, Descriptor, DescriptorValue};
use crate::{Error, Result};

/// Aggregated price of the cases sharing one full descriptor path
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub unit_price: f64,
    pub total_price: f64,
    pub total_area: f64,
    /// Positions of the backing cases in the case base
    pub members: Vec<usize>,
}

#[derive(Debug, Clone)]
pub enum IndexNode {
    Interior {
        descriptor: Descriptor,
        /// Children in first-seen order of their key in the case base
        children: Vec<(DescriptorValue, IndexNode)>,
    },
    Leaf(Leaf),
}

impl IndexNode {
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            IndexNode::Leaf(leaf) => Some(leaf),
            IndexNode::Interior { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseIndex {
    root: IndexNode,
    case_count: usize,
    leaf_count: usize,
}

impl CaseIndex {
    /// Build the index over every case of the base
    pub fn build(base: &CaseBase) -> Result<Self> {
        if base.is_empty() {
            return Err(Error::index("cannot index an empty case base"));
        }

        let members: Vec<usize> = (0..base.len()).collect();
        let mut path = Vec::with_capacity(Descriptor::ORDER.len());
        let mut leaf_count = 0;
        let root = build_level(base.cases(), members, 0, &mut path, &mut leaf_count)?;

        tracing::debug!(cases = base.len(), leaves = leaf_count, "Built case index");

        Ok(Self {
            root,
            case_count: base.len(),
            leaf_count,
        })
    }

    pub fn root(&self) -> &IndexNode {
        &self.root
    }

    /// Number of indexed cases
    pub fn len(&self) -> usize {
        self.case_count
    }

    pub fn is_empty(&self) -> bool {
        self.case_count == 0
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Every leaf with its descriptor path, in depth-first order
    pub fn leaves(&self) -> Vec<(Vec<DescriptorValue>, &Leaf)> {
        let mut out = Vec::with_capacity(self.leaf_count);
        let mut stack: Vec<(Vec<DescriptorValue>, &IndexNode)> = vec![(Vec::new(), &self.root)];

        while let Some((path, node)) = stack.pop() {
            match node {
                IndexNode::Leaf(leaf) => out.push((path, leaf)),
                IndexNode::Interior { children, .. } => {
                    for (key, child) in children.iter().rev() {
                        let mut child_path = path.clone();
                        child_path.push(key.clone());
                        stack.push((child_path, child));
                    }
                }
            }
        }

        out
    }

    /// Leaf at an exact descriptor path
    pub fn lookup(&self, path: &[DescriptorValue]) -> Option<&Leaf> {
        let mut node = &self.root;
        for key in path {
            match node {
                IndexNode::Interior { children, .. } => {
                    node = children.iter().find(|(k, _)| k == key).map(|(_, c)| c)?;
                }
                IndexNode::Leaf(_) => return None,
            }
        }
        node.as_leaf()
    }
}

fn build_level(
    cases: &[Case],
    members: Vec<usize>,
    depth: usize,
    path: &mut Vec<DescriptorValue>,
    leaf_count: &mut usize,
) -> Result<IndexNode> {
    let Some(&descriptor) = Descriptor::ORDER.get(depth) else {
        *leaf_count += 1;
        return aggregate(cases, members, path).map(IndexNode::Leaf);
    };

    let mut positions: HashMap<DescriptorValue, usize> = HashMap::new();
    let mut groups: Vec<(DescriptorValue, Vec<usize>)> = Vec::new();

    for member in members {
        let key = cases[member].value(descriptor);
        match positions.get(&key) {
            Some(&slot) => groups[slot].1.push(member),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![member]));
            }
        }
    }

    let mut children = Vec::with_capacity(groups.len());
    for (key, group) in groups {
        path.push(key.clone());
        let child = build_level(cases, group, depth + 1, path, leaf_count)?;
        path.pop();
        children.push((key, child));
    }

    Ok(IndexNode::Interior {
        descriptor,
        children,
    })
}

fn aggregate(cases: &[Case], members: Vec<usize>, path: &[DescriptorValue]) -> Result<Leaf> {
    let total_price: f64 = members.iter().map(|&m| cases[m].price).sum();
    let total_area: f64 = members.iter().map(|&m| cases[m].surface).sum();

    if total_area == 0.0 {
        return Err(Error::DegenerateAggregate {
            path: format_path(path),
        });
    }

    Ok(Leaf {
        unit_price: total_price / total_area,
        total_price,
        total_area,
        members,
    })
}

pub(crate) fn format_path(path: &[DescriptorValue]) -> String {
    path.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
