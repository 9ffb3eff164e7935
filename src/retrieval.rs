//! Nearest-case retrieval
//!
//! Recursive descent over the case index. At each level the similarity
//! strategy narrows the keys to the nearest candidates, every candidate is
//! explored, and the candidate whose subtree yields the lowest leaf price
//! wins. Ties keep the first candidate in index order.
//!
//! This is a minimum-price search constrained to near branches, not a plain
//! nearest-neighbour search: once several branches qualify, price decides.

use serde::Serialize;

use crate::index::{format_path, CaseIndex, IndexNode, Leaf};
use crate::profile::Profile;
use crate::similarity::Similarity;
use crate::types::{Descriptor, DescriptorValue, Query};
use crate::{Error, Result};

/// Value chosen for one descriptor during retrieval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub descriptor: Descriptor,
    pub value: DescriptorValue,
    /// Whether the value matched the query exactly
    pub exact: bool,
}

/// Case retrieved for a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedCase {
    /// Leaf aggregate price of the matched path
    pub unit_price: f64,
    /// One choice per descriptor, in `Descriptor::ORDER`
    pub choices: Vec<Choice>,
    /// Positions, in the case base the index was built from, backing the
    /// matched leaf
    pub members: Vec<usize>,
    pub leaves_explored: usize,
}

impl RetrievedCase {
    pub fn value(&self, descriptor: Descriptor) -> Option<&DescriptorValue> {
        self.choices
            .iter()
            .find(|c| c.descriptor == descriptor)
            .map(|c| &c.value)
    }

    pub fn path(&self) -> Vec<DescriptorValue> {
        self.choices.iter().map(|c| c.value.clone()).collect()
    }
}

/// Best branch found below a node; choices accumulate leaf first.
struct Branch<'a> {
    leaf: &'a Leaf,
    choices: Vec<Choice>,
}

pub struct Retriever<'a> {
    index: &'a CaseIndex,
    profile: &'a Profile,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a CaseIndex, profile: &'a Profile) -> Self {
        Self { index, profile }
    }

    /// Retrieve the case for a query
    pub fn retrieve(&self, query: &Query) -> Result<RetrievedCase> {
        let target = query.resolve()?;
        let mut explored = 0;

        let branch = self.descend(self.index.root(), 0, &target, &mut explored)?;
        let mut choices = branch.choices;
        choices.reverse();

        tracing::debug!(
            path = %format_path(&choices.iter().map(|c| c.value.clone()).collect::<Vec<_>>()),
            unit_price = branch.leaf.unit_price,
            leaves_explored = explored,
            "Retrieved case"
        );

        Ok(RetrievedCase {
            unit_price: branch.leaf.unit_price,
            choices,
            members: branch.leaf.members.clone(),
            leaves_explored: explored,
        })
    }

    fn descend(
        &self,
        node: &'a IndexNode,
        depth: usize,
        target: &[DescriptorValue],
        explored: &mut usize,
    ) -> Result<Branch<'a>> {
        let (descriptor, children) = match node {
            IndexNode::Leaf(leaf) => {
                if depth != Descriptor::ORDER.len() {
                    return Err(Error::index(format!("leaf reached at depth {}", depth)));
                }
                *explored += 1;
                return Ok(Branch {
                    leaf,
                    choices: Vec::with_capacity(depth),
                });
            }
            IndexNode::Interior {
                descriptor,
                children,
            } => (*descriptor, children),
        };

        let spec = self
            .profile
            .specs()
            .get(depth)
            .filter(|s| s.descriptor == descriptor)
            .ok_or_else(|| {
                Error::index(format!("unexpected {} level at depth {}", descriptor, depth))
            })?;
        let wanted = target
            .get(depth)
            .ok_or(Error::IncompleteQuery(descriptor))?;

        let selection =
            spec.similarity
                .select(descriptor, children.iter().map(|(key, _)| key), wanted)?;

        if !selection.exact && spec.similarity == Similarity::ExactMatch {
            tracing::debug!(
                %descriptor,
                value = %wanted,
                candidates = selection.positions.len(),
                "No exact match, exploring every branch"
            );
        }

        let mut best: Option<(usize, Branch<'a>)> = None;
        for position in selection.positions {
            let branch = self.descend(&children[position].1, depth + 1, target, explored)?;
            let better = match &best {
                Some((_, current)) => branch.leaf.unit_price < current.leaf.unit_price,
                None => true,
            };
            if better {
                best = Some((position, branch));
            }
        }

        let (position, mut branch) = best.ok_or(Error::EmptyCandidateSet(descriptor))?;
        branch.choices.push(Choice {
            descriptor,
            value: children[position].0.clone(),
            exact: selection.exact,
        });

        Ok(branch)
    }
}
