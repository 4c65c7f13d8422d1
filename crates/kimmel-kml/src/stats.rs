//! Link-chain statistics over a finished type set.
//!
//! Breadth-first enumeration of every simple link path from every type. This
//! is exponential in dense or cyclic graphs; callers that parse untrusted
//! documents should bound input size themselves.

use std::collections::{HashMap, VecDeque};

use crate::model::{GraphStats, TypeDescription};

const CHAIN_SEPARATOR: &str = ">";

pub fn chain_statistics(types: &[TypeDescription]) -> GraphStats {
    let by_id: HashMap<&str, &TypeDescription> =
        types.iter().map(|ty| (ty.id.as_str(), ty)).collect();

    let mut chains: Vec<Vec<&str>> = Vec::new();
    let mut closed: Vec<Vec<&str>> = Vec::new();
    let mut queue: VecDeque<(Vec<&str>, &TypeDescription)> = VecDeque::new();

    for ty in types {
        chains.push(vec![ty.id.as_str()]);
        queue.push_back((vec![ty.id.as_str()], ty));
    }

    while let Some((chain, node)) = queue.pop_front() {
        for link in &node.linked_type_ids {
            let link = link.as_str();
            let mut extended = chain.clone();
            extended.push(link);

            if chain.contains(&link) {
                closed.push(extended);
                continue;
            }
            if let Some(next) = by_id.get(link) {
                queue.push_back((extended.clone(), *next));
            }
            chains.push(extended);
        }
    }

    let max_chain_depth = chains.iter().chain(closed.iter()).map(Vec::len).max();

    GraphStats {
        total_types: types.len(),
        chains: chains.iter().map(|chain| chain.join(CHAIN_SEPARATOR)).collect(),
        closed_chains: closed.iter().map(|chain| chain.join(CHAIN_SEPARATOR)).collect(),
        max_chain_depth,
    }
}
