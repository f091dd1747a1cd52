//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Function, InstTag};
use crate::utility::SaHashMap;
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Successor/predecessor information for the blocks of a function.
///
/// Blocks are addressed by their dense layout index so edge queries are
/// O(1); the string block ids only appear at the lookup boundary. Edges
/// come from terminator targets; a target naming a block that does not
/// exist contributes no edge (the validator reports it).
pub struct ControlFlowGraph {
    lookup: SaHashMap<String, usize>,
    successors: Vec<SmallVec<[usize; 2]>>,
    predecessors: Vec<SmallVec<[usize; 2]>>,
}

impl ControlFlowGraph {
    /// Computes flowgraph information for a function.
    pub fn compute(func: &Function) -> ControlFlowGraph {
        let mut lookup = SaHashMap::default();

        for (i, block) in func.blocks.iter().enumerate() {
            // first definition wins when ids collide; the validator
            // rejects duplicate ids separately
            lookup.entry(block.id.clone()).or_insert(i);
        }

        let mut graph = ControlFlowGraph {
            lookup,
            successors: vec![SmallVec::new(); func.blocks.len()],
            predecessors: vec![SmallVec::new(); func.blocks.len()],
        };

        for (i, block) in func.blocks.iter().enumerate() {
            let terminator = match block.terminator() {
                Some(inst) => inst,
                None => continue,
            };

            match &terminator.tag {
                Some(InstTag::Target(target)) => graph.add_edge_to(i, target),
                Some(InstTag::CondTargets { then_to, else_to }) => {
                    graph.add_edge_to(i, then_to);
                    graph.add_edge_to(i, else_to);
                }
                _ => {}
            }
        }

        graph
    }

    /// The number of blocks in the graph.
    pub fn len(&self) -> usize {
        self.successors.len()
    }

    /// Whether the function had no blocks at all.
    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    /// The layout index of a block id, when the block exists.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.lookup.get(id).copied()
    }

    /// The successors of the block at `index`.
    pub fn successors(&self, index: usize) -> &[usize] {
        &self.successors[index]
    }

    /// The predecessors of the block at `index`.
    pub fn predecessors(&self, index: usize) -> &[usize] {
        &self.predecessors[index]
    }

    /// Which blocks are reachable from the entry block along terminator
    /// edges, as a dense flag vector. BFS, entry is index 0.
    pub fn reachable_from_entry(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.len()];
        let mut worklist = VecDeque::new();

        if !self.is_empty() {
            reachable[0] = true;
            worklist.push_back(0);
        }

        while let Some(block) = worklist.pop_front() {
            for &succ in self.successors(block) {
                if !reachable[succ] {
                    reachable[succ] = true;
                    worklist.push_back(succ);
                }
            }
        }

        reachable
    }

    fn add_edge_to(&mut self, from: usize, target: &str) {
        if let Some(to) = self.index_of(target) {
            if !self.successors[from].contains(&to) {
                self.successors[from].push(to);
            }

            if !self.predecessors[to].contains(&from) {
                self.predecessors[to].push(from);
            }
        }
    }
}
