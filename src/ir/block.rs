//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::Instruction;

/// A basic block: a maximal linear run of instructions ending in exactly
/// one terminator.
///
/// Block ids are strings, unique within their function. The lowering
/// pipeline names them `entry`, `then1`, `merge3`, `while.cond4`, and so
/// on; any unique spelling is valid.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Block {
    /// The block's id, unique within its function.
    pub id: String,
    /// The instructions, terminator last.
    pub instructions: Vec<Instruction>,
}

impl Block {
    /// An empty block with the given id.
    pub fn new(id: impl Into<String>) -> Block {
        Block {
            id: id.into(),
            instructions: Vec::new(),
        }
    }

    /// A block with the given instructions.
    pub fn with_instructions(
        id: impl Into<String>,
        instructions: impl IntoIterator<Item = Instruction>,
    ) -> Block {
        Block {
            id: id.into(),
            instructions: instructions.into_iter().collect(),
        }
    }

    /// The block's terminator, when the final instruction is one.
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|inst| inst.is_terminator())
    }

    /// Whether the block currently ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.terminator().is_some()
    }
}
