//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Block, Instruction, Type, ValueId};

/// A function: a name, a return type, parameter values and a non-empty
/// list of basic blocks. The first block is the entry block.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Function {
    /// The function's name.
    pub name: String,
    /// The declared return type.
    pub return_type: Type,
    /// Parameter value ids, in declaration order.
    pub parameters: Vec<ValueId>,
    /// The basic blocks; the first is the entry block.
    pub blocks: Vec<Block>,
}

impl Function {
    /// A function with no parameters or blocks.
    pub fn new(name: impl Into<String>, return_type: Type) -> Function {
        Function {
            name: name.into(),
            return_type,
            parameters: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// The entry block, when the function has a body.
    pub fn entry_block(&self) -> Option<&Block> {
        self.blocks.first()
    }

    /// Looks up a block by id.
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Iterates over every instruction in layout order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|b| b.instructions.iter())
    }
}
