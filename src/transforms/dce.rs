//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Module, ValueId};
use crate::pass::ModulePass;
use crate::utility::SaHashMap;

/// Dead-code elimination.
///
/// Operand uses are counted module-wide, then each block is swept in
/// reverse so uses are seen before definitions: a pure instruction whose
/// result is uncited is deleted and its operands' counts drop, which can
/// free its producers within the same sweep. Side-effecting instructions
/// anchor their whole operand chain.
pub struct DeadCodeEliminationPass;

impl ModulePass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dce"
    }

    fn run(&self, module: &Module) -> Module {
        let mut out = module.clone();
        let mut uses: SaHashMap<ValueId, u32> = SaHashMap::default();

        for func in &out.functions {
            for inst in func.instructions() {
                for operand in &inst.operands {
                    *uses.entry(*operand).or_insert(0) += 1;
                }
            }
        }

        for func in &mut out.functions {
            for block in &mut func.blocks {
                // reverse of definition order: one sweep per block
                // converges because every use is visited before its def
                let mut i = block.instructions.len();

                while i > 0 {
                    i -= 1;

                    let inst = &block.instructions[i];
                    let uncited = inst
                        .result
                        .map_or(false, |r| uses.get(&r).copied().unwrap_or(0) == 0);

                    if !(uncited && inst.is_pure() && !inst.has_side_effect()) {
                        continue;
                    }

                    for operand in &inst.operands {
                        if let Some(count) = uses.get_mut(operand) {
                            *count -= 1;
                        }
                    }

                    block.instructions.remove(i);
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, Function, Instruction, Opcode, Type, Value, ValueKind};

    // entry:
    //   v3 = Add float4 v2, v2
    //   Store v1, v3            ; v1 is a RWTexture2D
    //   Return
    fn store_anchored_module() -> Module {
        let mut m = Module::new("ps_2_0");

        m.push_value(Value::new(
            ValueId(1),
            ValueKind::Texture("RWTexture2D".to_string()),
            Type::parse("RWTexture2D<float4>"),
        ));
        m.push_value(Value::new(
            ValueId(2),
            ValueKind::Parameter,
            Type::parse("float4"),
        ));
        m.push_value(Value::new(ValueId(3), ValueKind::Temp, Type::parse("float4")));

        let mut func = Function::new("main", Type::parse("float4"));

        func.parameters.push(ValueId(2));
        func.blocks.push(Block::with_instructions(
            "entry",
            [
                Instruction::new(Opcode::Add)
                    .with_operands([ValueId(2), ValueId(2)])
                    .with_result(ValueId(3), Type::parse("float4")),
                Instruction::new(Opcode::Store).with_operands([ValueId(1), ValueId(3)]),
                Instruction::ret(None),
            ],
        ));
        m.functions.push(func);
        m
    }

    #[test]
    fn stores_anchor_their_producers() {
        let out = DeadCodeEliminationPass.run(&store_anchored_module());
        let block = &out.functions[0].blocks[0];

        assert_eq!(block.instructions.len(), 3);
        assert_eq!(block.instructions[0].op, Opcode::Add);
        assert_eq!(block.instructions[1].op, Opcode::Store);
    }

    #[test]
    fn dead_chains_collapse_in_one_sweep() {
        // v3 = Add v2, v2 ; v4 = Mul v3, v3 ; Return v2. both are dead
        let mut m = store_anchored_module();

        m.push_value(Value::new(ValueId(4), ValueKind::Temp, Type::parse("float4")));

        let block = &mut m.functions[0].blocks[0];

        block.instructions = vec![
            Instruction::new(Opcode::Add)
                .with_operands([ValueId(2), ValueId(2)])
                .with_result(ValueId(3), Type::parse("float4")),
            Instruction::new(Opcode::Mul)
                .with_operands([ValueId(3), ValueId(3)])
                .with_result(ValueId(4), Type::parse("float4")),
            Instruction::ret(Some(ValueId(2))),
        ];

        let out = DeadCodeEliminationPass.run(&m);
        let block = &out.functions[0].blocks[0];

        assert_eq!(block.instructions.len(), 1);
        assert_eq!(block.instructions[0].op, Opcode::Return);
    }

    #[test]
    fn impure_instructions_survive_without_uses() {
        let mut m = store_anchored_module();
        let block = &mut m.functions[0].blocks[0];

        // an intrinsic result nobody reads; not in the pure set, stays
        block.instructions[0] = Instruction::new(Opcode::Normalize)
            .with_operands([ValueId(2)])
            .with_result(ValueId(3), Type::parse("float4"));

        let out = DeadCodeEliminationPass.run(&m);

        assert_eq!(out.functions[0].blocks[0].instructions.len(), 3);
    }

    #[test]
    fn elimination_is_idempotent() {
        let once = DeadCodeEliminationPass.run(&store_anchored_module());
        let twice = DeadCodeEliminationPass.run(&once);

        assert_eq!(once, twice);
    }
}
