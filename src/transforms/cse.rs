//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Instruction, Module, Opcode, Type, ValueId};
use crate::pass::ModulePass;
use crate::utility::SaHashMap;
use smallvec::SmallVec;

/// Block-local common-subexpression elimination.
///
/// Pure instructions are keyed on `(op, type, tag, operands)`; a repeat
/// within the same block is rewritten into an `Assign` of the earlier
/// result. The table is cleared at every side-effect barrier and never
/// crosses block boundaries. `Assign`s are neither keyed nor unified,
/// otherwise copies of the same value would collapse into chains on a
/// second run.
pub struct CommonSubexprPass;

impl ModulePass for CommonSubexprPass {
    fn name(&self) -> &'static str {
        "cse"
    }

    fn run(&self, module: &Module) -> Module {
        let mut out = module.clone();

        for func in &mut out.functions {
            for block in &mut func.blocks {
                eliminate_in_block(&mut block.instructions);
            }
        }

        out
    }
}

#[derive(Hash, Eq, PartialEq)]
struct ExprKey {
    op: String,
    ty: Option<Type>,
    tag: Option<String>,
    operands: SmallVec<[ValueId; 4]>,
}

fn eliminate_in_block(instructions: &mut [Instruction]) {
    let mut available: SaHashMap<ExprKey, ValueId> = SaHashMap::default();

    for inst in instructions {
        if inst.has_side_effect() {
            available.clear();
            continue;
        }

        if !inst.is_pure() || inst.op == Opcode::Assign {
            continue;
        }

        let Some(result) = inst.result else {
            continue;
        };

        let key = ExprKey {
            op: inst.op.name().to_string(),
            ty: inst.ty.clone(),
            tag: inst.tag_text(),
            operands: inst.operands.clone(),
        };

        match available.get(&key) {
            Some(prior) => {
                *inst = Instruction {
                    op: Opcode::Assign,
                    operands: SmallVec::from_iter([*prior]),
                    result: Some(result),
                    ty: inst.ty.clone(),
                    tag: None,
                };
            }
            None => {
                available.insert(key, result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, Function, Value, ValueKind};

    fn add(result: u64) -> Instruction {
        Instruction::new(Opcode::Add)
            .with_operands([ValueId(1), ValueId(2)])
            .with_result(ValueId(result), Type::parse("float"))
    }

    fn module_with(instructions: Vec<Instruction>) -> Module {
        let mut m = Module::new("ps_2_0");

        for id in 1..=6 {
            m.push_value(Value::new(
                ValueId(id),
                ValueKind::Parameter,
                Type::parse("float"),
            ));
        }

        let mut func = Function::new("main", Type::parse("float"));
        let mut all = instructions;

        all.push(Instruction::ret(Some(ValueId(1))));
        func.blocks.push(Block::with_instructions("entry", all));
        m.functions.push(func);
        m
    }

    #[test]
    fn duplicate_expressions_unify() {
        let out = CommonSubexprPass.run(&module_with(vec![add(3), add(4)]));
        let block = &out.functions[0].blocks[0];

        assert_eq!(block.instructions[0].op, Opcode::Add);
        assert_eq!(block.instructions[1].op, Opcode::Assign);
        assert_eq!(block.instructions[1].operands.as_slice(), &[ValueId(3)]);
    }

    #[test]
    fn side_effects_are_barriers() {
        let store = Instruction::new(Opcode::Store).with_operands([ValueId(5), ValueId(1)]);
        let out = CommonSubexprPass.run(&module_with(vec![add(3), store, add(4)]));
        let block = &out.functions[0].blocks[0];

        // the second add sits past the store and must survive
        assert_eq!(block.instructions[2].op, Opcode::Add);
    }

    #[test]
    fn differing_tags_do_not_unify() {
        let a = Instruction::new(Opcode::Call)
            .with_operands([ValueId(1)])
            .with_result(ValueId(3), Type::parse("float"))
            .with_tag(crate::ir::InstTag::Text("lightA".to_string()));
        let b = Instruction::new(Opcode::Call)
            .with_operands([ValueId(1)])
            .with_result(ValueId(4), Type::parse("float"))
            .with_tag(crate::ir::InstTag::Text("lightB".to_string()));

        let out = CommonSubexprPass.run(&module_with(vec![a, b]));
        let block = &out.functions[0].blocks[0];

        // calls aren't pure anyway, but even for pure ops the tag is
        // part of the key; nothing may unify here
        assert_eq!(block.instructions[0].op, Opcode::Call);
        assert_eq!(block.instructions[1].op, Opcode::Call);
    }

    #[test]
    fn elimination_is_idempotent() {
        let module = module_with(vec![add(3), add(4), add(5)]);
        let once = CommonSubexprPass.run(&module);
        let twice = CommonSubexprPass.run(&once);

        assert_eq!(once, twice);
    }
}
