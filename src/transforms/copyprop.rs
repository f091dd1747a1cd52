//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::ControlFlowGraph;
use crate::ir::{Function, Instruction, Module, Opcode, ValueId};
use crate::pass::ModulePass;
use crate::utility::SaHashMap;
use std::collections::VecDeque;

/// Branching-aware copy propagation.
///
/// A forward dataflow over the CFG computes, per block, which values are
/// known copies of which representatives. `Assign`s introduce a mapping,
/// any other definition kills one, and a merge keeps only the entries
/// every predecessor agrees on. Operands are then rewritten to their
/// representative at the point of use. The `Assign`s themselves stay in
/// place; dead-code elimination removes the unreferenced ones later.
pub struct CopyPropagationPass;

impl ModulePass for CopyPropagationPass {
    fn name(&self) -> &'static str {
        "copyprop"
    }

    fn run(&self, module: &Module) -> Module {
        let mut out = module.clone();

        for func in &mut out.functions {
            propagate(func);
        }

        out
    }
}

type CopyMap = SaHashMap<ValueId, ValueId>;

fn propagate(func: &mut Function) {
    if func.blocks.is_empty() {
        return;
    }

    let cfg = ControlFlowGraph::compute(func);
    let count = func.blocks.len();
    let mut ins: Vec<CopyMap> = vec![CopyMap::default(); count];
    let mut outs: Vec<CopyMap> = vec![CopyMap::default(); count];
    let mut visited = vec![false; count];
    let mut worklist = VecDeque::from([0usize]);

    // fixed point: maps only ever shrink after their optimistic first
    // computation, so this terminates
    while let Some(block) = worklist.pop_front() {
        let in_map = if block == 0 {
            CopyMap::default()
        } else {
            merge_predecessors(&cfg, &outs, &visited, block)
        };

        let out_map = transfer_block(&func.blocks[block].instructions, &in_map);
        let changed = !visited[block] || ins[block] != in_map || outs[block] != out_map;

        visited[block] = true;
        ins[block] = in_map;
        outs[block] = out_map;

        if changed {
            worklist.extend(cfg.successors(block).iter().copied());
        }
    }

    for (block, in_map) in func.blocks.iter_mut().zip(ins) {
        let mut state = in_map;

        for inst in &mut block.instructions {
            for operand in inst.operands.iter_mut() {
                if let Some(rep) = state.get(operand) {
                    *operand = *rep;
                }
            }

            transfer_inst(inst, &mut state);
        }
    }
}

// entries survive a merge only when every (already computed)
// predecessor carries them with the identical representative
fn merge_predecessors(
    cfg: &ControlFlowGraph,
    outs: &[CopyMap],
    visited: &[bool],
    block: usize,
) -> CopyMap {
    let mut preds = cfg
        .predecessors(block)
        .iter()
        .copied()
        .filter(|p| visited[*p]);

    let mut merged = match preds.next() {
        Some(first) => outs[first].clone(),
        None => return CopyMap::default(),
    };

    for pred in preds {
        merged.retain(|value, rep| outs[pred].get(value) == Some(&*rep));
    }

    merged
}

fn transfer_block(instructions: &[Instruction], in_map: &CopyMap) -> CopyMap {
    let mut map = in_map.clone();

    for inst in instructions {
        transfer_inst(inst, &mut map);
    }

    map
}

fn transfer_inst(inst: &Instruction, map: &mut CopyMap) {
    let Some(result) = inst.result else {
        return;
    };

    if inst.op == Opcode::Assign && inst.operands.len() == 1 {
        let operand = inst.operands[0];
        let rep = map.get(&operand).copied().unwrap_or(operand);

        map.insert(result, rep);
    } else {
        map.remove(&result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, Type, Value, ValueKind};

    // entry:   BranchCond v1, then:then;else:else
    // then:    Return v4
    // else:    v4 = Assign v3
    //          Return v4
    fn branching_module() -> Module {
        let mut m = Module::new("ps_2_0");

        m.push_value(Value::new(
            ValueId(1),
            ValueKind::Parameter,
            Type::parse("bool"),
        ));
        m.push_value(
            Value::new(ValueId(2), ValueKind::Constant, Type::parse("float")).with_name("10"),
        );
        m.push_value(
            Value::new(ValueId(3), ValueKind::Constant, Type::parse("float")).with_name("20"),
        );
        m.push_value(Value::new(ValueId(4), ValueKind::Temp, Type::parse("float")));

        let mut func = Function::new("main", Type::parse("float"));

        func.parameters.push(ValueId(1));
        func.blocks.push(Block::with_instructions(
            "entry",
            [Instruction::branch_cond(ValueId(1), "then", "else")],
        ));
        func.blocks.push(Block::with_instructions(
            "then",
            [Instruction::ret(Some(ValueId(4)))],
        ));
        func.blocks.push(Block::with_instructions(
            "else",
            [
                Instruction::new(Opcode::Assign)
                    .with_operands([ValueId(3)])
                    .with_result(ValueId(4), Type::parse("float")),
                Instruction::ret(Some(ValueId(4))),
            ],
        ));
        m.functions.push(func);
        m
    }

    #[test]
    fn propagates_only_where_predecessors_agree() {
        let out = CopyPropagationPass.run(&branching_module());
        let func = &out.functions[0];

        // the else-block return now references the constant directly
        assert_eq!(
            func.block("else").unwrap().instructions[1].operands[0],
            ValueId(3)
        );

        // the then-block sees no assignment on its path, v4 stays
        assert_eq!(
            func.block("then").unwrap().instructions[0].operands[0],
            ValueId(4)
        );
    }

    #[test]
    fn assigns_are_left_in_place() {
        let out = CopyPropagationPass.run(&branching_module());
        let else_block = out.functions[0].block("else").unwrap();

        assert_eq!(else_block.instructions[0].op, Opcode::Assign);
    }

    #[test]
    fn chains_collapse_to_the_root_representative() {
        let mut m = Module::new("ps_2_0");

        m.push_value(Value::new(
            ValueId(1),
            ValueKind::Parameter,
            Type::parse("float"),
        ));
        m.push_value(Value::new(ValueId(2), ValueKind::Temp, Type::parse("float")));
        m.push_value(Value::new(ValueId(3), ValueKind::Temp, Type::parse("float")));

        let mut func = Function::new("main", Type::parse("float"));

        func.parameters.push(ValueId(1));
        func.blocks.push(Block::with_instructions(
            "entry",
            [
                Instruction::new(Opcode::Assign)
                    .with_operands([ValueId(1)])
                    .with_result(ValueId(2), Type::parse("float")),
                Instruction::new(Opcode::Assign)
                    .with_operands([ValueId(2)])
                    .with_result(ValueId(3), Type::parse("float")),
                Instruction::ret(Some(ValueId(3))),
            ],
        ));
        m.functions.push(func);

        let out = CopyPropagationPass.run(&m);
        let block = &out.functions[0].blocks[0];

        // both the second assign and the return see the root value
        assert_eq!(block.instructions[1].operands[0], ValueId(1));
        assert_eq!(block.instructions[2].operands[0], ValueId(1));
    }

    #[test]
    fn loops_reach_a_fixed_point() {
        // entry:       Branch cond
        // cond:        BranchCond v1, then:body;else:exit
        // body:        v3 = Assign v2
        //              Branch cond
        // exit:        Return v3
        let mut m = Module::new("ps_2_0");

        m.push_value(Value::new(
            ValueId(1),
            ValueKind::Parameter,
            Type::parse("bool"),
        ));
        m.push_value(
            Value::new(ValueId(2), ValueKind::Constant, Type::parse("float")).with_name("1"),
        );
        m.push_value(Value::new(ValueId(3), ValueKind::Temp, Type::parse("float")));

        let mut func = Function::new("main", Type::parse("float"));

        func.parameters.push(ValueId(1));
        func.blocks
            .push(Block::with_instructions("entry", [Instruction::branch("cond")]));
        func.blocks.push(Block::with_instructions(
            "cond",
            [Instruction::branch_cond(ValueId(1), "body", "exit")],
        ));
        func.blocks.push(Block::with_instructions(
            "body",
            [
                Instruction::new(Opcode::Assign)
                    .with_operands([ValueId(2)])
                    .with_result(ValueId(3), Type::parse("float")),
                Instruction::branch("cond"),
            ],
        ));
        func.blocks.push(Block::with_instructions(
            "exit",
            [Instruction::ret(Some(ValueId(3)))],
        ));
        m.functions.push(func);

        let out = CopyPropagationPass.run(&m);
        let exit = out.functions[0].block("exit").unwrap();

        // entry and body disagree about v3 at the cond merge, so the
        // return operand must stay v3
        assert_eq!(exit.instructions[0].operands[0], ValueId(3));
    }
}
