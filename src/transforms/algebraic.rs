//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{ConstantData, Instruction, Module, Opcode, Value, ValueKind};
use crate::pass::ModulePass;
use crate::transforms::common::constant_value;
use smallvec::SmallVec;

/// Algebraic simplification.
///
/// Binary arithmetic whose right-hand side parses as a constant is
/// rewritten through the identities `x + 0 = x`, `x - 0 = x`,
/// `x * 1 = x`, `x / 1 = x` and `x * 0 = 0`. Result types are never
/// changed; `x * 0` references a fresh zero constant of the result type.
pub struct AlgebraicSimplifyPass;

impl ModulePass for AlgebraicSimplifyPass {
    fn name(&self) -> &'static str {
        "algebraic"
    }

    fn run(&self, module: &Module) -> Module {
        let mut out = module.clone();

        for func in 0..out.functions.len() {
            for block in 0..out.functions[func].blocks.len() {
                for inst in 0..out.functions[func].blocks[block].instructions.len() {
                    let current = &out.functions[func].blocks[block].instructions[inst];

                    if let Some(simplified) = simplify(&out, current) {
                        let rewritten = apply(&mut out, simplified);

                        out.functions[func].blocks[block].instructions[inst] = rewritten;
                    }
                }
            }
        }

        out
    }
}

enum Simplification {
    /// The instruction collapses to a copy of its left operand.
    CopyLhs(Instruction),
    /// The instruction collapses to a zero constant of its result type.
    Zero(Instruction),
}

fn simplify(module: &Module, inst: &Instruction) -> Option<Simplification> {
    if !inst.is_pure() || inst.has_side_effect() || inst.operands.len() != 2 {
        return None;
    }

    inst.result?;

    let rhs = constant_value(module, inst.operands[1])?;

    match inst.op {
        Opcode::Add | Opcode::Sub if rhs.all_zero() => {
            Some(Simplification::CopyLhs(inst.clone()))
        }
        Opcode::Mul | Opcode::Div if rhs.all_one() => Some(Simplification::CopyLhs(inst.clone())),
        Opcode::Mul if rhs.all_zero() && zeroable(inst) => Some(Simplification::Zero(inst.clone())),
        _ => None,
    }
}

// a zero of the result type can only be minted when the type is
// scalar-shaped
fn zeroable(inst: &Instruction) -> bool {
    inst.ty
        .as_ref()
        .and_then(ConstantData::zero_of)
        .is_some()
}

fn apply(module: &mut Module, simplification: Simplification) -> Instruction {
    match simplification {
        Simplification::CopyLhs(inst) => Instruction {
            op: Opcode::Assign,
            operands: SmallVec::from_iter([inst.operands[0]]),
            result: inst.result,
            ty: inst.ty,
            tag: None,
        },
        Simplification::Zero(inst) => {
            let ty = inst.ty.clone().expect("simplified result has a type");
            let zero = ConstantData::zero_of(&ty).expect("zero exists for numeric result types");
            let id = module.unused_value_id();

            module.push_value(
                Value::new(id, ValueKind::Constant, ty.clone()).with_name(zero.format(&ty)),
            );

            Instruction {
                op: Opcode::Assign,
                operands: SmallVec::from_iter([id]),
                result: inst.result,
                ty: inst.ty,
                tag: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, Function, Type, ValueId};

    fn binary_module(op: Opcode, rhs_text: &str) -> Module {
        let mut m = Module::new("ps_2_0");

        m.push_value(Value::new(
            ValueId(1),
            ValueKind::Parameter,
            Type::parse("float"),
        ));
        m.push_value(
            Value::new(ValueId(2), ValueKind::Constant, Type::parse("float")).with_name(rhs_text),
        );
        m.push_value(Value::new(ValueId(3), ValueKind::Temp, Type::parse("float")));

        let mut func = Function::new("main", Type::parse("float"));

        func.parameters.push(ValueId(1));
        func.blocks.push(Block::with_instructions(
            "entry",
            [
                Instruction::new(op)
                    .with_operands([ValueId(1), ValueId(2)])
                    .with_result(ValueId(3), Type::parse("float")),
                Instruction::ret(Some(ValueId(3))),
            ],
        ));
        m.functions.push(func);
        m
    }

    #[test]
    fn add_zero_collapses_to_copy() {
        let out = AlgebraicSimplifyPass.run(&binary_module(Opcode::Add, "0"));
        let inst = &out.functions[0].blocks[0].instructions[0];

        assert_eq!(inst.op, Opcode::Assign);
        assert_eq!(inst.operands.as_slice(), &[ValueId(1)]);
        assert_eq!(inst.ty, Some(Type::parse("float")));
    }

    #[test]
    fn mul_one_collapses_to_copy() {
        let out = AlgebraicSimplifyPass.run(&binary_module(Opcode::Mul, "1"));
        let inst = &out.functions[0].blocks[0].instructions[0];

        assert_eq!(inst.op, Opcode::Assign);
        assert_eq!(inst.operands.as_slice(), &[ValueId(1)]);
    }

    #[test]
    fn mul_zero_references_a_fresh_zero() {
        let out = AlgebraicSimplifyPass.run(&binary_module(Opcode::Mul, "0"));
        let inst = &out.functions[0].blocks[0].instructions[0];

        assert_eq!(inst.op, Opcode::Assign);

        let zero = out.value(inst.operands[0]).unwrap();

        assert_eq!(zero.name.as_deref(), Some("0"));
        assert_eq!(zero.ty, Type::parse("float"));
    }

    #[test]
    fn div_by_arbitrary_constant_is_untouched() {
        let out = AlgebraicSimplifyPass.run(&binary_module(Opcode::Div, "3"));

        assert_eq!(out.functions[0].blocks[0].instructions[0].op, Opcode::Div);
    }

    #[test]
    fn simplification_is_idempotent() {
        let once = AlgebraicSimplifyPass.run(&binary_module(Opcode::Add, "0"));
        let twice = AlgebraicSimplifyPass.run(&once);

        assert_eq!(once, twice);
    }
}
