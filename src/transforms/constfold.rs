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
use crate::transforms::common::{constant_value, eval, eval_swizzle};
use smallvec::SmallVec;

/// Constant folding.
///
/// Pure instructions whose operands are all parseable constants are
/// computed element-wise and replaced with an `Assign` of a freshly
/// allocated constant carrying the canonical literal text. Divisions
/// with any zero divisor element are left alone, and `Assign`s are never
/// refolded, so the pass is idempotent.
pub struct ConstantFoldPass;

impl ModulePass for ConstantFoldPass {
    fn name(&self) -> &'static str {
        "constfold"
    }

    fn run(&self, module: &Module) -> Module {
        let mut out = module.clone();

        for func in 0..out.functions.len() {
            for block in 0..out.functions[func].blocks.len() {
                for inst in 0..out.functions[func].blocks[block].instructions.len() {
                    if let Some(folded) = fold(&out, &out.functions[func].blocks[block].instructions[inst])
                    {
                        let rewritten = materialize(&mut out, folded);

                        out.functions[func].blocks[block].instructions[inst] = rewritten;
                    }
                }
            }
        }

        out
    }
}

struct Folded {
    data: ConstantData,
    original: Instruction,
}

fn fold(module: &Module, inst: &Instruction) -> Option<Folded> {
    if inst.is_terminator() || !inst.is_pure() || inst.has_side_effect() {
        return None;
    }

    // refolding an `Assign` of a constant would mint a fresh constant
    // on every run
    if inst.op == Opcode::Assign {
        return None;
    }

    let ty = inst.ty.as_ref()?;

    inst.result?;

    let operands: SmallVec<[ConstantData; 2]> = inst
        .operands
        .iter()
        .map(|id| constant_value(module, *id))
        .collect::<Option<_>>()?;

    let data = match &inst.op {
        Opcode::Swizzle => {
            let swizzle = inst.tag.as_ref()?.as_swizzle()?;

            eval_swizzle(swizzle, operands.first()?)?
        }
        op => eval(op, &operands, ty)?,
    };

    // the computed shape has to agree with the declared result type
    if Some(data.elems.len() as u32) != ty.components() {
        return None;
    }

    Some(Folded {
        data,
        original: inst.clone(),
    })
}

fn materialize(module: &mut Module, folded: Folded) -> Instruction {
    let ty = folded.original.ty.clone().expect("folded result has a type");
    let text = folded.data.format(&ty);
    let id = module.unused_value_id();

    module.push_value(Value::new(id, ValueKind::Constant, ty.clone()).with_name(text));

    Instruction {
        op: Opcode::Assign,
        operands: [id].into_iter().collect(),
        result: folded.original.result,
        ty: Some(ty),
        tag: None,
    }
}
