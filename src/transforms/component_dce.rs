//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{InstTag, Module, Opcode, Type, Value, ValueId};
use crate::pass::ModulePass;
use crate::utility::SaHashMap;

/// Component-level dead-code elimination.
///
/// A reverse walk computes per-value lane liveness masks (bits over
/// x/y/z/w). Terminator operands seed as fully live, a swizzle only
/// requires the source lanes that feed its live result positions, and
/// every other operation requires its operands whole. A swizzle whose
/// result is entirely dead is dropped; one whose result is partially
/// dead narrows its result value to the live lane count and trims its
/// lane mask. This is the one transform allowed to change a value's
/// type.
pub struct ComponentDcePass;

impl ModulePass for ComponentDcePass {
    fn name(&self) -> &'static str {
        "component-dce"
    }

    fn run(&self, module: &Module) -> Module {
        let mut out = module.clone();
        let Module {
            functions, values, ..
        } = &mut out;

        for func in functions {
            narrow_function(&mut func.blocks, values);
        }

        out
    }
}

fn narrow_function(
    blocks: &mut [crate::ir::Block],
    values: &mut std::collections::BTreeMap<ValueId, Value>,
) {
    let mut masks: SaHashMap<ValueId, u8> = SaHashMap::default();

    for block in blocks.iter_mut().rev() {
        let mut i = block.instructions.len();

        while i > 0 {
            i -= 1;

            let inst = &block.instructions[i];

            if inst.op == Opcode::Swizzle && inst.result.is_some() && !inst.has_side_effect() {
                let result = inst.result.expect("checked above");
                let Some(InstTag::Swizzle(swizzle)) = inst.tag.clone() else {
                    require_whole(&mut masks, inst.operands.iter().copied(), values);
                    continue;
                };
                let Some(ty) = inst.ty.clone() else {
                    require_whole(&mut masks, inst.operands.iter().copied(), values);
                    continue;
                };

                let full = full_mask(Some(&ty));
                let live = masks.get(&result).copied().unwrap_or(0) & full;

                if live == 0 && inst.is_pure() {
                    block.instructions.remove(i);
                    continue;
                }

                // the source only needs the lanes feeding live result
                // positions
                let mut source_mask = 0u8;

                for (position, lane) in swizzle.lanes().enumerate() {
                    if live & (1 << position) != 0 {
                        source_mask |= 1 << lane;
                    }
                }

                if let Some(source) = inst.operands.first() {
                    *masks.entry(*source).or_insert(0) |= source_mask;
                }

                if live != full {
                    narrow_result(&mut block.instructions[i], result, live, &ty, values);
                }
            } else {
                require_whole(&mut masks, inst.operands.iter().copied(), values);
            }
        }
    }
}

fn narrow_result(
    inst: &mut crate::ir::Instruction,
    result: ValueId,
    live: u8,
    ty: &Type,
    values: &mut std::collections::BTreeMap<ValueId, Value>,
) {
    let count = live.count_ones() as u8;

    let Some(narrowed) = ty.with_components(count) else {
        return;
    };

    let Some(InstTag::Swizzle(swizzle)) = &inst.tag else {
        return;
    };

    inst.tag = Some(InstTag::Swizzle(swizzle.retain_positions(live)));
    inst.ty = Some(narrowed.clone());

    if let Some(value) = values.get_mut(&result) {
        value.ty = narrowed;
    }
}

fn require_whole(
    masks: &mut SaHashMap<ValueId, u8>,
    operands: impl Iterator<Item = ValueId>,
    values: &std::collections::BTreeMap<ValueId, Value>,
) {
    for operand in operands {
        let ty = values.get(&operand).map(|v| &v.ty);

        *masks.entry(operand).or_insert(0) |= full_mask(ty);
    }
}

// lane masks only track up to the four addressable lanes; wider shapes
// (matrices) are treated as fully required
fn full_mask(ty: Option<&Type>) -> u8 {
    let components = ty.and_then(Type::components).unwrap_or(4).min(4).max(1);

    ((1u16 << components) - 1) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, Function, Instruction, Swizzle, ValueKind};

    // entry:
    //   v2 = Swizzle float4 v1, xy   ; only .x is ever consumed
    //   v3 = Swizzle float  v2, x
    //   Return v3
    fn swizzle_chain() -> Module {
        let mut m = Module::new("ps_2_0");

        m.push_value(Value::new(
            ValueId(1),
            ValueKind::Parameter,
            Type::parse("float4"),
        ));
        m.push_value(Value::new(ValueId(2), ValueKind::Temp, Type::parse("float2")));
        m.push_value(Value::new(ValueId(3), ValueKind::Temp, Type::parse("float")));

        let mut func = Function::new("main", Type::parse("float"));

        func.parameters.push(ValueId(1));
        func.blocks.push(Block::with_instructions(
            "entry",
            [
                Instruction::new(Opcode::Swizzle)
                    .with_operands([ValueId(1)])
                    .with_result(ValueId(2), Type::parse("float2"))
                    .with_tag(InstTag::Swizzle(Swizzle::parse("xy").unwrap())),
                Instruction::new(Opcode::Swizzle)
                    .with_operands([ValueId(2)])
                    .with_result(ValueId(3), Type::parse("float"))
                    .with_tag(InstTag::Swizzle(Swizzle::parse("x").unwrap())),
                Instruction::ret(Some(ValueId(3))),
            ],
        ));
        m.functions.push(func);
        m
    }

    #[test]
    fn partially_dead_swizzles_narrow() {
        let out = ComponentDcePass.run(&swizzle_chain());
        let first = &out.functions[0].blocks[0].instructions[0];

        assert_eq!(first.ty, Some(Type::parse("float")));
        assert_eq!(
            first.tag,
            Some(InstTag::Swizzle(Swizzle::parse("x").unwrap()))
        );
        assert_eq!(out.value(ValueId(2)).unwrap().ty, Type::parse("float"));

        // the consumer is untouched
        let second = &out.functions[0].blocks[0].instructions[1];

        assert_eq!(second.ty, Some(Type::parse("float")));
    }

    #[test]
    fn fully_dead_swizzles_are_dropped() {
        let mut m = swizzle_chain();
        let block = &mut m.functions[0].blocks[0];

        // return v1 instead, leaving both swizzles unconsumed
        block.instructions[2] = Instruction::ret(Some(ValueId(1)));
        m.functions[0].return_type = Type::parse("float4");

        let out = ComponentDcePass.run(&m);

        assert_eq!(out.functions[0].blocks[0].instructions.len(), 1);
    }

    #[test]
    fn terminator_operands_stay_fully_live() {
        let mut m = swizzle_chain();
        let block = &mut m.functions[0].blocks[0];

        // return the full v2 so nothing may narrow
        block.instructions.pop();
        block.instructions.pop();
        block
            .instructions
            .push(Instruction::ret(Some(ValueId(2))));
        m.functions[0].return_type = Type::parse("float2");

        let out = ComponentDcePass.run(&m);
        let first = &out.functions[0].blocks[0].instructions[0];

        assert_eq!(first.ty, Some(Type::parse("float2")));
        assert_eq!(
            first.tag,
            Some(InstTag::Swizzle(Swizzle::parse("xy").unwrap()))
        );
    }

    #[test]
    fn narrowing_is_idempotent() {
        let once = ComponentDcePass.run(&swizzle_chain());
        let twice = ComponentDcePass.run(&once);

        assert_eq!(once, twice);
    }
}
