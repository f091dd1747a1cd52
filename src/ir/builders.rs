//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{
    Block, Function, InstTag, Instruction, Module, Opcode, Swizzle, Type, ValueId, ValueKind,
};

/// Helper type for building a function directly against a module.
///
/// This is the programmatic construction path used by embedders and
/// tests; the lowering pipeline builds its functions from the semantic
/// graph instead. Values for parameters, constants and results are
/// allocated on the module as they are requested, instruction helpers
/// append to the block selected with [`FuncBuilder::switch_to`].
pub struct FuncBuilder<'m> {
    module: &'m mut Module,
    name: String,
    return_type: Type,
    parameters: Vec<ValueId>,
    blocks: Vec<Block>,
    current: usize,
}

impl<'m> FuncBuilder<'m> {
    /// Starts a function with a single empty `entry` block selected.
    pub fn new(module: &'m mut Module, name: impl Into<String>, return_type: Type) -> Self {
        FuncBuilder {
            module,
            name: name.into(),
            return_type,
            parameters: Vec::new(),
            blocks: vec![Block::new("entry")],
            current: 0,
        }
    }

    /// Declares a parameter of the given type.
    pub fn param(&mut self, ty: Type) -> ValueId {
        let id = self.module.allocate_value(ValueKind::Parameter, ty);

        self.parameters.push(id);
        id
    }

    /// Creates a constant value carrying its literal text.
    pub fn constant(&mut self, ty: Type, text: &str) -> ValueId {
        let id = self.module.allocate_value(ValueKind::Constant, ty);

        self.module.values.get_mut(&id).expect("just allocated").name = Some(text.to_string());
        id
    }

    /// Creates a resource-kind value (the resource table entry itself
    /// is the caller's business).
    pub fn resource_value(&mut self, kind: ValueKind, ty: Type) -> ValueId {
        self.module.allocate_value(kind, ty)
    }

    /// Creates a new empty block and returns its index.
    pub fn create_block(&mut self, id: impl Into<String>) -> usize {
        self.blocks.push(Block::new(id));
        self.blocks.len() - 1
    }

    /// Selects the block that subsequent instructions append to.
    pub fn switch_to(&mut self, block: usize) {
        self.current = block;
    }

    /// Appends a prebuilt instruction to the selected block.
    pub fn append(&mut self, inst: Instruction) {
        self.blocks[self.current].instructions.push(inst);
    }

    /// Appends a binary operation, allocating its result.
    pub fn binary(&mut self, op: Opcode, lhs: ValueId, rhs: ValueId, ty: Type) -> ValueId {
        let result = self.module.allocate_value(ValueKind::Temp, ty.clone());

        self.append(
            Instruction::new(op)
                .with_operands([lhs, rhs])
                .with_result(result, ty),
        );
        result
    }

    /// Appends an `Assign`, allocating its result.
    pub fn assign(&mut self, source: ValueId, ty: Type) -> ValueId {
        let result = self.module.allocate_value(ValueKind::Temp, ty.clone());

        self.append(
            Instruction::new(Opcode::Assign)
                .with_operands([source])
                .with_result(result, ty),
        );
        result
    }

    /// Appends a `Swizzle` with the given lane mask.
    pub fn swizzle(&mut self, source: ValueId, lanes: &str, ty: Type) -> ValueId {
        let result = self.module.allocate_value(ValueKind::Temp, ty.clone());
        let mask = Swizzle::parse(lanes).expect("caller passes a valid lane mask");

        self.append(
            Instruction::new(Opcode::Swizzle)
                .with_operands([source])
                .with_result(result, ty)
                .with_tag(InstTag::Swizzle(mask)),
        );
        result
    }

    /// Appends a `Store` of `value` into `target`.
    pub fn store(&mut self, target: ValueId, value: ValueId) {
        self.append(Instruction::new(Opcode::Store).with_operands([target, value]));
    }

    /// Appends a `Return`.
    pub fn ret(&mut self, value: Option<ValueId>) {
        self.append(Instruction::ret(value));
    }

    /// Appends an unconditional branch.
    pub fn branch(&mut self, target: &str) {
        self.append(Instruction::branch(target));
    }

    /// Appends a conditional branch.
    pub fn branch_cond(&mut self, cond: ValueId, then_to: &str, else_to: &str) {
        self.append(Instruction::branch_cond(cond, then_to, else_to));
    }

    /// Finishes the function and adds it to the module.
    pub fn finish(self) {
        self.module.functions.push(Function {
            name: self.name,
            return_type: self.return_type,
            parameters: self.parameters,
            blocks: self.blocks,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Severity;
    use crate::pass::optimize;
    use crate::transforms::validate;

    fn error_count(module: &Module) -> usize {
        module
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    // a module with one function `main` returning float4, one float4
    // parameter, and a single `Return`. the smallest valid shader
    #[test]
    fn minimal_return_survives_the_default_pipeline_untouched() {
        let mut m = Module::new("ps_2_0");
        let mut b = FuncBuilder::new(&mut m, "main", Type::parse("float4"));

        let input = b.param(Type::parse("float4"));

        b.ret(Some(input));
        b.finish();

        assert_eq!(error_count(&m) + validate(&m).len(), 0);

        let out = optimize(&m, None, None);

        assert_eq!(error_count(&out), 0);
        assert_eq!(out.functions, m.functions);
        assert_eq!(out.values, m.values);
    }

    // constants 2 and 3 fold through Add into a fresh 5, and dce
    // leaves only the return chain
    #[test]
    fn constant_addition_folds_through_the_default_pipeline() {
        let mut m = Module::new("ps_2_0");
        let mut b = FuncBuilder::new(&mut m, "main", Type::parse("float"));

        let two = b.constant(Type::parse("float"), "2");
        let three = b.constant(Type::parse("float"), "3");
        let sum = b.binary(Opcode::Add, two, three, Type::parse("float"));

        b.ret(Some(sum));
        b.finish();

        let out = optimize(&m, Some("constfold,algebraic"), None);

        assert_eq!(error_count(&out), 0);

        let inst = &out.functions[0].blocks[0].instructions[0];

        assert_eq!(inst.op, Opcode::Assign);
        assert_eq!(
            out.value(inst.operands[0]).unwrap().name.as_deref(),
            Some("5")
        );
    }

    // the scenario where only one branch assigns: the merge-sensitive
    // copy propagation must leave the other branch alone
    #[test]
    fn copy_propagation_respects_disagreeing_branches() {
        let mut m = Module::new("ps_2_0");
        let mut b = FuncBuilder::new(&mut m, "main", Type::parse("float"));

        let flag = b.param(Type::parse("bool"));
        let twenty = b.constant(Type::parse("float"), "20");
        let local = b.resource_value(ValueKind::Temp, Type::parse("float"));

        let then_block = b.create_block("then");
        let else_block = b.create_block("else");

        b.branch_cond(flag, "then", "else");
        b.switch_to(then_block);
        b.ret(Some(local));
        b.switch_to(else_block);
        b.append(
            Instruction::new(Opcode::Assign)
                .with_operands([twenty])
                .with_result(local, Type::parse("float")),
        );
        b.ret(Some(local));
        b.finish();

        let out = optimize(&m, Some("copyprop"), None);
        let func = &out.functions[0];

        assert_eq!(
            func.block("else").unwrap().terminator().unwrap().operands[0],
            twenty
        );
        assert_eq!(
            func.block("then").unwrap().terminator().unwrap().operands[0],
            local
        );
    }

    // a store into a writable texture anchors the value it stores
    #[test]
    fn stores_anchor_producers_through_dce() {
        let mut m = Module::new("ps_2_0");
        let mut b = FuncBuilder::new(&mut m, "main", Type::parse("float4"));

        let target = b.resource_value(
            ValueKind::Texture("RWTexture2D".to_string()),
            Type::parse("RWTexture2D<float4>"),
        );
        let input = b.param(Type::parse("float4"));
        let doubled = b.binary(Opcode::Add, input, input, Type::parse("float4"));

        b.store(target, doubled);
        b.ret(Some(input));
        b.finish();

        let out = optimize(&m, Some("dce"), None);

        assert_eq!(error_count(&out), 0);
        assert_eq!(out.functions[0].blocks[0].instructions.len(), 3);
    }

    // a float4 swizzle only ever read through `.x` narrows to float
    #[test]
    fn component_liveness_narrows_partial_swizzles() {
        let mut m = Module::new("ps_2_0");
        let mut b = FuncBuilder::new(&mut m, "main", Type::parse("float"));

        let input = b.param(Type::parse("float4"));
        let pair = b.swizzle(input, "xy", Type::parse("float2"));
        let lane = b.swizzle(pair, "x", Type::parse("float"));

        b.ret(Some(lane));
        b.finish();

        let out = optimize(&m, Some("component-dce"), None);

        assert_eq!(error_count(&out), 0);
        assert_eq!(out.value(pair).unwrap().ty, Type::parse("float"));

        let narrowed = &out.functions[0].blocks[0].instructions[0];

        assert_eq!(narrowed.tag_text().as_deref(), Some("x"));
    }

    // back-end vocabulary anywhere in the module is an invariant error
    #[test]
    fn backend_vocabulary_is_rejected() {
        let mut m = Module::new("ps_2_0");
        let mut b = FuncBuilder::new(&mut m, "main", Type::parse("float4"));

        let input = b.param(Type::parse("float4"));

        b.append(Instruction::new(Opcode::parse("DxilSample")).with_operands([input]));
        b.ret(Some(input));
        b.finish();

        let findings = validate(&m);

        assert!(findings
            .iter()
            .any(|d| d.is_error() && d.message.contains("backend")));
    }
}
