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
    Block, DiagStage, Diagnostic, Instruction, Module, Type, Value, ValueId, ValueKind,
};
use crate::sema::{SemNode, SemSymbol, SemanticIndex};
use crate::utility::SaHashSet;

/// Builds one function's body out of the semantic statement graph.
///
/// The lowerer keeps a single "current" block that instructions append
/// to; control flow closes the current block with a terminator and opens
/// the next one. Labels come from one per-function counter (`then1`,
/// `else2`, `merge3`, …). Value ids for temporaries are the lowest
/// positive integers not taken by an existing value or reserved for a
/// semantic symbol.
pub(super) struct FuncLowerer<'a, 'm> {
    pub(super) index: &'a SemanticIndex<'m>,
    pub(super) module: &'a mut Module,
    pub(super) return_type: Type,
    pub(super) blocks: Vec<Block>,
    pub(super) current: Option<Block>,
    labels: u32,
    reserved: SaHashSet<u64>,
    id_hint: u64,
}

impl<'a, 'm> FuncLowerer<'a, 'm> {
    pub(super) fn new(
        index: &'a SemanticIndex<'m>,
        module: &'a mut Module,
        return_type: Type,
    ) -> FuncLowerer<'a, 'm> {
        // symbol ids double as value ids, so a temporary must never
        // take an id belonging to a symbol we haven't materialized yet
        let reserved = index.symbols().map(|s| s.id).collect();

        FuncLowerer {
            index,
            module,
            return_type,
            blocks: Vec::new(),
            current: Some(Block::new("entry")),
            labels: 0,
            reserved,
            id_hint: 1,
        }
    }

    /// Closes out lowering, returning the finished block list.
    pub(super) fn finish(mut self) -> Vec<Block> {
        if let Some(block) = self.current.take() {
            self.blocks.push(block);
        }

        self.blocks
    }

    /// Appends to the current block. Instructions emitted after the
    /// function has terminated are dropped, matching the rule that
    /// statements after a `Return` are ignored.
    pub(super) fn emit(&mut self, inst: Instruction) {
        if let Some(block) = self.current.as_mut() {
            block.instructions.push(inst);
        }
    }

    /// Appends a terminator and closes the current block.
    pub(super) fn terminate(&mut self, inst: Instruction) {
        if let Some(mut block) = self.current.take() {
            block.instructions.push(inst);
            self.blocks.push(block);
        }
    }

    /// Opens a new current block.
    pub(super) fn start_block(&mut self, id: String) {
        if let Some(block) = self.current.take() {
            self.blocks.push(block);
        }

        self.current = Some(Block::new(id));
    }

    /// Ends the current block with a `Branch` to `target`.
    pub(super) fn branch_to(&mut self, target: &str) {
        self.terminate(Instruction::branch(target));
    }

    /// Whether the current position is past a terminator.
    pub(super) fn is_terminated(&self) -> bool {
        self.current.is_none()
    }

    /// Whether the current block is an empty leftover no terminator
    /// ever targets. A merge block becomes one when every path into it
    /// returned early; it is dropped rather than given a synthetic
    /// terminator. The entry block never counts.
    pub(super) fn current_is_vestigial(&self) -> bool {
        let Some(block) = &self.current else {
            return false;
        };

        if self.blocks.is_empty() || !block.instructions.is_empty() {
            return false;
        }

        !self.blocks.iter().any(|b| {
            b.terminator().map_or(false, |t| match &t.tag {
                Some(crate::ir::InstTag::Target(target)) => *target == block.id,
                Some(crate::ir::InstTag::CondTargets { then_to, else_to }) => {
                    *then_to == block.id || *else_to == block.id
                }
                _ => false,
            })
        })
    }

    /// Drops the current block entirely.
    pub(super) fn discard_current(&mut self) {
        self.current = None;
    }

    /// The next label for `stem`; one counter feeds every stem.
    pub(super) fn fresh_label(&mut self, stem: &str) -> String {
        self.labels += 1;

        format!("{stem}{}", self.labels)
    }

    /// Allocates a fresh temporary of the given type.
    pub(super) fn fresh_temp(&mut self, ty: Type) -> ValueId {
        self.fresh_value(ValueKind::Temp, ty)
    }

    /// Allocates an `Undef` placeholder of the given type.
    pub(super) fn undef(&mut self, ty: Type) -> ValueId {
        self.fresh_value(ValueKind::Undef, ty)
    }

    /// Allocates a constant carrying its literal text.
    pub(super) fn constant(&mut self, ty: Type, text: &str) -> ValueId {
        let id = self.fresh_id();

        self.module
            .push_value(Value::new(id, ValueKind::Constant, ty).with_name(text));
        id
    }

    fn fresh_value(&mut self, kind: ValueKind, ty: Type) -> ValueId {
        let id = self.fresh_id();

        self.module.push_value(Value::new(id, kind, ty));
        id
    }

    // ids only grow during a lowering run, so the scan can resume from
    // the last allocation
    fn fresh_id(&mut self) -> ValueId {
        while self.module.values.contains_key(&ValueId(self.id_hint))
            || self.reserved.contains(&self.id_hint)
        {
            self.id_hint += 1;
        }

        let id = ValueId(self.id_hint);

        self.id_hint += 1;
        id
    }

    /// The value backing a semantic symbol, materializing it on first
    /// reference. Resources and parameters are materialized up front;
    /// this covers locals and struct members.
    pub(super) fn value_for_symbol(&mut self, symbol: &SemSymbol) -> ValueId {
        let id = ValueId(symbol.id);

        if !self.module.values.contains_key(&id) {
            let ty = symbol
                .ty
                .as_deref()
                .map(Type::parse)
                .unwrap_or_else(Type::unknown);
            let mut value = Value::new(id, symbol_value_kind(symbol), ty).with_name(&symbol.name);

            if let Some(semantic) = &symbol.semantic {
                value = value.with_semantic(semantic.formatted());
            }

            self.module.push_value(value);
        }

        id
    }

    /// The semantic type bound to a node, defaulting to `unknown`.
    pub(super) fn node_type(&self, node: &SemNode) -> Type {
        self.index
            .node_type(node.id)
            .map(Type::parse)
            .unwrap_or_else(Type::unknown)
    }

    /// Records a `lower`-stage Error and keeps going.
    pub(super) fn error(&mut self, message: String) {
        self.module
            .push_diagnostic(Diagnostic::error(DiagStage::Lower, message));
    }

    /// Resolves the child with the given role.
    pub(super) fn child_by_role(&self, node: &SemNode, role: &str) -> Option<&'m SemNode> {
        node.children
            .iter()
            .find(|c| c.role.as_deref() == Some(role))
            .and_then(|c| self.index.node(c.node_id))
    }

    /// Resolves the `n`th child, whatever its role.
    pub(super) fn child_at(&self, node: &SemNode, n: usize) -> Option<&'m SemNode> {
        node.children
            .get(n)
            .and_then(|c| self.index.node(c.node_id))
    }

    /// Resolves a role-tagged child, falling back to position `n`.
    pub(super) fn child(&self, node: &SemNode, role: &str, n: usize) -> Option<&'m SemNode> {
        self.child_by_role(node, role).or_else(|| self.child_at(node, n))
    }
}

// locals and other unclassified symbols become plain temporaries
fn symbol_value_kind(symbol: &SemSymbol) -> ValueKind {
    match ValueKind::parse(&symbol.kind) {
        ValueKind::Other(_) => ValueKind::Temp,
        kind => kind,
    }
}
