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
use crate::ir::{
    DiagStage, Diagnostic, Function, InstTag, Instruction, Module, Opcode, Type, ValueId,
};
use crate::utility::{SaHashMap, SaHashSet};

/// Validates every structural and type-level invariant of a module.
///
/// This scans the entire module and reports everything it finds as
/// `invariant`-stage diagnostics; it never mutates and never aborts.
/// Both pipelines run it on their outputs and append what it returns.
pub fn validate(module: &Module) -> Vec<Diagnostic> {
    let mut verifier = Verifier {
        module,
        errors: Vec::new(),
    };

    verifier.walk();
    verifier.errors
}

/// The textual tokens that identify a specific back-end. None of them
/// may appear as a whole word in any identified field of the IR.
pub const BACKEND_TOKENS: &[&str] = &["dxbc", "dxil", "spirv", "d3d", "glsl", "metal"];

macro_rules! verify_assert {
    ($self:expr, $cond:expr, $($fmt:tt)+) => {
        if !($cond) {
            $self.error(format!($($fmt)+));
        }
    };
}

struct Verifier<'m> {
    module: &'m Module,
    errors: Vec<Diagnostic>,
}

impl<'m> Verifier<'m> {
    fn error(&mut self, message: String) {
        self.errors
            .push(Diagnostic::error(DiagStage::Invariant, message));
    }

    fn walk(&mut self) {
        verify_assert!(
            self,
            self.module.format_version == crate::ir::FORMAT_VERSION,
            "module format version must be {}, found {}",
            crate::ir::FORMAT_VERSION,
            self.module.format_version
        );

        self.verify_values();
        self.verify_leaks();

        for func in &self.module.functions {
            self.verify_function(func);
        }
    }

    fn verify_values(&mut self) {
        for (id, value) in &self.module.values {
            verify_assert!(self, id.is_valid(), "value id {} must be positive", id.0);
            verify_assert!(
                self,
                value.id == *id,
                "value {} is stored under a different id",
                value.id
            );
            verify_assert!(
                self,
                !value.ty.to_string().is_empty(),
                "value {} must declare a non-empty type",
                value.id
            );
        }
    }

    fn verify_function(&mut self, func: &Function) {
        verify_assert!(
            self,
            !func.blocks.is_empty(),
            "function `{}` must have at least one block",
            func.name
        );

        let Some(entry) = func.entry_block() else {
            return;
        };

        verify_assert!(
            self,
            !entry.id.is_empty(),
            "function `{}` entry block id must be non-empty",
            func.name
        );

        let mut seen_ids = SaHashSet::default();

        for block in &func.blocks {
            verify_assert!(
                self,
                seen_ids.insert(block.id.as_str()),
                "function `{}` reuses block id `{}`",
                func.name,
                block.id
            );
        }

        for param in &func.parameters {
            verify_assert!(
                self,
                self.module.values.contains_key(param),
                "function `{}` parameter {param} is not a known value",
                func.name
            );
        }

        self.verify_definitions(func);
        self.verify_terminators(func);
        self.verify_reachability(func);

        for block in &func.blocks {
            for inst in &block.instructions {
                self.verify_instruction(func, &block.id, inst);
            }
        }
    }

    // SSA-ish rule: every result refers to a known value and is defined
    // by at most one instruction across the whole function
    fn verify_definitions(&mut self, func: &Function) {
        let mut defined: SaHashMap<ValueId, u32> = SaHashMap::default();

        for inst in func.instructions() {
            for operand in &inst.operands {
                verify_assert!(
                    self,
                    self.module.values.contains_key(operand),
                    "function `{}` references unknown value {operand}",
                    func.name
                );
            }

            if let Some(result) = inst.result {
                verify_assert!(
                    self,
                    self.module.values.contains_key(&result),
                    "function `{}` defines unknown value {result}",
                    func.name
                );

                *defined.entry(result).or_insert(0) += 1;
            }
        }

        for (value, count) in defined {
            verify_assert!(
                self,
                count == 1,
                "function `{}` defines {value} {count} times",
                func.name
            );
        }
    }

    fn verify_terminators(&mut self, func: &Function) {
        for block in &func.blocks {
            let terminators = block
                .instructions
                .iter()
                .filter(|inst| inst.is_terminator())
                .count();

            verify_assert!(
                self,
                terminators == 1,
                "block `{}` in `{}` must contain exactly one terminator, found {terminators}",
                block.id,
                func.name
            );

            if let Some(last) = block.instructions.last() {
                verify_assert!(
                    self,
                    last.is_terminator(),
                    "block `{}` in `{}` must end with its terminator",
                    block.id,
                    func.name
                );
            }
        }
    }

    fn verify_reachability(&mut self, func: &Function) {
        let cfg = ControlFlowGraph::compute(func);
        let reachable = cfg.reachable_from_entry();

        for (block, reachable) in func.blocks.iter().zip(reachable) {
            verify_assert!(
                self,
                reachable,
                "block `{}` in `{}` is unreachable from the entry block",
                block.id,
                func.name
            );
        }
    }

    fn verify_instruction(&mut self, func: &Function, block: &str, inst: &Instruction) {
        if let Some(result) = inst.result {
            match (&inst.ty, self.module.value_type(result)) {
                (Some(ty), Some(declared)) => {
                    verify_assert!(
                        self,
                        ty == declared,
                        "`{}` in `{block}` produces `{ty}` but {result} is declared `{declared}`",
                        inst.op
                    );
                }
                (None, _) => self.error(format!(
                    "`{}` in `{block}` has a result but no type",
                    inst.op
                )),
                (_, None) => {} // unknown result id already reported
            }
        }

        match &inst.op {
            Opcode::Branch => self.verify_branch(func, block, inst),
            Opcode::BranchCond => self.verify_branch_cond(func, block, inst),
            Opcode::Return => self.verify_return(func, block, inst),
            Opcode::Assign => self.verify_assign(block, inst),
            Opcode::Swizzle => self.verify_swizzle(block, inst),
            Opcode::Store => self.verify_store(block, inst),
            op if op.is_binary_arith() || op.is_comparison() => {
                self.verify_binary(block, inst);
            }
            Opcode::LogicalAnd | Opcode::LogicalOr => self.verify_logical(block, inst),
            _ => {}
        }
    }

    fn verify_branch(&mut self, func: &Function, block: &str, inst: &Instruction) {
        match &inst.tag {
            Some(InstTag::Target(target)) if !target.is_empty() => {
                verify_assert!(
                    self,
                    func.block(target).is_some(),
                    "`Branch` in `{block}` targets unknown block `{target}`"
                );
            }
            _ => self.error(format!(
                "`Branch` in `{block}` must carry exactly one target in its tag"
            )),
        }
    }

    fn verify_branch_cond(&mut self, func: &Function, block: &str, inst: &Instruction) {
        match &inst.tag {
            Some(InstTag::CondTargets { then_to, else_to }) => {
                for target in [then_to, else_to] {
                    verify_assert!(
                        self,
                        func.block(target).is_some(),
                        "`BranchCond` in `{block}` targets unknown block `{target}`"
                    );
                }
            }
            _ => self.error(format!(
                "`BranchCond` in `{block}` must carry exactly two targets (`then:<id>;else:<id>`)"
            )),
        }

        match inst.operands.first() {
            Some(cond) => {
                if let Some(ty) = self.module.value_type(*cond) {
                    verify_assert!(
                        self,
                        ty.is_bool(),
                        "`BranchCond` condition in `{block}` must be `bool`, found `{ty}`"
                    );
                }
            }
            None => self.error(format!("`BranchCond` in `{block}` must have a condition")),
        }
    }

    fn verify_return(&mut self, func: &Function, block: &str, inst: &Instruction) {
        let Some(operand) = inst.operands.first() else {
            return;
        };

        let Some(ty) = self.module.value_type(*operand) else {
            return;
        };

        let declared = &func.return_type;

        if let (Some(scalar), Some(expected)) = (ty.scalar(), declared.scalar()) {
            verify_assert!(
                self,
                scalar == expected,
                "`Return` in `{block}` yields `{ty}` from a function returning `{declared}`"
            );
        }

        if let (Some(count), Some(expected)) = (ty.components(), declared.components()) {
            verify_assert!(
                self,
                count == expected,
                "`Return` in `{block}` yields {count} components, `{declared}` has {expected}"
            );
        }
    }

    fn verify_assign(&mut self, block: &str, inst: &Instruction) {
        verify_assert!(
            self,
            inst.operands.len() == 1,
            "`Assign` in `{block}` must have exactly one operand"
        );

        let (Some(operand), Some(ty)) = (inst.operands.first(), &inst.ty) else {
            return;
        };

        if let Some(source) = self.module.value_type(*operand) {
            verify_assert!(
                self,
                source == ty,
                "`Assign` in `{block}` copies `{source}` into `{ty}`"
            );
        }
    }

    fn verify_swizzle(&mut self, block: &str, inst: &Instruction) {
        let Some(InstTag::Swizzle(swizzle)) = &inst.tag else {
            self.error(format!("`Swizzle` in `{block}` must carry a lane mask tag"));
            return;
        };

        let (Some(operand), Some(ty)) = (inst.operands.first(), &inst.ty) else {
            return;
        };

        if let Some(source) = self.module.value_type(*operand) {
            if let (Some(scalar), Some(expected)) = (ty.scalar(), source.scalar()) {
                verify_assert!(
                    self,
                    scalar == expected,
                    "`Swizzle` in `{block}` must preserve the scalar, `{source}` became `{ty}`"
                );
            }
        }

        if let Some(count) = ty.components() {
            verify_assert!(
                self,
                count == swizzle.len() as u32,
                "`Swizzle` in `{block}` selects {} lanes but produces `{ty}`",
                swizzle.len()
            );
        }
    }

    fn verify_store(&mut self, block: &str, inst: &Instruction) {
        verify_assert!(
            self,
            inst.operands.len() == 2 || inst.operands.len() == 3,
            "`Store` in `{block}` must have 2 or 3 operands, found {}",
            inst.operands.len()
        );

        let (Some(target), Some(stored)) = (inst.operands.first(), inst.operands.last()) else {
            return;
        };

        let (Some(target_ty), Some(stored_ty)) = (
            self.module.value_type(*target),
            self.module.value_type(*stored),
        ) else {
            return;
        };

        // resource destinations have opaque element types
        if target_ty.is_resource() {
            return;
        }

        if let (Some(expected), Some(scalar)) = (target_ty.scalar(), stored_ty.scalar()) {
            verify_assert!(
                self,
                expected == scalar && scalar.is_numeric(),
                "`Store` in `{block}` writes `{stored_ty}` into `{target_ty}`"
            );
        }
    }

    fn verify_binary(&mut self, block: &str, inst: &Instruction) {
        verify_assert!(
            self,
            inst.operands.len() == 2,
            "`{}` in `{block}` must have exactly two operands",
            inst.op
        );

        let [Some(lhs), Some(rhs)] = [
            inst.operands.first().and_then(|v| self.module.value_type(*v)),
            inst.operands.get(1).and_then(|v| self.module.value_type(*v)),
        ] else {
            return;
        };

        let (Some(left), Some(right)) = (lhs.scalar(), rhs.scalar()) else {
            return;
        };

        verify_assert!(
            self,
            left == right && left.is_numeric(),
            "`{}` in `{block}` requires matching numeric scalars, found `{lhs}` and `{rhs}`",
            inst.op
        );

        if inst.op.is_binary_arith() {
            if let Some(result) = inst.ty.as_ref().and_then(Type::scalar) {
                verify_assert!(
                    self,
                    result == left,
                    "`{}` in `{block}` produces scalar `{}` from `{}` operands",
                    inst.op,
                    result.name(),
                    left.name()
                );
            }
        }
    }

    fn verify_logical(&mut self, block: &str, inst: &Instruction) {
        for operand in &inst.operands {
            if let Some(ty) = self.module.value_type(*operand) {
                verify_assert!(
                    self,
                    ty.is_bool(),
                    "`{}` in `{block}` requires `bool` operands, found `{ty}`",
                    inst.op
                );
            }
        }
    }

    // the no-leakage policy: no token naming a specific back-end may
    // appear as a whole word in any identified field
    fn verify_leaks(&mut self) {
        let module = self.module;

        self.scan_leak(&module.profile, "module profile");

        if let Some(entry) = &module.entry_point {
            self.scan_leak(&entry.name, "entry point name");
            self.scan_leak(entry.stage.name(), "entry point stage");
        }

        for value in module.values.values() {
            self.scan_leak(&value.ty.to_string(), "value type");

            if let Some(name) = &value.name {
                self.scan_leak(name, "value name");
            }
        }

        for resource in &module.resources {
            self.scan_leak(&resource.name, "resource name");
            self.scan_leak(resource.kind.name(), "resource kind");
            self.scan_leak(&resource.ty.to_string(), "resource type");
        }

        for technique in &module.techniques {
            self.scan_leak(&technique.name, "technique name");

            for pass in &technique.passes {
                self.scan_leak(&pass.name, "pass name");

                for state in &pass.states {
                    self.scan_leak(&state.name, "state name");
                    self.scan_leak(&state.value, "state value");
                }
            }
        }

        for func in &module.functions {
            for inst in func.instructions() {
                self.scan_leak(inst.op.name(), "op name");

                if let Some(tag) = inst.tag_text() {
                    self.scan_leak(&tag, "instruction tag");
                }

                if let Some(ty) = &inst.ty {
                    self.scan_leak(&ty.to_string(), "instruction type");
                }
            }
        }
    }

    fn scan_leak(&mut self, text: &str, what: &str) {
        if let Some(token) = find_backend_token(text) {
            self.error(format!(
                "backend token `{token}` leaked into {what} `{text}`"
            ));
        }
    }
}

/// Finds the first back-end token appearing as a whole word in `text`,
/// case-insensitively. Word boundaries fall at non-alphanumeric
/// characters and at camel-case transitions, so `DxilSample` and
/// `d3d-srv` both match while `metallic` does not.
pub fn find_backend_token(text: &str) -> Option<&'static str> {
    for word in split_words(text) {
        let lower = word.to_ascii_lowercase();

        if let Some(token) = BACKEND_TOKENS.iter().find(|t| **t == lower) {
            return Some(token);
        }
    }

    None
}

fn split_words(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut words = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        if !c.is_alphanumeric() {
            if let Some(s) = start.take() {
                words.push(&text[s..i]);
            }

            continue;
        }

        match start {
            None => start = Some(i),
            Some(s) => {
                let prev = bytes[i - 1] as char;
                let upper_run_end = c.is_uppercase()
                    && prev.is_uppercase()
                    && text[i..].chars().nth(1).map_or(false, |n| n.is_lowercase());

                if (c.is_uppercase() && prev.is_lowercase()) || upper_run_end {
                    words.push(&text[s..i]);
                    start = Some(i);
                }
            }
        }
    }

    if let Some(s) = start {
        words.push(&text[s..]);
    }

    words
}
