//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Function, Instruction, Module, Value, ValueKind};
use std::fmt::Write;

/// An IR -> text writer that renders an entire module into a
/// human-readable listing.
///
/// This is purely for human eyes (logs, test failure output, the CLI's
/// verbose mode); the exchange format is the JSON document in
/// [`crate::wire`]. The layout is one header line, the resource and
/// value tables, then each function with indented blocks.
#[derive(Debug, Clone)]
pub struct ModuleWriter {
    whole: String,
}

impl ModuleWriter {
    /// Renders a module into a writer.
    pub fn from(module: &Module) -> ModuleWriter {
        let mut writer = WriterImpl {
            module,
            out: String::new(),
        };

        writer.walk();

        ModuleWriter { whole: writer.out }
    }

    /// Returns the entire module listing as a string.
    pub fn module(&self) -> &str {
        &self.whole
    }
}

/// Prints an entire module listing to `stderr`.
///
/// Wrapper for the common debugging case where constructing a
/// [`ModuleWriter`] by hand is too much ceremony.
pub fn print_module(module: &Module) {
    eprintln!("{}", ModuleWriter::from(module).module());
}

struct WriterImpl<'m> {
    module: &'m Module,
    out: String,
}

impl<'m> WriterImpl<'m> {
    fn walk(&mut self) {
        let profile = &self.module.profile;
        let version = self.module.format_version;

        let _ = writeln!(self.out, "module v{version} profile `{profile}`");

        if let Some(entry) = &self.module.entry_point {
            let _ = writeln!(self.out, "entry `{}` stage {}", entry.name, entry.stage.name());
        }

        for resource in &self.module.resources {
            let writable = if resource.writable { " writable" } else { "" };

            let _ = writeln!(
                self.out,
                "resource {} `{}`: {}{writable}",
                resource.kind, resource.name, resource.ty
            );
        }

        for value in self.module.values.values() {
            self.write_value(value);
        }

        for func in &self.module.functions {
            self.write_function(func);
        }

        for diagnostic in &self.module.diagnostics {
            let _ = writeln!(self.out, "; {diagnostic}");
        }
    }

    fn write_value(&mut self, value: &Value) {
        let _ = write!(self.out, "val {}: {} {}", value.id, value.ty, value.kind);

        match (&value.kind, &value.name) {
            (ValueKind::Constant, Some(text)) => {
                let _ = write!(self.out, " = {text}");
            }
            (_, Some(name)) => {
                let _ = write!(self.out, " `{name}`");
            }
            _ => {}
        }

        if let Some(semantic) = &value.semantic {
            let _ = write!(self.out, " : {semantic}");
        }

        self.out.push('\n');
    }

    fn write_function(&mut self, func: &Function) {
        let _ = write!(self.out, "fn {} `{}`(", func.return_type, func.name);

        for (i, param) in func.parameters.iter().enumerate() {
            if i != 0 {
                self.out.push_str(", ");
            }

            let _ = write!(self.out, "{param}");
        }

        self.out.push_str(") {\n");

        for block in &func.blocks {
            let _ = writeln!(self.out, "{}:", block.id);

            for inst in &block.instructions {
                self.write_instruction(inst);
            }
        }

        self.out.push_str("}\n");
    }

    fn write_instruction(&mut self, inst: &Instruction) {
        self.out.push_str("  ");

        if let (Some(result), Some(ty)) = (inst.result, &inst.ty) {
            let _ = write!(self.out, "{result} = ");
            let _ = write!(self.out, "{} {ty}", inst.op);
        } else {
            let _ = write!(self.out, "{}", inst.op);
        }

        for (i, operand) in inst.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };

            let _ = write!(self.out, "{sep}{operand}");
        }

        if let Some(tag) = inst.tag_text() {
            let _ = write!(self.out, " [{tag}]");
        }

        self.out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, Instruction, Opcode, Type, ValueId};

    #[test]
    fn listing_contains_every_entity() {
        let mut m = Module::new("ps_2_0");

        m.push_value(
            Value::new(ValueId(1), ValueKind::Parameter, Type::parse("float4"))
                .with_name("input")
                .with_semantic("POSITION0"),
        );
        m.push_value(
            Value::new(ValueId(2), ValueKind::Constant, Type::parse("float")).with_name("5"),
        );

        let mut func = Function::new("main", Type::parse("float4"));

        func.parameters.push(ValueId(1));
        func.blocks.push(Block::with_instructions(
            "entry",
            [
                Instruction::new(Opcode::Swizzle)
                    .with_operands([ValueId(1)])
                    .with_result(ValueId(2), Type::parse("float"))
                    .with_tag(crate::ir::InstTag::Swizzle(
                        crate::ir::Swizzle::parse("x").unwrap(),
                    )),
                Instruction::ret(Some(ValueId(1))),
            ],
        ));
        m.functions.push(func);

        let listing = ModuleWriter::from(&m).module().to_string();

        assert!(listing.contains("module v1 profile `ps_2_0`"));
        assert!(listing.contains("val v1: float4 Parameter `input` : POSITION0"));
        assert!(listing.contains("fn float4 `main`(v1) {"));
        assert!(listing.contains("entry:"));
        assert!(listing.contains("v2 = Swizzle float v1 [x]"));
        assert!(listing.contains("Return v1"));
    }

    #[test]
    fn branch_tags_render_in_brackets() {
        let mut m = Module::new("ps_2_0");

        m.push_value(Value::new(ValueId(1), ValueKind::Parameter, Type::parse("bool")));

        let mut func = Function::new("main", Type::parse("bool"));

        func.parameters.push(ValueId(1));
        func.blocks.push(Block::with_instructions(
            "entry",
            [Instruction::branch_cond(ValueId(1), "a", "b")],
        ));
        func.blocks
            .push(Block::with_instructions("a", [Instruction::ret(Some(ValueId(1)))]));
        func.blocks
            .push(Block::with_instructions("b", [Instruction::ret(Some(ValueId(1)))]));
        m.functions.push(func);

        let listing = ModuleWriter::from(&m).module().to_string();

        assert!(listing.contains("BranchCond v1 [then:a;else:b]"));
    }
}
