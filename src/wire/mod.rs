//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! The serialized form of an IR module.
//!
//! These mirror structs carry the exact wire shape (camelCase fields,
//! textual op names, textual tags and type descriptors); conversion to
//! and from the structured model is lossless, so serializing a module
//! and reading it back yields an equal module. Reading validates shape
//! only: an unknown op or a malformed tag round-trips and is rejected
//! by the invariant validator, never by the reader.

use crate::ir::{
    Block, Diagnostic, EntryPoint, Function, InstTag, Instruction, Module, Opcode, Resource,
    ShaderBinding, Stage, StateAssignment, Technique, TechniquePass, Type, Value, ValueId,
    ValueKind,
};
use crate::sema::DocumentError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reads a module from its JSON form. Malformed JSON is the ParseError
/// boundary; every structural problem beyond that surfaces through the
/// invariant validator instead.
pub fn read_module(text: &str) -> Result<Module, DocumentError> {
    let wire: WireModule = serde_json::from_str(text)?;

    Ok(wire.into_module())
}

/// Writes a module to its canonical JSON form.
pub fn write_module(module: &Module) -> String {
    let wire = WireModule::from_module(module);

    serde_json::to_string_pretty(&wire).expect("module serialization cannot fail")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireModule {
    format_version: u32,
    profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entry_point: Option<WireEntryPoint>,
    #[serde(default)]
    functions: Vec<WireFunction>,
    #[serde(default)]
    values: Vec<WireValue>,
    #[serde(default)]
    resources: Vec<WireResource>,
    #[serde(default)]
    techniques: Vec<WireTechnique>,
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntryPoint {
    name: String,
    stage: Stage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFunction {
    name: String,
    return_type: Type,
    #[serde(default)]
    parameters: Vec<ValueId>,
    #[serde(default)]
    blocks: Vec<WireBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlock {
    id: String,
    #[serde(default)]
    instructions: Vec<WireInstruction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInstruction {
    op: String,
    #[serde(default)]
    operands: Vec<ValueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<ValueId>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    ty: Option<Type>,
    #[serde(default)]
    terminator: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireValue {
    id: ValueId,
    #[serde(rename = "type")]
    ty: Type,
    kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    semantic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResource {
    name: String,
    kind: ValueKind,
    #[serde(rename = "type")]
    ty: Type,
    #[serde(default)]
    writable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTechnique {
    name: String,
    #[serde(default)]
    passes: Vec<WireTechniquePass>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTechniquePass {
    name: String,
    #[serde(default)]
    bindings: Vec<WireShaderBinding>,
    #[serde(default)]
    states: Vec<WireStateAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireShaderBinding {
    stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    profile: Option<String>,
    entry: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStateAssignment {
    name: String,
    value: String,
}

impl WireModule {
    pub(crate) fn from_module(module: &Module) -> WireModule {
        WireModule {
            format_version: module.format_version,
            profile: module.profile.clone(),
            entry_point: module.entry_point.as_ref().map(|ep| WireEntryPoint {
                name: ep.name.clone(),
                stage: ep.stage,
            }),
            functions: module.functions.iter().map(function_to_wire).collect(),
            values: module.values.values().map(value_to_wire).collect(),
            resources: module
                .resources
                .iter()
                .map(|res| WireResource {
                    name: res.name.clone(),
                    kind: res.kind.clone(),
                    ty: res.ty.clone(),
                    writable: res.writable,
                })
                .collect(),
            techniques: module.techniques.iter().map(technique_to_wire).collect(),
            diagnostics: module.diagnostics.clone(),
        }
    }

    pub(crate) fn into_module(self) -> Module {
        let mut values = BTreeMap::new();

        for value in self.values {
            values.insert(
                value.id,
                Value {
                    id: value.id,
                    ty: value.ty,
                    kind: value.kind,
                    name: value.name,
                    semantic: value.semantic,
                },
            );
        }

        Module {
            format_version: self.format_version,
            profile: self.profile,
            entry_point: self.entry_point.map(|ep| EntryPoint {
                name: ep.name,
                stage: ep.stage,
            }),
            functions: self.functions.into_iter().map(function_from_wire).collect(),
            values,
            resources: self
                .resources
                .into_iter()
                .map(|res| Resource {
                    name: res.name,
                    kind: res.kind,
                    ty: res.ty,
                    writable: res.writable,
                })
                .collect(),
            techniques: self
                .techniques
                .into_iter()
                .map(technique_from_wire)
                .collect(),
            diagnostics: self.diagnostics,
        }
    }
}

fn function_to_wire(func: &Function) -> WireFunction {
    WireFunction {
        name: func.name.clone(),
        return_type: func.return_type.clone(),
        parameters: func.parameters.clone(),
        blocks: func
            .blocks
            .iter()
            .map(|block| WireBlock {
                id: block.id.clone(),
                instructions: block.instructions.iter().map(instruction_to_wire).collect(),
            })
            .collect(),
    }
}

fn function_from_wire(func: WireFunction) -> Function {
    Function {
        name: func.name,
        return_type: func.return_type,
        parameters: func.parameters,
        blocks: func
            .blocks
            .into_iter()
            .map(|block| Block {
                id: block.id,
                instructions: block
                    .instructions
                    .into_iter()
                    .map(instruction_from_wire)
                    .collect(),
            })
            .collect(),
    }
}

fn instruction_to_wire(inst: &Instruction) -> WireInstruction {
    WireInstruction {
        op: inst.op.name().to_string(),
        operands: inst.operands.to_vec(),
        result: inst.result,
        ty: inst.ty.clone(),
        terminator: inst.is_terminator(),
        tag: inst.tag_text(),
    }
}

fn instruction_from_wire(inst: WireInstruction) -> Instruction {
    let op = Opcode::parse(&inst.op);
    let tag = inst.tag.map(|text| InstTag::parse(&op, &text));

    Instruction {
        op,
        operands: inst.operands.into_iter().collect(),
        result: inst.result,
        ty: inst.ty,
        tag,
    }
}

fn value_to_wire(value: &Value) -> WireValue {
    WireValue {
        id: value.id,
        ty: value.ty.clone(),
        kind: value.kind.clone(),
        name: value.name.clone(),
        semantic: value.semantic.clone(),
    }
}

fn technique_to_wire(technique: &Technique) -> WireTechnique {
    WireTechnique {
        name: technique.name.clone(),
        passes: technique
            .passes
            .iter()
            .map(|pass| WireTechniquePass {
                name: pass.name.clone(),
                bindings: pass
                    .bindings
                    .iter()
                    .map(|binding| WireShaderBinding {
                        stage: binding.stage,
                        profile: binding.profile.clone(),
                        entry: binding.entry.clone(),
                    })
                    .collect(),
                states: pass
                    .states
                    .iter()
                    .map(|state| WireStateAssignment {
                        name: state.name.clone(),
                        value: state.value.clone(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn technique_from_wire(technique: WireTechnique) -> Technique {
    Technique {
        name: technique.name,
        passes: technique
            .passes
            .into_iter()
            .map(|pass| TechniquePass {
                name: pass.name,
                bindings: pass
                    .bindings
                    .into_iter()
                    .map(|binding| ShaderBinding {
                        stage: binding.stage,
                        profile: binding.profile,
                        entry: binding.entry,
                    })
                    .collect(),
                states: pass
                    .states
                    .into_iter()
                    .map(|state| StateAssignment {
                        name: state.name,
                        value: state.value,
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FORMAT_VERSION;

    fn minimal_module() -> Module {
        let mut m = Module::new("ps_2_0");

        m.entry_point = Some(EntryPoint {
            name: "main".to_string(),
            stage: Stage::Pixel,
        });
        m.push_value(
            Value::new(ValueId(1), ValueKind::Parameter, Type::parse("float4"))
                .with_name("input")
                .with_semantic("POSITION0"),
        );

        let mut func = Function::new("main", Type::parse("float4"));

        func.parameters.push(ValueId(1));
        func.blocks.push(Block::with_instructions(
            "entry",
            [Instruction::ret(Some(ValueId(1)))],
        ));
        m.functions.push(func);
        m
    }

    #[test]
    fn round_trip_preserves_module() {
        let module = minimal_module();
        let text = write_module(&module);
        let back = read_module(&text).unwrap();

        assert_eq!(back, module);
    }

    #[test]
    fn unknown_ops_survive_round_trip() {
        let text = r#"{
            "formatVersion": 1,
            "profile": "ps_2_0",
            "functions": [{
                "name": "main",
                "returnType": "float4",
                "parameters": [],
                "blocks": [{
                    "id": "entry",
                    "instructions": [
                        {"op": "DxilSample", "operands": [], "terminator": false},
                        {"op": "Return", "operands": [], "terminator": true}
                    ]
                }]
            }],
            "values": []
        }"#;

        let module = read_module(text).unwrap();
        let inst = &module.functions[0].blocks[0].instructions[0];

        assert_eq!(inst.op, Opcode::Other("DxilSample".to_string()));

        let back = read_module(&write_module(&module)).unwrap();

        assert_eq!(back, module);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(read_module("not json").is_err());
        assert!(read_module(r#"{"formatVersion": "one"}"#).is_err());
    }

    #[test]
    fn format_version_defaults_are_not_invented() {
        let module = minimal_module();

        assert_eq!(module.format_version, FORMAT_VERSION);
    }
}
