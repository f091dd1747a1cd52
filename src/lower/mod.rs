//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! The lowering pipeline: semantic model in, IR module out.
//!
//! Lowering walks the entry function's statement graph and emits typed
//! instructions into explicit basic blocks, mirrors resource and
//! parameter symbols into values, and forwards technique metadata.
//! Nothing here ever aborts: unresolved references and unsupported
//! constructs become `lower`-stage Error diagnostics and the best-effort
//! module is always returned.

mod expr;
mod func;
mod stmt;

use crate::ir::{
    EntryPoint, Function, Instruction, Module, Resource, ShaderBinding, Stage, StateAssignment,
    Technique, TechniquePass, Type, Value, ValueId, ValueKind,
};
use crate::sema::{SemEntryPoint, SemSymbol, SemTechnique, SemanticIndex, SemanticModel};
use crate::transforms::validate;
use func::FuncLowerer;
use tracing::debug;

/// A single lowering request.
pub struct LowerRequest<'a> {
    /// The semantic model to lower.
    pub model: &'a SemanticModel,
    /// Overrides the model's profile tag.
    pub profile: Option<&'a str>,
    /// Selects an entry point by name (case-insensitive); the model's
    /// first entry is used otherwise.
    pub entry: Option<&'a str>,
}

/// Lowers a semantic model into an IR module.
///
/// The returned module carries whatever could be produced plus every
/// diagnostic, including the invariant validator's findings on the
/// result.
pub fn lower(request: LowerRequest<'_>) -> Module {
    let index = SemanticIndex::build(request.model);

    let profile = request
        .profile
        .or(request.model.profile.as_deref())
        .unwrap_or("unknown");
    let mut module = Module::new(profile);

    debug!(profile, "lowering semantic model");

    let entry = resolve_entry(&mut module, request.model, request.entry);

    if let Some(entry) = entry {
        module.entry_point = Some(EntryPoint {
            name: entry.name.clone(),
            stage: entry.stage.as_deref().map(Stage::parse).unwrap_or(Stage::Unknown),
        });
    }

    lower_resources(&mut module, &index);

    if let Some(entry) = entry {
        if let Some(symbol) = resolve_entry_symbol(&mut module, &index, entry) {
            let parameters = lower_parameters(&mut module, &index, symbol);

            lower_body(&mut module, &index, entry, symbol, parameters);
        }
    }

    module.techniques = request
        .model
        .techniques
        .iter()
        .map(lower_technique)
        .collect();

    let findings = validate(&module);

    module.diagnostics.extend(findings);
    module
}

fn resolve_entry<'m>(
    module: &mut Module,
    model: &'m SemanticModel,
    requested: Option<&str>,
) -> Option<&'m SemEntryPoint> {
    let entry = match requested {
        Some(name) => model
            .entry_points
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name)),
        None => model.entry_points.first(),
    };

    if entry.is_none() {
        let wanted = requested.unwrap_or("<first>");

        module.push_diagnostic(crate::ir::Diagnostic::error(
            crate::ir::DiagStage::Lower,
            format!("no entry point `{wanted}` in the semantic model"),
        ));
    }

    entry
}

fn resolve_entry_symbol<'m>(
    module: &mut Module,
    index: &SemanticIndex<'m>,
    entry: &SemEntryPoint,
) -> Option<&'m SemSymbol> {
    let symbol = entry.symbol_id.and_then(|id| index.symbol(id));

    if symbol.is_none() {
        module.push_diagnostic(crate::ir::Diagnostic::error(
            crate::ir::DiagStage::Lower,
            format!("entry point `{}` has no backing symbol", entry.name),
        ));
    }

    symbol
}

// every sampler, texture, global, cbuffer and buffer symbol becomes a
// resource plus a value carrying the same id
fn lower_resources(module: &mut Module, index: &SemanticIndex<'_>) {
    for symbol in index.symbols() {
        let kind = ValueKind::parse(&symbol.kind);

        if !matches!(
            kind,
            ValueKind::Sampler
                | ValueKind::Texture(_)
                | ValueKind::CBuffer
                | ValueKind::Buffer
                | ValueKind::GlobalVariable
        ) {
            continue;
        }

        let ty = symbol
            .ty
            .as_deref()
            .map(Type::parse)
            .unwrap_or_else(Type::unknown);

        module.resources.push(Resource {
            name: symbol.name.clone(),
            kind: kind.clone(),
            ty: ty.clone(),
            writable: symbol
                .ty
                .as_deref()
                .map_or(false, |t| t.starts_with("RW")),
        });
        module.push_value(Value::new(ValueId(symbol.id), kind, ty).with_name(&symbol.name));
    }

    debug!(resources = module.resources.len(), "lowered resources");
}

fn lower_parameters(
    module: &mut Module,
    index: &SemanticIndex<'_>,
    entry_symbol: &SemSymbol,
) -> Vec<ValueId> {
    let mut parameters = Vec::new();

    for symbol in index.symbols() {
        if symbol.kind != "Parameter" || symbol.parent_symbol_id != Some(entry_symbol.id) {
            continue;
        }

        let ty = symbol
            .ty
            .as_deref()
            .map(Type::parse)
            .unwrap_or_else(Type::unknown);
        let mut value =
            Value::new(ValueId(symbol.id), ValueKind::Parameter, ty).with_name(&symbol.name);

        if let Some(semantic) = &symbol.semantic {
            value = value.with_semantic(semantic.formatted());
        }

        module.push_value(value);
        parameters.push(ValueId(symbol.id));
    }

    parameters
}

fn lower_body(
    module: &mut Module,
    index: &SemanticIndex<'_>,
    entry: &SemEntryPoint,
    symbol: &SemSymbol,
    parameters: Vec<ValueId>,
) {
    let return_type = symbol
        .ty
        .as_deref()
        .map(Type::parse)
        .unwrap_or_else(Type::unknown);

    let mut lowerer = FuncLowerer::new(index, module, return_type.clone());

    match symbol.decl_node_id.and_then(|id| index.node(id)) {
        Some(decl) => {
            let statements = match lowerer.child_by_role(decl, "body") {
                Some(body)
                    if matches!(
                        body.kind.as_str(),
                        "CompoundStatement" | "Block" | "BlockStatement"
                    ) =>
                {
                    lowerer.child_nodes(body)
                }
                Some(body) => vec![body],
                None => Vec::new(),
            };

            lowerer.lower_statements(&statements);
        }
        None => lowerer.error(format!(
            "entry point `{}` has no declaration to lower",
            entry.name
        )),
    }

    // a merge block nothing falls through into is dropped instead of
    // terminated
    if lowerer.current_is_vestigial() {
        lowerer.discard_current();
    }

    // a body that never returned still has to terminate: yield the
    // first parameter, or an undef of the return type
    if !lowerer.is_terminated() {
        let operand = match parameters.first() {
            Some(first) => Some(*first),
            None if return_type != Type::Named("void".to_string()) => {
                Some(lowerer.undef(return_type.clone()))
            }
            None => None,
        };

        lowerer.terminate(Instruction::ret(operand));
    }

    let blocks = lowerer.finish();

    debug!(
        function = entry.name.as_str(),
        blocks = blocks.len(),
        "lowered entry function"
    );

    module.functions.push(Function {
        name: entry.name.clone(),
        return_type,
        parameters,
        blocks,
    });
}

fn lower_technique(technique: &SemTechnique) -> Technique {
    Technique {
        name: technique.name.clone(),
        passes: technique
            .passes
            .iter()
            .map(|pass| TechniquePass {
                name: pass.name.clone(),
                bindings: pass
                    .bindings
                    .iter()
                    .map(|binding| ShaderBinding {
                        stage: binding
                            .stage
                            .as_deref()
                            .map(Stage::parse)
                            .unwrap_or(Stage::Unknown),
                        profile: binding.profile.clone(),
                        entry: binding.entry.clone(),
                    })
                    .collect(),
                states: pass
                    .states
                    .iter()
                    .map(|state| StateAssignment {
                        name: state.name.clone(),
                        value: state.value.clone(),
                    })
                    .collect(),
            })
            .collect(),
    }
}
