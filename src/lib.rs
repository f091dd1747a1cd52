//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

#![deny(
    unreachable_pub,
    missing_docs,
    missing_abi,
    rust_2018_idioms,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]

//! # OpenFXC-IR
//!
//! The middle-end of the OpenFXC shader toolchain: lowering from the
//! front-end's semantic model into a backend-agnostic typed IR, and the
//! classical optimization passes over that IR.
//!
//! The two pipelines are [`lower_model`] and [`optimize_module`]; both
//! record problems as diagnostics on the module they return and never
//! abort on bad IR. Only a malformed input document fails, at the
//! [`sema::DocumentError`] boundary.

pub mod analysis;
pub mod cli;
pub mod ir;
pub mod lower;
pub mod pass;
pub mod sema;
pub mod transforms;
pub mod utility;
pub mod wire;

use crate::ir::Module;
use crate::sema::SemanticModel;

pub use lower::{lower, LowerRequest};
pub use pass::optimize;
pub use transforms::validate;
pub use wire::{read_module, write_module};

/// Lowers a semantic model to an IR module.
///
/// `profile` overrides the model's profile tag, `entry` picks an entry
/// point by name (case-insensitively); the model's defaults apply
/// otherwise. The result always carries the invariant validator's
/// findings on top of any lowering diagnostics.
pub fn lower_model(model: &SemanticModel, profile: Option<&str>, entry: Option<&str>) -> Module {
    lower(LowerRequest {
        model,
        profile,
        entry,
    })
}

/// Runs the optimization pipeline over a module.
///
/// `passes` is the comma-separated pass list (`None` selects the
/// default `constfold, algebraic, copyprop, cse, dce, component-dce`
/// order), `profile` replaces the module's profile tag before any pass
/// runs. The input module is never mutated.
pub fn optimize_module(module: &Module, passes: Option<&str>, profile: Option<&str>) -> Module {
    optimize(module, passes, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Severity;
    use serde_json::json;

    // the full journey: semantic model json -> lower -> optimize with
    // the default pipeline -> validate, ending error-free
    #[test]
    fn lower_then_optimize_stays_error_free() {
        let doc = json!({
            "profile": "ps_2_0",
            "entryPoints": [{"name": "main", "stage": "Pixel", "symbolId": 100}],
            "symbols": [
                {"id": 100, "kind": "Function", "name": "main", "type": "float",
                 "declNodeId": 1},
                {"id": 1, "kind": "Parameter", "name": "input", "type": "float4",
                 "parentSymbolId": 100,
                 "semantic": {"name": "TEXCOORD", "index": 0}}
            ],
            "types": [
                {"nodeId": 4, "type": "float"},
                {"nodeId": 5, "type": "float"},
                {"nodeId": 6, "type": "float"},
                {"nodeId": 7, "type": "float"},
                {"nodeId": 8, "type": "float4"},
                {"nodeId": 9, "type": "float"}
            ],
            "syntax": {"nodes": [
                {"id": 1, "kind": "FunctionDeclaration",
                 "children": [{"role": "body", "nodeId": 2}]},
                {"id": 2, "kind": "CompoundStatement", "children": [{"nodeId": 3}]},
                {"id": 3, "kind": "ReturnStatement",
                 "children": [{"role": "expression", "nodeId": 4}]},
                // (input.x * 1.0) + 0.0
                {"id": 4, "kind": "BinaryExpression", "operator": "+",
                 "children": [{"role": "left", "nodeId": 5}, {"role": "right", "nodeId": 9}]},
                {"id": 5, "kind": "BinaryExpression", "operator": "*",
                 "children": [{"role": "left", "nodeId": 6}, {"role": "right", "nodeId": 7}]},
                {"id": 6, "kind": "MemberAccessExpression", "swizzle": "x",
                 "children": [{"role": "target", "nodeId": 8}]},
                {"id": 7, "kind": "LiteralExpression", "text": "1.0"},
                {"id": 8, "kind": "Identifier", "referencedSymbolId": 1},
                {"id": 9, "kind": "LiteralExpression", "text": "0.0"}
            ]}
        });
        let model = SemanticModel::from_json(&doc.to_string()).unwrap();

        let lowered = lower_model(&model, None, None);

        assert!(!lowered.has_errors(), "{:?}", lowered.diagnostics);

        let optimized = optimize_module(&lowered, None, None);

        assert!(!optimized.has_errors(), "{:?}", optimized.diagnostics);

        // `x * 1` and `x + 0` both collapse, leaving the return as a
        // direct use of the swizzled lane
        let func = &optimized.functions[0];
        let ret = func.blocks[0].terminator().unwrap();
        let returned = optimized.value(ret.operands[0]).unwrap();

        assert_eq!(returned.ty, crate::ir::Type::parse("float"));
    }

    #[test]
    fn serialized_output_round_trips() {
        let doc = json!({
            "profile": "ps_2_0",
            "entryPoints": [{"name": "main", "stage": "Pixel", "symbolId": 100}],
            "symbols": [
                {"id": 100, "kind": "Function", "name": "main", "type": "float4",
                 "declNodeId": 1},
                {"id": 1, "kind": "Parameter", "name": "input", "type": "float4",
                 "parentSymbolId": 100}
            ],
            "types": [{"nodeId": 4, "type": "float4"}],
            "syntax": {"nodes": [
                {"id": 1, "kind": "FunctionDeclaration",
                 "children": [{"role": "body", "nodeId": 2}]},
                {"id": 2, "kind": "CompoundStatement", "children": [{"nodeId": 3}]},
                {"id": 3, "kind": "ReturnStatement",
                 "children": [{"role": "expression", "nodeId": 4}]},
                {"id": 4, "kind": "Identifier", "referencedSymbolId": 1}
            ]}
        });
        let model = SemanticModel::from_json(&doc.to_string()).unwrap();
        let lowered = lower_model(&model, None, None);

        let text = write_module(&lowered);
        let back = read_module(&text).unwrap();

        assert_eq!(back, lowered);
    }

    #[test]
    fn optimizing_twice_is_stable_modulo_info_diagnostics() {
        let doc = json!({
            "profile": "ps_2_0",
            "entryPoints": [{"name": "main", "symbolId": 100}],
            "symbols": [
                {"id": 100, "kind": "Function", "name": "main", "type": "float4",
                 "declNodeId": 1},
                {"id": 1, "kind": "Parameter", "name": "input", "type": "float4",
                 "parentSymbolId": 100}
            ],
            "types": [{"nodeId": 4, "type": "float4"}],
            "syntax": {"nodes": [
                {"id": 1, "kind": "FunctionDeclaration",
                 "children": [{"role": "body", "nodeId": 2}]},
                {"id": 2, "kind": "CompoundStatement", "children": [{"nodeId": 3}]},
                {"id": 3, "kind": "ReturnStatement",
                 "children": [{"role": "expression", "nodeId": 4}]},
                {"id": 4, "kind": "Identifier", "referencedSymbolId": 1}
            ]}
        });
        let model = SemanticModel::from_json(&doc.to_string()).unwrap();
        let lowered = lower_model(&model, None, None);

        let once = optimize_module(&lowered, None, None);
        let twice = optimize_module(&once, None, None);

        assert_eq!(once.functions, twice.functions);
        assert_eq!(once.values, twice.values);
        assert!(twice
            .diagnostics
            .iter()
            .all(|d| d.severity != Severity::Error));
    }
}
