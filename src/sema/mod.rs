//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Document types for the semantic model handed to us by the upstream
//! front-end.
//!
//! These are read-only inputs: lowering walks them but never mutates
//! them. The shapes mirror the exchanged JSON exactly (camelCase field
//! names); anything the front-end emits beyond these fields is ignored.
//! The only failure at this boundary is a malformed document, everything
//! semantic becomes a diagnostic during lowering.

use crate::utility::SaHashMap;
use serde::Deserialize;
use thiserror::Error;

/// The error produced when an input document is not a recognized shape.
///
/// This is the one fatal condition in the whole pipeline; callers abort
/// with exit code 1. Everything else is diagnostics on the module.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document was not valid JSON of the expected shape.
    #[error("malformed input document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The root of the semantic model document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SemanticModel {
    /// The profile the source was compiled against, if known.
    pub profile: Option<String>,
    /// Declared entry points.
    pub entry_points: Vec<SemEntryPoint>,
    /// Every resolved symbol.
    pub symbols: Vec<SemSymbol>,
    /// Expression type bindings, node id to descriptor.
    pub types: Vec<SemNodeType>,
    /// The syntax graph.
    pub syntax: SemSyntax,
    /// Technique metadata, forwarded into the IR verbatim.
    pub techniques: Vec<SemTechnique>,
}

impl SemanticModel {
    /// Reads a semantic model out of its JSON form. A malformed
    /// document is the ParseError boundary; there is no partial result.
    pub fn from_json(text: &str) -> Result<SemanticModel, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A declared entry point.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemEntryPoint {
    /// The entry function's name.
    pub name: String,
    /// The stage tag, if the front-end resolved one.
    #[serde(default)]
    pub stage: Option<String>,
    /// The id of the function symbol backing the entry.
    #[serde(default)]
    pub symbol_id: Option<u64>,
}

/// A resolved symbol: function, parameter, global, member or resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemSymbol {
    /// The symbol's id. Resource and parameter symbols carry their id
    /// into the IR as the value id.
    pub id: u64,
    /// The symbol kind, e.g. `Parameter`, `GlobalVariable`, `Texture2D`.
    pub kind: String,
    /// The declared name.
    pub name: String,
    /// The declared type descriptor.
    #[serde(default, rename = "type")]
    pub ty: Option<String>,
    /// The enclosing symbol (parameters point at their function).
    #[serde(default)]
    pub parent_symbol_id: Option<u64>,
    /// The syntax node of the declaration.
    #[serde(default)]
    pub decl_node_id: Option<u64>,
    /// The declared semantic annotation.
    #[serde(default)]
    pub semantic: Option<SemSemantic>,
}

/// A semantic annotation split into name and index (`POSITION`, 0).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemSemantic {
    /// The semantic's name.
    pub name: String,
    /// The semantic's index, when one was written.
    #[serde(default)]
    pub index: Option<u32>,
}

impl SemSemantic {
    /// The concatenated form carried on IR values (`POSITION0`).
    pub fn formatted(&self) -> String {
        match self.index {
            Some(index) => format!("{}{index}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A type binding for an expression node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemNodeType {
    /// The syntax node the binding is for.
    pub node_id: u64,
    /// The bound type descriptor.
    #[serde(rename = "type")]
    pub ty: String,
}

/// The syntax graph.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemSyntax {
    /// Every node, addressed by id from [`SemChild`] references.
    #[serde(default)]
    pub nodes: Vec<SemNode>,
}

/// A single syntax node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemNode {
    /// The node's id.
    pub id: u64,
    /// The node kind, e.g. `BinaryExpression` or `ReturnStatement`.
    pub kind: String,
    /// Child references, in source order.
    #[serde(default)]
    pub children: Vec<SemChild>,
    /// The operator token for unary/binary expressions.
    #[serde(default)]
    pub operator: Option<String>,
    /// The swizzle text for member accesses (`xy`, `rgba`).
    #[serde(default)]
    pub swizzle: Option<String>,
    /// The callee name for call expressions.
    #[serde(default)]
    pub callee_name: Option<String>,
    /// The callee kind (`Intrinsic` or `Function`).
    #[serde(default)]
    pub callee_kind: Option<String>,
    /// The symbol this node references, when resolved.
    #[serde(default)]
    pub referenced_symbol_id: Option<u64>,
    /// The literal text for literal expressions.
    #[serde(default)]
    pub text: Option<String>,
}

/// A role-tagged child reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemChild {
    /// The child's role (`condition`, `body`, `argument`, …) when the
    /// front-end assigned one.
    #[serde(default)]
    pub role: Option<String>,
    /// The referenced node.
    pub node_id: u64,
}

/// Technique metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemTechnique {
    /// The technique's name.
    pub name: String,
    /// The passes, in order.
    #[serde(default)]
    pub passes: Vec<SemTechniquePass>,
}

/// One pass of a technique.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemTechniquePass {
    /// The pass's name.
    pub name: String,
    /// Shader bindings, in order.
    #[serde(default)]
    pub bindings: Vec<SemShaderBinding>,
    /// State assignments, in order.
    #[serde(default)]
    pub states: Vec<SemStateAssignment>,
}

/// A shader binding inside a technique pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemShaderBinding {
    /// The bound stage.
    #[serde(default)]
    pub stage: Option<String>,
    /// The binding's profile override.
    #[serde(default)]
    pub profile: Option<String>,
    /// The bound entry symbol.
    pub entry: String,
}

/// A render-state assignment inside a technique pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemStateAssignment {
    /// The state's name.
    pub name: String,
    /// The state's value, verbatim.
    pub value: String,
}

/// Index structures over a semantic model, built once per lowering run.
///
/// Nodes, symbols and type bindings all cross-reference by id; linear
/// scans would make every expression visit quadratic.
pub struct SemanticIndex<'a> {
    nodes: SaHashMap<u64, &'a SemNode>,
    symbols: SaHashMap<u64, &'a SemSymbol>,
    types: SaHashMap<u64, &'a str>,
    model: &'a SemanticModel,
}

impl<'a> SemanticIndex<'a> {
    /// Builds the index for a model.
    pub fn build(model: &'a SemanticModel) -> SemanticIndex<'a> {
        let mut nodes = SaHashMap::default();
        let mut symbols = SaHashMap::default();
        let mut types = SaHashMap::default();

        for node in &model.syntax.nodes {
            nodes.insert(node.id, node);
        }

        for symbol in &model.symbols {
            symbols.insert(symbol.id, symbol);
        }

        for binding in &model.types {
            types.insert(binding.node_id, binding.ty.as_str());
        }

        SemanticIndex {
            nodes,
            symbols,
            types,
            model,
        }
    }

    /// The model being indexed.
    pub fn model(&self) -> &'a SemanticModel {
        self.model
    }

    /// Resolves a node id.
    pub fn node(&self, id: u64) -> Option<&'a SemNode> {
        self.nodes.get(&id).copied()
    }

    /// Resolves a symbol id.
    pub fn symbol(&self, id: u64) -> Option<&'a SemSymbol> {
        self.symbols.get(&id).copied()
    }

    /// The bound type descriptor for a node, when the front-end
    /// recorded one.
    pub fn node_type(&self, id: u64) -> Option<&'a str> {
        self.types.get(&id).copied()
    }

    /// Iterates over all symbols.
    pub fn symbols(&self) -> impl Iterator<Item = &'a SemSymbol> + '_ {
        self.model.symbols.iter()
    }
}
