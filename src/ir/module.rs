//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Diagnostic, Function, Type, Value, ValueId, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The wire format version this crate reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// The shader stage an entry point targets.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Stage {
    Vertex,
    Pixel,
    Geometry,
    Hull,
    Domain,
    Compute,
    Unknown,
}

impl Stage {
    /// Parses a stage name case-insensitively, defaulting to
    /// [`Stage::Unknown`].
    pub fn parse(text: &str) -> Stage {
        match text.to_ascii_lowercase().as_str() {
            "vertex" => Stage::Vertex,
            "pixel" => Stage::Pixel,
            "geometry" => Stage::Geometry,
            "hull" => Stage::Hull,
            "domain" => Stage::Domain,
            "compute" => Stage::Compute,
            _ => Stage::Unknown,
        }
    }

    /// The canonical spelling.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Vertex => "Vertex",
            Stage::Pixel => "Pixel",
            Stage::Geometry => "Geometry",
            Stage::Hull => "Hull",
            Stage::Domain => "Domain",
            Stage::Compute => "Compute",
            Stage::Unknown => "Unknown",
        }
    }
}

/// The entry point a module was lowered for.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EntryPoint {
    /// The entry function's name.
    pub name: String,
    /// The stage it targets.
    pub stage: Stage,
}

/// A global resource declaration mirrored out of the semantic model.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Resource {
    /// The declared name.
    pub name: String,
    /// The resource's kind, e.g. `Sampler` or `Texture2D`.
    pub kind: ValueKind,
    /// The declared type descriptor.
    pub ty: Type,
    /// Whether the resource is writable (`RW*` declarations).
    pub writable: bool,
}

/// A shader binding inside a technique pass.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ShaderBinding {
    /// The stage being bound.
    pub stage: Stage,
    /// An optional profile tag overriding the module's.
    pub profile: Option<String>,
    /// The entry symbol bound for the stage.
    pub entry: String,
}

/// A render-state assignment inside a technique pass.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StateAssignment {
    /// The state's name.
    pub name: String,
    /// The state's value, verbatim.
    pub value: String,
}

/// One pass of a technique.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TechniquePass {
    /// The pass's name.
    pub name: String,
    /// Shader bindings, in order.
    pub bindings: Vec<ShaderBinding>,
    /// State assignments, in order.
    pub states: Vec<StateAssignment>,
}

/// A technique: an ordered list of passes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Technique {
    /// The technique's name.
    pub name: String,
    /// The passes, in order.
    pub passes: Vec<TechniquePass>,
}

/// The root of the IR: everything a single lowered shader carries.
///
/// Modules are created by the lowering pipeline and handed to the
/// optimizer, which produces new modules rather than mutating its input.
/// Diagnostics only ever accumulate.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Module {
    /// The wire format version, fixed at [`FORMAT_VERSION`].
    pub format_version: u32,
    /// Free-form profile tag, e.g. `ps_2_0`.
    pub profile: String,
    /// The entry point this module was lowered for, when one resolved.
    pub entry_point: Option<EntryPoint>,
    /// The functions, in order. The lowering pipeline produces at most
    /// one (the entry), readers may carry more.
    pub functions: Vec<Function>,
    /// Every value in the module, keyed (and therefore ordered) by id.
    pub values: BTreeMap<ValueId, Value>,
    /// Global resource declarations.
    pub resources: Vec<Resource>,
    /// Technique and pass metadata forwarded from the semantic model.
    pub techniques: Vec<Technique>,
    /// Accumulated diagnostics, append-only across stages.
    pub diagnostics: Vec<Diagnostic>,
}

impl Module {
    /// An empty module with the given profile.
    pub fn new(profile: impl Into<String>) -> Module {
        Module {
            format_version: FORMAT_VERSION,
            profile: profile.into(),
            entry_point: None,
            functions: Vec::new(),
            values: BTreeMap::new(),
            resources: Vec::new(),
            techniques: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Looks up a value by id.
    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(&id)
    }

    /// The declared type of a value, when the id is known.
    pub fn value_type(&self, id: ValueId) -> Option<&Type> {
        self.values.get(&id).map(|v| &v.ty)
    }

    /// Inserts a value under its own id.
    pub fn push_value(&mut self, value: Value) {
        self.values.insert(value.id, value);
    }

    /// The lowest positive id not yet taken by any value.
    pub fn unused_value_id(&self) -> ValueId {
        let mut id = 1;

        while self.values.contains_key(&ValueId(id)) {
            id += 1;
        }

        ValueId(id)
    }

    /// Creates a new value of the given kind and type under the lowest
    /// unused id, returning the id.
    pub fn allocate_value(&mut self, kind: ValueKind, ty: Type) -> ValueId {
        let id = self.unused_value_id();

        self.push_value(Value::new(id, kind, ty));
        id
    }

    /// Appends a diagnostic.
    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Whether any accumulated diagnostic is an `Error`.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_unused_id_fills_gaps() {
        let mut m = Module::new("ps_2_0");

        m.push_value(Value::new(ValueId(1), ValueKind::Temp, Type::parse("float")));
        m.push_value(Value::new(ValueId(3), ValueKind::Temp, Type::parse("float")));

        assert_eq!(m.unused_value_id(), ValueId(2));

        let id = m.allocate_value(ValueKind::Temp, Type::parse("float"));

        assert_eq!(id, ValueId(2));
        assert_eq!(m.unused_value_id(), ValueId(4));
    }

    #[test]
    fn stage_parsing_is_case_insensitive() {
        assert_eq!(Stage::parse("Pixel"), Stage::Pixel);
        assert_eq!(Stage::parse("vertex"), Stage::Vertex);
        assert_eq!(Stage::parse("raygen"), Stage::Unknown);
    }
}
