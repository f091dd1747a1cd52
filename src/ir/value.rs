//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::Type;
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;
use std::fmt;

/// Identifies a single value within a module.
///
/// Ids are positive integers assigned by the producer (the lowering
/// pipeline reuses semantic symbol ids for resources and parameters, and
/// fills the gaps with the lowest unused id for temporaries). Zero is
/// never a valid id.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct ValueId(pub u64);

assert_eq_size!(ValueId, u64);

impl ValueId {
    /// Whether the id is in the valid range. The wire format can carry
    /// a zero id, the validator rejects it.
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// What sort of datum a value models.
///
/// The set is closed except for the family of texture kinds
/// (`Texture2D`, `TextureCube`, …), which keep their spelling, and
/// [`ValueKind::Other`], which preserves foreign kinds across a
/// round-trip so the validator can see them.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum ValueKind {
    Parameter,
    Constant,
    Temp,
    Undef,
    Sampler,
    Texture(String),
    CBuffer,
    Buffer,
    GlobalVariable,
    Resource,
    StructMember,
    CBufferMember,
    Other(String),
}

impl ValueKind {
    /// Parses a kind name. `Texture*` spellings keep their exact text,
    /// anything unrecognized lands in [`ValueKind::Other`].
    pub fn parse(text: &str) -> ValueKind {
        match text {
            "Parameter" => ValueKind::Parameter,
            "Constant" => ValueKind::Constant,
            "Temp" => ValueKind::Temp,
            "Undef" => ValueKind::Undef,
            "Sampler" => ValueKind::Sampler,
            "CBuffer" => ValueKind::CBuffer,
            "Buffer" => ValueKind::Buffer,
            "GlobalVariable" => ValueKind::GlobalVariable,
            "Resource" => ValueKind::Resource,
            "StructMember" => ValueKind::StructMember,
            "CBufferMember" => ValueKind::CBufferMember,
            _ if text.starts_with("Texture") || text.starts_with("RWTexture") => {
                ValueKind::Texture(text.to_string())
            }
            _ => ValueKind::Other(text.to_string()),
        }
    }

    /// The wire spelling of the kind.
    pub fn name(&self) -> &str {
        match self {
            ValueKind::Parameter => "Parameter",
            ValueKind::Constant => "Constant",
            ValueKind::Temp => "Temp",
            ValueKind::Undef => "Undef",
            ValueKind::Sampler => "Sampler",
            ValueKind::Texture(name) => name,
            ValueKind::CBuffer => "CBuffer",
            ValueKind::Buffer => "Buffer",
            ValueKind::GlobalVariable => "GlobalVariable",
            ValueKind::Resource => "Resource",
            ValueKind::StructMember => "StructMember",
            ValueKind::CBufferMember => "CBufferMember",
            ValueKind::Other(name) => name,
        }
    }

    /// Whether a value of this kind is a global that reads go through
    /// `Load` for, rather than being referenced directly.
    pub fn is_loadable(&self) -> bool {
        matches!(
            self,
            ValueKind::GlobalVariable
                | ValueKind::CBuffer
                | ValueKind::Buffer
                | ValueKind::StructMember
                | ValueKind::CBufferMember
        )
    }

    /// Whether the kind models a resource binding.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            ValueKind::Sampler
                | ValueKind::Texture(_)
                | ValueKind::CBuffer
                | ValueKind::Buffer
                | ValueKind::Resource
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for ValueKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ValueKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<ValueKind, D::Error> {
        let text = String::deserialize(deserializer)?;

        Ok(ValueKind::parse(&text))
    }
}

/// A single SSA-identifiable datum in a module.
///
/// Constants carry their literal text in `name` (parsed on demand by the
/// folding machinery), parameters carry their formatted `semantic`
/// (e.g. `POSITION0`).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Value {
    /// The module-unique id.
    pub id: ValueId,
    /// The declared type. Never empty in valid IR.
    pub ty: Type,
    /// What sort of datum this is.
    pub kind: ValueKind,
    /// Optional name: an identifier for variables, the literal text
    /// for constants.
    pub name: Option<String>,
    /// Optional semantic annotation, e.g. `POSITION0`.
    pub semantic: Option<String>,
}

impl Value {
    /// Creates a value with no name or semantic.
    pub fn new(id: ValueId, kind: ValueKind, ty: Type) -> Value {
        Value {
            id,
            ty,
            kind,
            name: None,
            semantic: None,
        }
    }

    /// Attaches a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Value {
        self.name = Some(name.into());
        self
    }

    /// Attaches a semantic annotation.
    pub fn with_semantic(mut self, semantic: impl Into<String>) -> Value {
        self.semantic = Some(semantic.into());
        self
    }

    /// Whether this value is a constant with literal text attached.
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ValueKind::Constant)
    }
}
