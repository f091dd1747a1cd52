//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use serde::{Deserialize, Serialize};
use std::fmt;

/// The scalar element types recognized by the IR.
///
/// Everything numeric in a shader bottoms out in one of these, vectors and
/// matrices are shaped collections of a single scalar.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum Scalar {
    Float,
    Half,
    Double,
    Int,
    Uint,
    Bool,
}

impl Scalar {
    /// The textual spelling of the scalar in type descriptors.
    pub fn name(self) -> &'static str {
        match self {
            Scalar::Float => "float",
            Scalar::Half => "half",
            Scalar::Double => "double",
            Scalar::Int => "int",
            Scalar::Uint => "uint",
            Scalar::Bool => "bool",
        }
    }

    /// Parses a scalar name, returning `None` for anything outside
    /// the closed set.
    pub fn parse(text: &str) -> Option<Scalar> {
        match text {
            "float" => Some(Scalar::Float),
            "half" => Some(Scalar::Half),
            "double" => Some(Scalar::Double),
            "int" => Some(Scalar::Int),
            "uint" => Some(Scalar::Uint),
            "bool" => Some(Scalar::Bool),
            _ => None,
        }
    }

    /// Whether arithmetic is defined on the scalar. `bool` is the one
    /// scalar that is not numeric.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Scalar::Bool)
    }
}

/// A templated resource descriptor, e.g. `Texture2D<float4>` or
/// `StructuredBuffer<Light>`.
///
/// The template name is kept verbatim so that descriptors we have never
/// seen before survive a round-trip through the wire format.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ResourceType {
    /// The template name, e.g. `Texture2D` or `RWTexture2D`.
    pub template: String,
    /// The element type between the angle brackets, if one was written.
    pub element: Option<Box<Type>>,
}

/// A parsed type descriptor.
///
/// The grammar is closed: scalars, vectors (`float3`), matrices
/// (`float4x4`), samplers, buffers, constant buffers, templated resources
/// and named structs. Anything that doesn't parse lands in [`Type::Named`]
/// with its original spelling, so [`Type::parse`] never fails and
/// `display ∘ parse` is the identity.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum Type {
    Scalar(Scalar),
    Vector(Scalar, u8),
    Matrix(Scalar, u8, u8),
    /// `SamplerState`
    Sampler,
    /// `Buffer`
    Buffer,
    /// `cbuffer`
    ConstantBuffer,
    /// `Texture2D<..>`, `RWTexture2D<..>`, `StructuredBuffer<..>`, …
    Resource(ResourceType),
    /// A struct name, or any descriptor outside the closed grammar
    /// (including the `unknown` placeholder).
    Named(String),
}

impl Type {
    /// The placeholder type used when the semantic model has no binding
    /// for an expression.
    pub fn unknown() -> Type {
        Type::Named("unknown".to_string())
    }

    /// Parses a type descriptor. Unrecognized descriptors are preserved
    /// verbatim as [`Type::Named`].
    pub fn parse(text: &str) -> Type {
        if let Some(scalar) = Scalar::parse(text) {
            return Type::Scalar(scalar);
        }

        if let Some(ty) = parse_shaped(text) {
            return ty;
        }

        match text {
            "SamplerState" => return Type::Sampler,
            "Buffer" => return Type::Buffer,
            "cbuffer" => return Type::ConstantBuffer,
            _ => {}
        }

        if let Some(ty) = parse_resource(text) {
            return ty;
        }

        Type::Named(text.to_string())
    }

    /// The scalar element type, for scalars, vectors and matrices.
    pub fn scalar(&self) -> Option<Scalar> {
        match self {
            Type::Scalar(s) => Some(*s),
            Type::Vector(s, _) => Some(*s),
            Type::Matrix(s, _, _) => Some(*s),
            _ => None,
        }
    }

    /// The number of scalar components: 1 for scalars, `n` for vectors,
    /// `r * c` for matrices. `None` for everything else.
    pub fn components(&self) -> Option<u32> {
        match self {
            Type::Scalar(_) => Some(1),
            Type::Vector(_, n) => Some(*n as u32),
            Type::Matrix(_, r, c) => Some(*r as u32 * *c as u32),
            _ => None,
        }
    }

    /// Rebuilds the type with a different component count but the same
    /// scalar base. A count of 1 produces a plain scalar.
    ///
    /// Only meaningful for scalars and vectors, which is all the
    /// component-level liveness pass ever narrows.
    pub fn with_components(&self, count: u8) -> Option<Type> {
        let scalar = self.scalar()?;

        match count {
            1 => Some(Type::Scalar(scalar)),
            2..=4 => Some(Type::Vector(scalar, count)),
            _ => None,
        }
    }

    /// Whether arithmetic is defined over the type's elements.
    pub fn is_numeric(&self) -> bool {
        self.scalar().map_or(false, Scalar::is_numeric)
    }

    /// Whether this is exactly the `bool` scalar.
    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Scalar(Scalar::Bool))
    }

    /// Whether the type names a resource binding rather than plain data.
    /// Resource element types are opaque to the type rules.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            Type::Sampler | Type::Buffer | Type::ConstantBuffer | Type::Resource(_)
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Scalar(s) => write!(f, "{}", s.name()),
            Type::Vector(s, n) => write!(f, "{}{n}", s.name()),
            Type::Matrix(s, r, c) => write!(f, "{}{r}x{c}", s.name()),
            Type::Sampler => write!(f, "SamplerState"),
            Type::Buffer => write!(f, "Buffer"),
            Type::ConstantBuffer => write!(f, "cbuffer"),
            Type::Resource(res) => match &res.element {
                Some(element) => write!(f, "{}<{element}>", res.template),
                None => write!(f, "{}", res.template),
            },
            Type::Named(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for Type {
    fn from(text: &str) -> Type {
        Type::parse(text)
    }
}

impl From<String> for Type {
    fn from(text: String) -> Type {
        Type::parse(&text)
    }
}

impl From<Type> for String {
    fn from(ty: Type) -> String {
        ty.to_string()
    }
}

impl Serialize for Type {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Type, D::Error> {
        let text = String::deserialize(deserializer)?;

        Ok(Type::parse(&text))
    }
}

// parses `float3` / `float4x4` style descriptors. returns `None` when the
// text isn't scalar-prefixed or the dimensions are out of range.
fn parse_shaped(text: &str) -> Option<Type> {
    let split = text.find(|c: char| c.is_ascii_digit())?;
    let (name, dims) = text.split_at(split);
    let scalar = Scalar::parse(name)?;
    let mut chars = dims.chars();

    let rows = digit_dim(chars.next()?)?;

    match chars.next() {
        None => {
            if (2..=4).contains(&rows) {
                Some(Type::Vector(scalar, rows))
            } else {
                None
            }
        }
        Some('x') => {
            let cols = digit_dim(chars.next()?)?;

            if chars.next().is_none() {
                Some(Type::Matrix(scalar, rows, cols))
            } else {
                None
            }
        }
        Some(_) => None,
    }
}

fn digit_dim(c: char) -> Option<u8> {
    let d = c.to_digit(10)? as u8;

    (1..=4).contains(&d).then_some(d)
}

// parses `Name` / `Name<element>` resource descriptors. only template names
// that look like texture or structured-buffer bindings are treated as
// resources, everything else is a struct name.
fn parse_resource(text: &str) -> Option<Type> {
    let (name, element) = match text.find('<') {
        Some(open) => {
            let close = text.rfind('>')?;

            if close != text.len() - 1 {
                return None;
            }

            (&text[..open], Some(&text[open + 1..close]))
        }
        None => (text, None),
    };

    let is_resource_template = name.starts_with("Texture")
        || name.starts_with("RWTexture")
        || name == "StructuredBuffer"
        || name == "RWStructuredBuffer"
        || name == "ByteAddressBuffer";

    if !is_resource_template || name.is_empty() {
        return None;
    }

    Some(Type::Resource(ResourceType {
        template: name.to_string(),
        element: element.map(|e| Box::new(Type::parse(e))),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_and_vector_descriptors() {
        assert_eq!(Type::parse("float"), Type::Scalar(Scalar::Float));
        assert_eq!(Type::parse("float3"), Type::Vector(Scalar::Float, 3));
        assert_eq!(Type::parse("half2"), Type::Vector(Scalar::Half, 2));
        assert_eq!(Type::parse("float4x4"), Type::Matrix(Scalar::Float, 4, 4));
        assert_eq!(Type::parse("int3x1"), Type::Matrix(Scalar::Int, 3, 1));
    }

    #[test]
    fn resource_descriptors() {
        let tex = Type::parse("Texture2D<float4>");

        assert!(tex.is_resource());
        assert_eq!(tex.to_string(), "Texture2D<float4>");

        assert!(Type::parse("SamplerState").is_resource());
        assert!(Type::parse("cbuffer").is_resource());
        assert!(Type::parse("RWTexture2D<float4>").is_resource());
        assert!(Type::parse("TextureCube").is_resource());
        assert!(!Type::parse("LightingData").is_resource());
    }

    #[test]
    fn unparseable_descriptors_round_trip() {
        for text in ["LightingData", "unknown", "float5", "floatx", ""] {
            assert_eq!(Type::parse(text).to_string(), text);
        }
    }

    #[test]
    fn component_counts() {
        assert_eq!(Type::parse("float").components(), Some(1));
        assert_eq!(Type::parse("float3").components(), Some(3));
        assert_eq!(Type::parse("float4x4").components(), Some(16));
        assert_eq!(Type::parse("SamplerState").components(), None);
    }

    #[test]
    fn narrowing_preserves_scalar() {
        let wide = Type::parse("float4");

        assert_eq!(wide.with_components(1), Some(Type::Scalar(Scalar::Float)));
        assert_eq!(wide.with_components(2), Some(Type::Vector(Scalar::Float, 2)));
        assert_eq!(Type::Sampler.with_components(2), None);
    }

    #[test]
    fn numeric_predicate() {
        assert!(Type::parse("float3").is_numeric());
        assert!(Type::parse("uint").is_numeric());
        assert!(!Type::parse("bool").is_numeric());
        assert!(!Type::parse("Texture2D").is_numeric());
    }
}
