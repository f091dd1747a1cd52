//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Scalar, Type};
use smallvec::SmallVec;
use std::fmt::Write;

/// A constant parsed out of a value's literal text into typed elements.
///
/// Constants travel on the wire as text (`5`, `float3(1,2,3)`, `true`),
/// the folding machinery parses them eagerly into this form once and
/// works on the element array. `true`/`false` parse as 1/0, and a single
/// element splats across the expected count (`float3(1)` ≡ `(1,1,1)`).
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantData {
    /// The scalar base of the constant's declared type.
    pub scalar: Scalar,
    /// One entry per component, row-major for matrices.
    pub elems: SmallVec<[f64; 4]>,
}

impl ConstantData {
    /// Parses literal text against a declared type. Returns `None` when
    /// the type is not scalar-shaped or the text doesn't form a constant
    /// of that shape.
    pub fn parse(text: &str, ty: &Type) -> Option<ConstantData> {
        let scalar = ty.scalar()?;
        let expected = ty.components()? as usize;
        let text = text.trim();

        let raw: SmallVec<[f64; 4]> = match text.find('(') {
            Some(open) => {
                let close = text.rfind(')')?;

                if close != text.len() - 1 {
                    return None;
                }

                text[open + 1..close]
                    .split(',')
                    .map(parse_element)
                    .collect::<Option<_>>()?
            }
            None => SmallVec::from_elem(parse_element(text)?, 1),
        };

        let elems = if raw.len() == expected {
            raw
        } else if raw.len() == 1 {
            SmallVec::from_elem(raw[0], expected)
        } else {
            return None;
        };

        Some(ConstantData { scalar, elems })
    }

    /// Formats the canonical literal text for a constant of type `ty`:
    /// bare digits for scalars, `float3(5,7,9)` style for vectors and
    /// matrices, no trailing zeroes.
    pub fn format(&self, ty: &Type) -> String {
        if self.elems.len() == 1 {
            return format_element(self.elems[0]);
        }

        let mut out = String::new();

        let _ = write!(out, "{ty}(");

        for (i, elem) in self.elems.iter().enumerate() {
            if i != 0 {
                out.push(',');
            }

            out.push_str(&format_element(*elem));
        }

        out.push(')');
        out
    }

    /// Whether every element is exactly zero.
    pub fn all_zero(&self) -> bool {
        self.elems.iter().all(|e| *e == 0.0)
    }

    /// Whether every element is exactly one.
    pub fn all_one(&self) -> bool {
        self.elems.iter().all(|e| *e == 1.0)
    }

    /// A constant of the given type with every element zero.
    pub fn zero_of(ty: &Type) -> Option<ConstantData> {
        Some(ConstantData {
            scalar: ty.scalar()?,
            elems: SmallVec::from_elem(0.0, ty.components()? as usize),
        })
    }
}

fn parse_element(text: &str) -> Option<f64> {
    let text = text.trim();

    match text {
        "true" => return Some(1.0),
        "false" => return Some(0.0),
        _ => {}
    }

    if let Ok(v) = text.parse::<f64>() {
        return Some(v);
    }

    // literal suffixes from the front-end ("1.0f", "2h") are not part of
    // the value itself
    let trimmed = text.trim_end_matches(['f', 'F', 'h', 'H', 'l', 'L', 'u', 'U']);

    if trimmed.len() != text.len() {
        return trimmed.parse::<f64>().ok();
    }

    None
}

fn format_element(value: f64) -> String {
    // `Display` for f64 is already the shortest round-trip form, which
    // is exactly the canonical spelling (5, 0.5, -3.25)
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_literals() {
        let ty = Type::parse("float");
        let c = ConstantData::parse("5", &ty).unwrap();

        assert_eq!(c.elems.as_slice(), &[5.0]);
        assert_eq!(c.format(&ty), "5");

        let c = ConstantData::parse("2.50", &ty).unwrap();

        assert_eq!(c.format(&ty), "2.5");
    }

    #[test]
    fn boolean_literals() {
        let ty = Type::parse("bool");

        assert_eq!(
            ConstantData::parse("true", &ty).unwrap().elems.as_slice(),
            &[1.0]
        );
        assert_eq!(
            ConstantData::parse("false", &ty).unwrap().elems.as_slice(),
            &[0.0]
        );
    }

    #[test]
    fn vector_literals_and_splat() {
        let ty = Type::parse("float3");
        let c = ConstantData::parse("float3(1, 2, 3)", &ty).unwrap();

        assert_eq!(c.elems.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(c.format(&ty), "float3(1,2,3)");

        let splat = ConstantData::parse("float3(1)", &ty).unwrap();

        assert_eq!(splat.elems.as_slice(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn suffixed_literals() {
        let ty = Type::parse("float");

        assert_eq!(
            ConstantData::parse("1.5f", &ty).unwrap().elems.as_slice(),
            &[1.5]
        );
    }

    #[test]
    fn shape_mismatches_are_rejected() {
        assert!(ConstantData::parse("float3(1,2)", &Type::parse("float3")).is_none());
        assert!(ConstantData::parse("abc", &Type::parse("float")).is_none());
        assert!(ConstantData::parse("5", &Type::parse("Texture2D")).is_none());
    }

    #[test]
    fn matrix_formatting() {
        let ty = Type::parse("float2x2");
        let c = ConstantData::parse("float2x2(1,0,0,1)", &ty).unwrap();

        assert_eq!(c.format(&ty), "float2x2(1,0,0,1)");
    }
}
