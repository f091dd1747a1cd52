//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{ConstantData, Opcode, Scalar, Swizzle, Type};
use smallvec::SmallVec;

/// Evaluates a pure operation over parsed constant operands.
///
/// Returns `None` whenever the fold must not happen: an operation
/// outside the evaluable subset, shapes that don't line up, or a
/// division/modulo where any divisor element is zero (that fold is
/// skipped rather than diagnosed).
pub fn eval(op: &Opcode, operands: &[ConstantData], result_ty: &Type) -> Option<ConstantData> {
    match op {
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
            let (lhs, rhs) = two(operands)?;

            eval_arith(op, lhs, rhs)
        }
        Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => {
            let (lhs, rhs) = two(operands)?;

            eval_compare(op, lhs, rhs)
        }
        Opcode::LogicalAnd | Opcode::LogicalOr => {
            let (lhs, rhs) = two(operands)?;

            eval_logical(op, lhs, rhs)
        }
        Opcode::Swizzle => None, // needs the lane mask, see `eval_swizzle`
        Opcode::Cast => eval_cast(one(operands)?, result_ty),
        _ => None,
    }
}

/// Evaluates a swizzle over a constant source.
pub fn eval_swizzle(swizzle: &Swizzle, source: &ConstantData) -> Option<ConstantData> {
    let elems: SmallVec<[f64; 4]> = swizzle
        .lanes()
        .map(|lane| source.elems.get(lane as usize).copied())
        .collect::<Option<_>>()?;

    Some(ConstantData {
        scalar: source.scalar,
        elems,
    })
}

fn one(operands: &[ConstantData]) -> Option<&ConstantData> {
    match operands {
        [a] => Some(a),
        _ => None,
    }
}

fn two(operands: &[ConstantData]) -> Option<(&ConstantData, &ConstantData)> {
    match operands {
        [a, b] => Some((a, b)),
        _ => None,
    }
}

// pairs the elements of two constants, splatting a single element
// across the other side's count
fn zip(
    lhs: &ConstantData,
    rhs: &ConstantData,
) -> Option<SmallVec<[(f64, f64); 4]>> {
    let pairs = if lhs.elems.len() == rhs.elems.len() {
        lhs.elems.iter().copied().zip(rhs.elems.iter().copied()).collect()
    } else if lhs.elems.len() == 1 {
        rhs.elems.iter().map(|r| (lhs.elems[0], *r)).collect()
    } else if rhs.elems.len() == 1 {
        lhs.elems.iter().map(|l| (*l, rhs.elems[0])).collect()
    } else {
        return None;
    };

    Some(pairs)
}

fn eval_arith(op: &Opcode, lhs: &ConstantData, rhs: &ConstantData) -> Option<ConstantData> {
    if matches!(op, Opcode::Div | Opcode::Mod) && rhs.elems.iter().any(|e| *e == 0.0) {
        return None;
    }

    let pairs = zip(lhs, rhs)?;
    let scalar = lhs.scalar;
    let elems = pairs
        .into_iter()
        .map(|(a, b)| {
            let v = match op {
                Opcode::Add => a + b,
                Opcode::Sub => a - b,
                Opcode::Mul => a * b,
                Opcode::Div => a / b,
                Opcode::Mod => a % b,
                _ => unreachable!(),
            };

            integral_fixup(scalar, v)
        })
        .collect();

    Some(ConstantData { scalar, elems })
}

fn eval_compare(op: &Opcode, lhs: &ConstantData, rhs: &ConstantData) -> Option<ConstantData> {
    let pairs = zip(lhs, rhs)?;
    let elems = pairs
        .into_iter()
        .map(|(a, b)| {
            let v = match op {
                Opcode::Eq => a == b,
                Opcode::Ne => a != b,
                Opcode::Lt => a < b,
                Opcode::Le => a <= b,
                Opcode::Gt => a > b,
                Opcode::Ge => a >= b,
                _ => unreachable!(),
            };

            v as u8 as f64
        })
        .collect();

    Some(ConstantData {
        scalar: Scalar::Bool,
        elems,
    })
}

fn eval_logical(op: &Opcode, lhs: &ConstantData, rhs: &ConstantData) -> Option<ConstantData> {
    let pairs = zip(lhs, rhs)?;
    let elems = pairs
        .into_iter()
        .map(|(a, b)| {
            let v = match op {
                Opcode::LogicalAnd => a != 0.0 && b != 0.0,
                Opcode::LogicalOr => a != 0.0 || b != 0.0,
                _ => unreachable!(),
            };

            v as u8 as f64
        })
        .collect();

    Some(ConstantData {
        scalar: Scalar::Bool,
        elems,
    })
}

fn eval_cast(source: &ConstantData, target: &Type) -> Option<ConstantData> {
    let scalar = target.scalar()?;
    let expected = target.components()? as usize;

    let widened: SmallVec<[f64; 4]> = if source.elems.len() == expected {
        source.elems.clone()
    } else if source.elems.len() == 1 {
        SmallVec::from_elem(source.elems[0], expected)
    } else {
        return None;
    };

    let elems = widened
        .into_iter()
        .map(|e| match scalar {
            Scalar::Bool => (e != 0.0) as u8 as f64,
            _ => integral_fixup(scalar, e),
        })
        .collect();

    Some(ConstantData { scalar, elems })
}

// integer-typed arithmetic truncates toward zero
fn integral_fixup(scalar: Scalar, value: f64) -> f64 {
    match scalar {
        Scalar::Int | Scalar::Uint => value.trunc(),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(text: &str, ty: &str) -> ConstantData {
        ConstantData::parse(text, &Type::parse(ty)).unwrap()
    }

    #[test]
    fn scalar_addition() {
        let out = eval(
            &Opcode::Add,
            &[constant("2", "float"), constant("3", "float")],
            &Type::parse("float"),
        )
        .unwrap();

        assert_eq!(out.elems.as_slice(), &[5.0]);
    }

    #[test]
    fn vector_arithmetic_with_splat() {
        let out = eval(
            &Opcode::Mul,
            &[constant("float3(1,2,3)", "float3"), constant("2", "float")],
            &Type::parse("float3"),
        )
        .unwrap();

        assert_eq!(out.elems.as_slice(), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn zero_divisors_refuse_to_fold() {
        assert!(eval(
            &Opcode::Div,
            &[constant("float2(4,4)", "float2"), constant("float2(2,0)", "float2")],
            &Type::parse("float2"),
        )
        .is_none());

        assert!(eval(
            &Opcode::Mod,
            &[constant("5", "int"), constant("0", "int")],
            &Type::parse("int"),
        )
        .is_none());
    }

    #[test]
    fn integer_division_truncates() {
        let out = eval(
            &Opcode::Div,
            &[constant("7", "int"), constant("2", "int")],
            &Type::parse("int"),
        )
        .unwrap();

        assert_eq!(out.elems.as_slice(), &[3.0]);
    }

    #[test]
    fn comparisons_produce_booleans() {
        let out = eval(
            &Opcode::Lt,
            &[constant("1", "float"), constant("2", "float")],
            &Type::parse("bool"),
        )
        .unwrap();

        assert_eq!(out.scalar, Scalar::Bool);
        assert_eq!(out.elems.as_slice(), &[1.0]);
    }

    #[test]
    fn swizzle_selection() {
        let src = constant("float4(1,2,3,4)", "float4");
        let out = eval_swizzle(&Swizzle::parse("wy").unwrap(), &src).unwrap();

        assert_eq!(out.elems.as_slice(), &[4.0, 2.0]);
    }

    #[test]
    fn cast_to_bool() {
        let out = eval_cast(&constant("2.5", "float"), &Type::parse("bool")).unwrap();

        assert_eq!(out.elems.as_slice(), &[1.0]);
    }
}
