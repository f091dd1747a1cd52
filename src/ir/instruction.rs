//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Type, ValueId};
use smallvec::SmallVec;
use std::fmt;

/// The closed operation grammar.
///
/// One variant per operation the IR defines, plus [`Opcode::Other`] so
/// that a foreign document round-trips instead of failing to read; the
/// validator flags anything it doesn't recognize. The abstract intrinsic
/// operations (`Dot`, `Normalize`, …) deliberately carry no target
/// vocabulary, profile legalization happens downstream.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum Opcode {
    Load,
    Store,
    Sample,
    Index,
    Swizzle,
    Cast,
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
    Negate,
    Not,
    BitNot,
    Unary,
    Dot,
    Normalize,
    Saturate,
    Sin,
    Cos,
    Abs,
    Min,
    Max,
    Clamp,
    Lerp,
    Pow,
    Exp,
    Log,
    Step,
    SmoothStep,
    Reflect,
    Refract,
    Atan2,
    Fma,
    Ddx,
    Ddy,
    Length,
    Rsqrt,
    Rcp,
    Call,
    Return,
    Branch,
    BranchCond,
    Nop,
    /// An operation outside the grammar, preserved verbatim for the
    /// validator to reject.
    Other(String),
}

macro_rules! opcode_names {
    ($(($variant:ident, $name:literal)),+ $(,)?) => {
        impl Opcode {
            /// The wire spelling of the operation.
            pub fn name(&self) -> &str {
                match self {
                    $(Opcode::$variant => $name,)+
                    Opcode::Other(name) => name,
                }
            }

            /// Parses an operation name; anything outside the grammar
            /// becomes [`Opcode::Other`].
            pub fn parse(text: &str) -> Opcode {
                match text {
                    $($name => Opcode::$variant,)+
                    _ => Opcode::Other(text.to_string()),
                }
            }
        }
    };
}

opcode_names! {
    (Load, "Load"),
    (Store, "Store"),
    (Sample, "Sample"),
    (Index, "Index"),
    (Swizzle, "Swizzle"),
    (Cast, "Cast"),
    (Assign, "Assign"),
    (Add, "Add"),
    (Sub, "Sub"),
    (Mul, "Mul"),
    (Div, "Div"),
    (Mod, "Mod"),
    (Eq, "Eq"),
    (Ne, "Ne"),
    (Lt, "Lt"),
    (Le, "Le"),
    (Gt, "Gt"),
    (Ge, "Ge"),
    (LogicalAnd, "LogicalAnd"),
    (LogicalOr, "LogicalOr"),
    (Negate, "Negate"),
    (Not, "Not"),
    (BitNot, "BitNot"),
    (Unary, "Unary"),
    (Dot, "Dot"),
    (Normalize, "Normalize"),
    (Saturate, "Saturate"),
    (Sin, "Sin"),
    (Cos, "Cos"),
    (Abs, "Abs"),
    (Min, "Min"),
    (Max, "Max"),
    (Clamp, "Clamp"),
    (Lerp, "Lerp"),
    (Pow, "Pow"),
    (Exp, "Exp"),
    (Log, "Log"),
    (Step, "Step"),
    (SmoothStep, "SmoothStep"),
    (Reflect, "Reflect"),
    (Refract, "Refract"),
    (Atan2, "Atan2"),
    (Fma, "Fma"),
    (Ddx, "Ddx"),
    (Ddy, "Ddy"),
    (Length, "Length"),
    (Rsqrt, "Rsqrt"),
    (Rcp, "Rcp"),
    (Call, "Call"),
    (Return, "Return"),
    (Branch, "Branch"),
    (BranchCond, "BranchCond"),
    (Nop, "Nop"),
}

impl Opcode {
    /// Whether the operation ends a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Opcode::Return | Opcode::Branch | Opcode::BranchCond)
    }

    /// The closed purity set. Pure operations have no observable effect
    /// beyond producing their result, which is what licenses DCE and CSE
    /// to delete or unify them.
    pub fn is_pure(&self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::Eq
                | Opcode::Ne
                | Opcode::Lt
                | Opcode::Le
                | Opcode::Gt
                | Opcode::Ge
                | Opcode::LogicalAnd
                | Opcode::LogicalOr
                | Opcode::Swizzle
                | Opcode::Cast
                | Opcode::Assign
                | Opcode::Index
        )
    }

    /// Whether this is one of the two-operand arithmetic or comparison
    /// operations covered by the binary type rule.
    pub fn is_binary_arith(&self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod
        )
    }

    /// Whether this is a comparison producing `bool`.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A swizzle mask: an ordered selection of up to four source lanes.
///
/// The lane characters are kept exactly as written (`xy`, `rgba`,
/// `xxxx`), each maps to a lane index 0..4 (`x`/`r`/`u` → 0, `y`/`g`/`v`
/// → 1, `z`/`b` → 2, `w`/`a` → 3).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Swizzle {
    chars: SmallVec<[u8; 4]>,
}

impl Swizzle {
    /// Parses a swizzle mask. Returns `None` when the text is empty,
    /// longer than four lanes, or contains a non-lane character.
    pub fn parse(text: &str) -> Option<Swizzle> {
        if text.is_empty() || text.len() > 4 {
            return None;
        }

        let chars: SmallVec<[u8; 4]> = text.bytes().collect();

        if chars.iter().all(|c| lane_index(*c).is_some()) {
            Some(Swizzle { chars })
        } else {
            None
        }
    }

    /// The number of lanes selected.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Whether the mask selects no lanes. Never true for a parsed mask.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The source lane index selected at position `i`.
    pub fn lane(&self, i: usize) -> u8 {
        lane_index(self.chars[i]).expect("swizzle holds only lane characters")
    }

    /// Iterates over the source lane indices in selection order.
    pub fn lanes(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len()).map(|i| self.lane(i))
    }

    /// Keeps only the positions whose bit is set in `mask`, preserving
    /// order. Used when narrowing a partially-dead swizzle result.
    pub fn retain_positions(&self, mask: u8) -> Swizzle {
        Swizzle {
            chars: self
                .chars
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, c)| *c)
                .collect(),
        }
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.chars {
            write!(f, "{}", *c as char)?;
        }

        Ok(())
    }
}

fn lane_index(c: u8) -> Option<u8> {
    match c {
        b'x' | b'r' | b'u' => Some(0),
        b'y' | b'g' | b'v' => Some(1),
        b'z' | b'b' => Some(2),
        b'w' | b'a' => Some(3),
        _ => None,
    }
}

/// The structured form of an instruction's tag.
///
/// On the wire the tag is a single free-form string; in memory the uses
/// are kept apart: swizzle masks, branch targets, and free text (callee
/// names, load/store metadata). [`InstTag::text`] recovers the wire
/// spelling.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum InstTag {
    /// A lane mask on `Swizzle` or `Load`.
    Swizzle(Swizzle),
    /// The single target of a `Branch`.
    Target(String),
    /// The two targets of a `BranchCond`, `then:<id>;else:<id>` on
    /// the wire.
    CondTargets {
        /// Block taken when the condition holds.
        then_to: String,
        /// Block taken otherwise.
        else_to: String,
    },
    /// Anything else: callee names on calls and intrinsics, load/store
    /// metadata, foreign tags.
    Text(String),
}

impl InstTag {
    /// Interprets wire text as the structured tag for `op`. Text that
    /// doesn't fit the op's expected shape is preserved as
    /// [`InstTag::Text`] for the validator to reject.
    pub fn parse(op: &Opcode, text: &str) -> InstTag {
        match op {
            Opcode::Branch => InstTag::Target(text.to_string()),
            Opcode::BranchCond => match parse_cond_targets(text) {
                Some((then_to, else_to)) => InstTag::CondTargets { then_to, else_to },
                None => InstTag::Text(text.to_string()),
            },
            Opcode::Swizzle | Opcode::Load => match Swizzle::parse(text) {
                Some(swizzle) => InstTag::Swizzle(swizzle),
                None => InstTag::Text(text.to_string()),
            },
            _ => InstTag::Text(text.to_string()),
        }
    }

    /// The wire spelling of the tag.
    pub fn text(&self) -> String {
        match self {
            InstTag::Swizzle(swizzle) => swizzle.to_string(),
            InstTag::Target(block) => block.clone(),
            InstTag::CondTargets { then_to, else_to } => format!("then:{then_to};else:{else_to}"),
            InstTag::Text(text) => text.clone(),
        }
    }

    /// The swizzle mask, when the tag is one.
    pub fn as_swizzle(&self) -> Option<&Swizzle> {
        match self {
            InstTag::Swizzle(swizzle) => Some(swizzle),
            _ => None,
        }
    }
}

fn parse_cond_targets(text: &str) -> Option<(String, String)> {
    let (then_part, else_part) = text.split_once(';')?;
    let then_to = then_part.strip_prefix("then:")?;
    let else_to = else_part.strip_prefix("else:")?;

    if then_to.is_empty() || else_to.is_empty() {
        return None;
    }

    Some((then_to.to_string(), else_to.to_string()))
}

/// A single operation in a basic block.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Instruction {
    /// The operation.
    pub op: Opcode,
    /// Operand value ids, in order.
    pub operands: SmallVec<[ValueId; 4]>,
    /// The value defined by this instruction, if any.
    pub result: Option<ValueId>,
    /// The result type. Present exactly when `result` is, and must
    /// match that value's declared type.
    pub ty: Option<Type>,
    /// Structured tag: swizzle mask, branch targets, or free text.
    pub tag: Option<InstTag>,
}

impl Instruction {
    /// An instruction with no operands, result or tag.
    pub fn new(op: Opcode) -> Instruction {
        Instruction {
            op,
            operands: SmallVec::new(),
            result: None,
            ty: None,
            tag: None,
        }
    }

    /// Adds operands.
    pub fn with_operands(mut self, operands: impl IntoIterator<Item = ValueId>) -> Instruction {
        self.operands.extend(operands);
        self
    }

    /// Sets the result and its type.
    pub fn with_result(mut self, result: ValueId, ty: Type) -> Instruction {
        self.result = Some(result);
        self.ty = Some(ty);
        self
    }

    /// Sets the tag.
    pub fn with_tag(mut self, tag: InstTag) -> Instruction {
        self.tag = Some(tag);
        self
    }

    /// An unconditional branch to `target`.
    pub fn branch(target: impl Into<String>) -> Instruction {
        Instruction::new(Opcode::Branch).with_tag(InstTag::Target(target.into()))
    }

    /// A conditional branch on `cond`.
    pub fn branch_cond(
        cond: ValueId,
        then_to: impl Into<String>,
        else_to: impl Into<String>,
    ) -> Instruction {
        Instruction::new(Opcode::BranchCond)
            .with_operands([cond])
            .with_tag(InstTag::CondTargets {
                then_to: then_to.into(),
                else_to: else_to.into(),
            })
    }

    /// A return, with or without a value.
    pub fn ret(value: Option<ValueId>) -> Instruction {
        Instruction::new(Opcode::Return).with_operands(value)
    }

    /// Whether this instruction ends its block.
    pub fn is_terminator(&self) -> bool {
        self.op.is_terminator()
    }

    /// Whether this instruction is in the closed pure set.
    pub fn is_pure(&self) -> bool {
        self.op.is_pure()
    }

    /// Checks whether the instruction possibly has an observable effect:
    /// any operation whose name contains `Sample`, any `Store`, and any
    /// tag containing `discard`.
    pub fn has_side_effect(&self) -> bool {
        if matches!(self.op, Opcode::Store) || self.op.name().contains("Sample") {
            return true;
        }

        self.tag
            .as_ref()
            .map_or(false, |tag| tag.text().contains("discard"))
    }

    /// The tag's wire spelling, when a tag is present.
    pub fn tag_text(&self) -> Option<String> {
        self.tag.as_ref().map(InstTag::text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_names_round_trip() {
        for name in ["Load", "SmoothStep", "BranchCond", "Nop", "Atan2"] {
            assert_eq!(Opcode::parse(name).name(), name);
        }

        assert_eq!(
            Opcode::parse("DxilSample"),
            Opcode::Other("DxilSample".to_string())
        );
    }

    #[test]
    fn swizzle_lane_aliases() {
        let s = Swizzle::parse("rgba").unwrap();

        assert_eq!(s.lanes().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(s.to_string(), "rgba");

        let s = Swizzle::parse("uv").unwrap();

        assert_eq!(s.lanes().collect::<Vec<_>>(), vec![0, 1]);
        assert!(Swizzle::parse("xq").is_none());
        assert!(Swizzle::parse("").is_none());
        assert!(Swizzle::parse("xxxxx").is_none());
    }

    #[test]
    fn swizzle_retain_positions() {
        let s = Swizzle::parse("xyzw").unwrap();

        assert_eq!(s.retain_positions(0b0101).to_string(), "xz");
        assert_eq!(s.retain_positions(0b0001).to_string(), "x");
    }

    #[test]
    fn cond_target_tags() {
        let tag = InstTag::parse(&Opcode::BranchCond, "then:a;else:b");

        assert_eq!(
            tag,
            InstTag::CondTargets {
                then_to: "a".to_string(),
                else_to: "b".to_string(),
            }
        );
        assert_eq!(tag.text(), "then:a;else:b");

        // a malformed target list stays textual so the validator sees it
        assert_eq!(
            InstTag::parse(&Opcode::BranchCond, "then:a"),
            InstTag::Text("then:a".to_string())
        );
    }

    #[test]
    fn side_effects() {
        assert!(Instruction::new(Opcode::Store).has_side_effect());
        assert!(Instruction::new(Opcode::Sample).has_side_effect());
        assert!(Instruction::new(Opcode::parse("DxilSample")).has_side_effect());
        assert!(Instruction::new(Opcode::Call)
            .with_tag(InstTag::Text("discard".to_string()))
            .has_side_effect());
        assert!(!Instruction::new(Opcode::Add).has_side_effect());
    }

    #[test]
    fn purity_excludes_intrinsics() {
        assert!(Opcode::Add.is_pure());
        assert!(Opcode::Assign.is_pure());
        assert!(Opcode::Index.is_pure());
        assert!(!Opcode::Negate.is_pure());
        assert!(!Opcode::Dot.is_pure());
        assert!(!Opcode::Sample.is_pure());
        assert!(!Opcode::Return.is_pure());
    }
}
