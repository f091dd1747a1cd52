//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{InstTag, Instruction, Opcode, Swizzle, Type, ValueId, ValueKind};
use crate::lower::func::FuncLowerer;
use crate::sema::{SemNode, SemSymbol};
use smallvec::SmallVec;

impl<'a, 'm> FuncLowerer<'a, 'm> {
    /// Lowers an expression node to the value holding its result.
    ///
    /// A failed lowering records its own Error and returns `None`; the
    /// caller either propagates the failure or substitutes an `Undef`
    /// so the surrounding construct can still be built.
    pub(super) fn lower_expr(&mut self, node: &SemNode) -> Option<ValueId> {
        match node.kind.as_str() {
            "Identifier" | "IdentifierExpression" => self.lower_identifier(node),
            "MemberAccessExpression" | "MemberAccess" => self.lower_member_access(node),
            "LiteralExpression" | "Literal" => self.lower_literal(node),
            "UnaryExpression" => self.lower_unary(node),
            "BinaryExpression" => self.lower_binary(node),
            "CallExpression" | "InvocationExpression" => self.lower_call(node),
            "CastExpression" => self.lower_cast(node),
            "IndexExpression" | "ElementAccessExpression" => self.lower_index(node),
            kind => {
                self.error(format!("unsupported expression kind `{kind}`"));
                None
            }
        }
    }

    /// Lowers an expression, substituting an `Undef` of the node's type
    /// when the expression itself failed.
    pub(super) fn lower_expr_or_undef(&mut self, node: &SemNode) -> ValueId {
        match self.lower_expr(node) {
            Some(value) => value,
            None => {
                let ty = self.node_type(node);

                self.undef(ty)
            }
        }
    }

    fn lower_identifier(&mut self, node: &SemNode) -> Option<ValueId> {
        if let Some(symbol) = node.referenced_symbol_id.and_then(|id| self.index.symbol(id)) {
            return Some(self.lower_symbol_read(node, symbol, None));
        }

        // no backing symbol: the reference can still be recovered when
        // exactly one field-like symbol has the expression's type
        let wanted = self.index.node_type(node.id)?;
        let mut matches = self.index.symbols().filter(|s| {
            matches!(
                ValueKind::parse(&s.kind),
                ValueKind::StructMember | ValueKind::CBufferMember
            ) && s.ty.as_deref() == Some(wanted)
        });

        match (matches.next(), matches.next()) {
            (Some(symbol), None) => Some(self.lower_symbol_read(node, symbol, None)),
            _ => {
                let name = node.text.as_deref().unwrap_or("<unnamed>");

                self.error(format!("identifier `{name}` has no backing symbol"));
                None
            }
        }
    }

    fn lower_member_access(&mut self, node: &SemNode) -> Option<ValueId> {
        if let Some(symbol) = node.referenced_symbol_id.and_then(|id| self.index.symbol(id)) {
            let swizzle = node
                .swizzle
                .as_deref()
                .and_then(Swizzle::parse)
                .map(InstTag::Swizzle);

            return Some(self.lower_symbol_read(node, symbol, swizzle));
        }

        // a pure swizzle over some source expression
        if let Some(text) = node.swizzle.as_deref() {
            let source = self.child(node, "target", 0).or_else(|| {
                self.child_by_role(node, "expression")
            })?;
            let source = self.lower_expr(source)?;

            let Some(swizzle) = Swizzle::parse(text) else {
                self.error(format!("malformed swizzle `{text}`"));
                return None;
            };

            let ty = self.node_type(node);
            let result = self.fresh_temp(ty.clone());

            self.emit(
                Instruction::new(Opcode::Swizzle)
                    .with_operands([source])
                    .with_result(result, ty)
                    .with_tag(InstTag::Swizzle(swizzle)),
            );

            return Some(result);
        }

        self.error("member access has no referenced symbol".to_string());
        None
    }

    // reads through globals and members go through `Load`; everything
    // else is the symbol's value itself
    fn lower_symbol_read(
        &mut self,
        node: &SemNode,
        symbol: &SemSymbol,
        tag: Option<InstTag>,
    ) -> ValueId {
        let value = self.value_for_symbol(symbol);

        if !ValueKind::parse(&symbol.kind).is_loadable() {
            return value;
        }

        let ty = self.node_type(node);
        let result = self.fresh_temp(ty.clone());
        let mut load = Instruction::new(Opcode::Load)
            .with_operands([value])
            .with_result(result, ty);

        if let Some(tag) = tag {
            load = load.with_tag(tag);
        }

        self.emit(load);
        result
    }

    fn lower_literal(&mut self, node: &SemNode) -> Option<ValueId> {
        let Some(text) = node.text.as_deref() else {
            self.error("literal expression carries no text".to_string());
            return None;
        };

        let ty = self.node_type(node);

        Some(self.constant(ty, text))
    }

    fn lower_unary(&mut self, node: &SemNode) -> Option<ValueId> {
        let operand = self.child(node, "operand", 0)?;
        let operand = self.lower_expr(operand)?;

        let op = match node.operator.as_deref() {
            Some("-") => Opcode::Negate,
            Some("!") => Opcode::Not,
            Some("~") => Opcode::BitNot,
            Some("+") => return Some(operand),
            other => {
                let text = other.unwrap_or("<none>");

                self.error(format!("unsupported unary operator `{text}`"));
                return None;
            }
        };

        let ty = self.node_type(node);
        let result = self.fresh_temp(ty.clone());

        self.emit(
            Instruction::new(op)
                .with_operands([operand])
                .with_result(result, ty),
        );
        Some(result)
    }

    fn lower_binary(&mut self, node: &SemNode) -> Option<ValueId> {
        let lhs = self.child(node, "left", 0)?;
        let rhs = self.child(node, "right", 1)?;

        if node.operator.as_deref() == Some("=") {
            return self.lower_assignment(node, lhs, rhs);
        }

        let op = match node.operator.as_deref() {
            Some("+") => Opcode::Add,
            Some("-") => Opcode::Sub,
            Some("*") => Opcode::Mul,
            Some("/") => Opcode::Div,
            Some("%") => Opcode::Mod,
            Some("==") => Opcode::Eq,
            Some("!=") => Opcode::Ne,
            Some("<") => Opcode::Lt,
            Some("<=") => Opcode::Le,
            Some(">") => Opcode::Gt,
            Some(">=") => Opcode::Ge,
            Some("&&") => Opcode::LogicalAnd,
            Some("||") => Opcode::LogicalOr,
            other => {
                let text = other.unwrap_or("<none>");

                self.error(format!("unsupported binary operator `{text}`"));
                return None;
            }
        };

        let lhs = self.lower_expr_or_undef(lhs);
        let rhs = self.lower_expr_or_undef(rhs);

        let ty = match op {
            // comparisons and logic produce `bool` even when the
            // semantic table is silent
            _ if op.is_comparison() => Type::parse("bool"),
            Opcode::LogicalAnd | Opcode::LogicalOr => Type::parse("bool"),
            _ => self.node_type(node),
        };
        let result = self.fresh_temp(ty.clone());

        self.emit(
            Instruction::new(op)
                .with_operands([lhs, rhs])
                .with_result(result, ty),
        );
        Some(result)
    }

    // `a = b` takes one of three shapes: a `Store` into an indexed
    // resource, a `Store` into a loadable global, or a plain `Assign`
    fn lower_assignment(
        &mut self,
        node: &SemNode,
        lhs: &SemNode,
        rhs: &SemNode,
    ) -> Option<ValueId> {
        let stored = self.lower_expr_or_undef(rhs);

        if matches!(lhs.kind.as_str(), "IndexExpression" | "ElementAccessExpression") {
            let base_node = self.child(lhs, "target", 0)?;
            let index_node = self.child(lhs, "index", 1)?;
            let base = self.lower_expr(base_node)?;

            if self
                .module
                .value(base)
                .map_or(false, |v| v.kind.is_resource() || v.ty.is_resource())
            {
                let index = self.lower_expr_or_undef(index_node);

                self.emit(Instruction::new(Opcode::Store).with_operands([base, index, stored]));
                return Some(stored);
            }
        }

        if let Some(symbol) = lhs.referenced_symbol_id.and_then(|id| self.index.symbol(id)) {
            let kind = ValueKind::parse(&symbol.kind);

            if kind.is_loadable() || kind.is_resource() {
                let target = self.value_for_symbol(symbol);

                self.emit(Instruction::new(Opcode::Store).with_operands([target, stored]));
                return Some(stored);
            }
        }

        let _ = self.lower_expr(lhs);

        let ty = self.node_type(node);
        let result = self.fresh_temp(ty.clone());

        self.emit(
            Instruction::new(Opcode::Assign)
                .with_operands([stored])
                .with_result(result, ty),
        );
        Some(result)
    }

    fn lower_call(&mut self, node: &SemNode) -> Option<ValueId> {
        let Some(callee) = node.callee_name.as_deref() else {
            self.error("call expression has no callee".to_string());
            return None;
        };

        let arg_nodes: Vec<&SemNode> = {
            let tagged: Vec<&SemNode> = node
                .children
                .iter()
                .filter(|c| c.role.as_deref() == Some("argument"))
                .filter_map(|c| self.index.node(c.node_id))
                .collect();

            if tagged.is_empty() {
                node.children
                    .iter()
                    .filter_map(|c| self.index.node(c.node_id))
                    .collect()
            } else {
                tagged
            }
        };

        let operands: SmallVec<[ValueId; 4]> = arg_nodes
            .into_iter()
            .map(|arg| self.lower_expr_or_undef(arg))
            .collect();

        let is_intrinsic = node
            .callee_kind
            .as_deref()
            .map_or(false, |k| k.eq_ignore_ascii_case("intrinsic"));

        let op = if is_intrinsic {
            match intrinsic_op(callee) {
                Some(op) => op,
                None => {
                    self.error(format!("unsupported intrinsic `{callee}`"));
                    Opcode::Call
                }
            }
        } else {
            Opcode::Call
        };

        // calls to void functions define nothing
        let ty = self.node_type(node);
        let result = if ty == Type::Named("void".to_string()) {
            None
        } else {
            Some(self.fresh_temp(ty.clone()))
        };
        let inst = Instruction {
            op,
            operands,
            result,
            ty: result.map(|_| ty),
            tag: Some(InstTag::Text(callee.to_string())),
        };

        self.emit(inst);
        result
    }

    fn lower_cast(&mut self, node: &SemNode) -> Option<ValueId> {
        let operand = self.child(node, "operand", 0)?;
        let operand = self.lower_expr(operand)?;

        let ty = self.node_type(node);
        let result = self.fresh_temp(ty.clone());

        self.emit(
            Instruction::new(Opcode::Cast)
                .with_operands([operand])
                .with_result(result, ty),
        );
        Some(result)
    }

    fn lower_index(&mut self, node: &SemNode) -> Option<ValueId> {
        let base = self.child(node, "target", 0)?;
        let index = self.child(node, "index", 1)?;

        let base = self.lower_expr(base)?;
        let index = self.lower_expr_or_undef(index);

        let ty = self.node_type(node);
        let result = self.fresh_temp(ty.clone());

        self.emit(
            Instruction::new(Opcode::Index)
                .with_operands([base, index])
                .with_result(result, ty),
        );
        Some(result)
    }
}

/// Maps an intrinsic callee to its abstract operation.
///
/// The match is case-insensitive; any callee starting with `tex` maps to
/// `Sample`, as does the literal `sample`. Unknown intrinsics return
/// `None` and are reported by the caller.
pub(super) fn intrinsic_op(callee: &str) -> Option<Opcode> {
    let lower = callee.to_ascii_lowercase();

    if lower.starts_with("tex") || lower == "sample" {
        return Some(Opcode::Sample);
    }

    let op = match lower.as_str() {
        "mul" => Opcode::Mul,
        "dot" => Opcode::Dot,
        "normalize" => Opcode::Normalize,
        "saturate" => Opcode::Saturate,
        "sin" => Opcode::Sin,
        "cos" => Opcode::Cos,
        "abs" => Opcode::Abs,
        "min" => Opcode::Min,
        "max" => Opcode::Max,
        "clamp" => Opcode::Clamp,
        "lerp" => Opcode::Lerp,
        "pow" => Opcode::Pow,
        "exp" => Opcode::Exp,
        "log" => Opcode::Log,
        "step" => Opcode::Step,
        "smoothstep" => Opcode::SmoothStep,
        "reflect" => Opcode::Reflect,
        "refract" => Opcode::Refract,
        "atan2" => Opcode::Atan2,
        "fma" => Opcode::Fma,
        "ddx" => Opcode::Ddx,
        "ddy" => Opcode::Ddy,
        "length" => Opcode::Length,
        "rsqrt" => Opcode::Rsqrt,
        "rcp" => Opcode::Rcp,
        _ => return None,
    };

    Some(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsic_mapping() {
        assert_eq!(intrinsic_op("dot"), Some(Opcode::Dot));
        assert_eq!(intrinsic_op("SmoothStep"), Some(Opcode::SmoothStep));
        assert_eq!(intrinsic_op("tex2D"), Some(Opcode::Sample));
        assert_eq!(intrinsic_op("TEXCUBE"), Some(Opcode::Sample));
        assert_eq!(intrinsic_op("sample"), Some(Opcode::Sample));
        assert_eq!(intrinsic_op("sincos"), None);
    }
}
