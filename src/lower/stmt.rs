//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Instruction, Opcode, Type, ValueId};
use crate::lower::func::FuncLowerer;
use crate::sema::SemNode;

impl<'a, 'm> FuncLowerer<'a, 'm> {
    /// Lowers a statement list in order. Statements past a terminator
    /// are ignored.
    pub(super) fn lower_statements(&mut self, nodes: &[&SemNode]) {
        for node in nodes {
            if self.is_terminated() {
                break;
            }

            self.lower_stmt(node);
        }
    }

    pub(super) fn lower_stmt(&mut self, node: &SemNode) {
        match node.kind.as_str() {
            "ReturnStatement" => self.lower_return(node),
            "IfStatement" => self.lower_if(node),
            "WhileStatement" => self.lower_while(node),
            "DoWhileStatement" | "DoStatement" => self.lower_do_while(node),
            "ForStatement" => self.lower_for(node),
            "ExpressionStatement" => {
                if let Some(expr) = self.child(node, "expression", 0) {
                    let _ = self.lower_expr(expr);
                }
            }
            "CompoundStatement" | "Block" | "BlockStatement" => {
                let children = self.child_nodes(node);

                self.lower_statements(&children);
            }
            "VariableDeclarationStatement" | "DeclarationStatement" | "LocalDeclaration" => {
                self.lower_declaration(node);
            }
            kind => self.error(format!("unsupported statement kind `{kind}`")),
        }
    }

    /// Resolves every child node, whatever its role.
    pub(super) fn child_nodes(&self, node: &SemNode) -> Vec<&'m SemNode> {
        node.children
            .iter()
            .filter_map(|c| self.index.node(c.node_id))
            .collect()
    }

    fn lower_return(&mut self, node: &SemNode) {
        let operand = match self.child(node, "expression", 0) {
            Some(expr) => Some(self.lower_expr_or_undef(expr)),
            None => self.implicit_return_value(),
        };

        self.terminate(Instruction::ret(operand));
    }

    // a bare `return` in a non-void function still yields a value: an
    // undef of the declared return type
    fn implicit_return_value(&mut self) -> Option<ValueId> {
        let ty = self.return_type.clone();

        if ty == Type::Named("void".to_string()) {
            return None;
        }

        Some(self.undef(ty))
    }

    fn lower_if(&mut self, node: &SemNode) {
        let condition = match self.child(node, "condition", 0) {
            Some(cond) => self.lower_expr_or_undef(cond),
            None => {
                self.error("if statement has no condition".to_string());
                self.undef(Type::parse("bool"))
            }
        };

        let then_node = self.child(node, "then", 1);
        let else_node = self.child_by_role(node, "else");

        let then_label = self.fresh_label("then");
        let else_label = else_node.as_ref().map(|_| self.fresh_label("else"));
        let merge_label = self.fresh_label("merge");

        // without an else clause the false edge falls straight through
        // to the merge block
        let false_target = else_label.clone().unwrap_or_else(|| merge_label.clone());

        self.terminate(Instruction::branch_cond(
            condition,
            then_label.clone(),
            false_target,
        ));

        self.start_block(then_label);

        if let Some(then_node) = then_node {
            self.lower_stmt(then_node);
        }

        if !self.is_terminated() {
            self.branch_to(&merge_label);
        }

        if let (Some(label), Some(else_node)) = (else_label, else_node) {
            self.start_block(label);
            self.lower_stmt(else_node);

            if !self.is_terminated() {
                self.branch_to(&merge_label);
            }
        }

        self.start_block(merge_label);
    }

    fn lower_while(&mut self, node: &SemNode) {
        let cond_label = self.fresh_label("while.cond");
        let body_label = self.fresh_label("while.body");
        let exit_label = self.fresh_label("while.exit");

        self.branch_to(&cond_label);
        self.start_block(cond_label.clone());

        let condition = match self.child(node, "condition", 0) {
            Some(cond) => self.lower_expr_or_undef(cond),
            None => {
                self.error("while statement has no condition".to_string());
                self.undef(Type::parse("bool"))
            }
        };

        self.terminate(Instruction::branch_cond(
            condition,
            body_label.clone(),
            exit_label.clone(),
        ));
        self.start_block(body_label);

        if let Some(body) = self.child(node, "body", 1) {
            self.lower_stmt(body);
        }

        if !self.is_terminated() {
            self.branch_to(&cond_label);
        }

        self.start_block(exit_label);
    }

    fn lower_do_while(&mut self, node: &SemNode) {
        let body_label = self.fresh_label("do.body");
        let cond_label = self.fresh_label("do.cond");
        let exit_label = self.fresh_label("do.exit");

        self.branch_to(&body_label);
        self.start_block(body_label.clone());

        if let Some(body) = self.child(node, "body", 0) {
            self.lower_stmt(body);
        }

        if !self.is_terminated() {
            self.branch_to(&cond_label);
        }

        self.start_block(cond_label);

        let condition = match self.child(node, "condition", 1) {
            Some(cond) => self.lower_expr_or_undef(cond),
            None => {
                self.error("do-while statement has no condition".to_string());
                self.undef(Type::parse("bool"))
            }
        };

        self.terminate(Instruction::branch_cond(
            condition,
            body_label,
            exit_label.clone(),
        ));
        self.start_block(exit_label);
    }

    fn lower_for(&mut self, node: &SemNode) {
        if let Some(init) = self.child_by_role(node, "initializer") {
            self.lower_stmt_or_expr(init);
        }

        let cond_label = self.fresh_label("for.cond");
        let body_label = self.fresh_label("for.body");
        let incr_label = self.fresh_label("for.incr");
        let exit_label = self.fresh_label("for.exit");

        self.branch_to(&cond_label);
        self.start_block(cond_label.clone());

        // `for (;;)` behaves as if the condition were the literal `true`
        let condition = match self.child_by_role(node, "condition") {
            Some(cond) => self.lower_expr_or_undef(cond),
            None => self.constant(Type::parse("bool"), "true"),
        };

        self.terminate(Instruction::branch_cond(
            condition,
            body_label.clone(),
            exit_label.clone(),
        ));

        self.start_block(body_label);

        if let Some(body) = self.child_by_role(node, "body") {
            self.lower_stmt(body);
        }

        if !self.is_terminated() {
            self.branch_to(&incr_label);
        }

        self.start_block(incr_label);

        if let Some(incr) = self.child_by_role(node, "increment") {
            self.lower_stmt_or_expr(incr);
        }

        self.branch_to(&cond_label);
        self.start_block(exit_label);
    }

    // for-statement slots hold either a declaration/expression
    // statement or a bare expression, depending on the front-end
    fn lower_stmt_or_expr(&mut self, node: &SemNode) {
        if node.kind.ends_with("Statement") {
            self.lower_stmt(node);
        } else {
            let _ = self.lower_expr(node);
        }
    }

    fn lower_declaration(&mut self, node: &SemNode) {
        let Some(symbol) = node.referenced_symbol_id.and_then(|id| self.index.symbol(id)) else {
            self.error("declaration has no backing symbol".to_string());
            return;
        };

        let target = self.value_for_symbol(symbol);
        let ty = self
            .module
            .value_type(target)
            .cloned()
            .unwrap_or_else(Type::unknown);

        if let Some(init) = self.child_by_role(node, "initializer") {
            let init = self.lower_expr_or_undef(init);

            self.emit(
                Instruction::new(Opcode::Assign)
                    .with_operands([init])
                    .with_result(target, ty),
            );
        }
    }
}
