//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{DiagStage, Diagnostic, Module};
use crate::pass::ModulePass;
use crate::transforms::{
    validate, AlgebraicSimplifyPass, CommonSubexprPass, ComponentDcePass, ConstantFoldPass,
    CopyPropagationPass, DeadCodeEliminationPass,
};
use tracing::debug;

/// The recognized pass names, in their default execution order.
pub const PASS_NAMES: &[&str] = &[
    "constfold",
    "algebraic",
    "copyprop",
    "cse",
    "dce",
    "component-dce",
];

/// Resolves a pass name to its implementation.
pub fn pass_by_name(name: &str) -> Option<Box<dyn ModulePass>> {
    match name {
        "constfold" => Some(Box::new(ConstantFoldPass)),
        "algebraic" => Some(Box::new(AlgebraicSimplifyPass)),
        "copyprop" => Some(Box::new(CopyPropagationPass)),
        "cse" => Some(Box::new(CommonSubexprPass)),
        "dce" => Some(Box::new(DeadCodeEliminationPass)),
        "component-dce" => Some(Box::new(ComponentDcePass)),
        _ => None,
    }
}

/// Parses a comma-separated pass list into pass instances.
///
/// Unknown names produce an `optimize`-stage Error naming the valid
/// passes and are skipped; empty segments are ignored, so `""` is the
/// empty pipeline. `None` selects the default pipeline.
pub fn parse_pass_list(
    text: Option<&str>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Box<dyn ModulePass>> {
    let text = match text {
        Some(text) => text,
        None => return PASS_NAMES.iter().map(|n| pass_by_name(n).unwrap()).collect(),
    };

    let mut passes = Vec::new();

    for token in text.split(',') {
        let token = token.trim().to_ascii_lowercase();

        if token.is_empty() {
            continue;
        }

        match pass_by_name(&token) {
            Some(pass) => passes.push(pass),
            None => diagnostics.push(Diagnostic::error(
                DiagStage::Optimize,
                format!(
                    "unknown pass `{token}`, valid passes are: {}",
                    PASS_NAMES.join(", ")
                ),
            )),
        }
    }

    passes
}

/// Runs the optimization pipeline over a module.
///
/// The input is never mutated: the returned module carries the
/// transformed IR plus the input's diagnostics, one Info per executed
/// pass, any unknown-pass Errors, and the invariant validator's
/// findings. A profile override replaces the module's profile before
/// any pass runs.
pub fn optimize(module: &Module, passes: Option<&str>, profile: Option<&str>) -> Module {
    let mut diagnostics = Vec::new();
    let pipeline = parse_pass_list(passes, &mut diagnostics);

    let mut current = module.clone();

    if let Some(profile) = profile {
        current.profile = profile.to_string();
    }

    current.diagnostics.append(&mut diagnostics);

    for pass in &pipeline {
        debug!(pass = pass.name(), "running optimization pass");

        current = pass.run(&current);
        current.push_diagnostic(Diagnostic::info(
            DiagStage::Optimize,
            format!("pass `{}` executed", pass.name()),
        ));
    }

    let findings = validate(&current);

    current.diagnostics.extend(findings);
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        Block, Function, Instruction, Severity, Type, Value, ValueId, ValueKind,
    };

    fn minimal_module() -> Module {
        let mut m = Module::new("ps_2_0");

        m.push_value(Value::new(
            ValueId(1),
            ValueKind::Parameter,
            Type::parse("float4"),
        ));

        let mut func = Function::new("main", Type::parse("float4"));

        func.parameters.push(ValueId(1));
        func.blocks.push(Block::with_instructions(
            "entry",
            [Instruction::ret(Some(ValueId(1)))],
        ));
        m.functions.push(func);
        m
    }

    #[test]
    fn default_pipeline_reports_every_pass() {
        let out = optimize(&minimal_module(), None, None);
        let infos: Vec<_> = out
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Info)
            .collect();

        assert_eq!(infos.len(), PASS_NAMES.len());
        assert!(infos[0].message.contains("constfold"));
    }

    #[test]
    fn minimal_module_survives_the_default_pipeline() {
        let input = minimal_module();
        let out = optimize(&input, None, None);

        assert!(!out.has_errors());
        assert_eq!(out.functions, input.functions);
        assert_eq!(out.values, input.values);
    }

    #[test]
    fn unknown_passes_are_reported_and_skipped() {
        let out = optimize(&minimal_module(), Some("dce,mystery"), None);

        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.is_error() && d.message.contains("unknown pass `mystery`")));
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Info && d.message.contains("dce")));
    }

    #[test]
    fn empty_pass_list_only_validates() {
        let out = optimize(&minimal_module(), Some(""), None);

        assert!(!out.has_errors());
        assert!(out
            .diagnostics
            .iter()
            .all(|d| d.severity != Severity::Info));
    }

    #[test]
    fn profile_overrides_apply_before_passes() {
        let out = optimize(&minimal_module(), Some(""), Some("ps_3_0"));

        assert_eq!(out.profile, "ps_3_0");
    }

    #[test]
    fn input_module_is_never_mutated() {
        let input = minimal_module();
        let snapshot = input.clone();
        let _ = optimize(&input, None, Some("vs_1_1"));

        assert_eq!(input, snapshot);
    }
}
