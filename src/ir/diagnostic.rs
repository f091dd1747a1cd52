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

/// How serious a diagnostic is.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Which pipeline stage produced a diagnostic.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum DiagStage {
    Lower,
    Optimize,
    Invariant,
}

impl fmt::Display for DiagStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagStage::Lower => "lower",
            DiagStage::Optimize => "optimize",
            DiagStage::Invariant => "invariant",
        };

        write!(f, "{name}")
    }
}

/// A single diagnostic.
///
/// Errors here are data, not control flow: the pipelines record problems
/// and keep producing the best module they can, callers decide what an
/// `Error` severity means for them.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Human-readable description of the condition.
    pub message: String,
    /// How serious the condition is.
    pub severity: Severity,
    /// The stage that noticed it.
    pub stage: DiagStage,
}

impl Diagnostic {
    /// An `Error`-severity diagnostic.
    pub fn error(stage: DiagStage, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            stage,
        }
    }

    /// A `Warning`-severity diagnostic.
    pub fn warning(stage: DiagStage, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            message: message.into(),
            severity: Severity::Warning,
            stage,
        }
    }

    /// An `Info`-severity diagnostic.
    pub fn info(stage: DiagStage, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            message: message.into(),
            severity: Severity::Info,
            stage,
        }
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "{severity}[{}]: {}", self.stage, self.message)
    }
}
