//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Pass names, the pass trait, and the pipeline that runs them.

mod manager;

pub use manager::*;

use crate::ir::Module;

/// A transformation over an entire module.
///
/// Passes are functional: they consume a module by reference and build
/// a new one, the caller's module is never mutated. Calling the same
/// pass on its own output must produce equivalent IR (idempotence),
/// which the pipeline relies on and the tests assert.
pub trait ModulePass {
    /// The pass's registered name, as spelled in a pass list.
    fn name(&self) -> &'static str;

    /// Performs the transformation.
    fn run(&self, module: &Module) -> Module;
}
