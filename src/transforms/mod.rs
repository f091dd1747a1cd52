//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! The optimization passes and the invariant validator.
//!
//! Every pass is a functional module-to-module transformation; the
//! validator is a pure function from a module to diagnostics. Shared
//! predicates and constant evaluation live in [`common`].

pub mod common;

mod algebraic;
mod component_dce;
mod constfold;
mod copyprop;
mod cse;
mod dce;
mod verify;

pub use algebraic::*;
pub use component_dce::*;
pub use constfold::*;
pub use copyprop::*;
pub use cse::*;
pub use dce::*;
pub use verify::*;
