//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Helpers shared between the transform passes: recognizing constant
//! operands and evaluating the closed operation set over them.

mod consteval;

pub use consteval::*;

use crate::ir::{ConstantData, Module, ValueId};

/// Extracts the parsed constant behind a value id, when the value is a
/// `Constant` whose literal text forms a constant of its declared type.
pub fn constant_value(module: &Module, id: ValueId) -> Option<ConstantData> {
    let value = module.value(id)?;

    if !value.is_constant() {
        return None;
    }

    ConstantData::parse(value.name.as_deref()?, &value.ty)
}
