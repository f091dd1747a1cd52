//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::options::{Command, Options};
use openfxc_ir::analysis::print_module;
use openfxc_ir::sema::SemanticModel;
use openfxc_ir::{lower_model, optimize_module, read_module, write_module};
use std::error::Error;
use std::fs;
use std::io::Read;
use std::path::PathBuf;

/// Drives one pipeline run given the parsed options.
///
/// The module on stdout always contains whatever IR could be produced
/// plus its full diagnostic list; errors returned here are only the
/// fatal document boundary (unreadable input, malformed JSON), which
/// the caller maps to exit code 1.
pub fn run(options: &Options) -> Result<(), Box<dyn Error>> {
    match &options.command {
        Command::Lower {
            profile,
            entry,
            input,
        } => {
            let source = read_input(input.as_ref())?;
            let model = SemanticModel::from_json(&source)?;
            let module = lower_model(&model, profile.as_deref(), entry.as_deref());

            if options.verbose {
                print_module(&module);
            }

            println!("{}", write_module(&module));
        }
        Command::Optimize {
            passes,
            profile,
            input,
        } => {
            let source = read_input(input.as_ref())?;
            let module = read_module(&source)?;
            let optimized = optimize_module(&module, passes.as_deref(), profile.as_deref());

            if options.verbose {
                print_module(&optimized);
            }

            println!("{}", write_module(&optimized));
        }
    }

    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String, Box<dyn Error>> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();

            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}
