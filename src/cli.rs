//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Contains utility code specifically for the CLI tool located in
//! the `tools/` subdirectory.
//!
//! Both subcommands share most of their command-line arguments and
//! should look/feel uniform, so the individual option parsers are
//! pulled into this module and composed in the tool's driver.

use bpaf::Parser;
use std::path::PathBuf;

/// The crate version, reported by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The input document path. Standard input is read when absent.
pub fn input() -> impl Parser<Option<PathBuf>> {
    bpaf::long("input")
        .short('i')
        .help("the input document; stdin is read when omitted")
        .argument::<PathBuf>("FILE")
        .optional()
}

/// A profile tag override, e.g. `ps_2_0`.
pub fn profile() -> impl Parser<Option<String>> {
    bpaf::long("profile")
        .help("override the module's profile tag")
        .argument::<String>("PROFILE")
        .optional()
}

/// An entry point override for the lowering pipeline.
pub fn entry() -> impl Parser<Option<String>> {
    bpaf::long("entry")
        .help("the entry point to lower, matched case-insensitively")
        .argument::<String>("NAME")
        .optional()
}

/// The comma-separated pass list for the optimize pipeline.
pub fn passes() -> impl Parser<Option<String>> {
    bpaf::long("passes")
        .short('p')
        .help("comma-separated passes to run, e.g. 'constfold,dce'")
        .argument::<String>("CSV")
        .optional()
}

/// Checks for the presence of `-v` or `--verbose`.
pub fn verbose() -> impl Parser<bool> {
    bpaf::long("verbose")
        .short('v')
        .help("enable verbose logging on stderr")
        .flag(true, false)
}
