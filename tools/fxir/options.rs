//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use bpaf::{construct, Parser};
use openfxc_ir::cli;
use std::path::PathBuf;

/// The options given by the user.
pub struct Options {
    /// Which pipeline to run.
    pub command: Command,
    /// Whether to log pipeline progress on stderr.
    pub verbose: bool,
}

/// The selected pipeline with its arguments.
pub enum Command {
    /// Lower a semantic model document to IR.
    Lower {
        /// Overrides the model's profile tag.
        profile: Option<String>,
        /// Selects the entry point to lower.
        entry: Option<String>,
        /// The input document, stdin when absent.
        input: Option<PathBuf>,
    },
    /// Optimize an IR module.
    Optimize {
        /// The comma-separated pass list.
        passes: Option<String>,
        /// Replaces the module's profile tag.
        profile: Option<String>,
        /// The input document, stdin when absent.
        input: Option<PathBuf>,
    },
}

/// Parses the command line.
pub fn parse_options() -> Options {
    let lower = {
        let profile = cli::profile();
        let entry = cli::entry();
        let input = cli::input();

        construct!(Command::Lower {
            profile,
            entry,
            input
        })
        .to_options()
        .descr("lower a semantic model document to an IR module")
        .command("lower")
    };

    let optimize = {
        let passes = cli::passes();
        let profile = cli::profile();
        let input = cli::input();

        construct!(Command::Optimize {
            passes,
            profile,
            input
        })
        .to_options()
        .descr("run optimization passes over an IR module")
        .command("optimize")
    };

    let command = construct!([lower, optimize]);
    let verbose = cli::verbose();

    construct!(Options { command, verbose })
        .to_options()
        .descr("the OpenFXC shader IR middle-end")
        .version(cli::VERSION)
        .usage("Usage: fxir <lower|optimize> [options]")
        .run()
}
