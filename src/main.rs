// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli: cnr_promote::Cli = argh::from_env();
    match cnr_promote::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cnr_promote::write::error(&e).is_err() {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}
