// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.
//! Progress and error messages on stderr.
use std::fmt::Display;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

const LABEL_WIDTH: usize = 12;

fn msg(label: &str, message: impl Display, color: &ColorSpec) -> io::Result<()> {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    stderr.set_color(color)?;
    write!(&mut stderr, "{:>width$} ", label, width = LABEL_WIDTH)?;
    stderr.reset()?;
    writeln!(&mut stderr, "{}", message)?;
    Ok(())
}

/// Write a progress message to stderr
///
/// # Errors
///
/// Will return `Err` if a problem is encountered writing to stderr
pub fn ok(label: &str, message: impl Display) -> io::Result<()> {
    msg(label, message, ColorSpec::new().set_fg(Some(Color::Green)))
}

/// Write a message about a command that was not run
pub fn skipped(label: &str, message: impl Display) -> io::Result<()> {
    msg(label, message, ColorSpec::new().set_fg(Some(Color::Yellow)))
}

/// Write a fatal error, including its causes, to stderr
pub fn error(err: &anyhow::Error) -> io::Result<()> {
    let mut red = ColorSpec::new();
    red.set_fg(Some(Color::Red)).set_bold(true);
    msg("Error", err, &red)?;
    for cause in err.chain().skip(1) {
        msg("caused by", cause, &red)?;
    }
    Ok(())
}
