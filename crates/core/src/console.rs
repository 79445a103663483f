// Narrative console output shared by the three tools

use std::io::{self, Write};

/// Width of the `=` and `-` rules.
pub const RULE_WIDTH: usize = 60;

pub fn rule(out: &mut dyn Write, ch: char) -> io::Result<()> {
    writeln!(out, "{}", ch.to_string().repeat(RULE_WIDTH))
}

/// Title between two `=` rules.
pub fn banner(out: &mut dyn Write, title: &str) -> io::Result<()> {
    rule(out, '=')?;
    writeln!(out, "{title}")?;
    rule(out, '=')
}

/// Blank line, then a banner.
pub fn section(out: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(out)?;
    banner(out, title)
}

/// Blank line, title, `-` rule.
pub fn subsection(out: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(out, "\n{title}")?;
    rule(out, '-')
}

/// Numbered list, one entry per line.
pub fn steps(out: &mut dyn Write, steps: &[&str]) -> io::Result<()> {
    for (i, step) in steps.iter().enumerate() {
        writeln!(out, "{}. {step}", i + 1)?;
    }
    Ok(())
}
