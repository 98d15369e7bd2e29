use ansi_term::Color;
use std::io;

/// Errors surfaced to the user implement this instead of plain `Display` so
/// that rendering can use color and wrapping, and so the driver binary can
/// pick an exit status without matching on concrete error types.
pub trait Reportable {
    fn report(&self, dest: &mut impl io::Write) -> io::Result<()>;

    fn exit_status(&self) -> i32 {
        1
    }
}

const WRAP_WIDTH: usize = 80;

pub fn report_error(dest: &mut impl io::Write, summary: &str, detail: &str) -> io::Result<()> {
    writeln!(
        dest,
        "{} {}",
        Color::Red.bold().paint("error:"),
        Color::White.bold().paint(summary)
    )?;
    for line in textwrap::wrap(detail, WRAP_WIDTH) {
        writeln!(dest, "  {}", line)?;
    }
    Ok(())
}

/// Renders one verification failure with its source coordinates. Positions
/// here are opaque tags assigned by the front end; mapping them back to
/// source text happens upstream.
pub fn report_failure_at(
    dest: &mut impl io::Write,
    method: &str,
    line: i32,
    column: i32,
    message: &str,
) -> io::Result<()> {
    writeln!(
        dest,
        "{} {} {}",
        Color::Red.bold().paint("failure:"),
        Color::Cyan.paint(format!("[{}] {}:{}", method, line, column)),
        message
    )
}
