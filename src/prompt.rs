//! Line prompts on the terminal.
//!
//! Generic over the reader and writer so the interactive flow can be driven
//! from tests.

use std::io::{BufRead, Write};

use crate::error::{ShelverError, ShelverResult};

/// Print `question`, read one line, and return it trimmed.
///
/// End of input yields an empty string.
pub fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> ShelverResult<String> {
    write!(output, "{question}").map_err(|e| ShelverError::Prompt { source: e })?;
    output.flush().map_err(|e| ShelverError::Prompt { source: e })?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| ShelverError::Prompt { source: e })?;
    Ok(line.trim().to_string())
}

/// Ask a yes/no question. Only `yes` (any case) counts as agreement.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> ShelverResult<bool> {
    let answer = ask(input, output, &format!("{question} (yes/no): "))?;
    Ok(answer.eq_ignore_ascii_case("yes"))
}
