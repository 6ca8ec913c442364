//! Extraction of (object, source) pairs from `ninja -t commands` output.
//!
//! The parser is positional and only understands compile lines shaped like
//! the ones clang-cl receives from GN builds:
//!
//! ```text
//! ... clang-cl.exe <flags...> /c ../../foo/bar.cc /Foobj/foo/bar.obj /Fd"..."
//! ```
//!
//! that is, the source is the third-to-last token and the object is the
//! second-to-last token behind a three character `/Fo` flag. Any change to the
//! argument ordering must be handled in [`parse_compile_command`].

use std::path::MAIN_SEPARATOR;

/// Default compiler front-end name looked for in command lines.
pub const DEFAULT_COMPILER: &str = "clang-cl.exe";

const OBJECT_FLAG_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCommand {
    pub object: String,
    pub source: String,
}

/// Parse one compile command line. Returns `None` when the line does not
/// mention `compiler` or has too few tokens to carry a source and an object.
pub fn parse_compile_command(line: &str, compiler: &str) -> Option<CompileCommand> {
    if !line.contains(compiler) {
        return None;
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [.., source, object, _] = tokens.as_slice() else {
        log::debug!("Compile line has too few tokens: {line:?}");
        return None;
    };

    Some(CompileCommand {
        object: object.get(OBJECT_FLAG_LEN..).unwrap_or_default().to_string(),
        source: source.replace('/', &MAIN_SEPARATOR.to_string()),
    })
}

/// Every compile command in a command listing, in listing order.
pub fn scan_commands<'a>(
    lines: impl IntoIterator<Item = &'a str>,
    compiler: &str,
) -> Vec<CompileCommand> {
    lines
        .into_iter()
        .filter_map(|line| parse_compile_command(line, compiler))
        .collect()
}
