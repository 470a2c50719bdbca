use std::fmt::Write;
use std::{ops::Range, path::Path};

pub mod compiler;
pub mod globals;
pub mod keycodes;

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub span: Option<Range<usize>>,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{}\n    at: ({:?})", &self.message, span),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::unspanned(err.to_string())
    }
}

impl From<&str> for ConfigError {
    fn from(err: &str) -> Self {
        Self::unspanned(err)
    }
}

impl ConfigError {
    pub fn new(message: String, span: Range<usize>) -> Self {
        Self {
            message,
            span: Some(span),
        }
    }

    fn unspanned(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }

    /// The span counted in chars rather than bytes.
    fn char_span(&self, source: &str) -> Option<Range<usize>> {
        let span = self.span.clone()?;
        let chars_before = |byte: usize| source.char_indices().take_while(|(i, _)| *i < byte).count();
        Some(chars_before(span.start)..chars_before(span.end))
    }

    /// Format the error with its file position and the source line it starts on.
    pub fn long_format(&self, source_file: &Path, source: &str) -> String {
        let (line, col, (sol, eol)) = self.line_col_slice(source);
        let width = (line + 10).to_string().len();
        let mut out = format!(
            "error: {} \n   --> {}:{}:{}\n",
            self.message,
            source_file.display(),
            line,
            col
        );
        for (i, text) in source[sol..eol].split('\n').enumerate() {
            let _ = writeln!(out, " {:>width$} | {}", line + i, text);
        }
        out
    }

    /// The line and column (both 1-based) where the error starts and the byte range of that line.
    /// All zero when the error has no span.
    pub fn line_col_slice(&self, source: &str) -> (usize, usize, (usize, usize)) {
        let Some(span) = &self.span else {
            return (0, 0, (0, 0));
        };
        let start = span.start.min(source.len());
        let before = &source[..start];
        let sol = before.rfind('\n').map_or(0, |i| i + 1);
        let eol = source[start..].find('\n').map_or(source.len(), |i| start + i);
        let line = before.matches('\n').count() + 1;
        let col = source[sol..start].chars().count() + 1;
        (line, col, (sol, eol))
    }
}

/// Compile `src`, printing a labelled report to stderr when it fails.
pub fn pretty_compile<'s>(
    file: &Path,
    src: &'s str,
) -> Result<compiler::KeyboardConfig<'s>, ConfigError> {
    compiler::compile(src).inspect_err(|err| report(file, src, err))
}

fn report(file: &Path, src: &str, err: &ConfigError) {
    use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};

    let Some(span) = err.char_span(src) else {
        log::error!("{}", err.message);
        return;
    };
    let filename = file.to_str().unwrap_or("<unknown>");
    let color = ColorGenerator::new().next();
    let label = Label::new((filename, span.clone()))
        .with_message(&err.message)
        .with_color(color);
    let printed = Report::build(ReportKind::Error, (filename, span))
        .with_message("Invalid keymap")
        .with_label(label)
        .finish()
        .eprint((filename, Source::from(src)));
    if let Err(e) = printed {
        log::error!("unable to print report: {e}");
    }
}

pub fn text_to_binary(source: &str) -> Result<Vec<u16>, ConfigError> {
    let file = Path::new("<unknown>");
    let config = pretty_compile(file, source)?;
    Ok(config.serialize())
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod test;
