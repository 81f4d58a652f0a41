//! Stateful writer bound to one output destination.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fs_utils;
use crate::writer::region::{find_region, DefaultRegionMarkerFormatter, RegionMarkerFormatter};
use crate::writer::{Encoding, TextWriter};

/// Native line terminator of the host operating system.
#[cfg(windows)]
pub const NATIVE_END_OF_LINE: &str = "\r\n";
/// Native line terminator of the host operating system.
#[cfg(not(windows))]
pub const NATIVE_END_OF_LINE: &str = "\n";

/// Default indentation unit.
pub const DEFAULT_INDENT_UNIT: &str = "\t";

/// Concrete [`TextWriter`] over any `io::Write` destination.
///
/// A writer lives exactly as long as one output stream. It tracks the
/// indent level, total and significant line counts, and caches files read
/// for region lookups so repeated lookups in one session see the same text.
///
/// Write failures do not interrupt a template. The first I/O error is kept
/// and returned by [`StreamWriter::finish`]; later writes are dropped.
pub struct StreamWriter<W: Write = BufWriter<File>> {
    out: W,
    base_dir: PathBuf,
    formatter: Arc<dyn RegionMarkerFormatter>,
    indent_level: usize,
    indent_unit: String,
    end_of_line: String,
    indent_suppressed: bool,
    end_of_line_suppressed: bool,
    sloc_frozen: bool,
    line_count: usize,
    significant_line_count: usize,
    file_cache: HashMap<PathBuf, Option<String>>,
    error: Option<io::Error>,
}

impl<W: Write> StreamWriter<W> {
    /// Create a writer over `out`. Relative paths given to the file
    /// embedding methods resolve against `base_dir`.
    pub fn new(out: W, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            out,
            base_dir: base_dir.into(),
            formatter: Arc::new(DefaultRegionMarkerFormatter),
            indent_level: 0,
            indent_unit: DEFAULT_INDENT_UNIT.to_string(),
            end_of_line: NATIVE_END_OF_LINE.to_string(),
            indent_suppressed: false,
            end_of_line_suppressed: false,
            sloc_frozen: false,
            line_count: 0,
            significant_line_count: 0,
            file_cache: HashMap::new(),
            error: None,
        }
    }

    /// Use `formatter` for region markers instead of the default.
    pub fn with_formatter(mut self, formatter: Arc<dyn RegionMarkerFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Set the line terminator. Call before the first write.
    pub fn set_end_of_line(&mut self, end_of_line: impl Into<String>) -> &mut Self {
        self.end_of_line = end_of_line.into();
        self
    }

    /// Set the indentation unit. Call before the first write.
    pub fn set_indent_unit(&mut self, indent_unit: impl Into<String>) -> &mut Self {
        self.indent_unit = indent_unit.into();
        self
    }

    pub fn end_of_line(&self) -> &str {
        &self.end_of_line
    }

    pub fn indent_unit(&self) -> &str {
        &self.indent_unit
    }

    pub fn indent_level(&self) -> usize {
        self.indent_level
    }

    /// Lines produced by line-writing calls.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Non-blank lines written while counting was not frozen.
    pub fn significant_line_count(&self) -> usize {
        self.significant_line_count
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Flush the destination and hand it back, reporting the first write
    /// error seen during the writer's lifetime.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn emit(&mut self, text: &str) {
        if self.error.is_some() || text.is_empty() {
            return;
        }
        if let Err(e) = self.out.write_all(text.as_bytes()) {
            tracing::warn!("Write to output stream failed: {}", e);
            self.error = Some(e);
        }
    }

    fn emit_indent(&mut self, level: usize) {
        if self.indent_suppressed || level == 0 {
            return;
        }
        let prefix = self.indent_unit.repeat(level);
        self.emit(&prefix);
    }

    fn emit_end_of_line(&mut self) {
        if self.end_of_line_suppressed {
            return;
        }
        let eol = std::mem::take(&mut self.end_of_line);
        self.emit(&eol);
        self.end_of_line = eol;
    }

    fn line_at(&mut self, level: usize, text: &str) -> &mut Self {
        let significant = !text.trim().is_empty();
        if !text.is_empty() {
            self.emit_indent(level);
            self.emit(text);
        }
        self.emit_end_of_line();
        self.count_line(significant);
        self
    }

    fn count_line(&mut self, significant: bool) {
        self.line_count += 1;
        if significant && !self.sloc_frozen {
            self.significant_line_count += 1;
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Cached read used by region lookups. The first read of a path wins,
    /// including a miss.
    fn cached_content(&mut self, path: PathBuf, encoding: Encoding) -> Option<&str> {
        let content = self.file_cache.entry(path).or_insert_with_key(|path| {
            match fs_utils::read_text(path, encoding) {
                Ok(Some(text)) if !text.is_empty() => Some(text),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Failed to read region source {}: {}", path.display(), e);
                    None
                }
            }
        });
        content.as_deref()
    }
}

impl<W: Write> TextWriter for StreamWriter<W> {
    fn write(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.emit(text.as_ref());
        self
    }

    fn write_line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let level = self.indent_level;
        self.line_at(level, text.as_ref())
    }

    fn new_line(&mut self) -> &mut Self {
        self.line_at(0, "")
    }

    fn write_line_indented(&mut self, text: impl AsRef<str>) -> &mut Self {
        let level = self.indent_level + 1;
        self.line_at(level, text.as_ref())
    }

    fn write_indent(&mut self) -> &mut Self {
        let level = self.indent_level;
        self.emit_indent(level);
        self
    }

    fn increase_indent(&mut self) -> &mut Self {
        self.indent_level += 1;
        self
    }

    fn decrease_indent(&mut self) -> &mut Self {
        self.indent_level = self.indent_level.saturating_sub(1);
        self
    }

    fn clear_indent(&mut self) -> &mut Self {
        self.indent_level = 0;
        self
    }

    fn suppress_indent(&mut self) -> &mut Self {
        self.indent_suppressed = true;
        self
    }

    fn resume_indent(&mut self) -> &mut Self {
        self.indent_suppressed = false;
        self
    }

    fn suppress_end_of_line(&mut self) -> &mut Self {
        self.end_of_line_suppressed = true;
        self
    }

    fn resume_end_of_line(&mut self) -> &mut Self {
        self.end_of_line_suppressed = false;
        self
    }

    fn freeze_sloc(&mut self) -> &mut Self {
        self.sloc_frozen = true;
        self
    }

    fn unfreeze_sloc(&mut self) -> &mut Self {
        self.sloc_frozen = false;
        self
    }

    fn with_frozen_sloc<F>(&mut self, block: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let was_frozen = self.sloc_frozen;
        self.sloc_frozen = true;
        block(self);
        self.sloc_frozen = was_frozen;
        self
    }

    fn write_file_encoded(&mut self, path: impl AsRef<Path>, encoding: Encoding) -> &mut Self {
        let path = self.resolve(path.as_ref());
        match fs_utils::read_text(&path, encoding) {
            Ok(Some(text)) => self.emit(&text),
            Ok(None) => tracing::debug!("Skipping missing file {}", path.display()),
            Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
        }
        self
    }

    fn write_file_region_encoded(
        &mut self,
        region: &str,
        path: impl AsRef<Path>,
        encoding: Encoding,
    ) -> bool {
        let path = path.as_ref();
        if region.is_empty() || path.as_os_str().is_empty() {
            return false;
        }

        let resolved = self.resolve(path);
        let formatter = Arc::clone(&self.formatter);
        let body = match self.cached_content(resolved, encoding) {
            Some(content) => find_region(content, region, formatter.as_ref()).map(str::to_owned),
            None => None,
        };

        match body {
            Some(body) => {
                self.emit(&body);
                self.emit_end_of_line();
                true
            }
            None => {
                tracing::debug!("Region '{}' not found in {}", region, path.display());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::LineCommentRegionMarkerFormatter;
    use std::fs;
    use tempfile::TempDir;

    fn writer(dir: &Path) -> StreamWriter<Vec<u8>> {
        let mut w = StreamWriter::new(Vec::new(), dir);
        w.set_end_of_line("\n");
        w
    }

    fn output(w: StreamWriter<Vec<u8>>) -> String {
        String::from_utf8(w.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let w = StreamWriter::new(Vec::new(), ".");
        assert_eq!(w.end_of_line(), NATIVE_END_OF_LINE);
        assert_eq!(w.indent_unit(), "\t");
        assert_eq!(w.indent_level(), 0);
    }

    #[test]
    fn test_indentation_nesting() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        w.write_line("mod a {")
            .increase_indent()
            .write_line("mod b {")
            .increase_indent()
            .write_line("fn c() {}")
            .decrease_indent()
            .write_line("}")
            .decrease_indent()
            .write_line("}");

        assert_eq!(output(w), "mod a {\n\tmod b {\n\t\tfn c() {}\n\t}\n}\n");
    }

    #[test]
    fn test_decrease_never_goes_negative() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        w.set_indent_unit("  ");
        w.decrease_indent()
            .decrease_indent()
            .increase_indent()
            .increase_indent()
            .decrease_indent()
            .decrease_indent()
            .decrease_indent()
            .increase_indent();

        assert_eq!(w.indent_level(), 1);
        w.write_indent();
        assert_eq!(output(w), "  ");
    }

    #[test]
    fn test_clear_indent() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        w.increase_indent().increase_indent().clear_indent().write_line("x");
        assert_eq!(output(w), "x\n");
    }

    #[test]
    fn test_write_line_indented_keeps_level() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        w.increase_indent()
            .write_line("if x {")
            .write_line_indented("y();")
            .write_line("}");

        assert_eq!(w.indent_level(), 1);
        assert_eq!(output(w), "\tif x {\n\t\ty();\n\t}\n");
    }

    #[test]
    fn test_suppression_builds_single_line() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        w.increase_indent().write_indent().write("let v = ");
        w.suppress_indent().suppress_end_of_line();
        w.write_line("1").write_line(" + 2");
        w.resume_indent().resume_end_of_line();
        w.write_line(";");

        assert_eq!(output(w), "\tlet v = 1 + 2\t;\n");
    }

    #[test]
    fn test_new_line_counts_total_only() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        w.increase_indent().new_line();

        assert_eq!(w.line_count(), 1);
        assert_eq!(w.significant_line_count(), 0);
        assert_eq!(output(w), "\n");
    }

    #[test]
    fn test_blank_text_is_not_significant() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        w.write_line("").write_line("   ").write_line("x");

        assert_eq!(w.line_count(), 3);
        assert_eq!(w.significant_line_count(), 1);
    }

    #[test]
    fn test_freeze_and_unfreeze_sloc() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        w.write_line("a");
        w.freeze_sloc();
        for i in 0..4 {
            w.write_line(format!("// generated {}", i));
        }
        w.unfreeze_sloc();

        assert_eq!(w.line_count(), 5);
        assert_eq!(w.significant_line_count(), 1);

        w.write_line("b");
        assert_eq!(w.significant_line_count(), 2);
    }

    #[test]
    fn test_with_frozen_sloc_as_final_call() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        w.with_frozen_sloc(|w| {
            w.write_line("// header").write_line("// more");
        });

        assert_eq!(w.line_count(), 2);
        assert_eq!(w.significant_line_count(), 0);

        w.write_line("code");
        assert_eq!(w.significant_line_count(), 1);
    }

    #[test]
    fn test_with_frozen_sloc_restores_outer_freeze() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        w.freeze_sloc();
        w.with_frozen_sloc(|w| {
            w.write_line("inner");
        });
        w.write_line("still frozen");

        assert_eq!(w.significant_line_count(), 0);
    }

    #[test]
    fn test_write_opt_none_is_noop() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        w.write_opt(None::<&str>).write_opt(Some("x"));
        assert_eq!(output(w), "x");
    }

    #[test]
    fn test_write_file_is_verbatim_and_uncached() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("header.txt"), "\u{FEFF}// header\n").unwrap();

        let mut w = writer(temp.path());
        w.increase_indent().write_file("header.txt");
        fs::write(temp.path().join("header.txt"), "// changed\n").unwrap();
        w.write_file("header.txt").write_file("missing.txt");

        assert_eq!(w.line_count(), 0);
        assert_eq!(output(w), "// header\n// changed\n");
    }

    #[test]
    fn test_write_file_region() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("old.rs"), "/// <foo>\nBODY\n/// </foo>\n").unwrap();

        let mut w = writer(temp.path());
        assert!(w.write_file_region("foo", "old.rs"));
        assert_eq!(output(w), "BODY\n\n");
    }

    #[test]
    fn test_write_file_region_keeps_text_beside_markers() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("old.rs"), "/// <foo>\nkeep_me(); /// </foo>\n").unwrap();
        fs::write(temp.path().join("inline.rs"), "/// <bar> inline(); /// </bar>\n").unwrap();

        let mut w = writer(temp.path());
        assert!(w.write_file_region("foo", "old.rs"));
        assert!(w.write_file_region("bar", "inline.rs"));
        assert_eq!(output(w), "keep_me(); \n inline(); \n");
    }

    #[test]
    fn test_write_file_region_uses_active_terminator() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("old.rs"), "/// <foo>\nBODY\n/// </foo>\n").unwrap();

        let mut w = writer(temp.path());
        w.set_end_of_line("\r\n");
        assert!(w.write_file_region("foo", "old.rs"));
        assert_eq!(output(w), "BODY\n\r\n");
    }

    #[test]
    fn test_write_file_region_misses_write_nothing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("old.rs"), "/// <foo>\nBODY\n/// </foo>\n").unwrap();

        let mut w = writer(temp.path());
        assert!(!w.write_file_region("bar", "old.rs"));
        assert!(!w.write_file_region("foo", "missing.rs"));
        assert!(!w.write_file_region("", "old.rs"));
        assert!(!w.write_file_region("foo", ""));
        assert_eq!(output(w), "");
    }

    #[test]
    fn test_write_file_region_cache_is_stable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("old.rs");
        fs::write(&path, "/// <foo>\nfirst\n/// </foo>\n").unwrap();

        let mut w = writer(temp.path());
        assert!(w.write_file_region("foo", "old.rs"));
        fs::write(&path, "/// <foo>\nsecond\n/// </foo>\n").unwrap();
        assert!(w.write_file_region("foo", "old.rs"));

        assert_eq!(output(w), "first\n\nfirst\n\n");
    }

    #[test]
    fn test_write_file_region_caches_absence() {
        let temp = TempDir::new().unwrap();
        let mut w = writer(temp.path());
        assert!(!w.write_file_region("foo", "late.rs"));

        fs::write(temp.path().join("late.rs"), "/// <foo>\nBODY\n/// </foo>\n").unwrap();
        assert!(!w.write_file_region("foo", "late.rs"));
    }

    #[test]
    fn test_write_file_region_custom_formatter() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("old.py"), "# <imports>\nimport os\n# </imports>\n").unwrap();

        let mut w = writer(temp.path())
            .with_formatter(Arc::new(LineCommentRegionMarkerFormatter::new("#")));
        assert!(w.write_file_region("imports", "old.py"));
        assert!(!w.write_file_region("imports", "missing.py"));
        assert_eq!(output(w), "import os\n\n");
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_error_surfaces_on_finish() {
        let mut w = StreamWriter::new(FailingSink, ".");
        w.write_line("a").write_line("b");

        assert_eq!(w.line_count(), 2);
        let err = w.finish().err().unwrap();
        assert_eq!(err.to_string(), "disk full");
    }
}
