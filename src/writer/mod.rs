//! Text output for templates.
//!
//! Templates never touch files directly. They receive a [`StreamWriter`] and
//! drive it through the [`TextWriter`] surface: plain writes, indented lines,
//! and embedding of whole files or named regions of files.

pub mod encoding;
pub mod region;
pub mod stream_writer;

use std::path::Path;

pub use encoding::Encoding;
pub use region::{
    DefaultRegionMarkerFormatter, LineCommentRegionMarkerFormatter, RegionMarkerFormatter,
};
pub use stream_writer::StreamWriter;

/// Capability surface consumed by template callbacks.
///
/// Every method except the region lookups returns the writer so calls can be
/// chained:
///
/// ```ignore
/// w.write_line("impl Foo {")
///     .increase_indent()
///     .write_line("fn bar() {}")
///     .decrease_indent()
///     .write_line("}");
/// ```
pub trait TextWriter {
    /// Append `text` as is, without indentation or line terminator.
    fn write(&mut self, text: impl AsRef<str>) -> &mut Self;

    /// Append `text` when present; `None` writes nothing.
    fn write_opt(&mut self, text: Option<impl AsRef<str>>) -> &mut Self {
        match text {
            Some(text) => self.write(text),
            None => self,
        }
    }

    /// Write one line at the current indent level.
    fn write_line(&mut self, text: impl AsRef<str>) -> &mut Self;

    /// Write a bare line terminator.
    fn new_line(&mut self) -> &mut Self;

    /// Write one line one level deeper than the current indent, leaving the
    /// level unchanged.
    fn write_line_indented(&mut self, text: impl AsRef<str>) -> &mut Self;

    /// Write the indent prefix for the current level.
    fn write_indent(&mut self) -> &mut Self;

    fn increase_indent(&mut self) -> &mut Self;

    /// Step one level out; a no-op at level zero.
    fn decrease_indent(&mut self) -> &mut Self;

    fn clear_indent(&mut self) -> &mut Self;

    fn suppress_indent(&mut self) -> &mut Self;

    fn resume_indent(&mut self) -> &mut Self;

    fn suppress_end_of_line(&mut self) -> &mut Self;

    fn resume_end_of_line(&mut self) -> &mut Self;

    /// Stop counting significant lines.
    fn freeze_sloc(&mut self) -> &mut Self;

    /// Resume counting significant lines.
    fn unfreeze_sloc(&mut self) -> &mut Self;

    /// Run `block` with significant-line counting frozen. The previous
    /// counting state is restored once `block` returns.
    fn with_frozen_sloc<F>(&mut self, block: F) -> &mut Self
    where
        F: FnOnce(&mut Self);

    /// Append the full contents of a UTF-8 file.
    fn write_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.write_file_encoded(path, Encoding::Utf8)
    }

    /// Append the full contents of a file decoded with `encoding`.
    /// A missing file writes nothing.
    fn write_file_encoded(&mut self, path: impl AsRef<Path>, encoding: Encoding) -> &mut Self;

    /// Append the body of region `region` from a UTF-8 file.
    fn write_file_region(&mut self, region: &str, path: impl AsRef<Path>) -> bool {
        self.write_file_region_encoded(region, path, Encoding::Utf8)
    }

    /// Append the body of region `region` followed by a line terminator.
    ///
    /// Returns `false`, writing nothing, when the file, the start marker or
    /// the end marker cannot be found.
    fn write_file_region_encoded(
        &mut self,
        region: &str,
        path: impl AsRef<Path>,
        encoding: Encoding,
    ) -> bool;
}
