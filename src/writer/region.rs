//! Region marker formatting.
//!
//! A region is a named span of an existing file, delimited by a start and
//! an end marker line. Generated output can pull a region's body back in so
//! hand edits survive regeneration.

/// Maps a region name to its start and end delimiter strings.
///
/// Implementations are chosen per generation call, so different output
/// languages can use their own comment syntax.
pub trait RegionMarkerFormatter: Send + Sync {
    /// Delimiter opening the region `name`.
    fn start_marker(&self, name: &str) -> String;

    /// Delimiter closing the region `name`.
    fn end_marker(&self, name: &str) -> String;
}

/// Produces `/// <name>` and `/// </name>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRegionMarkerFormatter;

impl RegionMarkerFormatter for DefaultRegionMarkerFormatter {
    fn start_marker(&self, name: &str) -> String {
        format!("/// <{}>", name)
    }

    fn end_marker(&self, name: &str) -> String {
        format!("/// </{}>", name)
    }
}

/// Produces `<prefix> <name>` and `<prefix> </name>` for an arbitrary
/// line-comment prefix, e.g. `#` or `--`.
#[derive(Debug, Clone)]
pub struct LineCommentRegionMarkerFormatter {
    prefix: String,
}

impl LineCommentRegionMarkerFormatter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl RegionMarkerFormatter for LineCommentRegionMarkerFormatter {
    fn start_marker(&self, name: &str) -> String {
        format!("{} <{}>", self.prefix, name)
    }

    fn end_marker(&self, name: &str) -> String {
        format!("{} </{}>", self.prefix, name)
    }
}

/// Locate the body of region `name` in `content`.
///
/// The body is the text between the first start marker and the first end
/// marker after it. When the markers sit on their own lines, the rest of
/// the start marker line and the indentation before the end marker are not
/// part of the body.
pub(crate) fn find_region<'a>(
    content: &'a str,
    name: &str,
    formatter: &dyn RegionMarkerFormatter,
) -> Option<&'a str> {
    let start_marker = formatter.start_marker(name);
    let end_marker = formatter.end_marker(name);

    let marker_pos = content.find(&start_marker)?;
    let after_marker = marker_pos + start_marker.len();
    let end_pos = after_marker + content[after_marker..].find(&end_marker)?;
    let between = &content[after_marker..end_pos];

    let body_start = match between.find('\n') {
        Some(offset) if between[..offset].trim().is_empty() => after_marker + offset + 1,
        _ => after_marker,
    };

    let end_line_start = content[body_start..end_pos]
        .rfind('\n')
        .map(|offset| body_start + offset + 1)
        .unwrap_or(body_start);
    let body_end = if content[end_line_start..end_pos].trim().is_empty() {
        end_line_start
    } else {
        end_pos
    };

    Some(&content[body_start..body_end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_markers() {
        let f = DefaultRegionMarkerFormatter;
        assert_eq!(f.start_marker("usings"), "/// <usings>");
        assert_eq!(f.end_marker("usings"), "/// </usings>");
    }

    #[test]
    fn test_line_comment_markers() {
        let f = LineCommentRegionMarkerFormatter::new("#");
        assert_eq!(f.start_marker("imports"), "# <imports>");
        assert_eq!(f.end_marker("imports"), "# </imports>");
    }

    #[test]
    fn test_find_region_body() {
        let content = "head\n/// <foo>\nBODY\n/// </foo>\ntail\n";
        let body = find_region(content, "foo", &DefaultRegionMarkerFormatter);
        assert_eq!(body, Some("BODY\n"));
    }

    #[test]
    fn test_find_region_indented_end_marker() {
        let content = "    /// <foo>\n    a();\n    b();\n    /// </foo>\n";
        let body = find_region(content, "foo", &DefaultRegionMarkerFormatter);
        assert_eq!(body, Some("    a();\n    b();\n"));
    }

    #[test]
    fn test_find_region_crlf() {
        let content = "/// <foo>\r\nBODY\r\n/// </foo>\r\n";
        let body = find_region(content, "foo", &DefaultRegionMarkerFormatter);
        assert_eq!(body, Some("BODY\r\n"));
    }

    #[test]
    fn test_find_region_empty_body() {
        let content = "/// <foo>\n/// </foo>\n";
        let body = find_region(content, "foo", &DefaultRegionMarkerFormatter);
        assert_eq!(body, Some(""));
    }

    #[test]
    fn test_find_region_misses() {
        let f = DefaultRegionMarkerFormatter;
        assert_eq!(find_region("/// <foo>\nBODY\n", "foo", &f), None);
        assert_eq!(find_region("BODY\n/// </foo>\n", "foo", &f), None);
        assert_eq!(find_region("/// <foo>\nBODY\n/// </foo>\n", "bar", &f), None);
    }

    #[test]
    fn test_find_region_keeps_text_before_end_marker() {
        let content = "/// <foo>\nkeep_me(); /// </foo>\n";
        let body = find_region(content, "foo", &DefaultRegionMarkerFormatter);
        assert_eq!(body, Some("keep_me(); "));
    }

    #[test]
    fn test_find_region_on_one_line() {
        let content = "/// <foo> inline(); /// </foo>\n";
        let body = find_region(content, "foo", &DefaultRegionMarkerFormatter);
        assert_eq!(body, Some(" inline(); "));
    }

    #[test]
    fn test_find_region_text_after_start_marker() {
        let content = "/// <foo> first();\nsecond();\n/// </foo>\n";
        let body = find_region(content, "foo", &DefaultRegionMarkerFormatter);
        assert_eq!(body, Some(" first();\nsecond();\n"));
    }

    #[test]
    fn test_end_marker_before_start_is_ignored() {
        let content = "/// </foo>\n/// <foo>\nBODY\n";
        assert_eq!(find_region(content, "foo", &DefaultRegionMarkerFormatter), None);
    }
}
