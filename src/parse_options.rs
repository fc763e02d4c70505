//! Parsing options for document decoding.

/// Options for controlling document parsing behavior.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// How to handle a stream that fails to decode.
    pub error_mode: ErrorMode,

    /// Which event tree to produce for body sections.
    pub tree_mode: TreeMode,

    /// Whether repeated FaceName records in DocInfo are collapsed.
    pub dedup_face_names: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            tree_mode: TreeMode::Merged,
            dedup_face_names: true,
        }
    }
}

impl ParseOptions {
    /// Creates new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets lenient error handling (skip streams that fail to decode).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Sets strict error handling (fail on any error).
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Produces plain nested record models without post-processing.
    pub fn raw(mut self) -> Self {
        self.tree_mode = TreeMode::Raw;
        self.dedup_face_names = false;
        self
    }

    /// Produces shaped paragraphs, inlined controls, fields and table rows.
    pub fn merged(mut self) -> Self {
        self.tree_mode = TreeMode::Merged;
        self
    }

    /// Keeps every FaceName record as stored.
    pub fn keep_face_names(mut self) -> Self {
        self.dedup_face_names = false;
        self
    }

    /// Returns true if failing streams should be skipped.
    pub fn is_lenient(&self) -> bool {
        matches!(self.error_mode, ErrorMode::Lenient)
    }
}

/// How to handle parsing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail immediately on any error.
    #[default]
    Strict,
    /// Skip the failing stream and continue with the remaining ones.
    Lenient,
}

/// Shape of the event tree produced for body sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeMode {
    /// Paragraph text merged into line segments, controls inlined,
    /// fields matched and table cells wrapped in rows.
    #[default]
    Merged,
    /// Record models nested exactly as stored.
    Raw,
}
