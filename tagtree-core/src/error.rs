//! Error types.
//!
//! [`ParseError`] is the diagnostic raised by the scanner: the first
//! malformed construct aborts the parse and no partial tree is returned.
//! [`RuleError`] and [`TreeError`] report misuse of the configuration and
//! tree APIs and carry no source location.

use std::fmt;

use crate::position::{line_text, Location};
use crate::rules::CloseMode;
use crate::tree::NodeId;

/// Error codes for parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    /// A character that cannot start or continue the construct being scanned.
    UnexpectedToken = 0,
    /// More than one `:` in a tag or attribute name.
    IllegalNamespacePrefix,
    /// A `:` not followed by a name.
    MissingTagNameAfterNamespacePrefix,
    /// Input ended inside a comment, CDATA section, quoted literal or tag.
    UnexpectedEndOfInput,
    /// A close tag with no open element to close.
    UnmatchedCloseTag,
    /// `/>` on a tag whose rule forbids self-closing.
    SelfCloseNotAllowed,
    /// `>` on a tag whose rule allows neither an end tag nor void use.
    CloseTagNotAllowed,
}

impl ErrorCode {
    /// Get a human-readable message for this error code.
    pub fn message(self) -> &'static str {
        match self {
            Self::UnexpectedToken => "unexpected token",
            Self::IllegalNamespacePrefix => "illegal namespace prefix",
            Self::MissingTagNameAfterNamespacePrefix => "missing name after namespace prefix",
            Self::UnexpectedEndOfInput => "unexpected end of input",
            Self::UnmatchedCloseTag => "unmatched close tag",
            Self::SelfCloseNotAllowed => "self-closing not allowed",
            Self::CloseTagNotAllowed => "tag must self-close",
        }
    }

    /// True for codes raised by the tag syntax rules.
    pub fn is_close_mode_violation(self) -> bool {
        matches!(self, Self::SelfCloseNotAllowed | Self::CloseTagNotAllowed)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Fatal diagnostic for malformed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    code: ErrorCode,
    location: Location,
    message: String,
    snippet: String,
}

impl ParseError {
    pub(crate) fn new(
        code: ErrorCode,
        location: Location,
        message: impl Into<String>,
        source: &str,
    ) -> Self {
        ParseError {
            code,
            location,
            message: message.into(),
            snippet: line_text(source, location.offset).to_owned(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn line(&self) -> u32 {
        self.location.line
    }

    pub fn column(&self) -> u32 {
        self.location.column
    }

    /// Byte offset of the offending construct.
    pub fn offset(&self) -> usize {
        self.location.offset
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The source line containing the error.
    pub fn snippet(&self) -> &str {
        &self.snippet
    }

    /// Multi-line diagnostic with a caret under the offending column.
    pub fn render(&self) -> String {
        let gutter = self.location.line.to_string();
        let pad = " ".repeat(gutter.len());
        let caret_indent: String = self
            .snippet
            .chars()
            .take(self.location.column.saturating_sub(1) as usize)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        format!(
            "error[{:?}]: {}\n{pad} --> {}\n{pad} |\n{gutter} | {}\n{pad} | {caret_indent}^",
            self.code, self.message, self.location, self.snippet
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.code, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Misuse of the tag syntax rule API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleError {
    /// A lookup was asked about several close modes at once.
    CombinedCloseMode(CloseMode),
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::CombinedCloseMode(mode) => write!(
                f,
                "rule lookup failed: close mode must be a single mode, got {}",
                mode
            ),
        }
    }
}

impl std::error::Error for RuleError {}

/// Misuse of the tree mutation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// The node id does not belong to this document.
    UnknownNode(NodeId),
    /// The node cannot hold children.
    NotAContainer(NodeId),
    /// `child` is not a child of `parent`.
    NotAChild { parent: NodeId, child: NodeId },
    /// The node already has a parent.
    AlreadyAttached(NodeId),
    /// The node has no parent.
    Detached(NodeId),
    /// Only tentative self-closing nodes can be promoted or settled.
    NotTentative(NodeId),
    /// The document root cannot be moved.
    RootNotMovable,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::UnknownNode(id) => write!(f, "node {} is not in this document", id.index()),
            TreeError::NotAContainer(id) => write!(f, "node {} cannot hold children", id.index()),
            TreeError::NotAChild { parent, child } => write!(
                f,
                "node {} is not a child of node {}",
                child.index(),
                parent.index()
            ),
            TreeError::AlreadyAttached(id) => write!(f, "node {} already has a parent", id.index()),
            TreeError::Detached(id) => write!(f, "node {} has no parent", id.index()),
            TreeError::NotTentative(id) => {
                write!(f, "node {} is not a tentative self-closing node", id.index())
            }
            TreeError::RootNotMovable => f.write_str("the document root cannot be moved"),
        }
    }
}

impl std::error::Error for TreeError {}
