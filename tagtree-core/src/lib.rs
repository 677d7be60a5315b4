//! tagtree core
//!
//! Lenient single-pass parser for XML/HTML-like markup. Builds an arena tree
//! of typed nodes whose text borrows from the input wherever possible.
//!
//! # Architecture
//!
//! - **parser.rs** - Scanner: one left-to-right pass, cursor over containers
//! - **tree.rs** - Arena document, node kinds, attributes, node handles
//! - **rules.rs** - Per-tag close-mode rules (end tag, self-close, void)
//! - **position.rs** - Offset to line/column index for diagnostics
//! - **error.rs** - Parse, rule and tree errors
//!
//! # Example
//!
//! ```
//! use tagtree_core::{parse, NodeKind};
//!
//! let doc = parse("<a href=\"/\">home</a>").unwrap();
//! let link = doc.root().first_child().unwrap();
//! assert!(matches!(link.kind(), NodeKind::Container(_)));
//! assert_eq!(link.attr_value("href"), Some("/"));
//! assert_eq!(link.text_content(), "home");
//! ```

pub mod error;
pub mod parser;
pub mod position;
pub mod rules;
pub mod tree;

pub use error::{ErrorCode, ParseError, RuleError, TreeError};
pub use parser::{ParseOptions, Parser, DEFAULT_MAX_ATTRIBUTES};
pub use position::{LineIndex, Location};
pub use rules::{CloseMode, RuleSet, TagSyntaxRule};
pub use tree::{Attribute, Descendants, Document, Element, Node, NodeId, NodeKind};

/// Parse `source` with permissive rules.
pub fn parse(source: &str) -> Result<Document<'_>, ParseError> {
    Parser::new(source).parse()
}

/// Parse `source` with the given tag syntax rules.
pub fn parse_with_rules<'a>(source: &'a str, rules: &RuleSet) -> Result<Document<'a>, ParseError> {
    Parser::with_options(source, ParseOptions::default().with_rules(rules.clone())).parse()
}
