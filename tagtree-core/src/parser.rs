//! Single-pass scanner building a [`Document`] from markup text.
//!
//! The scanner walks the source once, left to right. A cursor names the
//! container new nodes are appended to; it starts at the document root,
//! moves into an element when its opening tag ends in `>`, and moves back to
//! the parent at every close tag.
//!
//! Nodes are appended the moment their opener is recognized. A normal
//! element starts out as a tentative [`NodeKind::SelfClosing`] node and is
//! promoted to a [`NodeKind::Container`] only once its opening tag ends in
//! `>`, so the cheapest shape is always built first.
//!
//! ```text
//! document    -> (whitespace | text | tag)*
//!
//! tag         -> element | closeTag | cdata | declaration | comment | pi
//! element     -> "<" NAME attribute* ("/>" | ">")
//! closeTag    -> "</" NAME? ">"
//! cdata       -> "<![CDATA[" RAW "]]>"
//! declaration -> "<!" NAME (attribute | literal)* ">"
//! comment     -> "<!--" RAW "-->"
//! pi          -> "<?" NAME attribute* ("?>" | ">")
//!
//! NAME        -> (PREFIX ":")? LOCAL
//! attribute   -> NAME ("=" QUOTED)?
//! literal     -> QUOTED
//! ```
//!
//! Any malformed construct raises a [`ParseError`] and aborts the parse.

use std::borrow::Cow;
use std::cell::OnceCell;

use log::{debug, trace};
use memchr::{memchr, memchr2, memmem};

use crate::error::{ErrorCode, ParseError};
use crate::position::{LineIndex, Location};
use crate::rules::{CloseMode, RuleSet};
use crate::tree::{Document, Element, NodeId, NodeKind};

/// Attribute and literal items accepted per tag by default.
pub const DEFAULT_MAX_ATTRIBUTES: usize = 10;

/// Macro to match for whitespace characters
macro_rules! space_chars {
    () => {
        b' ' | b'\t' | b'\r' | b'\n'
    };
}

/// Characters allowed in tag and attribute names, besides the prefix colon.
#[inline]
fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// Characters that can start a normal element name.
#[inline]
fn is_element_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'-' || b == b'_'
}

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub rules: RuleSet,
    /// Cap on attribute and system-literal items per tag. `None` disables it.
    pub max_attributes: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            rules: RuleSet::new(),
            max_attributes: Some(DEFAULT_MAX_ATTRIBUTES),
        }
    }
}

impl ParseOptions {
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_max_attributes(mut self, max: Option<usize>) -> Self {
        self.max_attributes = max;
        self
    }
}

/// The three shapes sharing the opening-tag grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagFlavor {
    Element,
    Declaration,
    ProcessingInstruction,
}

impl TagFlavor {
    fn allows_literals(self) -> bool {
        self == TagFlavor::Declaration
    }

    fn describe(self) -> &'static str {
        match self {
            TagFlavor::Element => "opening tag",
            TagFlavor::Declaration => "declaration",
            TagFlavor::ProcessingInstruction => "processing instruction",
        }
    }
}

/// Scanner state for one parse.
///
/// A parser is consumed by [`Parser::parse`]; parse another string with a
/// new instance.
pub struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    cursor: NodeId,
    doc: Document<'a>,
    options: ParseOptions,
    line_index: OnceCell<LineIndex>,
}

impl<'a> Parser<'a> {
    /// Parser with permissive rules and default options.
    pub fn new(source: &'a str) -> Self {
        Self::with_options(source, ParseOptions::default())
    }

    pub fn with_options(source: &'a str, options: ParseOptions) -> Self {
        let doc = Document::new();
        let cursor = doc.root_id();
        Parser {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            cursor,
            doc,
            options,
            line_index: OnceCell::new(),
        }
    }

    /// Scan the whole source. Returns the finished tree, or the first error
    /// in source order.
    pub fn parse(mut self) -> Result<Document<'a>, ParseError> {
        debug!("parsing {} bytes", self.bytes.len());

        while let Some(b) = self.current() {
            match b {
                space_chars!() => self.advance(),
                b'<' if self.angle_opens_tag(self.pos) => self.tag()?,
                _ => self.text(),
            }
        }

        debug!("parsed {} nodes", self.doc.node_count());
        Ok(self.doc)
    }

    /// Line and column of a byte offset in this parser's source. The index
    /// behind it is built on first use.
    pub fn location_of(&self, offset: usize) -> Location {
        self.line_index
            .get_or_init(|| LineIndex::new(self.source))
            .locate(offset)
    }
}

// PARSING HELPERS
impl<'a> Parser<'a> {
    #[inline]
    fn advance(&mut self) {
        self.pos += 1
    }

    #[inline]
    fn current(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    #[inline]
    fn current_matches(&self, b: u8) -> bool {
        self.current() == Some(b)
    }

    /// Whether the bytes at `at` start with `pattern`.
    #[inline]
    fn matches_at(&self, at: usize, pattern: &[u8]) -> bool {
        self.bytes.get(at..).is_some_and(|rest| rest.starts_with(pattern))
    }

    fn skip_whitespace(&mut self) {
        while let Some(space_chars!()) = self.current() {
            self.advance();
        }
    }

    /// Describe the character at `offset` for error messages.
    fn describe_at(&self, offset: usize) -> String {
        match self.source.get(offset..).and_then(|rest| rest.chars().next()) {
            None => String::from("end of input"),
            Some(c) if c.is_control() => format!("control character {:#x}", c as u32),
            Some(c) => format!("'{}'", c),
        }
    }

    fn error_at(&self, offset: usize, code: ErrorCode, message: impl Into<String>) -> ParseError {
        let err = ParseError::new(code, self.location_of(offset), message, self.source);
        debug!("parse error: {}", err);
        err
    }

    fn unexpected_here(&self, expected: &str) -> ParseError {
        self.error_at(
            self.pos,
            ErrorCode::UnexpectedToken,
            format!("expected {}, found {}", expected, self.describe_at(self.pos)),
        )
    }

    fn unterminated(&self, start: usize, what: &str) -> ParseError {
        self.error_at(
            start,
            ErrorCode::UnexpectedEndOfInput,
            format!("unterminated {}", what),
        )
    }

    /// Append a node to the current container.
    fn open_node(&mut self, kind: NodeKind<'a>) -> NodeId {
        let id = self.doc.push_node(self.cursor, kind);
        trace!(
            "{} node {:?} under {:?} at {}",
            self.doc.kind(id).map_or("?", NodeKind::name),
            id,
            self.cursor,
            self.pos
        );
        id
    }

    fn with_element(&mut self, id: NodeId, f: impl FnOnce(&mut Element<'a>)) {
        if let Some(el) = self.doc.kind_mut(id).and_then(NodeKind::element_mut) {
            f(el);
        }
    }
}

// GRAMMAR IMPLEMENTATION
impl<'a> Parser<'a> {
    /// Decide whether the `<` at `at` starts a tag or is text.
    ///
    /// `<!` and `<?` always start a tag. Otherwise the `<` is text if another
    /// `<` comes strictly before the next `>`.
    fn angle_opens_tag(&self, at: usize) -> bool {
        if let Some(b'!' | b'?') = self.bytes.get(at + 1) {
            return true;
        }
        let rest = self.bytes.get(at + 1..).unwrap_or(&[]);
        match (memchr(b'<', rest), memchr(b'>', rest)) {
            (Some(lt), Some(gt)) => lt > gt,
            _ => true,
        }
    }

    /// Collect one text run up to the next tag-opening `<` or end of input.
    fn text(&mut self) {
        let id = self.open_node(NodeKind::Text(Cow::Borrowed("")));
        self.skip_whitespace();
        let start = self.pos;

        loop {
            match memchr(b'<', &self.bytes[self.pos..]) {
                None => {
                    self.pos = self.bytes.len();
                    break;
                }
                Some(i) => {
                    self.pos += i;
                    if self.angle_opens_tag(self.pos) {
                        break;
                    }
                    self.advance();
                }
            }
        }

        let content = &self.source[start..self.pos];
        if let Some(kind) = self.doc.kind_mut(id) {
            *kind = NodeKind::Text(Cow::Borrowed(content));
        }
    }

    /// Dispatch on the characters after a confirmed tag-opening `<`.
    fn tag(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        match self.peek(1) {
            Some(b'/') => self.close_tag(),
            Some(b) if is_element_start(b) => self.element(),
            Some(b'!') => {
                if self.matches_at(start + 2, b"[CDATA[") {
                    self.cdata()
                } else if self.bytes.get(start + 2).is_some_and(u8::is_ascii_alphabetic) {
                    self.declaration()
                } else if self.matches_at(start + 2, b"--") {
                    self.comment()
                } else {
                    Err(self.error_at(
                        start,
                        ErrorCode::UnexpectedToken,
                        "expected declaration opener, comment or CDATA section after '<!'",
                    ))
                }
            }
            Some(b'?') => self.processing_instruction(),
            _ => Err(self.error_at(
                start,
                ErrorCode::UnexpectedToken,
                format!(
                    "expected '!', '?', '/' or a tag name after '<', found {}",
                    self.describe_at(start + 1)
                ),
            )),
        }
    }

    /// `</name>`: the name is consumed but not matched against the opener.
    fn close_tag(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 2;
        self.skip_whitespace();
        while let Some(b) = self.current() {
            if !is_name_byte(b) && b != b':' {
                break;
            }
            self.advance();
        }
        self.skip_whitespace();

        match self.current() {
            Some(b'>') => self.advance(),
            None => return Err(self.unterminated(start, "close tag")),
            Some(_) => return Err(self.unexpected_here("'>' to end the close tag")),
        }

        let parent = self.doc.parent(self.cursor).ok_or_else(|| {
            self.error_at(
                start,
                ErrorCode::UnmatchedCloseTag,
                "close tag without an open element",
            )
        })?;
        trace!("close tag at {}, cursor {:?} -> {:?}", start, self.cursor, parent);
        self.cursor = parent;
        Ok(())
    }

    fn comment(&mut self) -> Result<(), ParseError> {
        self.raw_section(4, b"-->", "comment, expected '-->'", NodeKind::Comment)
    }

    fn cdata(&mut self) -> Result<(), ParseError> {
        self.raw_section(9, b"]]>", "CDATA section, expected ']]>'", NodeKind::CData)
    }

    /// Comment and CDATA bodies: everything verbatim up to `terminator`.
    fn raw_section(
        &mut self,
        opener_len: usize,
        terminator: &[u8],
        what: &str,
        make: fn(Cow<'a, str>) -> NodeKind<'a>,
    ) -> Result<(), ParseError> {
        let start = self.pos;
        let id = self.open_node(make(Cow::Borrowed("")));
        let body = start + opener_len;

        let len = memmem::find(&self.bytes[body..], terminator)
            .ok_or_else(|| self.unterminated(start, what))?;
        let content = &self.source[body..body + len];
        if let Some(kind) = self.doc.kind_mut(id) {
            *kind = make(Cow::Borrowed(content));
        }
        self.pos = body + len + terminator.len();
        Ok(())
    }

    fn element(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let id = self.open_node(NodeKind::SelfClosing(Element::default()));
        self.advance();
        self.opening_tag(id, start, TagFlavor::Element)
    }

    fn declaration(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let id = self.open_node(NodeKind::DeclarationOpener {
            element: Element::default(),
            system_literals: Vec::new(),
        });
        self.pos += 2;
        self.opening_tag(id, start, TagFlavor::Declaration)
    }

    fn processing_instruction(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let id = self.open_node(NodeKind::ProcessingInstruction(Element::default()));
        self.pos += 2;
        self.opening_tag(id, start, TagFlavor::ProcessingInstruction)
    }

    /// Shared tail of element, declaration and PI openers, starting at the
    /// tag name.
    fn opening_tag(&mut self, id: NodeId, start: usize, flavor: TagFlavor) -> Result<(), ParseError> {
        let (prefix, name) = self.qualified_name()?;
        self.with_element(id, |el| {
            el.prefix = prefix.map(Cow::Borrowed);
            el.name = Cow::Borrowed(name);
        });

        if !matches!(self.current(), Some(b'?' | b'>')) {
            self.attribute_list(id, start, flavor)?;
        }
        self.skip_whitespace();
        self.tag_terminator(id, start, flavor)
    }

    /// `name` or `prefix:name`.
    fn qualified_name(&mut self) -> Result<(Option<&'a str>, &'a str), ParseError> {
        let start = self.pos;
        let mut colon = None;

        while let Some(b) = self.current() {
            if is_name_byte(b) {
                self.advance();
            } else if b == b':' {
                if colon.is_some() {
                    return Err(self.error_at(
                        self.pos,
                        ErrorCode::IllegalNamespacePrefix,
                        "multiple colons in tag name",
                    ));
                }
                colon = Some(self.pos);
                self.advance();
                if !self.current().is_some_and(|c| c.is_ascii_alphabetic()) {
                    return Err(self.error_at(
                        self.pos,
                        ErrorCode::MissingTagNameAfterNamespacePrefix,
                        "namespace prefix must be followed by a tag name",
                    ));
                }
            } else {
                break;
            }
        }

        Ok(match colon {
            Some(c) => (Some(&self.source[start..c]), &self.source[c + 1..self.pos]),
            None => (None, &self.source[start..self.pos]),
        })
    }

    fn attribute_list(&mut self, id: NodeId, start: usize, flavor: TagFlavor) -> Result<(), ParseError> {
        // The list must be separated from the tag name.
        match self.current() {
            Some(space_chars!() | b'/' | b'>') => {}
            Some(b'"' | b'\'') if flavor.allows_literals() => {}
            None => return Err(self.unterminated(start, flavor.describe())),
            Some(_) => {
                return Err(self.unexpected_here(&format!(
                    "whitespace or end of {}",
                    flavor.describe()
                )))
            }
        }
        self.skip_whitespace();

        let mut items = 0usize;
        loop {
            match self.current() {
                None | Some(b'>' | b'/' | b'?') => break,
                _ => {}
            }
            if self.options.max_attributes.is_some_and(|max| items >= max) {
                trace!("attribute cap reached at {}", self.pos);
                break;
            }
            items += 1;

            let item_start = self.pos;
            match self.current() {
                Some(quote @ (b'"' | b'\'')) => {
                    if !flavor.allows_literals() {
                        return Err(self.error_at(
                            self.pos,
                            ErrorCode::UnexpectedToken,
                            format!("system literal not allowed in {}", flavor.describe()),
                        ));
                    }
                    let literal = self.quoted(quote)?;
                    if let Some(NodeKind::DeclarationOpener { system_literals, .. }) =
                        self.doc.kind_mut(id)
                    {
                        system_literals.push(literal);
                    }
                }
                _ => {
                    let (name, value) = self.attribute(start, flavor)?;
                    if name.is_empty() {
                        // Nothing consumed: leave the token to the terminator check.
                        if self.pos == item_start {
                            break;
                        }
                        continue;
                    }
                    self.with_element(id, |el| el.set_attr(name, value));
                }
            }
            self.skip_whitespace();
        }
        Ok(())
    }

    /// `name`, `name="value"` or `name='value'`.
    fn attribute(&mut self, start: usize, flavor: TagFlavor) -> Result<(&'a str, Option<Cow<'a, str>>), ParseError> {
        self.skip_whitespace();
        let name_start = self.pos;
        let mut colon_seen = false;

        while let Some(b) = self.current() {
            if is_name_byte(b) {
                self.advance();
            } else if b == b':' {
                if colon_seen {
                    return Err(self.error_at(
                        self.pos,
                        ErrorCode::IllegalNamespacePrefix,
                        "multiple colons in attribute name",
                    ));
                }
                colon_seen = true;
                if !self.peek(1).is_some_and(|c| c.is_ascii_alphabetic()) {
                    return Err(self.error_at(
                        self.pos,
                        ErrorCode::MissingTagNameAfterNamespacePrefix,
                        "namespace prefix must be followed by an attribute name",
                    ));
                }
                self.advance();
            } else {
                break;
            }
        }
        let name = &self.source[name_start..self.pos];

        self.skip_whitespace();
        if !self.current_matches(b'=') {
            return Ok((name, None));
        }
        self.advance();
        self.skip_whitespace();

        match self.current() {
            Some(quote @ (b'"' | b'\'')) => Ok((name, Some(self.quoted(quote)?))),
            None => Err(self.unterminated(start, flavor.describe())),
            Some(_) => Err(self.unexpected_here("quoted attribute value")),
        }
    }

    /// Quoted value or system literal starting at the opening quote.
    ///
    /// A backslash before the quote character yields a literal quote; every
    /// other character is taken verbatim.
    fn quoted(&mut self, quote: u8) -> Result<Cow<'a, str>, ParseError> {
        let open = self.pos;
        self.advance();
        let mut chunk_start = self.pos;
        let mut owned: Option<String> = None;

        loop {
            let Some(i) = memchr2(quote, b'\\', &self.bytes[self.pos..]) else {
                return Err(self.unterminated(open, "quoted value"));
            };
            self.pos += i;

            if self.current_matches(quote) {
                let tail = &self.source[chunk_start..self.pos];
                self.advance();
                return Ok(match owned {
                    Some(mut buf) => {
                        buf.push_str(tail);
                        Cow::Owned(buf)
                    }
                    None => Cow::Borrowed(tail),
                });
            }

            // At a backslash.
            if self.peek(1) == Some(quote) {
                let buf = owned.get_or_insert_with(String::new);
                buf.push_str(&self.source[chunk_start..self.pos]);
                buf.push(quote as char);
                self.pos += 2;
                chunk_start = self.pos;
            } else {
                self.advance();
            }
        }
    }

    /// `/>`, `?>` or `>`, then settle the node's shape and the cursor.
    fn tag_terminator(&mut self, id: NodeId, start: usize, flavor: TagFlavor) -> Result<(), ParseError> {
        let at = self.pos;
        match (self.current(), self.peek(1)) {
            (Some(b'/'), Some(b'>')) => {
                if flavor == TagFlavor::Element {
                    self.check_self_close(id, at)?;
                }
                self.pos += 2;
                Ok(())
            }
            (Some(b'?'), Some(b'>')) if flavor == TagFlavor::ProcessingInstruction => {
                self.pos += 2;
                Ok(())
            }
            (Some(b'>'), _) => {
                self.advance();
                if flavor == TagFlavor::Element {
                    self.open_element(id, at)?;
                }
                Ok(())
            }
            (None, _) | (Some(b'/' | b'?'), None) => Err(self.unterminated(start, flavor.describe())),
            _ => {
                let expected = match flavor {
                    TagFlavor::ProcessingInstruction => "'?>' or '>'",
                    _ => "'>' or '/>'",
                };
                Err(self.unexpected_here(&format!(
                    "{} to end the {}",
                    expected,
                    flavor.describe()
                )))
            }
        }
    }

    fn check_self_close(&self, id: NodeId, at: usize) -> Result<(), ParseError> {
        let Some(el) = self.doc.kind(id).and_then(NodeKind::element) else {
            return Ok(());
        };
        if self.options.rules.allowed_close_modes(&el.name).contains(CloseMode::SELF_CLOSE) {
            return Ok(());
        }
        Err(self.error_at(
            at,
            ErrorCode::SelfCloseNotAllowed,
            format!("<{}> may not self-close", el.qualified_name()),
        ))
    }

    /// An element opener ended in `>`: promote it and descend if end tags are
    /// allowed, otherwise settle it as void.
    fn open_element(&mut self, id: NodeId, at: usize) -> Result<(), ParseError> {
        let Some(el) = self.doc.kind(id).and_then(NodeKind::element) else {
            return Ok(());
        };
        let modes = self.options.rules.allowed_close_modes(&el.name);

        if modes.contains(CloseMode::TAG) {
            // Only tentative nodes attached to the cursor reach this point.
            let promoted = self.doc.promote(id);
            debug_assert!(promoted.is_ok(), "promoting {:?}: {:?}", id, promoted);
            if let Ok(container) = promoted {
                trace!("promoted {:?} -> {:?}, descending", id, container);
                self.cursor = container;
            }
            Ok(())
        } else if modes.contains(CloseMode::VOID) {
            trace!("settled {:?} as void", id);
            let settled = self.doc.settle_void(id);
            debug_assert!(settled.is_ok(), "settling {:?}: {:?}", id, settled);
            Ok(())
        } else {
            Err(self.error_at(
                at,
                ErrorCode::CloseTagNotAllowed,
                format!("<{}> must self-close", el.qualified_name()),
            ))
        }
    }
}
