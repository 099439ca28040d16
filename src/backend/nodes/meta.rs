//! Per-node metadata: source span and instrumentation tags.

use std::fmt;

/// Byte range of the source text a node was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start: u32,
    pub len: u32,
}

impl SourceSpan {
    pub const fn new(start: u32, len: u32) -> Self {
        SourceSpan { start, len }
    }

    /// One past the last offset, clamped at `u32::MAX`
    pub const fn end(&self) -> u32 {
        self.start.saturating_add(self.len)
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

/// Instrumentation tags requested by tooling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Root = 0,
    Statement = 1,
    Expression = 2,
    Call = 3,
    Literal = 4,
    ReadVariable = 5,
    WriteVariable = 6,
    BinaryOperation = 7,
    ReadElementExpression = 8,
    WriteElementExpression = 9,
}

impl Tag {
    pub const ALL: [Tag; 10] = [
        Tag::Root,
        Tag::Statement,
        Tag::Expression,
        Tag::Call,
        Tag::Literal,
        Tag::ReadVariable,
        Tag::WriteVariable,
        Tag::BinaryOperation,
        Tag::ReadElementExpression,
        Tag::WriteElementExpression,
    ];

    #[inline]
    const fn bit(self) -> u16 {
        1 << self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Tag::Root => "root",
            Tag::Statement => "statement",
            Tag::Expression => "expression",
            Tag::Call => "call",
            Tag::Literal => "literal",
            Tag::ReadVariable => "read-variable",
            Tag::WriteVariable => "write-variable",
            Tag::BinaryOperation => "binary-operation",
            Tag::ReadElementExpression => "read-element",
            Tag::WriteElementExpression => "write-element",
        }
    }
}

/// Immutable set of [`Tag`]s
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TagSet(u16);

impl TagSet {
    pub const EMPTY: TagSet = TagSet(0);

    pub const fn of(tag: Tag) -> Self {
        TagSet(tag.bit())
    }

    /// Copy of this set with `tag` added
    pub const fn with(self, tag: Tag) -> Self {
        TagSet(self.0 | tag.bit())
    }

    pub const fn union(self, other: TagSet) -> Self {
        TagSet(self.0 | other.0)
    }

    pub const fn contains(self, tag: Tag) -> bool {
        self.0 & tag.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Tag> {
        Tag::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        iter.into_iter().fold(TagSet::EMPTY, TagSet::with)
    }
}

impl fmt::Debug for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Tag::name).collect();
        write!(f, "{{{}}}", names.join(","))
    }
}

/// Metadata carried by every node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeMeta {
    pub span: Option<SourceSpan>,
    pub tags: TagSet,
    /// Set on subtrees produced by materialization
    pub materialized: bool,
}
