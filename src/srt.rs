/// One entry of a SubRip document, as found by the block parser.
///
/// Index and timestamps are kept as the exact slices of the input they were
/// matched from, so they are always re-emitted verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block<'a> {
    Subtitle(Subtitle<'a>),
    /// A block that does not have the subtitle shape. Written back untouched.
    Opaque(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subtitle<'a> {
    pub(crate) index: &'a str,
    pub(crate) start: &'a str,
    pub(crate) end: &'a str,
    pub(crate) text: &'a str,
}

pub const BOM: char = '\u{FEFF}';
