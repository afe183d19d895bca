use crate::srt::Subtitle;

/// Separator placed between two blocks of a document.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Writes a subtitle back in canonical form with `text` as its payload.
/// Index and timestamps come out exactly as they were read.
pub fn render_block(sub: &Subtitle<'_>, text: &str) -> String {
    format!("{}\n{} --> {}\n{}", sub.index, sub.start, sub.end, text)
}

/// Joins blocks with a single blank line between each pair.
pub fn assemble<I, S>(blocks: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, block) in blocks.into_iter().enumerate() {
        if i > 0 {
            out.push_str(BLOCK_SEPARATOR);
        }
        out.push_str(block.as_ref());
    }
    out
}
