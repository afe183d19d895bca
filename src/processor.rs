use crate::parser::{parse_block, split_blocks};
use crate::serialiser::{assemble, render_block};
use crate::srt::{Block, BOM};
use crate::wrap::rewrap;

use std::borrow::Cow;

use tracing::debug;

pub const DEFAULT_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy)]
pub struct WrapOpts {
    pub width: usize,
}

impl Default for WrapOpts {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
        }
    }
}

#[derive(Debug)]
pub struct Processed {
    pub text: String,
    pub subtitles: usize,
    pub opaque: usize,
}

/// Rewraps the text of every subtitle in a document.
///
/// Blocks that are not subtitles are carried over unchanged. Line endings are
/// normalised to `\n`; a leading byte order mark and the newlines ending the
/// document are kept.
pub fn process(input: &str, opts: WrapOpts) -> Processed {
    let (bom, input) = match input.strip_prefix(BOM) {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let input = normalise_line_endings(input);
    let body = input.trim_end_matches('\n');
    let tail = &input[body.len()..];

    let mut subtitles = 0;
    let mut opaque = 0;
    let blocks = split_blocks(body).map(|raw| match parse_block(raw) {
        Block::Subtitle(sub) => {
            subtitles += 1;
            render_block(&sub, &rewrap(sub.text, opts.width))
        }
        Block::Opaque(raw) => {
            opaque += 1;
            if !raw.trim().is_empty() {
                debug!(block = raw, "Passing through unrecognised block");
            }
            raw.to_string()
        }
    });
    let body = assemble(blocks);

    let mut text = String::with_capacity(body.len() + tail.len() + BOM.len_utf8());
    if bom {
        text.push(BOM);
    }
    text.push_str(&body);
    text.push_str(tail);

    Processed {
        text,
        subtitles,
        opaque,
    }
}

fn normalise_line_endings(input: &str) -> Cow<'_, str> {
    if input.contains('\r') {
        Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(input)
    }
}
