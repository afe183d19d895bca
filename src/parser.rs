use crate::srt::{Block, Subtitle};

use nom::bytes::complete::{tag, take_until, take_while, take_while_m_n};
use nom::character::complete::{char, digit1};
use nom::combinator::{recognize, rest, verify};
use nom::sequence::{terminated, tuple};
use nom::IResult;

/// Splits a document into its blocks. Any run of two or more newlines
/// separates two blocks; the separators themselves are not yielded.
///
/// The iterator is cheap to clone, so a document can be walked more than once.
pub fn split_blocks(input: &str) -> Blocks<'_> {
    Blocks { rest: Some(input) }
}

#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    rest: Option<&'a str>,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let input = self.rest?;
        match until_separator(input) {
            Ok((remaining, block)) => {
                self.rest = Some(remaining);
                Some(block)
            }
            Err(_) => {
                self.rest = None;
                Some(input)
            }
        }
    }
}

fn until_separator(input: &str) -> IResult<&str, &str> {
    terminated(take_until("\n\n"), separator)(input)
}

fn separator(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("\n\n"), take_while(|c: char| c == '\n'))))(input)
}

/// Matches one block against the subtitle shape: an index line, a
/// `start --> end` timing line and at least one character of text.
/// Anything else comes back as [`Block::Opaque`] carrying the input as is.
pub fn parse_block(input: &str) -> Block<'_> {
    match subtitle(input) {
        Ok((_, sub)) => Block::Subtitle(sub),
        Err(_) => Block::Opaque(input),
    }
}

fn subtitle(input: &str) -> IResult<&str, Subtitle<'_>> {
    let (input, index) = terminated(digit1, char('\n'))(input)?;
    let (input, (start, end)) = terminated(show_hide, char('\n'))(input)?;
    let (input, text) = sub_text(input)?;

    Ok((
        input,
        Subtitle {
            index,
            start,
            end,
            text,
        },
    ))
}

// The text runs to the end of the block, embedded newlines included.
fn sub_text(input: &str) -> IResult<&str, &str> {
    verify(rest, |s: &str| !s.is_empty())(input)
}

fn show_hide(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, show_at) = timestamp(input)?;
    let (input, _) = tag(" --> ")(input)?;
    let (input, hide_at) = timestamp(input)?;

    Ok((input, (show_at, hide_at)))
}

/// `HH:MM:SS,mmm`, recognised but never converted to a number.
fn timestamp(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        digits::<2>,
        char(':'),
        digits::<2>,
        char(':'),
        digits::<2>,
        char(','),
        digits::<3>,
    )))(input)
}

fn digits<const N: usize>(input: &str) -> IResult<&str, &str> {
    take_while_m_n(N, N, |c: char| c.is_ascii_digit())(input)
}
