/// Reflows `text` into lines of at most `width` characters.
///
/// All existing whitespace, line breaks included, is collapsed first, so the
/// result only depends on the words and the width. Words are packed greedily
/// and never split: a word longer than `width` gets a line of its own.
pub fn rewrap(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n")
}
