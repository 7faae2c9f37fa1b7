/// One event block cut out of a catalog, borrowed from the catalog text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    /// Position among the non-empty blocks of the catalog.
    pub index: usize,
    /// 1-based catalog line of the block's first non-blank line.
    pub line: usize,
    pub text: &'a str,
}

/// A delimiter line holds nothing but a one or two digit counter.
fn is_delimiter(line: &str) -> bool {
    let trimmed = line.trim();
    (1..=2).contains(&trimmed.len()) && trimmed.bytes().all(|b| b.is_ascii_digit())
}

/// Splits catalog text into event blocks on delimiter lines.
///
/// Delimiters are discarded and blocks holding only whitespace are dropped.
pub fn segment(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut open: Option<(usize, usize)> = None;
    let mut end = 0;
    let mut offset = 0;

    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        if is_delimiter(raw) {
            if let Some((start, line)) = open.take() {
                push_block(&mut blocks, &text[start..end], line);
            }
        } else if !raw.trim().is_empty() || open.is_some() {
            if open.is_none() {
                open = Some((offset, idx + 1));
            }
            end = offset + raw.len();
        }
        offset += raw.len();
    }

    if let Some((start, line)) = open {
        push_block(&mut blocks, &text[start..end], line);
    }
    blocks
}

fn push_block<'a>(blocks: &mut Vec<Block<'a>>, text: &'a str, line: usize) {
    if text.trim().is_empty() {
        return;
    }
    blocks.push(Block {
        index: blocks.len(),
        line,
        text,
    });
}
