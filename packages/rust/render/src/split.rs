//! Message chunking for size-limited chat APIs.

/// Split `text` into chunks of at most `limit` characters.
///
/// Chunks break on line boundaries. A single line longer than `limit` is
/// hard-split on character boundaries. Blank lines at a chunk boundary are
/// dropped.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.lines() {
        let line_len = line.chars().count();

        if line_len > limit {
            flush(&mut chunks, &mut current, &mut current_len);
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if current_len == 0 {
            if line.is_empty() {
                continue;
            }
            current.push_str(line);
            current_len = line_len;
        } else if current_len + 1 + line_len <= limit {
            current.push('\n');
            current.push_str(line);
            current_len += 1 + line_len;
        } else {
            flush(&mut chunks, &mut current, &mut current_len);
            if !line.is_empty() {
                current.push_str(line);
                current_len = line_len;
            }
        }
    }

    flush(&mut chunks, &mut current, &mut current_len);
    chunks
}

fn flush(chunks: &mut Vec<String>, current: &mut String, current_len: &mut usize) {
    let trimmed = current.trim_end_matches('\n');
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
    *current_len = 0;
}
