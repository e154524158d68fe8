use std::collections::HashSet;

/// Maximum length of one archive path segment, in bytes
pub const MAX_SEGMENT_LEN: usize = 255;

/// Sanitizes one archive path segment (a folder or file name).
/// Path separators and reserved characters become `_`, leading dots are
/// stripped so no entry turns into a hidden file or a `..` traversal.
pub fn sanitize_segment(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_control()
                || c == '/'
                || c == '\\'
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    let sanitized = sanitized.trim_start_matches('.').to_string();

    // Limit length safely for UTF-8
    let sanitized = if sanitized.len() > MAX_SEGMENT_LEN {
        let mut end = MAX_SEGMENT_LEN;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized
    }
}

/// Joins sanitized segments into a forward-slash archive path.
pub fn archive_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| sanitize_segment(s.as_ref()))
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns `path`, or `path` with a ` (n)` suffix before the extension when
/// it was already taken. The returned name is recorded in `taken`.
pub fn unique_entry_name(taken: &mut HashSet<String>, path: &str) -> String {
    if taken.insert(path.to_string()) {
        return path.to_string();
    }

    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (format!("{}/", dir), file),
        None => (String::new(), path),
    };
    let (stem, ext) = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
        _ => (file, String::new()),
    };

    let mut n = 2;
    loop {
        let candidate = format!("{}{} ({}){}", dir, stem, n, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
