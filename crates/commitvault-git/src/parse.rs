//! Parsers for HEAD contents and `git show --name-status -z` output.

/// What `.git/HEAD` points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadTarget {
    /// `ref: <name>`, e.g. `refs/heads/main`.
    Symbolic(String),
    /// A detached commit id.
    Detached(String),
    /// Anything else; resolve through `git rev-parse HEAD`.
    Unknown,
}

/// Classify the contents of `.git/HEAD`.
pub fn parse_head(content: &str) -> HeadTarget {
    let content = content.trim();
    if let Some(name) = content.strip_prefix("ref: ") {
        return HeadTarget::Symbolic(name.trim().to_string());
    }
    if is_object_id(content) {
        return HeadTarget::Detached(content.to_string());
    }
    HeadTarget::Unknown
}

/// 40 (SHA-1) or 64 (SHA-256) hex digits.
pub fn is_object_id(s: &str) -> bool {
    matches!(s.len(), 40 | 64) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Paths from NUL-separated `--name-status -z` output, in order.
///
/// Renames and copies (`R<score>`, `C<score>`) are followed by two paths and
/// yield the destination. Deletions are skipped. Returns `Err` with a
/// description if the output ends mid-record.
pub fn parse_name_status(output: &[u8]) -> Result<Vec<String>, String> {
    let text = String::from_utf8_lossy(output);
    let mut fields = text.split('\0').filter(|f| !f.trim().is_empty());
    let mut files = Vec::new();

    while let Some(status) = fields.next() {
        let status = status.trim();
        let first = fields
            .next()
            .ok_or_else(|| format!("status '{}' without a path", status))?;

        if status.starts_with('R') || status.starts_with('C') {
            let destination = fields
                .next()
                .ok_or_else(|| format!("status '{}' without a destination path", status))?;
            files.push(destination.to_string());
        } else if status != "D" {
            files.push(first.to_string());
        }
    }

    Ok(files)
}
