/// Minimal multipart/form-data parsing for file uploads.

/// Returns the index of the first occurrence of `needle` in `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits `haystack` on every occurrence of `needle`, returning the pieces
/// between occurrences (excluding the needle itself).
pub fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut result = Vec::new();
    let mut start = 0;
    while start <= haystack.len() {
        if let Some(pos) = find_subsequence(&haystack[start..], needle) {
            result.push(&haystack[start..start + pos]);
            start += pos + needle.len();
        } else {
            result.push(&haystack[start..]);
            break;
        }
    }
    result
}

/// Extracts the boundary token from a Content-Type header value like
/// `multipart/form-data; boundary=----WebKitFormBoundaryXXX`.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(|s| s.trim())
        .find(|s| s.get(..9).map_or(false, |k| k.eq_ignore_ascii_case("boundary=")))
        .map(|s| s["boundary=".len()..].trim_matches('"').to_owned())
        .filter(|b| !b.is_empty())
}

/// One file part: the form field name and the raw bytes.
struct FilePart<'a> {
    name: Option<String>,
    data: &'a [u8],
}

fn file_parts<'a>(body: &'a [u8], boundary: &str) -> Vec<FilePart<'a>> {
    let delimiter = format!("--{}", boundary);
    let sep = b"\r\n\r\n";

    split_on(body, delimiter.as_bytes())
        .into_iter()
        .filter_map(|part| {
            let sep_pos = find_subsequence(part, sep)?;
            let headers = String::from_utf8_lossy(&part[..sep_pos]);
            if !headers.to_ascii_lowercase().contains("filename=") {
                return None;
            }
            let raw = &part[sep_pos + sep.len()..];
            Some(FilePart {
                name: parse_disposition_name(&headers),
                data: raw.strip_suffix(b"\r\n").unwrap_or(raw),
            })
        })
        .collect()
}

/// Returns the bytes of the file part named `field_name`, or of the first
/// file part when no part carries that name.
pub fn extract_upload(body: &[u8], boundary: &str, field_name: &str) -> Option<Vec<u8>> {
    let parts = file_parts(body, boundary);
    parts.iter()
        .find(|p| p.name.as_deref() == Some(field_name))
        .or_else(|| parts.first())
        .map(|p| p.data.to_vec())
}

/// Parses the `name="..."` value from a Content-Disposition header string.
fn parse_disposition_name(headers: &str) -> Option<String> {
    // Skip `filename="..."`, which also ends in `name="`.
    let lower = headers.to_ascii_lowercase();
    let key = " name=\"";
    let pos = lower.find(key).or_else(|| lower.find(";name=\""))?;
    let rest = &headers[pos + key.len()..];
    let end = rest.find('"')?;
    Some(rest[..end].to_owned())
}
