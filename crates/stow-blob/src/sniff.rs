//! MIME type detection from a short content prefix
//!
//! Callers are expected to pass at most [`SNIFF_LEN`](crate::SNIFF_LEN)
//! bytes; anything past that is ignored.

/// Exact-prefix signatures, checked in order.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"BM", "image/bmp"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"\x00asm", "application/wasm"),
    (b"\x7fELF", "application/octet-stream"),
    (b"ID3", "audio/mpeg"),
    (b"\xff\xfb", "audio/mpeg"),
    (b"OggS", "application/ogg"),
];

/// Case-insensitive HTML openers, matched after leading whitespace.
const HTML_TAGS: &[&str] = &[
    "<!doctype html", "<html", "<head", "<script", "<iframe", "<h1", "<div",
    "<font", "<table", "<a", "<style", "<title", "<b", "<body", "<br", "<p",
    "<!--",
];

/// Detect the MIME type of `data`, a prefix of the content.
///
/// Falls back to `text/plain; charset=utf-8` when the prefix looks like
/// text, and `application/octet-stream` otherwise. An empty prefix is
/// reported as plain text.
pub fn detect(data: &[u8]) -> &'static str {
    if data.is_empty() {
        return "text/plain; charset=utf-8";
    }
    match data {
        [0xef, 0xbb, 0xbf, ..] => return "text/plain; charset=utf-8",
        [0xfe, 0xff, ..] => return "text/plain; charset=utf-16be",
        [0xff, 0xfe, ..] => return "text/plain; charset=utf-16le",
        _ => {}
    }
    let trimmed = trim_start_ws(data);
    for tag in HTML_TAGS {
        if starts_with_ignore_case(trimmed, tag.as_bytes()) {
            return "text/html; charset=utf-8";
        }
    }
    for (magic, mime) in SIGNATURES {
        if data.starts_with(magic) {
            return mime;
        }
    }
    // RIFF containers carry the format tag at offset 8
    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return "image/webp";
    }
    if looks_like_text(data) {
        return "text/plain; charset=utf-8";
    }
    "application/octet-stream"
}

fn trim_start_ws(data: &[u8]) -> &[u8] {
    let n = data
        .iter()
        .take_while(|b| matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .count();
    &data[n..]
}

fn starts_with_ignore_case(data: &[u8], prefix: &[u8]) -> bool {
    data.len() >= prefix.len()
        && data
            .iter()
            .zip(prefix)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

/// A prefix is text when it holds no binary control bytes. Tab, feeds
/// and escape are allowed, the rest of the C0 range is not.
fn looks_like_text(data: &[u8]) -> bool {
    !data.iter().any(|&b| {
        b <= 0x08 || b == 0x0b || (0x0e..=0x1a).contains(&b) || (0x1c..=0x1f).contains(&b)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text() {
        assert_eq!(detect(b"hello\n"), "text/plain; charset=utf-8");
        assert_eq!(detect(b""), "text/plain; charset=utf-8");
        assert_eq!(detect("héllo wörld".as_bytes()), "text/plain; charset=utf-8");
    }

    #[test]
    fn html() {
        assert_eq!(detect(b"  <!DOCTYPE html><html>"), "text/html; charset=utf-8");
        assert_eq!(detect(b"<HTML><body>"), "text/html; charset=utf-8");
    }

    #[test]
    fn magic_bytes() {
        assert_eq!(detect(b"\x89PNG\r\n\x1a\nrest"), "image/png");
        assert_eq!(detect(b"%PDF-1.7"), "application/pdf");
        assert_eq!(detect(b"PK\x03\x04content"), "application/zip");
        assert_eq!(detect(b"\x1f\x8b\x08\x00"), "application/x-gzip");
    }

    #[test]
    fn binary_fallback() {
        assert_eq!(detect(&[0x00, 0x01, 0x02, 0x03]), "application/octet-stream");
        assert_eq!(detect(b"\x7fELF\x02\x01\x01"), "application/octet-stream");
    }

    #[test]
    fn riff_webp() {
        assert_eq!(detect(b"RIFF\x24\x00\x00\x00WEBPVP8 "), "image/webp");
        // a RIFF container that is not webp falls through
        assert_eq!(detect(b"RIFF\x24\x00\x00\x00WAVEfmt "), "application/octet-stream");
    }
}
