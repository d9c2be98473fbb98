//! Email list parser with encoding auto-detection.
//!
//! Accepts either a bare list of emails (one per line) or a multi-column
//! CSV whose first column holds the email. An optional header line is
//! recognised when it mentions "email".

use std::path::Path;

use crate::error::{ParseError, ParseResult};

/// File extensions accepted for upload.
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// A raw email extracted from the file, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Trimmed, unquoted, lower-cased first field of the line.
    pub email: String,
    /// 1-based physical line number, header included.
    pub line_number: usize,
}

/// Result of parsing a file, with metadata.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Candidates in file order
    pub candidates: Vec<Candidate>,
    /// Detected or used encoding
    pub encoding: String,
    /// Whether the first line was skipped as a header
    pub has_header: bool,
    /// Physical lines in the file, blank ones included
    pub line_count: usize,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the given encoding.
///
/// Labels unknown to `encoding_rs` are only accepted when the bytes are
/// valid UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> ParseResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned()),
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8(bytes.to_vec())
                .map_err(|_| ParseError::Encoding(format!("unsupported encoding '{}'", other)))?,
        },
    };

    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Reject anything that is not a `.csv` or `.txt` file.
pub fn check_file_type(file_name: &str) -> ParseResult<()> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ParseError::UnsupportedFileType(file_name.to_string())),
    }
}

/// True when the line names an email column.
fn is_header(line: &str) -> bool {
    line.to_lowercase().contains("email")
}

/// Extract the candidate email of one data line, if any.
fn first_field(line: &str) -> Option<String> {
    let field = line.split(',').next().unwrap_or("");
    let email = field
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase();

    if email.is_empty() {
        None
    } else {
        Some(email)
    }
}

fn split_lines(content: &str) -> Vec<&str> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Parse text content into an ordered list of candidate emails.
///
/// # Example
/// ```ignore
/// use rosterload::parse_emails;
///
/// let candidates = parse_emails("email\nAlice@Example.com\n\nbob@example.com,Bob").unwrap();
///
/// assert_eq!(candidates.len(), 2);
/// assert_eq!(candidates[0].email, "alice@example.com");
/// assert_eq!(candidates[1].line_number, 4);
/// ```
pub fn parse_emails(content: &str) -> ParseResult<Vec<Candidate>> {
    parse_content(content).map(|(candidates, _, _)| candidates)
}

fn parse_content(content: &str) -> ParseResult<(Vec<Candidate>, bool, usize)> {
    let lines = split_lines(content);
    let has_header = lines.first().is_some_and(|line| is_header(line));
    let skip = usize::from(has_header);

    let candidates: Vec<Candidate> = lines
        .iter()
        .enumerate()
        .skip(skip)
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| {
            first_field(line).map(|email| Candidate {
                email,
                line_number: idx + 1,
            })
        })
        .collect();

    if candidates.is_empty() {
        return Err(ParseError::NoEmailsFound);
    }

    Ok((candidates, has_header, lines.len()))
}

/// Parse raw file bytes with encoding auto-detection.
pub fn parse_bytes_auto(bytes: &[u8]) -> ParseResult<ParsedFile> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let (candidates, has_header, line_count) = parse_content(&content)?;

    Ok(ParsedFile {
        candidates,
        encoding,
        has_header,
        line_count,
    })
}

/// Read and parse a file from disk after checking its extension.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> Result<ParsedFile, Box<dyn std::error::Error>> {
    let path = path.as_ref();
    check_file_type(&path.to_string_lossy())?;
    let bytes = std::fs::read(path)?;
    Ok(parse_bytes_auto(&bytes)?)
}
