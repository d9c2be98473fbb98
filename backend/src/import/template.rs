//! Downloadable sample file showing the expected layout.

/// File name offered for the template download
pub const TEMPLATE_FILENAME: &str = "client-import-template.csv";

const PLACEHOLDERS: [&str; 3] = [
    "client1@example.com",
    "client2@example.com",
    "client3@example.com",
];

/// `email` header followed by placeholder addresses.
pub fn template_csv() -> String {
    let mut content = String::from("email\n");
    for placeholder in PLACEHOLDERS {
        content.push_str(placeholder);
        content.push('\n');
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{check_file_type, parse_emails};

    #[test]
    fn test_template_layout() {
        let content = template_csv();
        assert!(content.starts_with("email\n"));
        assert_eq!(content.lines().count(), 4);
    }

    #[test]
    fn test_template_parses() {
        let candidates = parse_emails(&template_csv()).unwrap();
        assert_eq!(candidates.len(), 3);
        assert!(check_file_type(TEMPLATE_FILENAME).is_ok());
    }
}
