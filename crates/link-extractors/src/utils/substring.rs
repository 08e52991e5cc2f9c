/// Forward-only scanner over a text.
///
/// The cursor only ever advances, so pulling several fields out of one text
/// scans it once. A failed lookup leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct SubstringExtractor<'a> {
    text: &'a str,
    cursor: usize,
}

impl<'a> SubstringExtractor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, cursor: 0 }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> &'a str {
        &self.text[self.cursor..]
    }

    /// Moves the cursor just past the next `marker`.
    pub fn skip_to(&mut self, marker: &str) -> bool {
        match self.remaining().find(marker) {
            Some(index) => {
                self.cursor += index + marker.len();
                true
            }
            None => false,
        }
    }

    /// Text from the cursor up to the next `end`; the cursor moves past `end`.
    pub fn substring_before(&mut self, end: &str) -> Option<&'a str> {
        let rest = self.remaining();
        let index = rest.find(end)?;
        self.cursor += index + end.len();
        Some(&rest[..index])
    }

    /// Text between the next `start` and the `end` following it.
    pub fn substring_between(&mut self, start: &str, end: &str) -> Option<&'a str> {
        let saved = self.cursor;
        if !self.skip_to(start) {
            return None;
        }
        let found = self.substring_before(end);
        if found.is_none() {
            self.cursor = saved;
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_pulled_in_order() {
        let text = r#"a.sub="x.vtt";a.url="//cdn/v.mp4";a.url="//cdn/other.mp4";"#;
        let mut extractor = SubstringExtractor::new(text);

        assert_eq!(extractor.substring_between("sub=\"", "\""), Some("x.vtt"));
        assert_eq!(extractor.substring_between("url=\"", "\""), Some("//cdn/v.mp4"));
        assert_eq!(
            extractor.substring_between("url=\"", "\""),
            Some("//cdn/other.mp4")
        );
        assert_eq!(extractor.substring_between("url=\"", "\""), None);
    }

    #[test]
    fn cursor_never_moves_back() {
        let text = "first=1;second=2;";
        let mut extractor = SubstringExtractor::new(text);

        assert!(extractor.skip_to("second="));
        let position = extractor.position();
        // Earlier content is not rescanned.
        assert_eq!(extractor.substring_between("first=", ";"), None);
        assert_eq!(extractor.position(), position);
        assert_eq!(extractor.substring_before(";"), Some("2"));
        assert_eq!(extractor.remaining(), "");
    }

    #[test]
    fn unterminated_field_keeps_cursor() {
        let mut extractor = SubstringExtractor::new(r#"x="open"#);
        assert_eq!(extractor.substring_between("x=\"", "\""), None);
        assert_eq!(extractor.position(), 0);
    }
}
