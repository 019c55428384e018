/// A whitespace-separated row that remembers its exact separators, so
/// rewriting one column leaves the layout of every other column intact.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenRow {
    // separators[i] precedes tokens[i]; the final entry trails the last token
    separators: Vec<String>,
    tokens: Vec<String>,
}

impl TokenRow {
    pub fn parse(line: &str) -> Self {
        let mut separators = Vec::new();
        let mut tokens = Vec::new();
        let mut separator = String::new();
        let mut token = String::new();

        for character in line.chars() {
            if character.is_whitespace() {
                if !token.is_empty() {
                    tokens.push(std::mem::take(&mut token));
                }
                separator.push(character);
            } else {
                if token.is_empty() {
                    separators.push(std::mem::take(&mut separator));
                }
                token.push(character);
            }
        }
        if !token.is_empty() {
            tokens.push(token);
        }
        separators.push(separator);

        Self { separators, tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Replaces a token in place. Returns `false` when the column is absent.
    pub fn set(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.tokens.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn render(&self) -> String {
        let mut rendered = String::new();
        for (separator, token) in self.separators.iter().zip(&self.tokens) {
            rendered.push_str(separator);
            rendered.push_str(token);
        }
        if let Some(trailing) = self.separators.last() {
            rendered.push_str(trailing);
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::TokenRow;

    #[test]
    fn render_preserves_irregular_spacing() {
        let line = "  1.5\t 1   2.365  0 ";
        let row = TokenRow::parse(line);
        assert_eq!(row.len(), 4);
        assert_eq!(row.token(2), Some("2.365"));
        assert_eq!(row.render(), line);
    }

    #[test]
    fn set_rewrites_only_the_target_column() {
        let mut row = TokenRow::parse("1.5  1    2.365  0");
        assert!(row.set(2, "2.4"));
        assert!(!row.set(9, "x"));
        assert_eq!(row.render(), "1.5  1    2.4  0");
    }

    #[test]
    fn blank_line_has_no_tokens() {
        let row = TokenRow::parse("   ");
        assert!(row.is_empty());
        assert_eq!(row.render(), "   ");
        assert_eq!(TokenRow::parse("").render(), "");
    }
}
