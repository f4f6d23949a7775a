use serde::Serialize;

pub const NAME_PREFIX: &str = "[name]";

/// Lookup key handed out for character names instead of the name itself.
pub const CHARACTER_NAME_KEY: &str = "character_name";

const PUNCTUATION: [char; 6] = ['.', ',', '?', '!', ';', ':'];
const QUOTES: [char; 2] = ['\'', '"'];

/// One space-delimited unit of story text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub raw: String,
    pub display: String,
    pub is_name: bool,
    pub is_punctuation: bool,
}

/// What a click on a token should resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupTarget {
    CharacterName,
    Word(String),
    /// Nothing left to look up once decoration is stripped.
    Nothing,
}

impl Token {
    pub fn new(raw: &str) -> Self {
        let stripped = raw.strip_prefix(NAME_PREFIX);
        let display = stripped.unwrap_or(raw);

        Token {
            raw: raw.to_string(),
            display: display.to_string(),
            is_name: stripped.is_some(),
            is_punctuation: is_punctuation(display),
        }
    }

    /// Key used for dictionary lookup. Names always map to
    /// [`CHARACTER_NAME_KEY`].
    pub fn lookup_key(&self) -> String {
        if self.is_name {
            CHARACTER_NAME_KEY.to_string()
        } else {
            normalize_word(&self.display)
        }
    }

    pub fn lookup_target(&self) -> LookupTarget {
        if self.is_name {
            return LookupTarget::CharacterName;
        }
        let key = normalize_word(&self.display);
        if key.is_empty() {
            LookupTarget::Nothing
        } else {
            LookupTarget::Word(key)
        }
    }
}

/// True for a token made of exactly one punctuation character.
pub fn is_punctuation(word: &str) -> bool {
    let mut chars = word.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if PUNCTUATION.contains(&c))
}

/// Strips the name tag, punctuation and straight quotes from a word.
pub fn normalize_word(word: &str) -> String {
    let word = word.strip_prefix(NAME_PREFIX).unwrap_or(word);
    word.chars()
        .filter(|c| !PUNCTUATION.contains(c) && !QUOTES.contains(c))
        .collect()
}

/// Splits story text on spaces, dropping empty pieces.
pub fn tokenize(text: &str) -> Vec<Token> {
    text.split(' ')
        .filter(|word| !word.is_empty())
        .map(Token::new)
        .collect()
}

/// Tokens to render. Standalone punctuation is dropped unless `spaced`.
pub fn render_tokens(text: &str, spaced: bool) -> Vec<Token> {
    tokenize(text)
        .into_iter()
        .filter(|token| spaced || !token.is_punctuation)
        .collect()
}

/// Resolves a clicked word the same way a rendered token would be.
pub fn lookup_target_for(word: &str) -> LookupTarget {
    Token::new(word.trim()).lookup_target()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "[name]สมชาย เดิน ไป .";

    #[test]
    fn spaced_rendering_keeps_punctuation() {
        let tokens = render_tokens(SENTENCE, true);
        assert_eq!(tokens.len(), 4);

        assert!(tokens[0].is_name);
        assert_eq!(tokens[0].display, "สมชาย");
        assert_eq!(tokens[1].display, "เดิน");
        assert_eq!(tokens[2].display, "ไป");
        assert!(!tokens[1].is_name && !tokens[1].is_punctuation);
        assert!(tokens[3].is_punctuation);
        assert_eq!(tokens[3].display, ".");
    }

    #[test]
    fn connected_rendering_drops_standalone_punctuation() {
        let displays: Vec<String> = render_tokens(SENTENCE, false)
            .into_iter()
            .map(|t| t.display)
            .collect();
        assert_eq!(displays, vec!["สมชาย", "เดิน", "ไป"]);
    }

    #[test]
    fn name_token_looks_up_the_sentinel() {
        let token = Token::new("[name]สมชาย");
        assert_eq!(token.lookup_key(), CHARACTER_NAME_KEY);
        assert_eq!(token.lookup_target(), LookupTarget::CharacterName);

        let token = Token::new("[name]สมชาย.");
        assert_eq!(token.lookup_key(), CHARACTER_NAME_KEY);
    }

    #[test]
    fn attached_punctuation_is_stripped_for_lookup() {
        let token = Token::new("ไป.");
        assert!(!token.is_punctuation);
        assert_eq!(token.display, "ไป.");
        assert_eq!(token.lookup_key(), "ไป");
    }

    #[test]
    fn quotes_are_stripped_for_lookup() {
        assert_eq!(Token::new("\"สวัสดี!\"").lookup_key(), "สวัสดี");
        assert_eq!(Token::new("'ครับ'").lookup_key(), "ครับ");
    }

    #[test]
    fn punctuation_classification_requires_a_single_mark() {
        for mark in [".", ",", "?", "!", ";", ":"] {
            assert!(is_punctuation(mark), "{mark}");
        }
        assert!(!is_punctuation(".."));
        assert!(!is_punctuation("\""));
        assert!(!is_punctuation("ๆ"));
        assert!(!is_punctuation(""));
    }

    #[test]
    fn standalone_punctuation_has_nothing_to_look_up() {
        assert_eq!(Token::new("?").lookup_target(), LookupTarget::Nothing);
        assert_eq!(Token::new("?").lookup_key(), "");
    }

    #[test]
    fn repeated_spaces_do_not_produce_empty_tokens() {
        let tokens = tokenize("  คุณ   เดิน  ");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn newlines_stay_inside_tokens() {
        let tokens = tokenize("จบ.\n\nเริ่ม");
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn tokenizing_is_repeatable() {
        assert_eq!(tokenize(SENTENCE), tokenize(SENTENCE));
    }

    #[test]
    fn clicked_word_resolves_like_a_token() {
        assert_eq!(lookup_target_for(" [name]อ๊อด "), LookupTarget::CharacterName);
        assert_eq!(lookup_target_for("บ้าน,"), LookupTarget::Word("บ้าน".to_string()));
        assert_eq!(lookup_target_for("."), LookupTarget::Nothing);
    }
}
