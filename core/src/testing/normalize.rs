/// How actual and expected output are reduced before they are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct CompareRule {
    pub remove_spaces: bool,
    pub case_sensitive: bool,
}

impl Default for CompareRule {
    fn default() -> Self {
        Self {
            remove_spaces: false,
            case_sensitive: true,
        }
    }
}

/// Reduces `text` to its comparison form.
///
/// Steps, in order:
/// 1. trim leading/trailing whitespace
/// 2. if `remove_spaces`, delete every whitespace character (interior newlines too)
/// 3. if not `case_sensitive`, lowercase the whole string
pub fn normalize(text: &str, remove_spaces: bool, case_sensitive: bool) -> String {
    let trimmed = text.trim();
    let res: String = if remove_spaces {
        trimmed.chars().filter(|c| !c.is_whitespace()).collect()
    } else {
        trimmed.to_owned()
    };
    if case_sensitive {
        res
    } else {
        res.to_lowercase()
    }
}

pub fn compare(actual: &str, expected: &str, remove_spaces: bool, case_sensitive: bool) -> bool {
    normalize(actual, remove_spaces, case_sensitive)
        == normalize(expected, remove_spaces, case_sensitive)
}

impl CompareRule {
    #[inline]
    pub fn normalize(&self, text: &str) -> String {
        self::normalize(text, self.remove_spaces, self.case_sensitive)
    }

    #[inline]
    pub fn matches(&self, actual: &str, expected: &str) -> bool {
        self::compare(actual, expected, self.remove_spaces, self.case_sensitive)
    }
}
