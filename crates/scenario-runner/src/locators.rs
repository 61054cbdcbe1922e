//! Page-object locators for the portal login form and the task board

use crate::error::{RunnerError, RunnerResult};
use crate::session::Locator;

pub mod login {
    use crate::session::Locator;

    pub fn username_input() -> Locator {
        Locator::Css("#username".to_string())
    }

    pub fn password_input() -> Locator {
        Locator::Css("#password".to_string())
    }

    pub fn sign_in_button() -> Locator {
        Locator::XPath("//button".to_string())
    }
}

/// Board columns addressable from a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Todo,
    InProgress,
    Review,
    Done,
}

impl Column {
    pub fn parse(name: &str) -> RunnerResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "todo" => Ok(Column::Todo),
            "in-progress" => Ok(Column::InProgress),
            "review" => Ok(Column::Review),
            "done" => Ok(Column::Done),
            _ => Err(RunnerError::UnknownSection(name.to_string())),
        }
    }

    /// Heading rendered at the top of the column
    pub fn heading(&self) -> &'static str {
        match self {
            Column::Todo => "To Do",
            Column::InProgress => "In Progress",
            Column::Review => "Review",
            Column::Done => "Done",
        }
    }

    /// Container element holding the column's cards
    pub fn container(&self) -> String {
        format!("//div[h2[normalize-space(text())={}]]", xpath_literal(self.heading()))
    }

    pub fn item_titles(&self) -> Locator {
        Locator::XPath(format!("{}//h3", self.container()))
    }

    pub fn item_title(&self, title: &str) -> Locator {
        Locator::XPath(format!("{}//h3[{}]", self.container(), text_equals(title)))
    }

    /// Tag labels in the container that directly follows a card's title
    pub fn item_tags(&self, title: &str) -> Locator {
        Locator::XPath(format!(
            "{}//h3[{}]/following-sibling::*[1][self::div]//span",
            self.container(),
            text_equals(title)
        ))
    }
}

/// Clickable control whose nested heading reads `section`
pub fn section_button(section: &str) -> Locator {
    Locator::XPath(format!("//button[.//h2[{}]]", text_equals(section)))
}

fn text_equals(text: &str) -> String {
    format!("normalize-space(text())={}", xpath_literal(&normalize_space(text)))
}

/// Collapse runs of whitespace the way XPath `normalize-space` does.
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Quote `text` as an XPath 1.0 string literal.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }

    let parts: Vec<String> = text.split('\'').map(|part| format!("'{}'", part)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}
