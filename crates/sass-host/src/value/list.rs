use super::Value;
use crate::{Error, Result};

/// The separator a list was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ListSeparator {
    #[default]
    Comma,
    Space,
    Slash,
    /// A list that hasn't committed to a separator. Only single-element and
    /// empty lists may be undecided.
    Undecided,
}

/// An ordered, optionally bracketed list of values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SassList {
    contents: Vec<Value>,
    separator: ListSeparator,
    brackets: bool,
}

impl SassList {
    /// Errors if `separator` is [`ListSeparator::Undecided`] and the list
    /// has two or more elements.
    pub fn new(contents: Vec<Value>, separator: ListSeparator, brackets: bool) -> Result<Self> {
        if separator == ListSeparator::Undecided && contents.len() > 1 {
            return Err(Error::InvalidOption(
                "a list with more than one element must have a decided separator".to_string(),
            ));
        }
        Ok(Self {
            contents,
            separator,
            brackets,
        })
    }

    pub fn empty() -> Self {
        Self {
            contents: Vec::new(),
            separator: ListSeparator::Undecided,
            brackets: false,
        }
    }

    pub fn elements(&self) -> &[Value] {
        &self.contents
    }

    pub fn separator(&self) -> ListSeparator {
        self.separator
    }

    pub fn has_brackets(&self) -> bool {
        self.brackets
    }
}

impl From<SassList> for Value {
    fn from(list: SassList) -> Self {
        Value::List(list)
    }
}
