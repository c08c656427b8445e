use super::{ListSeparator, Value};
use indexmap::IndexMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The value of a rest argument, carrying positional elements and keyword
/// arguments.
///
/// Reading the keywords flips an accessed bit that is reported back to the
/// compiler with the function call's response, so the compiler knows it
/// must not elide keyword bookkeeping for this call.
#[derive(Debug, Clone)]
pub struct ArgumentList {
    id: u32,
    contents: Vec<Value>,
    keywords: IndexMap<String, Value>,
    separator: ListSeparator,
    keywords_accessed: Arc<AtomicBool>,
}

impl ArgumentList {
    pub fn new(
        contents: Vec<Value>,
        keywords: IndexMap<String, Value>,
        separator: ListSeparator,
    ) -> Self {
        Self::with_id(0, contents, keywords, separator)
    }

    pub(crate) fn with_id(
        id: u32,
        contents: Vec<Value>,
        keywords: IndexMap<String, Value>,
        separator: ListSeparator,
    ) -> Self {
        Self {
            id,
            contents,
            keywords,
            separator,
            keywords_accessed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn elements(&self) -> &[Value] {
        &self.contents
    }

    pub fn separator(&self) -> ListSeparator {
        self.separator
    }

    /// The keyword arguments, keyed by name without the leading `$`.
    /// Reading them marks the list as accessed.
    pub fn keywords(&self) -> &IndexMap<String, Value> {
        self.keywords_accessed.store(true, Ordering::Relaxed);
        &self.keywords
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn keywords_accessed(&self) -> bool {
        self.keywords_accessed.load(Ordering::Relaxed)
    }

    pub(crate) fn accessed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.keywords_accessed)
    }

    /// The keyword map without marking it accessed; conversion back to the
    /// wire shape must not count as the host inspecting the keywords.
    pub(crate) fn keywords_unobserved(&self) -> &IndexMap<String, Value> {
        &self.keywords
    }
}

// The tracking ID and accessed bit are bookkeeping, not part of the value.
impl PartialEq for ArgumentList {
    fn eq(&self, other: &Self) -> bool {
        self.contents == other.contents
            && self.keywords == other.keywords
            && self.separator == other.separator
    }
}

impl Eq for ArgumentList {}

impl Hash for ArgumentList {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.contents.hash(state);
        self.separator.hash(state);
        state.write_usize(self.keywords.len());
        let mut acc = 0u64;
        for entry in &self.keywords {
            let mut hasher = DefaultHasher::new();
            entry.hash(&mut hasher);
            acc ^= hasher.finish();
        }
        state.write_u64(acc);
    }
}

impl From<ArgumentList> for Value {
    fn from(list: ArgumentList) -> Self {
        Value::ArgumentList(list)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keyword_access_is_tracked() {
        let list = ArgumentList::with_id(
            3,
            vec![Value::Boolean(true)],
            [("weight".to_string(), Value::from(0.5))].into_iter().collect(),
            ListSeparator::Comma,
        );
        assert!(!list.keywords_accessed());

        // A clone observes the same flag: both refer to one logical list.
        let clone = list.clone();
        assert_eq!(clone.keywords().len(), 1);
        assert!(list.keywords_accessed());
    }

    #[test]
    fn test_equality_ignores_id_and_access_bit() {
        let a = ArgumentList::with_id(1, vec![Value::Null], IndexMap::new(), ListSeparator::Comma);
        let b = ArgumentList::with_id(2, vec![Value::Null], IndexMap::new(), ListSeparator::Comma);
        let _ = a.keywords();
        assert_eq!(a, b);
    }
}
