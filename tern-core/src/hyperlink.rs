//! Shared hyperlink entries (OSC 8)
//!
//! Many cells usually point at the same link, so entries are
//! reference-counted and cells hold cheap handles. Links opened with an
//! explicit id are shared across OSC 8 invocations with the same id and
//! URI; anonymous links get a fresh entry per invocation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One hyperlink target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperlink {
    /// The `id=` parameter from OSC 8, empty for anonymous links
    pub id: String,
    /// Target URI
    pub uri: String,
}

/// Cheap shared handle carried by cells
pub type HyperlinkRef = Arc<Hyperlink>;

/// Interning store for hyperlink entries
#[derive(Debug, Clone, Default)]
pub struct HyperlinkStore {
    by_id: HashMap<String, HyperlinkRef>,
}

impl HyperlinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a hyperlink, reusing the entry when id and URI both match
    pub fn open(&mut self, id: Option<&str>, uri: &str) -> HyperlinkRef {
        match id {
            Some(id) if !id.is_empty() => {
                if let Some(existing) = self.by_id.get(id) {
                    if existing.uri == uri {
                        return Arc::clone(existing);
                    }
                }
                let link = Arc::new(Hyperlink {
                    id: id.to_string(),
                    uri: uri.to_string(),
                });
                self.by_id.insert(id.to_string(), Arc::clone(&link));
                link
            }
            _ => Arc::new(Hyperlink {
                id: String::new(),
                uri: uri.to_string(),
            }),
        }
    }

    /// Drop all interned entries (cells keep theirs alive via the handle)
    pub fn clear(&mut self) {
        self.by_id.clear();
    }
}
