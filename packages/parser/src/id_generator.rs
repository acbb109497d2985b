use crc32fast::Hasher;

/// Generate a stable document key from a path using CRC32
pub fn get_document_id(path: &str) -> String {
    let mut buff = String::from(path);
    if !path.starts_with("file://") {
        buff = format!("file://{}", buff);
    }

    let mut hasher = Hasher::new();
    hasher.update(buff.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Structural ids for components without an explicit identity attribute
///
/// Ids have the form `<doc-key>:<i>.<j>...` where the index path is the
/// component's position among its siblings at each level. Ids are stable
/// across reparses as long as the component does not move.
#[derive(Clone, Debug)]
pub struct IDGenerator {
    seed: String,
    path: Vec<usize>,
    next: Vec<usize>,
}

impl IDGenerator {
    pub fn new(path: &str) -> Self {
        Self::from_seed(get_document_id(path))
    }

    pub fn from_seed(seed: String) -> Self {
        Self {
            seed,
            path: Vec::new(),
            next: vec![0],
        }
    }

    /// Claim the next sibling slot at the current depth and descend into it.
    /// Returns the path id of the claimed slot.
    pub fn enter(&mut self) -> String {
        let depth = self.next.len() - 1;
        let index = self.next[depth];
        self.next[depth] += 1;

        self.path.push(index);
        self.next.push(0);
        self.current()
    }

    /// Leave the slot claimed by the matching `enter`
    pub fn exit(&mut self) {
        if self.path.pop().is_some() {
            self.next.pop();
        }
    }

    /// Path id of the current slot
    pub fn current(&self) -> String {
        let path = self
            .path
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(".");
        format!("{}:{}", self.seed, path)
    }

    /// Get document ID seed
    pub fn seed(&self) -> &str {
        &self.seed
    }
}
