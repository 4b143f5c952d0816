//! Program persistence.
//!
//! Save/load of the editor's serialized workspace. The payload is an opaque
//! string owned by the editor (its own XML-ish format); this layer never
//! parses it, it only stores and returns it verbatim.

use std::cell::RefCell;
use std::io;

/// Opaque save/load of a serialized workspace.
pub trait ProgramStore {
    fn save(&self, serialized: &str) -> io::Result<()>;

    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> io::Result<Option<String>>;
}

/// In-memory store, one slot. Used by the browser bindings and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: RefCell<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgramStore for MemoryStore {
    fn save(&self, serialized: &str) -> io::Result<()> {
        *self.slot.borrow_mut() = Some(serialized.to_string());
        Ok(())
    }

    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.slot.borrow().clone())
    }
}

/// Single-file store.
#[cfg(not(target_arch = "wasm32"))]
pub use native::FileStore;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::ProgramStore;
    use std::fs;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Clone)]
    pub struct FileStore {
        path: PathBuf,
    }

    impl FileStore {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }
    }

    impl ProgramStore for FileStore {
        fn save(&self, serialized: &str) -> io::Result<()> {
            fs::write(&self.path, serialized)
        }

        fn load(&self) -> io::Result<Option<String>> {
            match fs::read_to_string(&self.path) {
                Ok(contents) => Ok(Some(contents)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e),
            }
        }
    }
}
