use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A single file in a sandbox.
///
/// `active_index` is a focus counter: whichever file carries the highest value
/// is the one shown in the editor. Focusing a file assigns it a value strictly
/// greater than the current maximum, so there is never more than one winner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFile {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub active_index: u64,
}

impl CodeFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            active_index: 0,
        }
    }

    pub fn with_active_index(mut self, active_index: u64) -> Self {
        self.active_index = active_index;
        self
    }
}

/// The ordered files of one sandbox, serialized as `{"files": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    pub files: Vec<CodeFile>,
}

impl FileSet {
    pub fn new(files: Vec<CodeFile>) -> Self {
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CodeFile> {
        self.files.iter()
    }

    pub fn get(&self, name: &str) -> Option<&CodeFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The highest `activeIndex` in the set (0 for an empty set).
    pub fn active_index(&self) -> u64 {
        self.files
            .iter()
            .fold(0, |acc, f| acc.max(f.active_index))
    }

    /// Position of the active file.
    pub fn active_position(&self) -> Option<usize> {
        let active = self.active_index();
        self.files.iter().position(|f| f.active_index == active)
    }

    /// The active file: the one carrying the maximum `activeIndex`.
    pub fn active(&self) -> Option<&CodeFile> {
        self.active_position().map(|i| &self.files[i])
    }

    /// Replace the content of the active file. Returns `false` if the set is empty.
    pub fn set_active_content(&mut self, content: impl Into<String>) -> bool {
        match self.active_position() {
            Some(i) => {
                self.files[i].content = content.into();
                true
            }
            None => false,
        }
    }

    /// Make `name` the active file by giving it `max + 1`.
    ///
    /// Returns the new `activeIndex`. Fails without changing anything if the
    /// counter is already at `u64::MAX`.
    pub fn focus(&mut self, name: &str) -> Result<u64, TypeError> {
        let current = self.active_index();
        let file = self
            .files
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| TypeError::UnknownFile(name.to_owned()))?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| TypeError::ActiveIndexOverflow(name.to_owned()))?;
        file.active_index = next;
        Ok(next)
    }

    /// Append a file, rejecting duplicate names.
    pub fn push(&mut self, file: CodeFile) -> Result<(), TypeError> {
        if self.contains(&file.name) {
            return Err(TypeError::DuplicateFileName(file.name));
        }
        self.files.push(file);
        Ok(())
    }

    /// Remove a file by name. The last remaining file cannot be removed.
    pub fn remove(&mut self, name: &str) -> Result<CodeFile, TypeError> {
        let pos = self
            .files
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| TypeError::UnknownFile(name.to_owned()))?;
        if self.files.len() == 1 {
            return Err(TypeError::LastFile(name.to_owned()));
        }
        Ok(self.files.remove(pos))
    }

    /// If no file carries a non-zero `activeIndex`, mark the first one active.
    pub fn ensure_active(&mut self) {
        if self.files.iter().all(|f| f.active_index == 0) {
            if let Some(first) = self.files.first_mut() {
                first.active_index = 1;
            }
        }
    }

    /// Check that file names are unique.
    pub fn validate_names(&self) -> Result<(), TypeError> {
        let mut seen = HashSet::with_capacity(self.files.len());
        for file in &self.files {
            if !seen.insert(file.name.as_str()) {
                return Err(TypeError::DuplicateFileName(file.name.clone()));
            }
        }
        Ok(())
    }

    /// First free name in the sequence `new.py`, `new_1.py`, `new_2.py`, ...
    pub fn next_free_name(&self) -> String {
        let mut name = String::from("new.py");
        let mut n = 1;
        while self.contains(&name) {
            name = format!("new_{n}.py");
            n += 1;
        }
        name
    }

    /// Serialize to the `{"files": [...]}` payload used on the wire and for
    /// change detection.
    pub fn to_json(&self) -> Result<String, TypeError> {
        serde_json::to_string(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn from_json(data: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(data).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

impl From<Vec<CodeFile>> for FileSet {
    fn from(files: Vec<CodeFile>) -> Self {
        Self { files }
    }
}
