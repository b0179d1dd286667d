//! Built-in starting points shown when the page names no stored sandbox.

use runbox_types::{CodeFile, FileSet};

const HELLO_WORLD: &str = "print('hello world')\n";

/// Files for a page path that did not resolve to a stored record.
///
/// `/blank` starts empty; every other path gets hello world.
pub fn for_path(path: &str) -> FileSet {
    let content = if path.starts_with("/blank") { "" } else { HELLO_WORLD };
    FileSet::new(vec![CodeFile::new("main.py", content)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_empty() {
        let files = for_path("/blank");
        assert_eq!(files.len(), 1);
        assert_eq!(files.active().unwrap().content, "");
    }

    #[test]
    fn anything_else_is_hello_world() {
        for path in ["/", "/hello-world", "/store/0123456789abcdef"] {
            let files = for_path(path);
            assert_eq!(files.active().unwrap().name, "main.py");
            assert_eq!(files.active().unwrap().content, HELLO_WORLD);
        }
    }
}
