use runbox_types::{endpoints, ReadKey};

/// The page address the client is showing: path plus fragment.
///
/// The path is the client's notion of "current identity"; saves target the
/// read key it names, and a create moves it to the new key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageLocation {
    path: String,
    hash: String,
}

impl PageLocation {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: String::new(),
        }
    }

    /// Split an `href`-style `path#fragment`.
    pub fn parse(href: &str) -> Self {
        match href.find('#') {
            Some(i) => Self {
                path: href[..i].to_owned(),
                hash: href[i..].to_owned(),
            },
            None => Self::new(href),
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn href(&self) -> String {
        format!("{}{}", self.path, self.hash)
    }

    /// The read key named by a `/store/{readKey}` path.
    pub fn read_key(&self) -> Option<ReadKey> {
        let rest = self.path.strip_prefix(endpoints::STORE)?.strip_prefix('/')?;
        let segment = rest.split('/').next()?;
        ReadKey::parse(segment).ok()
    }

    /// Point at `/store/{readKey}`, keeping the fragment.
    pub fn push_store(&mut self, read_key: &ReadKey) {
        self.path = endpoints::store_path(read_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_key_from_store_path() {
        let loc = PageLocation::new("/store/0123456789abcdef");
        assert_eq!(loc.read_key().unwrap().as_str(), "0123456789abcdef");
        let trailing = PageLocation::new("/store/0123456789abcdef/");
        assert!(trailing.read_key().is_some());
    }

    #[test]
    fn other_paths_have_no_read_key() {
        for path in ["/", "/blank", "/store/", "/store/new", "/stores/0123456789abcdef", "/x/0123456789abcdef"] {
            assert!(PageLocation::new(path).read_key().is_none(), "{path}");
        }
    }

    #[test]
    fn push_store_keeps_hash() {
        let mut loc = PageLocation::parse("/blank#L3");
        assert_eq!(loc.hash(), "#L3");
        let key = ReadKey::parse("fedcba9876543210").unwrap();
        loc.push_store(&key);
        assert_eq!(loc.href(), "/store/fedcba9876543210#L3");
        assert_eq!(loc.read_key(), Some(key));
    }
}
