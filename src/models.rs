use serde::Deserialize;

/// Kind of a remote directory child. The listing API also reports symlinks
/// and submodules; those deserialize to `Other` and are skipped by the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// One immediate child of a remote folder, as returned by the listing API.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryItem {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub name: String,
    pub path: String,
}

/// One matched file produced by a tree walk. Transient; built per request
/// and discarded once the response is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub name: String,
    pub path: String,
    pub download_url: String,
    pub category: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SearchForm {
    pub search: Option<String>,
}

/// Flash message carried back to the search page on a redirect.
#[derive(Deserialize)]
pub struct FlashQuery {
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_items_deserialize_from_api_payload() {
        // Extra fields and non file/dir types come back from the real API.
        let payload = r#"[
            {"type": "file", "name": "manual.pdf", "path": "Gammes operatoires/manual.pdf", "sha": "a94a8fe5", "size": 1024},
            {"type": "dir", "name": "sub", "path": "Gammes operatoires/sub"},
            {"type": "symlink", "name": "raccourci", "path": "Gammes operatoires/raccourci"}
        ]"#;

        let items: Vec<DirectoryItem> = serde_json::from_str(payload).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].item_type, ItemType::File);
        assert_eq!(items[0].name, "manual.pdf");
        assert_eq!(items[0].path, "Gammes operatoires/manual.pdf");
        assert_eq!(items[1].item_type, ItemType::Dir);
        assert_eq!(items[2].item_type, ItemType::Other);
    }
}
