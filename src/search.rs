use futures::future::BoxFuture;
use log::debug;

use crate::github::DirectoryLister;
use crate::models::{DocumentEntry, ItemType};

/// File extensions surfaced by the portal, matched case-insensitively.
const ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".jpg", ".jpeg", ".png"];

fn is_document(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Walks the remote folder at `path` depth-first, collecting every document
/// below it. `category` is the root folder of the original call and is
/// carried unchanged through the recursion, so nested matches are always
/// labeled with the top-level folder the walk started from.
///
/// A folder the lister reports as failing contributes zero entries without
/// aborting the rest of the walk. The remote store enforces a finite acyclic
/// tree, so the recursion terminates without cycle detection.
pub fn collect_documents<'a>(
    lister: &'a dyn DirectoryLister,
    path: &'a str,
    category: &'a str,
) -> BoxFuture<'a, Vec<DocumentEntry>> {
    Box::pin(async move {
        let mut documents = Vec::new();
        let Some(items) = lister.list_directory(path).await else {
            return documents;
        };
        for item in items {
            match item.item_type {
                ItemType::File if is_document(&item.name) => {
                    documents.push(DocumentEntry {
                        name: item.name,
                        download_url: lister.raw_url(&item.path),
                        path: item.path,
                        category: category.to_string(),
                    });
                }
                ItemType::Dir => {
                    documents.extend(collect_documents(lister, &item.path, category).await);
                }
                _ => {}
            }
        }
        documents
    })
}

/// Re-walks every configured category and keeps the documents whose name
/// contains `term` case-insensitively, sorted ascending by raw filename.
/// Callers reject empty or whitespace-only terms before calling this.
pub async fn search_documents(
    lister: &dyn DirectoryLister,
    categories: &[&str],
    term: &str,
) -> Vec<DocumentEntry> {
    let needle = term.to_lowercase();
    let mut results = Vec::new();
    for category in categories {
        let documents = collect_documents(lister, category, category).await;
        debug!("Category '{}' holds {} documents", category, documents.len());
        results.extend(
            documents
                .into_iter()
                .filter(|doc| doc.name.to_lowercase().contains(&needle)),
        );
    }
    results.sort_by(|a, b| a.name.cmp(&b.name));
    results
}
