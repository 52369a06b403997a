//! Book catalog queries. All lookups are linear scans in catalog order.

use crate::models::BookRecord;
use crate::store::Handle;

use super::Library;

impl Library {
    pub fn find_book_by_isbn(&self, isbn: &str) -> Option<Handle<BookRecord>> {
        self.books.match_handle(|book| book.isbn == isbn)
    }

    pub fn book(&self, handle: Handle<BookRecord>) -> Option<&BookRecord> {
        self.books.get(handle)
    }

    pub fn book_by_isbn(&self, isbn: &str) -> Option<&BookRecord> {
        self.books.find_match(|book| book.isbn == isbn)
    }

    pub(crate) fn book_mut(&mut self, handle: Handle<BookRecord>) -> Option<&mut BookRecord> {
        self.books.get_mut(handle)
    }

    pub fn books(&self) -> impl Iterator<Item = &BookRecord> + '_ {
        self.books.iter()
    }

    pub(crate) fn insert_book(&mut self, book: BookRecord) -> Handle<BookRecord> {
        self.books.append(book)
    }

    /// Books whose title contains `fragment`. Matching is case-sensitive.
    pub fn search_by_title(&self, fragment: &str) -> Vec<&BookRecord> {
        self.books
            .iter()
            .filter(|book| book.title.contains(fragment))
            .collect()
    }

    /// Books whose author contains `fragment`. Matching is case-sensitive.
    pub fn search_by_author(&self, fragment: &str) -> Vec<&BookRecord> {
        self.books
            .iter()
            .filter(|book| book.author.contains(fragment))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;

    fn book(isbn: &str, title: &str, author: &str) -> BookRecord {
        BookRecord {
            stock: 1,
            isbn: isbn.into(),
            author: author.into(),
            title: title.into(),
            introduced: Timestamp::default(),
        }
    }

    fn library() -> Library {
        let mut library = Library::with_admin(Timestamp::default());
        library.insert_book(book("1", "The Rust Book", "Klabnik"));
        library.insert_book(book("2", "Rust in Action", "McNamara"));
        library.insert_book(book("3", "Dune", "Herbert"));
        library
    }

    #[test]
    fn isbn_lookup_is_exact() {
        let library = library();
        let handle = library.find_book_by_isbn("2").unwrap();
        assert_eq!(library.book(handle).map(|b| b.title.as_str()), Some("Rust in Action"));
        assert!(library.find_book_by_isbn("22").is_none());
        assert_eq!(library.book_by_isbn("3").map(|b| b.author.as_str()), Some("Herbert"));
    }

    #[test]
    fn fragment_search_keeps_catalog_order() {
        let library = library();
        let titles: Vec<_> = library
            .search_by_title("Rust")
            .into_iter()
            .map(|b| b.isbn.as_str())
            .collect();
        assert_eq!(titles, vec!["1", "2"]);
        assert!(library.search_by_title("rust").is_empty());
        assert_eq!(library.search_by_author("Her").len(), 1);
    }
}
