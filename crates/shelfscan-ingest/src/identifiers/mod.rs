pub mod isbn;
pub mod scan;

pub use isbn::{Isbn, IsbnKind, normalize};
pub use scan::{Candidate, find_isbn_in_blocks, find_isbn_in_text, scan};
