//! Lexical retrieval path: tokenizer and BM25 index.

mod index;
mod tokenizer;

pub use index::{Bm25Params, IndexBuildError, LexicalIndex};
pub use tokenizer::{is_stop_word, tokenize};

pub(crate) use index::check_documents;
