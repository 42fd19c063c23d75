pub mod normalize;
pub use normalize::{collapse_whitespace, fold_case, fold_turkish, strip_separators};

pub mod validate;
pub use validate::{CredentialKind, NUMERIC_SECRET, WORD_SECRET, is_numeric_match, is_word_match};

pub mod terminal;
pub use terminal::Terminal;
