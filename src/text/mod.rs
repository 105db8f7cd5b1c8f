pub mod email;
pub mod html;
pub mod normalize;
mod stopwords;
mod truncate;

pub use email::{decode_email_bytes, EmailDocument};
pub use html::strip_html;
pub use normalize::{clean_email, tokenize};
pub use truncate::{preview, truncate_chars};
