pub mod claude;
pub mod error;
pub mod util;

pub use claude::Claude;
pub use error::{AiError, Result};
pub use util::{json_payload, strip_code_blocks, truncate_to_char_boundary};
