mod accounts;
mod face_match;
mod health;
mod tokens;
mod util;

pub use accounts::{create_account, update_account};
pub use face_match::{face_match, webhook};
pub use health::{health_check, readiness_check};
pub use tokens::generate_token;
