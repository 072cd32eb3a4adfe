mod accounts;
mod audit_writer;
mod tokens;

pub use accounts::AccountService;
pub use audit_writer::AuditWriter;
pub use tokens::TokenService;
