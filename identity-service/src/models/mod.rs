pub mod audit_entry;
pub mod invitation;
pub mod session;
pub mod team;
pub mod user;

pub use audit_entry::{AuditAction, AuditEntry, AuditEntryResponse};
pub use invitation::{Invitation, InvitationState};
pub use session::{ClientMeta, Session};
pub use team::{Team, TeamResponse};
pub use user::{Role, User, UserResponse};
