pub mod audit;
pub mod database;
pub mod error;
pub mod identity;
pub mod invitation;
pub mod jwt;

pub use audit::AuditRecorder;
pub use database::{AuditFilter, Database};
pub use error::ServiceError;
pub use identity::{IdentityService, IssuedTokens};
pub use invitation::InvitationService;
pub use jwt::{AccessTokenClaims, JwtService, RefreshTokenClaims};
