pub mod auth;
pub mod team;

pub use auth::{
    AuthResponse, LoginRequest, LogoutRequest, MeResponse, RefreshRequest, RegisterRequest,
    TokenResponse,
};
pub use team::{
    AcceptInviteRequest, AuditListQuery, AuditListResponse, InviteRequest, InviteResponse,
    TeamMembersResponse, UpdateRoleRequest,
};
