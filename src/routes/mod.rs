/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level (via Axum layers),
/// preventing accidental exposure of protected endpoints.
///
/// The three modules map directly to the access tiers of the application.

/// Routes accessible to all callers, anonymous included. Read handlers must
/// enforce published-only visibility at the Repository level.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a validated user session.
pub mod authenticated;

/// Routes for staff: moderation for editors and admins, account
/// administration for admins. Every handler performs its own capability check.
pub mod admin;
