/// Router Module Index
///
/// Organizes the routing logic along the guard's two-valued partition.
/// The split mirrors the route classification table in `guard`: what is
/// public here must classify as Public/Auth there, and vice versa.

/// Routes accessible without a session: landing page, health probe, and the
/// auth endpoints (login, callback, logout).
pub mod public;

/// Routes behind the `require_session` layer. Requires a validated session.
pub mod protected;
