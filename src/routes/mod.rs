/// Router Module Index
///
/// API routes grouped by who may call them. Page paths are not routed here: they fall
/// through to the dashboard bundle behind the edge guard.

/// Routes open to anyone, signed in or not.
pub mod public;

/// Routes requiring a valid session cookie.
pub mod authenticated;

/// Trainer review routes. Session required; the admin check happens in the handlers.
pub mod admin;
