//! Route guard deciding whether navigation may proceed.

use parlor_types::navigation::{Navigation, Route};

/// Check a navigation attempt against the session state.
///
/// Protected routes redirect to [`Route::Auth`] without a session; the auth
/// route redirects to [`Route::Welcome`] when already signed in.
pub fn guard(route: &Route, authenticated: bool) -> Navigation {
    match (route.requires_auth(), authenticated) {
        (true, false) => Navigation::Redirect(Route::Auth),
        (false, true) => Navigation::Redirect(Route::Welcome),
        _ => Navigation::Proceed,
    }
}
