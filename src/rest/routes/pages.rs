// rest/routes/pages.rs — Page shells behind the session-cookie gate.
//
// Rendering is out of scope; these exist so the gate middleware has real
// routes to protect and redirect between.

use axum::response::Html;

pub async fn login() -> Html<&'static str> {
    Html("<!doctype html><title>Login</title><h1>Login</h1>")
}

pub async fn signup() -> Html<&'static str> {
    Html("<!doctype html><title>Sign up</title><h1>Sign up</h1>")
}

pub async fn dashboard() -> Html<&'static str> {
    Html("<!doctype html><title>Dashboard</title><h1>Dashboard</h1>")
}
