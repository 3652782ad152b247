//! JSON REST API for Inktank.
//!
//! Exposes an axum [`Router`] backed by any [`CatalogStore`]. The router is an
//! explicit dispatch table: every (method, path) pair names its handler, and
//! the guard extractors in the handler's signature decide who may call it.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = inktank_api::router(state).layer(inktank_api::cors_layer(&origins));
//! ```

pub mod auth;
pub mod error;
pub mod extract;
pub mod parents;
pub mod subdocs;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  extract::FromRequestParts,
  http::{HeaderValue, Method, StatusCode, Uri, header},
  routing::{get, post},
};
use inktank_core::{
  parent::{Author, Book, Parent},
  store::CatalogStore,
  subdoc::{Bio, Comment, Rating, SubDocument},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub use auth::{Admin, AuthContext, Caller};
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthContext>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), auth: Arc::clone(&self.auth) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full API router for `state`.
///
/// Book writes need any signed-in user; author writes need an admin. Creating
/// either kind of parent always needs an admin.
pub fn router<S>(state: AppState<S>) -> Router<()>
where
  S: CatalogStore + 'static,
{
  Router::new()
    // Users
    .route("/users", get(users::list::<S>))
    .route("/users/signup", post(users::signup::<S>))
    .route("/users/login", post(users::login::<S>))
    .route("/users/facebook/token", get(users::facebook::<S>))
    .route("/users/google/token", get(users::google::<S>))
    // Catalog
    .merge(parent_routes::<S, Book, Caller>())
    .merge(parent_routes::<S, Author, Admin>())
    .with_state(state)
}

/// Routes for one parent kind and its three embedded collections. `G` guards
/// updates and deletes of the parent itself.
fn parent_routes<S, P, G>() -> Router<AppState<S>>
where
  S: CatalogStore + 'static,
  P: Parent,
  G: FromRequestParts<AppState<S>, Rejection = ApiError> + Send + 'static,
{
  let base = format!("/{}", P::KIND.path_segment());

  Router::new()
    .route(
      &base,
      get(parents::list::<S, P>)
        .post(parents::create::<S, P>)
        .put(unsupported)
        .delete(unsupported),
    )
    .route(
      &format!("{base}/{{id}}"),
      get(parents::get_one::<S, P>)
        .put(parents::update::<S, P, G>)
        .delete(parents::delete::<S, P, G>)
        .post(unsupported),
    )
    .merge(collection_routes::<S, P, Comment>(&base))
    .merge(collection_routes::<S, P, Rating>(&base))
    .merge(collection_routes::<S, P, Bio>(&base))
}

fn collection_routes<S, P, K>(base: &str) -> Router<AppState<S>>
where
  S: CatalogStore + 'static,
  P: Parent,
  K: SubDocument,
{
  let coll = format!("{base}/{{id}}/{}", K::KIND.path_segment());

  Router::new()
    .route(
      &coll,
      get(subdocs::list::<S, P, K>)
        .post(subdocs::create::<S, P, K>)
        .delete(subdocs::delete_all::<S, P, K>)
        .put(unsupported),
    )
    .route(
      &format!("{coll}/{{sub_id}}"),
      get(subdocs::get_one::<S, P, K>)
        .put(subdocs::update::<S, P, K>)
        .delete(subdocs::delete_one::<S, P, K>)
        .post(unsupported),
    )
}

/// Verbs a path refuses, answered in plain text.
async fn unsupported(method: Method, uri: Uri) -> (StatusCode, String) {
  (
    StatusCode::FORBIDDEN,
    format!("{method} operation not supported on {}", uri.path()),
  )
}

// ─── CORS ─────────────────────────────────────────────────────────────────────

/// A CORS layer allowing `origins`, or any origin when the list is empty.
/// Entries that are not valid header values are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
  if origins.is_empty() {
    return CorsLayer::permissive();
  }

  let allowed: Vec<HeaderValue> = origins
    .iter()
    .filter_map(|o| match HeaderValue::from_str(o) {
      Ok(v) => Some(v),
      Err(_) => {
        tracing::warn!(origin = %o, "ignoring invalid CORS origin");
        None
      }
    })
    .collect();

  CorsLayer::new()
    .allow_origin(AllowOrigin::list(allowed))
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
