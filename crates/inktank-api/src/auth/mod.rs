//! The Authentication Context: everything needed to turn a request into a
//! known user.
//!
//! Built once at startup and carried in [`crate::AppState`]. Holds the token
//! issuer and whichever provider verifiers are configured.

pub mod guard;
pub mod password;
pub mod provider;
pub mod token;

use inktank_core::user::Provider;

pub use guard::{Admin, Caller};
pub use provider::{ProviderProfile, ProviderVerifier};
pub use token::{Claims, TokenIssuer};

pub struct AuthContext {
  pub tokens: TokenIssuer,
  facebook:   Option<Box<dyn ProviderVerifier>>,
  google:     Option<Box<dyn ProviderVerifier>>,
}

impl AuthContext {
  /// A context that only knows local logins.
  pub fn new(tokens: TokenIssuer) -> Self {
    Self { tokens, facebook: None, google: None }
  }

  /// Register a provider verifier, replacing any earlier one for the same
  /// provider.
  pub fn with_verifier(mut self, verifier: impl ProviderVerifier + 'static) -> Self {
    let slot = match verifier.provider() {
      Provider::Facebook => &mut self.facebook,
      Provider::Google => &mut self.google,
    };
    *slot = Some(Box::new(verifier));
    self
  }

  pub fn verifier(&self, provider: Provider) -> Option<&dyn ProviderVerifier> {
    match provider {
      Provider::Facebook => self.facebook.as_deref(),
      Provider::Google => self.google.as_deref(),
    }
  }
}
