//! Ports the sign-in flows depend on, and their adapters.

mod database;
mod email;
pub mod error;
pub mod identity_store;
mod jwt;
pub mod metrics;
pub mod notifier;
pub mod templates;

pub use database::PgIdentityStore;
pub use email::SmtpNotifier;
pub use error::{DeliveryError, SessionError, StoreError};
pub use identity_store::{IdentityStore, MemoryIdentityStore};
pub use jwt::{AccessTokenClaims, JwtService, RefreshTokenClaims, Session, SessionIssuer};
pub use notifier::{build_link, MockNotifier, Notifier, SentMessage, TemplateData, TemplateName};
pub use templates::{EmailTemplates, RenderedEmail};
