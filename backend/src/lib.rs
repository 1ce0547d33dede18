//! Point mining backend and client session.
//!
//! Users accrue points per whole hour at a base rate that purchased boosts
//! multiply and referrals raise. The [`domain`] holds the rules, [`inbound`]
//! and [`outbound`] adapt them to HTTP and storage, and [`client`] carries
//! the identity resolution and resilient session used by the mini-app.

pub mod client;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
