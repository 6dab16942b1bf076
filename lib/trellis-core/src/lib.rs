//! # Trellis Core
//!
//! A declarative client for JSON REST APIs: describe an API once as a tree of
//! named path segments — each carrying an HTTP method, a parameter builder,
//! and the responses it may answer with — then dispatch calls against the
//! tree and get validated, typed results back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use trellis_core::{
//!     ApiClient, Authorization, CallArgs, CallOutcome, Method, ResponseSpec, Schema, StatusCode,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::builder()
//!     .with_domain("https://api.example.com/v1")
//!     .with_authorization(Authorization::custom_headers([("X-API-KEY", "secret")]))
//!     .with_paths(|paths| {
//!         paths.path("users", |users| {
//!             users.path("invite", |invite| {
//!                 invite
//!                     .method(Method::POST)
//!                     .params_named(["provider_id", "account_id", "message"])
//!                     .response(
//!                         ResponseSpec::structured(
//!                             StatusCode::CREATED,
//!                             Schema::parse(json!({
//!                                 "object": "string",
//!                                 "invitation_id": "string",
//!                             }))
//!                             .expect("a valid schema"),
//!                         )
//!                         .with_transform(|outcome, _args| {
//!                             let sent = outcome
//!                                 .as_object()
//!                                 .and_then(|object| object.get("object"))
//!                                 .is_some_and(|value| value == "UserInvitationSent");
//!                             Ok(CallOutcome::sentinel(if sent { "sent" } else { "not_sent" }))
//!                         }),
//!                     );
//!             });
//!         });
//!     })
//!     .build();
//!
//! let outcome = client
//!     .at("users")?
//!     .at("invite")?
//!     .call(
//!         CallArgs::new()
//!             .arg("provider_id", 1)
//!             .arg("account_id", 2)
//!             .arg("message", "hi"),
//!     )
//!     .await?;
//! assert_eq!(outcome, CallOutcome::sentinel("sent"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Parameterized segments
//!
//! A segment declared with `param` takes its URL text at call time; the value
//! is bound on the per-call cursor, never on the shared tree, so concurrent
//! calls cannot observe each other's values:
//!
//! ```rust,no_run
//! # use trellis_core::{ApiClient, CallArgs};
//! # async fn example(client: &ApiClient) -> Result<(), trellis_core::ApiClientError> {
//! let user = client
//!     .at("users")?
//!     .at("user_id")?
//!     .with("77")?
//!     .call(CallArgs::new().arg("account_id", 8))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Structural schemas
//!
//! Each declared response can validate its body against a [`Schema`] before
//! anything is handed back. Schemas support primitive type tags, optional and
//! blank-tolerant fields, nested schemas, and array-of rules; see
//! [`Schema::parse`] for the declaration forms. Validation failures surface
//! as [`ValidationError`] values naming the offending field, and validated
//! bodies materialize as presence-aware [`ResponseObject`]s.
//!
//! ## Transports
//!
//! Clients are generic over a [`Transport`]; the default [`HttpTransport`]
//! dispatches through [`reqwest`]. Tests can substitute any implementation of
//! the trait to exercise a declared client without a network.

mod client;

pub use self::client::{
    ApiCall, ApiClient, ApiClientBuilder, ApiClientError, AuthContribution, Authorization,
    BodyMode, CallArgs, CallOutcome, CallbackPayload, ElementRule, FieldRule, FieldType,
    HttpTransport, PathBuilder, PathCursor, PathNode, ResponseObject, ResponseSpec, Schema,
    SchemaError, SecureString, Transport, TransportError, TransportRequest, TransportResponse,
    ValidationError,
};

// Convenience re-exports: the HTTP vocabulary used in declarations.
pub use http::{Method, StatusCode};
