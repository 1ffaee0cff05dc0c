//! Client Stubs
//!
//! Response stubbing for service clients: instead of calling the network,
//! a stubbed client answers each operation from a per-client queue of
//! canned responses, or synthesizes a structurally valid default from the
//! operation's output shape.
//!
//! # Features
//!
//! - **Queued Stubs**: Serve stubs in order; the last one repeats forever
//! - **Default Responses**: Generate type-correct placeholders from the schema
//! - **Partial Data**: Supply only the fields you care about
//! - **Error Simulation**: Name a service error code and get a protocol-accurate wire error
//! - **Wire Stubs**: Hand-craft `status_code`/`headers`/`body` responses
//! - **Protocols**: json, rest-json, rest-xml, query and ec2
//!
//! # Example Configuration
//!
//! ```yaml
//! stub_responses: true
//! stubs:
//!   HeadObject:
//!     - NotFound
//!     - content_length: 150
//! ```

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod protocol;
pub mod store;
pub mod stub;
pub mod validator;

pub use client::{ApiRequest, Resolution, StubbedClient, Transport};
pub use config::StubConfig;
pub use error::{Result, StubError};
pub use model::ServiceModel;
pub use stub::{HttpResponse, StubEntry, StubSpec};
