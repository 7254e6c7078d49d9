pub mod client;
pub mod endpoints;
pub mod transport;

pub use client::{ApiClient, TokenSource, UnauthorizedHandler};
pub use endpoints::{AuthApi, RegistrationRequest};
pub use transport::{HttpMethod, HttpResponse, HttpTransport, ReqwestTransport};
