// notisync-api: Async Rust client for the notification REST endpoints and push channel

pub mod client;
pub mod credential;
pub mod error;
pub mod push;
pub mod transport;
pub mod types;
pub mod websocket;

pub use client::{NotificationApi, NotificationClient};
pub use credential::Credential;
pub use error::Error;
pub use push::{PushConnector, PushFrame, PushSession};
pub use transport::TransportConfig;
pub use types::{
    Ack, ApiNotification, Mutation, NotificationRef, PageQuery, PageResponse, Pagination,
    PushNotification, QuickCheckResponse,
};
pub use websocket::{WsConnector, WsSession, default_push_url};
