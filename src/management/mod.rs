mod preview;
mod session;

pub use preview::ITUNES_SEARCH_URL;
pub use preview::PreviewResolver;
pub use session::SessionManager;
