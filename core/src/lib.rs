pub mod cache;
pub mod client;
pub mod controller;
pub mod debounce;
pub mod navigator;
pub mod session;
pub mod settings;
pub mod visibility;

pub use cache::QueryCache;
pub use client::{HttpSearchClient, SearchClient, SearchError};
pub use controller::{Command, FetchTicket, Phase, Reaction, SearchController};
pub use debounce::Debouncer;
pub use navigator::SelectionNavigator;
pub use session::{Key, Session, UiEvent, View};
pub use settings::Settings;
pub use visibility::Visibility;

pub use protocol::{ItemId, ResultItem, ResultSet};
