//! Form controller driving the generation endpoint from the user's side

pub mod form;
pub mod settings;
pub mod transport;

pub use form::{FormController, FormStatus, View};
pub use settings::{FileStore, KeyValueStore, MemoryStore, Settings};
pub use transport::{GenerationTransport, HttpTransport, ImageFile};
