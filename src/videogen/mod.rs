pub mod handlers;
pub mod input;
pub mod output;
pub mod replicate;
pub mod retry;
pub mod router;
pub mod types;

pub use handlers::generate_trailer;
pub use router::videogen_router;
pub use types::{GenerateTrailerResponse, GenerationRequest, GenerationResult, UploadedImage};
