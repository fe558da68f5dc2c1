mod messages;
mod sessions;
mod sources;

pub use messages::MessageRepository;
pub use sessions::SessionRepository;
pub use sources::SourceRepository;
