pub mod blob;
pub mod course;
pub mod lecturer;
pub mod room;
pub mod version;

pub use blob::BlobEntry;
pub use course::{Course, ScheduleRow, Section};
pub use lecturer::{Lecturer, decode_availability, encode_availability};
pub use room::Room;
pub use version::{SaveVersionRequest, Version, VersionMeta};
