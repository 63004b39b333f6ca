pub mod assignment;
pub mod board;
pub mod schedule;

pub use assignment::{AssignmentBatch, AssignmentKind, GeoLocation, Grade, RemoteAssignment, SourceSystem};
pub use board::{Board, CacheSnapshot, Card, List};
pub use schedule::{Quarter, SubjectsConfig, Week};
