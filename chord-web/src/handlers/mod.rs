//! HTTP request handlers organized by functionality

pub mod range;
pub mod stream;
pub mod system;
pub mod tracks;

// Re-export handler functions
pub use range::{build_stream_response, build_unsatisfiable_response};
pub use stream::stream_track;
pub use system::{health, stats};
pub use tracks::{
    TrackView, delete_track, get_track, list_my_tracks, list_tracks, record_play, update_track,
};
