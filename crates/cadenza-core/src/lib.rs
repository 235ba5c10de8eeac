//! Cadenza Core - playlist playback controller
//!
//! This crate provides the playback state machine that keeps a playlist,
//! transport controls and progress/volume indicators in sync with a media
//! resource, plus a native media engine for local files.

pub mod command;
pub mod controller;
pub mod decoder;
pub mod indicator;
pub mod library;
pub mod media;
pub mod native;
pub mod output;
pub mod playlist;
pub mod time;
pub mod view;

pub use command::{ Command, CommandError, SeekTarget };
pub use controller::{ CurrentTrack, DragTarget, PlaybackController, PlayerConfig, PlayerState };
pub use indicator::{ clamp_indicator, BarGeometry };
pub use media::{ MediaElement, MediaError, MediaEvent, ReadyState };
pub use native::NativeMedia;
pub use playlist::{ Playlist, PlaylistError, SourceDecl, Track };
pub use time::format_time;
pub use view::PlayerView;
