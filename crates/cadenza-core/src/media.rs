//! The media resource seam.
//!
//! The controller drives playback through [`MediaElement`] and learns about
//! progress, natural track ends and failures from the [`MediaEvent`]s the
//! resource raises.

use thiserror::Error;


/// Media load/playback failures, one per native media-error category.
///
/// The display text is the fixed user-facing notification for the category.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Error )]
pub enum MediaError {
    #[error( "The audio playback was deliberately aborted." )]
    Aborted,

    #[error( "A network error caused the audio download to fail." )]
    Network,

    #[error( "The audio playback was aborted due to a corruption problem or because it used features your browser did not support." )]
    Decode,

    #[error( "The audio could not be loaded, either because the server or network failed or because the format is not supported." )]
    SourceNotSupported,

    #[error( "An unknown error occurred." )]
    Unknown,
}


/// How much of the current source the media resource has available.
#[derive( Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default )]
pub enum ReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}


/// Signals raised by a media resource.
#[derive( Debug, Clone, Copy, PartialEq )]
pub enum MediaEvent {
    /// The current playback time changed.
    TimeUpdate,

    /// Playback reached the end of the source.
    Ended,

    /// Loading or playback failed.
    Error( MediaError ),
}


/// An imperative media resource: one source at a time, with play/pause,
/// seek and volume.
///
/// Times are in seconds. `duration` is NaN until it is known.
pub trait MediaElement {
    /// Assigns the source URL. Takes effect on the next [`load`](Self::load).
    fn set_source( &mut self, url: &str );

    /// Loads the assigned source. The resource is paused afterwards.
    fn load( &mut self );

    fn play( &mut self );

    fn pause( &mut self );

    fn paused( &self ) -> bool;

    fn current_time( &self ) -> f64;

    fn set_current_time( &mut self, seconds: f64 );

    fn duration( &self ) -> f64;

    /// Volume in `[0, 1]`.
    fn set_volume( &mut self, volume: f64 );

    fn ready_state( &self ) -> ReadyState;

    /// End of the first buffered range, if any.
    fn buffered_end( &self ) -> Option<f64>;

    /// Drains the signals raised since the last call.
    fn poll_events( &mut self ) -> Vec<MediaEvent>;
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_messages_are_fixed() {
        assert_eq!(
            MediaError::Network.to_string(),
            "A network error caused the audio download to fail."
        );
        assert_eq!( MediaError::Unknown.to_string(), "An unknown error occurred." );
    }
}
