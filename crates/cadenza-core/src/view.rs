//! The host view seam.
//!
//! [`PlayerView`] is everything the controller needs from the surface it
//! draws on: widget geometry going in, indicator positions, labels and
//! button states coming out.

use crate::indicator::BarGeometry;
use crate::playlist::Track;


/// Output surface driven by the playback controller.
pub trait PlayerView {
    /// Geometry of the progress bar and its indicator.
    fn progress_bar( &self ) -> BarGeometry;

    /// Geometry of the volume bar and its indicator.
    fn volume_bar( &self ) -> BarGeometry;

    /// Creates one selectable item per track.
    fn render_playlist( &mut self, tracks: &[Track] );

    /// Highlights the item at `index` and clears every other highlight.
    fn set_active_item( &mut self, index: usize );

    fn set_track_title( &mut self, title: &str );

    /// Reveals the track info box.
    fn show_track_info( &mut self );

    fn set_time_text( &mut self, elapsed: &str, duration: &str );

    /// Progress indicator offset, already clamped to the bar's travel.
    fn set_progress_indicator( &mut self, left: f64 );

    /// Width of the buffered-range fill, in percent of the bar.
    fn set_buffered( &mut self, percent: f64 );

    /// Volume indicator offset, already clamped to the bar's travel.
    fn set_volume_indicator( &mut self, left: f64 );

    /// Shows the toggle button as "pause" while playing and "play" otherwise.
    fn set_play_button( &mut self, playing: bool );

    fn set_previous_enabled( &mut self, enabled: bool );

    fn set_next_enabled( &mut self, enabled: bool );

    fn set_loop_button( &mut self, on: bool );

    fn set_page_title( &mut self, title: &str );

    /// Shows a blocking notification to the user.
    fn notify( &mut self, message: &str );
}
