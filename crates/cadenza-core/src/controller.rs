//! Playback controller
//!
//! The controller owns the playlist and the player state. It turns user
//! actions (transport buttons, playlist clicks, bar drags) and media signals
//! (time update, ended, error) into commands on the media resource and
//! updates on the view, keeping indicators and button states consistent
//! with what is loaded and playing.

use crate::indicator::constrain;
use crate::media::{ MediaElement, MediaError, MediaEvent, ReadyState };
use crate::playlist::{ Playlist, Track };
use crate::time::format_time;
use crate::view::PlayerView;


/// Elapsed time after which "previous" restarts the current track instead
/// of moving back one track.
pub const RESTART_THRESHOLD_SECS: f64 = 2.0;

/// Prepended to the page title while a track is playing.
pub const PLAYING_TITLE_PREFIX: &str = "\u{25B6} ";


/// Host-provided player options.
#[derive( Debug, Clone, PartialEq )]
pub struct PlayerConfig {
    /// Replay the current track when it ends instead of advancing.
    pub loop_track: bool,

    /// Mirror the track title (and play state) into the page title.
    pub change_page_title: bool,

    /// Initial volume, 1.0 when absent.
    pub volume: Option<f64>,
}


impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            loop_track: false,
            change_page_title: true,
            volume: None,
        }
    }
}


/// Snapshot of the controller's state.
#[derive( Debug, Clone, Copy, PartialEq )]
pub struct PlayerState {
    pub current_track_index: Option<usize>,
    pub is_track_loaded: bool,
    pub is_looping: bool,
    pub is_playing: bool,
    pub volume: f64,
    pub change_page_title: bool,
}


/// The loaded track as exposed to the host.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct CurrentTrack {
    pub index: usize,
    pub title: String,
}


/// Which indicator a pointer drag is moving.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum DragTarget {
    Progress,
    Volume,
}


/// Playback state machine between a media resource and a view.
pub struct PlaybackController<M, V> {
    media: M,
    view: V,
    playlist: Playlist,
    state: PlayerState,
    drag: Option<DragTarget>,
    /// Cleared while the progress indicator is being dragged.
    time_updates_attached: bool,
    /// Page title without the playing decoration.
    page_title: String,
}


impl<M: MediaElement, V: PlayerView> PlaybackController<M, V> {
    /// Creates the controller, renders the playlist and applies the initial
    /// loop and volume settings.
    pub fn new( media: M, view: V, playlist: Playlist, config: PlayerConfig ) -> Self {
        let mut controller = Self {
            media,
            view,
            playlist,
            state: PlayerState {
                current_track_index: None,
                is_track_loaded: false,
                is_looping: config.loop_track,
                is_playing: false,
                volume: 1.0,
                change_page_title: config.change_page_title,
            },
            drag: None,
            time_updates_attached: true,
            page_title: String::new(),
        };

        controller.view.render_playlist( controller.playlist.tracks() );
        controller.view.set_loop_button( controller.state.is_looping );
        controller.update_play_status();
        controller.set_volume( config.volume.unwrap_or( 1.0 ) );

        tracing::info!(
            "Player ready: {} tracks, loop={}, volume={}",
            controller.playlist.len(),
            controller.state.is_looping,
            controller.state.volume
        );

        controller
    }


    /// Loads the track at `index` (clamped into the playlist) and starts it.
    pub fn load_track( &mut self, index: usize ) {
        let Some( index ) = self.clamp_to_playlist( index ) else {
            tracing::warn!( "Cannot load track {}: playlist is empty", index );
            return;
        };

        if self.state.is_playing {
            self.media.pause();
            self.state.is_playing = false;
        }

        let ( title, url ) = {
            let track = &self.playlist.tracks()[ index ];
            ( track.title().to_string(), track.source_url().to_string() )
        };

        tracing::info!( "Loading track {}: {} ({})", index, title, url );

        self.media.set_source( &url );
        self.media.load();
        self.view.set_progress_indicator( 0.0 );

        self.state.current_track_index = Some( index );
        self.state.is_track_loaded = true;

        self.view.set_track_title( &title );
        self.page_title = title;
        self.view.set_active_item( index );
        self.view.show_track_info();

        self.play_back();
    }


    /// Handles a click on a playlist item.
    ///
    /// A different track is loaded from the start; the loaded track toggles.
    /// Out-of-range indices select the last track.
    pub fn select_track( &mut self, index: usize ) {
        let Some( index ) = self.clamp_to_playlist( index ) else {
            tracing::warn!( "Cannot select track {}: playlist is empty", index );
            return;
        };

        if self.state.current_track_index != Some( index ) {
            self.unload();
            self.state.current_track_index = None;
        }

        if self.state.is_track_loaded {
            self.play_back();
        } else {
            self.load_track( index );
        }
    }


    /// Plays or pauses. Loads the first track when nothing is loaded.
    pub fn toggle_playback( &mut self ) {
        if self.state.is_track_loaded {
            self.play_back();
        } else {
            self.load_track( 0 );
        }
    }


    /// Moves to the next track. Does nothing at the last track.
    pub fn next( &mut self ) {
        match ( self.state.current_track_index, self.playlist.last_index() ) {
            ( _, None ) => {}
            ( None, Some( _ ) ) => self.load_track( 0 ),
            ( Some( current ), Some( last ) ) if current >= last => {
                tracing::debug!( "Next ignored at the last track" );
            }
            ( Some( current ), Some( _ ) ) => {
                self.unload();
                self.load_track( current + 1 );
            }
        }
    }


    /// Restarts the current track when more than two seconds have played,
    /// otherwise moves to the previous track. Does nothing at the first.
    pub fn previous( &mut self ) {
        if self.state.is_track_loaded && self.media.current_time() > RESTART_THRESHOLD_SECS {
            tracing::info!( "Restarting current track" );
            self.media.set_current_time( 0.0 );
            self.view.set_progress_indicator( 0.0 );
            return;
        }

        match self.state.current_track_index {
            Some( current ) if current > 0 => {
                self.unload();
                self.load_track( current - 1 );
            }
            _ => tracing::debug!( "Previous ignored at the first track" ),
        }
    }


    /// Sets the volume, clamped to `[0, 1]`, and moves the volume indicator.
    pub fn set_volume( &mut self, volume: f64 ) {
        if volume.is_nan() {
            tracing::warn!( "Ignoring NaN volume" );
            return;
        }

        let volume = constrain( volume, 0.0, 1.0 );
        let bar = self.view.volume_bar();
        self.view.set_volume_indicator( bar.clamp( bar.travel() * volume ) );
        self.apply_volume( volume );
    }


    pub fn toggle_loop( &mut self ) {
        self.state.is_looping = !self.state.is_looping;
        self.view.set_loop_button( self.state.is_looping );
        tracing::info!( "Loop {}", if self.state.is_looping { "on" } else { "off" } );
    }


    /// Seeks to a fraction of the loaded track's duration.
    pub fn seek( &mut self, fraction: f64 ) {
        if !self.state.is_track_loaded {
            tracing::debug!( "Seek ignored: no track loaded" );
            return;
        }

        let duration = self.media.duration();
        if !duration.is_finite() {
            tracing::debug!( "Seek ignored: duration unknown" );
            return;
        }

        let fraction = constrain( fraction, 0.0, 1.0 );
        self.media.set_current_time( duration * fraction );

        let bar = self.view.progress_bar();
        self.view.set_progress_indicator( bar.position_for_fraction( fraction ) );
    }


    /// Enables or disables page-title updates.
    pub fn set_change_page_title( &mut self, enabled: bool ) {
        self.state.change_page_title = enabled;
        if enabled {
            self.refresh_page_title();
        }
    }


    /// Like [`set_change_page_title`](Self::set_change_page_title), from a
    /// `"true"`/`"false"` attribute value.
    pub fn set_change_page_title_str( &mut self, value: &str ) -> Result<(), crate::CommandError> {
        let enabled = crate::command::parse_flag( value )?;
        self.set_change_page_title( enabled );
        Ok(())
    }


    /// Dispatches a media signal.
    ///
    /// Time updates are dropped while the progress indicator is dragged.
    pub fn handle_media_event( &mut self, event: MediaEvent ) {
        match event {
            MediaEvent::TimeUpdate if self.time_updates_attached => self.on_time_update(),
            MediaEvent::TimeUpdate => {}
            MediaEvent::Ended => self.on_track_ended(),
            MediaEvent::Error( error ) => self.on_error( error ),
        }
    }


    /// Drains and dispatches pending media signals.
    pub fn poll_media( &mut self ) {
        for event in self.media.poll_events() {
            self.handle_media_event( event );
        }
    }


    /// Advances (or with looping, replays) after a natural end of track.
    /// Past the last track playback wraps to the first.
    pub fn on_track_ended( &mut self ) {
        let Some( current ) = self.state.current_track_index else {
            return;
        };

        let next = if self.state.is_looping {
            current
        } else if Some( current ) == self.playlist.last_index() {
            0
        } else {
            current + 1
        };

        tracing::info!( "Track {} ended, continuing with {}", current, next );

        self.unload();
        self.load_track( next );
    }


    /// Refreshes the elapsed/duration text, progress indicator and buffered
    /// fill from the media resource.
    pub fn on_time_update( &mut self ) {
        let current = self.media.current_time();
        let duration = self.media.duration();

        self.view.set_time_text( &format_time( current ), &format_time( duration ) );

        let ratio = if duration.is_finite() && duration > 0.0 {
            current / duration
        } else {
            0.0
        };
        let bar = self.view.progress_bar();
        self.view.set_progress_indicator( bar.position_for_fraction( ratio ) );

        self.update_buffered( duration );
    }


    /// Re-positions the indicators after the host re-measured its bars.
    ///
    /// A bar being dragged is left where the pointer put it.
    pub fn relayout( &mut self ) {
        if self.drag != Some( DragTarget::Volume ) {
            let bar = self.view.volume_bar();
            self.view.set_volume_indicator( bar.clamp( bar.travel() * self.state.volume ) );
        }

        if self.state.is_track_loaded && self.time_updates_attached {
            self.on_time_update();
        }
    }


    /// Reports a media failure and returns to the "not loaded" state.
    pub fn on_error( &mut self, error: MediaError ) {
        tracing::error!( "Media error on track {:?}: {:?}", self.state.current_track_index, error );

        self.view.notify( &error.to_string() );

        if self.drag == Some( DragTarget::Progress ) {
            self.drag = None;
            self.time_updates_attached = true;
        }

        self.state.is_playing = false;
        self.state.is_track_loaded = false;
        self.update_play_status();
        self.refresh_page_title();
    }


    /// Pointer pressed on the progress bar or its indicator.
    pub fn progress_pointer_down( &mut self, page_x: f64 ) {
        if !self.state.is_track_loaded {
            return;
        }

        self.move_progress_indicator( page_x );
        self.time_updates_attached = false;
        self.drag = Some( DragTarget::Progress );
    }


    /// Pointer pressed on the volume bar or its indicator.
    pub fn volume_pointer_down( &mut self, page_x: f64 ) {
        self.move_volume_indicator( page_x );
        self.drag = Some( DragTarget::Volume );
    }


    /// Pointer moved; repositions whichever indicator is being dragged.
    pub fn pointer_move( &mut self, page_x: f64 ) {
        match self.drag {
            Some( DragTarget::Progress ) => self.move_progress_indicator( page_x ),
            Some( DragTarget::Volume ) => self.move_volume_indicator( page_x ),
            None => {}
        }
    }


    /// Pointer released; finalizes the seek or volume change.
    pub fn pointer_up( &mut self, page_x: f64 ) {
        match self.drag.take() {
            Some( DragTarget::Progress ) => {
                let fraction = self.view.progress_bar().pointer_fraction( page_x );
                let duration = self.media.duration();
                if duration.is_finite() {
                    self.media.set_current_time( duration * fraction );
                }
                self.time_updates_attached = true;
            }
            Some( DragTarget::Volume ) => {
                let fraction = self.view.volume_bar().pointer_fraction( page_x );
                self.apply_volume( fraction );
            }
            None => {}
        }
    }


    /// The loaded track, or `None` when nothing is loaded.
    pub fn current_track( &self ) -> Option<CurrentTrack> {
        if !self.state.is_track_loaded {
            return None;
        }

        let index = self.state.current_track_index?;
        self.playlist.get( index ).map( |track| CurrentTrack {
            index,
            title: track.title().to_string(),
        })
    }


    pub fn playlist( &self ) -> &[Track] {
        self.playlist.tracks()
    }


    pub fn state( &self ) -> PlayerState {
        self.state
    }


    pub fn drag( &self ) -> Option<DragTarget> {
        self.drag
    }


    pub fn time_updates_attached( &self ) -> bool {
        self.time_updates_attached
    }


    pub fn media( &self ) -> &M {
        &self.media
    }


    pub fn media_mut( &mut self ) -> &mut M {
        &mut self.media
    }


    pub fn view( &self ) -> &V {
        &self.view
    }


    pub fn view_mut( &mut self ) -> &mut V {
        &mut self.view
    }


    fn play_back( &mut self ) {
        if self.media.paused() {
            self.media.play();
            self.state.is_playing = true;
        } else {
            self.media.pause();
            self.state.is_playing = false;
        }

        self.update_play_status();
        self.refresh_page_title();
    }


    /// Stops whatever is playing and marks the track as not loaded.
    fn unload( &mut self ) {
        if self.state.is_playing {
            self.media.pause();
            self.state.is_playing = false;
        }
        self.state.is_track_loaded = false;
        self.view.set_play_button( false );
    }


    fn update_play_status( &mut self ) {
        self.view.set_play_button( self.state.is_playing );

        let current = self.state.current_track_index;
        self.view.set_previous_enabled( current.is_some_and( |index| index > 0 ) );

        let next_enabled = match ( current, self.playlist.last_index() ) {
            ( _, None ) => false,
            ( None, Some( _ ) ) => true,
            ( Some( index ), Some( last ) ) => index < last,
        };
        self.view.set_next_enabled( next_enabled );
    }


    fn refresh_page_title( &mut self ) {
        if !self.state.change_page_title || self.page_title.is_empty() {
            return;
        }

        if self.state.is_playing {
            let title = format!( "{}{}", PLAYING_TITLE_PREFIX, self.page_title );
            self.view.set_page_title( &title );
        } else {
            self.view.set_page_title( &self.page_title );
        }
    }


    fn update_buffered( &mut self, duration: f64 ) {
        let mut percent = 0.0;
        if self.media.ready_state() == ReadyState::HaveEnoughData && duration.is_finite() && duration > 0.0 {
            if let Some( end ) = self.media.buffered_end() {
                percent = constrain( end * 100.0 / duration, 0.0, 100.0 );
            }
        }
        self.view.set_buffered( percent );
    }


    fn clamp_to_playlist( &self, index: usize ) -> Option<usize> {
        self.playlist.clamp_index( i64::try_from( index ).unwrap_or( i64::MAX ) )
    }


    fn apply_volume( &mut self, volume: f64 ) {
        self.media.set_volume( volume );
        self.state.volume = volume;
    }


    fn move_progress_indicator( &mut self, page_x: f64 ) {
        let bar = self.view.progress_bar();
        self.view.set_progress_indicator( bar.clamp( bar.pointer_offset( page_x ) ) );
    }


    fn move_volume_indicator( &mut self, page_x: f64 ) {
        let bar = self.view.volume_bar();
        self.view.set_volume_indicator( bar.clamp( bar.pointer_offset( page_x ) ) );
        self.apply_volume( bar.pointer_fraction( page_x ) );
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::indicator::BarGeometry;
    use crate::playlist::SourceDecl;


    #[derive( Default )]
    struct FakeMedia {
        source: Option<String>,
        loads: usize,
        paused: bool,
        time: f64,
        duration: f64,
        volume: f64,
        ready: ReadyState,
        buffered: Option<f64>,
        events: VecDeque<MediaEvent>,
    }


    impl MediaElement for FakeMedia {
        fn set_source( &mut self, url: &str ) {
            self.source = Some( url.to_string() );
        }

        fn load( &mut self ) {
            self.loads += 1;
            self.paused = true;
            self.time = 0.0;
        }

        fn play( &mut self ) {
            self.paused = false;
        }

        fn pause( &mut self ) {
            self.paused = true;
        }

        fn paused( &self ) -> bool {
            self.paused
        }

        fn current_time( &self ) -> f64 {
            self.time
        }

        fn set_current_time( &mut self, seconds: f64 ) {
            self.time = seconds;
        }

        fn duration( &self ) -> f64 {
            self.duration
        }

        fn set_volume( &mut self, volume: f64 ) {
            self.volume = volume;
        }

        fn ready_state( &self ) -> ReadyState {
            self.ready
        }

        fn buffered_end( &self ) -> Option<f64> {
            self.buffered
        }

        fn poll_events( &mut self ) -> Vec<MediaEvent> {
            self.events.drain( .. ).collect()
        }
    }


    #[derive( Default )]
    struct RecordingView {
        items: Vec<String>,
        active: Option<usize>,
        title: String,
        info_visible: bool,
        elapsed: String,
        total: String,
        progress: f64,
        buffered: f64,
        volume_left: f64,
        playing: bool,
        previous_enabled: bool,
        next_enabled: bool,
        loop_on: bool,
        page_title: Option<String>,
        notices: Vec<String>,
        /// Doubles both bars, as after a host resize
        wide: bool,
    }


    impl PlayerView for RecordingView {
        fn progress_bar( &self ) -> BarGeometry {
            match self.wide {
                true => BarGeometry::new( 10.0, 410.0, 10.0 ),
                false => BarGeometry::new( 10.0, 210.0, 10.0 ),
            }
        }

        fn volume_bar( &self ) -> BarGeometry {
            match self.wide {
                true => BarGeometry::new( 300.0, 204.0, 4.0 ),
                false => BarGeometry::new( 300.0, 104.0, 4.0 ),
            }
        }

        fn render_playlist( &mut self, tracks: &[Track] ) {
            self.items = tracks.iter().map( |t| t.title().to_string() ).collect();
        }

        fn set_active_item( &mut self, index: usize ) {
            self.active = Some( index );
        }

        fn set_track_title( &mut self, title: &str ) {
            self.title = title.to_string();
        }

        fn show_track_info( &mut self ) {
            self.info_visible = true;
        }

        fn set_time_text( &mut self, elapsed: &str, duration: &str ) {
            self.elapsed = elapsed.to_string();
            self.total = duration.to_string();
        }

        fn set_progress_indicator( &mut self, left: f64 ) {
            self.progress = left;
        }

        fn set_buffered( &mut self, percent: f64 ) {
            self.buffered = percent;
        }

        fn set_volume_indicator( &mut self, left: f64 ) {
            self.volume_left = left;
        }

        fn set_play_button( &mut self, playing: bool ) {
            self.playing = playing;
        }

        fn set_previous_enabled( &mut self, enabled: bool ) {
            self.previous_enabled = enabled;
        }

        fn set_next_enabled( &mut self, enabled: bool ) {
            self.next_enabled = enabled;
        }

        fn set_loop_button( &mut self, on: bool ) {
            self.loop_on = on;
        }

        fn set_page_title( &mut self, title: &str ) {
            self.page_title = Some( title.to_string() );
        }

        fn notify( &mut self, message: &str ) {
            self.notices.push( message.to_string() );
        }
    }


    type TestController = PlaybackController<FakeMedia, RecordingView>;


    fn controller_with( tracks: usize, config: PlayerConfig ) -> TestController {
        let sources = ( 0..tracks ).map( |i| SourceDecl::new( format!( "Track {}", i ), format!( "media/{}.mp3", i ) ) );
        let media = FakeMedia { duration: f64::NAN, ..FakeMedia::default() };
        PlaybackController::new( media, RecordingView::default(), Playlist::from_sources( sources ), config )
    }


    fn controller( tracks: usize ) -> TestController {
        controller_with( tracks, PlayerConfig::default() )
    }


    #[test]
    fn test_new_renders_playlist_and_defaults() {
        let c = controller( 3 );
        assert_eq!( c.view().items, vec![ "Track 0", "Track 1", "Track 2" ] );
        assert!( !c.view().previous_enabled );
        assert!( !c.view().playing );
        assert_eq!( c.media().volume, 1.0 );
        assert_eq!( c.view().volume_left, 100.0 );
        assert!( c.current_track().is_none() );
        assert_eq!( c.state().current_track_index, None );
    }


    #[test]
    fn test_initial_volume_and_loop_from_config() {
        let config = PlayerConfig { loop_track: true, volume: Some( 0.25 ), ..PlayerConfig::default() };
        let c = controller_with( 2, config );
        assert!( c.state().is_looping );
        assert!( c.view().loop_on );
        assert_eq!( c.media().volume, 0.25 );
        assert_eq!( c.view().volume_left, 25.0 );
    }


    #[test]
    fn test_toggle_with_nothing_loaded_loads_first_track() {
        let mut c = controller( 3 );
        c.toggle_playback();

        let state = c.state();
        assert_eq!( state.current_track_index, Some( 0 ) );
        assert!( state.is_track_loaded );
        assert!( state.is_playing );
        assert_eq!( c.media().source.as_deref(), Some( "media/0.mp3" ) );
        assert!( !c.media().paused );
        assert_eq!( c.view().active, Some( 0 ) );
        assert_eq!( c.view().title, "Track 0" );
        assert!( c.view().info_visible );
        assert!( c.view().playing );
        assert_eq!( c.view().page_title.as_deref(), Some( "\u{25B6} Track 0" ) );
    }


    #[test]
    fn test_toggle_pauses_and_resumes() {
        let mut c = controller( 2 );
        c.toggle_playback();
        c.toggle_playback();

        assert!( !c.state().is_playing );
        assert!( c.state().is_track_loaded );
        assert!( c.media().paused );
        assert!( !c.view().playing );
        assert_eq!( c.view().page_title.as_deref(), Some( "Track 0" ) );

        c.toggle_playback();
        assert!( c.state().is_playing );
        assert_eq!( c.media().loads, 1 );
    }


    #[test]
    fn test_load_track_clamps_out_of_range() {
        let mut c = controller( 3 );
        c.load_track( 42 );
        assert_eq!( c.state().current_track_index, Some( 2 ) );
        assert_eq!( c.media().source.as_deref(), Some( "media/2.mp3" ) );
        assert!( !c.view().next_enabled );
        assert!( c.view().previous_enabled );

        c.load_track( usize::MAX );
        assert_eq!( c.state().current_track_index, Some( 2 ) );
    }


    #[test]
    fn test_load_track_on_empty_playlist_is_ignored() {
        let mut c = controller( 0 );
        c.load_track( 0 );
        c.toggle_playback();
        assert!( !c.state().is_track_loaded );
        assert_eq!( c.media().loads, 0 );
    }


    #[test]
    fn test_load_track_resets_progress_indicator() {
        let mut c = controller( 2 );
        c.load_track( 0 );
        c.view_mut().progress = 77.0;
        c.load_track( 1 );
        assert_eq!( c.view().progress, 0.0 );
    }


    #[test]
    fn test_current_track_reports_index_and_title() {
        let mut c = controller( 3 );
        c.load_track( 1 );
        assert_eq!( c.current_track(), Some( CurrentTrack { index: 1, title: "Track 1".into() } ) );
    }


    #[test]
    fn test_playlist_exposes_tracks() {
        let c = controller( 2 );
        let tracks = c.playlist();
        assert_eq!( tracks.len(), 2 );
        assert_eq!( tracks[ 1 ].index(), 1 );
        assert_eq!( tracks[ 1 ].source_url(), "media/1.mp3" );
    }


    #[test]
    fn test_next_advances_and_stops_at_last() {
        let mut c = controller( 2 );
        c.load_track( 0 );
        c.next();
        assert_eq!( c.state().current_track_index, Some( 1 ) );
        assert!( c.state().is_playing );

        let loads = c.media().loads;
        c.next();
        assert_eq!( c.state().current_track_index, Some( 1 ) );
        assert_eq!( c.media().loads, loads );
    }


    #[test]
    fn test_previous_restarts_after_threshold() {
        let mut c = controller( 3 );
        c.load_track( 2 );
        c.media_mut().time = 2.5;
        c.previous();

        assert_eq!( c.state().current_track_index, Some( 2 ) );
        assert_eq!( c.media().time, 0.0 );
        assert_eq!( c.media().loads, 1 );
    }


    #[test]
    fn test_previous_moves_back_within_threshold() {
        let mut c = controller( 3 );
        c.load_track( 2 );
        c.media_mut().time = 2.0;
        c.previous();

        assert_eq!( c.state().current_track_index, Some( 1 ) );
        assert_eq!( c.media().source.as_deref(), Some( "media/1.mp3" ) );
        assert!( c.state().is_playing );
    }


    #[test]
    fn test_previous_at_first_track_is_ignored() {
        let mut c = controller( 3 );
        c.load_track( 0 );
        c.previous();
        assert_eq!( c.state().current_track_index, Some( 0 ) );
        assert_eq!( c.media().loads, 1 );
    }


    #[test]
    fn test_set_volume_clamps() {
        let mut c = controller( 1 );
        c.set_volume( -0.5 );
        assert_eq!( c.media().volume, 0.0 );
        assert_eq!( c.view().volume_left, 0.0 );

        c.set_volume( 1.5 );
        assert_eq!( c.media().volume, 1.0 );
        assert_eq!( c.state().volume, 1.0 );
        assert_eq!( c.view().volume_left, 100.0 );

        c.set_volume( f64::NAN );
        assert_eq!( c.media().volume, 1.0 );
    }


    #[test]
    fn test_toggle_loop() {
        let mut c = controller( 1 );
        c.toggle_loop();
        assert!( c.state().is_looping );
        assert!( c.view().loop_on );
        c.toggle_loop();
        assert!( !c.view().loop_on );
    }


    #[test]
    fn test_seek_sets_time_from_fraction() {
        let mut c = controller( 1 );
        c.media_mut().duration = 200.0;
        c.load_track( 0 );
        c.seek( 0.25 );
        assert_eq!( c.media().time, 50.0 );
        assert_eq!( c.view().progress, 50.0 );
    }


    #[test]
    fn test_seek_without_track_is_ignored() {
        let mut c = controller( 1 );
        c.media_mut().duration = 200.0;
        c.seek( 0.5 );
        assert_eq!( c.media().time, 0.0 );
    }


    #[test]
    fn test_ended_on_last_track_wraps_to_first() {
        let mut c = controller( 3 );
        c.load_track( 2 );
        c.handle_media_event( MediaEvent::Ended );

        assert_eq!( c.state().current_track_index, Some( 0 ) );
        assert!( c.state().is_playing );
        assert_eq!( c.media().source.as_deref(), Some( "media/0.mp3" ) );
    }


    #[test]
    fn test_ended_advances_to_next() {
        let mut c = controller( 3 );
        c.load_track( 0 );
        c.on_track_ended();
        assert_eq!( c.state().current_track_index, Some( 1 ) );
    }


    #[test]
    fn test_ended_while_looping_replays_same_track() {
        let mut c = controller( 3 );
        c.load_track( 2 );
        c.toggle_loop();
        c.media_mut().time = 180.0;
        c.on_track_ended();

        assert_eq!( c.state().current_track_index, Some( 2 ) );
        assert_eq!( c.media().time, 0.0 );
        assert_eq!( c.media().loads, 2 );
        assert!( c.state().is_playing );
    }


    #[test]
    fn test_time_update_refreshes_text_and_indicator() {
        let mut c = controller( 1 );
        c.media_mut().duration = 100.0;
        c.load_track( 0 );
        c.media_mut().time = 65.0;
        c.media_mut().ready = ReadyState::HaveEnoughData;
        c.media_mut().buffered = Some( 80.0 );
        c.handle_media_event( MediaEvent::TimeUpdate );

        assert_eq!( c.view().elapsed, "01:05" );
        assert_eq!( c.view().total, "01:40" );
        assert_eq!( c.view().progress, 130.0 );
        assert_eq!( c.view().buffered, 80.0 );
    }


    #[test]
    fn test_time_update_with_unknown_duration() {
        let mut c = controller( 1 );
        c.load_track( 0 );
        c.media_mut().time = 3.0;
        c.on_time_update();

        assert_eq!( c.view().elapsed, "00:03" );
        assert_eq!( c.view().total, "00:00" );
        assert_eq!( c.view().progress, 0.0 );
        assert_eq!( c.view().buffered, 0.0 );
    }


    #[test]
    fn test_error_resets_to_not_loaded() {
        let mut c = controller( 2 );
        c.load_track( 1 );
        c.media_mut().events.push_back( MediaEvent::Error( MediaError::SourceNotSupported ) );
        c.poll_media();

        let state = c.state();
        assert!( !state.is_track_loaded );
        assert!( !state.is_playing );
        assert!( !c.view().playing );
        assert_eq!( c.view().notices, vec![ MediaError::SourceNotSupported.to_string() ] );
        assert!( c.current_track().is_none() );
        assert_eq!( c.view().page_title.as_deref(), Some( "Track 1" ) );

        // The user can pick another track afterwards.
        c.select_track( 0 );
        assert!( c.state().is_playing );
        assert_eq!( c.current_track().map( |t| t.index ), Some( 0 ) );
    }


    #[test]
    fn test_select_other_track_loads_it() {
        let mut c = controller( 3 );
        c.load_track( 0 );
        c.select_track( 2 );
        assert_eq!( c.state().current_track_index, Some( 2 ) );
        assert!( c.state().is_playing );
        assert_eq!( c.view().active, Some( 2 ) );
    }


    #[test]
    fn test_select_out_of_range_toggles_loaded_last_track() {
        let mut c = controller( 3 );
        c.load_track( 2 );
        assert!( c.state().is_playing );

        c.select_track( 9 );
        assert!( !c.state().is_playing );
        assert!( c.state().is_track_loaded );
        assert_eq!( c.state().current_track_index, Some( 2 ) );
        assert_eq!( c.media().loads, 1 );
    }


    #[test]
    fn test_select_on_empty_playlist_is_ignored() {
        let mut c = controller( 0 );
        c.select_track( 0 );
        assert!( !c.state().is_track_loaded );
        assert_eq!( c.media().loads, 0 );
    }


    #[test]
    fn test_select_loaded_track_toggles() {
        let mut c = controller( 3 );
        c.select_track( 1 );
        c.select_track( 1 );
        assert!( !c.state().is_playing );
        assert!( c.state().is_track_loaded );
        assert_eq!( c.media().loads, 1 );
    }


    #[test]
    fn test_progress_drag_detaches_time_updates() {
        let mut c = controller( 1 );
        c.media_mut().duration = 100.0;
        c.load_track( 0 );

        c.progress_pointer_down( 60.0 );
        assert_eq!( c.drag(), Some( DragTarget::Progress ) );
        assert!( !c.time_updates_attached() );
        assert_eq!( c.view().progress, 50.0 );

        c.pointer_move( 500.0 );
        assert_eq!( c.view().progress, 200.0 );

        c.media_mut().time = 10.0;
        c.handle_media_event( MediaEvent::TimeUpdate );
        assert_eq!( c.view().progress, 200.0 );

        c.pointer_up( 115.0 );
        assert_eq!( c.media().time, 50.0 );
        assert!( c.time_updates_attached() );
        assert_eq!( c.drag(), None );
    }


    #[test]
    fn test_progress_drag_requires_loaded_track() {
        let mut c = controller( 1 );
        c.progress_pointer_down( 60.0 );
        assert_eq!( c.drag(), None );
        assert!( c.time_updates_attached() );
    }


    #[test]
    fn test_volume_drag() {
        let mut c = controller( 1 );
        c.volume_pointer_down( 352.0 );
        assert_eq!( c.drag(), Some( DragTarget::Volume ) );
        assert_eq!( c.view().volume_left, 52.0 );
        assert_eq!( c.media().volume, 0.5 );

        c.pointer_move( 0.0 );
        assert_eq!( c.view().volume_left, 0.0 );
        assert_eq!( c.media().volume, 0.0 );

        c.pointer_up( 1000.0 );
        assert_eq!( c.media().volume, 1.0 );
        assert_eq!( c.drag(), None );
    }


    #[test]
    fn test_relayout_moves_indicators_to_new_bars() {
        let mut c = controller( 1 );
        c.media_mut().duration = 100.0;
        c.load_track( 0 );
        c.media_mut().time = 50.0;
        c.set_volume( 0.5 );
        assert_eq!( c.view().volume_left, 50.0 );

        c.view_mut().wide = true;
        c.relayout();
        assert_eq!( c.view().progress, 200.0 );
        assert_eq!( c.view().volume_left, 100.0 );
        assert_eq!( c.view().elapsed, "00:50" );
    }


    #[test]
    fn test_relayout_during_progress_drag_keeps_pointer_position() {
        let mut c = controller( 1 );
        c.media_mut().duration = 100.0;
        c.load_track( 0 );

        c.progress_pointer_down( 60.0 );
        assert_eq!( c.view().progress, 50.0 );

        c.media_mut().time = 10.0;
        c.view_mut().wide = true;
        c.relayout();
        assert_eq!( c.view().progress, 50.0 );
        assert_eq!( c.view().volume_left, 200.0 );
        assert_eq!( c.drag(), Some( DragTarget::Progress ) );
    }


    #[test]
    fn test_relayout_during_volume_drag_keeps_pointer_position() {
        let mut c = controller( 1 );
        c.volume_pointer_down( 352.0 );
        c.view_mut().wide = true;
        c.relayout();
        assert_eq!( c.view().volume_left, 52.0 );
    }


    #[test]
    fn test_pointer_up_without_drag_is_ignored() {
        let mut c = controller( 1 );
        c.set_volume( 0.3 );
        c.pointer_up( 1000.0 );
        assert_eq!( c.media().volume, 0.3 );
    }


    #[test]
    fn test_change_page_title_flag() {
        let mut c = controller_with( 2, PlayerConfig { change_page_title: false, ..PlayerConfig::default() } );
        c.load_track( 0 );
        assert_eq!( c.view().page_title, None );

        c.set_change_page_title_str( "true" ).unwrap();
        assert_eq!( c.view().page_title.as_deref(), Some( "\u{25B6} Track 0" ) );

        assert!( c.set_change_page_title_str( "maybe" ).is_err() );
        assert!( c.state().change_page_title );

        c.set_change_page_title( false );
        c.toggle_playback();
        assert_eq!( c.view().page_title.as_deref(), Some( "\u{25B6} Track 0" ) );
    }


    #[test]
    fn test_invariants_hold_through_a_session() {
        let mut c = controller( 3 );
        let check = |c: &TestController| {
            let state = c.state();
            if state.is_track_loaded {
                assert!( state.current_track_index.is_some_and( |i| i < 3 ) );
            }
            if state.is_playing {
                assert!( state.is_track_loaded );
            }
        };

        check( &c );
        c.toggle_playback();
        check( &c );
        c.next();
        check( &c );
        c.on_error( MediaError::Network );
        check( &c );
        c.next();
        check( &c );
        c.on_track_ended();
        check( &c );
        c.previous();
        check( &c );
    }
}
