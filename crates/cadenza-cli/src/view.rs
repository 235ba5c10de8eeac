//! Terminal view
//!
//! [`TerminalView`] is the widget state the controller writes into. Bars
//! are measured in terminal cells, so pointer coordinates are mouse columns
//! and every indicator is one cell wide.

use ratatui::layout::{ Constraint, Layout, Rect };

use cadenza_core::{ BarGeometry, PlayerView, Track };


/// Height of the now-playing box, borders included.
const NOW_PLAYING_HEIGHT: u16 = 5;

/// Width of the volume bar, in cells.
const VOLUME_BAR_WIDTH: u16 = 20;

/// Width of one transport button, in cells.
const BUTTON_WIDTH: u16 = 3;


/// A transport button.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Button {
    Previous,
    Toggle,
    Next,
    Loop,
}


impl Button {
    pub const ALL: [Button; 4] = [ Button::Previous, Button::Toggle, Button::Next, Button::Loop ];
}


/// Screen areas, recomputed whenever the terminal is resized.
#[derive( Debug, Clone, Copy, Default, PartialEq )]
pub struct Regions {
    pub now_playing: Rect,
    pub title_line: Rect,
    pub progress: Rect,
    pub buttons: [Rect; 4],
    pub volume: Rect,
    pub playlist: Rect,
    pub status: Rect,
}


impl Regions {
    pub fn compute( area: Rect ) -> Self {
        let [ now_playing, playlist, status ] = Layout::vertical([
            Constraint::Length( NOW_PLAYING_HEIGHT ),
            Constraint::Min( 3 ),
            Constraint::Length( 1 ),
        ]).areas( area );

        let inner = Rect {
            x: now_playing.x + 1,
            y: now_playing.y + 1,
            width: now_playing.width.saturating_sub( 2 ),
            height: now_playing.height.saturating_sub( 2 ),
        };
        let row = |offset: u16| Rect { y: inner.y + offset, height: 1, ..inner };

        let title_line = row( 0 );
        let progress = row( 1 );
        let controls = row( 2 );

        let mut buttons = [ Rect::default(); 4 ];
        for ( i, button ) in buttons.iter_mut().enumerate() {
            *button = Rect {
                x: controls.x + i as u16 * ( BUTTON_WIDTH + 1 ),
                width: BUTTON_WIDTH,
                ..controls
            }
            .intersection( controls );
        }

        let volume_width = VOLUME_BAR_WIDTH.min( controls.width / 2 );
        let volume = Rect {
            x: controls.x + controls.width - volume_width,
            width: volume_width,
            ..controls
        };

        Self { now_playing, title_line, progress, buttons, volume, playlist, status }
    }


    /// The button under a mouse position, if any.
    pub fn button_at( &self, column: u16, row: u16 ) -> Option<Button> {
        Button::ALL
            .into_iter()
            .zip( self.buttons )
            .find( |( _, area )| contains( *area, column, row ) )
            .map( |( button, _ )| button )
    }


    /// Playlist row under a mouse position, before scrolling.
    pub fn playlist_row_at( &self, column: u16, row: u16 ) -> Option<usize> {
        let area = self.playlist;
        let inside = column > area.x
            && column + 1 < area.x + area.width
            && row > area.y
            && row + 1 < area.y + area.height;
        inside.then( || ( row - area.y - 1 ) as usize )
    }
}


/// True when `( column, row )` falls inside `area`.
pub fn contains( area: Rect, column: u16, row: u16 ) -> bool {
    column >= area.x && column < area.x + area.width && row >= area.y && row < area.y + area.height
}


fn geometry( area: Rect ) -> BarGeometry {
    BarGeometry::new( area.x as f64, area.width as f64, 1.0 )
}


/// Widget state written by the controller and read by the renderer.
#[derive( Debug, Default )]
pub struct TerminalView {
    pub regions: Regions,
    pub items: Vec<String>,
    pub active: Option<usize>,
    pub track_title: String,
    pub info_visible: bool,
    pub elapsed: String,
    pub duration: String,
    pub progress_left: f64,
    pub buffered_percent: f64,
    pub volume_left: f64,
    pub playing: bool,
    pub previous_enabled: bool,
    pub next_enabled: bool,
    pub loop_on: bool,
    pub notification: Option<String>,
    pending_title: Option<String>,
}


impl TerminalView {
    pub fn new( area: Rect ) -> Self {
        Self {
            regions: Regions::compute( area ),
            elapsed: "00:00".to_string(),
            duration: "00:00".to_string(),
            ..Self::default()
        }
    }


    pub fn relayout( &mut self, area: Rect ) {
        self.regions = Regions::compute( area );
    }


    /// Terminal title set since the last call.
    pub fn take_page_title( &mut self ) -> Option<String> {
        self.pending_title.take()
    }


    pub fn dismiss_notification( &mut self ) {
        self.notification = None;
    }
}


impl PlayerView for TerminalView {
    fn progress_bar( &self ) -> BarGeometry {
        geometry( self.regions.progress )
    }


    fn volume_bar( &self ) -> BarGeometry {
        geometry( self.regions.volume )
    }


    fn render_playlist( &mut self, tracks: &[Track] ) {
        self.items = tracks
            .iter()
            .map( |track| format!( "{:>3}. {}", track.index() + 1, track.title() ) )
            .collect();
    }


    fn set_active_item( &mut self, index: usize ) {
        self.active = Some( index );
    }


    fn set_track_title( &mut self, title: &str ) {
        self.track_title = title.to_string();
    }


    fn show_track_info( &mut self ) {
        self.info_visible = true;
    }


    fn set_time_text( &mut self, elapsed: &str, duration: &str ) {
        self.elapsed = elapsed.to_string();
        self.duration = duration.to_string();
    }


    fn set_progress_indicator( &mut self, left: f64 ) {
        self.progress_left = left;
    }


    fn set_buffered( &mut self, percent: f64 ) {
        self.buffered_percent = percent;
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
        self.pending_title = Some( title.to_string() );
    }


    fn notify( &mut self, message: &str ) {
        self.notification = Some( message.to_string() );
    }
}


/// Renders a bar as text: buffered fill, track and a one-cell indicator.
pub fn bar_text( width: u16, indicator_left: f64, fill_percent: f64 ) -> String {
    let width = width as usize;
    if width == 0 {
        return String::new();
    }

    let indicator = ( indicator_left.max( 0.0 ) as usize ).min( width - 1 );
    let filled = ( ( fill_percent.clamp( 0.0, 100.0 ) / 100.0 ) * width as f64 ).round() as usize;

    ( 0..width )
        .map( |cell| match cell {
            c if c == indicator => '●',
            c if c < filled => '━',
            _ => '─',
        })
        .collect()
}


#[cfg( test )]
mod tests {
    use super::*;


    fn regions() -> Regions {
        Regions::compute( Rect::new( 0, 0, 80, 24 ) )
    }


    #[test]
    fn test_layout_rows() {
        let r = regions();
        assert_eq!( r.now_playing.height, NOW_PLAYING_HEIGHT );
        assert_eq!( r.progress, Rect::new( 1, 2, 78, 1 ) );
        assert_eq!( r.volume, Rect::new( 59, 3, 20, 1 ) );
        assert_eq!( r.status.y, 23 );
        assert_eq!( r.playlist.y, NOW_PLAYING_HEIGHT );
    }


    #[test]
    fn test_button_hit_testing() {
        let r = regions();
        assert_eq!( r.button_at( 1, 3 ), Some( Button::Previous ) );
        assert_eq!( r.button_at( 6, 3 ), Some( Button::Toggle ) );
        assert_eq!( r.button_at( 4, 3 ), None );
        assert_eq!( r.button_at( 13, 3 ), Some( Button::Loop ) );
        assert_eq!( r.button_at( 13, 2 ), None );
    }


    #[test]
    fn test_playlist_row_hit_testing() {
        let r = regions();
        assert_eq!( r.playlist_row_at( 10, r.playlist.y + 1 ), Some( 0 ) );
        assert_eq!( r.playlist_row_at( 10, r.playlist.y + 3 ), Some( 2 ) );
        assert_eq!( r.playlist_row_at( 10, r.playlist.y ), None );
        assert_eq!( r.playlist_row_at( 0, r.playlist.y + 1 ), None );
    }


    #[test]
    fn test_bar_geometry_in_cells() {
        let view = TerminalView::new( Rect::new( 0, 0, 80, 24 ) );
        let bar = view.volume_bar();
        assert_eq!( bar.offset_left, 59.0 );
        assert_eq!( bar.travel(), 19.0 );
    }


    #[test]
    fn test_bar_text() {
        assert_eq!( bar_text( 6, 2.0, 50.0 ), "━━●───" );
        assert_eq!( bar_text( 4, 99.0, 0.0 ), "───●" );
        assert_eq!( bar_text( 0, 0.0, 0.0 ), "" );
    }


    #[test]
    fn test_page_title_is_taken_once() {
        let mut view = TerminalView::default();
        view.set_page_title( "▶ Song" );
        assert_eq!( view.take_page_title().as_deref(), Some( "▶ Song" ) );
        assert_eq!( view.take_page_title(), None );
    }
}
