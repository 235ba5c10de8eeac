//! Cadenza CLI - terminal playlist player

mod cli;
mod input;
mod manifest;
mod view;

use std::fs::{ self, File };
use std::io;
use std::sync::Mutex;
use std::time::{ Duration, Instant };

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{ self, Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind },
    terminal::{ disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle },
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{ Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap },
};
use tracing_subscriber::EnvFilter;

use cadenza_core::{
    command::{ self, SeekTarget },
    Command, MediaElement, NativeMedia, PlaybackController, Playlist,
};

use cli::Args;
use input::{ InputBuffer, InputMode };
use manifest::Setup;
use view::{ bar_text, contains, Button, TerminalView };


/// Step for keyboard seeking and volume changes.
const KEY_STEP: f64 = 0.05;


type Player = PlaybackController<NativeMedia, TerminalView>;


/// Application state.
struct App {
    player: Player,
    should_quit: bool,

    // Keyboard cursor in the playlist
    playlist_state: ListState,

    input_mode: InputMode,
    input_buffer: InputBuffer,

    show_help: bool,

    status_message: Option<String>,
    status_clear_at: Option<Instant>,
}


impl App {
    fn new( setup: Setup, area: Rect ) -> Self {
        let playlist = Playlist::from_sources( setup.sources );
        let player = PlaybackController::new(
            NativeMedia::new(),
            TerminalView::new( area ),
            playlist,
            setup.config,
        );

        let mut playlist_state = ListState::default();
        playlist_state.select( Some( 0 ) );

        Self {
            player,
            should_quit: false,
            playlist_state,
            input_mode: InputMode::Normal,
            input_buffer: InputBuffer::new(),
            show_help: false,
            status_message: None,
            status_clear_at: None,
        }
    }


    /// Sets a status message that auto-clears after a delay.
    fn set_status( &mut self, msg: impl Into<String> ) {
        self.status_message = Some( msg.into() );
        self.status_clear_at = Some( Instant::now() + Duration::from_secs( 3 ) );
    }


    /// Dispatches media signals and expires status messages.
    fn tick( &mut self ) -> Result<()> {
        self.player.poll_media();

        if let Some( title ) = self.player.view_mut().take_page_title() {
            io::stdout().execute( SetTitle( title ) )?;
        }

        if self.status_clear_at.is_some_and( |at| Instant::now() >= at ) {
            self.status_message = None;
            self.status_clear_at = None;
        }

        Ok(())
    }


    fn notification_open( &self ) -> bool {
        self.player.view().notification.is_some()
    }


    fn handle_key( &mut self, code: KeyCode ) {
        // Notifications block all other input until dismissed
        if self.notification_open() {
            self.player.view_mut().dismiss_notification();
            return;
        }

        match self.input_mode {
            InputMode::Normal => self.handle_normal_key( code ),
            InputMode::Command => self.handle_command_key( code ),
        }
    }


    fn handle_normal_key( &mut self, code: KeyCode ) {
        if self.show_help {
            self.show_help = false;
            if matches!( code, KeyCode::Esc | KeyCode::Char( '?' ) ) {
                return;
            }
        }

        match code {
            KeyCode::Char( 'q' ) => self.should_quit = true,
            KeyCode::Char( '/' ) => {
                self.input_mode = InputMode::Command;
                self.input_buffer.clear();
            }
            KeyCode::Char( '?' ) => self.show_help = true,
            KeyCode::Char( ' ' ) => self.player.toggle_playback(),
            KeyCode::Char( 'n' ) => self.press( Button::Next ),
            KeyCode::Char( 'p' ) => self.press( Button::Previous ),
            KeyCode::Char( 'l' ) => self.player.toggle_loop(),
            KeyCode::Left => self.seek_by( -KEY_STEP ),
            KeyCode::Right => self.seek_by( KEY_STEP ),
            KeyCode::Char( '+' ) | KeyCode::Char( '=' ) => self.volume_by( KEY_STEP ),
            KeyCode::Char( '-' ) => self.volume_by( -KEY_STEP ),
            KeyCode::Up => self.move_cursor( -1 ),
            KeyCode::Down => self.move_cursor( 1 ),
            KeyCode::Enter => {
                if let Some( index ) = self.playlist_state.selected() {
                    self.player.select_track( index );
                }
            }
            _ => {}
        }
    }


    fn handle_command_key( &mut self, code: KeyCode ) {
        match code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                let input = self.input_buffer.take();
                self.execute_command( &input );
            }
            KeyCode::Backspace => self.input_buffer.backspace(),
            KeyCode::Char( c ) => self.input_buffer.push( c ),
            _ => {}
        }
    }


    fn handle_mouse( &mut self, column: u16, row: u16, kind: MouseEventKind ) {
        let x = column as f64;

        match kind {
            MouseEventKind::Down( MouseButton::Left ) => {
                if self.notification_open() {
                    self.player.view_mut().dismiss_notification();
                    return;
                }

                let regions = self.player.view().regions;
                if contains( regions.progress, column, row ) {
                    self.player.progress_pointer_down( x );
                } else if contains( regions.volume, column, row ) {
                    self.player.volume_pointer_down( x );
                } else if let Some( button ) = regions.button_at( column, row ) {
                    self.press( button );
                } else if let Some( row ) = regions.playlist_row_at( column, row ) {
                    let index = self.playlist_state.offset() + row;
                    if index < self.player.playlist().len() {
                        self.playlist_state.select( Some( index ) );
                        self.player.select_track( index );
                    }
                }
            }
            MouseEventKind::Drag( MouseButton::Left ) => self.player.pointer_move( x ),
            MouseEventKind::Up( MouseButton::Left ) => self.player.pointer_up( x ),
            MouseEventKind::ScrollUp => self.move_cursor( -1 ),
            MouseEventKind::ScrollDown => self.move_cursor( 1 ),
            _ => {}
        }
    }


    /// Re-measures the widgets and moves the indicators to match.
    fn handle_resize( &mut self, width: u16, height: u16 ) {
        self.player.view_mut().relayout( Rect::new( 0, 0, width, height ) );
        self.player.relayout();
    }


    fn press( &mut self, button: Button ) {
        match button {
            Button::Previous => self.player.previous(),
            Button::Toggle => self.player.toggle_playback(),
            Button::Next => self.player.next(),
            Button::Loop => self.player.toggle_loop(),
        }
    }


    fn elapsed( &self ) -> f64 {
        if self.player.state().is_track_loaded {
            self.player.media().current_time()
        } else {
            0.0
        }
    }


    fn seek_by( &mut self, delta: f64 ) {
        let duration = self.player.media().duration();
        if duration.is_finite() && duration > 0.0 {
            self.player.seek( self.elapsed() / duration + delta );
        }
    }


    fn volume_by( &mut self, delta: f64 ) {
        let volume = self.player.state().volume + delta;
        self.player.set_volume( volume );
    }


    fn move_cursor( &mut self, delta: i64 ) {
        let len = self.player.playlist().len();
        if len == 0 {
            return;
        }
        let current = self.playlist_state.selected().unwrap_or( 0 ) as i64;
        let next = ( current + delta ).clamp( 0, len as i64 - 1 );
        self.playlist_state.select( Some( next as usize ) );
    }


    fn execute_command( &mut self, input: &str ) {
        match Command::parse( input ) {
            Ok( cmd ) => self.run_command( cmd ),
            Err( e ) => self.set_status( e.to_string() ),
        }
    }


    fn run_command( &mut self, cmd: Command ) {
        tracing::debug!( "Command: {:?}", cmd );

        match cmd {
            Command::Toggle => self.player.toggle_playback(),
            Command::Next => self.player.next(),
            Command::Prev => self.player.previous(),
            Command::Loop => self.player.toggle_loop(),
            Command::Seek { target: SeekTarget::Fraction( fraction ) } => self.player.seek( fraction ),
            Command::Seek { target: SeekTarget::Time( position ) } => {
                let duration = self.player.media().duration();
                if duration.is_finite() && duration > 0.0 {
                    self.player.seek( position.as_secs_f64() / duration );
                } else {
                    self.set_status( "Nothing to seek in" );
                }
            }
            Command::Volume { level: Some( level ) } => self.player.set_volume( level as f64 / 100.0 ),
            Command::Volume { level: None } => {
                let percent = ( self.player.state().volume * 100.0 ).round();
                self.set_status( format!( "Volume: {}%", percent ) );
            }
            Command::Track { index } => {
                let index = index.min( self.player.playlist().len().saturating_sub( 1 ) );
                self.playlist_state.select( Some( index ) );
                self.player.select_track( index );
            }
            Command::Title { enabled } => {
                self.player.set_change_page_title( enabled );
                self.set_status( if enabled { "Title updates on" } else { "Title updates off" } );
            }
            Command::Help => self.show_help = true,
            Command::Quit => self.should_quit = true,
        }
    }
}


/// Logs to a file under the platform data directory; stdout belongs to the UI.
fn init_logging() {
    let Some( dir ) = dirs::data_local_dir().map( |d| d.join( "cadenza" ) ) else {
        return;
    };
    if fs::create_dir_all( &dir ).is_err() {
        return;
    }
    let Ok( file ) = File::create( dir.join( "cadenza.log" ) ) else {
        return;
    };

    let filter = EnvFilter::try_from_env( "CADENZA_LOG" ).unwrap_or_else( |_| EnvFilter::new( "info" ) );
    let _ = tracing_subscriber::fmt()
        .with_env_filter( filter )
        .with_writer( Mutex::new( file ) )
        .with_ansi( false )
        .try_init();
}


fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let setup = Setup::from_args( &args )?;

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute( EnterAlternateScreen )?;
    io::stdout().execute( crossterm::event::EnableMouseCapture )?;

    let mut terminal = Terminal::new( CrosstermBackend::new( io::stdout() ) )?;
    let size = terminal.size()?;

    let mut app = App::new( setup, Rect::new( 0, 0, size.width, size.height ) );
    let result = run( &mut terminal, &mut app );

    // Cleanup
    io::stdout().execute( crossterm::event::DisableMouseCapture )?;
    disable_raw_mode()?;
    io::stdout().execute( LeaveAlternateScreen )?;

    result
}


fn run( terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App ) -> Result<()> {
    while !app.should_quit {
        app.tick()?;

        terminal.draw( |frame| draw_ui( frame, app ) )?;

        if event::poll( Duration::from_millis( 50 ) )? {
            match event::read()? {
                Event::Key( key ) if key.kind == KeyEventKind::Press => app.handle_key( key.code ),
                Event::Mouse( mouse ) => app.handle_mouse( mouse.column, mouse.row, mouse.kind ),
                Event::Resize( width, height ) => app.handle_resize( width, height ),
                _ => {}
            }
        }
    }

    tracing::info!( "Quit" );
    Ok(())
}


/// Draws the main UI.
fn draw_ui( frame: &mut Frame, app: &mut App ) {
    let regions = app.player.view().regions;

    draw_now_playing( frame, app );
    draw_playlist( frame, app, regions.playlist );
    draw_status_bar( frame, app, regions.status );

    if app.show_help {
        draw_popup( frame, " Help ", command::help_text(), Color::Cyan );
    }

    if let Some( message ) = app.player.view().notification.clone() {
        draw_popup( frame, " Error ", &format!( "{}\n\nPress any key to continue.", message ), Color::Red );
    }
}


fn draw_now_playing( frame: &mut Frame, app: &App ) {
    let view = app.player.view();
    let regions = view.regions;

    frame.render_widget(
        Block::default().title( " Now Playing " ).borders( Borders::ALL ),
        regions.now_playing,
    );

    if view.info_visible {
        let time = format!( "{} / {}", view.elapsed, view.duration );
        let title_width = regions.title_line.width.saturating_sub( time.len() as u16 + 1 ) as usize;
        let title: String = view.track_title.chars().take( title_width ).collect();
        let line = Line::from( vec![
            Span::styled( format!( "{:<width$}", title, width = title_width ), Style::default().bold() ),
            Span::raw( " " ),
            Span::styled( time, Style::default().fg( Color::Gray ) ),
        ]);
        frame.render_widget( Paragraph::new( line ), regions.title_line );
    }

    let progress = bar_text( regions.progress.width, view.progress_left, view.buffered_percent );
    frame.render_widget( Paragraph::new( progress ).style( Style::default().fg( Color::Cyan ) ), regions.progress );

    let labels = [
        ( Button::Previous, "⏮", view.previous_enabled ),
        ( Button::Toggle, if view.playing { "⏸" } else { "▶" }, true ),
        ( Button::Next, "⏭", view.next_enabled ),
        ( Button::Loop, "⟲", view.loop_on ),
    ];
    for ( ( _, label, lit ), area ) in labels.into_iter().zip( regions.buttons ) {
        let style = if lit {
            Style::default().fg( Color::White ).bold()
        } else {
            Style::default().fg( Color::DarkGray )
        };
        frame.render_widget( Paragraph::new( format!( "[{}]", label ) ).style( style ), area );
    }

    let volume = bar_text( regions.volume.width, view.volume_left, 0.0 );
    frame.render_widget( Paragraph::new( volume ).style( Style::default().fg( Color::Green ) ), regions.volume );
}


fn draw_playlist( frame: &mut Frame, app: &mut App, area: Rect ) {
    let view = app.player.view();
    let items: Vec<ListItem> = view.items
        .iter()
        .enumerate()
        .map( |( i, item )| {
            if view.active == Some( i ) {
                ListItem::new( item.as_str() ).style( Style::default().fg( Color::Yellow ).bold() )
            } else {
                ListItem::new( item.as_str() )
            }
        })
        .collect();

    let list = List::new( items )
        .block( Block::default().title( " Playlist " ).borders( Borders::ALL ) )
        .highlight_style( Style::default().reversed() );

    frame.render_stateful_widget( list, area, &mut app.playlist_state );
}


fn draw_status_bar( frame: &mut Frame, app: &App, area: Rect ) {
    let ( text, style ) = match app.input_mode {
        InputMode::Command => {
            ( format!( "/{}", app.input_buffer.content() ), Style::default().fg( Color::Yellow ) )
        }
        InputMode::Normal => match app.status_message {
            Some( ref msg ) => ( msg.clone(), Style::default().fg( Color::Green ) ),
            None => (
                " [Space]Play [n/p]Next/Prev [l]Loop [←/→]Seek [+/-]Vol [/]Cmd [?]Help [q]Quit ".to_string(),
                Style::default().fg( Color::DarkGray ),
            ),
        },
    };

    frame.render_widget( Paragraph::new( text ).style( style ), area );

    if app.input_mode == InputMode::Command {
        let cursor_x = area.x + 1 + app.input_buffer.cursor() as u16;
        frame.set_cursor_position(( cursor_x, area.y ));
    }
}


fn draw_popup( frame: &mut Frame, title: &str, text: &str, color: Color ) {
    let area = frame.area();
    let width = area.width.saturating_sub( 8 ).min( 72 );
    let height = ( text.lines().count() as u16 + 4 ).min( area.height );
    let popup = Rect {
        x: area.x + ( area.width - width ) / 2,
        y: area.y + ( area.height - height ) / 2,
        width,
        height,
    };

    frame.render_widget( Clear, popup );
    frame.render_widget(
        Paragraph::new( text )
            .wrap( Wrap { trim: false } )
            .block( Block::default().title( title ).borders( Borders::ALL ).border_style( Style::default().fg( color ) ) ),
        popup,
    );
}
