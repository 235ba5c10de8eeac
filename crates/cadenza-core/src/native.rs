//! Native media engine
//!
//! [`NativeMedia`] is a [`MediaElement`] for local audio files. Each loaded
//! source gets a decode thread that feeds a cpal output stream through a
//! shared sample buffer; the thread reports back only through atomics,
//! which `poll_events` turns into media signals.

use std::path::{ Path, PathBuf };
use std::sync::{ Arc, Mutex };
use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering };
use std::thread;
use std::time::Duration;

use rubato::{ FastFixedOut, PolynomialDegree, Resampler };

use crate::decoder::Decoder;
use crate::media::{ MediaElement, MediaError, MediaEvent, ReadyState };
use crate::output::{ AudioOutput, SampleBuffer };


/// Minimum playback progress between two time updates, in seconds.
const TIME_UPDATE_INTERVAL: f64 = 0.25;


/// Resolves a source URL to a local path. `None` for non-file schemes.
pub fn source_path( url: &str ) -> Option<PathBuf> {
    if let Some( path ) = url.strip_prefix( "file://" ) {
        return Some( PathBuf::from( path ) );
    }
    if url.contains( "://" ) {
        return None;
    }
    Some( PathBuf::from( url ) )
}


/// Converts planar samples back to interleaved format.
/// [[L0, L1, ...], [R0, R1, ...]] → [L0, R0, L1, R1, ...]
fn interleave( channels: &[Vec<f32>] ) -> Vec<f32> {
    let frames = channels.first().map_or( 0, |ch| ch.len() );
    let mut out = Vec::with_capacity( frames * channels.len() );
    for f in 0..frames {
        out.extend( channels.iter().map( |ch| ch[ f ] ) );
    }
    out
}


/// Sample rate conversion for sources the device can't play natively.
struct Resampling {
    resampler: FastFixedOut<f32>,
    /// Planar input waiting for a full chunk
    pending: Vec<Vec<f32>>,
}


impl Resampling {
    fn new( from: u32, to: u32, channels: usize ) -> Result<Self, MediaError> {
        tracing::info!( "Resampling: {} Hz → {} Hz", from, to );

        let resampler = FastFixedOut::<f32>::new(
            to as f64 / from as f64,
            2.0,
            PolynomialDegree::Cubic,
            1024,
            channels,
        ).map_err( |e| {
            tracing::error!( "Failed to create resampler: {}", e );
            MediaError::Decode
        })?;

        Ok( Self {
            resampler,
            pending: vec![ Vec::new(); channels ],
        })
    }


    fn process( &mut self, interleaved: &[f32] ) -> Vec<f32> {
        let channels = self.pending.len();
        for frame in interleaved.chunks_exact( channels ) {
            for ( ch, sample ) in frame.iter().enumerate() {
                self.pending[ ch ].push( *sample );
            }
        }

        let mut out = Vec::new();
        while self.pending[ 0 ].len() >= self.resampler.input_frames_next() {
            let needed = self.resampler.input_frames_next();
            let chunk: Vec<Vec<f32>> = self.pending
                .iter_mut()
                .map( |ch| ch.drain( ..needed ).collect() )
                .collect();

            match self.resampler.process( &chunk, None ) {
                Ok( resampled ) => out.extend( interleave( &resampled ) ),
                Err( e ) => {
                    tracing::error!( "Resample error: {}", e );
                    break;
                }
            }
        }
        out
    }


    fn flush( &mut self ) -> Vec<f32> {
        if self.pending[ 0 ].is_empty() {
            return Vec::new();
        }

        let out = match self.resampler.process_partial( Some( self.pending.as_slice() ), None ) {
            Ok( resampled ) => interleave( &resampled ),
            Err( e ) => {
                tracing::error!( "Final resample error: {}", e );
                Vec::new()
            }
        };
        self.pending.iter_mut().for_each( Vec::clear );
        out
    }
}


/// State shared with a decode thread.
#[derive( Clone )]
struct Shared {
    stop: Arc<AtomicBool>,
    buffer: Arc<SampleBuffer>,
    /// Source frames decoded so far, including the start offset
    frames: Arc<AtomicU64>,
    ended: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<MediaError>>>,
}


impl Shared {
    fn new( buffer: Arc<SampleBuffer>, start_frames: u64 ) -> Self {
        Self {
            stop: Arc::new( AtomicBool::new( false ) ),
            buffer,
            frames: Arc::new( AtomicU64::new( start_frames ) ),
            ended: Arc::new( AtomicBool::new( false ) ),
            failure: Arc::new( Mutex::new( None ) ),
        }
    }


    fn stopped( &self ) -> bool {
        self.stop.load( Ordering::Relaxed )
    }


    /// Pushes everything, waiting for the consumer when the buffer is full.
    fn push_all( &self, samples: &[f32] ) {
        let mut offset = 0;
        while offset < samples.len() && !self.stopped() {
            let pushed = self.buffer.push( &samples[ offset.. ] );
            offset += pushed;
            if pushed == 0 {
                thread::sleep( Duration::from_millis( 5 ) );
            }
        }
    }


    fn fail( &self, error: MediaError ) {
        if let Ok( mut failure ) = self.failure.lock() {
            *failure = Some( error );
        }
    }


    fn take_failure( &self ) -> Option<MediaError> {
        self.failure.lock().ok().and_then( |mut failure| failure.take() )
    }
}


fn decode_loop( mut decoder: Decoder, mut resampling: Option<Resampling>, shared: Shared ) {
    let channels = decoder.channels();
    // Keep about 50ms decoded ahead of the device
    let target_buffer = ( decoder.sample_rate() as usize * channels ) / 20;

    while !shared.stopped() {
        if shared.buffer.is_paused() {
            thread::sleep( Duration::from_millis( 10 ) );
            continue;
        }

        if shared.buffer.len() > target_buffer {
            thread::sleep( Duration::from_millis( 5 ) );
            continue;
        }

        match decoder.decode_next() {
            Ok( Some( samples ) ) => {
                shared.frames.fetch_add( ( samples.len() / channels ) as u64, Ordering::Relaxed );
                match resampling.as_mut() {
                    Some( resampling ) => shared.push_all( &resampling.process( &samples ) ),
                    None => shared.push_all( &samples ),
                }
            }
            Ok( None ) => {
                if let Some( resampling ) = resampling.as_mut() {
                    shared.push_all( &resampling.flush() );
                }

                tracing::info!( "Decode loop: reached end of file" );
                while !shared.buffer.is_empty() && !shared.stopped() {
                    thread::sleep( Duration::from_millis( 10 ) );
                }
                shared.ended.store( true, Ordering::Relaxed );
                break;
            }
            Err( e ) => {
                tracing::error!( "Decode error: {}", e );
                shared.fail( e.media_error() );
                break;
            }
        }
    }

    tracing::debug!( "Decode loop: exiting" );
}


/// Decode progress as seen from the main thread.
struct Progress {
    shared: Shared,
    sample_rate: u32,
    duration: Option<f64>,
    last_reported: Option<f64>,
    ended_reported: bool,
}


impl Progress {
    fn new( shared: Shared, sample_rate: u32, duration: Option<f64> ) -> Self {
        Self {
            shared,
            sample_rate,
            duration,
            last_reported: None,
            ended_reported: false,
        }
    }


    fn position( &self ) -> f64 {
        let frames = self.shared.frames.load( Ordering::Relaxed );
        let seconds = frames as f64 / self.sample_rate as f64;
        match self.duration {
            Some( duration ) => seconds.min( duration ),
            None => seconds,
        }
    }


    /// Signals raised since the last poll, or the failure the decode
    /// thread stopped on.
    fn poll( &mut self ) -> Result<Vec<MediaEvent>, MediaError> {
        if let Some( error ) = self.shared.take_failure() {
            return Err( error );
        }

        if self.shared.ended.load( Ordering::Relaxed ) {
            if self.ended_reported {
                return Ok( Vec::new() );
            }
            self.ended_reported = true;
            return Ok( vec![ MediaEvent::TimeUpdate, MediaEvent::Ended ] );
        }

        let position = self.position();
        if self.last_reported.is_some_and( |last| ( position - last ).abs() < TIME_UPDATE_INTERVAL ) {
            return Ok( Vec::new() );
        }
        self.last_reported = Some( position );
        Ok( vec![ MediaEvent::TimeUpdate ] )
    }
}


/// One opened source with its output stream and decode thread.
struct Playback {
    path: PathBuf,
    progress: Progress,
    /// Held for the stream's lifetime
    output: Option<AudioOutput>,
    thread: Option<thread::JoinHandle<()>>,
}


impl Playback {
    /// Opens `path` at `position` seconds. Starts paused.
    fn start( path: &Path, position: f64, volume: f32 ) -> Result<Self, MediaError> {
        let mut decoder = Decoder::open( path ).map_err( |e| {
            tracing::warn!( "Failed to open {:?}: {}", path, e );
            e.media_error()
        })?;

        if position > 0.0 {
            decoder.seek( position ).map_err( |e| {
                tracing::warn!( "Failed to seek {:?}: {}", path, e );
                e.media_error()
            })?;
        }

        let sample_rate = decoder.sample_rate();
        let channels = decoder.channels();
        let duration = decoder.duration();

        let ( output, buffer ) = AudioOutput::new( sample_rate, channels as u16 ).map_err( |e| {
            tracing::error!( "Audio output unavailable: {}", e );
            MediaError::Unknown
        })?;
        buffer.set_volume( volume );
        buffer.set_paused( true );

        output.play().map_err( |e| {
            tracing::error!( "Audio output failed to start: {}", e );
            MediaError::Unknown
        })?;

        let resampling = if output.sample_rate() != sample_rate {
            Some( Resampling::new( sample_rate, output.sample_rate(), channels )? )
        } else {
            None
        };

        let shared = Shared::new( buffer, ( position * sample_rate as f64 ) as u64 );

        let thread_shared = shared.clone();
        let thread = thread::spawn( move || decode_loop( decoder, resampling, thread_shared ) );

        Ok( Self {
            path: path.to_path_buf(),
            progress: Progress::new( shared, sample_rate, duration ),
            output: Some( output ),
            thread: Some( thread ),
        })
    }


    fn shared( &self ) -> &Shared {
        &self.progress.shared
    }
}


impl Drop for Playback {
    fn drop( &mut self ) {
        self.shared().stop.store( true, Ordering::Relaxed );
        self.shared().buffer.clear();
        if let Some( thread ) = self.thread.take() {
            let _ = thread.join();
        }
        self.output = None;
    }
}


/// Local-file media resource backed by symphonia and cpal.
pub struct NativeMedia {
    source: Option<String>,
    playback: Option<Playback>,
    paused: bool,
    volume: f32,
    events: Vec<MediaEvent>,
}


impl NativeMedia {
    pub fn new() -> Self {
        Self {
            source: None,
            playback: None,
            paused: true,
            volume: 1.0,
            events: Vec::new(),
        }
    }


    fn open( &mut self, path: &Path, position: f64 ) {
        match Playback::start( path, position, self.volume ) {
            Ok( playback ) => {
                playback.shared().buffer.set_paused( self.paused );
                self.playback = Some( playback );
            }
            Err( error ) => {
                self.paused = true;
                self.events.push( MediaEvent::Error( error ) );
            }
        }
    }
}


impl Default for NativeMedia {
    fn default() -> Self {
        Self::new()
    }
}


impl MediaElement for NativeMedia {
    fn set_source( &mut self, url: &str ) {
        self.source = Some( url.to_string() );
    }


    fn load( &mut self ) {
        self.playback = None;
        self.paused = true;

        let Some( path ) = self.source.as_deref().and_then( source_path ) else {
            tracing::warn!( "Unsupported source: {:?}", self.source );
            self.events.push( MediaEvent::Error( MediaError::SourceNotSupported ) );
            return;
        };

        self.open( &path, 0.0 );
    }


    fn play( &mut self ) {
        if let Some( ref playback ) = self.playback {
            playback.shared().buffer.set_paused( false );
            self.paused = false;
        }
    }


    fn pause( &mut self ) {
        if let Some( ref playback ) = self.playback {
            playback.shared().buffer.set_paused( true );
        }
        self.paused = true;
    }


    fn paused( &self ) -> bool {
        self.paused
    }


    fn current_time( &self ) -> f64 {
        self.playback.as_ref().map_or( 0.0, |playback| playback.progress.position() )
    }


    /// Reopens the source and seeks, keeping the paused state.
    fn set_current_time( &mut self, seconds: f64 ) {
        let Some( playback ) = self.playback.take() else {
            return;
        };

        let mut position = seconds.max( 0.0 );
        if let Some( duration ) = playback.progress.duration {
            position = position.min( duration );
        }

        let path = playback.path.clone();
        drop( playback );

        tracing::info!( "Seeking to {:.1}s in {:?}", position, path );
        self.open( &path, position );
    }


    fn duration( &self ) -> f64 {
        self.playback
            .as_ref()
            .and_then( |playback| playback.progress.duration )
            .unwrap_or( f64::NAN )
    }


    fn set_volume( &mut self, volume: f64 ) {
        self.volume = volume as f32;
        if let Some( ref playback ) = self.playback {
            playback.shared().buffer.set_volume( self.volume );
        }
    }


    fn ready_state( &self ) -> ReadyState {
        if self.playback.is_some() {
            ReadyState::HaveEnoughData
        } else {
            ReadyState::HaveNothing
        }
    }


    /// Local sources are fully available once opened.
    fn buffered_end( &self ) -> Option<f64> {
        self.playback.as_ref().and_then( |playback| playback.progress.duration )
    }


    fn poll_events( &mut self ) -> Vec<MediaEvent> {
        match self.playback.as_mut().map( |playback| playback.progress.poll() ) {
            Some( Ok( events ) ) => {
                if events.contains( &MediaEvent::Ended ) {
                    self.paused = true;
                }
                self.events.extend( events );
            }
            Some( Err( error ) ) => {
                self.playback = None;
                self.paused = true;
                self.events.push( MediaEvent::Error( error ) );
            }
            None => {}
        }

        std::mem::take( &mut self.events )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    /// An opened source with no device or decode thread behind it, playing
    /// at 1000 frames per second from `position`.
    fn detached( position: f64 ) -> ( NativeMedia, Shared ) {
        let buffer = Arc::new( SampleBuffer::new( 1024, 2, 2 ) );
        let shared = Shared::new( buffer, ( position * 1000.0 ) as u64 );
        let playback = Playback {
            path: PathBuf::from( "detached.flac" ),
            progress: Progress::new( shared.clone(), 1000, Some( 10.0 ) ),
            output: None,
            thread: None,
        };
        let media = NativeMedia { playback: Some( playback ), paused: false, ..NativeMedia::new() };
        ( media, shared )
    }


    #[test]
    fn test_source_path() {
        assert_eq!( source_path( "file:///music/a.mp3" ), Some( PathBuf::from( "/music/a.mp3" ) ) );
        assert_eq!( source_path( "media/b.ogg" ), Some( PathBuf::from( "media/b.ogg" ) ) );
        assert_eq!( source_path( "https://example.com/c.mp3" ), None );
    }


    #[test]
    fn test_interleave() {
        let planar = vec![ vec![ 1.0, 2.0 ], vec![ 10.0, 20.0 ] ];
        assert_eq!( interleave( &planar ), vec![ 1.0, 10.0, 2.0, 20.0 ] );
        assert!( interleave( &[] ).is_empty() );
    }


    #[test]
    fn test_missing_file_raises_network_error() {
        let mut media = NativeMedia::new();
        media.set_source( "/definitely/not/here.flac" );
        media.load();

        assert_eq!( media.poll_events(), vec![ MediaEvent::Error( MediaError::Network ) ] );
        assert!( media.paused() );
        assert!( media.duration().is_nan() );
        assert_eq!( media.ready_state(), ReadyState::HaveNothing );
        assert!( media.poll_events().is_empty() );
    }


    #[test]
    fn test_remote_source_is_not_supported() {
        let mut media = NativeMedia::new();
        media.set_source( "http://radio.example/live" );
        media.load();
        media.play();

        assert_eq!( media.poll_events(), vec![ MediaEvent::Error( MediaError::SourceNotSupported ) ] );
        assert!( media.paused() );
    }


    #[test]
    fn test_unloaded_media_is_inert() {
        let mut media = NativeMedia::new();
        media.set_current_time( 12.0 );
        media.set_volume( 0.4 );
        assert_eq!( media.current_time(), 0.0 );
        assert_eq!( media.buffered_end(), None );
        assert!( media.poll_events().is_empty() );
    }


    #[test]
    fn test_natural_end_is_reported_once() {
        let ( mut media, shared ) = detached( 0.0 );
        assert_eq!( media.poll_events(), vec![ MediaEvent::TimeUpdate ] );

        shared.frames.store( 10_000, Ordering::Relaxed );
        shared.ended.store( true, Ordering::Relaxed );

        assert_eq!( media.poll_events(), vec![ MediaEvent::TimeUpdate, MediaEvent::Ended ] );
        assert!( media.paused() );
        assert_eq!( media.current_time(), 10.0 );
        assert!( media.poll_events().is_empty() );
    }


    #[test]
    fn test_time_updates_are_throttled() {
        let ( mut media, shared ) = detached( 1.0 );
        assert_eq!( media.poll_events(), vec![ MediaEvent::TimeUpdate ] );

        shared.frames.fetch_add( 200, Ordering::Relaxed );
        assert!( media.poll_events().is_empty() );

        shared.frames.fetch_add( 100, Ordering::Relaxed );
        assert_eq!( media.poll_events(), vec![ MediaEvent::TimeUpdate ] );
        assert!( media.poll_events().is_empty() );
    }


    #[test]
    fn test_decode_failure_drops_the_source() {
        let ( mut media, shared ) = detached( 2.0 );
        assert_eq!( media.ready_state(), ReadyState::HaveEnoughData );
        assert_eq!( media.buffered_end(), Some( 10.0 ) );

        shared.fail( MediaError::Decode );

        assert_eq!( media.poll_events(), vec![ MediaEvent::Error( MediaError::Decode ) ] );
        assert_eq!( media.ready_state(), ReadyState::HaveNothing );
        assert!( media.paused() );
        assert!( media.duration().is_nan() );
        assert!( media.poll_events().is_empty() );
        assert!( shared.stopped() );
    }
}
