//! Tracks and the read-only playlist built from the host's source list.

use std::fs::File;
use std::io::{ BufRead, BufReader };
use std::path::Path;

use thiserror::Error;


/// Errors that can occur while reading a playlist file.
#[derive( Debug, Error )]
pub enum PlaylistError {
    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "Playlist has no entries" )]
    Empty,
}


/// A media source declared by the host: a title and a URL.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct SourceDecl {
    pub title: String,
    pub src: String,
}


impl SourceDecl {
    pub fn new( title: impl Into<String>, src: impl Into<String> ) -> Self {
        Self { title: title.into(), src: src.into() }
    }


    /// Declares a local file, titled after its file stem.
    pub fn from_path( path: &Path ) -> Self {
        Self::new( title_from_path( path ), path.to_string_lossy() )
    }
}


/// One playable track.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct Track {
    index: usize,
    title: String,
    source_url: String,
}


impl Track {
    pub fn index( &self ) -> usize {
        self.index
    }


    pub fn title( &self ) -> &str {
        &self.title
    }


    pub fn source_url( &self ) -> &str {
        &self.source_url
    }
}


/// Ordered, read-only sequence of tracks.
#[derive( Debug, Clone, Default )]
pub struct Playlist {
    tracks: Vec<Track>,
}


impl Playlist {
    /// Builds the playlist from source declarations, in order.
    pub fn from_sources( sources: impl IntoIterator<Item = SourceDecl> ) -> Self {
        let tracks = sources
            .into_iter()
            .enumerate()
            .map( |( index, source )| Track {
                index,
                title: source.title,
                source_url: source.src,
            })
            .collect();

        Self { tracks }
    }


    /// Reads source declarations from an M3U file.
    ///
    /// `#EXTINF:<secs>,<title>` lines name the entry that follows; entries
    /// without one are titled after their file stem. Relative entries are
    /// resolved against the playlist's directory.
    pub fn read_m3u( path: &Path ) -> Result<Vec<SourceDecl>, PlaylistError> {
        let reader = BufReader::new( File::open( path )? );
        let base = path.parent().unwrap_or( Path::new( "" ) );

        let mut sources = Vec::new();
        let mut pending_title: Option<String> = None;

        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                continue;
            }

            if let Some( info ) = trimmed.strip_prefix( "#EXTINF:" ) {
                pending_title = info
                    .split_once( ',' )
                    .map( |( _, title )| title.trim().to_string() )
                    .filter( |title| !title.is_empty() );
                continue;
            }

            if trimmed.starts_with( '#' ) {
                continue;
            }

            let src = if trimmed.contains( "://" ) || Path::new( trimmed ).is_absolute() {
                trimmed.to_string()
            } else {
                base.join( trimmed ).to_string_lossy().into_owned()
            };

            let title = pending_title
                .take()
                .unwrap_or_else( || title_from_path( Path::new( trimmed ) ) );

            sources.push( SourceDecl { title, src } );
        }

        if sources.is_empty() {
            return Err( PlaylistError::Empty );
        }

        Ok( sources )
    }


    pub fn tracks( &self ) -> &[Track] {
        &self.tracks
    }


    pub fn get( &self, index: usize ) -> Option<&Track> {
        self.tracks.get( index )
    }


    pub fn len( &self ) -> usize {
        self.tracks.len()
    }


    pub fn is_empty( &self ) -> bool {
        self.tracks.is_empty()
    }


    /// Index of the last track, if any.
    pub fn last_index( &self ) -> Option<usize> {
        self.tracks.len().checked_sub( 1 )
    }


    /// Constrains an index into `[0, len - 1]`. `None` when empty.
    pub fn clamp_index( &self, index: i64 ) -> Option<usize> {
        let last = self.last_index()?;
        Some( index.clamp( 0, last as i64 ) as usize )
    }
}


fn title_from_path( path: &Path ) -> String {
    path.file_stem()
        .map( |stem| stem.to_string_lossy().into_owned() )
        .unwrap_or_else( || path.to_string_lossy().into_owned() )
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::io::Write;


    fn three_tracks() -> Playlist {
        Playlist::from_sources( vec![
            SourceDecl::new( "Intro", "media/intro.mp3" ),
            SourceDecl::new( "Verse", "media/verse.ogg" ),
            SourceDecl::new( "Outro", "media/outro.flac" ),
        ])
    }


    #[test]
    fn test_from_sources_assigns_indices() {
        let playlist = three_tracks();
        assert_eq!( playlist.len(), 3 );
        let verse = playlist.get( 1 ).unwrap();
        assert_eq!( verse.index(), 1 );
        assert_eq!( verse.title(), "Verse" );
        assert_eq!( verse.source_url(), "media/verse.ogg" );
    }


    #[test]
    fn test_clamp_index() {
        let playlist = three_tracks();
        assert_eq!( playlist.clamp_index( -4 ), Some( 0 ) );
        assert_eq!( playlist.clamp_index( 1 ), Some( 1 ) );
        assert_eq!( playlist.clamp_index( 17 ), Some( 2 ) );
        assert_eq!( Playlist::default().clamp_index( 0 ), None );
    }


    #[test]
    fn test_source_from_path_uses_stem() {
        let source = SourceDecl::from_path( Path::new( "/music/Blue in Green.flac" ) );
        assert_eq!( source.title, "Blue in Green" );
        assert_eq!( source.src, "/music/Blue in Green.flac" );
    }


    #[test]
    fn test_read_m3u_titles_and_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "mix.m3u" );
        let mut file = File::create( &path ).unwrap();
        writeln!( file, "#EXTM3U" ).unwrap();
        writeln!( file, "#EXTINF:215,So What" ).unwrap();
        writeln!( file, "so_what.mp3" ).unwrap();
        writeln!( file ).unwrap();
        writeln!( file, "/abs/freddie.ogg" ).unwrap();
        writeln!( file, "#EXTINF:-1," ).unwrap();
        writeln!( file, "http://radio.example/stream" ).unwrap();
        drop( file );

        let sources = Playlist::read_m3u( &path ).unwrap();
        assert_eq!( sources.len(), 3 );
        assert_eq!( sources[ 0 ].title, "So What" );
        assert_eq!( sources[ 0 ].src, dir.path().join( "so_what.mp3" ).to_string_lossy() );
        assert_eq!( sources[ 1 ].title, "freddie" );
        assert_eq!( sources[ 1 ].src, "/abs/freddie.ogg" );
        assert_eq!( sources[ 2 ].title, "stream" );
        assert_eq!( sources[ 2 ].src, "http://radio.example/stream" );
    }


    #[test]
    fn test_read_m3u_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "empty.m3u" );
        std::fs::write( &path, "#EXTM3U\n" ).unwrap();
        assert!( matches!( Playlist::read_m3u( &path ), Err( PlaylistError::Empty ) ) );
    }
}
