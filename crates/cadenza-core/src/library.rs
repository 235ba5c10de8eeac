//! Source discovery
//!
//! Turns directories of audio files into source declarations for a
//! playlist.

use std::path::{ Path, PathBuf };

use thiserror::Error;

use crate::decoder::Decoder;
use crate::playlist::SourceDecl;


/// Supported audio file extensions.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "oga", "wav", "m4a", "aac", "aiff", "aif", "alac", "caf", "mka", "webm",
];


/// Errors that can occur during library operations.
#[derive( Debug, Error )]
pub enum LibraryError {
    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "Path not found: {0}" )]
    NotFound( PathBuf ),
}


/// Recursively collects audio files under a set of roots.
#[derive( Debug, Default )]
pub struct LibraryScanner {
    roots: Vec<PathBuf>,
    read_tags: bool,
}


impl LibraryScanner {
    pub fn new() -> Self {
        Self::default()
    }


    /// Titles sources from their embedded title tag when present.
    pub fn with_tags( mut self, read_tags: bool ) -> Self {
        self.read_tags = read_tags;
        self
    }


    pub fn add_root( &mut self, path: PathBuf ) {
        if !self.roots.contains( &path ) {
            self.roots.push( path );
        }
    }


    /// Scans all roots. Files within a directory are returned in name order.
    pub fn scan( &self ) -> Result<Vec<SourceDecl>, LibraryError> {
        let mut files = Vec::new();
        for root in &self.roots {
            tracing::info!( "Scanning: {:?}", root );
            scan_recursive( root, &mut files )?;
        }

        tracing::info!( "Found {} tracks", files.len() );

        Ok( files.iter().map( |path| self.source_for( path ) ).collect() )
    }


    fn source_for( &self, path: &Path ) -> SourceDecl {
        let mut source = SourceDecl::from_path( path );
        if self.read_tags {
            if let Some( title ) = Decoder::open( path ).ok().and_then( |mut decoder| decoder.title() ) {
                source.title = title;
            }
        }
        source
    }
}


fn scan_recursive( dir: &Path, files: &mut Vec<PathBuf> ) -> Result<(), LibraryError> {
    let entries = match std::fs::read_dir( dir ) {
        Ok( e ) => e,
        Err( e ) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            tracing::warn!( "Access denied: {:?}", dir );
            return Ok(());
        }
        Err( e ) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err( LibraryError::NotFound( dir.to_path_buf() ) );
        }
        Err( e ) => return Err( LibraryError::Io( e ) ),
    };

    let mut paths: Vec<PathBuf> = entries.flatten().map( |entry| entry.path() ).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            scan_recursive( &path, files )?;
        } else if is_audio_file( &path ) {
            files.push( path );
        }
    }

    Ok(())
}


/// Checks if a file has a supported audio extension.
pub fn is_audio_file( path: &Path ) -> bool {
    path.extension()
        .and_then( |e| e.to_str() )
        .map( |e| SUPPORTED_EXTENSIONS.contains( &e.to_lowercase().as_str() ) )
        .unwrap_or( false )
}


#[cfg( test )]
mod tests {
    use super::*;
    use std::fs;


    #[test]
    fn test_is_audio_file() {
        assert!( is_audio_file( Path::new( "a/b/song.FLAC" ) ) );
        assert!( !is_audio_file( Path::new( "cover.jpg" ) ) );
        assert!( !is_audio_file( Path::new( "README" ) ) );
    }


    #[test]
    fn test_scan_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir( dir.path().join( "disc2" ) ).unwrap();
        fs::write( dir.path().join( "b.mp3" ), b"" ).unwrap();
        fs::write( dir.path().join( "a.ogg" ), b"" ).unwrap();
        fs::write( dir.path().join( "notes.txt" ), b"" ).unwrap();
        fs::write( dir.path().join( "disc2" ).join( "c.flac" ), b"" ).unwrap();

        let mut scanner = LibraryScanner::new();
        scanner.add_root( dir.path().to_path_buf() );
        let titles: Vec<String> = scanner.scan().unwrap().into_iter().map( |s| s.title ).collect();

        assert_eq!( titles, vec![ "a", "b", "c" ] );
    }


    #[test]
    fn test_scan_missing_root() {
        let mut scanner = LibraryScanner::new();
        scanner.add_root( PathBuf::from( "/no/such/music/dir" ) );
        assert!( matches!( scanner.scan(), Err( LibraryError::NotFound( _ ) ) ) );
    }
}
