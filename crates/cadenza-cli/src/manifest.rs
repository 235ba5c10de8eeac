//! Player manifest and startup configuration
//!
//! A manifest is the JSON equivalent of the host page's media element: the
//! source list plus the loop, page-title and volume attributes. Command-line
//! flags and file arguments are merged on top of it.

use std::fs;
use std::path::{ Path, PathBuf };

use anyhow::{ bail, Context, Result };
use serde::Deserialize;

use cadenza_core::library::LibraryScanner;
use cadenza_core::{ PlayerConfig, Playlist, SourceDecl };

use crate::cli::Args;


/// One declared source.
#[derive( Debug, Clone, Deserialize )]
pub struct ManifestSource {
    /// Display title, the file stem when absent.
    pub title: Option<String>,
    pub src: String,
}


/// Player manifest file.
#[derive( Debug, Clone, Default, Deserialize )]
#[serde( default )]
pub struct Manifest {
    pub sources: Vec<ManifestSource>,
    pub loop_track: bool,
    pub change_page_title: Option<bool>,
    pub volume: Option<f64>,
}


impl Manifest {
    /// Reads a manifest. Relative sources resolve against its directory.
    pub fn load( path: &Path ) -> Result<Self> {
        let contents = fs::read_to_string( path )
            .with_context( || format!( "Failed to read manifest {:?}", path ) )?;
        let mut manifest: Manifest = serde_json::from_str( &contents )
            .with_context( || format!( "Invalid manifest {:?}", path ) )?;

        let base = path.parent().unwrap_or( Path::new( "" ) );
        for source in &mut manifest.sources {
            if !source.src.contains( "://" ) && Path::new( &source.src ).is_relative() {
                source.src = base.join( &source.src ).to_string_lossy().into_owned();
            }
        }

        Ok( manifest )
    }


    fn source_decls( &self ) -> Vec<SourceDecl> {
        self.sources
            .iter()
            .map( |source| match source.title {
                Some( ref title ) => SourceDecl::new( title.clone(), source.src.clone() ),
                None => SourceDecl::from_path( Path::new( &source.src ) ),
            })
            .collect()
    }
}


/// Everything needed to construct the controller.
#[derive( Debug )]
pub struct Setup {
    pub sources: Vec<SourceDecl>,
    pub config: PlayerConfig,
}


impl Setup {
    /// Merges the manifest (if any) with command-line flags and files.
    pub fn from_args( args: &Args ) -> Result<Self> {
        let manifest = match args.manifest {
            Some( ref path ) => Manifest::load( path )?,
            None => Manifest::default(),
        };

        let mut sources = manifest.source_decls();
        for file in &args.files {
            sources.extend( sources_for_path( file )? );
        }

        if sources.is_empty() {
            bail!( "Nothing to play: pass audio files, a directory, an M3U playlist or --manifest" );
        }

        let config = PlayerConfig {
            loop_track: args.loop_track || manifest.loop_track,
            change_page_title: !args.no_title && manifest.change_page_title.unwrap_or( true ),
            volume: args.volume.or( manifest.volume ),
        };

        tracing::info!( "Configured {} sources: {:?}", sources.len(), config );

        Ok( Self { sources, config } )
    }
}


fn sources_for_path( path: &PathBuf ) -> Result<Vec<SourceDecl>> {
    if path.is_dir() {
        let mut scanner = LibraryScanner::new().with_tags( true );
        scanner.add_root( path.clone() );
        return scanner.scan().with_context( || format!( "Failed to scan {:?}", path ) );
    }

    let is_m3u = path
        .extension()
        .and_then( |e| e.to_str() )
        .is_some_and( |e| e.eq_ignore_ascii_case( "m3u" ) || e.eq_ignore_ascii_case( "m3u8" ) );

    if is_m3u {
        return Playlist::read_m3u( path ).with_context( || format!( "Failed to read playlist {:?}", path ) );
    }

    Ok( vec![ SourceDecl::from_path( path ) ] )
}


#[cfg( test )]
mod tests {
    use super::*;
    use clap::Parser;


    fn write( dir: &Path, name: &str, contents: &str ) -> PathBuf {
        let path = dir.join( name );
        fs::write( &path, contents ).unwrap();
        path
    }


    #[test]
    fn test_manifest_defaults_and_relative_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = write( dir.path(), "player.json", r#"{
            "sources": [
                { "title": "Opening", "src": "audio/one.mp3" },
                { "src": "https://cdn.example/two.ogg" }
            ]
        }"# );

        let manifest = Manifest::load( &path ).unwrap();
        assert!( !manifest.loop_track );
        assert_eq!( manifest.change_page_title, None );

        let decls = manifest.source_decls();
        assert_eq!( decls[ 0 ].title, "Opening" );
        assert_eq!( decls[ 0 ].src, dir.path().join( "audio/one.mp3" ).to_string_lossy() );
        assert_eq!( decls[ 1 ].title, "two" );
        assert_eq!( decls[ 1 ].src, "https://cdn.example/two.ogg" );
    }


    #[test]
    fn test_flags_override_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write( dir.path(), "player.json", r#"{
            "sources": [ { "title": "A", "src": "a.mp3" } ],
            "loop_track": false,
            "change_page_title": true,
            "volume": 0.8
        }"# );
        let manifest = path.to_string_lossy().into_owned();

        let args = Args::parse_from( [ "cadenza", "--manifest", &manifest, "--loop", "--no-title", "--volume", "0.3" ] );
        let setup = Setup::from_args( &args ).unwrap();

        assert_eq!( setup.sources.len(), 1 );
        assert!( setup.config.loop_track );
        assert!( !setup.config.change_page_title );
        assert_eq!( setup.config.volume, Some( 0.3 ) );
    }


    #[test]
    fn test_file_arguments_append_sources() {
        let dir = tempfile::tempdir().unwrap();
        let list = write( dir.path(), "mix.m3u", "#EXTINF:10,First\none.mp3\n" );
        let single = dir.path().join( "Second Song.flac" );

        let args = Args::parse_from( [
            "cadenza".to_string(),
            list.to_string_lossy().into_owned(),
            single.to_string_lossy().into_owned(),
        ]);
        let setup = Setup::from_args( &args ).unwrap();

        let titles: Vec<&str> = setup.sources.iter().map( |s| s.title.as_str() ).collect();
        assert_eq!( titles, vec![ "First", "Second Song" ] );
        assert!( setup.config.change_page_title );
        assert_eq!( setup.config.volume, None );
    }


    #[test]
    fn test_no_sources_is_an_error() {
        let args = Args::parse_from( [ "cadenza" ] );
        assert!( Setup::from_args( &args ).is_err() );
    }


    #[test]
    fn test_invalid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write( dir.path(), "broken.json", "{ sources: nope" );
        assert!( Manifest::load( &path ).is_err() );
    }
}
