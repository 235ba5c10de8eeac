//! Slash command parsing.
//!
//! Commands typed after a leading `/` in a host's command line map onto
//! controller operations.

use std::time::Duration;

use thiserror::Error;


/// Errors that can occur during command parsing.
#[derive( Debug, Clone, PartialEq, Eq, Error )]
pub enum CommandError {
    #[error( "Unknown command: {0}" )]
    Unknown( String ),

    #[error( "Invalid argument: {0}" )]
    InvalidArgument( String ),

    #[error( "Missing argument: {0}" )]
    MissingArgument( String ),
}


/// Where a `/seek` should land.
#[derive( Debug, Clone, Copy, PartialEq )]
pub enum SeekTarget {
    /// Absolute position from the start of the track.
    Time( Duration ),

    /// Fraction of the track's duration, in `[0, 1]`.
    Fraction( f64 ),
}


/// Parsed slash command.
#[derive( Debug, Clone, PartialEq )]
pub enum Command {
    Toggle,
    Next,
    Prev,
    Loop,
    Seek { target: SeekTarget },
    /// Volume in percent; `None` reports the current level.
    Volume { level: Option<u32> },
    /// Zero-based track index (typed one-based).
    Track { index: usize },
    Title { enabled: bool },
    Help,
    Quit,
}


impl Command {
    /// Parses a command string (without the leading `/`).
    pub fn parse( input: &str ) -> Result<Self, CommandError> {
        let input = input.trim();
        let mut parts = input.splitn( 2, ' ' );
        let cmd = parts.next().unwrap_or( "" ).to_lowercase();
        let args = parts.next().map( |s| s.trim() ).filter( |s| !s.is_empty() );

        match cmd.as_str() {
            "play" | "pause" | "p" | "toggle" => Ok( Command::Toggle ),
            "next" | "n" => Ok( Command::Next ),
            "prev" | "previous" | "pr" => Ok( Command::Prev ),
            "loop" | "repeat" | "l" => Ok( Command::Loop ),
            "seek" | "sk" => {
                let arg = args
                    .ok_or_else( || CommandError::MissingArgument( "position".into() ) )?;
                Ok( Command::Seek { target: parse_seek_target( arg )? } )
            }
            "vol" | "volume" => {
                let level = args
                    .map( |s| s.trim_end_matches( '%' ).parse::<u32>()
                        .map_err( |_| CommandError::InvalidArgument( format!( "Invalid volume: {}", s ) ) ) )
                    .transpose()?
                    .map( |level| level.min( 100 ) );
                Ok( Command::Volume { level } )
            }
            "track" | "t" => {
                let arg = args
                    .ok_or_else( || CommandError::MissingArgument( "track number".into() ) )?;
                let number: usize = arg.parse()
                    .map_err( |_| CommandError::InvalidArgument( format!( "Invalid track number: {}", arg ) ) )?;
                if number == 0 {
                    return Err( CommandError::InvalidArgument( "Track numbers start at 1".into() ) );
                }
                Ok( Command::Track { index: number - 1 } )
            }
            "title" => {
                let arg = args
                    .ok_or_else( || CommandError::MissingArgument( "true or false".into() ) )?;
                Ok( Command::Title { enabled: parse_flag( arg )? } )
            }
            "help" | "h" | "?" => Ok( Command::Help ),
            "quit" | "q" | "exit" => Ok( Command::Quit ),

            "" => Err( CommandError::Unknown( "empty command".into() ) ),
            other => Err( CommandError::Unknown( other.to_string() ) ),
        }
    }
}


/// Parses a boolean attribute value: `"true"` or `"false"`.
pub fn parse_flag( value: &str ) -> Result<bool, CommandError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok( true ),
        "false" => Ok( false ),
        other => Err( CommandError::InvalidArgument(
            format!( "Expected 'true' or 'false', got '{}'", other )
        )),
    }
}


/// Parses `"42%"` as a fraction, otherwise a time (see [`parse_time`]).
fn parse_seek_target( s: &str ) -> Result<SeekTarget, CommandError> {
    if let Some( percent ) = s.strip_suffix( '%' ) {
        let percent: f64 = percent.trim().parse()
            .map_err( |_| CommandError::InvalidArgument( format!( "Invalid percentage: {}", s ) ) )?;
        if !( 0.0..=100.0 ).contains( &percent ) {
            return Err( CommandError::InvalidArgument( format!( "Percentage out of range: {}", s ) ) );
        }
        return Ok( SeekTarget::Fraction( percent / 100.0 ) );
    }

    parse_time( s ).map( SeekTarget::Time )
}


/// Parses a time string like "1:30" or "90" into a Duration.
fn parse_time( s: &str ) -> Result<Duration, CommandError> {
    let s = s.trim();

    if let Some(( min, sec )) = s.split_once( ':' ) {
        let minutes: u64 = min.parse()
            .map_err( |_| CommandError::InvalidArgument( format!( "Invalid minutes: {}", min ) ) )?;
        let seconds: u64 = sec.parse()
            .map_err( |_| CommandError::InvalidArgument( format!( "Invalid seconds: {}", sec ) ) )?;
        Ok( Duration::from_secs( minutes * 60 + seconds ) )
    } else {
        let seconds: u64 = s.parse()
            .map_err( |_| CommandError::InvalidArgument( format!( "Invalid time: {}", s ) ) )?;
        Ok( Duration::from_secs( seconds ) )
    }
}


/// Returns help text listing all available commands.
pub fn help_text() -> &'static str {
    r#"Playback:
  /play             Play or pause                [Space]
  /next             Next track                   [n]
  /prev             Previous track / restart     [p]
  /loop             Toggle track loop            [l]
  /seek <pos>       Seek to 1:30, 90 or 50%      [Left/Right]
  /track <n>        Play track number n          [Enter]

Other:
  /vol [0-100]      Set volume                   [+/-]
  /title <bool>     Mirror the track into the title (true/false)
  /help             Show this help               [?]
  /quit             Exit cadenza                 [q]"#
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_transport() {
        assert_eq!( Command::parse( "play" ).unwrap(), Command::Toggle );
        assert_eq!( Command::parse( "n" ).unwrap(), Command::Next );
        assert_eq!( Command::parse( "previous" ).unwrap(), Command::Prev );
        assert_eq!( Command::parse( "LOOP" ).unwrap(), Command::Loop );
    }


    #[test]
    fn test_parse_seek_time() {
        let cmd = Command::parse( "seek 1:30" ).unwrap();
        assert_eq!( cmd, Command::Seek { target: SeekTarget::Time( Duration::from_secs( 90 ) ) } );
    }


    #[test]
    fn test_parse_seek_seconds() {
        let cmd = Command::parse( "seek 45" ).unwrap();
        assert_eq!( cmd, Command::Seek { target: SeekTarget::Time( Duration::from_secs( 45 ) ) } );
    }


    #[test]
    fn test_parse_seek_percent() {
        let cmd = Command::parse( "seek 25%" ).unwrap();
        assert_eq!( cmd, Command::Seek { target: SeekTarget::Fraction( 0.25 ) } );
        assert!( Command::parse( "seek 140%" ).is_err() );
    }


    #[test]
    fn test_parse_volume() {
        assert_eq!( Command::parse( "vol 40" ).unwrap(), Command::Volume { level: Some( 40 ) } );
        assert_eq!( Command::parse( "volume 250%" ).unwrap(), Command::Volume { level: Some( 100 ) } );
        assert_eq!( Command::parse( "vol" ).unwrap(), Command::Volume { level: None } );
        assert!( matches!( Command::parse( "vol loud" ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_track_is_one_based() {
        assert_eq!( Command::parse( "track 3" ).unwrap(), Command::Track { index: 2 } );
        assert!( Command::parse( "track 0" ).is_err() );
    }


    #[test]
    fn test_parse_title_flag() {
        assert_eq!( Command::parse( "title false" ).unwrap(), Command::Title { enabled: false } );
        assert_eq!( Command::parse( "title TRUE" ).unwrap(), Command::Title { enabled: true } );
        assert!( matches!( Command::parse( "title" ), Err( CommandError::MissingArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_flag_rejects_other_values() {
        assert!( parse_flag( "yes" ).is_err() );
        assert_eq!( parse_flag( " false " ), Ok( false ) );
    }


    #[test]
    fn test_parse_unknown() {
        let result = Command::parse( "shuffle" );
        assert!( matches!( result, Err( CommandError::Unknown( _ ) ) ) );
    }


    #[test]
    fn test_parse_missing_arg() {
        let result = Command::parse( "seek" );
        assert!( matches!( result, Err( CommandError::MissingArgument( _ ) ) ) );
    }
}
