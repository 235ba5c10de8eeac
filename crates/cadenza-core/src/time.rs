//! Playback time formatting.


/// Formats a time in seconds as `MM:SS`.
///
/// Minutes and seconds below 10 are zero padded. Unknown times (NaN, which
/// is what a media resource reports before its duration is known) and
/// negative values render as `00:00`.
pub fn format_time( seconds: f64 ) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };

    format!( "{:02}:{:02}", total / 60, total % 60 )
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_format_minutes_and_seconds() {
        assert_eq!( format_time( 65.0 ), "01:05" );
    }


    #[test]
    fn test_format_pads_seconds() {
        assert_eq!( format_time( 5.0 ), "00:05" );
    }


    #[test]
    fn test_format_nan_is_zero() {
        assert_eq!( format_time( f64::NAN ), "00:00" );
    }


    #[test]
    fn test_format_truncates_fraction() {
        assert_eq!( format_time( 59.99 ), "00:59" );
    }


    #[test]
    fn test_format_long_track() {
        assert_eq!( format_time( 754.0 ), "12:34" );
        assert_eq!( format_time( 6000.0 ), "100:00" );
    }


    #[test]
    fn test_format_infinite_is_zero() {
        assert_eq!( format_time( f64::INFINITY ), "00:00" );
        assert_eq!( format_time( -3.0 ), "00:00" );
    }
}
