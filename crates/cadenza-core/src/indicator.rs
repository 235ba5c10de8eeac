//! Indicator geometry for the progress and volume bars.
//!
//! An indicator is the draggable marker sitting on a bar. Its travel range
//! excludes its own width so it never overflows the bar.


/// Constrains a value to the given lower and upper bound.
///
/// NaN collapses to the lower bound.
pub fn constrain( value: f64, lower: f64, upper: f64 ) -> f64 {
    if value.is_nan() {
        return lower;
    }
    value.min( upper ).max( lower )
}


/// Clamps a raw pixel offset into `[0, bar_width - indicator_width]`.
pub fn clamp_indicator( offset: f64, bar_width: f64, indicator_width: f64 ) -> f64 {
    constrain( offset, 0.0, travel( bar_width, indicator_width ) )
}


fn travel( bar_width: f64, indicator_width: f64 ) -> f64 {
    ( bar_width - indicator_width ).max( 0.0 )
}


/// Layout of a bar with an indicator, as reported by the host view.
#[derive( Debug, Clone, Copy, PartialEq, Default )]
pub struct BarGeometry {
    /// Offset of the bar's left edge in pointer coordinates.
    pub offset_left: f64,

    /// Full width of the bar.
    pub width: f64,

    /// Width of the indicator.
    pub indicator_width: f64,
}


impl BarGeometry {
    pub fn new( offset_left: f64, width: f64, indicator_width: f64 ) -> Self {
        Self { offset_left, width, indicator_width }
    }


    /// Distance the indicator can move: bar width minus indicator width.
    pub fn travel( &self ) -> f64 {
        travel( self.width, self.indicator_width )
    }


    /// Clamps a raw offset (relative to the bar) into the travel range.
    pub fn clamp( &self, offset: f64 ) -> f64 {
        clamp_indicator( offset, self.width, self.indicator_width )
    }


    /// Indicator offset for a fraction of the bar, truncated to whole units.
    pub fn position_for_fraction( &self, fraction: f64 ) -> f64 {
        self.clamp( ( self.travel() * fraction ).trunc() )
    }


    /// Offset of a pointer relative to the bar's left edge.
    pub fn pointer_offset( &self, page_x: f64 ) -> f64 {
        page_x - self.offset_left
    }


    /// Fraction of the bar under the pointer, constrained to `[0, 1]`.
    pub fn pointer_fraction( &self, page_x: f64 ) -> f64 {
        if self.width <= 0.0 {
            return 0.0;
        }
        constrain( self.pointer_offset( page_x ) / self.width, 0.0, 1.0 )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_clamp_indicator_stays_in_travel_range() {
        let offsets = [ -1000.0, -1.0, 0.0, 0.5, 42.0, 90.0, 91.0, 100.0, 5000.0, f64::NAN ];
        for offset in offsets {
            let clamped = clamp_indicator( offset, 100.0, 10.0 );
            assert!( ( 0.0..=90.0 ).contains( &clamped ), "{} -> {}", offset, clamped );
        }
    }


    #[test]
    fn test_clamp_indicator_keeps_in_range_value() {
        assert_eq!( clamp_indicator( 42.0, 100.0, 10.0 ), 42.0 );
    }


    #[test]
    fn test_indicator_wider_than_bar() {
        assert_eq!( clamp_indicator( 30.0, 10.0, 20.0 ), 0.0 );
    }


    #[test]
    fn test_position_for_fraction_truncates() {
        let bar = BarGeometry::new( 0.0, 110.0, 10.0 );
        assert_eq!( bar.position_for_fraction( 0.5 ), 50.0 );
        assert_eq!( bar.position_for_fraction( 0.333 ), 33.0 );
        assert_eq!( bar.position_for_fraction( 2.0 ), 100.0 );
    }


    #[test]
    fn test_pointer_fraction() {
        let bar = BarGeometry::new( 20.0, 200.0, 4.0 );
        assert_eq!( bar.pointer_fraction( 120.0 ), 0.5 );
        assert_eq!( bar.pointer_fraction( 0.0 ), 0.0 );
        assert_eq!( bar.pointer_fraction( 400.0 ), 1.0 );
    }


    #[test]
    fn test_pointer_fraction_zero_width() {
        let bar = BarGeometry::default();
        assert_eq!( bar.pointer_fraction( 10.0 ), 0.0 );
    }
}
