//! Command-line input for slash commands.


/// Current input mode of the application.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum InputMode {
    /// Keyboard shortcuts drive the player.
    #[default]
    Normal,

    /// Typing a slash command.
    Command,
}


/// Single-line text buffer with the cursor kept at the end.
#[derive( Debug, Default )]
pub struct InputBuffer {
    content: String,
}


impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }


    pub fn push( &mut self, c: char ) {
        self.content.push( c );
    }


    pub fn backspace( &mut self ) {
        self.content.pop();
    }


    /// Returns the text and empties the buffer.
    pub fn take( &mut self ) -> String {
        std::mem::take( &mut self.content )
    }


    pub fn clear( &mut self ) {
        self.content.clear();
    }


    pub fn content( &self ) -> &str {
        &self.content
    }


    /// Cursor column, in characters.
    pub fn cursor( &self ) -> usize {
        self.content.chars().count()
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_edit_and_take() {
        let mut input = InputBuffer::new();
        for c in "vol 5é".chars() {
            input.push( c );
        }
        input.backspace();
        assert_eq!( input.content(), "vol 5" );
        assert_eq!( input.cursor(), 5 );
        assert_eq!( input.take(), "vol 5" );
        assert!( input.content().is_empty() );
    }
}
