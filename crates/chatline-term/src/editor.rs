//! Line editor.
//!
//! Accumulates keystrokes into a bounded line buffer and keeps the prompt and
//! partial input visible while output blocks are written over them. The
//! terminal echoes typed characters itself (only canonical mode is off), so
//! the editor draws only when it has to repaint: after backspace, after an
//! empty line, and after output lands on the prompt line.

use std::io;

use crate::screen::Screen;

/// Capacity of the line buffer in bytes. Reaching it submits the line.
pub const MAX_LINE_LEN: usize = 512;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;

/// Result of feeding one keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Keep reading.
    Continue,
    /// A line was submitted.
    Complete(String),
}

/// Edit buffer plus the output-interleaving state.
#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: Vec<u8>,
    /// The last output block did not end a line; the next block continues it.
    mid_output: bool,
}

impl LineEditor {
    /// Empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes typed so far.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard the buffer and the interleaving state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.mid_output = false;
    }

    /// Start a new line: reset and print the prompt.
    pub fn begin(&mut self, prompt: &str, screen: &mut impl Screen) -> io::Result<()> {
        self.reset();
        screen.write_raw(prompt.as_bytes())?;
        screen.flush()
    }

    /// Feed one keystroke.
    ///
    /// The buffer is updated before anything is drawn, so a failed write
    /// leaves the editor consistent.
    pub fn handle_key(
        &mut self,
        byte: u8,
        prompt: &str,
        screen: &mut impl Screen,
    ) -> io::Result<KeyOutcome> {
        match byte {
            b'\n' | b'\r' => {
                if self.buffer.is_empty() {
                    screen.write_raw(prompt.as_bytes())?;
                    screen.flush()?;
                    return Ok(KeyOutcome::Continue);
                }
                Ok(KeyOutcome::Complete(self.take_line()))
            },
            BACKSPACE | DELETE => {
                let erased = pop_char(&mut self.buffer);
                if !erased {
                    screen.ring_bell()?;
                }
                self.repaint(prompt, screen)?;
                Ok(KeyOutcome::Continue)
            },
            _ => {
                self.mid_output = false;
                self.buffer.push(byte);
                if self.buffer.len() >= MAX_LINE_LEN {
                    return Ok(KeyOutcome::Complete(self.take_line()));
                }
                Ok(KeyOutcome::Continue)
            },
        }
    }

    /// Write an output block over the prompt line.
    ///
    /// The line is cleared first unless the previous block stopped mid-line.
    /// When the block ends a line (a line break as its last or second-to-last
    /// byte), the prompt and partial input are drawn again below it. Blocks
    /// arrive as whole datagrams, so a full-size block ending in a line break
    /// is as final as a short one.
    pub fn handle_output(
        &mut self,
        block: &[u8],
        prompt: &str,
        screen: &mut impl Screen,
    ) -> io::Result<()> {
        if !self.mid_output {
            screen.clear_line()?;
        }
        screen.write_raw(block)?;

        if ends_line(block) {
            self.mid_output = false;
            screen.write_raw(b"\r")?;
            screen.write_raw(prompt.as_bytes())?;
            screen.write_raw(&self.buffer)?;
        } else {
            self.mid_output = true;
        }
        screen.flush()
    }

    fn repaint(&self, prompt: &str, screen: &mut impl Screen) -> io::Result<()> {
        screen.clear_line()?;
        screen.write_raw(prompt.as_bytes())?;
        screen.write_raw(&self.buffer)?;
        screen.flush()
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        line
    }
}

/// Drop the last UTF-8 character. Returns `false` if the buffer was empty.
fn pop_char(buffer: &mut Vec<u8>) -> bool {
    let Some(mut byte) = buffer.pop() else {
        return false;
    };
    // Continuation bytes look like 0b10xx_xxxx.
    while byte & 0xc0 == 0x80 {
        match buffer.pop() {
            Some(b) => byte = b,
            None => break,
        }
    }
    true
}

fn ends_line(block: &[u8]) -> bool {
    match block {
        [.., b'\n'] | [.., b'\n', _] => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{screen::RecordingScreen, wakeup::MAX_CHUNK};

    const PROMPT: &str = "chat> ";

    fn type_bytes(
        editor: &mut LineEditor,
        screen: &mut RecordingScreen,
        bytes: &[u8],
    ) -> Option<String> {
        for &b in bytes {
            if let KeyOutcome::Complete(line) = editor.handle_key(b, PROMPT, screen).unwrap() {
                return Some(line);
            }
        }
        None
    }

    #[test]
    fn newline_submits() {
        let (mut editor, mut screen) = (LineEditor::new(), RecordingScreen::new());
        assert_eq!(type_bytes(&mut editor, &mut screen, b"hi\n"), Some("hi".to_owned()));
        assert!(editor.buffer().is_empty());
    }

    #[test]
    fn empty_line_reprints_prompt() {
        let (mut editor, mut screen) = (LineEditor::new(), RecordingScreen::new());
        editor.begin(PROMPT, &mut screen).unwrap();
        assert_eq!(type_bytes(&mut editor, &mut screen, b"\n"), None);
        assert_eq!(screen.current_line(), "chat> chat> ");
    }

    #[test]
    fn backspace_on_empty_rings_once() {
        let (mut editor, mut screen) = (LineEditor::new(), RecordingScreen::new());
        type_bytes(&mut editor, &mut screen, &[DELETE]);
        assert_eq!(screen.bells(), 1);
        assert_eq!(screen.current_line(), PROMPT);
    }

    #[test]
    fn backspace_removes_whole_character() {
        let (mut editor, mut screen) = (LineEditor::new(), RecordingScreen::new());
        let line = type_bytes(&mut editor, &mut screen, "abé\x08\x08c\n".as_bytes());
        assert_eq!(line, Some("ac".to_owned()));
        assert_eq!(screen.bells(), 0);
    }

    #[test]
    fn full_buffer_submits_exactly_capacity() {
        let (mut editor, mut screen) = (LineEditor::new(), RecordingScreen::new());
        let input = vec![b'a'; MAX_LINE_LEN + 5];
        let line = type_bytes(&mut editor, &mut screen, &input).unwrap();
        assert_eq!(line.len(), MAX_LINE_LEN);
    }

    #[test]
    fn output_mid_edit_restores_prompt_and_input() {
        let (mut editor, mut screen) = (LineEditor::new(), RecordingScreen::new());
        editor.begin(PROMPT, &mut screen).unwrap();
        type_bytes(&mut editor, &mut screen, b"hel");

        editor.handle_output(b"\r[12:00] news\n", PROMPT, &mut screen).unwrap();
        assert_eq!(screen.lines(), vec!["[12:00] news".to_owned()]);
        assert_eq!(screen.current_line(), "chat> hel");

        let line = type_bytes(&mut editor, &mut screen, b"lo\n");
        assert_eq!(line, Some("hello".to_owned()));
    }

    #[test]
    fn unterminated_output_is_continued_without_clearing() {
        let (mut editor, mut screen) = (LineEditor::new(), RecordingScreen::new());
        editor.begin(PROMPT, &mut screen).unwrap();

        editor.handle_output(b"part one, ", PROMPT, &mut screen).unwrap();
        editor.handle_output(b"part two\n", PROMPT, &mut screen).unwrap();

        assert_eq!(screen.clears(), 1);
        assert_eq!(screen.lines(), vec!["part one, part two".to_owned()]);
        assert_eq!(screen.current_line(), PROMPT);
    }

    #[test]
    fn full_chunk_line_restores_prompt_and_input() {
        let (mut editor, mut screen) = (LineEditor::new(), RecordingScreen::new());
        editor.begin(PROMPT, &mut screen).unwrap();
        type_bytes(&mut editor, &mut screen, b"hel");

        let mut block = vec![b'x'; MAX_CHUNK - 1];
        block.push(b'\n');
        editor.handle_output(&block, PROMPT, &mut screen).unwrap();

        assert_eq!(screen.lines()[0].len(), MAX_CHUNK - 1);
        assert_eq!(screen.current_line(), "chat> hel");
    }

    #[test]
    fn line_endings() {
        assert!(ends_line(b"line\n"));
        assert!(ends_line(b"line\n\x07"));
        assert!(!ends_line(b"line"));
        assert!(!ends_line(&vec![b'x'; MAX_CHUNK]));
    }

    #[test]
    fn only_typed_characters_end_continued_output() {
        let (mut editor, mut screen) = (LineEditor::new(), RecordingScreen::new());
        editor.begin(PROMPT, &mut screen).unwrap();

        editor.handle_output(b"part one, ", PROMPT, &mut screen).unwrap();
        type_bytes(&mut editor, &mut screen, &[DELETE]);
        let clears = screen.clears();
        editor.handle_output(b"part two\n", PROMPT, &mut screen).unwrap();
        assert_eq!(screen.clears(), clears, "continued block must not clear the line");

        editor.handle_output(b"half", PROMPT, &mut screen).unwrap();
        type_bytes(&mut editor, &mut screen, b"a");
        let clears = screen.clears();
        editor.handle_output(b"fresh\n", PROMPT, &mut screen).unwrap();
        assert_eq!(screen.clears(), clears + 1);
    }

    proptest! {
        #[test]
        fn buffer_never_exceeds_capacity(input in prop::collection::vec(any::<u8>(), 0..2048)) {
            let (mut editor, mut screen) = (LineEditor::new(), RecordingScreen::new());
            for b in input {
                if let KeyOutcome::Complete(line) = editor.handle_key(b, PROMPT, &mut screen).unwrap() {
                    prop_assert!(!line.is_empty());
                }
                prop_assert!(editor.buffer().len() < MAX_LINE_LEN);
            }
        }
    }
}
