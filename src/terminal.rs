use std::{
    io::{self, Write},
    thread,
};

use anyhow::Result;
use crossbeam_channel::Receiver;
use crossterm::{
    event::{Event, KeyEvent},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

pub fn create() -> Result<Terminal<impl Backend>> {
    let mut backend = CrosstermBackend::new(Screen::new(io::stdout())?);

    execute!(&mut backend, SetTitle("Keyfob"))?;

    Terminal::new(backend).map_err(Into::into)
}

/// Raw mode on the alternate screen, for as long as this value lives. Both are undone in reverse
/// order when dropped, even if the view exits with an error.
struct Screen<W: Write> {
    output: W,
}

impl<W: Write> Screen<W> {
    fn new(mut output: W) -> Result<Self> {
        terminal::enable_raw_mode()?;

        if let Err(e) = execute!(output, EnterAlternateScreen) {
            terminal::disable_raw_mode().ok();
            return Err(e.into());
        }

        Ok(Self { output })
    }
}

impl<W: Write> Drop for Screen<W> {
    fn drop(&mut self) {
        execute!(self.output, LeaveAlternateScreen).ok();
        terminal::disable_raw_mode().ok();
    }
}

impl<W: Write> Write for Screen<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

/// Forward key presses from a background thread. The thread ends with the next key press after
/// the receiver was dropped.
pub fn create_event_listener() -> Receiver<KeyEvent> {
    let (tx, rx) = crossbeam_channel::bounded(0);

    thread::spawn(move || {
        while let Ok(event) = crossterm::event::read() {
            if let Event::Key(k) = event {
                if tx.send(k).is_err() {
                    break;
                }
            }
        }
    });

    rx
}
