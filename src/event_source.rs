use anyhow::Result;
pub use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::time::Duration;

/// Trait for abstracting event sources to enable testing
pub trait EventSource {
    /// Poll for events with a timeout
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    /// Read the next event
    fn read(&mut self) -> Result<Event>;
}

/// Real keyboard and mouse event source using crossterm
pub struct KeyboardEventSource;

impl EventSource for KeyboardEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool> {
        Ok(crossterm::event::poll(timeout)?)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(crossterm::event::read()?)
    }
}

/// One scripted step of a simulated session
#[derive(Debug, Clone)]
pub enum SimulatedStep {
    Event(Event),
    /// Ends the current batch of events after sleeping
    Wait(Duration),
}

/// Simulated event source for testing
pub struct SimulatedEventSource {
    steps: Vec<SimulatedStep>,
    current_index: usize,
}

impl SimulatedEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self::from_steps(events.into_iter().map(SimulatedStep::Event).collect())
    }

    pub fn from_steps(steps: Vec<SimulatedStep>) -> Self {
        Self {
            steps,
            current_index: 0,
        }
    }

    /// Steps not yet consumed
    pub fn remaining(&self) -> usize {
        self.steps.len() - self.current_index
    }

    /// Helper method to create a key event
    pub fn key_event(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: crossterm::event::KeyEventKind::Press,
            state: crossterm::event::KeyEventState::empty(),
        })
    }

    /// Helper method to create a simple character key event
    pub fn char_key(c: char) -> Event {
        Self::key_event(KeyCode::Char(c), KeyModifiers::empty())
    }

    /// Helper method to create a Ctrl+char key event
    pub fn ctrl_char_key(c: char) -> Event {
        Self::key_event(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        })
    }

    /// Left button press at a terminal cell
    pub fn left_click(column: u16, row: u16) -> Event {
        Self::mouse(MouseEventKind::Down(MouseButton::Left), column, row)
    }

    /// Pointer motion to a terminal cell
    pub fn mouse_move(column: u16, row: u16) -> Event {
        Self::mouse(MouseEventKind::Moved, column, row)
    }

    /// Terminal resized to `columns` x `rows`
    pub fn resize(columns: u16, rows: u16) -> Event {
        Event::Resize(columns, rows)
    }
}

impl EventSource for SimulatedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        match self.steps.get(self.current_index) {
            Some(SimulatedStep::Event(_)) => Ok(true),
            Some(SimulatedStep::Wait(pause)) => {
                std::thread::sleep(*pause);
                self.current_index += 1;
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn read(&mut self) -> Result<Event> {
        while let Some(step) = self.steps.get(self.current_index) {
            self.current_index += 1;
            if let SimulatedStep::Event(event) = step {
                return Ok(event.clone());
            }
        }
        // Return a quit event if we've exhausted all events
        Ok(SimulatedEventSource::char_key('q'))
    }
}
