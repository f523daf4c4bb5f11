pub mod test_helpers {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::display::TerminalSink;
    use crate::event_source::{SimulatedEventSource, SimulatedStep};
    use crate::render::{ComputeConfig, GenerateError, ImageGenerator, PixelBuffer, ViewState};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Builder for creating test scenarios with simulated user input
    #[derive(Default)]
    pub struct TestScenarioBuilder {
        steps: Vec<SimulatedStep>,
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a character key press
        pub fn press_char(mut self, c: char) -> Self {
            self.steps
                .push(SimulatedStep::Event(SimulatedEventSource::char_key(c)));
            self
        }

        /// Add a Ctrl+character key press
        pub fn press_ctrl_char(mut self, c: char) -> Self {
            self.steps
                .push(SimulatedStep::Event(SimulatedEventSource::ctrl_char_key(c)));
            self
        }

        /// Left click at a terminal cell
        pub fn click(mut self, column: u16, row: u16) -> Self {
            self.steps.push(SimulatedStep::Event(SimulatedEventSource::left_click(
                column, row,
            )));
            self
        }

        /// Move the pointer to a terminal cell
        pub fn move_to(mut self, column: u16, row: u16) -> Self {
            self.steps.push(SimulatedStep::Event(SimulatedEventSource::mouse_move(
                column, row,
            )));
            self
        }

        /// Report a new terminal size
        pub fn resize(mut self, columns: u16, rows: u16) -> Self {
            self.steps
                .push(SimulatedStep::Event(SimulatedEventSource::resize(columns, rows)));
            self
        }

        /// Zoom in (press '1')
        pub fn zoom_in(self) -> Self {
            self.press_char('1')
        }

        /// Hold the current scale (press '2')
        pub fn pause_zoom(self) -> Self {
            self.press_char('2')
        }

        /// Zoom out (press '3')
        pub fn zoom_out(self) -> Self {
            self.press_char('3')
        }

        /// Let the display loop tick for a while before the next input
        pub fn wait(mut self, duration: Duration) -> Self {
            self.steps.push(SimulatedStep::Wait(duration));
            self
        }

        /// Quit the application (press 'q')
        pub fn quit(self) -> Self {
            self.press_char('q')
        }

        /// Build the simulated event source
        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::from_steps(self.steps)
        }
    }

    /// Create a display sink over a test terminal
    pub fn create_test_sink(width: u16, height: u16) -> TerminalSink<TestBackend> {
        let terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        TerminalSink::new(terminal, "test").unwrap()
    }

    /// Generator producing a single flat colour
    pub fn solid_generator(rgba: [u8; 4]) -> Arc<dyn ImageGenerator> {
        Arc::new(move |_: &ViewState, w: usize, h: usize| {
            PixelBuffer::filled(w, h, rgba).map_err(GenerateError::from)
        })
    }

    /// Small frames and a short tick so tests settle quickly
    pub fn fast_config() -> ComputeConfig {
        ComputeConfig {
            width: 16,
            height: 16,
            tick_interval: Duration::from_millis(1),
            ..ComputeConfig::default()
        }
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            // Trim trailing whitespace from each line
            lines.push(line.trim_end().to_string());
        }

        // Remove trailing empty lines
        while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        lines.join("\n")
    }
}
