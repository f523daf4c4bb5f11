use crossterm::{
    event::DisableMouseCapture,
    execute,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use log::error;
use std::io::{self, Write};
use std::panic;

/// Restore the terminal before the default hook prints the panic.
///
/// Panics on worker threads are only logged; the controller reports them
/// when it joins the thread and the display keeps running until then.
pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let thread = std::thread::current();
        if thread.name() != Some("main") {
            error!(
                "Thread {} panicked: {panic_info}",
                thread.name().unwrap_or("<unnamed>")
            );
            return;
        }
        restore_terminal();
        default_hook(panic_info);
        std::process::exit(1);
    }));
}

/// Restore terminal to a clean state
///
/// Specifically handles:
/// - Disabling raw mode
/// - Exiting alternate screen
/// - Disabling mouse capture (important for restoring mouse functionality)
/// - Showing the cursor
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
    let _ = execute!(io::stderr(), crossterm::cursor::Show);
    let _ = writeln!(io::stderr());
}
