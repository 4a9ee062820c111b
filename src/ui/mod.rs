//! UI rendering module for cosmowall
//!
//! This module contains the caption viewer for the terminal, built on the
//! ratatui library, and the loop that drives it.

pub mod help_overlay;
pub mod viewer;

pub use help_overlay::render as render_help_overlay;
pub use viewer::{render as render_viewer, LayoutMode, Viewer};

use std::io;
use std::panic;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the viewer panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

/// Runs the viewer until the user closes it
pub fn run(mut viewer: Viewer) -> io::Result<()> {
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut viewer);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    viewer: &mut Viewer,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| render_viewer(f, viewer))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    viewer.handle_key(key);
                }
            }
        }

        viewer.tick(Instant::now());

        if viewer.should_quit {
            return Ok(());
        }
    }
}
