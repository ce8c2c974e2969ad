//! midipeek - Preview MIDI files in the terminal.
//!
//! Plays a MIDI file through a SoundFont with a play/pause, restart and seek
//! transport, and manages the soundbank used for playback.
//!
//! # Usage
//!
//! ```bash
//! midipeek preview song.mid        # Preview a file
//! midipeek preferences             # Open the soundbank panel
//! midipeek soundbank set gm.sf2    # Choose a soundbank from the shell
//! midipeek soundbank test          # Check the chosen soundbank
//! ```

use anyhow::{bail, Context, Result};
use clap::{crate_version, Parser, Subcommand};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseButton,
    MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use midipeek::app::{pixel_width, App};
use midipeek::audio::SynthPlayerFactory;
use midipeek::config::Config;
use midipeek::preferences::{probe_soundbank, NO_SOUNDBANK};
use midipeek::settings::{JsonFileStore, SoundbankSettings};
use midipeek::ui;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    about = "Preview MIDI files in the terminal."
)]
struct Cli {
    /// Directory holding the preference file.
    #[arg(long, env = "MIDIPEEK_CONFIG_DIR", global = true)]
    config_dir: Option<PathBuf>,
    /// Soundbank tried before the system locations when none is chosen.
    #[arg(long, env = "MIDIPEEK_DEFAULT_SOUNDBANK", global = true)]
    default_soundbank: Option<PathBuf>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays a MIDI file with transport controls.
    Preview {
        /// The MIDI file to preview.
        file: PathBuf,
    },
    /// Opens the soundbank preferences panel.
    Preferences {},
    /// Shows or changes the soundbank from the shell.
    Soundbank {
        #[clap(subcommand)]
        action: SoundbankAction,
    },
}

#[derive(Subcommand)]
enum SoundbankAction {
    /// Prints the chosen soundbank.
    Show {},
    /// Chooses a soundbank file (sf2 or dls).
    Set {
        /// The soundbank file.
        path: PathBuf,
    },
    /// Goes back to the default soundbank.
    Reset {},
    /// Checks that the chosen soundbank can play MIDI.
    Test {},
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (optional, for debugging)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::new(cli.config_dir, cli.default_soundbank);
    let settings = SoundbankSettings::new(Rc::new(JsonFileStore::new(config.preferences_path())));
    let factory = Rc::new(SynthPlayerFactory::new(config.default_soundbanks.clone()));

    match cli.command {
        Commands::Preview { file } => {
            let mut app = App::new(settings, factory);
            // Open before touching the terminal so errors print plainly
            app.open_preview(&file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            run_tui(&mut app, true)
        }
        Commands::Preferences {} => {
            let mut app = App::preferences_only(settings, factory);
            run_tui(&mut app, false)
        }
        Commands::Soundbank { action } => run_soundbank(action, &settings, factory.as_ref()),
    }
}

fn run_soundbank(
    action: SoundbankAction,
    settings: &SoundbankSettings,
    factory: &SynthPlayerFactory,
) -> Result<()> {
    match action {
        SoundbankAction::Show {} => match settings.get() {
            Some(path) => println!("{}", path.display()),
            None => println!("{}", NO_SOUNDBANK),
        },
        SoundbankAction::Set { path } => {
            let path = std::path::absolute(&path).unwrap_or(path);
            if !SoundbankSettings::validate(&path) {
                bail!(midipeek::Error::InvalidSoundbankFile(path));
            }
            settings
                .set(&path)
                .context("Failed to save soundbank preference")?;
            println!("Soundbank set to {}", path.display());
            println!("Reopen MIDI files for changes to take effect.");
        }
        SoundbankAction::Reset {} => {
            settings
                .reset()
                .context("Failed to reset soundbank preference")?;
            println!("Reset to system default soundbank.");
        }
        SoundbankAction::Test {} => {
            let Some(path) = settings.get() else {
                bail!("No soundbank file selected");
            };
            probe_soundbank(factory, &path).with_context(|| {
                format!(
                    "The soundbank file may be corrupted or incompatible: {}",
                    path.display()
                )
            })?;
            println!("The current soundbank file can be used normally.");
        }
    }
    Ok(())
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Width of the terminal in pixels, estimated from columns when unreported.
fn terminal_pixel_width() -> f64 {
    match crossterm::terminal::window_size() {
        Ok(size) => pixel_width(size.columns, size.width),
        Err(_) => {
            let columns = crossterm::terminal::size().map_or(80, |(c, _)| c);
            pixel_width(columns, 0)
        }
    }
}

fn run_tui(app: &mut App, show_preview: bool) -> Result<()> {
    let mut terminal = setup_terminal().context("Failed to setup terminal")?;

    if show_preview {
        app.appear(terminal_pixel_width());
    }
    let result = run_app(&mut terminal, app);
    app.close();

    // Restore terminal
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    result
}

/// Main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        app.update(Instant::now());

        terminal.draw(|frame| ui::render(frame, app))?;

        // Short timeout so ticks and completions are picked up promptly
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key.code);
                }
                Event::Mouse(mouse) => {
                    if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
                        app.handle_click(mouse.column, mouse.row);
                    }
                }
                Event::Resize(_, _) => app.resize(terminal_pixel_width()),
                _ => {}
            }
        }
    }

    Ok(())
}
