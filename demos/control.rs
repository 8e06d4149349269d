use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dynaudio_connect::{DeviceConfig, DynaudioDevice, DynaudioError, PowerState, DEFAULT_PORT, MAX_VOLUME};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

struct App {
    device: DynaudioDevice,
    status_message: String,
    last_refresh: Instant,
}

impl App {
    fn new(device: DynaudioDevice) -> Self {
        Self {
            device,
            status_message: "o on, f off, +/- volume, m mute, i input, r refresh, q quit".to_string(),
            last_refresh: Instant::now(),
        }
    }

    fn report(&mut self, result: Result<(), DynaudioError>, ok: String) {
        self.status_message = match result {
            Ok(()) => ok,
            Err(e) => format!("Rejected: {}", e),
        };
    }

    async fn refresh(&mut self) {
        self.device.refresh().await;
        self.last_refresh = Instant::now();
        self.status_message = if self.device.responding() {
            "State refreshed".to_string()
        } else {
            "No answer: device is off or unreachable".to_string()
        };
    }

    async fn set_power(&mut self, on: bool) {
        let result = if on {
            self.device.turn_on().await
        } else {
            self.device.turn_off().await
        };
        self.report(result, format!("Sent power {}", if on { "ON" } else { "OFF" }));
    }

    // The cached volume only changes on refresh, so steps are relative to
    // the last reported level.
    async fn adjust_volume(&mut self, delta: i16) {
        let current = (self.device.volume_level() * f64::from(MAX_VOLUME)).round() as i16;
        let steps = (current + delta).clamp(0, i16::from(MAX_VOLUME));
        let level = f64::from(steps) / f64::from(MAX_VOLUME);
        let result = self.device.set_volume(level).await;
        self.report(result, format!("Sent volume {}/{}", steps, MAX_VOLUME));
    }

    async fn toggle_mute(&mut self) {
        let new_mute = !self.device.is_muted();
        let result = self.device.set_mute(new_mute).await;
        self.report(result, "Sent mute".to_string());
    }

    async fn cycle_input(&mut self) {
        let inputs = self.device.available_sources();
        let current = self.device.current_source();
        let next_idx = inputs
            .iter()
            .position(|i| *i == current)
            .map(|idx| (idx + 1) % inputs.len())
            .unwrap_or(0);
        let next_input = inputs[next_idx].clone();

        let result = self.device.select_source(&next_input).await;
        self.report(result, format!("Sent input {}", next_input));
    }
}

fn ui(f: &mut Frame, app: &App) {
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.size());

    let inner_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(outer_chunks[0]);

    render_device_control(f, app, inner_chunks[0]);
    render_json_dump(f, app, inner_chunks[1]);
    render_status(f, app, outer_chunks[1]);
}

fn on_off(on: bool) -> (&'static str, Style) {
    if on {
        ("ON", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        ("OFF", Style::default().fg(Color::Red))
    }
}

fn render_device_control(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Device Control ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let state = app.device.state_snapshot();
    let (power, power_style) = on_off(state.power_state() == PowerState::On);
    let (mute, _) = on_off(state.muted);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Device: ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(format!(
                "{} ({}:{}, zone {})",
                app.device.name(),
                app.device.host(),
                app.device.port(),
                state.zone
            )),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Power: ", Style::default().fg(Color::Yellow)),
            Span::styled(power, power_style),
            Span::styled(
                if state.responding { "" } else { "  (not responding)" },
                Style::default().fg(Color::Gray),
            ),
        ]),
        Line::from(vec![
            Span::styled("Volume: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                format!("{}/{} ({:.0}%)", state.volume, MAX_VOLUME, state.volume_level() * 100.0),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Mute: ", Style::default().fg(Color::Yellow)),
            Span::raw(mute),
        ]),
        Line::from(""),
        Line::from(Span::styled("Inputs:", Style::default().fg(Color::Yellow))),
    ];

    let current = state.source_name();
    for input in app.device.available_sources() {
        let is_active = input == current;
        let prefix = if is_active { "  ▶ " } else { "    " };
        lines.push(Line::from(vec![
            Span::raw(prefix),
            Span::styled(
                input,
                if is_active {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                },
            ),
        ]));
    }

    let text = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    f.render_widget(text, area);
}

fn render_json_dump(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" State ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let json_str = serde_json::to_string_pretty(&app.device.state_snapshot())
        .unwrap_or_else(|e| format!("Failed to serialize state: {}", e));

    let text = Paragraph::new(json_str).block(block).wrap(Wrap { trim: false });
    f.render_widget(text, area);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Status ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let text = Paragraph::new(app.status_message.clone())
        .block(block)
        .wrap(Wrap { trim: true });

    f.render_widget(text, area);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let host = args.next().ok_or("usage: control <host> [port]")?;
    let port = match args.next() {
        Some(port) => port.parse()?,
        None => DEFAULT_PORT,
    };

    let device = DynaudioDevice::connect(&DeviceConfig::new(host).with_port(port)).await;
    let mut app = App::new(device);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {}", err);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if app.last_refresh.elapsed() >= REFRESH_INTERVAL {
            app.refresh().await;
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char('o') => app.set_power(true).await,
                        KeyCode::Char('f') => app.set_power(false).await,
                        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_volume(1).await,
                        KeyCode::Char('-') | KeyCode::Char('_') => app.adjust_volume(-1).await,
                        KeyCode::Char('m') => app.toggle_mute().await,
                        KeyCode::Char('i') => app.cycle_input().await,
                        KeyCode::Char('r') => app.refresh().await,
                        _ => {}
                    }
                }
            }
        }
    }
}
