use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::debug;
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use netpulse::models::{QualityTier, ScanReport};
use netpulse::session::MonitoringSession;

use crate::cli::formatting::{format_latency, format_loss, format_speed_sample, sorted_hosts};

pub struct Dashboard {
    session: Arc<MonitoringSession>,
    report: ScanReport,
    refresh: Duration,
    speed_test_running: Arc<AtomicBool>,
}

fn tier_color(tier: QualityTier) -> Color {
    match tier {
        QualityTier::Excellent => Color::Green,
        QualityTier::Good => Color::Yellow,
        QualityTier::Fair => Color::Rgb(255, 165, 0),
        QualityTier::Slow => Color::Red,
        QualityTier::Down => Color::Rgb(139, 0, 0),
        QualityTier::Unknown => Color::Gray,
    }
}

impl Dashboard {
    pub fn new(session: Arc<MonitoringSession>, report: ScanReport, refresh_ms: u64) -> Self {
        Self {
            session,
            report,
            refresh: Duration::from_millis(refresh_ms.max(50)),
            speed_test_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let res = self.run_app(&mut terminal).await;

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        if let Err(err) = res {
            eprintln!("Error: {err:?}");
        }

        Ok(())
    }

    async fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B::Error: Send + Sync + 'static,
    {
        loop {
            terminal.draw(|f| self.ui(f))?;

            if event::poll(self.refresh)? {
                if let Event::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('t') => self.trigger_speed_test(),
                        _ => {}
                    }
                }
            }
            // Let the polling tasks run between redraws
            tokio::task::yield_now().await;
        }
    }

    fn trigger_speed_test(&self) {
        if self.speed_test_running.swap(true, Ordering::SeqCst) {
            debug!("Speed test already running");
            return;
        }
        let speed = Arc::clone(self.session.speed());
        let running = Arc::clone(&self.speed_test_running);
        tokio::spawn(async move {
            speed.run_once().await;
            running.store(false, Ordering::SeqCst);
        });
    }

    fn ui(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Length(5),
                    Constraint::Min(10),
                    Constraint::Length(3),
                ]
                .as_ref(),
            )
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.render_speed(frame, chunks[1]);
        self.render_host_list(frame, chunks[2]);
        self.render_footer(frame, chunks[3]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::raw(format!("Network Pulse - {}", self.report.range)),
            Span::raw("    "),
            Span::styled(
                Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                Style::default().fg(Color::Yellow),
            ),
        ];
        if self.report.demo_mode {
            spans.push(Span::raw("    "));
            spans.push(Span::styled(
                "DEMO DEVICES",
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            ));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::White));

        let paragraph = Paragraph::new(vec![Line::from(spans)]).block(block);
        frame.render_widget(paragraph, area);
    }

    fn render_speed(&self, frame: &mut Frame, area: Rect) {
        let history = self.session.speed().snapshot();
        let latest = match history.last() {
            Some(sample) => Line::from(vec![
                Span::raw("Latest: "),
                Span::styled(
                    format_speed_sample(sample),
                    Style::default().fg(if sample.is_simulated {
                        Color::DarkGray
                    } else {
                        Color::Green
                    }),
                ),
            ]),
            None => Line::from("Latest: waiting for first sample"),
        };

        let status = if self.speed_test_running.load(Ordering::SeqCst) {
            "Speed test running..."
        } else {
            ""
        };
        let lines = vec![
            latest,
            Line::from(format!("Samples: {}", history.len())),
            Line::from(Span::styled(status, Style::default().fg(Color::Cyan))),
        ];

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Internet Speed")
            .style(Style::default().fg(Color::White));

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_host_list(&self, frame: &mut Frame, area: Rect) {
        let snapshot = self.session.latency().snapshot();

        let items: Vec<ListItem> = sorted_hosts(&snapshot)
            .into_iter()
            .map(|record| {
                let tier = record.current_tier;
                let latest = record.latest().and_then(|s| s.elapsed_ms);
                ListItem::new(vec![Line::from(vec![
                    Span::styled(
                        format!("{:<22}", record.display_name),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(format!("{:<16}", record.address)),
                    Span::styled(
                        format!("{:<10}", tier.label().to_uppercase()),
                        Style::default().fg(tier_color(tier)).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!(
                        "{:>10}  loss {:>4}  {:>10}  ({} samples)",
                        format_latency(latest),
                        format_loss(record.loss_rate()),
                        tier.estimated_link_speed(),
                        record.sample_count()
                    )),
                ])])
            })
            .collect();

        let hosts = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Devices ({})", snapshot.len())),
            )
            .style(Style::default().fg(Color::White));

        frame.render_widget(hosts, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let footer = Paragraph::new("Press 't' to test speed now, 'q' or ESC to quit")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::TOP));

        frame.render_widget(footer, area);
    }
}
