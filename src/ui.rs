use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use puffcoach::{
    clock::Clock,
    session::{ObjectSnapshot, Snapshot, Trackable},
    steps::{StepAction, TRAINING_STEPS},
};

use crate::App;

const HELP: &str =
    "i inhaler  c clipboard  enter pick up  x put down  d cap  s shake  ←/→ look  r reset  esc quit";

pub fn draw<C: Clock + Clone>(app: &App<C>, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl<C: Clock + Clone> Widget for &App<C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snap = &self.snapshot;
        let bold_style = Style::default().add_modifier(Modifier::BOLD);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(area);

        let progress = if snap.training.is_training_complete {
            "done".to_string()
        } else {
            format!("step {}/{}", snap.training.current_step + 1, snap.total_steps)
        };
        Paragraph::new(Line::from(vec![
            Span::styled("puffcoach", bold_style.fg(Color::Cyan)),
            Span::raw(format!("  {progress}  {}", format_elapsed(self.elapsed()))),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(chunks[1]);
        render_steps(snap, body[0], buf);
        render_scene(snap, self.hovered, body[1], buf);

        if snap.training.is_training_complete {
            Paragraph::new(Span::styled(
                format!(
                    "Training complete in {}. Press r to practise again.",
                    format_elapsed(self.elapsed())
                ),
                bold_style.fg(Color::Green),
            ))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL))
            .render(chunks[2], buf);
        } else {
            render_progress(snap, chunks[2], buf);
        }

        Paragraph::new(Span::styled(
            HELP,
            Style::default().add_modifier(Modifier::DIM),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }
}

fn render_steps(snap: &Snapshot, area: Rect, buf: &mut Buffer) {
    let block = Block::default().borders(Borders::ALL).title(" Steps ");
    let inner = block.inner(area);
    block.render(area, buf);

    let state = &snap.training;
    let lines = TRAINING_STEPS
        .iter()
        .map(|step| {
            let done = state.completed_steps.contains(&step.id);
            let active = !state.is_training_complete && step.id == state.current_step;
            let (marker, style) = match (done, active) {
                (true, _) => ("[x] ", Style::default().fg(Color::Green)),
                (false, true) => (
                    "[>] ",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                (false, false) => ("[ ] ", Style::default().add_modifier(Modifier::DIM)),
            };
            let suffix = if step.optional { " (optional)" } else { "" };
            let room = (inner.width as usize).saturating_sub(marker.width() + suffix.width());
            Line::from(vec![
                Span::styled(marker, style),
                Span::styled(fit_width(step.text, room), style),
                Span::styled(suffix, style.add_modifier(Modifier::ITALIC)),
            ])
        })
        .collect::<Vec<_>>();

    Paragraph::new(lines).render(inner, buf);
}

fn object_line(label: &str, object: &ObjectSnapshot, looking: bool) -> Line<'static> {
    let (status, style) = if object.is_focused {
        ("held", Style::default().fg(Color::Cyan))
    } else if object.is_hovering || looking {
        ("resting, in view", Style::default().fg(Color::Magenta))
    } else {
        ("resting", Style::default())
    };
    Line::from(vec![
        Span::raw(format!("{label:<11}")),
        Span::styled(status, style),
    ])
}

fn render_scene(snap: &Snapshot, hovered: Option<Trackable>, area: Rect, buf: &mut Buffer) {
    let block = Block::default().borders(Borders::ALL).title(" Scene ");
    let inner = block.inner(area);
    block.render(area, buf);

    let state = &snap.training;
    let absorbed = snap.diagnostics.rejected_completions
        + snap.diagnostics.debounced_advances
        + snap.diagnostics.ignored_advances;
    let looking_at = hovered.map_or("nothing".to_string(), |t| t.to_string());

    let lines = vec![
        object_line("Inhaler", &snap.inhaler, hovered == Some(Trackable::Inhaler)),
        Line::from(format!(
            "{:<11}{}",
            "Cap",
            if state.is_cap_off { "off" } else { "on" }
        )),
        object_line(
            "Clipboard",
            &snap.clipboard,
            hovered == Some(Trackable::Clipboard),
        ),
        Line::from(""),
        Line::from(format!(
            "{:<11}{:.1} u/s (shake > {:.1})",
            "Hand speed", snap.shake_speed, snap.shake_threshold
        )),
        Line::from(format!("{:<11}{looking_at}", "Looking at")),
        Line::from(Span::styled(
            format!("{:<11}{absorbed}", "Ignored"),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    Paragraph::new(lines).render(inner, buf);
}

fn action_hint(action: StepAction, optional: bool) -> &'static str {
    match (action, optional) {
        (StepAction::Shake, _) => "pick up the inhaler (i) and shake it (s)",
        (StepAction::RemoveCap, _) => "double-click the inhaler (d) to take the cap off",
        (StepAction::Click, false) => "click the held inhaler (i) when done",
        (StepAction::Click, true) => "shake again (s) or click the inhaler (i) to skip",
        (StepAction::ReplaceCap, _) => "double-click the inhaler (d) to put the cap back",
    }
}

fn render_progress(snap: &Snapshot, area: Rect, buf: &mut Buffer) {
    let Some(step) = snap.step else {
        return;
    };

    if step.is_shake_gated() && snap.inhaler.is_focused {
        let state = &snap.training;
        let color = if state.is_shaking {
            Color::Yellow
        } else {
            Color::DarkGray
        };
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(" Shake "))
            .gauge_style(Style::default().fg(color))
            .ratio(f64::from(state.shake_progress()))
            .label(format!("{:.0}%", state.shake_progress() * 100.0))
            .render(area, buf);
    } else {
        Paragraph::new(action_hint(step.action, step.optional))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Next "))
            .render(area, buf);
    }
}

/// Truncates `text` to at most `max` terminal columns, marking the cut
fn fit_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn format_elapsed(elapsed: chrono::Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
