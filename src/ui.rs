use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget, Wrap},
};

use glovetype::game::Status;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let game = &self.game;

        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let title_style = Style::default().patch(bold_style).fg(Color::Cyan);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(2), // title
                Constraint::Length(2), // word
                Constraint::Length(2), // typed
                Constraint::Length(2), // timer
                Constraint::Length(4), // status
                Constraint::Min(0),
                Constraint::Length(1), // diagnostics
                Constraint::Length(1), // legend
            ])
            .split(area);

        Paragraph::new(Span::styled("SMART TYPING GLOVES", title_style))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let word = match game.word {
            Some(ref word) if game.stopwatch.is_running() => word.clone(),
            Some(_) => "Press Start to Begin Again".to_string(),
            None => "Press Start to Begin".to_string(),
        };
        Paragraph::new(Line::from(vec![
            Span::styled("Word: ", dim_style),
            Span::styled(word, bold_style),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

        Paragraph::new(Line::from(vec![
            Span::styled("Typed: ", dim_style),
            Span::styled(
                game.typed.clone(),
                Style::default().patch(bold_style).fg(Color::Yellow),
            ),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

        Paragraph::new(Line::from(vec![
            Span::styled("Timer: ", dim_style),
            Span::styled(game.stopwatch.display(), Style::default().fg(Color::Blue)),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

        let status_color = match game.status {
            Status::Idle | Status::Playing => Color::Cyan,
            Status::Mismatch | Status::NoInput => Color::Red,
            Status::Completed { .. } => Color::Green,
        };
        let mut status_text = game.status.message();
        if let Some(ref err) = game.save_error {
            status_text.push('\n');
            status_text.push_str(err);
        }
        Paragraph::new(status_text)
            .style(Style::default().fg(status_color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            )
            .render(chunks[4], buf);

        if let Some(ref err) = game.poll_error {
            Paragraph::new(Span::styled(format!("glove: {}", err), dim_style))
                .alignment(Alignment::Center)
                .render(chunks[6], buf);
        }

        Paragraph::new(Span::styled(
            format!("(s)tart / (esc)ape    input: {}", self.input_label),
            italic_style,
        ))
        .render(chunks[7], buf);
    }
}
