//! hirc - thin terminal client for hircd.
//!
//! Connects to the daemon's socket, subscribes to every advertised channel,
//! and shows a per-channel chat view with a single-line input. Enter sends
//! to the channel in view, Tab cycles channels, Ctrl-Q says goodbye.

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use hirc_proto::{ChannelMessage, ClientCodec, DaemonMsg, DaemonRequest};
use hircd::client::Session;
use hircd::config;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::widgets::{Block, Paragraph};
use std::io;
use std::path::PathBuf;
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

type Sink = SplitSink<Framed<UnixStream, ClientCodec>, DaemonRequest>;
type Stream = SplitStream<Framed<UnixStream, ClientCodec>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let socket_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::default_socket_path);

    let stream = UnixStream::connect(&socket_path).await.map_err(|e| {
        anyhow::anyhow!("cannot reach hircd at {}: {e}", socket_path.display())
    })?;
    let (sink, stream) = Framed::new(stream, ClientCodec).split();

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, sink, stream).await;

    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();
    result
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut sink: Sink,
    mut stream: Stream,
) -> anyhow::Result<()> {
    let mut session = Session::new();
    let mut keys = EventStream::new();

    loop {
        terminal.draw(|frame| render(frame, &session))?;

        tokio::select! {
            envelope = stream.next() => match envelope {
                Some(Ok(msg)) => {
                    if let Some(reply) = session.handle_envelope(msg) {
                        sink.send(session.request(reply)).await?;
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                // Daemon closed the session.
                None => return Ok(()),
            },
            key = keys.next() => match key {
                Some(Ok(Event::Key(key))) => {
                    if handle_key(&mut session, key, &mut sink).await? {
                        return Ok(());
                    }
                }
                Some(Ok(_)) => {} // resize etc., redrawn on next pass
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
        }
    }
}

/// Apply one key event. Returns `true` when the session should end.
async fn handle_key(
    session: &mut Session,
    key: KeyEvent,
    sink: &mut Sink,
) -> anyhow::Result<bool> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), KeyModifiers::CONTROL) => {
            sink.send(session.request(DaemonMsg::Goodbye)).await?;
            return Ok(true);
        }
        (KeyCode::Enter, _) => {
            if let Some(send) = session.submit_input() {
                sink.send(session.request(send)).await?;
            }
        }
        (KeyCode::Tab, _) => session.next_channel(),
        (KeyCode::Backspace, _) => {
            session.input.pop();
        }
        (KeyCode::Char(c), m) if m.is_empty() || m == KeyModifiers::SHIFT => {
            session.input.push(c);
        }
        _ => {}
    }
    Ok(false)
}

fn render(frame: &mut ratatui::Frame, session: &Session) {
    let [status, log, input] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    let title = match (&session.current, session.current_data()) {
        (Some(chan), Some(data)) if !data.topic.is_empty() => {
            format!("{chan} - {}", data.topic)
        }
        (Some(chan), _) => chan.to_string(),
        _ => "hirc - waiting for channels".to_string(),
    };
    frame.render_widget(Paragraph::new(title), status);

    // Tail of the current channel's log, as many lines as fit.
    let visible = log.height.saturating_sub(2) as usize;
    let lines = session
        .current_data()
        .map(|data| {
            data.log
                .iter()
                .rev()
                .take(visible)
                .rev()
                .map(format_message)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();
    frame.render_widget(Paragraph::new(lines).block(Block::bordered()), log);

    frame.render_widget(
        Paragraph::new(session.input.as_str()).block(Block::bordered().title("input")),
        input,
    );
}

fn format_message(msg: &ChannelMessage) -> String {
    let body = msg.body();
    let time = body.timestamp.format("%H:%M");
    match msg {
        ChannelMessage::Chat(_) => format!("{time} <{}> {}", body.author, body.text),
        ChannelMessage::Topic(_) => {
            format!("{time} * {} set the topic: {}", body.author, body.text)
        }
    }
}
