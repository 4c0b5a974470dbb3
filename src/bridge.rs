//! Process-boundary transports between the backend and a display consumer.
//!
//! `json` mode speaks one JSON object per line: requests on stdin, events on
//! stdout. `console` mode drives a local [`DisplayState`] from plain text
//! commands and prints it after every applied event.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::commands;
use crate::display::DisplayState;
use crate::models::message::{Event, Request};
use crate::models::news::SortMode;
use crate::AppState;

/// 已发出但尚未结束的请求；退出前全部等完
#[derive(Default)]
struct InFlight {
    handles: Vec<JoinHandle<()>>,
}

impl InFlight {
    fn track(&mut self, handle: Option<JoinHandle<()>>) {
        self.handles.retain(|h| !h.is_finished());
        self.handles.extend(handle);
    }

    async fn drain(self) {
        if !self.handles.is_empty() {
            log::info!("waiting for {} in-flight requests", self.handles.len());
        }
        for joined in join_all(self.handles).await {
            if let Err(e) = joined {
                log::error!("request task did not finish: {}", e);
            }
        }
    }
}

pub async fn serve_json_lines(
    app: Arc<AppState>,
    events: UnboundedReceiver<Event>,
) -> anyhow::Result<()> {
    serve_json_lines_on(app, events, tokio::io::stdin(), tokio::io::stdout()).await
}

/// JSON-lines transport over arbitrary streams.
///
/// Returns once `input` is exhausted, every request it issued has finished,
/// and every resulting event has been written to `output`.
pub async fn serve_json_lines_on<R, W>(
    app: Arc<AppState>,
    events: UnboundedReceiver<Event>,
    input: R,
    output: W,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer = tokio::spawn(write_events(events, output));
    let mut in_flight = InFlight::default();

    in_flight.track(commands::watchlist_cmd::refresh(&app));

    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Request>(line) {
            Ok(request) => in_flight.track(commands::dispatch(&app, request)),
            Err(e) => log::warn!("ignoring malformed request {:?}: {}", line, e),
        }
    }

    log::info!("input closed, finishing outstanding requests");
    in_flight.drain().await;
    // 释放最后的发送端，写任务收完剩余事件后退出
    drop(app);
    writer.await??;
    Ok(())
}

async fn write_events<W>(mut events: UnboundedReceiver<Event>, mut output: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.recv().await {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("failed to encode event: {}", e);
                continue;
            }
        };
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    output.shutdown().await
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Send(Request),
    RepeatSearch,
    ClearSearch,
    Sort(SortMode),
    Help,
    Quit,
}

pub fn parse_console_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let needs_arg = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("usage: {} <{}>", verb, what))
        } else {
            Ok(rest.to_string())
        }
    };

    match verb.to_lowercase().as_str() {
        "search" | "s" => Ok(ConsoleCommand::Send(Request::Search {
            query: needs_arg("query")?,
        })),
        "again" => Ok(ConsoleCommand::RepeatSearch),
        "reset" => Ok(ConsoleCommand::ClearSearch),
        "sort" => needs_arg("date|impact")?.parse().map(ConsoleCommand::Sort),
        "refresh" => Ok(ConsoleCommand::Send(Request::WatchRefresh)),
        "add" => Ok(ConsoleCommand::Send(Request::WatchAdd {
            symbol: needs_arg("symbol")?,
        })),
        "remove" | "rm" => Ok(ConsoleCommand::Send(Request::WatchRemove {
            symbol: needs_arg("symbol")?,
        })),
        "clear" => Ok(ConsoleCommand::Send(Request::WatchClear)),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
        other => Err(format!("unknown command: {}", other)),
    }
}

const CONSOLE_HELP: &str = "\
commands:
  search <query>      fetch news for a company or ticker
  again               repeat the last search
  reset               clear the search pane
  sort date|impact    reorder the current results
  refresh             refresh every watched symbol
  add <symbol>        watch a symbol
  remove <symbol>     stop watching a symbol
  clear               empty the watchlist
  quit";

pub async fn serve_console(
    app: Arc<AppState>,
    mut events: UnboundedReceiver<Event>,
) -> anyhow::Result<()> {
    let display = Arc::new(Mutex::new(DisplayState::new(app.settings.max_visible_articles)));

    let consumer = {
        let display = display.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let mut state = display.lock().unwrap_or_else(PoisonError::into_inner);
                if state.apply(&event) {
                    println!("{}", state.render());
                }
            }
        })
    };

    println!("{}", CONSOLE_HELP);
    let mut in_flight = InFlight::default();
    in_flight.track(commands::watchlist_cmd::refresh(&app));

    let mut last_query = String::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_console_command(&line) {
            Ok(command) => command,
            Err(msg) => {
                println!("{}", msg);
                continue;
            }
        };

        match command {
            ConsoleCommand::Send(request) => {
                if let Request::Search { query } = &request {
                    last_query = query.clone();
                    display
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .begin_search(query);
                }
                in_flight.track(commands::dispatch(&app, request));
            }
            ConsoleCommand::RepeatSearch => {
                if last_query.is_empty() {
                    println!("nothing to repeat");
                    continue;
                }
                display
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .begin_search(&last_query);
                in_flight.track(commands::dispatch(
                    &app,
                    Request::Search {
                        query: last_query.clone(),
                    },
                ));
            }
            ConsoleCommand::ClearSearch => {
                last_query.clear();
                let mut state = display.lock().unwrap_or_else(PoisonError::into_inner);
                state.clear_search();
                println!("{}", state.render());
            }
            ConsoleCommand::Sort(mode) => {
                let mut state = display.lock().unwrap_or_else(PoisonError::into_inner);
                state.set_sort_mode(mode);
                println!("{}", state.render());
            }
            ConsoleCommand::Help => println!("{}", CONSOLE_HELP),
            ConsoleCommand::Quit => break,
        }
    }

    in_flight.drain().await;
    drop(app);
    consumer.await?;
    Ok(())
}
