use anyhow::Result;
use std::io::BufRead;
use std::sync::mpsc;

use live_vision_chat::api::gemini_live::LiveConnector;
use live_vision_chat::config::{get_config_path, load_config};
use live_vision_chat::session::{
    run_event_loop, CpalMediaDevices, EventSender, NoticeReceiver, Role, SessionCommand,
    SessionController, SessionEvent, SessionNotice,
};
use live_vision_chat::upload;

const HELP: &str = "Commands: start | stop | upload <path|url> | status | quit";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config();
    log::info!("Config: {}", get_config_path().display());
    if config.api_key().is_none() {
        log::warn!("No API key configured; set GEMINI_API_KEY before starting a session");
    }

    let (events_tx, events_rx) = mpsc::channel();
    let (notice_tx, notice_rx) = mpsc::channel();

    let devices = CpalMediaDevices::new(config.camera_snapshot_path.clone());
    let controller = SessionController::new(
        config,
        Box::new(devices),
        Box::new(LiveConnector),
        events_tx.clone(),
        notice_tx,
    );

    std::thread::Builder::new()
        .name("notices".into())
        .spawn(move || print_notices(notice_rx))?;
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || read_commands(events_tx))?;

    println!("{}", HELP);
    run_event_loop(controller, events_rx);
    Ok(())
}

fn read_commands(events: EventSender) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));

        let command = match cmd {
            "" => continue,
            "start" => SessionCommand::Start,
            "stop" => SessionCommand::Stop,
            "status" => SessionCommand::Status,
            "quit" | "exit" => SessionCommand::Shutdown,
            "upload" if !arg.trim().is_empty() => match upload::load(arg) {
                Ok(media) => SessionCommand::Upload(media),
                Err(e) => {
                    eprintln!("! {}", e);
                    continue;
                }
            },
            _ => {
                println!("{}", HELP);
                continue;
            }
        };

        let quit = matches!(command, SessionCommand::Shutdown);
        if events.send(SessionEvent::Command(command)).is_err() || quit {
            return;
        }
    }

    // stdin closed
    let _ = events.send(SessionEvent::Command(SessionCommand::Shutdown));
}

fn print_notices(notices: NoticeReceiver) {
    for notice in notices {
        match notice {
            SessionNotice::StateChanged(state) => println!("[{}]", state),
            SessionNotice::UserSpeaking(true) => println!("(listening...)"),
            SessionNotice::AiSpeaking(true) => println!("(speaking...)"),
            SessionNotice::UserSpeaking(false) | SessionNotice::AiSpeaking(false) => {}
            SessionNotice::Transcript(entry) => {
                let who = match entry.role {
                    Role::User => "You",
                    Role::Model => "Gemini",
                };
                println!(
                    "{} {}: {}",
                    entry.timestamp.format("%H:%M:%S"),
                    who,
                    entry.text
                );
            }
            SessionNotice::Alert(message) => eprintln!("! {}", message),
        }
    }
}
