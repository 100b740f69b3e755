use bb_core::{domain::UserId, messaging::types::IncomingEvent};

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub fn command_event(user_id: UserId, text: &str) -> IncomingEvent {
    let (cmd, _args) = parse_command(text);
    match cmd.as_str() {
        "start" => IncomingEvent::Start(user_id),
        "help" => IncomingEvent::Help(user_id),
        "pair" => IncomingEvent::Pair(user_id),
        "next" => IncomingEvent::Next(user_id),
        "stop" => IncomingEvent::Stop(user_id),
        _ => IncomingEvent::UnknownCommand { user_id, name: cmd },
    }
}
