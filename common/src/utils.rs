// common/src/utils.rs
use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::FmtSubscriber;

/// Tracing level for a configured name; unknown names mean `INFO`
pub fn parse_level(level: &str) -> Level {
    level.trim().parse::<Level>().unwrap_or(Level::INFO)
}

/// Setup tracing for consistent logging across binaries
pub fn setup_tracing(level: &str) -> Result<(), SetGlobalDefaultError> {
    let level = parse_level(level);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

/// Shorten an account identifier for display, e.g. `0x71C765…976F`
pub fn short_address(address: &str) -> String {
    const LEFT: usize = 6;
    const RIGHT: usize = 4;

    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= LEFT + RIGHT {
        return address.to_string();
    }

    let head: String = chars[..LEFT].iter().collect();
    let tail: String = chars[chars.len() - RIGHT..].iter().collect();
    format!("{}…{}", head, tail)
}
