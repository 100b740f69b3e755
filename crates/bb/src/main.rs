use std::sync::Arc;

use bb_core::{config::Config, session::Sessions, transcript::Transcript};

#[tokio::main]
async fn main() -> Result<(), bb_core::Error> {
    bb_core::logging::init("bb")?;

    let cfg = Arc::new(Config::load()?);

    let sessions = Arc::new(Sessions::new(cfg.partner_picker()));
    let transcript = Arc::new(Transcript::new(
        cfg.transcript_path.clone(),
        cfg.transcript_timestamps,
    ));
    if transcript.exists().await {
        tracing::info!(path = %transcript.path().display(), "appending to existing transcript");
    }

    bb_telegram::router::run_polling(cfg, sessions, transcript)
        .await
        .map_err(|e| bb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
