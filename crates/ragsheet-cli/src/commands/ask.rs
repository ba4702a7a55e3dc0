use anyhow::Result;
use ragsheet_client::{ConversationSnapshot, RagClient, SystemStatus};

use crate::cli::AskArgs;
use crate::output::{OutputFormat, json::print_json};
use crate::render::TerminalRenderer;

fn discard(_: &ConversationSnapshot) {}

pub async fn run(client: &RagClient, args: AskArgs, format: OutputFormat) -> Result<()> {
    let question = args.question.join(" ");

    if !args.skip_health_check {
        SystemStatus::default()
            .apply(client.check_health().await)
            .ensure_ready()?;
    }

    let session = client.session();
    let message = if format.is_json() {
        session.send(&question, &discard).await?
    } else {
        // Failures are reported once, by the error handler.
        let renderer = TerminalRenderer::stdout().with_notices(false);
        session.send(&question, &renderer).await?
    };

    if format.is_json() {
        return print_json(&message);
    }
    Ok(())
}
